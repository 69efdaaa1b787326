//! Everything a [`Dispatcher`](crate::Dispatcher) dispatches to.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::event_handler::{EventHandler, HandlerSlot};
use crate::handler::{Callback, Handler};
use crate::listener::{IntoSelectors, Listeners, Selector};
use crate::middleware::{Middleware, MiddlewareChain};
use crate::plugin::{Plugin, PluginRegistry};

/// Registered middleware, plugins, listeners and stateful handlers.
///
/// ```rust,ignore
/// let mut registry = Registry::new();
/// registry
///     .middleware("locale", |bag: ContextBag| async move { bag.insert("locale", "en"); })
///     .plugin(Plugin::new("antiflood", antiflood).with_priority(100))
///     .on("message", |Current(message): Current<Message>| async move { /* ... */ })
///     .handler(Greeter);
/// ```
#[derive(Default)]
pub struct Registry {
    middleware: MiddlewareChain,
    plugins: PluginRegistry,
    listeners: Listeners,
    handlers: Vec<HandlerSlot>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a middleware callback.
    pub fn middleware<H, T>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.middleware.register(Middleware::new(name, handler));
        self
    }

    pub fn plugin(&mut self, plugin: Plugin) -> &mut Self {
        self.plugins.register(plugin);
        self
    }

    /// Registers one listener under each of `selectors`.
    ///
    /// A selector that already has a listener gets this one instead.
    pub fn on<S, H, T>(&mut self, selectors: S, handler: H) -> &mut Self
    where
        S: IntoSelectors,
        H: Handler<T, ()>,
        T: 'static,
    {
        let callback = Callback::new(handler);
        for selector in selectors.into_selectors() {
            self.listeners.register(selector, callback.clone());
        }
        self
    }

    /// Registers the listener run for every update.
    pub fn on_any<H, T>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.on(Selector::Any, handler)
    }

    /// Adds a stateful handler.
    pub fn handler<E: EventHandler>(&mut self, handler: E) -> &mut Self {
        self.shared_handler(Arc::new(handler))
    }

    /// Adds a stateful handler the caller keeps a handle to.
    pub fn shared_handler(&mut self, handler: Arc<dyn EventHandler>) -> &mut Self {
        debug!(handler = handler.name(), "Registered event handler");
        self.handlers.push(HandlerSlot::new(handler));
        self
    }

    pub fn middleware_chain(&self) -> &MiddlewareChain {
        &self.middleware
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub(crate) fn handler_slots(&self) -> &[HandlerSlot] {
        &self.handlers
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("middleware", &self.middleware.len())
            .field("plugins", &self.plugins.len())
            .field("listeners", &self.listeners.len())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
