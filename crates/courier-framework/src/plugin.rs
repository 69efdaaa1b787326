//! Plugin registry.
//!
//! A [`Plugin`] is a callback guarded by filter predicates and ranked by
//! priority. For each dispatch the [`PluginRegistry`]:
//!
//! 1. selects the plugins whose filters **all** accept the update;
//! 2. orders them by descending priority, keeping registration order on ties;
//! 3. runs them one after another through the binder.
//!
//! A plugin steers the rest of the run through its [`Propagation`] return
//! value. Errors are not caught here; they end the run and surface at the
//! dispatcher's failure boundary.

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use courier_core::Update;

use crate::binder::{Binder, Invocation, NamedArgs};
use crate::context::Scope;
use crate::error::BoxError;
use crate::handler::{Callback, Handler};

/// Control signal returned by a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Normal completion; run the next plugin.
    #[default]
    Next,
    /// Abandon this plugin's work and move on to the next plugin.
    Continue,
    /// Run no further plugins for this update. Not a failure.
    Stop,
}

/// Predicate deciding whether a plugin applies to an update.
pub type FilterFn = Arc<dyn Fn(&Update) -> bool + Send + Sync>;

// =============================================================================
// Plugin
// =============================================================================

/// A filtered, prioritized callback.
///
/// ```rust,ignore
/// let antiflood = Plugin::new("antiflood", |bag: ContextBag| async move {
///     if bag.get::<bool>("flooding").unwrap_or(false) {
///         Propagation::Stop
///     } else {
///         Propagation::Next
///     }
/// })
/// .requires("message")
/// .with_priority(100);
/// ```
#[derive(Clone)]
pub struct Plugin {
    name: String,
    filters: Vec<FilterFn>,
    callback: Callback<Propagation>,
    priority: i32,
}

impl Plugin {
    /// Creates a plugin with no filters and priority `0`.
    pub fn new<H, T>(name: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, Propagation>,
        T: 'static,
    {
        Self {
            name: name.into(),
            filters: Vec::new(),
            callback: Callback::new(handler),
            priority: 0,
        }
    }

    /// Adds a filter. All filters must accept an update for the plugin to run.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Update) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Adds a filter requiring `field` to be present.
    pub fn requires(self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.with_filter(move |update| update.has(&field))
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns `true` if every filter accepts `update`.
    pub fn accepts(&self, update: &Update) -> bool {
        self.filters.iter().all(|filter| filter(update))
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("filters", &self.filters.len())
            .field("priority", &self.priority)
            .finish()
    }
}

// =============================================================================
// PluginRegistry
// =============================================================================

/// Ordered collection of plugins.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Plugin) {
        debug!(plugin = %plugin.name, priority = plugin.priority, "Registered plugin");
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugins applying to `update`, in execution order.
    pub fn selected(&self, update: &Update) -> Vec<&Plugin> {
        let mut selected: Vec<&Plugin> = self
            .plugins
            .iter()
            .filter(|plugin| plugin.accepts(update))
            .collect();
        // Stable: equal priorities keep registration order.
        selected.sort_by_key(|plugin| Reverse(plugin.priority));
        selected
    }

    /// Runs the selected plugins sequentially.
    pub async fn run(&self, scope: &Scope) -> Result<(), BoxError> {
        for plugin in self.selected(scope.update()) {
            let outcome = Binder::invoke(&plugin.callback, scope, NamedArgs::new()).await?;
            match outcome {
                Invocation::Invoked(Propagation::Stop) => {
                    debug!(plugin = %plugin.name, "Plugin stopped propagation");
                    break;
                }
                Invocation::Invoked(Propagation::Continue) => {
                    trace!(plugin = %plugin.name, "Plugin continued");
                }
                Invocation::Invoked(Propagation::Next) => {}
                Invocation::Skipped => {
                    trace!(plugin = %plugin.name, "Plugin skipped by binder");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{handler_scope, update};
    use courier_core::ContextBag;
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recording(log: &Log, name: &'static str, signal: Propagation, priority: i32) -> Plugin {
        let log = Arc::clone(log);
        Plugin::new(name, move || {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(name);
                signal
            }
        })
        .with_priority(priority)
    }

    fn run_scope() -> Scope {
        let update = update(json!({
            "update_id": 1,
            "message": { "message_id": 1, "chat": { "id": 1, "type": "private" } }
        }));
        handler_scope(update).0
    }

    #[tokio::test]
    async fn test_descending_priority_with_stable_ties() {
        let log = Log::default();
        let mut registry = PluginRegistry::new();
        registry.register(recording(&log, "low", Propagation::Next, -5));
        registry.register(recording(&log, "first-tie", Propagation::Next, 10));
        registry.register(recording(&log, "high", Propagation::Continue, 50));
        registry.register(recording(&log, "second-tie", Propagation::Next, 10));

        assert_ok!(registry.run(&run_scope()).await);

        assert_eq!(*log.lock(), vec!["high", "first-tie", "second-tie", "low"]);
    }

    #[tokio::test]
    async fn test_stop_ends_the_run() {
        let log = Log::default();
        let mut registry = PluginRegistry::new();
        registry.register(recording(&log, "a", Propagation::Next, 3));
        registry.register(recording(&log, "b", Propagation::Stop, 2));
        registry.register(recording(&log, "c", Propagation::Next, 1));

        assert_ok!(registry.run(&run_scope()).await);

        assert_eq!(*log.lock(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_all_filters_must_pass() {
        let log = Log::default();
        let mut registry = PluginRegistry::new();
        registry.register(recording(&log, "messages", Propagation::Next, 0).requires("message"));
        registry.register(
            recording(&log, "never", Propagation::Next, 0)
                .requires("message")
                .with_filter(|_| false),
        );
        registry.register(recording(&log, "callbacks", Propagation::Next, 0).requires("callback_query"));

        assert_ok!(registry.run(&run_scope()).await);

        assert_eq!(*log.lock(), vec!["messages"]);
    }

    #[tokio::test]
    async fn test_failure_propagates_and_halts_the_run() {
        let log = Log::default();
        let mut registry = PluginRegistry::new();
        registry.register(
            Plugin::new("broken", |_bag: ContextBag| async {
                Err::<Propagation, _>(BoxError::from("plugin exploded"))
            })
            .with_priority(5),
        );
        registry.register(recording(&log, "after", Propagation::Next, 0));

        let err = assert_err!(registry.run(&run_scope()).await);

        assert_eq!(err.to_string(), "plugin exploded");
        assert!(log.lock().is_empty());
    }
}
