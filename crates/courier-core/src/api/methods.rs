//! Static method table: method name → request shape and response kind.
//!
//! Lookups are case-insensitive. Methods missing from the table use
//! [`MethodSpec::DEFAULT`]: standard request shaping and a
//! [`FallbackResponse`](super::FallbackResponse) for object results.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Semantic type of an object returned by a remote method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    WebhookInfo,
    User,
    Message,
    MessageId,
    UserProfilePhotos,
    File,
    ChatInviteLink,
    Chat,
    ChatMember,
    MenuButton,
    Poll,
    StickerSet,
    SentWebAppMessage,
}

impl ResponseKind {
    /// Type name as used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebhookInfo => "WebhookInfo",
            Self::User => "User",
            Self::Message => "Message",
            Self::MessageId => "MessageId",
            Self::UserProfilePhotos => "UserProfilePhotos",
            Self::File => "File",
            Self::ChatInviteLink => "ChatInviteLink",
            Self::Chat => "Chat",
            Self::ChatMember => "ChatMember",
            Self::MenuButton => "MenuButton",
            Self::Poll => "Poll",
            Self::StickerSet => "StickerSet",
            Self::SentWebAppMessage => "SentWebAppMessage",
        }
    }
}

/// How a request body is prepared before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// All attribute transforms, including the `parse_mode` default.
    Standard,
    /// Argument-less methods: transforms apply but `parse_mode` is not added.
    Bare,
}

/// Table entry for one remote method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpec {
    /// Request shaping.
    pub shape: Shape,
    /// Registered response type, if any.
    pub response: Option<ResponseKind>,
}

impl MethodSpec {
    /// Entry used for methods not present in the table.
    pub const DEFAULT: Self = Self {
        shape: Shape::Standard,
        response: None,
    };

    const fn returns(response: ResponseKind) -> Self {
        Self {
            shape: Shape::Standard,
            response: Some(response),
        }
    }

    const fn bare(response: Option<ResponseKind>) -> Self {
        Self {
            shape: Shape::Bare,
            response,
        }
    }
}

const REGISTRATIONS: &[(ResponseKind, &[&str])] = &[
    (ResponseKind::WebhookInfo, &["getWebhookInfo"]),
    (ResponseKind::User, &["getMe"]),
    (
        ResponseKind::Message,
        &[
            "sendMessage",
            "forwardMessage",
            "sendPhoto",
            "sendAudio",
            "sendDocument",
            "sendVideo",
            "sendAnimation",
            "sendVoice",
            "sendVideoNote",
            "sendLocation",
            "editMessageLiveLocation",
            "stopMessageLiveLocation",
            "sendVenue",
            "sendContact",
            "sendPoll",
            "sendDice",
            "editMessageText",
            "editMessageCaption",
            "editMessageMedia",
            "editMessageReplyMarkup",
            "sendSticker",
            "sendInvoice",
            "sendGame",
            "setGameScore",
        ],
    ),
    (ResponseKind::MessageId, &["copyMessage"]),
    (ResponseKind::UserProfilePhotos, &["getUserProfilePhotos"]),
    (
        ResponseKind::File,
        &[
            "getFile",
            "uploadStickerFile",
            "createNewStickerSet",
            "addStickerToSet",
        ],
    ),
    (
        ResponseKind::ChatInviteLink,
        &[
            "createChatInviteLink",
            "editChatInviteLink",
            "revokeChatInviteLink",
        ],
    ),
    (ResponseKind::Chat, &["getChat"]),
    (ResponseKind::ChatMember, &["getChatMember"]),
    (ResponseKind::MenuButton, &["getChatMenuButton"]),
    (ResponseKind::Poll, &["stopPoll"]),
    (ResponseKind::StickerSet, &["getStickerSet"]),
    (ResponseKind::SentWebAppMessage, &["answerWebAppQuery"]),
];

/// Methods that take no text and must not receive a default `parse_mode`.
const BARE_METHODS: &[&str] = &[
    "getMe",
    "getWebhookInfo",
    "deleteWebhook",
    "getUpdates",
    "logOut",
    "close",
    "getMyCommands",
];

/// Case-insensitive lookup table of remote methods.
#[derive(Debug, Clone)]
pub struct MethodTable {
    entries: HashMap<String, MethodSpec>,
}

impl MethodTable {
    /// Builds the table of known platform methods.
    pub fn standard() -> Self {
        let mut entries = HashMap::new();
        for (kind, methods) in REGISTRATIONS {
            for method in *methods {
                entries.insert(method.to_lowercase(), MethodSpec::returns(*kind));
            }
        }
        for method in BARE_METHODS {
            let key = method.to_lowercase();
            let response = entries.get(&key).and_then(|spec| spec.response);
            entries.insert(key, MethodSpec::bare(response));
        }
        Self { entries }
    }

    /// Shared instance of [`standard`](Self::standard), built once.
    pub fn shared() -> &'static MethodTable {
        static TABLE: OnceLock<MethodTable> = OnceLock::new();
        TABLE.get_or_init(Self::standard)
    }

    /// Registers or replaces an entry.
    pub fn register(&mut self, method: &str, spec: MethodSpec) {
        self.entries.insert(method.to_lowercase(), spec);
    }

    /// Looks up a method, falling back to [`MethodSpec::DEFAULT`].
    pub fn lookup(&self, method: &str) -> MethodSpec {
        self.entries
            .get(&method.to_lowercase())
            .copied()
            .unwrap_or(MethodSpec::DEFAULT)
    }
}

impl Default for MethodTable {
    fn default() -> Self {
        Self::shared().clone()
    }
}
