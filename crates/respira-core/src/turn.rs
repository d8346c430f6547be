use serde::{Deserialize, Serialize};

/// The end user that authored a [`TurnMessage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnUser {
    /// Opaque user identifier assigned by the transport.
    pub id: i64,
    /// First name as reported by the transport.
    pub first_name: String,
    /// Last name, when the user has one set.
    pub last_name: Option<String>,
    /// Public handle (username), when the user has one set.
    pub handle: Option<String>,
}

/// A structured contact payload shared by the user instead of typing
/// a phone number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnContact {
    /// The phone number carried by the contact card.
    pub phone_number: String,
}

/// One inbound conversation turn.
///
/// A turn carries free text, a structured contact payload, or both;
/// a turn with neither is dropped by the channel before it reaches
/// the dialog engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnMessage {
    /// The conversation (chat) this turn belongs to.
    pub chat_id: i64,
    /// The user that sent the turn.
    pub user: TurnUser,
    /// The reply text, if any.
    pub text: Option<String>,
    /// A shared contact, if any.
    pub contact: Option<TurnContact>,
}

impl TurnMessage {
    /// The turn text, or `""` when the turn carried no text.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Quick-reply rendering hint attached to an [`OutboundMessage`].
///
/// The dialog engine never depends on the transport actually rendering
/// the hint; free text must always remain a valid answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyHint {
    /// Remove any previously shown quick-reply keyboard.
    Remove,
    /// Offer the given rows of one-tap choices.
    Choices(Vec<Vec<String>>),
    /// Offer a single button that shares the user's own contact card.
    RequestContact,
}

/// A reply to be delivered to the user by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// The conversation (chat) to deliver to.
    pub chat_id: i64,
    /// The reply text.
    pub text: String,
    /// How the transport should render quick replies.
    pub reply: ReplyHint,
}

impl OutboundMessage {
    /// Creates a plain text reply that removes any shown keyboard.
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply: ReplyHint::Remove,
        }
    }

    /// Creates a reply offering one row of one-tap choices.
    pub fn choices(chat_id: i64, text: impl Into<String>, row: &[&str]) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply: ReplyHint::Choices(vec![row.iter().map(|s| (*s).to_string()).collect()]),
        }
    }

    /// Creates a reply offering a share-contact button.
    pub fn contact_request(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply: ReplyHint::RequestContact,
        }
    }
}
