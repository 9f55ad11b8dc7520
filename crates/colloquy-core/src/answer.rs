//! Outbound answers and the [`Responder`] contract.
//!
//! An [`Answer`] is platform neutral: text plus optional reply-keyboard
//! `menu`, an optional single-choice [`Enum`] and optional [`Button`]s.
//! Messenger adapters decide how each part is rendered.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ResponderError;
use crate::message::DialogArgs;

// ============================================================================
// Answer
// ============================================================================

/// A rich answer sent back to a chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answer {
    /// Message text.
    pub text: String,
    /// Reply keyboard entries; pressing one sends its text back as a message.
    pub menu: Vec<String>,
    /// Single-choice options rendered as inline buttons.
    pub choice: Enum,
    /// Extra buttons.
    pub buttons: Vec<Button>,
}

impl Answer {
    /// Creates a text-only answer.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Sets the reply keyboard entries.
    pub fn with_menu<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.menu = items.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the single-choice options.
    pub fn with_choice(mut self, choice: Enum) -> Self {
        self.choice = choice;
        self
    }

    /// Appends a button.
    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }
}

/// An ordered set of single-choice options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enum {
    pub values: Vec<EnumItem>,
}

/// One option of an [`Enum`]: the value sent back and the title shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumItem {
    pub value: String,
    pub title: String,
}

impl Enum {
    /// Builds options whose titles equal their values.
    pub fn from_list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|v| {
                    let value = v.into();
                    EnumItem {
                        title: value.clone(),
                        value,
                    }
                })
                .collect(),
        }
    }

    /// Builds options from `(value, title)` pairs, keeping their order.
    pub fn from_pairs<I, V, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (V, T)>,
        V: Into<String>,
        T: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(value, title)| EnumItem {
                    value: value.into(),
                    title: title.into(),
                })
                .collect(),
        }
    }

    /// Returns `true` when there is at least one option.
    pub fn is_valid(&self) -> bool {
        !self.values.is_empty()
    }
}

/// A button attached to an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    /// Pressing the button resumes the given dialog coordinates.
    Command { title: String, args: DialogArgs },
}

impl Button {
    /// Creates a command button.
    pub fn command(title: impl Into<String>, args: DialogArgs) -> Self {
        Self::Command {
            title: title.into(),
            args,
        }
    }

    /// The caption shown on the button.
    pub fn title(&self) -> &str {
        match self {
            Self::Command { title, .. } => title,
        }
    }
}

/// Media objects that can be sent instead of an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    /// An image read from the local filesystem.
    LocalImage { path: PathBuf },
    /// An in-memory image.
    Image { bytes: Vec<u8> },
}

/// What the messenger reports back after sending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    /// Identifier of the sent message.
    pub message_id: String,
    /// Chat the message was sent to.
    pub chat_id: String,
}

// ============================================================================
// Responder
// ============================================================================

/// Sends answers to one chat.
///
/// Failures are reported as [`ResponderError`] and are never classified as
/// command errors by the engine.
#[async_trait]
pub trait Responder: Send + Sync + 'static {
    /// Sends text, menus, choices and buttons.
    async fn respond(&self, answer: Answer) -> Result<Receipt, ResponderError>;

    /// Sends a media object.
    async fn respond_media(&self, media: Media) -> Result<Receipt, ResponderError>;
}

/// A shared, type-erased responder.
pub type BoxedResponder = Arc<dyn Responder>;
