//! Per-chat session state.
//!
//! A [`SessionState`] records which command owns the dialog of one chat,
//! which step is current, and the data collected so far. The forward
//! directive and the transition flag only live for one handling pass and are
//! never persisted.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::DialogArgs;

/// A request, issued by a step handler, to continue in another step
/// with the same inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Forward {
    /// Continue in the named step.
    To(String),
    /// Continue in whatever step follows the current one.
    Passthrough,
}

/// The persisted record of one chat's dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    chat_id: String,
    /// Current step; empty until the first step has run.
    #[serde(rename = "state")]
    name: String,
    command_name: String,
    #[serde(default)]
    data: HashMap<String, String>,
    started_at: DateTime<Utc>,

    #[serde(skip)]
    forward: Option<Forward>,
    #[serde(skip)]
    transited: bool,
}

impl SessionState {
    /// Starts a fresh dialog of `command_name` for `chat_id`.
    pub fn new(chat_id: impl Into<String>, command_name: impl Into<String>) -> Self {
        Self::restore(chat_id, "", command_name, HashMap::new(), Utc::now())
    }

    /// Rebuilds a state from its persisted fields.
    ///
    /// Store implementations that do not go through serde use this to
    /// reassemble a record; the transient fields start cleared.
    pub fn restore(
        chat_id: impl Into<String>,
        name: impl Into<String>,
        command_name: impl Into<String>,
        data: HashMap<String, String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            name: name.into(),
            command_name: command_name.into(),
            data,
            started_at,
            forward: None,
            transited: false,
        }
    }

    /// Builds a state from pre-resolved dialog coordinates.
    pub fn from_args(chat_id: impl Into<String>, args: &DialogArgs) -> Self {
        Self::restore(
            chat_id,
            args.state_name.clone(),
            args.command_name.clone(),
            args.data.clone(),
            Utc::now(),
        )
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// The current step name; empty for a dialog that has not started.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    pub fn data(&self) -> &HashMap<String, String> {
        &self.data
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns `true` while no step has been recorded yet.
    pub fn is_fresh(&self) -> bool {
        self.name.is_empty()
    }

    /// Reads a data entry.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Writes a data entry, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    /// Removes a data entry.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.data.remove(key)
    }

    /// Moves the dialog to `name`.
    ///
    /// Once called, the machine no longer applies the default successor for
    /// the current pass.
    pub fn transit(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.transited = true;
    }

    /// Whether [`transit`](Self::transit) was called during this pass.
    pub fn recently_transited(&self) -> bool {
        self.transited
    }

    /// Moves to `name` and runs that step immediately with the same message.
    pub fn forward(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.forward = Some(Forward::To(name.clone()));
        self.transit(name);
    }

    /// Runs the default successor immediately with the same message.
    pub fn passthrough(&mut self) {
        self.forward = Some(Forward::Passthrough);
    }

    /// The forward directive set during this pass.
    pub fn forwarded(&self) -> Option<&Forward> {
        self.forward.as_ref()
    }

    /// Clears the forward directive and transition flag, returning the
    /// directive.
    pub fn take_forward(&mut self) -> Option<Forward> {
        self.transited = false;
        self.forward.take()
    }

    /// Time elapsed since the dialog started.
    pub fn duration(&self) -> Duration {
        (Utc::now() - self.started_at).to_std().unwrap_or_default()
    }
}
