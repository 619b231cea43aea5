//! Callbacks the core invokes on the host to surface progress and prompts.

use serde::{Deserialize, Serialize};

/// Severity attached to a host message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Shape of a blocking prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AskKind {
    YesNo,
    YesNoCancel,
    OkCancel,
}

/// Answer returned from a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AskResult {
    Yes,
    No,
    Ok,
    Cancel,
}

impl AskResult {
    /// Whether this answer is one of the buttons offered by `kind`.
    pub fn is_valid_for(self, kind: AskKind) -> bool {
        match kind {
            AskKind::YesNo => matches!(self, AskResult::Yes | AskResult::No),
            AskKind::YesNoCancel => matches!(self, AskResult::Yes | AskResult::No | AskResult::Cancel),
            AskKind::OkCancel => matches!(self, AskResult::Ok | AskResult::Cancel),
        }
    }

    /// Maps a preferred answer onto the buttons offered by `kind`.
    ///
    /// Affirmative answers map to the affirmative button and negative answers to
    /// the negative one, so a non-interactive host can apply one default everywhere.
    pub fn coerce_to(self, kind: AskKind) -> AskResult {
        if self.is_valid_for(kind) {
            return self;
        }
        let affirmative = matches!(self, AskResult::Yes | AskResult::Ok);
        match (kind, affirmative) {
            (AskKind::OkCancel, true) => AskResult::Ok,
            (AskKind::OkCancel, false) => AskResult::Cancel,
            (_, true) => AskResult::Yes,
            (AskKind::YesNo, false) => AskResult::No,
            (AskKind::YesNoCancel, false) => AskResult::Cancel,
        }
    }
}

/// Host-side collaborator injected into every run.
///
/// Implementations must be callable from any phase of any action; the
/// default `warn` forwards to `message` at [`MessageLevel::Warning`].
pub trait HostCallbacks: Send + Sync {
    /// Report progress or diagnostic text.
    fn message(&self, text: &str, level: MessageLevel);

    /// Report a non-fatal problem.
    fn warn(&self, text: &str) {
        self.message(text, MessageLevel::Warning);
    }

    /// Ask a blocking question and wait for the answer.
    fn ask(&self, question: &str, title: &str, kind: AskKind) -> AskResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_maps_onto_offered_buttons() {
        assert_eq!(AskResult::Cancel.coerce_to(AskKind::YesNo), AskResult::No);
        assert_eq!(AskResult::Ok.coerce_to(AskKind::YesNoCancel), AskResult::Yes);
        assert_eq!(AskResult::Yes.coerce_to(AskKind::OkCancel), AskResult::Ok);
        assert_eq!(AskResult::No.coerce_to(AskKind::OkCancel), AskResult::Cancel);
        assert_eq!(AskResult::Cancel.coerce_to(AskKind::OkCancel), AskResult::Cancel);
    }

    #[test]
    fn answers_deserialize_from_lowercase() {
        let answer: AskResult = serde_json::from_str("\"ok\"").expect("parse");
        assert_eq!(answer, AskResult::Ok);
        let kind: AskKind = serde_json::from_str("\"yes_no_cancel\"").expect("parse");
        assert_eq!(kind, AskKind::YesNoCancel);
    }
}
