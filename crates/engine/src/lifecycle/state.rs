use std::fmt;

use serde::Serialize;

/// Lifecycle position of an action instance.
///
/// `Running` is entered when the Do phase starts and kept after it succeeds;
/// `Failed` records an Init or Do failure; `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionState {
    Created,
    Initialized,
    Running,
    Cleaned,
    Failed,
    Disposed,
}

impl ActionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionState::Created => "created",
            ActionState::Initialized => "initialized",
            ActionState::Running => "running",
            ActionState::Cleaned => "cleaned",
            ActionState::Failed => "failed",
            ActionState::Disposed => "disposed",
        }
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
