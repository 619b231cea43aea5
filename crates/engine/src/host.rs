//! Host callbacks that route everything through `tracing`.

use cogwork_types::{AskKind, AskResult, HostCallbacks, MessageLevel};
use tracing::{debug, error, info, warn};

/// Non-interactive host: messages become log events and prompts are answered
/// with a fixed default mapped onto the offered buttons.
#[derive(Debug, Clone, Copy)]
pub struct TracingHost {
    ask_default: AskResult,
}

impl TracingHost {
    pub fn new(ask_default: AskResult) -> Self {
        Self { ask_default }
    }
}

impl Default for TracingHost {
    fn default() -> Self {
        Self::new(AskResult::Cancel)
    }
}

impl HostCallbacks for TracingHost {
    fn message(&self, text: &str, level: MessageLevel) {
        match level {
            MessageLevel::Debug => debug!(target: "cogwork::host", "{text}"),
            MessageLevel::Info => info!(target: "cogwork::host", "{text}"),
            MessageLevel::Warning => warn!(target: "cogwork::host", "{text}"),
            MessageLevel::Error => error!(target: "cogwork::host", "{text}"),
        }
    }

    fn ask(&self, question: &str, title: &str, kind: AskKind) -> AskResult {
        let answer = self.ask_default.coerce_to(kind);
        info!(target: "cogwork::host", title, question, ?answer, "answering prompt without user interaction");
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_with_coerced_default() {
        let host = TracingHost::new(AskResult::Yes);
        assert_eq!(host.ask("Overwrite?", "Save", AskKind::OkCancel), AskResult::Ok);
        assert_eq!(TracingHost::default().ask("Continue?", "Run", AskKind::YesNo), AskResult::No);
    }
}
