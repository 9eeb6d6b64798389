use crate::domain::Confirm;
use inquire::Confirm as ConfirmPrompt;
use tracing::warn;

/// Asks on the terminal; an interrupted or failed prompt counts as "no"
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Confirm for TerminalPrompt {
    fn confirm(&self, question: &str) -> bool {
        ConfirmPrompt::new(question)
            .with_default(false)
            .with_help_message("Press 'y' to replace, Enter to keep the current version")
            .prompt()
            .unwrap_or_else(|e| {
                warn!("Could not read confirmation: {e}");
                false
            })
    }
}
