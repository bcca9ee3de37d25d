use super::Notifier;
use anyhow::Result;
use async_trait::async_trait;
use console::Term;

/// Delivers the briefing by printing it to stdout.
pub struct ConsoleNotifier {
    term: Term,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        for line in message.lines() {
            self.term.write_line(line)?;
        }
        Ok(())
    }
}
