//! User-facing status lines for the update command.

use colored::Colorize;
use std::fmt;

/// Kind of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Progress information
    Info,
    /// Something changed or was confirmed
    Ok,
    /// Attention needed but not a failure
    Warn,
    /// A phase or step was not run
    Skip,
    /// A step failed
    Error,
}

impl Status {
    /// Bracketed tag printed before the message.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Info => "[INFO]",
            Self::Ok => "[OK]",
            Self::Warn => "[WARN]",
            Self::Skip => "[SKIP]",
            Self::Error => "[ERROR]",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Sink for update progress.
pub trait Reporter: Send + Sync {
    /// Emit one status line.
    fn report(&self, status: Status, message: &str);
}

/// Writes colored status lines to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Print the command banner.
    pub fn banner(&self, title: &str) {
        let rule = "═".repeat(38);
        println!();
        println!("{}", format!("╔{rule}╗").green());
        println!("{}", format!("║     {title:<33}║").green());
        println!("{}", format!("╚{rule}╝").green());
        println!();
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, status: Status, message: &str) {
        let tag = match status {
            Status::Info => status.tag().blue(),
            Status::Ok => status.tag().green(),
            Status::Warn => status.tag().yellow(),
            Status::Skip => status.tag().cyan(),
            Status::Error => status.tag().red(),
        };
        println!("{tag} {message}");
    }
}
