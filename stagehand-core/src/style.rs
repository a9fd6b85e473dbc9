//! Emoji + colored status lines for the operator's terminal.
//!
//! Everything printed here is also logged, so the log file tells the same
//! story without the colors.

use crossterm::style::Stylize;

pub mod emoji {
    pub const ACTION: &str = "🧩";
    pub const CLEANUP: &str = "🧹";
    pub const DISK: &str = "💾";
    pub const DOWNLOAD: &str = "⬇️";
    pub const ERROR: &str = "❌";
    pub const LOCK: &str = "🔒";
    pub const PARTY: &str = "🎉";
    pub const SEARCH: &str = "🔍";
    pub const SUCCESS: &str = "✅";
    pub const WARNING: &str = "⚠️";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

pub fn with(emoji: &str, message: &str) -> String {
    format!("{} {}", emoji, message)
}

/// Render one status line with the color for `level`.
pub fn render(level: Level, message: &str) -> String {
    match level {
        Level::Info => with(emoji::ACTION, message).cyan().to_string(),
        Level::Success => with(emoji::SUCCESS, message).green().to_string(),
        Level::Warning => with(emoji::WARNING, message).yellow().to_string(),
        Level::Error => with(emoji::ERROR, message).red().bold().to_string(),
    }
}

pub fn info(message: &str) {
    log::info!("{}", message);
    println!("{}", render(Level::Info, message));
}

pub fn success(message: &str) {
    log::info!("{}", message);
    println!("{}", render(Level::Success, message));
}

pub fn warning(message: &str) {
    log::warn!("{}", message);
    println!("{}", render(Level::Warning, message));
}

pub fn error(message: &str) {
    log::error!("{}", message);
    println!("{}", render(Level::Error, message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_keeps_message_and_marker() {
        let line = render(Level::Error, "mount subvolumes failed");
        assert!(line.contains("mount subvolumes failed"));
        assert!(line.contains(emoji::ERROR));

        let line = render(Level::Warning, "swapon failed");
        assert!(line.contains(emoji::WARNING));
    }

    #[test]
    fn with_prefixes_emoji() {
        assert_eq!(with(emoji::DISK, "sda"), "💾 sda");
    }
}
