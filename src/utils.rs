//! # Utilities Module
//!
//! ## Purpose
//! Common helpers used throughout the citation search service for
//! performance timing and text handling.
//!
//! ## Input/Output Specification
//! - **Input**: Various data types requiring common operations
//! - **Output**: Processed text, timing measurements
//! - **Functions**: Text utilities, performance helpers

use std::time::Instant;

/// Performance timer for measuring operation duration
pub struct Timer {
    start: Instant,
    name: String,
}

/// Text processing utilities
pub struct TextUtils;

impl Timer {
    /// Start a new timer with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Stop timer and log duration
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("Timer '{}' completed in {}ms", self.name, elapsed);
        elapsed
    }
}

impl TextUtils {
    /// Truncate text to at most `max_chars` characters with ellipsis.
    /// Counts characters, not bytes, so multi-byte input cannot split.
    pub fn truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text_intact() {
        assert_eq!(TextUtils::truncate("Hello world", 20), "Hello world");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(
            TextUtils::truncate("This is a very long text", 10),
            "This is..."
        );
    }

    #[test]
    fn truncate_is_char_boundary_safe() {
        let text = "§1983 claims — damages";
        let truncated = TextUtils::truncate(text, 10);
        assert!(truncated.ends_with("..."));
        assert!(truncated.chars().count() <= 10);
    }

    #[test]
    fn timer_reports_elapsed_time() {
        let timer = Timer::new("test");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.stop() >= 5);
    }
}
