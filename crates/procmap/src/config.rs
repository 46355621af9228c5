//! Mapper configuration.

use std::time::Duration;

/// Configuration for [`Mapper`](crate::Mapper) and [`AsyncMapper`](crate::AsyncMapper).
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Reuse column names per command signature instead of reading them from
    /// every cursor.
    pub column_cache: bool,
    /// Commands slower than this are logged at WARN.
    pub slow_command_threshold: Option<Duration>,
    /// Log every command at DEBUG.
    pub log_commands: bool,
    /// Truncate logged command text (in bytes, on a char boundary). `None` means no truncation.
    pub max_log_text_length: Option<usize>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            column_cache: true,
            slow_command_threshold: None,
            log_commands: true,
            max_log_text_length: Some(200),
        }
    }
}

impl MapperConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable the column-name cache for every command.
    pub fn no_column_cache(mut self) -> Self {
        self.column_cache = false;
        self
    }

    /// Set slow command threshold.
    pub fn slow_threshold(mut self, duration: Duration) -> Self {
        self.slow_command_threshold = Some(duration);
        self
    }

    /// Disable per-command DEBUG logging.
    pub fn quiet(mut self) -> Self {
        self.log_commands = false;
        self
    }

    /// Set maximum command text length to log.
    pub fn max_log_text_length(mut self, len: usize) -> Self {
        self.max_log_text_length = Some(len);
        self
    }

    /// Disable command text truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_log_text_length = None;
        self
    }

    pub(crate) fn log_text<'a>(&self, text: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_log_text_length {
            Some(max) if text.len() > max => {
                format!("{}...", truncate_bytes(text, max)).into()
            }
            _ => text.into(),
        }
    }
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
