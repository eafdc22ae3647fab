//! Configuration settings and validation.

use crate::decoder::HEADER_SIZE;
use crate::mask;
use crate::{Error, Result};
use std::path::PathBuf;

/// Longest file name the kernel can report, excluding the terminator.
const NAME_MAX: usize = 255;

/// Smallest read buffer the kernel accepts for a full record.
pub const MIN_READ_SIZE: usize = HEADER_SIZE + NAME_MAX + 1;

/// Largest read buffer we allow.
pub const MAX_READ_SIZE: usize = 1024 * 1024;

/// Main configuration for the watcher.
#[derive(Debug, Clone)]
pub struct Config {
    /// Paths to watch.
    pub paths: Vec<PathBuf>,

    /// Event names to watch for (see [`mask::parse`]).
    pub events: Vec<String>,

    /// Remove each watch after its first event.
    pub oneshot: bool,

    /// Refuse paths that are not directories.
    pub only_dir: bool,

    /// Watch symlinks themselves rather than their targets.
    pub dont_follow: bool,

    /// Bytes requested per read.
    pub read_size: usize,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Stop after this many events.
    pub count: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            events: vec!["ALL_EVENTS".to_string()],
            oneshot: false,
            only_dir: false,
            dont_follow: false,
            read_size: crate::inotify::DEFAULT_READ_SIZE,
            log_level: "info".to_string(),
            count: None,
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.paths.is_empty() {
            return Err(Error::config("at least one path to watch is required"));
        }

        if self.read_size < MIN_READ_SIZE {
            return Err(Error::config(format!(
                "read_size must be at least {MIN_READ_SIZE} bytes"
            )));
        }

        if self.read_size > MAX_READ_SIZE {
            return Err(Error::config(format!(
                "read_size cannot exceed {MAX_READ_SIZE} bytes"
            )));
        }

        if self.count == Some(0) {
            return Err(Error::config("count cannot be 0"));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        self.watch_mask().map(drop)
    }

    /// Combined watch mask for every path.
    ///
    /// # Errors
    ///
    /// Returns an error if an event name is unknown or no events are given.
    pub fn watch_mask(&self) -> Result<u32> {
        let mut bits = mask::parse_list(&self.events)
            .map_err(|name| Error::config(format!("unknown event name '{name}'")))?;
        if bits & mask::IN_ALL_EVENTS == 0 {
            return Err(Error::config("no events selected"));
        }

        if self.oneshot {
            bits |= mask::IN_ONESHOT;
        }
        if self.only_dir {
            bits |= mask::IN_ONLYDIR;
        }
        if self.dont_follow {
            bits |= mask::IN_DONT_FOLLOW;
        }
        Ok(bits)
    }

    /// Flags for opening the queue.
    #[must_use]
    pub fn init_flags(&self) -> i32 {
        mask::IN_NONBLOCK | mask::IN_CLOEXEC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_path() -> Config {
        Config {
            paths: vec![PathBuf::from("/tmp")],
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.read_size, 0x1000);
        assert_eq!(config.events, vec!["ALL_EVENTS".to_string()]);
        assert!(config.validate().is_err());
        assert!(with_path().validate().is_ok());
    }

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert!(config.paths.is_empty());
    }

    #[test]
    fn test_validate_no_paths() {
        let err = Config::new().validate().unwrap_err();
        assert!(err.to_string().contains("path"));
    }

    #[test]
    fn test_validate_read_size_bounds() {
        let config = Config {
            read_size: MIN_READ_SIZE - 1,
            ..with_path()
        };
        assert!(config.validate().unwrap_err().to_string().contains("272"));

        let config = Config {
            read_size: MIN_READ_SIZE,
            ..with_path()
        };
        assert!(config.validate().is_ok());

        let config = Config {
            read_size: MAX_READ_SIZE + 1,
            ..with_path()
        };
        assert!(config.validate().unwrap_err().to_string().contains("exceed"));
    }

    #[test]
    fn test_validate_zero_count() {
        let config = Config {
            count: Some(0),
            ..with_path()
        };
        assert!(config.validate().unwrap_err().to_string().contains("count"));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = Config {
            log_level: "invalid".to_string(),
            ..with_path()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log level"));
    }

    #[test]
    fn test_log_level_case_insensitive() {
        for level in ["TRACE", "Debug", "INFO", "Warn", "ERROR"] {
            let config = Config {
                log_level: level.to_string(),
                ..with_path()
            };
            assert!(
                config.validate().is_ok(),
                "Level '{level}' should be valid (case insensitive)"
            );
        }
    }

    #[test]
    fn test_unknown_event_name() {
        let config = Config {
            events: vec!["modify".to_string(), "explode".to_string()],
            ..with_path()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'explode'"));
    }

    #[test]
    fn test_flags_only_is_rejected() {
        let config = Config {
            events: vec!["oneshot".to_string()],
            ..with_path()
        };
        assert!(config.watch_mask().is_err());
    }

    #[test]
    fn test_watch_mask_with_flags() {
        let config = Config {
            events: vec!["create".to_string(), "IN_DELETE".to_string()],
            oneshot: true,
            only_dir: true,
            dont_follow: true,
            ..with_path()
        };
        assert_eq!(
            config.watch_mask().unwrap(),
            mask::IN_CREATE
                | mask::IN_DELETE
                | mask::IN_ONESHOT
                | mask::IN_ONLYDIR
                | mask::IN_DONT_FOLLOW
        );
    }

    #[test]
    fn test_init_flags_are_nonblocking() {
        let flags = Config::new().init_flags();
        assert_ne!(flags & mask::IN_NONBLOCK, 0);
        assert_ne!(flags & mask::IN_CLOEXEC, 0);
    }
}
