// Emulator configuration
//
// Loaded from a TOML file next to the executable; missing or unreadable
// files fall back to defaults so a bare checkout runs out of the box.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable emulator behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Panic on undocumented opcodes outside the tolerated NOP set.
    /// Such opcodes almost always mean an emulation bug rather than
    /// intentional software behavior.
    pub strict_illegal: bool,

    /// Panic on CPU test-mode accesses ($4018-$401F); when off they read
    /// as open bus
    pub strict_io: bool,

    /// Window scale factor for the shell
    pub scale: u32,

    /// Master switch for host audio output
    pub audio_enabled: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        EmulatorConfig {
            strict_illegal: true,
            strict_io: true,
            scale: 2,
            audio_enabled: true,
        }
    }
}

impl EmulatorConfig {
    /// Read the config file, falling back to defaults on any failure
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(text) => match toml::from_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!(
                        "bad config file {}: {}; using defaults",
                        path.as_ref().display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Write the current settings back out as TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let text = toml::to_string_pretty(self).expect("config is always serializable");
        std::fs::write(path, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_strict() {
        let config = EmulatorConfig::default();
        assert!(config.strict_illegal);
        assert!(config.strict_io);
    }

    #[test]
    fn test_partial_toml_fills_in_defaults() {
        let config: EmulatorConfig = toml::from_str("strict_illegal = false").unwrap();
        assert!(!config.strict_illegal);
        assert!(config.strict_io);
        assert_eq!(config.scale, 2);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = EmulatorConfig::load_or_default("/nonexistent/famicore.toml");
        assert!(config.audio_enabled);
    }
}
