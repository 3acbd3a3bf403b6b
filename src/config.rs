use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Shades for color indices 0..3, lightest first.
pub const DEFAULT_PALETTE: [u32; 4] = [0xE0F8D0, 0x88C070, 0x346856, 0x081820];

const MAX_SCALE: u32 = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("scale must be between 1 and 16, got {0}")]
    InvalidScale(u32),
    #[error("palette shade {index} is not a 0xRRGGBB value: {value:#X}")]
    InvalidShade { index: usize, value: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub boot_rom_path: Option<PathBuf>,
    /// Frames to run when no cycle count is given.
    pub frames: u64,
    /// Integer upscaling of the PNG output.
    pub scale: u32,
    pub palette: [u32; 4],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            boot_rom_path: None,
            frames: 60,
            scale: 1,
            palette: DEFAULT_PALETTE,
        }
    }
}

impl Config {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Strict load, for a path the user asked for explicitly.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SCALE).contains(&self.scale) {
            return Err(ConfigError::InvalidScale(self.scale));
        }
        if let Some((index, &value)) = self
            .palette
            .iter()
            .enumerate()
            .find(|&(_, &v)| v > 0xFF_FFFF)
        {
            return Err(ConfigError::InvalidShade { index, value });
        }
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("vibedmg").join("config.toml");
        }
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("vibedmg").join("config.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("vibedmg")
            .join("config.toml");
    }

    PathBuf::from("config.toml")
}

/// Lenient load for the default location: a missing file is silent, a bad
/// one is a warning, and either way the defaults are used.
pub fn load_or_default(path: &Path) -> Config {
    let Ok(text) = std::fs::read_to_string(path) else {
        return Config::default();
    };

    match Config::parse(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to load config {}: {e}; using defaults",
                path.display()
            );
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = Config::parse("frames = 5\n").unwrap();
        assert_eq!(cfg.frames, 5);
        assert_eq!(cfg.scale, 1);
        assert_eq!(cfg.palette, DEFAULT_PALETTE);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            Config::parse("scale = 0"),
            Err(ConfigError::InvalidScale(0))
        ));
        assert!(matches!(
            Config::parse("palette = [0, 0, 0x1000000, 0]"),
            Err(ConfigError::InvalidShade { index: 2, .. })
        ));
    }
}
