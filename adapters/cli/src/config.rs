//! Client settings resolved from defaults, an optional TOML file and flags.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use glam::Vec2;
use serde::Deserialize;
use thiserror::Error;

/// Server endpoint used when neither the file nor the flags name one.
pub(crate) const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8000/ws";
/// Tracing filter used when neither the file nor the flags name one.
pub(crate) const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_CANVAS: CanvasSize = CanvasSize {
    width: 1280,
    height: 720,
};

/// Failures while loading the configuration file.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config at {path}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config at {path}")]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: toml::de::Error,
    },
}

/// Canvas dimensions in pixels, written `WIDTHxHEIGHT` on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct CanvasSize {
    /// Width in pixels.
    pub(crate) width: u32,
    /// Height in pixels.
    pub(crate) height: u32,
}

impl CanvasSize {
    /// Canvas size as a screen-space vector.
    #[must_use]
    pub(crate) fn as_vec2(self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

impl fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for CanvasSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (width, height) = value
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| format!("`{part}` is not a positive pixel count"))
        };
        Ok(Self {
            width: parse(width)?,
            height: parse(height)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    server_url: Option<String>,
    canvas: Option<CanvasSize>,
    log_filter: Option<String>,
    sprite_manifest: Option<PathBuf>,
}

/// Values supplied on the command line; each one overrides the file.
#[derive(Debug, Default)]
pub(crate) struct Overrides {
    /// `--server`.
    pub(crate) server_url: Option<String>,
    /// `--canvas`.
    pub(crate) canvas: Option<CanvasSize>,
    /// `--log`.
    pub(crate) log_filter: Option<String>,
    /// `--sprites`.
    pub(crate) sprite_manifest: Option<PathBuf>,
}

/// Fully resolved client settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ClientConfig {
    /// WebSocket endpoint of the simulation server.
    pub(crate) server_url: String,
    /// Canvas the viewport maps onto.
    pub(crate) canvas: CanvasSize,
    /// Tracing filter directive.
    pub(crate) log_filter: String,
    /// Optional sprite manifest whose loads gate the asset latch.
    pub(crate) sprite_manifest: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_owned(),
            canvas: DEFAULT_CANVAS,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            sprite_manifest: None,
        }
    }
}

impl ClientConfig {
    /// Resolves settings from the optional file at `path` and the flags.
    pub(crate) fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::parse_file(&contents, path)?
            }
            None => FileConfig::default(),
        };

        let base = path.and_then(Path::parent).unwrap_or_else(|| Path::new(""));
        Ok(Self::merge(file, base, overrides))
    }

    /// Layers flags over file values over defaults. Relative manifest paths
    /// in the file are resolved against the file's directory.
    fn merge(file: FileConfig, base: &Path, overrides: Overrides) -> Self {
        let defaults = Self::default();
        Self {
            server_url: overrides
                .server_url
                .or(file.server_url)
                .unwrap_or(defaults.server_url),
            canvas: overrides.canvas.or(file.canvas).unwrap_or(defaults.canvas),
            log_filter: overrides
                .log_filter
                .or(file.log_filter)
                .unwrap_or(defaults.log_filter),
            sprite_manifest: overrides
                .sprite_manifest
                .or_else(|| file.sprite_manifest.map(|manifest| base.join(manifest))),
        }
    }

    fn parse_file(contents: &str, path: &Path) -> Result<FileConfig, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
