//! Bridge configuration.
//!
//! [`BridgeConfig`] controls which graphics APIs the bridge accepts, which
//! input events it forwards to the render thread, how the published texture is
//! sampled, and how the optional [`RenderLoop`](crate::render_loop::RenderLoop)
//! paces itself.
//!
//! `BridgeConfig` provides sensible defaults via [`Default`] and a fluent
//! [`BridgeConfig::builder()`] for customization with validation.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use offscreen_bridge::config::BridgeConfig;
//! let cfg = BridgeConfig::default();
//! assert!(!cfg.accept_touch);
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use offscreen_bridge::config::BridgeConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = BridgeConfig::builder()
//!     .accept_touch(true)
//!     .smooth(false)
//!     .fps(30)
//!     .build()?;
//! # Ok(()) }
//! ```
//!
//! ## Load from JSON
//! ```rust
//! use offscreen_bridge::config::BridgeConfig;
//! let cfg = BridgeConfig::from_json_str(r#"{ "fps": 24, "continuous": true }"#).unwrap();
//! assert_eq!(cfg.fps, 24);
//! assert!(cfg.accept_hover);
//! ```

use crate::render::backend::GraphicsApi;
use serde::Deserialize;
use std::fmt;

/// Log verbosity for [`LoggingConfig`](crate::logging::LoggingConfig).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Graphics APIs the bridge can share a texture with.
    pub supported_apis: Vec<GraphicsApi>,
    /// Forward hover enter/move/leave events.
    pub accept_hover: bool,
    /// Forward touch events.
    pub accept_touch: bool,
    /// Sample the published texture with linear filtering.
    pub smooth: bool,
    /// Multisample count requested from the render window.
    pub multisamples: u32,
    /// Capacity of the bridge event broadcast channel.
    pub event_capacity: usize,
    /// Frame rate of the render loop when redrawing continuously.
    pub fps: u16,
    /// Let the render loop redraw at `fps` even without frame requests.
    pub continuous: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            supported_apis: vec![GraphicsApi::OpenGL, GraphicsApi::OpenGLRhi, GraphicsApi::Null],
            accept_hover: true,
            accept_touch: false,
            smooth: true,
            multisamples: 0,
            event_capacity: 64,
            fps: 60,
            continuous: false,
        }
    }
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: BridgeConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        validate(&cfg)?;
        Ok(cfg)
    }

    pub fn supports(&self, api: GraphicsApi) -> bool {
        self.supported_apis.contains(&api)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    inner: BridgeConfig,
}

impl BridgeConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut BridgeConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn supported_apis(self, apis: impl IntoIterator<Item = GraphicsApi>) -> Self {
        let apis: Vec<_> = apis.into_iter().collect();
        self.map(|c| c.supported_apis = apis)
    }
    pub fn accept_hover(self, on: bool) -> Self { self.map(|c| c.accept_hover = on) }
    pub fn accept_touch(self, on: bool) -> Self { self.map(|c| c.accept_touch = on) }
    pub fn smooth(self, on: bool) -> Self { self.map(|c| c.smooth = on) }
    pub fn multisamples(self, n: u32) -> Self { self.map(|c| c.multisamples = n) }
    pub fn event_capacity(self, n: usize) -> Self { self.map(|c| c.event_capacity = n) }
    pub fn fps(self, fps: u16) -> Self { self.map(|c| c.fps = fps) }
    pub fn continuous(self, on: bool) -> Self { self.map(|c| c.continuous = on) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut BridgeConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<BridgeConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NoSupportedApis,
    ZeroEventCapacity,
    ZeroFps,
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoSupportedApis => write!(f, "supported_apis must not be empty"),
            ConfigError::ZeroEventCapacity => write!(f, "event_capacity must be at least 1"),
            ConfigError::ZeroFps => write!(f, "fps must be at least 1"),
            ConfigError::Parse(msg) => write!(f, "cannot parse configuration: {msg}"),
        }
    }
}
impl std::error::Error for ConfigError {}

fn validate(c: &BridgeConfig) -> Result<(), ConfigError> {
    if c.supported_apis.is_empty() {
        return Err(ConfigError::NoSupportedApis);
    }
    if c.event_capacity == 0 {
        return Err(ConfigError::ZeroEventCapacity);
    }
    if c.fps == 0 {
        return Err(ConfigError::ZeroFps);
    }
    Ok(())
}
