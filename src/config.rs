//! Renderer configuration.
//!
//! [`RenderConfig`] collects the few knobs the resource layer needs: where
//! local textures live, how long a remote texture fetch may block the render
//! thread and how the fallback texture looks. Everything has a default so
//! `RenderConfig::default()` is enough for most games.

use std::path::PathBuf;

use instant::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Root under which `assets/<domain>/<path>` texture lookups are resolved.
    pub resource_root: PathBuf,
    /// Upper bound for a single blocking texture download.
    pub fetch_timeout: Duration,
    /// `User-Agent` sent with texture downloads.
    pub user_agent: String,
    /// Edge length of the generated missing-texture checkerboard.
    pub missing_texture_size: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            resource_root: PathBuf::from("./"),
            fetch_timeout: Duration::from_secs(30),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            missing_texture_size: 16,
        }
    }
}

impl RenderConfig {
    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_root = root.into();
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_missing_texture_size(mut self, size: u32) -> Self {
        self.missing_texture_size = size;
        self
    }
}
