mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./tubeproxy.toml",
        "~/.config/tubeproxy/config.toml",
        "/etc/tubeproxy/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // The frontend build sits next to the backend in a checkout
    let mut config = Config::default();
    let bundled = Path::new("../frontend/dist");
    if bundled.is_dir() {
        config.server.static_dir = Some(bundled.to_path_buf());
    }
    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    let upstream = &config.upstream;
    if upstream.connect_timeout_secs == 0
        || upstream.probe_timeout_secs == 0
        || upstream.idle_timeout_secs == 0
        || upstream.acquire_timeout_secs == 0
    {
        anyhow::bail!("Upstream timeouts must be greater than 0");
    }
    if upstream.max_connections == 0 {
        anyhow::bail!("upstream.max_connections must be greater than 0");
    }

    if config.search.default_limit == 0 {
        anyhow::bail!("search.default_limit must be greater than 0");
    }
    if config.search.default_limit > config.search.max_limit {
        anyhow::bail!(
            "search.default_limit ({}) exceeds search.max_limit ({})",
            config.search.default_limit,
            config.search.max_limit
        );
    }

    if let Some(ref dir) = config.server.static_dir {
        if !dir.exists() {
            tracing::warn!("Static directory does not exist: {:?}", dir);
        }
    }

    Ok(())
}
