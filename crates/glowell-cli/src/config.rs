//! Configuration file management for glowell.
//!
//! Provides a TOML-based config file at `~/.config/glowell/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use glowell_core::{GenerateConfig, SchemaVersion, ViolationPolicy};

pub const ENV_SCHEMA_VERSION: &str = "GLOWELL_SCHEMA_VERSION";
pub const ENV_VIOLATION_POLICY: &str = "GLOWELL_VIOLATION_POLICY";
pub const ENV_SERVE_PORT: &str = "GLOWELL_SERVE_PORT";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub generate: GenerateConfig,
    pub serve: ServeSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeSection {
    pub bind: String,
    pub port: u16,
    /// Answer plan requests with 503 instead of generating.
    pub maintenance: bool,
    /// Plans kept in the in-memory cache; 0 disables it.
    pub cache_capacity: usize,
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
            maintenance: false,
            cache_capacity: 256,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the glowell config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/glowell` or `~/.config/glowell`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("glowell");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("glowell")
}

/// Return the path to the glowell config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse a config file. Returns an error if it does not exist.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line, each overriding everything else.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub schema_version: Option<SchemaVersion>,
    pub policy: Option<ViolationPolicy>,
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct GlowellConfig {
    pub generate: GenerateConfig,
    pub serve: ServeSection,
}

impl GlowellConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Schema version: `--schema-version` > `GLOWELL_SCHEMA_VERSION` > `[generate].version` > `v2`
    /// - Policy: `--policy` > `GLOWELL_VIOLATION_POLICY` > `[generate].policy` > `redact`
    /// - Port: `--port` > `GLOWELL_SERVE_PORT` > `[serve].port` > 3000
    ///
    /// A missing default config file is fine; a missing `--config` file or an
    /// unparseable one is an error.
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let file = match &overrides.config_path {
            Some(path) => load_config(path)?,
            None => {
                let path = config_path();
                if path.exists() {
                    load_config(&path)?
                } else {
                    ConfigFile::default()
                }
            }
        };
        Self::resolve_with(file, overrides, |key| std::env::var(key).ok())
    }

    /// Env-free variant of [`resolve`](Self::resolve) for testing.
    pub fn resolve_with(
        file: ConfigFile,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let ConfigFile {
            mut generate,
            mut serve,
        } = file;

        if let Some(version) = overrides.schema_version {
            generate.version = version;
        } else if let Some(raw) = env(ENV_SCHEMA_VERSION) {
            generate.version = raw
                .parse()
                .with_context(|| format!("{ENV_SCHEMA_VERSION} env var is invalid"))?;
        }

        if let Some(policy) = overrides.policy {
            generate.policy = policy;
        } else if let Some(raw) = env(ENV_VIOLATION_POLICY) {
            generate.policy = raw
                .parse()
                .with_context(|| format!("{ENV_VIOLATION_POLICY} env var is invalid"))?;
        }

        if let Some(port) = overrides.port {
            serve.port = port;
        } else if let Some(raw) = env(ENV_SERVE_PORT) {
            serve.port = raw
                .parse()
                .with_context(|| format!("{ENV_SERVE_PORT} env var is not a port: {raw:?}"))?;
        }

        if let Some(bind) = &overrides.bind {
            serve.bind = bind.clone();
        }

        Ok(Self { generate, serve })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
