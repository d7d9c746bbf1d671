use anyhow::{Result, bail};
use serde::Deserialize;
use std::path::PathBuf;

fn default_timeout_secs() -> u64 {
    15
}
fn default_max_attempts() -> u32 {
    5
}
fn default_country() -> String {
    "US".to_string()
}
fn default_verbose() -> bool {
    false
}

/// Optional settings file. Everything has a default; the file only
/// needs to exist when the access token is not in the environment.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_verbose")]
    pub verbose: bool,
    #[serde(default)]
    pub mapbox: Option<MapboxConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapboxConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts per address before giving up on it
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// ISO country code the lookup is restricted to
    #[serde(default = "default_country")]
    pub country: String,
}

impl Default for MapboxConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            country: default_country(),
        }
    }
}

impl FileConfig {
    pub fn load() -> Option<Self> {
        let config_paths = get_config_paths();

        for path in config_paths {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => return Some(config),
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("geoaid.toml"));
    paths.push(PathBuf::from(".geoaid.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("geoaid").join("config.toml"));
        paths.push(config_dir.join("geoaid.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".geoaid.toml"));
        paths.push(home.join(".config").join("geoaid").join("config.toml"));
    }

    paths
}

/// The Mapbox token comes from the environment first, then the settings
/// file. Missing both is a startup failure.
pub fn resolve_access_token(file_config: Option<&FileConfig>) -> Result<String> {
    pick_access_token(
        std::env::var("MAPBOX_ACCESS_TOKEN").ok(),
        file_config.and_then(|c| c.access_token.as_deref()),
    )
}

fn pick_access_token(env_token: Option<String>, file_token: Option<&str>) -> Result<String> {
    if let Some(token) = env_token
        && !token.trim().is_empty()
    {
        return Ok(token);
    }

    if let Some(token) = file_token
        && !token.trim().is_empty()
    {
        return Ok(token.to_string());
    }

    bail!(
        "Missing Mapbox access token. Set the MAPBOX_ACCESS_TOKEN environment variable \
         or add access_token to geoaid.toml."
    )
}
