use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::{Context, eyre};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::shuffler::DEFAULT_PASSES;
use crate::snapshot::DEFAULT_SNAPSHOT_FILE;
use crate::spotify::auth::SpotifyApiCredentials;

const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/callback";
const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 300;
const DEFAULT_MARKET: &str = "US";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<String>,
    redirect_uri: String,
    snapshot_path: String,
    keep_snapshot: bool,
    shuffle_passes: usize,
    login_timeout_secs: u64,
    market: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            snapshot_path: DEFAULT_SNAPSHOT_FILE.to_string(),
            keep_snapshot: false,
            shuffle_passes: DEFAULT_PASSES,
            login_timeout_secs: DEFAULT_LOGIN_TIMEOUT_SECS,
            market: DEFAULT_MARKET.to_string(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("playlist-shuffler").join("config.toml"))
    }

    /// Load the default config file, falling back to built-in defaults if it
    /// doesn't exist.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the defaults to the config path, if no file is there yet.
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or(eyre!("No config directory on this platform"))?;
        if path.exists() {
            log::info!("Config file already exists at {}", path.display());
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(&Self::default())?;
        std::fs::write(&path, contents)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(path)
    }

    /// Expand ~ to home directory
    fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        Self::expand_path(&self.snapshot_path)
    }

    pub fn keep_snapshot(&self) -> bool {
        self.keep_snapshot
    }

    pub fn shuffle_passes(&self) -> usize {
        self.shuffle_passes.max(1)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    pub fn redirect_uri(&self) -> Result<Url> {
        Url::parse(&self.redirect_uri)
            .wrap_err_with(|| format!("Invalid redirect_uri: {}", self.redirect_uri))
    }

    /// Credentials given on the command line (or their env vars) win over the
    /// config file.
    pub fn credentials(
        &self,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Result<SpotifyApiCredentials> {
        let client_id = client_id
            .or_else(|| self.client_id.clone())
            .ok_or(eyre!("Missing Spotify client id, set SPOTIFY_ID"))?;
        let client_secret = client_secret
            .or_else(|| self.client_secret.clone())
            .ok_or(eyre!("Missing Spotify client secret, set SPOTIFY_SECRET"))?;
        Ok(SpotifyApiCredentials::new(
            client_id,
            client_secret,
            self.redirect_uri()?,
        ))
    }
}
