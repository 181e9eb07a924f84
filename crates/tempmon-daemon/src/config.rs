//! Configuration loading and validation

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tempmon_auth::exchange::{DEFAULT_SCOPE, DEFAULT_TOKEN_URL};
use tempmon_auth::Credentials;
use tempmon_core::style::{default_color_ramps, default_styles};
use tempmon_core::{
    ColorRampEntry, ColorRamps, DeviceSource, HeatmapSettings, StyleEntry, StyleMap,
    TempMonSettings, ViewableSettings,
};
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub devices: DeviceSource,
    #[serde(default)]
    pub viewables: ViewableSettings,
    #[serde(default)]
    pub heatmap: HeatmapSettings,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default = "default_styles", rename = "style")]
    pub styles: Vec<StyleEntry>,
    #[serde(default = "default_color_ramps", rename = "color_ramp")]
    pub color_ramps: Vec<ColorRampEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon: DaemonConfig::default(),
            auth: AuthConfig::default(),
            model: ModelConfig::default(),
            devices: DeviceSource::default(),
            viewables: ViewableSettings::default(),
            heatmap: HeatmapSettings::default(),
            telemetry: TelemetryConfig::default(),
            styles: default_styles(),
            color_ramps: default_color_ramps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory with the browser client bundle
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// TLS configuration (optional - enables HTTPS when present)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: default_static_dir(),
            tls: None,
        }
    }
}

/// TLS/HTTPS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM format)
    pub cert: String,
    /// Path to private key file (PEM format)
    pub key: String,
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_static_dir() -> String {
    "./client".to_string()
}

/// Application credentials for the view token endpoint
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub client_secret: Option<String>,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            token_url: default_token_url(),
            scope: default_scope(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .finish()
    }
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

impl AuthConfig {
    /// Both halves must be present and non-empty
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(Credentials::new(id, secret))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base64url-encoded model urn handed to the viewer
    #[serde(default)]
    pub urn: Option<String>,
    /// Path to the model snapshot (JSON)
    #[serde(default = "default_snapshot_path")]
    pub snapshot: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            urn: None,
            snapshot: default_snapshot_path(),
        }
    }
}

fn default_snapshot_path() -> String {
    "./model.json".to_string()
}

impl ModelConfig {
    /// Document id the viewer loads: `urn:<encoded urn>`
    pub fn document_id(&self) -> Option<String> {
        self.urn.as_ref().map(|urn| format!("urn:{}", urn))
    }

    /// The decoded object locator behind the urn
    pub fn decoded_urn(&self) -> Result<Option<String>> {
        let Some(urn) = &self.urn else {
            return Ok(None);
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(urn.trim_end_matches('='))
            .with_context(|| format!("Model urn is not base64url: {}", urn))?;
        let decoded = String::from_utf8(bytes).context("Model urn does not decode to text")?;
        Ok(Some(decoded))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Seed for reproducible random readings
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Config {
    /// Apply `FORGE_CLIENT_ID`, `FORGE_CLIENT_SECRET` and `PORT`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("FORGE_CLIENT_ID") {
            self.auth.client_id = Some(id);
        }
        if let Some(secret) = lookup("FORGE_CLIENT_SECRET") {
            self.auth.client_secret = Some(secret);
        }
        if let Some(port) = lookup("PORT") {
            match port.parse::<u16>() {
                Ok(port) => {
                    let host = self
                        .daemon
                        .bind
                        .rsplit_once(':')
                        .map(|(host, _)| host)
                        .unwrap_or("0.0.0.0");
                    self.daemon.bind = format!("{}:{}", host, port);
                }
                Err(_) => warn!(port = %port, "Ignoring invalid PORT"),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.heatmap.refresh_interval_ms == 0 {
            bail!("heatmap.refresh_interval_ms must be greater than zero");
        }
        if self.viewables.sprite_size == 0 {
            bail!("viewables.sprite_size must be greater than zero");
        }
        if let DeviceSource::Search { values, .. } = &self.devices {
            if values.is_empty() {
                warn!("Property search has no values; no devices will be placed");
            }
        }
        if let Some(urn) = self.model.decoded_urn()? {
            info!(urn = %urn, "Model urn");
        }
        Ok(())
    }

    /// Settings for the temperature monitor extension
    pub fn tempmon_settings(&self) -> TempMonSettings {
        TempMonSettings {
            devices: self.devices.clone(),
            styles: StyleMap::from_entries(&self.styles),
            color_ramps: ColorRamps::from_entries(&self.color_ramps),
            viewables: self.viewables.clone(),
            heatmap: self.heatmap.clone(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        config
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Config::default()
    };

    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}
