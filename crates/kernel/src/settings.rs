use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "RESERVATION_ENV";
const CONFIG_DIR_ENV: &str = "RESERVATION_CONFIG_DIR";
const ENV_PREFIX: &str = "RESERVATION";

/// Logical id the gateway uses to address the backing service.
pub const RESERVATION_SERVICE_ID: &str = "reservation-service";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    /// Value served verbatim by the backing service's `/message` endpoint.
    #[serde(default = "Settings::default_message")]
    pub message: String,
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub channel: ChannelSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub seed: SeedSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    fn default_message() -> String {
        "Hello default".to_string()
    }

    /// Load configuration by layering `.env`, base file, environment overlay
    /// and `RESERVATION_*` variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .map(|cwd| cwd.join("config"))
                .with_context(|| "unable to resolve current directory")?,
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from an explicit directory and environment name.
    pub fn load_from(config_dir: &std::path::Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment = match environment {
            "local" => Environment::Local,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(anyhow!(
                    "unsupported environment '{}'; expected local/staging/production",
                    other
                ));
            }
        };

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parsed_environment;

        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            message: Self::default_message(),
            gateway: GatewaySettings::default(),
            service: ServiceSettings::default(),
            database: DatabaseSettings::default(),
            channel: ChannelSettings::default(),
            discovery: DiscoverySettings::default(),
            seed: SeedSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }

    fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// `host:port` string suitable for binding a listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

/// Gateway process settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewaySettings {
    #[serde(default)]
    pub server: ServerSettings,
    /// Discovery id of the backing service the read endpoints call.
    #[serde(default = "GatewaySettings::default_upstream_service")]
    pub upstream_service: String,
    /// Timeout applied to each upstream call before falling back.
    #[serde(default = "GatewaySettings::default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl GatewaySettings {
    fn default_upstream_service() -> String {
        RESERVATION_SERVICE_ID.to_string()
    }

    fn default_call_timeout_ms() -> u64 {
        1000
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            server: ServerSettings::with_port(8080),
            upstream_service: Self::default_upstream_service(),
            call_timeout_ms: Self::default_call_timeout_ms(),
        }
    }
}

/// Backing service process settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSettings {
    #[serde(default = "ServiceSettings::default_server")]
    pub server: ServerSettings,
}

impl ServiceSettings {
    fn default_server() -> ServerSettings {
        ServerSettings::with_port(8000)
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            server: Self::default_server(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "DatabaseSettings::default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "sqlite::memory:".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }

    fn default_connect_timeout_secs() -> u64 {
        30
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
            connect_timeout_secs: Self::default_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelSettings {
    /// Inbound endpoint of the backing service used when the gateway runs
    /// as its own process.
    #[serde(default = "ChannelSettings::default_relay_url")]
    pub relay_url: String,
}

impl ChannelSettings {
    fn default_relay_url() -> String {
        "http://127.0.0.1:8000/channel/input".to_string()
    }
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            relay_url: Self::default_relay_url(),
        }
    }
}

/// Static service registry: service id to instance base URLs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoverySettings {
    #[serde(default = "DiscoverySettings::default_services")]
    pub services: HashMap<String, Vec<String>>,
}

impl DiscoverySettings {
    fn default_services() -> HashMap<String, Vec<String>> {
        HashMap::from([(
            RESERVATION_SERVICE_ID.to_string(),
            vec!["http://127.0.0.1:8000".to_string()],
        )])
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            services: Self::default_services(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedSettings {
    #[serde(default = "SeedSettings::default_enabled")]
    pub enabled: bool,
    #[serde(default = "SeedSettings::default_names")]
    pub names: Vec<String>,
}

impl SeedSettings {
    fn default_enabled() -> bool {
        true
    }

    fn default_names() -> Vec<String> {
        [
            "Dr bilel",
            "DR Moez",
            "Dr thierry",
            "Dr Luc",
            "Dr Nicolas",
            "Dr olivier",
            "Dr Dominique",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            names: Self::default_names(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Fallback filter directive when `RUST_LOG` is unset.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
