use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};

use super::{Database, ParseError, Uploads};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub db: Database,
    #[serde(default)]
    pub uploads: Uploads,
    /// **Environment variables**: `WAYPOINT_IP`
    #[serde(default = "Server::default_ip")]
    pub ip: IpAddr,
    /// **Environment variables**: `WAYPOINT_PORT`
    #[serde(default = "Server::default_port")]
    pub port: u16,
    /// Environment mode. Controls the CORS origin list and whether
    /// error responses include internal detail.
    ///
    /// **Environment variables**: `WAYPOINT_ENVIRONMENT`
    #[serde(default)]
    pub environment: Environment,
    /// Frontend origins allowed by the CORS layer.
    ///
    /// **Environment variables**: `WAYPOINT_ALLOWED_ORIGINS`
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Secret used to verify externally issued bearer tokens.
    ///
    /// **Environment variables**: `WAYPOINT_JWT_SECRET`
    pub jwt_secret: String,
}

impl Server {
    const DEFAULT_CONFIG_FILE: &'static str = "waypoint.toml";
    const DEFAULT_PORT: u16 = 8080;

    pub fn load() -> Result<Self, ParseError> {
        dotenvy::dotenv().ok();

        let config = Self::figment()
            .extract::<Self>()
            .map_err(|error| ParseError(Box::new(error)))?;

        Ok(config)
    }

    const fn default_ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    const fn default_port() -> u16 {
        Self::DEFAULT_PORT
    }

    /// Creates a default [`figment::Figment`] object to load server
    /// configuration. Split out from [`Server::load`] for testing.
    pub(crate) fn figment() -> figment::Figment {
        use figment::providers::{Env, Format, Toml};
        use figment::Figment;

        Figment::new()
            .merge(Toml::file(Self::DEFAULT_CONFIG_FILE))
            // The env provider splits on underscores, so fields that
            // contain one need an explicit alias.
            .merge(Env::prefixed("WAYPOINT_").map(|v| match v.as_str() {
                "DB_URL" => "db.url".into(),
                "DB_MIN_IDLE" => "db.min_idle".into(),
                "DB_POOL_SIZE" => "db.pool_size".into(),
                "DB_TIMEOUT_SECS" => "db.timeout_secs".into(),
                "DB_ENFORCE_TLS" => "db.enforce_tls".into(),

                "UPLOADS_DIR" => "uploads.dir".into(),
                "UPLOADS_PUBLIC_PREFIX" => "uploads.public_prefix".into(),
                "UPLOADS_MAX_SIZE" => "uploads.max_size".into(),

                "JWT_SECRET" => "jwt_secret".into(),
                "ALLOWED_ORIGINS" => "allowed_origins".into(),

                _ => v.as_str().replace('_', ".").into(),
            }))
            // Environment variable aliases
            .merge(Env::raw().map(|v| match v.as_str() {
                "DATABASE_URL" => "db.url".into(),
                _ => v.into(),
            }))
    }
}

#[cfg(test)]
impl Server {
    pub(crate) fn for_tests() -> Self {
        Self {
            db: Database {
                url: "postgres://postgres@localhost:5432/waypoint_test".into(),
                min_idle: None,
                pool_size: std::num::NonZeroU32::new(2).unwrap(),
                timeout_secs: std::num::NonZeroU64::new(1).unwrap(),
                enforce_tls: false,
            },
            uploads: Uploads::default(),
            ip: Self::default_ip(),
            port: 0,
            environment: Environment::Development,
            allowed_origins: Vec::new(),
            jwt_secret: "waypoint-test-secret".into(),
        }
    }
}
