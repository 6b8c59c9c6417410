//! [`Config`]-related definitions.

use std::time;

use common::Percent;
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use rust_decimal::Decimal;
use serde::Deserialize;
use service::domain::{booking, pricing};
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// Whether error responses expose backtraces.
    pub development: bool,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Default [`Service::vat`].
#[expect(unsafe_code, reason = "within `0..=100` range")]
const DEFAULT_VAT: Percent =
    unsafe { Percent::new_unchecked(Decimal::from_parts(7, 0, 0, false, 0)) };

/// Default [`Service::platform_fee`].
#[expect(unsafe_code, reason = "within `0..=100` range")]
const DEFAULT_PLATFORM_FEE: Percent =
    unsafe { Percent::new_unchecked(Decimal::from_parts(15, 0, 0, false, 0)) };

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [JWT] secret.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default("secret".to_owned())]
    pub jwt_secret: String,

    /// How long an issued session token stays valid.
    #[default(time::Duration::from_secs(60 * 60 * 24))]
    #[serde(with = "humantime_serde")]
    pub session_ttl: time::Duration,

    /// How long a quotation may be accepted after its creation.
    #[default(time::Duration::from_secs(60 * 60 * 24 * 7))]
    #[serde(with = "humantime_serde")]
    pub quotation_validity: time::Duration,

    /// Value-added tax applied to quote summaries, in percent.
    #[default(DEFAULT_VAT)]
    pub vat: Percent,

    /// Part of a booking total kept by the platform, in percent.
    #[default(DEFAULT_PLATFORM_FEE)]
    pub platform_fee: Percent,

    /// Who may drive booking status transitions.
    pub booking_policy: booking::Policy,

    /// Pricing tables used for estimates.
    pub pricing: pricing::Policy,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            jwt_secret,
            session_ttl,
            quotation_validity,
            vat,
            platform_fee,
            booking_policy,
            pricing,
        } = value;
        Self {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            session_ttl,
            quotation_validity,
            pricing,
            vat,
            platform_fee,
            booking_policy,
        }
    }
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("cleaning".to_owned())]
    pub dbname: String,

    /// Maximum number of pooled connections.
    #[default(16)]
    pub max_connections: usize,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
            max_connections,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            pool: Some(service::infra::postgres::PoolConfig::new(
                max_connections,
            )),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use config::{File, FileFormat};
    use rust_decimal::Decimal;
    use service::domain::booking;

    use super::Config;

    fn parse(toml: &str) -> Config {
        config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn falls_back_to_defaults() {
        let conf = Config::new("definitely-missing.toml").unwrap();

        assert_eq!(conf.server.port, 8080);
        assert!(!conf.server.development);
        assert_eq!(
            conf.service.quotation_validity,
            Duration::from_secs(7 * 24 * 60 * 60),
        );
        assert_eq!(conf.service.vat.value(), Decimal::from(7));
        assert_eq!(conf.service.platform_fee.value(), Decimal::from(15));
        assert_eq!(conf.service.booking_policy, booking::Policy::Party);
    }

    #[test]
    fn reads_service_section() {
        let conf = parse(
            r#"
            [server]
            development = true

            [service]
            session_ttl = "2h"
            quotation_validity = "3days"
            vat = 10
            booking_policy = "strict"

            [service.pricing]
            base_duration = 90

            [service.pricing.base_rates]
            deep_cleaning = "50.5"

            [service.pricing.multipliers]
            house = "1.5"
            "#,
        );

        assert!(conf.server.development);
        assert_eq!(conf.service.session_ttl, Duration::from_secs(2 * 60 * 60));
        assert_eq!(
            conf.service.quotation_validity,
            Duration::from_secs(3 * 24 * 60 * 60),
        );
        assert_eq!(conf.service.vat.value(), Decimal::from(10));
        assert_eq!(conf.service.booking_policy, booking::Policy::Strict);

        let pricing = &conf.service.pricing;
        assert_eq!(pricing.base_duration.get(), 90);
        assert_eq!(pricing.per_bedroom.get(), 30);
        assert_eq!(pricing.base_rates.deep_cleaning, Decimal::new(505, 1));
        assert_eq!(pricing.base_rates.general_cleaning, Decimal::from(30));
        assert_eq!(pricing.multipliers.house, Decimal::new(15, 1));
    }

    #[test]
    fn rejects_out_of_range_percents() {
        let res = config::Config::builder()
            .add_source(File::from_str(
                "[service]\nplatform_fee = 150",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize::<Config>();

        assert!(res.is_err());
    }

    #[test]
    fn converts_into_service_config() {
        let conf = service::Config::from(Config::default().service);

        assert_eq!(conf.session_ttl, Duration::from_secs(24 * 60 * 60));
        assert_eq!(conf.platform_fee.value(), Decimal::from(15));
        assert_eq!(conf.pricing.default_square_feet, 1000);
    }
}
