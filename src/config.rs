use anyhow::{anyhow, Context, Result};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Configuration - environment variables, optionally from a .env file
// ============================================================================
//
// Unset variables fall back to their defaults. A variable that is set but
// does not parse is an error.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    pub grpc_port: u16,
    pub infra_port: u16,
    pub postgres: PostgresConfig,
    pub kafka: KafkaConfig,
    pub publisher: PublisherConfig,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub message_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub channel_buffer: usize,
    pub max_in_flight: usize,
    pub close_timeout: Duration,
}

const DEFAULT_PG_PORT: u16 = 5432;

impl Config {
    /// Read the process environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let (host, port) = split_host_port(&vars.string("PG_HOST", "localhost:5432"))?;

        let config = Self {
            grpc_port: vars.parse("GRPC_PORT", 50000)?,
            infra_port: vars.parse("INFRA_HTTP_PORT", 4000)?,
            postgres: PostgresConfig {
                host,
                port,
                dbname: vars.string("PG_DBNAME", "users_db"),
                username: vars.string("PG_USERNAME", "db_user"),
                password: vars.string("PG_PASSWORD", "pwd123"),
                max_connections: vars.parse("PG_MAX_CONNECTIONS", 10)?,
            },
            kafka: KafkaConfig {
                brokers: vars.string("PRODUCER_BROKERS", "localhost:9092"),
                message_timeout: Duration::from_millis(vars.parse("KAFKA_MESSAGE_TIMEOUT_MS", 5000)?),
            },
            publisher: PublisherConfig {
                channel_buffer: vars.positive("PUBLISHER_CHANNEL_BUFFER", 1024)?,
                max_in_flight: vars.positive("PUBLISHER_MAX_IN_FLIGHT", 256)?,
                close_timeout: Duration::from_millis(vars.parse("PUBLISHER_CLOSE_TIMEOUT_MS", 5000)?),
            },
        };

        Ok(config)
    }
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match (self.0)(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid value for {key}: {raw:?}")),
            None => Ok(default),
        }
    }

    fn positive(&self, key: &str, default: usize) -> Result<usize> {
        match self.parse(key, default)? {
            0 => Err(anyhow!("{key} must be greater than zero")),
            n => Ok(n),
        }
    }
}

fn split_host_port(raw: &str) -> Result<(String, u16)> {
    match raw.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .with_context(|| format!("invalid port in PG_HOST: {raw:?}"))?;
            Ok((host.to_string(), port))
        }
        None => Ok((raw.to_string(), DEFAULT_PG_PORT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.grpc_port, 50000);
        assert_eq!(config.infra_port, 4000);
        assert_eq!(config.postgres.host, "localhost");
        assert_eq!(config.postgres.port, 5432);
        assert_eq!(config.postgres.dbname, "users_db");
        assert_eq!(config.postgres.username, "db_user");
        assert_eq!(config.postgres.password, "pwd123");
        assert_eq!(config.postgres.max_connections, 10);
        assert_eq!(config.kafka.brokers, "localhost:9092");
        assert_eq!(config.kafka.message_timeout, Duration::from_millis(5000));
        assert_eq!(config.publisher.channel_buffer, 1024);
        assert_eq!(config.publisher.max_in_flight, 256);
        assert_eq!(config.publisher.close_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("GRPC_PORT", "6000"),
            ("PG_HOST", "db.internal:6432"),
            ("PRODUCER_BROKERS", "k1:9092,k2:9092"),
            ("PUBLISHER_MAX_IN_FLIGHT", "8"),
        ])
        .unwrap();

        assert_eq!(config.grpc_port, 6000);
        assert_eq!(config.postgres.host, "db.internal");
        assert_eq!(config.postgres.port, 6432);
        assert_eq!(config.kafka.brokers, "k1:9092,k2:9092");
        assert_eq!(config.publisher.max_in_flight, 8);
    }

    #[test]
    fn test_pg_host_without_port_uses_default_port() {
        let config = config_from(&[("PG_HOST", "postgres")]).unwrap();

        assert_eq!(config.postgres.host, "postgres");
        assert_eq!(config.postgres.port, 5432);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config_from(&[("GRPC_PORT", "not-a-port")]).is_err());
        assert!(config_from(&[("PG_HOST", "db:abc")]).is_err());
        assert!(config_from(&[("PUBLISHER_CHANNEL_BUFFER", "0")]).is_err());
        assert!(config_from(&[("KAFKA_MESSAGE_TIMEOUT_MS", "-1")]).is_err());
    }
}
