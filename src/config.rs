// Copyright (c) 2025 - Cowboy AI, Inc.

//! Configuration consumed by the integration layer
//!
//! Loading happens once in the composition root; components receive the
//! typed sections they need. Everything can be read from the process
//! environment:
//!
//! | Variable | Default |
//! |---|---|
//! | `NATS_URL` | `nats://localhost:4222` |
//! | `NATS_CLIENT_NAME` | `product-service` |
//! | `EVENTS_EXCHANGE` | `events` |
//! | `BROKER_RETRY_LIMIT` | `5` |
//! | `BROKER_RETRY_DELAY_MS` | `5000` |
//! | `BROKER_RETRY_MULTIPLIER` | `1.0` |
//! | `BROKER_RETRY_MAX_DELAY_MS` | `60000`, never below the base delay |
//! | `REDIS_HOST` | `localhost` |
//! | `REDIS_PORT` | `6379` |
//! | `CACHE_TTL_SECS` | `60` |

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::subjects::DEFAULT_EXCHANGE;

/// Configuration loading errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was present but could not be parsed
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Configuration for NATS connection
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    /// Connection timeout per dial attempt
    pub connect_timeout: Duration,
    /// Request timeout (JetStream API calls, publish acks)
    pub request_timeout: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "product-service".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Bounded retry policy for establishing the broker connection
///
/// The reference behavior is a constant delay (`multiplier == 1.0`).
/// Larger deployments can opt into capped exponential backoff. The delay
/// never grows past `max_delay`, so a base delay at or above the cap stays
/// constant whatever the multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total dial attempts, including the first
    pub attempts: u32,
    /// Delay after the first failed attempt
    pub delay: Duration,
    /// Growth factor applied to the delay after each failure
    pub multiplier: f64,
    /// Upper bound for the delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(5),
            multiplier: 1.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Constant-delay policy
    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
            multiplier: 1.0,
            max_delay: delay,
        }
    }

    /// Switch to exponential backoff capped at `max_delay`
    pub fn with_backoff(mut self, multiplier: f64, max_delay: Duration) -> Self {
        self.multiplier = multiplier;
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after the `failures`-th failed attempt (1-based)
    pub fn delay_after(&self, failures: u32) -> Duration {
        if self.multiplier <= 1.0 || failures <= 1 {
            return self.delay;
        }

        let exponent = i32::try_from(failures - 1).unwrap_or(i32::MAX);
        let scaled = self.delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }
}

/// Cache tier configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Redis host
    pub host: String,
    /// Redis port
    pub port: u16,
    /// TTL applied when a write does not specify one
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            default_ttl: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Redis connection URL
    pub fn url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }
}

/// Everything the product service composition root needs
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub nats: NatsConfig,
    pub exchange: String,
    pub retry: RetryPolicy,
    pub cache: CacheConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig::default(),
            exchange: DEFAULT_EXCHANGE.to_string(),
            retry: RetryPolicy::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let servers = lookup("NATS_URL")
            .map(|urls| {
                urls.split(',')
                    .map(|url| url.trim().to_string())
                    .filter(|url| !url.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|servers| !servers.is_empty())
            .unwrap_or(defaults.nats.servers);

        let nats = NatsConfig {
            servers,
            name: lookup("NATS_CLIENT_NAME").unwrap_or(defaults.nats.name),
            ..defaults.nats
        };

        let exchange = lookup("EVENTS_EXCHANGE").unwrap_or(defaults.exchange);

        let attempts = parse(&lookup, "BROKER_RETRY_LIMIT")?.unwrap_or(defaults.retry.attempts);
        let delay = parse::<u64, _>(&lookup, "BROKER_RETRY_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.delay);
        let multiplier: f64 =
            parse(&lookup, "BROKER_RETRY_MULTIPLIER")?.unwrap_or(defaults.retry.multiplier);
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                key: "BROKER_RETRY_MULTIPLIER".to_string(),
                value: multiplier.to_string(),
                reason: "must be a finite number >= 1.0".to_string(),
            });
        }
        // Unset cap: the default cap, raised to the base delay when larger
        let max_delay = parse::<u64, _>(&lookup, "BROKER_RETRY_MAX_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.max_delay)
            .max(delay);
        let retry = RetryPolicy {
            attempts,
            delay,
            multiplier,
            max_delay,
        };

        let cache = CacheConfig {
            host: lookup("REDIS_HOST").unwrap_or(defaults.cache.host),
            port: parse(&lookup, "REDIS_PORT")?.unwrap_or(defaults.cache.port),
            default_ttl: parse::<u64, _>(&lookup, "CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache.default_ttl),
        };

        Ok(Self {
            nats,
            exchange,
            retry,
            cache,
        })
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                key: key.to_string(),
                value,
                reason: e.to_string(),
            }),
    }
}
