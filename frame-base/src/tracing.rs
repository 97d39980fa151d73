use std::str::FromStr as _;

use frame::StdError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::ConfigSection;

/// Global subscriber setup driven by [`TracingConfig`].
pub struct Tracing;

impl Tracing {
    /// Installs the global subscriber.
    ///
    /// Returns `Ok(false)` when a global subscriber was already installed, in
    /// which case the existing one is kept.
    pub fn init(config: &TracingConfig) -> Result<bool, StdError> {
        let mut directives = Vec::new();
        for directive in &config.directives {
            directives.push(directive.parse::<Directive>()?);
        }
        let installed = tracing_subscriber::registry()
            .with(new_env_filter(directives, config.level))
            .with(tracing_subscriber::fmt::Layer::default())
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!(level = %config.level, "Tracing installed");
        }
        Ok(installed)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TracingConfig {
    #[serde(
        serialize_with = "serialize_level",
        deserialize_with = "deserialize_level",
        default = "default_level"
    )]
    pub level: tracing::Level,
    #[serde(default)]
    pub directives: Vec<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directives: Vec::new(),
        }
    }
}

impl ConfigSection for TracingConfig {
    fn key() -> &'static str {
        "tracing"
    }
}

fn new_env_filter(directives: Vec<Directive>, level: tracing::Level) -> EnvFilter {
    directives
        .into_iter()
        .fold(EnvFilter::default(), EnvFilter::add_directive)
        .add_directive(level.into())
}

fn serialize_level<S>(v: &tracing::Level, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(v.as_str())
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<tracing::Level, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    String::deserialize(deserializer)
        .and_then(|v| tracing::Level::from_str(&v).map_err(|v| Error::custom(format!("{v}"))))
}

fn default_level() -> tracing::Level {
    tracing::Level::INFO
}
