use std::collections::BTreeMap;
use std::path::Path;

use frame::{Descriptor, Module, Registry, StdError};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Application configuration made of named JSON sections.
///
/// Registering the config as a [`Module`] makes `Arc<Config>` resolvable from
/// the provider.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    sections: BTreeMap<String, serde_json::Value>,
}

/// A typed section of [`Config`] stored under a fixed key.
///
/// Missing sections fall back to `Default`.
pub trait ConfigSection: DeserializeOwned + Default {
    fn key() -> &'static str;
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: impl AsRef<str>) -> Result<Self, StdError> {
        Ok(serde_json::from_str(text.as_ref())?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StdError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading config");
        let text = tokio::fs::read_to_string(path).await?;
        Self::parse(text)
    }

    /// Reads a typed section, returning its default when the key is absent.
    pub fn section<T>(&self) -> Result<T, StdError>
    where
        T: ConfigSection,
    {
        match self.sections.get(T::key()) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(T::default()),
        }
    }

    /// Reads an arbitrary value by key.
    pub fn get<T>(&self, key: &str) -> Result<Option<T>, StdError>
    where
        T: DeserializeOwned,
    {
        self.sections
            .get(key)
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(Into::into)
    }

    pub fn set<T>(&mut self, key: impl Into<String>, value: &T) -> Result<(), StdError>
    where
        T: Serialize,
    {
        self.sections.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Stores a typed section under its key.
    pub fn with_section<T>(mut self, value: &T) -> Result<Self, StdError>
    where
        T: ConfigSection + Serialize,
    {
        self.set(T::key(), value)?;
        Ok(self)
    }

    /// Overlays `other` on top of this config.
    ///
    /// Objects are merged key by key, any other value is replaced.
    pub fn merge(&mut self, other: Config) {
        for (key, value) in other.sections {
            overlay(
                self.sections.entry(key).or_insert(serde_json::Value::Null),
                value,
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }
}

impl Module for Config {
    fn register(&self, registry: &mut Registry) {
        let config = self.clone();
        registry.add(Descriptor::singleton(move |_| Ok(config.clone())));
    }
}

fn overlay(lhs: &mut serde_json::Value, rhs: serde_json::Value) {
    match (lhs, rhs) {
        (serde_json::Value::Object(l), serde_json::Value::Object(r)) => {
            for (key, value) in r {
                overlay(l.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (lhs, rhs) => *lhs = rhs,
    }
}
