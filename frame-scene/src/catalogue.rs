use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use frame::StdError;
use serde::{Deserialize, Serialize};

use crate::SceneRef;

/// One loadable scene listed in a catalogue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    /// Screen identifier matched against the scene mapping.
    pub id: String,
    pub reference: SceneRef,
}

impl CatalogueEntry {
    pub fn new(id: impl Into<String>, reference: impl Into<SceneRef>) -> Self {
        Self {
            id: id.into(),
            reference: reference.into(),
        }
    }
}

/// Source of scene catalogues keyed by tag.
#[async_trait]
pub trait CatalogueLoader: Send + Sync {
    async fn load_catalogue(&self, tag: &str) -> Result<Vec<CatalogueEntry>, StdError>;
}

/// In-memory catalogues.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalogue {
    catalogues: HashMap<String, Vec<CatalogueEntry>>,
}

impl StaticCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, tag: impl Into<String>, entry: CatalogueEntry) -> Self {
        self.catalogues.entry(tag.into()).or_default().push(entry);
        self
    }

    pub fn with_catalogue(
        mut self,
        tag: impl Into<String>,
        entries: impl IntoIterator<Item = CatalogueEntry>,
    ) -> Self {
        self.catalogues
            .entry(tag.into())
            .or_default()
            .extend(entries);
        self
    }
}

#[async_trait]
impl CatalogueLoader for StaticCatalogue {
    async fn load_catalogue(&self, tag: &str) -> Result<Vec<CatalogueEntry>, StdError> {
        self.catalogues
            .get(tag)
            .cloned()
            .ok_or_else(|| format!("Unknown catalogue tag {tag:?}").into())
    }
}

/// Catalogues read from a JSON file mapping tags to entry lists.
///
/// ```json
/// {"scenes": [{"id": "menu", "reference": "scenes/menu"}]}
/// ```
///
/// The file is read on every load.
#[derive(Clone, Debug)]
pub struct JsonCatalogueLoader {
    path: PathBuf,
}

impl JsonCatalogueLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CatalogueLoader for JsonCatalogueLoader {
    async fn load_catalogue(&self, tag: &str) -> Result<Vec<CatalogueEntry>, StdError> {
        tracing::debug!(path = %self.path.display(), tag, "Loading catalogue");
        let text = tokio::fs::read_to_string(&self.path).await?;
        let mut catalogues: HashMap<String, Vec<CatalogueEntry>> = serde_json::from_str(&text)?;
        catalogues
            .remove(tag)
            .ok_or_else(|| format!("Unknown catalogue tag {tag:?}").into())
    }
}
