use frame::{DependencyError, StdError};

/// Failure of a scene lifecycle operation.
#[derive(Debug)]
pub enum SceneError {
    /// The content reference was invalid or the loader failed to materialize it.
    LoadFailure { id: String, source: StdError },
    /// The loader failed to tear the content down.
    UnloadFailure { id: String, source: StdError },
    /// Injection into the loaded content failed.
    StartFailure {
        id: String,
        source: DependencyError,
    },
}

impl SceneError {
    /// Identifier of the scene the operation was performed on.
    pub fn id(&self) -> &str {
        match self {
            SceneError::LoadFailure { id, .. }
            | SceneError::UnloadFailure { id, .. }
            | SceneError::StartFailure { id, .. } => id,
        }
    }
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::LoadFailure { id, source } => {
                write!(f, "Cannot load scene {id:?}: {source}")
            }
            SceneError::UnloadFailure { id, source } => {
                write!(f, "Cannot unload scene {id:?}: {source}")
            }
            SceneError::StartFailure { id, source } => {
                write!(f, "Cannot start bootstrap of scene {id:?}: {source}")
            }
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SceneError::LoadFailure { source, .. } | SceneError::UnloadFailure { source, .. } => {
                Some(source.as_ref())
            }
            SceneError::StartFailure { source, .. } => Some(source),
        }
    }
}

/// Failure of the navigation service itself.
#[derive(Debug)]
pub enum NavigationError {
    /// The scene catalogue could not be loaded.
    CatalogueLoad { tag: String, source: StdError },
}

impl std::fmt::Display for NavigationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationError::CatalogueLoad { tag, source } => {
                write!(f, "Cannot load catalogue {tag:?}: {source}")
            }
        }
    }
}

impl std::error::Error for NavigationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NavigationError::CatalogueLoad { source, .. } => Some(source.as_ref()),
        }
    }
}
