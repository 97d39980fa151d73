/// Type alias for boxed errors that can be sent across threads.
///
/// Factories and external collaborators report their failures with this type.
pub type StdError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while resolving a dependency from a [`Provider`](crate::Provider).
///
/// Resolution failures are programming mistakes: they are always surfaced to the
/// caller and never replaced with a default value.
#[derive(Debug)]
pub enum DependencyError {
    /// The requested type was never registered with the container.
    UnregisteredType(&'static str),
    /// The factory of the descriptor serving the type returned an error.
    FactoryFailed {
        type_name: &'static str,
        source: StdError,
    },
    /// The descriptor produced an instance that could not be served as the requested type.
    TypeMismatch(&'static str),
}

impl std::fmt::Display for DependencyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyError::UnregisteredType(name) => {
                write!(f, "Type is not a dependency: {name}")
            }
            DependencyError::FactoryFailed { type_name, source } => {
                write!(f, "Cannot construct {type_name}: {source}")
            }
            DependencyError::TypeMismatch(name) => {
                write!(f, "Constructed instance cannot be served as {name}")
            }
        }
    }
}

impl std::error::Error for DependencyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DependencyError::FactoryFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
