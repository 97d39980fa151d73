use std::sync::Arc;

use frame::{Container, Descriptor, StdError};
use frame_base::{Config, RunLoop, RunLoopConfig};

use crate::{CatalogueLoader, JsonCatalogueLoader, NavigationConfig};

/// Registers the services every scene application needs.
///
/// Adds `config` as a module, a singleton `Arc<RunLoop>` configured from the
/// `run_loop` section and, when `navigation.catalogue_path` is set, a JSON
/// catalogue loader served as `Arc<dyn CatalogueLoader>`. Registrations made
/// earlier on the container take precedence.
pub fn register_base_dependencies(
    container: &mut Container,
    config: &Config,
) -> Result<(), StdError> {
    let run_loop = config.section::<RunLoopConfig>()?;
    let navigation = config.section::<NavigationConfig>()?;
    container.add_module(config.clone());
    container.register(Descriptor::singleton(move |_| Ok(RunLoop::new(&run_loop))));
    if let Some(path) = navigation.catalogue_path {
        tracing::debug!(path = %path.display(), "Registering JSON catalogue");
        container.register(
            Descriptor::singleton(move |_| Ok(JsonCatalogueLoader::new(path.clone())))
                .serves::<Arc<dyn CatalogueLoader>, _>(|v| v as Arc<dyn CatalogueLoader>),
        );
    }
    Ok(())
}
