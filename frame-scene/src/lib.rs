//! # frame-scene
//!
//! Scene lifecycle and navigation on top of the `frame` dependency container.
//!
//! ## Core Concepts
//!
//! - **SceneHandle**: Loadable unit of content that yields a bootstrap once loaded
//! - **BootstrapController**: Injects a loaded scene, discovers its views and
//!   drives their load and unload notifications
//! - **View**: Leaf component receiving lifecycle notifications
//! - **NavigationService**: Maps screens to scene handles and tracks open screens
//!
//! ## Basic Usage
//!
//! ```rust
//! use async_trait::async_trait;
//! use frame::{Container, Inject, StdError};
//! use frame_scene::{
//!     Bootstrap, CatalogueEntry, FetchViews, NavigationService, SceneContent, SceneLoader,
//!     SceneMapping, SceneRef, StaticCatalogue,
//! };
//! use std::sync::Arc;
//!
//! #[derive(Inject, FetchViews, Default)]
//! struct MenuBootstrap;
//!
//! impl Bootstrap for MenuBootstrap {}
//!
//! struct Loader;
//!
//! #[async_trait]
//! impl SceneLoader for Loader {
//!     async fn load_scene(&self, _: &SceneRef, _: bool) -> Result<SceneContent, StdError> {
//!         Ok(SceneContent::new().with_bootstrap(Arc::new(MenuBootstrap)))
//!     }
//!
//!     async fn unload_scene(&self, _: &SceneRef) -> Result<(), StdError> {
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let provider = Container::new().make();
//! let catalogue = StaticCatalogue::new()
//!     .with_entry("scenes", CatalogueEntry::new("menu", "scenes/menu"));
//! let navigation = NavigationService::new(provider, Arc::new(Loader), Arc::new(catalogue));
//! navigation
//!     .initialise(&SceneMapping::new().with::<MenuBootstrap>("menu"))
//!     .await
//!     .unwrap();
//!
//! let menu = navigation.show_scene::<MenuBootstrap>(true).await.unwrap();
//! let open = navigation.scene_handle::<MenuBootstrap>().unwrap();
//! assert!(Arc::ptr_eq(&menu, &open));
//! # });
//! ```
//!
//! ## Features
//!
//! - `macros` (default): Enables `#[derive(FetchViews)]`

mod base;
mod bootstrap;
mod catalogue;
mod content;
mod error;
mod loader;
mod navigation;
mod scene;
mod view;

pub use base::*;
pub use bootstrap::*;
pub use catalogue::*;
pub use content::*;
pub use error::*;
pub use loader::*;
pub use navigation::{DEFAULT_CATALOGUE_TAG, NavigationConfig, NavigationService, SceneMapping};
pub use scene::*;
pub use view::*;

#[cfg(feature = "macros")]
pub use frame_scene_macros::*;
