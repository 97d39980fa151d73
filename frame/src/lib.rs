//! # frame
//!
//! Dependency container for multi-scene interactive applications.
//!
//! ## Core Concepts
//!
//! - **Descriptor**: A recipe producing a dependency: a factory, the types it
//!   serves and whether the result is a singleton
//! - **Container**: Accumulates descriptors and modules, then freezes them into a provider
//! - **Provider**: Resolves instances, owns the singleton cache and injects objects
//! - **Inject**: Explicit injection points declared by an object
//!
//! ## Basic Usage
//!
//! ```rust
//! use frame::{Container, Descriptor};
//! use std::sync::Arc;
//!
//! trait Storage: Send + Sync {
//!     fn name(&self) -> &str;
//! }
//!
//! trait Cache: Send + Sync {}
//!
//! struct MemoryStorage;
//!
//! impl Storage for MemoryStorage {
//!     fn name(&self) -> &str {
//!         "memory"
//!     }
//! }
//!
//! impl Cache for MemoryStorage {}
//!
//! let mut container = Container::new();
//! container.register(
//!     Descriptor::singleton(|_| Ok(MemoryStorage))
//!         .serves::<Arc<dyn Storage>, _>(|v| v as Arc<dyn Storage>)
//!         .serves::<Arc<dyn Cache>, _>(|v| v as Arc<dyn Cache>),
//! );
//!
//! let provider = container.make();
//! let storage = provider.get::<Arc<dyn Storage>>().unwrap();
//! assert_eq!(storage.name(), "memory");
//! assert_eq!(provider.cached_singletons(), 1);
//! let _cache = provider.get::<Arc<dyn Cache>>().unwrap();
//! assert_eq!(provider.cached_singletons(), 1);
//! ```
//!
//! ## Factories With Dependencies
//!
//! Factories receive the provider and can resolve what they need:
//!
//! ```rust
//! use frame::{Container, Descriptor};
//! use std::sync::Arc;
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct Client {
//!     config: Arc<Config>,
//! }
//!
//! let mut container = Container::new();
//! container
//!     .register(Descriptor::singleton(|_| {
//!         Ok(Config {
//!             url: "local".to_string(),
//!         })
//!     }))
//!     .register(Descriptor::transient(|provider| {
//!         Ok(Client {
//!             config: provider.get()?,
//!         })
//!     }));
//!
//! let provider = container.make();
//! let client = provider.get::<Arc<Client>>().unwrap();
//! assert_eq!(client.config.url, "local");
//! ```
//!
//! ## Features
//!
//! - `macros` (default): Enables `#[derive(Inject)]`

mod container;
mod descriptor;
mod error;
mod inject;
mod provider;

pub use container::*;
pub use descriptor::{Descriptor, DescriptorBuilder, Lifetime, Registry};
pub use error::*;
pub use inject::*;
pub use provider::*;

#[cfg(feature = "macros")]
pub use frame_macros::*;
