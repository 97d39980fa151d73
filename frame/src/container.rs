use crate::{Descriptor, Provider, Registry};

/// Declarative group of registrations applied when a provider is made.
///
/// Modules play the role of static configuration: they are collected by the
/// container and their descriptors are appended after every custom registration,
/// so a custom registration of the same served type takes precedence.
///
/// # Examples
///
/// ```rust
/// use frame::{Container, Descriptor, Module, Registry};
/// use std::sync::Arc;
///
/// struct Settings {
///     volume: u8,
/// }
///
/// struct AudioModule;
///
/// impl Module for AudioModule {
///     fn register(&self, registry: &mut Registry) {
///         registry.add(Descriptor::singleton(|_| Ok(Settings { volume: 7 })));
///     }
/// }
///
/// let mut container = Container::new();
/// container.add_module(AudioModule);
/// let provider = container.make();
/// assert_eq!(provider.get::<Arc<Settings>>().unwrap().volume, 7);
/// ```
pub trait Module: Send + Sync {
    fn register(&self, registry: &mut Registry);

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Builder that accumulates descriptors and freezes them into providers.
#[derive(Default)]
pub struct Container {
    registry: Registry,
    modules: Vec<Box<dyn Module>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a descriptor.
    ///
    /// When several descriptors serve the same type, the first registered one is
    /// authoritative and later ones are ignored for that type.
    pub fn register(&mut self, descriptor: impl Into<Descriptor>) -> &mut Self {
        self.registry.add(descriptor);
        self
    }

    /// Adds a module whose registrations are applied by [`make`](Self::make).
    pub fn add_module<M>(&mut self, module: M) -> &mut Self
    where
        M: Module + 'static,
    {
        tracing::debug!(module = module.name(), "Adding module");
        self.modules.push(Box::new(module));
        self
    }

    /// Returns `true` if a custom registration serves `T`.
    ///
    /// Modules are not consulted until [`make`](Self::make).
    pub fn has<T>(&self) -> bool
    where
        T: 'static,
    {
        self.registry.serves::<T>()
    }

    /// Freezes every accumulated descriptor into a new provider.
    ///
    /// Each call yields an independent provider with its own singleton cache.
    pub fn make(&self) -> Provider {
        let mut registry = self.registry.clone();
        for module in &self.modules {
            module.register(&mut registry);
        }
        tracing::debug!(descriptors = registry.len(), "Making provider");
        Provider::new(&registry)
    }
}
