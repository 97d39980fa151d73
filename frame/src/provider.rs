use std::any::{Any, TypeId, type_name};
use std::collections::{HashMap, hash_map};
use std::sync::Arc;

use dashmap::DashMap;

use crate::descriptor::{Instance, ServedType};
use crate::{DependencyError, Descriptor, Inject, Registry};

/// Resolves instances from a frozen set of descriptors.
///
/// A provider is produced by [`Container::make`](crate::Container::make) and owns
/// its own singleton cache. Cloning a provider is cheap and shares that cache, so
/// the provider itself is the context object handed to every injection call.
///
/// # Examples
///
/// ```rust
/// use frame::{Container, Descriptor};
/// use std::sync::Arc;
///
/// struct Counter;
///
/// let mut container = Container::new();
/// container.register(Descriptor::singleton(|_| Ok(Counter)));
///
/// let provider = container.make();
/// let a = provider.get::<Arc<Counter>>().unwrap();
/// let b = provider.get::<Arc<Counter>>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Clone)]
pub struct Provider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    index: HashMap<TypeId, Descriptor>,
    singletons: DashMap<TypeId, CachedSingleton>,
}

#[derive(Clone)]
struct CachedSingleton {
    instance: Instance,
    descriptor: Descriptor,
}

impl CachedSingleton {
    fn is_alive(&self) -> bool {
        self.descriptor.is_alive(&self.instance)
    }
}

impl Provider {
    pub(crate) fn new(registry: &Registry) -> Self {
        let mut index = HashMap::new();
        for descriptor in registry.iter() {
            for type_id in descriptor.served_types() {
                match index.entry(type_id) {
                    hash_map::Entry::Occupied(_) => {
                        tracing::debug!(
                            concrete = descriptor.concrete_type_name(),
                            "Ignoring duplicate registration"
                        );
                    }
                    hash_map::Entry::Vacant(v) => {
                        v.insert(descriptor.clone());
                    }
                }
            }
        }
        Self {
            inner: Arc::new(ProviderInner {
                index,
                singletons: DashMap::new(),
            }),
        }
    }

    /// Resolves an instance of `T`.
    ///
    /// Singleton descriptors reuse a live cached instance whose concrete type can
    /// be served as `T`, so one instance serving several types occupies one
    /// logical slot. Transient descriptors invoke their factory on every call.
    ///
    /// There is no cycle detection: a factory that transitively requests the
    /// type it is constructing recurses until the stack is exhausted.
    pub fn get<T>(&self) -> Result<T, DependencyError>
    where
        T: Send + Sync + 'static,
    {
        let value = self.resolve(TypeId::of::<T>(), type_name::<T>())?;
        value
            .downcast::<T>()
            .map(|v| *v)
            .map_err(|_| DependencyError::TypeMismatch(type_name::<T>()))
    }

    /// Returns `true` if a descriptor serving `T` was registered.
    pub fn contains<T>(&self) -> bool
    where
        T: 'static,
    {
        self.inner.index.contains_key(&TypeId::of::<T>())
    }

    /// Assigns every injection point declared by `target`.
    pub fn inject<T>(&self, target: &T) -> Result<(), DependencyError>
    where
        T: Inject + ?Sized,
    {
        target.inject(self)
    }

    /// Injects `target` and hands it back.
    pub fn injected<T>(&self, target: T) -> Result<T, DependencyError>
    where
        T: Inject,
    {
        target.inject(self)?;
        Ok(target)
    }

    /// Number of singleton slots currently cached.
    pub fn cached_singletons(&self) -> usize {
        self.inner.singletons.len()
    }

    fn resolve(
        &self,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<Box<dyn Any + Send + Sync>, DependencyError> {
        let descriptor = self
            .inner
            .index
            .get(&type_id)
            .ok_or(DependencyError::UnregisteredType(type_name))?;
        let served = descriptor
            .served(type_id)
            .ok_or(DependencyError::UnregisteredType(type_name))?;
        if !descriptor.is_singleton() {
            let instance = self.construct(descriptor, type_name)?;
            return served
                .cast(&instance)
                .ok_or(DependencyError::TypeMismatch(type_name));
        }
        let stale = match self.find_singleton(served) {
            Ok(value) => return Ok(value),
            Err(stale) => stale,
        };
        for key in stale {
            // A concurrent resolution may have replaced the slot already.
            if self
                .inner
                .singletons
                .remove_if(&key, |_, v| !v.is_alive())
                .is_some()
            {
                tracing::warn!(
                    type_name,
                    "The singleton was destroyed; overwriting with new instance"
                );
            }
        }
        // Construction runs without holding any cache lock, so concurrent first
        // resolutions may both construct and the later insert wins.
        let instance = self.construct(descriptor, type_name)?;
        self.inner.singletons.insert(
            type_id,
            CachedSingleton {
                instance: instance.clone(),
                descriptor: descriptor.clone(),
            },
        );
        served
            .cast(&instance)
            .ok_or(DependencyError::TypeMismatch(type_name))
    }

    /// Looks up a live cached singleton servable as `served`.
    ///
    /// On a miss returns the slots holding destroyed instances that would
    /// otherwise have matched.
    fn find_singleton(
        &self,
        served: &ServedType,
    ) -> Result<Box<dyn Any + Send + Sync>, Vec<TypeId>> {
        let cached: Vec<(TypeId, CachedSingleton)> = self
            .inner
            .singletons
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        let mut stale = Vec::new();
        for (key, singleton) in &cached {
            let Some(value) = served.cast(&singleton.instance) else {
                continue;
            };
            if singleton.is_alive() {
                return Ok(value);
            }
            stale.push(*key);
        }
        Err(stale)
    }

    fn construct(
        &self,
        descriptor: &Descriptor,
        type_name: &'static str,
    ) -> Result<Instance, DependencyError> {
        tracing::trace!(
            type_name,
            concrete = descriptor.concrete_type_name(),
            "Constructing dependency"
        );
        descriptor
            .construct(self)
            .map_err(|source| DependencyError::FactoryFailed { type_name, source })
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("types", &self.inner.index.len())
            .field("singletons", &self.inner.singletons.len())
            .finish()
    }
}
