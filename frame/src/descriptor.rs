use std::any::{Any, TypeId, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{Inject, Provider, StdError};

pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

type FactoryFn = dyn Fn(&Provider) -> Result<Instance, StdError> + Send + Sync;
type CastFn = dyn Fn(&Instance) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync;
type ProbeFn = dyn Fn(&Instance) -> bool + Send + Sync;

/// How long an instance produced by a descriptor lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Constructed once per provider and reused for every type it serves.
    Singleton,
    /// Constructed fresh on every resolution.
    Transient,
}

/// A type served by a descriptor, with the conversion from the concrete instance.
pub(crate) struct ServedType {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    cast: Box<CastFn>,
}

impl ServedType {
    /// Converts `instance` into the served type; `None` when the concrete type differs.
    pub(crate) fn cast(&self, instance: &Instance) -> Option<Box<dyn Any + Send + Sync>> {
        (self.cast)(instance)
    }
}

/// A registered recipe for producing a dependency.
///
/// A descriptor pairs a factory with the non-empty set of types it serves and a
/// lifetime. Descriptors are cheap to clone and compare by identity.
///
/// # Examples
///
/// ```rust
/// use frame::{Container, Descriptor};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "Hello".into()
///     }
/// }
///
/// let mut container = Container::new();
/// container.register(
///     Descriptor::singleton(|_| Ok(English))
///         .serves::<Arc<dyn Greeter>, _>(|v| v as Arc<dyn Greeter>),
/// );
///
/// let provider = container.make();
/// let greeter = provider.get::<Arc<dyn Greeter>>().unwrap();
/// assert_eq!(greeter.greet(), "Hello");
/// ```
#[derive(Clone)]
pub struct Descriptor {
    inner: Arc<DescriptorInner>,
}

struct DescriptorInner {
    concrete: &'static str,
    served: Vec<ServedType>,
    factory: Box<FactoryFn>,
    probe: Option<Box<ProbeFn>>,
    lifetime: Lifetime,
}

impl Descriptor {
    /// Starts a descriptor whose factory runs once per provider.
    pub fn singleton<C, F>(factory: F) -> DescriptorBuilder<C>
    where
        C: Send + Sync + 'static,
        F: Fn(&Provider) -> Result<C, StdError> + Send + Sync + 'static,
    {
        Self::new(Lifetime::Singleton, factory)
    }

    /// Starts a descriptor whose factory runs on every resolution.
    pub fn transient<C, F>(factory: F) -> DescriptorBuilder<C>
    where
        C: Send + Sync + 'static,
        F: Fn(&Provider) -> Result<C, StdError> + Send + Sync + 'static,
    {
        Self::new(Lifetime::Transient, factory)
    }

    /// Starts a descriptor with an explicit lifetime.
    pub fn new<C, F>(lifetime: Lifetime, factory: F) -> DescriptorBuilder<C>
    where
        C: Send + Sync + 'static,
        F: Fn(&Provider) -> Result<C, StdError> + Send + Sync + 'static,
    {
        DescriptorBuilder::from_arc_factory(lifetime, move |provider| {
            factory(provider).map(Arc::new)
        })
    }

    /// Starts a descriptor that builds `C::default()` and then injects it.
    pub fn injected<C>(lifetime: Lifetime) -> DescriptorBuilder<C>
    where
        C: Default + Inject + 'static,
    {
        DescriptorBuilder::from_arc_factory(lifetime, |provider| {
            let value = C::default();
            value.inject(provider)?;
            Ok(Arc::new(value))
        })
    }

    /// Starts a singleton descriptor serving an already constructed object.
    ///
    /// The object is injected when the descriptor is first resolved.
    pub fn instance<C>(instance: Arc<C>) -> DescriptorBuilder<C>
    where
        C: Inject + 'static,
    {
        DescriptorBuilder::from_arc_factory(Lifetime::Singleton, move |provider| {
            instance.inject(provider)?;
            Ok(instance.clone())
        })
    }

    /// Returns `true` if instances are cached per provider.
    pub fn is_singleton(&self) -> bool {
        self.inner.lifetime == Lifetime::Singleton
    }

    pub fn lifetime(&self) -> Lifetime {
        self.inner.lifetime
    }

    /// Name of the concrete type produced by the factory.
    pub fn concrete_type_name(&self) -> &'static str {
        self.inner.concrete
    }

    /// Iterates over the type ids served by this descriptor.
    pub fn served_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.inner.served.iter().map(|v| v.type_id)
    }

    /// Returns `true` if `T` is one of the served types.
    pub fn serves<T>(&self) -> bool
    where
        T: 'static,
    {
        self.served(TypeId::of::<T>()).is_some()
    }

    pub fn ptr_eq(&self, other: &Descriptor) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn served(&self, type_id: TypeId) -> Option<&ServedType> {
        self.inner.served.iter().find(|v| v.type_id == type_id)
    }

    pub(crate) fn construct(&self, provider: &Provider) -> Result<Instance, StdError> {
        (self.inner.factory)(provider)
    }

    pub(crate) fn is_alive(&self, instance: &Instance) -> bool {
        self.inner.probe.as_ref().is_none_or(|probe| probe(instance))
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("concrete", &self.inner.concrete)
            .field(
                "served",
                &self.inner.served.iter().map(|v| v.name).collect::<Vec<_>>(),
            )
            .field("lifetime", &self.inner.lifetime)
            .finish()
    }
}

/// Builder returned by the [`Descriptor`] constructors.
///
/// `C` is the concrete type produced by the factory. Every call to
/// [`serves`](Self::serves) adds one type the descriptor can be resolved as.
pub struct DescriptorBuilder<C> {
    lifetime: Lifetime,
    factory: Box<FactoryFn>,
    served: Vec<ServedType>,
    probe: Option<Box<ProbeFn>>,
    _marker: PhantomData<fn() -> C>,
}

impl<C> DescriptorBuilder<C>
where
    C: Send + Sync + 'static,
{
    fn from_arc_factory<F>(lifetime: Lifetime, factory: F) -> Self
    where
        F: Fn(&Provider) -> Result<Arc<C>, StdError> + Send + Sync + 'static,
    {
        Self {
            lifetime,
            factory: Box::new(move |provider| Ok(factory(provider)? as Instance)),
            served: Vec::new(),
            probe: None,
            _marker: PhantomData,
        }
    }

    /// Serves the constructed instance as `S`, converted by `cast`.
    ///
    /// Adding the same served type twice keeps the first conversion.
    pub fn serves<S, F>(mut self, cast: F) -> Self
    where
        S: Send + Sync + 'static,
        F: Fn(Arc<C>) -> S + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<S>();
        if self.served.iter().any(|v| v.type_id == type_id) {
            return self;
        }
        self.served.push(ServedType {
            type_id,
            name: type_name::<S>(),
            cast: Box::new(move |instance: &Instance| {
                let concrete = instance.clone().downcast::<C>().ok()?;
                Some(Box::new(cast(concrete)) as Box<dyn Any + Send + Sync>)
            }),
        });
        self
    }

    /// Serves the constructed instance as `Arc<C>`.
    pub fn serves_self(self) -> Self {
        self.serves::<Arc<C>, _>(|v| v)
    }

    /// Attaches a liveness probe.
    ///
    /// A cached singleton for which the probe returns `false` is considered
    /// externally destroyed and is rebuilt on its next resolution.
    pub fn alive_while<F>(mut self, probe: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.probe = Some(Box::new(move |instance: &Instance| {
            instance.downcast_ref::<C>().is_none_or(&probe)
        }));
        self
    }

    pub fn build(self) -> Descriptor {
        let this = if self.served.is_empty() {
            self.serves_self()
        } else {
            self
        };
        Descriptor {
            inner: Arc::new(DescriptorInner {
                concrete: type_name::<C>(),
                served: this.served,
                factory: this.factory,
                probe: this.probe,
                lifetime: this.lifetime,
            }),
        }
    }
}

impl<C> From<DescriptorBuilder<C>> for Descriptor
where
    C: Send + Sync + 'static,
{
    fn from(value: DescriptorBuilder<C>) -> Self {
        value.build()
    }
}

/// Deduplicated collection of descriptors.
#[derive(Clone, Default, Debug)]
pub struct Registry {
    descriptors: Vec<Descriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a descriptor unless this exact descriptor is already present.
    ///
    /// Returns `true` if the descriptor was added.
    pub fn add(&mut self, descriptor: impl Into<Descriptor>) -> bool {
        let descriptor = descriptor.into();
        if self.descriptors.iter().any(|v| v.ptr_eq(&descriptor)) {
            return false;
        }
        self.descriptors.push(descriptor);
        true
    }

    /// Returns `true` if any descriptor serves `T`.
    pub fn serves<T>(&self) -> bool
    where
        T: 'static,
    {
        self.descriptors.iter().any(|v| v.serves::<T>())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_serves_self_by_default() {
        let descriptor = Descriptor::transient(|_| Ok(5u32)).build();
        assert!(descriptor.serves::<Arc<u32>>());
        assert!(!descriptor.is_singleton());
    }

    #[test]
    fn test_registry_deduplicates_by_identity() {
        let descriptor = Descriptor::singleton(|_| Ok(1u8)).build();
        let mut registry = Registry::new();
        assert!(registry.add(descriptor.clone()));
        assert!(!registry.add(descriptor));
        assert!(registry.add(Descriptor::singleton(|_| Ok(1u8))));
        assert_eq!(registry.len(), 2);
    }
}
