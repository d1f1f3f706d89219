//! Layered configuration defaults.
//!
//! Default-setter callbacks mutate a freshly constructed config instance before any
//! property values are bound. Setters register under a [`BindingKey`]; the
//! [`Qualifier::GlobalDefaults`] sentinel collects setters applying to *every* binding of a
//! type. For a given binding, composition runs all global setters first, then the setters
//! registered under the binding's own key, each group ordered by registration stamp, exactly
//! once per build.

use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// Qualifier distinguishing multiple bindings of the same configuration type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Qualifier {
    /// Unqualified binding.
    None,
    /// Binding distinguished by a name.
    Named(Arc<str>),
    /// Sentinel under which defaults apply to every binding of the type.
    GlobalDefaults,
}

/// Key identifying a binding: a configuration type plus a [`Qualifier`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
    ty: TypeId,
    type_name: &'static str,
    qualifier: Qualifier,
}

impl fmt::Debug for BindingKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BindingKey")
            .field("type", &self.type_name)
            .field("qualifier", &self.qualifier)
            .finish()
    }
}

impl BindingKey {
    /// Creates an unqualified key for the config type.
    pub fn of<T: 'static>() -> Self {
        Self::with_qualifier::<T>(Qualifier::None)
    }

    /// Creates a named key for the config type.
    pub fn named<T: 'static>(name: impl AsRef<str>) -> Self {
        Self::with_qualifier::<T>(Qualifier::Named(name.as_ref().into()))
    }

    /// Creates the global-defaults sentinel key for the config type.
    pub fn global_defaults<T: 'static>() -> Self {
        Self::with_qualifier::<T>(Qualifier::GlobalDefaults)
    }

    /// Creates a key with the provided qualifier.
    pub fn with_qualifier<T: 'static>(qualifier: Qualifier) -> Self {
        Self {
            ty: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            qualifier,
        }
    }

    /// Returns the qualifier of this key.
    pub fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }

    /// Returns the name of the config type the key refers to.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn global_twin(&self) -> Self {
        Self {
            qualifier: Qualifier::GlobalDefaults,
            ..self.clone()
        }
    }
}

static NEXT_STAMP: AtomicU64 = AtomicU64::new(0);

/// Default-setter callback bound to a binding key.
///
/// Holders carry a monotonically increasing registration stamp; multiple holders affecting
/// the same key are applied in stamp order.
#[derive(Clone)]
pub struct ConfigDefaults {
    key: BindingKey,
    stamp: u64,
    setter: Arc<dyn Fn(&mut dyn Any) + Send + Sync>,
}

impl fmt::Debug for ConfigDefaults {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConfigDefaults")
            .field("key", &self.key)
            .field("stamp", &self.stamp)
            .finish_non_exhaustive()
    }
}

impl ConfigDefaults {
    /// Creates defaults applying to every binding of `T`.
    pub fn global<T: 'static, F>(setter: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        Self::with_key(BindingKey::global_defaults::<T>(), setter)
    }

    /// Creates defaults applying to the binding of `T` under the provided qualifier.
    pub fn keyed<T: 'static, F>(qualifier: Qualifier, setter: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        Self::with_key(BindingKey::with_qualifier::<T>(qualifier), setter)
    }

    fn with_key<T: 'static, F>(key: BindingKey, setter: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let setter = move |instance: &mut dyn Any| {
            let instance = instance
                .downcast_mut::<T>()
                .expect("internal error: defaults applied to config of unexpected type");
            setter(instance);
        };
        Self {
            key,
            stamp: NEXT_STAMP.fetch_add(1, Ordering::Relaxed),
            setter: Arc::new(setter),
        }
    }

    /// Returns the binding key the defaults are registered under.
    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    pub(crate) fn apply(&self, instance: &mut dyn Any) {
        (self.setter)(instance);
    }
}

/// Multimap from binding key to ordered holder list.
#[derive(Debug, Default)]
pub(crate) struct DefaultsRegistry {
    holders: HashMap<BindingKey, Vec<ConfigDefaults>>,
}

impl DefaultsRegistry {
    pub(crate) fn register(&mut self, defaults: ConfigDefaults) {
        let holders = self.holders.entry(defaults.key.clone()).or_default();
        let position = holders.partition_point(|holder| holder.stamp <= defaults.stamp);
        holders.insert(position, defaults);
    }

    /// Composes the setter sequence for a binding key: global holders first, then per-key
    /// holders, both in stamp order.
    pub(crate) fn composed(&self, key: &BindingKey) -> Vec<ConfigDefaults> {
        let global = self.holders.get(&key.global_twin()).into_iter().flatten();
        if key.qualifier == Qualifier::GlobalDefaults {
            return global.cloned().collect();
        }
        let keyed = self.holders.get(key).into_iter().flatten();
        global.chain(keyed).cloned().collect()
    }
}
