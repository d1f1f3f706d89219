//! Provider registry: builds, caches and publishes configuration instances.

use std::{
    any::Any,
    collections::HashMap,
    fmt,
    marker::PhantomData,
    sync::{
        Arc, Mutex, OnceLock, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    BindConfig, PropertyMap, binder,
    binder::PropertyTracker,
    defaults::{BindingKey, ConfigDefaults, DefaultsRegistry, Qualifier},
    metadata::RustType,
    problems::ConfigError,
};

/// Sink for the warnings accumulated by a successful build.
pub trait WarningsMonitor: Send + Sync {
    /// Invoked once per accumulated warning.
    fn on_warning(&self, message: &str);
}

/// Listener notified of every provider registered with a [`ConfigFactory`].
///
/// The notification protocol guarantees that each listener sees each provider exactly once,
/// regardless of the relative order of listener and provider registration. Notifications run
/// outside the registry lock, so a listener may register further providers from within
/// [`Self::configuration_bound()`] (that is what the factory argument is for).
pub trait BindingListener: Send + Sync {
    /// Called with the binding of a registered provider.
    fn configuration_bound(&self, binding: &ConfigBinding, factory: &Arc<ConfigFactory>);
}

/// Descriptor of a registered binding, handed to [`BindingListener`]s.
#[derive(Debug, Clone)]
pub struct ConfigBinding {
    config_type: RustType,
    prefix: Option<String>,
    key: BindingKey,
    source: Option<String>,
}

impl ConfigBinding {
    /// Returns the bound configuration type.
    pub fn config_type(&self) -> RustType {
        self.config_type
    }

    /// Returns the property prefix of the binding, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns the binding key.
    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    /// Returns the opaque provenance marker of the binding, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(0);

/// Provider of a single configuration binding: the config type plus an optional property
/// prefix and binding qualifier.
///
/// Providers double as instance cache keys: two providers of the same type are distinct
/// cache entries. Once registered, [`Self::get()`] resolves through the owning factory.
pub struct ConfigProvider<T> {
    id: u64,
    prefix: Option<String>,
    qualifier: Qualifier,
    source: OnceLock<String>,
    factory: OnceLock<Weak<ConfigFactory>>,
    _config: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for ConfigProvider<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConfigProvider")
            .field("id", &self.id)
            .field("prefix", &self.prefix)
            .field("qualifier", &self.qualifier)
            .finish_non_exhaustive()
    }
}

impl<T: BindConfig> Default for ConfigProvider<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: BindConfig> ConfigProvider<T> {
    /// Creates an unqualified provider without a prefix.
    pub fn new() -> Self {
        Self {
            id: NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed),
            prefix: None,
            qualifier: Qualifier::None,
            source: OnceLock::new(),
            factory: OnceLock::new(),
            _config: PhantomData,
        }
    }

    /// Binds under `prefix`, so property lookups use `prefix + "." + name`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Distinguishes this binding from other bindings of `T` by name.
    #[must_use]
    pub fn named(mut self, name: impl AsRef<str>) -> Self {
        self.qualifier = Qualifier::Named(name.as_ref().into());
        self
    }

    /// Returns the binding key of this provider.
    pub fn binding_key(&self) -> BindingKey {
        BindingKey::with_qualifier::<T>(self.qualifier.clone())
    }

    /// Resolves the configuration instance through the factory this provider is registered
    /// with.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider has not been registered (or the factory is gone), or
    /// if the build fails.
    pub fn get(&self) -> Result<Arc<T>, ConfigError> {
        let factory = self.factory.get().and_then(Weak::upgrade).ok_or_else(|| {
            ConfigError::single("Configuration provider is not registered with a factory")
        })?;
        factory.get(self)
    }
}

/// Type-erased view of a provider, as stored in the registry.
pub(crate) trait ErasedProvider: Send + Sync {
    fn binding(&self) -> ConfigBinding;
    fn attach(&self, factory: &Arc<ConfigFactory>, source: Option<&str>);
    fn build_erased(&self, factory: &ConfigFactory) -> Result<(), ConfigError>;
}

impl<T: BindConfig> ErasedProvider for ConfigProvider<T> {
    fn binding(&self) -> ConfigBinding {
        ConfigBinding {
            config_type: T::describe_config().ty(),
            prefix: self.prefix.clone(),
            key: self.binding_key(),
            source: self.source.get().cloned(),
        }
    }

    fn attach(&self, factory: &Arc<ConfigFactory>, source: Option<&str>) {
        // The first registration wins; repeated registration keeps the original attachment.
        self.factory.set(Arc::downgrade(factory)).ok();
        if let Some(source) = source {
            self.source.set(source.to_owned()).ok();
        }
    }

    fn build_erased(&self, factory: &ConfigFactory) -> Result<(), ConfigError> {
        factory.get(self).map(drop)
    }
}

/// A property consumed by some build, with its security classification.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConsumedProperty {
    /// Fully prefixed property name.
    pub name: String,
    /// Whether the consuming attribute is security-sensitive.
    pub security_sensitive: bool,
}

#[derive(Default)]
struct Registrations {
    providers: Vec<Arc<dyn ErasedProvider>>,
    listeners: Vec<Arc<dyn BindingListener>>,
}

/// The configuration factory: owns the property map and drives provider registration,
/// instance building and caching.
///
/// The factory may be shared among threads; [`Self::get()`] is re-entrant and safe under
/// concurrent calls on distinct or identical providers. Racing builds of the same provider
/// are allowed; the first published instance wins and losers are discarded, so all callers
/// observe a single instance per provider.
pub struct ConfigFactory {
    properties: PropertyMap,
    weak_self: Weak<ConfigFactory>,
    // Providers and listeners form an atomic pair guarded by one lock, so that every
    // (listener, provider) combination is notified exactly once. Snapshots are taken under
    // the lock; notifications run outside it.
    registrations: Mutex<Registrations>,
    instances: Mutex<HashMap<u64, Arc<dyn Any + Send + Sync>>>,
    defaults: Mutex<DefaultsRegistry>,
    tracker: PropertyTracker,
    warnings_monitor: Mutex<Option<Arc<dyn WarningsMonitor>>>,
}

impl fmt::Debug for ConfigFactory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConfigFactory")
            .field("properties", &self.properties.len())
            .finish_non_exhaustive()
    }
}

impl ConfigFactory {
    /// Creates a factory over the provided property map.
    pub fn new(properties: PropertyMap) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            properties,
            weak_self: weak.clone(),
            registrations: Mutex::default(),
            instances: Mutex::default(),
            defaults: Mutex::default(),
            tracker: PropertyTracker::default(),
            warnings_monitor: Mutex::new(None),
        })
    }

    /// Installs a sink for build warnings.
    pub fn set_warnings_monitor(&self, monitor: Arc<dyn WarningsMonitor>) {
        *self.warnings_monitor.lock().unwrap() = Some(monitor);
    }

    /// Returns the input property map.
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    fn strong_self(&self) -> Arc<Self> {
        self.weak_self
            .upgrade()
            .expect("internal error: config factory accessed during construction")
    }

    /// Registers a provider, returning it in shared form for later [`ConfigProvider::get()`]
    /// calls. Every current listener is notified of the new binding.
    pub fn register_provider<T: BindConfig>(
        &self,
        provider: ConfigProvider<T>,
        source: Option<&str>,
    ) -> Arc<ConfigProvider<T>> {
        let provider = Arc::new(provider);
        self.register_erased(provider.clone(), source);
        provider
    }

    pub(crate) fn register_erased(&self, provider: Arc<dyn ErasedProvider>, source: Option<&str>) {
        let this = self.strong_self();
        provider.attach(&this, source);
        let listeners = {
            let mut registrations = self.registrations.lock().unwrap();
            registrations.providers.push(provider.clone());
            registrations.listeners.clone()
        };
        let binding = provider.binding();
        tracing::debug!(
            config = binding.config_type().name_in_code(),
            prefix = binding.prefix().unwrap_or_default(),
            "registered configuration provider"
        );
        for listener in listeners {
            listener.configuration_bound(&binding, &this);
        }
    }

    /// Installs a listener and notifies it of every already-registered provider.
    pub fn add_listener(&self, listener: Arc<dyn BindingListener>) {
        let this = self.strong_self();
        let providers = {
            let mut registrations = self.registrations.lock().unwrap();
            registrations.listeners.push(listener.clone());
            registrations.providers.clone()
        };
        for provider in providers {
            listener.configuration_bound(&provider.binding(), &this);
        }
    }

    /// Registers default setters consulted by subsequent builds.
    pub fn register_defaults(&self, defaults: ConfigDefaults) {
        self.defaults.lock().unwrap().register(defaults);
    }

    /// Returns the configuration instance for the provider, building it on first use.
    ///
    /// # Errors
    ///
    /// Propagates binding errors. Failed builds are not cached; a later call retries.
    pub fn get<T: BindConfig>(&self, provider: &ConfigProvider<T>) -> Result<Arc<T>, ConfigError> {
        if let Some(instance) = self.cached(provider.id) {
            return Ok(instance);
        }

        let composed = {
            let defaults = self.defaults.lock().unwrap();
            defaults.composed(&provider.binding_key())
        };
        let (instance, problems) = binder::bind::<T>(
            &self.properties,
            provider.prefix.as_deref(),
            &composed,
            &self.tracker,
        )?;
        let instance = Arc::new(instance);

        let published = {
            let mut instances = self.instances.lock().unwrap();
            match instances.entry(provider.id) {
                std::collections::hash_map::Entry::Occupied(entry) => {
                    // Lost the publication race; discard the fresh instance.
                    tracing::trace!(provider = provider.id, "discarding racing build");
                    entry.get().clone()
                }
                std::collections::hash_map::Entry::Vacant(entry) => entry
                    .insert(instance.clone() as Arc<dyn Any + Send + Sync>)
                    .clone(),
            }
        };

        let monitor = self.warnings_monitor.lock().unwrap().clone();
        if let Some(monitor) = monitor {
            for warning in problems.warnings() {
                monitor.on_warning(warning.text());
            }
        }

        Ok(published
            .downcast::<T>()
            .expect("internal error: cached instance has unexpected type"))
    }

    fn cached<T: BindConfig>(&self, provider_id: u64) -> Option<Arc<T>> {
        let instances = self.instances.lock().unwrap();
        let instance = instances.get(&provider_id)?.clone();
        Some(
            instance
                .downcast::<T>()
                .expect("internal error: cached instance has unexpected type"),
        )
    }

    /// Builds every registered provider, collecting all failures into a single batch, each
    /// message annotated with the provider's binding source.
    ///
    /// # Errors
    ///
    /// Returns the combined batch if any provider failed to build.
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        let providers = self.registrations.lock().unwrap().providers.clone();
        let mut messages = Vec::new();
        for provider in providers {
            if let Err(err) = provider.build_erased(self) {
                let source = provider.binding().source().map(str::to_owned);
                messages.extend(err.into_messages().into_iter().map(|mut message| {
                    if let Some(source) = &source {
                        message.annotate_source(source);
                    }
                    message
                }));
            }
        }
        if messages.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::new(messages))
        }
    }

    /// Returns the properties seen by the builds performed so far.
    pub fn seen_properties(&self) -> Vec<String> {
        self.tracker.seen().into_iter().collect()
    }

    /// Returns the properties consumed by the builds performed so far, ordered by name.
    pub fn used_properties(&self) -> Vec<ConsumedProperty> {
        self.tracker
            .used()
            .into_iter()
            .map(|(name, security_sensitive)| ConsumedProperty {
                name,
                security_sensitive,
            })
            .collect()
    }
}
