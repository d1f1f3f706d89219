//! Module scanning: dispatches externally-supplied binding elements into the factory.

use std::{any::Any, fmt, sync::Arc};

use crate::{
    BindConfig,
    defaults::ConfigDefaults,
    factory::{BindingListener, ConfigFactory, ConfigProvider, ErasedProvider},
    problems::Message,
};

/// Provider element payload: a type-erased provider plus its binding source.
pub struct ProviderBinding {
    pub(crate) provider: Arc<dyn ErasedProvider>,
    pub(crate) source: Option<String>,
}

impl fmt::Debug for ProviderBinding {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProviderBinding")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl ProviderBinding {
    /// Wraps a provider together with an opaque provenance marker.
    pub fn new<T: BindConfig>(provider: ConfigProvider<T>, source: Option<String>) -> Self {
        Self {
            provider: Arc::new(provider),
            source,
        }
    }
}

/// A single element of a module's binding stream.
#[non_exhaustive]
pub enum Element {
    /// Instance-bound listener holder.
    Listener(Arc<dyn BindingListener>),
    /// Instance-bound defaults holder.
    Defaults(ConfigDefaults),
    /// Provider binding with its source.
    Provider(ProviderBinding),
    /// Structural error surfaced by the element stream.
    Message(Message),
    /// Any other element; passed through to the caller unconsumed.
    Opaque(Box<dyn Any + Send>),
}

impl fmt::Debug for Element {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listener(_) => formatter.write_str("Listener(..)"),
            Self::Defaults(defaults) => write!(formatter, "Defaults({defaults:?})"),
            Self::Provider(binding) => write!(formatter, "Provider({binding:?})"),
            Self::Message(message) => write!(formatter, "Message({message:?})"),
            Self::Opaque(_) => formatter.write_str("Opaque(..)"),
        }
    }
}

impl Element {
    /// Shorthand for a provider element.
    pub fn provider<T: BindConfig>(provider: ConfigProvider<T>, source: Option<&str>) -> Self {
        Self::Provider(ProviderBinding::new(provider, source.map(str::to_owned)))
    }
}

/// A module contributing binding elements to the configuration phase.
pub trait ConfigModule {
    /// Called before element walking, so the module can lazily register further providers
    /// through the factory.
    fn set_config_factory(&mut self, factory: &Arc<ConfigFactory>) {
        let _ = factory;
    }

    /// Produces the module's binding elements.
    fn elements(&mut self) -> Vec<Element>;
}

/// Outcome of a scan: elements the scanner did not consume, plus structural errors surfaced
/// by the element streams.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Elements passed through unconsumed.
    pub passed_through: Vec<Element>,
    /// Structural errors, collected as a batch.
    pub problems: Vec<Message>,
}

/// Walks raw elements, dispatching listeners, defaults and providers into the factory.
pub fn scan_elements(
    factory: &Arc<ConfigFactory>,
    elements: impl IntoIterator<Item = Element>,
) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    for element in elements {
        match element {
            Element::Listener(listener) => factory.add_listener(listener),
            Element::Defaults(defaults) => factory.register_defaults(defaults),
            Element::Provider(binding) => {
                factory.register_erased(binding.provider, binding.source.as_deref());
            }
            Element::Message(message) => outcome.problems.push(message),
            other => outcome.passed_through.push(other),
        }
    }
    outcome
}

/// Walks a set of modules: hands each the factory, then scans its elements.
pub fn scan_modules(
    factory: &Arc<ConfigFactory>,
    modules: &mut [Box<dyn ConfigModule>],
) -> ScanOutcome {
    for module in &mut *modules {
        module.set_config_factory(factory);
    }

    let mut outcome = ScanOutcome::default();
    for module in modules {
        let scanned = scan_elements(factory, module.elements());
        outcome.passed_through.extend(scanned.passed_through);
        outcome.problems.extend(scanned.problems);
    }
    outcome
}
