//! Source registry for creating capture sources by name.
//!
//! The registry is an ordinary value: the caller builds it, registers the
//! factories it wants and passes it to the measurement entry point.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::MeterError;
use crate::source::{Source, SourceArgs, SourceError};
use crate::tone::ToneSourceFactory;

/// Static description of a source type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceInfo {
    /// Registry key, e.g. "tone"
    pub name: &'static str,
    /// Human-readable name
    pub pretty_name: &'static str,
    /// Sample frequency used when the configuration leaves it unset
    pub default_sample_frequency: f32,
    /// Record length in seconds used when the configuration leaves it unset
    pub default_record_length: f32,
}

impl SourceInfo {
    /// Capture arguments built from the defaults.
    #[must_use]
    pub fn default_args(&self) -> SourceArgs {
        SourceArgs::new(self.default_sample_frequency, self.default_record_length)
    }
}

/// A factory for opening instances of a specific source type.
pub trait SourceFactory: Send + Sync {
    /// Name and defaults of the sources this factory opens.
    fn info(&self) -> SourceInfo;

    /// Open a new, not yet started, source.
    fn open(&self, args: &SourceArgs) -> Result<Box<dyn Source>, SourceError>;
}

/// A registry of source factories keyed by name.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    factories: HashMap<&'static str, Arc<dyn SourceFactory>>,
}

impl SourceRegistry {
    /// Creates a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the sources shipped with this crate.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            ToneSourceFactory.info().name,
            Arc::new(ToneSourceFactory),
        );
        registry
    }

    /// Registers a new source factory.
    ///
    /// # Errors
    /// [`MeterError::DuplicateSource`] if the name is taken.
    pub fn register<F>(&mut self, factory: F) -> Result<(), MeterError>
    where
        F: SourceFactory + 'static,
    {
        let name = factory.info().name;
        if self.factories.contains_key(name) {
            return Err(MeterError::DuplicateSource(name.to_string()));
        }
        log::debug!("registered source '{}'", name);
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Description of a registered source.
    #[must_use]
    pub fn info(&self, name: &str) -> Option<SourceInfo> {
        self.factories.get(name).map(|factory| factory.info())
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens a source by name.
    ///
    /// # Errors
    /// [`MeterError::UnknownSource`] for an unregistered name, or the
    /// factory's open error.
    pub fn open(&self, name: &str, args: &SourceArgs) -> Result<Box<dyn Source>, MeterError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| MeterError::UnknownSource(name.to_string()))?;
        Ok(factory.open(args)?)
    }
}
