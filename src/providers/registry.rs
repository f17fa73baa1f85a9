//! Provider type registry
//!
//! Maps a type name to a constructor. Registration is explicit: the
//! composition root calls [`super::adapters::register_builtin`] (and any
//! extra plugins) before building the factory.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::errors::{ProviderError, ProviderResult};
use crate::models::ProviderConfig;

use super::traits::Provider;

pub type ProviderConstructor =
    Arc<dyn Fn(ProviderConfig) -> ProviderResult<Arc<dyn Provider>> + Send + Sync>;

#[derive(Default)]
pub struct ProviderRegistry {
    constructors: RwLock<HashMap<String, ProviderConstructor>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `constructor` under `type_name`; a name can only be taken once
    pub fn register<F>(&self, type_name: impl Into<String>, constructor: F) -> ProviderResult<()>
    where
        F: Fn(ProviderConfig) -> ProviderResult<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        let mut constructors = self.constructors.write().unwrap_or_else(|e| e.into_inner());
        if constructors.contains_key(&type_name) {
            return Err(ProviderError::AlreadyRegistered {
                provider_type: type_name,
            });
        }
        debug!("Registered provider type '{}'", type_name);
        constructors.insert(type_name, Arc::new(constructor));
        Ok(())
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.constructors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(type_name)
    }

    pub fn registered_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .constructors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Build a provider for `config` using its type name (or its id)
    pub fn create(&self, config: ProviderConfig) -> ProviderResult<Arc<dyn Provider>> {
        let constructor = self
            .constructors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(config.type_name())
            .cloned()
            .ok_or_else(|| ProviderError::TypeNotRegistered {
                provider_type: config.type_name().to_string(),
            })?;
        constructor(config)
    }
}
