/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Template registry.
//!
//! Templates are loaded once (from an XML template file parsed elsewhere, or
//! built in code) and referenced by id thereafter. The registry is immutable
//! after construction and shared by `Arc` across every decode context; no
//! locking is required for lookups.

use crate::schema::Template;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while populating a registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two templates declared the same id.
    #[error("duplicate template id: {id}")]
    DuplicateTemplateId {
        /// The colliding template id.
        id: u32,
    },
}

/// Shared, immutable map of template id to template.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    by_id: HashMap<u32, Arc<Template>>,
    by_name: HashMap<String, u32>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a template.
    ///
    /// # Arguments
    /// * `template` - The template to register
    ///
    /// # Errors
    /// Returns `RegistryError::DuplicateTemplateId` if the id is taken.
    pub fn register(&mut self, template: Template) -> Result<(), RegistryError> {
        if self.by_id.contains_key(&template.id) {
            return Err(RegistryError::DuplicateTemplateId { id: template.id });
        }
        self.by_name.insert(template.name.clone(), template.id);
        self.by_id.insert(template.id, Arc::new(template));
        Ok(())
    }

    /// Looks up a template by id.
    #[must_use]
    pub fn template(&self, id: u32) -> Option<Arc<Template>> {
        self.by_id.get(&id).cloned()
    }

    /// Looks up a template by name.
    #[must_use]
    pub fn template_by_name(&self, name: &str) -> Option<Arc<Template>> {
        self.by_name.get(name).and_then(|id| self.template(*id))
    }

    /// Returns the number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if no templates are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Freezes the registry into a shared handle.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Iterates over the registered templates.
    pub fn templates(&self) -> impl Iterator<Item = &Arc<Template>> {
        self.by_id.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let mut registry = TemplateRegistry::new();
        registry
            .register(Template::new(30, "MDSnapshot", Vec::new()))
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.template(30).unwrap().name, "MDSnapshot");
        assert_eq!(registry.template_by_name("MDSnapshot").unwrap().id, 30);
        assert!(registry.template(31).is_none());
    }

    #[test]
    fn test_registry_duplicate_id() {
        let mut registry = TemplateRegistry::new();
        registry
            .register(Template::new(30, "A", Vec::new()))
            .unwrap();
        let err = registry
            .register(Template::new(30, "B", Vec::new()))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTemplateId { id: 30 });
    }

    #[test]
    fn test_registry_shared_across_threads() {
        let mut registry = TemplateRegistry::new();
        registry
            .register(Template::new(1, "Tick", Vec::new()))
            .unwrap();
        let shared = registry.into_shared();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || shared.template(1).unwrap().name.clone())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "Tick");
        }
    }
}
