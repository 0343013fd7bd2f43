//! Resource Registry - lookup of resource implementations by type name

use super::Resource;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct ResourceRegistry {
    resources: BTreeMap<&'static str, Arc<dyn Resource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource under its type name, replacing any previous one
    pub fn register(&mut self, resource: Arc<dyn Resource>) {
        let name = resource.type_name();
        if self.resources.insert(name, resource).is_some() {
            tracing::warn!("Resource type {} registered twice", name);
        }
    }

    /// Get a resource by type name
    pub fn get_resource(&self, type_name: &str) -> Option<&Arc<dyn Resource>> {
        self.resources.get(type_name)
    }

    /// All registered type names, sorted
    pub fn get_all_resource_types(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceData, ResourceSchema};
    use anyhow::Result;
    use async_trait::async_trait;

    struct Dummy(&'static str, ResourceSchema);

    #[async_trait]
    impl Resource for Dummy {
        fn type_name(&self) -> &'static str {
            self.0
        }
        fn schema(&self) -> &ResourceSchema {
            &self.1
        }
        async fn create(&self, d: &mut ResourceData) -> Result<()> {
            d.set_id("dummy");
            Ok(())
        }
        async fn read(&self, _d: &mut ResourceData) -> Result<()> {
            Ok(())
        }
        async fn update(&self, _d: &mut ResourceData) -> Result<()> {
            Ok(())
        }
        async fn delete(&self, _d: &mut ResourceData) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ResourceRegistry::new();
        registry.register(Arc::new(Dummy("b_thing", ResourceSchema::new())));
        registry.register(Arc::new(Dummy("a_thing", ResourceSchema::new())));

        assert_eq!(registry.get_all_resource_types(), vec!["a_thing", "b_thing"]);
        assert!(registry.get_resource("a_thing").is_some());
        assert!(registry.get_resource("c_thing").is_none());
    }
}
