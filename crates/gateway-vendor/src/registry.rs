//! Vendor adapter registry: the pipeline resolves
//! `agent.primaryVendor`/`fallbackVendor` to a concrete adapter instance
//! through this map rather than a string `switch`. Adding vendorC is a
//! registration here, not a change to `gateway-pipeline`.

use crate::adapter::VendorAdapter;
use gateway_core::entities::Vendor;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct VendorRegistry {
    adapters: HashMap<Vendor, Arc<dyn VendorAdapter>>,
}

impl VendorRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    pub fn register(&mut self, vendor: Vendor, adapter: Arc<dyn VendorAdapter>) {
        self.adapters.insert(vendor, adapter);
    }

    pub fn get(&self, vendor: Vendor) -> Option<Arc<dyn VendorAdapter>> {
        self.adapters.get(&vendor).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedAdapter;

    #[test]
    fn registering_a_vendor_makes_it_resolvable() {
        let mut registry = VendorRegistry::new();
        registry.register(Vendor::VendorA, Arc::new(ScriptedAdapter::always_fail()));
        assert!(registry.get(Vendor::VendorA).is_some());
        assert!(registry.get(Vendor::VendorB).is_none());
    }
}
