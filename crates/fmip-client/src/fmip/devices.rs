//! Client-side cache of last-known device records.

use std::collections::HashMap;

use log::debug;

use crate::fmip::types::FmipDevice;

/// In-memory device cache keyed by the stable upstream device id.
///
/// Refreshes merge by id: a known id is overwritten with the fresh
/// record, a new id is inserted, and an id absent from a refresh keeps
/// its last-known record.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, FmipDevice>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        DeviceRegistry::default()
    }

    /// Look up a device. An unknown id is a normal, recoverable
    /// condition; callers decide whether to trigger a refresh.
    pub fn get(&self, id: &str) -> Option<&FmipDevice> {
        self.devices.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.devices.contains_key(id)
    }

    /// Upsert the given records by id. Records without an id cannot be
    /// cached and are dropped.
    pub fn merge(&mut self, devices: impl IntoIterator<Item = FmipDevice>) {
        for device in devices {
            if device.id.is_empty() {
                debug!("fmip registry: skipping device record without an id");
                continue;
            }
            self.devices.insert(device.id.clone(), device);
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &FmipDevice> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device(id: &str, name: &str) -> FmipDevice {
        serde_json::from_value(json!({"id": id, "name": name})).unwrap()
    }

    #[test]
    fn test_get_unknown_id_is_none() {
        let registry = DeviceRegistry::new();
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_merge_inserts_and_overwrites() {
        let mut registry = DeviceRegistry::new();
        registry.merge([device("d1", "old"), device("d2", "two")]);
        registry.merge([device("d1", "new")]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("d1").unwrap().name.as_deref(), Some("new"));
        assert_eq!(registry.get("d2").unwrap().name.as_deref(), Some("two"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut registry = DeviceRegistry::new();
        registry.merge([device("d1", "one")]);
        registry.merge([device("d1", "one")]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("d1").unwrap().name.as_deref(), Some("one"));
    }

    #[test]
    fn test_merge_never_deletes_absent_ids() {
        let mut registry = DeviceRegistry::new();
        registry.merge([device("d1", "one"), device("d2", "two")]);
        // a refresh that omits d1 must not evict it
        registry.merge([device("d2", "two again")]);

        assert!(registry.contains("d1"));
        assert_eq!(registry.get("d2").unwrap().name.as_deref(), Some("two again"));
    }

    #[test]
    fn test_merge_drops_records_without_id() {
        let mut registry = DeviceRegistry::new();
        registry.merge([serde_json::from_value::<FmipDevice>(json!({"name": "ghost"})).unwrap()]);
        assert!(registry.is_empty());
    }
}
