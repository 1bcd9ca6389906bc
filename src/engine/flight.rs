//! Per-entity single flight: no two transitions on the same entity may be in
//! flight at once. A second caller is refused immediately rather than queued;
//! the permit releases on drop.

use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Default)]
pub struct InFlight {
    entries: Mutex<HashSet<String>>,
}

/// RAII permit for one in-flight transition on one entity.
pub struct FlightPermit<'a> {
    registry: &'a InFlight,
    key: String,
}

impl InFlight {
    pub fn new() -> Self {
        InFlight::default()
    }

    /// Returns `None` when a transition on the same key is already in flight.
    pub fn acquire(&self, key: impl Into<String>) -> Option<FlightPermit<'_>> {
        let key = key.into();
        let mut entries = self.entries.lock().ok()?;
        if entries.insert(key.clone()) {
            Some(FlightPermit {
                registry: self,
                key,
            })
        } else {
            None
        }
    }
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        if let Ok(mut entries) = self.registry.entries.lock() {
            entries.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_on_same_key_is_refused() {
        let registry = InFlight::new();
        let permit = registry.acquire("booking:abc");
        assert!(permit.is_some());
        assert!(registry.acquire("booking:abc").is_none());
        assert!(registry.acquire("booking:def").is_some());
    }

    #[test]
    fn dropping_the_permit_releases_the_key() {
        let registry = InFlight::new();
        {
            let _permit = registry.acquire("booking:abc").unwrap();
        }
        assert!(registry.acquire("booking:abc").is_some());
    }
}
