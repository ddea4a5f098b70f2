//! Resource ownership
//!
//! Graph-owned resource instances live in a [`ResourceArena`]. Resource-typed
//! inputs without an override still need something editable to show, so
//! callers obtain a shared placeholder per `(call-site, identity)` from a
//! [`PlaceholderResourceManager`] instead of allocating one per view.

use indexmap::IndexMap;
use pore_types::{CallSiteId, ParameterIdentity, ResourceHandle, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// State of one resource instance
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceInstance {
    class: String,
    properties: IndexMap<String, String>,
}

impl ResourceInstance {
    /// Fresh instance with default properties
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            properties: IndexMap::new(),
        }
    }

    /// Resource class
    #[inline]
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Read a property
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Set a property, returning the previous value
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.properties.insert(key.into(), value.into())
    }

    /// Number of properties
    #[inline]
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

/// Graph-owned resource instances keyed by id
#[derive(Debug, Clone, Default)]
pub struct ResourceArena {
    instances: IndexMap<ResourceId, ResourceInstance>,
}

impl ResourceArena {
    /// Create empty arena
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a default instance of `class`
    pub fn allocate(&mut self, class: &str) -> ResourceHandle {
        let id = ResourceId::new();
        self.instances.insert(id, ResourceInstance::new(class));
        ResourceHandle {
            id,
            class: class.to_string(),
        }
    }

    /// Take ownership of an instance created elsewhere
    ///
    /// Returns `false` if the arena already owns the id.
    pub fn adopt(&mut self, handle: &ResourceHandle) -> bool {
        if self.instances.contains_key(&handle.id) {
            return false;
        }
        self.instances
            .insert(handle.id, ResourceInstance::new(handle.class.as_str()));
        true
    }

    /// Copy an instance under a fresh id
    pub fn duplicate(&mut self, handle: &ResourceHandle) -> Option<ResourceHandle> {
        let copy = self.instances.get(&handle.id)?.clone();
        let id = ResourceId::new();
        let class = copy.class.clone();
        self.instances.insert(id, copy);
        Some(ResourceHandle { id, class })
    }

    /// Borrow an instance
    #[inline]
    #[must_use]
    pub fn get(&self, id: ResourceId) -> Option<&ResourceInstance> {
        self.instances.get(&id)
    }

    /// Borrow an instance for editing
    #[inline]
    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut ResourceInstance> {
        self.instances.get_mut(&id)
    }

    /// Drop an instance
    pub fn remove(&mut self, id: ResourceId) -> Option<ResourceInstance> {
        self.instances.shift_remove(&id)
    }

    /// Check if the arena owns `id`
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ResourceId) -> bool {
        self.instances.contains_key(&id)
    }

    /// Number of instances
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Lifetime manager for shared placeholder resources
pub trait PlaceholderResourceManager {
    /// Placeholder for `identity` on `call_site`, created on first request
    fn get_or_create(
        &mut self,
        call_site: CallSiteId,
        identity: &ParameterIdentity,
        resource_class: &str,
    ) -> ResourceHandle;

    /// Existing placeholder, if any
    fn get(&self, call_site: CallSiteId, identity: &ParameterIdentity) -> Option<ResourceHandle>;

    /// Stop tracking a placeholder, handing it to the caller
    fn release(&mut self, call_site: CallSiteId, identity: &ParameterIdentity) -> Option<ResourceHandle>;

    /// Drop every placeholder of a call-site, returning how many were dropped
    fn release_call_site(&mut self, call_site: CallSiteId) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PlaceholderKey {
    call_site: CallSiteId,
    identity: ParameterIdentity,
}

/// Arena-backed [`PlaceholderResourceManager`]
#[derive(Debug, Clone, Default)]
pub struct PlaceholderArena {
    slots: HashMap<PlaceholderKey, ResourceHandle>,
}

impl PlaceholderArena {
    /// Create empty arena
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live placeholders
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl PlaceholderResourceManager for PlaceholderArena {
    fn get_or_create(
        &mut self,
        call_site: CallSiteId,
        identity: &ParameterIdentity,
        resource_class: &str,
    ) -> ResourceHandle {
        let key = PlaceholderKey {
            call_site,
            identity: identity.clone(),
        };
        self.slots
            .entry(key)
            .or_insert_with(|| {
                tracing::debug!(%call_site, %identity, "allocating placeholder resource");
                ResourceHandle {
                    id: ResourceId::new(),
                    class: resource_class.to_string(),
                }
            })
            .clone()
    }

    fn get(&self, call_site: CallSiteId, identity: &ParameterIdentity) -> Option<ResourceHandle> {
        let key = PlaceholderKey {
            call_site,
            identity: identity.clone(),
        };
        self.slots.get(&key).cloned()
    }

    fn release(&mut self, call_site: CallSiteId, identity: &ParameterIdentity) -> Option<ResourceHandle> {
        let key = PlaceholderKey {
            call_site,
            identity: identity.clone(),
        };
        self.slots.remove(&key)
    }

    fn release_call_site(&mut self, call_site: CallSiteId) -> usize {
        let before = self.slots.len();
        self.slots.retain(|key, _| key.call_site != call_site);
        before - self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pore_types::TypeDef;

    fn identity(call_site: CallSiteId) -> ParameterIdentity {
        ParameterIdentity::new(
            "Module.Curve".parse().unwrap(),
            TypeDef::resource("CurveData"),
            call_site,
        )
    }

    #[test]
    fn placeholder_is_shared_per_identity() {
        let mut arena = PlaceholderArena::new();
        let site = CallSiteId::new();
        let id = identity(site);

        let a = arena.get_or_create(site, &id, "CurveData");
        let b = arena.get_or_create(site, &id, "CurveData");
        assert_eq!(a, b);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn placeholders_differ_across_call_sites() {
        let mut arena = PlaceholderArena::new();
        let (s1, s2) = (CallSiteId::new(), CallSiteId::new());
        let a = arena.get_or_create(s1, &identity(s1), "CurveData");
        let b = arena.get_or_create(s2, &identity(s2), "CurveData");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn release_call_site_drops_only_that_site() {
        let mut arena = PlaceholderArena::new();
        let (s1, s2) = (CallSiteId::new(), CallSiteId::new());
        arena.get_or_create(s1, &identity(s1), "CurveData");
        arena.get_or_create(s2, &identity(s2), "CurveData");

        assert_eq!(arena.release_call_site(s1), 1);
        assert!(arena.get(s1, &identity(s1)).is_none());
        assert!(arena.get(s2, &identity(s2)).is_some());
    }

    #[test]
    fn arena_duplicate_copies_properties() {
        let mut arena = ResourceArena::new();
        let original = arena.allocate("CurveData");
        arena
            .get_mut(original.id)
            .unwrap()
            .set_property("keys", "0:0,1:1");

        let copy = arena.duplicate(&original).unwrap();
        assert_ne!(copy.id, original.id);
        assert_eq!(arena.get(copy.id).unwrap().property("keys"), Some("0:0,1:1"));
    }

    #[test]
    fn adopt_is_idempotent() {
        let mut arena = ResourceArena::new();
        let handle = ResourceHandle {
            id: ResourceId::new(),
            class: "CurveData".into(),
        };
        assert!(arena.adopt(&handle));
        assert!(!arena.adopt(&handle));
        assert_eq!(arena.len(), 1);
    }
}
