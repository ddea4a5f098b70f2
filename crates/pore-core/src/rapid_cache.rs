//! Rapid cache
//!
//! Plain constants set on inputs that have never been overridden are stored
//! here instead of as graph wiring. Entries are grouped per script graph and
//! keyed by call-site, name and static flag, never by type. Each entry
//! remembers the type it was written under so a later change to the input's
//! declaration can be detected and the entry purged.

use pore_types::{
    CallSiteId, Fingerprint, GraphId, LocalValue, ParameterIdentity, ParameterName, TypeDef, ValueBytes,
};
use std::collections::HashMap;

/// Type-independent slot of an identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RapidKey {
    call_site: CallSiteId,
    name: ParameterName,
    static_param: bool,
}

impl RapidKey {
    /// Slot addressed by `identity`, whatever type it is declared with
    #[must_use]
    pub fn of(identity: &ParameterIdentity) -> Self {
        Self {
            call_site: identity.call_site(),
            name: identity.name().clone(),
            static_param: identity.is_static(),
        }
    }

    /// Owning call-site
    #[inline]
    #[must_use]
    pub fn call_site(&self) -> CallSiteId {
        self.call_site
    }
}

/// Encoded value plus the type it was written under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RapidCacheEntry {
    type_def: TypeDef,
    type_fingerprint: Fingerprint,
    bytes: ValueBytes,
}

impl RapidCacheEntry {
    /// Create entry for bytes already checked against `type_def`
    #[must_use]
    pub fn new(type_def: TypeDef, bytes: ValueBytes) -> Self {
        let type_fingerprint = type_def.fingerprint();
        Self {
            type_def,
            type_fingerprint,
            bytes,
        }
    }

    /// Type at write time
    #[inline]
    #[must_use]
    pub fn type_def(&self) -> &TypeDef {
        &self.type_def
    }

    /// Encoded bytes
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Check whether the entry is still usable for an input now declared as `declared`
    ///
    /// An unchanged declaration is always fresh. A changed one is fresh only
    /// when it still accepts the stored type and the bytes still decode.
    #[must_use]
    pub fn is_fresh_for(&self, declared: &TypeDef) -> bool {
        if declared.fingerprint() == self.type_fingerprint {
            return true;
        }
        declared.is_assignable_from(&self.type_def) && declared.check_bytes(&self.bytes).is_ok()
    }

    /// View as a local value of the declared type
    #[must_use]
    pub fn to_local(&self, declared: &TypeDef) -> LocalValue {
        LocalValue::new(declared.clone(), self.bytes.clone())
    }
}

/// Entries of one script
#[derive(Debug, Clone, Default)]
pub struct RapidCache {
    entries: HashMap<RapidKey, RapidCacheEntry>,
}

impl RapidCache {
    /// Create empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for an identity
    #[inline]
    #[must_use]
    pub fn get(&self, identity: &ParameterIdentity) -> Option<&RapidCacheEntry> {
        self.entries.get(&RapidKey::of(identity))
    }

    /// Insert or replace, returning the previous entry
    pub fn insert(&mut self, identity: &ParameterIdentity, entry: RapidCacheEntry) -> Option<RapidCacheEntry> {
        self.entries.insert(RapidKey::of(identity), entry)
    }

    /// Remove an entry
    pub fn remove(&mut self, identity: &ParameterIdentity) -> Option<RapidCacheEntry> {
        self.entries.remove(&RapidKey::of(identity))
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rapid caches of every script, keyed by the owning graph
#[derive(Debug, Clone, Default)]
pub struct RapidCacheStore {
    scripts: HashMap<GraphId, RapidCache>,
}

impl RapidCacheStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache of one script
    #[inline]
    #[must_use]
    pub fn script(&self, graph: GraphId) -> Option<&RapidCache> {
        self.scripts.get(&graph)
    }

    /// Entry for an identity in a script
    #[must_use]
    pub fn get(&self, graph: GraphId, identity: &ParameterIdentity) -> Option<&RapidCacheEntry> {
        self.scripts.get(&graph)?.get(identity)
    }

    /// Insert or replace an entry
    pub fn insert(
        &mut self,
        graph: GraphId,
        identity: &ParameterIdentity,
        entry: RapidCacheEntry,
    ) -> Option<RapidCacheEntry> {
        self.scripts.entry(graph).or_default().insert(identity, entry)
    }

    /// Remove an entry
    pub fn remove(&mut self, graph: GraphId, identity: &ParameterIdentity) -> Option<RapidCacheEntry> {
        let cache = self.scripts.get_mut(&graph)?;
        let removed = cache.remove(identity);
        if cache.is_empty() {
            self.scripts.remove(&graph);
        }
        removed
    }

    /// Drop every entry belonging to a call-site; returns how many were dropped
    pub fn purge_call_site(&mut self, call_site: CallSiteId) -> usize {
        let mut purged = 0;
        for cache in self.scripts.values_mut() {
            let before = cache.len();
            cache.entries.retain(|key, _| key.call_site() != call_site);
            purged += before - cache.len();
        }
        self.scripts.retain(|_, cache| !cache.is_empty());
        purged
    }

    /// Total entries across scripts
    #[must_use]
    pub fn len(&self) -> usize {
        self.scripts.values().map(RapidCache::len).sum()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
