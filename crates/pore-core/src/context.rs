//! Resolution context
//!
//! Everything resolution needs to know about the world outside the graph is
//! passed in explicitly as a [`ResolutionContext`]: engine constants,
//! user-exposed parameters and the parameters written upstream of the
//! call-site. Each set is a [`NameScope`], a radix trie keyed by the name's
//! slash-joined path so namespace listings are prefix queries.
//!
//! The context carries a fingerprint over its content. Memo stamps include
//! it, so a different context re-derives results without explicit
//! invalidation.

use pore_types::{Fingerprint, ParameterName, TypeDef};
use radix_trie::{Trie, TrieCommon};
use std::fmt;

#[derive(Debug, Clone)]
struct ScopeEntry {
    name: ParameterName,
    type_def: TypeDef,
}

/// Set of names visible to resolution
#[derive(Clone)]
pub struct NameScope {
    trie: Trie<String, ScopeEntry>,
}

impl NameScope {
    /// Create empty scope
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { trie: Trie::new() }
    }

    /// Declare a name, returning the type it previously had
    pub fn declare(&mut self, name: ParameterName, type_def: TypeDef) -> Option<TypeDef> {
        let key = name.to_trie_key();
        self.trie
            .insert(key, ScopeEntry { name, type_def })
            .map(|previous| previous.type_def)
    }

    /// Remove a name, returning its type
    pub fn remove(&mut self, name: &ParameterName) -> Option<TypeDef> {
        let key = name.to_trie_key();
        self.trie.remove(&key).map(|entry| entry.type_def)
    }

    /// Type of a declared name
    #[must_use]
    pub fn get(&self, name: &ParameterName) -> Option<&TypeDef> {
        let key = name.to_trie_key();
        self.trie.get(&key).map(|entry| &entry.type_def)
    }

    /// Check if a name is declared
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &ParameterName) -> bool {
        self.get(name).is_some()
    }

    /// Every name strictly below `prefix`, in key order
    #[must_use]
    pub fn under(&self, prefix: &ParameterName) -> Vec<(ParameterName, TypeDef)> {
        let key = prefix.to_trie_key();
        self.trie
            .get_raw_descendant(&key)
            .map(|subtrie| {
                subtrie
                    .values()
                    .filter(|entry| prefix.is_ancestor_of(&entry.name))
                    .map(|entry| (entry.name.clone(), entry.type_def.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every declared name with its type, in key order
    #[must_use]
    pub fn entries(&self) -> Vec<(&ParameterName, &TypeDef)> {
        self.trie
            .values()
            .map(|entry| (&entry.name, &entry.type_def))
            .collect()
    }

    /// Number of names
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.trie.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }
}

impl Default for NameScope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NameScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries().into_iter().map(|(name, _)| name.to_string()))
            .finish()
    }
}

/// Which scope of a context a name lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Engine-provided constants
    Engine,
    /// User-exposed parameters
    User,
    /// Parameters written upstream of the call-site
    Upstream,
}

impl ScopeKind {
    fn label(self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::User => "user",
            Self::Upstream => "upstream",
        }
    }
}

/// Read-only world state passed into every resolution
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    engine: NameScope,
    user: NameScope,
    upstream: NameScope,
    fingerprint: Fingerprint,
}

impl ResolutionContext {
    /// Create context with no visible names
    #[must_use]
    pub fn new() -> Self {
        let mut context = Self {
            engine: NameScope::new(),
            user: NameScope::new(),
            upstream: NameScope::new(),
            fingerprint: Fingerprint::default(),
        };
        context.refresh_fingerprint();
        context
    }

    /// Context with the standard engine constants declared
    #[must_use]
    pub fn with_engine_defaults() -> Self {
        let defaults = [
            (["Engine", "Time"].as_slice(), TypeDef::float()),
            (["Engine", "DeltaTime"].as_slice(), TypeDef::float()),
            (["Engine", "Owner", "Position"].as_slice(), TypeDef::position()),
            (["Engine", "ExecutionCount"].as_slice(), TypeDef::int()),
        ];
        let mut context = Self::new();
        for (segments, type_def) in defaults {
            if let Ok(name) = ParameterName::from_segments(segments.iter().copied()) {
                context.scope_mut(ScopeKind::Engine).declare(name, type_def);
            }
        }
        context.refresh_fingerprint();
        context
    }

    /// With an engine constant
    #[must_use]
    pub fn with_engine_constant(mut self, name: ParameterName, type_def: TypeDef) -> Self {
        self.declare(ScopeKind::Engine, name, type_def);
        self
    }

    /// With a user-exposed parameter
    #[must_use]
    pub fn with_user_parameter(mut self, name: ParameterName, type_def: TypeDef) -> Self {
        self.declare(ScopeKind::User, name, type_def);
        self
    }

    /// With an upstream write
    #[must_use]
    pub fn with_upstream_write(mut self, name: ParameterName, type_def: TypeDef) -> Self {
        self.declare(ScopeKind::Upstream, name, type_def);
        self
    }

    /// Declare a name in one scope
    pub fn declare(&mut self, scope: ScopeKind, name: ParameterName, type_def: TypeDef) {
        self.scope_mut(scope).declare(name, type_def);
        self.refresh_fingerprint();
    }

    /// Remove a name from one scope; returns `true` if it was present
    pub fn remove(&mut self, scope: ScopeKind, name: &ParameterName) -> bool {
        let removed = self.scope_mut(scope).remove(name).is_some();
        if removed {
            self.refresh_fingerprint();
        }
        removed
    }

    /// Borrow one scope
    #[must_use]
    pub fn scope(&self, scope: ScopeKind) -> &NameScope {
        match scope {
            ScopeKind::Engine => &self.engine,
            ScopeKind::User => &self.user,
            ScopeKind::Upstream => &self.upstream,
        }
    }

    fn scope_mut(&mut self, scope: ScopeKind) -> &mut NameScope {
        match scope {
            ScopeKind::Engine => &mut self.engine,
            ScopeKind::User => &mut self.user,
            ScopeKind::Upstream => &mut self.upstream,
        }
    }

    /// First scope declaring `name`, with the declared type
    #[must_use]
    pub fn lookup(&self, name: &ParameterName) -> Option<(ScopeKind, &TypeDef)> {
        [ScopeKind::Engine, ScopeKind::User, ScopeKind::Upstream]
            .into_iter()
            .find_map(|kind| self.scope(kind).get(name).map(|type_def| (kind, type_def)))
    }

    /// Check if any scope declares `name`
    #[inline]
    #[must_use]
    pub fn is_resolvable(&self, name: &ParameterName) -> bool {
        self.lookup(name).is_some()
    }

    /// Fingerprint over the full content
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    fn refresh_fingerprint(&mut self) {
        let mut parts = Vec::new();
        for kind in [ScopeKind::Engine, ScopeKind::User, ScopeKind::Upstream] {
            let scope = self.scope(kind);
            parts.push(kind.label().to_string());
            parts.push(scope.len().to_string());
            for (name, type_def) in scope.entries() {
                parts.push(name.to_string());
                parts.push(type_def.fingerprint().to_string());
            }
        }
        self.fingerprint = Fingerprint::of_parts(parts);
    }
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new()
    }
}
