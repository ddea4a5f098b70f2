//! Resolution memo
//!
//! Results are stamped with the call-site's [`ChangeTokens`] and the context
//! fingerprint. A lookup whose stamp differs is a miss; the stale entry is
//! simply overwritten by the next store.

use pore_graph::ChangeTokens;
use pore_types::{CallSiteId, Fingerprint, ParameterIdentity, ValueSource};
use std::collections::{HashMap, HashSet};

/// Validity stamp of a memoized result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoStamp {
    tokens: ChangeTokens,
    context: Fingerprint,
}

impl MemoStamp {
    /// Stamp for tokens captured under a context
    #[inline]
    #[must_use]
    pub fn new(tokens: ChangeTokens, context: Fingerprint) -> Self {
        Self { tokens, context }
    }

    /// Captured change tokens
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> ChangeTokens {
        self.tokens
    }
}

#[derive(Debug, Clone)]
struct MemoEntry {
    stamp: MemoStamp,
    value: ValueSource,
}

/// Memo counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
    /// Lookups answered from the memo
    pub hits: u64,
    /// Lookups that had to re-derive
    pub misses: u64,
    /// Entries dropped by explicit invalidation
    pub invalidations: u64,
    /// Entries currently held
    pub entries: usize,
}

/// Memoized resolution results keyed by identity
#[derive(Debug, Clone, Default)]
pub struct ResolutionMemo {
    entries: HashMap<ParameterIdentity, MemoEntry>,
    hits: u64,
    misses: u64,
    invalidations: u64,
}

impl ResolutionMemo {
    /// Create empty memo
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoized result if its stamp matches
    pub fn lookup(&mut self, identity: &ParameterIdentity, stamp: MemoStamp) -> Option<ValueSource> {
        match self.entries.get(identity) {
            Some(entry) if entry.stamp == stamp => {
                self.hits += 1;
                Some(entry.value.clone())
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a freshly derived result
    pub fn store(&mut self, identity: ParameterIdentity, stamp: MemoStamp, value: ValueSource) {
        self.entries.insert(identity, MemoEntry { stamp, value });
    }

    /// Drop one identity; returns `true` if it was memoized
    pub fn invalidate(&mut self, identity: &ParameterIdentity) -> bool {
        let removed = self.entries.remove(identity).is_some();
        if removed {
            self.invalidations += 1;
        }
        removed
    }

    /// Drop an identity and its nested children
    ///
    /// Children live on the nested call-sites in `nested`; a descendant name
    /// on any other call-site is kept.
    pub fn invalidate_subtree(&mut self, identity: &ParameterIdentity, nested: &HashSet<CallSiteId>) -> usize {
        self.drop_where(|key| {
            key == identity
                || (nested.contains(&key.call_site()) && identity.name().is_ancestor_of(key.name()))
        })
    }

    /// Drop every identity of a call-site
    pub fn invalidate_call_site(&mut self, call_site: CallSiteId) -> usize {
        self.drop_where(|key| key.call_site() == call_site)
    }

    /// Drop everything
    pub fn clear(&mut self) -> usize {
        self.drop_where(|_| true)
    }

    fn drop_where(&mut self, predicate: impl Fn(&ParameterIdentity) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        let dropped = before - self.entries.len();
        self.invalidations += dropped as u64;
        dropped
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> MemoStats {
        MemoStats {
            hits: self.hits,
            misses: self.misses,
            invalidations: self.invalidations,
            entries: self.entries.len(),
        }
    }

    /// Number of memoized identities
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
