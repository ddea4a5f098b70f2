//! Resolution engine
//!
//! [`ResolutionEngine`] owns the graph accessor, the placeholder manager, the
//! rapid cache and the memo. Resolution lives in `resolver`, value-changing
//! operations in `mutator` and nested inputs in `expansion`; all of them are
//! methods on this type.
//!
//! The engine is single-threaded by construction: every operation takes
//! `&mut self`, so callers sharing it across threads must serialize access
//! themselves.

use crate::config::{ConfigError, ResolverConfig};
use crate::memo::{MemoStats, ResolutionMemo};
use crate::rapid_cache::{RapidCacheEntry, RapidCacheStore};
use pore_graph::{GraphAccessor, PlaceholderArena, PlaceholderResourceManager};
use pore_types::{CallSiteId, ParameterIdentity};
use tracing::debug;

/// What [`ResolutionEngine::purge_call_site`] dropped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Memoized results dropped
    pub memo_entries: usize,
    /// Rapid-cache entries dropped
    pub rapid_entries: usize,
    /// Placeholder resources released
    pub placeholders: usize,
}

/// Resolver and mutator over one graph
#[derive(Debug)]
pub struct ResolutionEngine<G, P = PlaceholderArena> {
    pub(crate) graph: G,
    pub(crate) placeholders: P,
    pub(crate) config: ResolverConfig,
    pub(crate) rapid: RapidCacheStore,
    pub(crate) memo: ResolutionMemo,
}

impl<G: GraphAccessor> ResolutionEngine<G, PlaceholderArena> {
    /// Create engine with default configuration
    #[must_use]
    pub fn new(graph: G) -> Self {
        Self::from_parts(graph, PlaceholderArena::new(), ResolverConfig::default())
    }

    /// Create engine with a validated configuration
    ///
    /// # Errors
    /// Returns error if the configuration fails validation
    pub fn with_config(graph: G, config: ResolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(graph, PlaceholderArena::new(), config))
    }
}

impl<G: GraphAccessor, P: PlaceholderResourceManager> ResolutionEngine<G, P> {
    /// Create engine with an external placeholder manager
    ///
    /// # Errors
    /// Returns error if the configuration fails validation
    pub fn with_placeholders(graph: G, placeholders: P, config: ResolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(graph, placeholders, config))
    }

    fn from_parts(graph: G, placeholders: P, config: ResolverConfig) -> Self {
        Self {
            graph,
            placeholders,
            config,
            rapid: RapidCacheStore::new(),
            memo: ResolutionMemo::new(),
        }
    }

    /// Borrow the graph
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Borrow the graph for direct edits
    ///
    /// Edits made here bump graph versions, so memoized results revalidate on
    /// their own.
    #[inline]
    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    /// Consume the engine, returning the graph
    #[must_use]
    pub fn into_graph(self) -> G {
        self.graph
    }

    /// Borrow the placeholder manager
    #[inline]
    #[must_use]
    pub fn placeholders(&self) -> &P {
        &self.placeholders
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Rapid-cache entry for an identity, looked up through its call-site
    #[must_use]
    pub fn rapid_cache_entry(&self, identity: &ParameterIdentity) -> Option<&RapidCacheEntry> {
        let site = self.graph.call_site(identity.call_site())?;
        self.rapid.get(site.owning_graph, identity)
    }

    /// Rapid-cache entries across all scripts
    #[inline]
    #[must_use]
    pub fn rapid_cache_len(&self) -> usize {
        self.rapid.len()
    }

    /// Memo counters
    #[inline]
    #[must_use]
    pub fn memo_stats(&self) -> MemoStats {
        self.memo.stats()
    }

    /// Forget the memoized result of one identity and its nested children
    pub fn invalidate(&mut self, identity: &ParameterIdentity) -> usize {
        self.invalidate_subtree(identity)
    }

    /// Drop memoized results of `identity` and of the children on the nested
    /// call-sites currently reachable from it
    pub(crate) fn invalidate_subtree(&mut self, identity: &ParameterIdentity) -> usize {
        let nested = self.nested_call_sites(identity);
        self.memo.invalidate_subtree(identity, &nested)
    }

    /// Forget every memoized result
    pub fn invalidate_all(&mut self) -> usize {
        let dropped = self.memo.clear();
        debug!(dropped, "memo cleared");
        dropped
    }

    /// Drop all engine-side state of a call-site
    pub fn purge_call_site(&mut self, call_site: CallSiteId) -> PurgeReport {
        let report = PurgeReport {
            memo_entries: self.memo.invalidate_call_site(call_site),
            rapid_entries: self.rapid.purge_call_site(call_site),
            placeholders: self.placeholders.release_call_site(call_site),
        };
        debug!(%call_site, ?report, "purged call-site state");
        report
    }
}
