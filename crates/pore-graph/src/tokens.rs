//! Change tracking
//!
//! Every graph carries a [`GraphVersion`] drawn from one monotonically
//! increasing counter, so a version value is never handed out twice, not even
//! across graphs. Resolution captures [`ChangeTokens`] and compares them on
//! the next query to decide whether a memoized result is still current.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Version stamp of one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GraphVersion(u64);

impl GraphVersion {
    /// Wrap a raw counter value
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw counter value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for GraphVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Source of fresh versions
#[derive(Debug, Clone, Default)]
pub struct VersionCounter {
    last: u64,
}

impl VersionCounter {
    /// Create counter starting at zero
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next version
    pub fn next_version(&mut self) -> GraphVersion {
        self.last = self.last.saturating_add(1);
        GraphVersion(self.last)
    }

    /// Most recently issued version
    #[inline]
    #[must_use]
    pub fn current(&self) -> GraphVersion {
        GraphVersion(self.last)
    }
}

/// Versions captured for one call-site at resolution time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeTokens {
    /// Version of the graph that owns the call-site
    pub owning: GraphVersion,
    /// Version of the called function's graph, when it has one
    pub called: Option<GraphVersion>,
}

impl ChangeTokens {
    /// Tokens for a call-site
    #[inline]
    #[must_use]
    pub fn new(owning: GraphVersion, called: Option<GraphVersion>) -> Self {
        Self { owning, called }
    }
}

impl Display for ChangeTokens {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.called {
            Some(called) => write!(f, "{}/{}", self.owning, called),
            None => write!(f, "{}/-", self.owning),
        }
    }
}
