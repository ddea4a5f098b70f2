//! Namespace-qualified parameter names
//!
//! Provides [`ParameterName`], the dot-separated path (`Category.Name`) used to
//! address parameters across the script graph.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Placeholder namespace for a module's own inputs
///
/// Rewritten to the call-site's unique instance name whenever a name crosses
/// a call boundary (see [`ParameterName::aliased`]).
pub const MODULE_NAMESPACE: &str = "Module";

/// Namespace of user-exposed parameters
pub const USER_NAMESPACE: &str = "User";

/// Namespace of engine-provided constants
pub const ENGINE_NAMESPACE: &str = "Engine";

/// Namespace-qualified parameter name
///
/// # Examples
/// - `["Module", "Speed"]` → `Module.Speed`
/// - `["User", "Wind", "Strength"]` → `User.Wind.Strength`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParameterName(Vec<String>);

impl ParameterName {
    /// Build a name from pre-validated segments
    ///
    /// # Errors
    /// Returns error if there are no segments or a segment is invalid
    pub fn from_segments<I, S>(segments: I) -> Result<Self, NameError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(NameError::Empty);
        }
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self(segments))
    }

    /// Name inside the module placeholder namespace (`Module.<input>`)
    ///
    /// # Errors
    /// Returns error if `input` is not a valid segment
    pub fn module_input(input: &str) -> Result<Self, NameError> {
        Self::from_segments([MODULE_NAMESPACE, input])
    }

    /// Path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// First segment, the namespace
    ///
    /// Single-segment names are their own namespace.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.0.first().map_or("", String::as_str)
    }

    /// Last segment, the input name as declared by the owning function
    #[inline]
    #[must_use]
    pub fn input_name(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// True when the name lives in the `Module` placeholder namespace
    #[inline]
    #[must_use]
    pub fn is_module_scoped(&self) -> bool {
        self.0.len() > 1 && self.namespace() == MODULE_NAMESPACE
    }

    /// True when the name lives in the `User` namespace
    #[inline]
    #[must_use]
    pub fn is_user_scoped(&self) -> bool {
        self.0.len() > 1 && self.namespace() == USER_NAMESPACE
    }

    /// Append a segment, returning a new name
    ///
    /// # Errors
    /// Returns error if `segment` is invalid
    pub fn child(&self, segment: &str) -> Result<Self, NameError> {
        validate_segment(segment)?;
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Ok(Self(segments))
    }

    /// Parent name (if more than one segment)
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Substitute the call-site instance name for the `Module` placeholder
    ///
    /// Names outside the module namespace are returned unchanged. The
    /// instance name is trusted: it comes from the graph, which guarantees it
    /// is a valid, unique segment.
    #[must_use]
    pub fn aliased(&self, instance_name: &str) -> Self {
        if !self.is_module_scoped() {
            return self.clone();
        }
        let mut segments = self.0.clone();
        segments[0] = instance_name.to_string();
        Self(segments)
    }

    /// True if `self` is a strict prefix of `other`
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Slash-separated key used by prefix indexes
    #[inline]
    #[must_use]
    pub fn to_trie_key(&self) -> String {
        self.0.join("/")
    }
}

fn validate_segment(segment: &str) -> Result<(), NameError> {
    if segment.is_empty() {
        Err(NameError::EmptySegment)
    } else if segment.contains(|c: char| !c.is_alphanumeric() && c != '_') {
        Err(NameError::InvalidSegment(segment.to_string()))
    } else {
        Ok(())
    }
}

impl Display for ParameterName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for ParameterName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(NameError::Empty);
        }
        Self::from_segments(s.split('.'))
    }
}

impl serde::Serialize for ParameterName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ParameterName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors related to parameter names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// Name without segments
    #[error("parameter name cannot be empty")]
    Empty,

    /// Empty segment in name
    #[error("parameter name contains empty segment")]
    EmptySegment,

    /// Invalid segment characters
    #[error("invalid segment: {0} (must be alphanumeric or underscore)")]
    InvalidSegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ParameterName {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display() {
        let n = name("Module.Speed");
        assert_eq!(n.segments(), &["Module", "Speed"]);
        assert_eq!(n.to_string(), "Module.Speed");
    }

    #[test]
    fn namespace_and_input_name() {
        let n = name("User.Wind.Strength");
        assert_eq!(n.namespace(), "User");
        assert_eq!(n.input_name(), "Strength");
        assert!(n.is_user_scoped());
        assert!(!n.is_module_scoped());
    }

    #[test]
    fn single_segment_is_its_own_namespace() {
        let n = name("EngineTime");
        assert_eq!(n.namespace(), "EngineTime");
        assert!(!n.is_module_scoped());
        assert!(n.parent().is_none());
    }

    #[test]
    fn aliasing_replaces_module_placeholder() {
        let n = name("Module.Speed");
        assert_eq!(n.aliased("Jitter_001").to_string(), "Jitter_001.Speed");
    }

    #[test]
    fn aliasing_keeps_other_namespaces() {
        let n = name("User.Speed");
        assert_eq!(n.aliased("Jitter_001"), n);
    }

    #[test]
    fn aliasing_keeps_nested_segments() {
        let n = name("Module.Noise.Frequency");
        assert_eq!(n.aliased("Curl").to_string(), "Curl.Noise.Frequency");
    }

    #[test]
    fn child_and_ancestry() {
        let parent = name("Module.Noise");
        let child = parent.child("Frequency").unwrap();
        assert_eq!(child.to_string(), "Module.Noise.Frequency");
        assert!(parent.is_ancestor_of(&child));
        assert!(!child.is_ancestor_of(&parent));
        assert_eq!(child.parent(), Some(parent));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<ParameterName>(), Err(NameError::Empty));
        assert_eq!("a..b".parse::<ParameterName>(), Err(NameError::EmptySegment));
        assert!(matches!(
            "a.b-c".parse::<ParameterName>(),
            Err(NameError::InvalidSegment(_))
        ));
        assert!(name("a").child("x y").is_err());
    }

    #[test]
    fn trie_key_uses_slashes() {
        assert_eq!(name("Engine.Owner.Position").to_trie_key(), "Engine/Owner/Position");
    }

    #[test]
    fn serde_roundtrips_as_string() {
        let n = name("Module.Speed");
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, "\"Module.Speed\"");
        assert_eq!(serde_json::from_str::<ParameterName>(&json).unwrap(), n);
    }
}
