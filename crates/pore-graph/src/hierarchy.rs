//! Input hierarchy
//!
//! A function may ship an external grouping of its inputs for display:
//! sections, renamed entries, entries nested under another input and hidden
//! entries. The hierarchy only affects presentation. Inputs it does not
//! mention keep their declaration order after the ones it does.

use serde::{Deserialize, Serialize};

/// Display grouping of a function's inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputHierarchy {
    sections: Vec<HierarchySection>,
}

/// Named group of entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchySection {
    name: String,
    entries: Vec<HierarchyEntry>,
}

/// One input placement, optionally with re-parented children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyEntry {
    input: String,
    display_name: Option<String>,
    hidden: bool,
    children: Vec<HierarchyEntry>,
}

/// Flattened placement of one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Declared input name
    pub input: String,
    /// Name to show; the input name unless renamed
    pub display_name: String,
    /// Hidden from display (inherited from hidden ancestors)
    pub hidden: bool,
    /// Section the entry belongs to
    pub section: String,
    /// Input this entry is displayed under, if re-parented
    pub display_parent: Option<String>,
}

impl InputHierarchy {
    /// Create empty hierarchy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With an additional section
    #[must_use]
    pub fn with_section(mut self, section: HierarchySection) -> Self {
        self.sections.push(section);
        self
    }

    /// Sections in display order
    #[inline]
    #[must_use]
    pub fn sections(&self) -> &[HierarchySection] {
        &self.sections
    }

    /// Depth-first placements in display order
    ///
    /// An input mentioned more than once keeps its first placement.
    #[must_use]
    pub fn placements(&self) -> Vec<Placement> {
        let mut out = Vec::new();
        for section in &self.sections {
            for entry in &section.entries {
                flatten(entry, &section.name, None, false, &mut out);
            }
        }
        let mut seen = std::collections::HashSet::new();
        out.retain(|p| seen.insert(p.input.clone()));
        out
    }

    /// Placement of a single input
    #[must_use]
    pub fn placement(&self, input: &str) -> Option<Placement> {
        self.placements().into_iter().find(|p| p.input == input)
    }
}

fn flatten(
    entry: &HierarchyEntry,
    section: &str,
    parent: Option<&str>,
    parent_hidden: bool,
    out: &mut Vec<Placement>,
) {
    let hidden = parent_hidden || entry.hidden;
    out.push(Placement {
        input: entry.input.clone(),
        display_name: entry
            .display_name
            .clone()
            .unwrap_or_else(|| entry.input.clone()),
        hidden,
        section: section.to_string(),
        display_parent: parent.map(str::to_string),
    });
    for child in &entry.children {
        flatten(child, section, Some(&entry.input), hidden, out);
    }
}

impl HierarchySection {
    /// Create empty section
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// With an additional entry
    #[must_use]
    pub fn with_entry(mut self, entry: HierarchyEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Section name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl HierarchyEntry {
    /// Place a declared input
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            display_name: None,
            hidden: false,
            children: Vec::new(),
        }
    }

    /// Show under a different name
    #[must_use]
    pub fn renamed(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Hide from display
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Nest another input under this one
    #[must_use]
    pub fn with_child(mut self, child: HierarchyEntry) -> Self {
        self.children.push(child);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> InputHierarchy {
        InputHierarchy::new()
            .with_section(
                HierarchySection::new("Motion").with_entry(
                    HierarchyEntry::new("Speed")
                        .renamed("Velocity Scale")
                        .with_child(HierarchyEntry::new("Falloff")),
                ),
            )
            .with_section(
                HierarchySection::new("Advanced")
                    .with_entry(HierarchyEntry::new("Seed").hidden().with_child(HierarchyEntry::new("Jitter")))
                    .with_entry(HierarchyEntry::new("Speed").renamed("Duplicate")),
            )
    }

    #[test]
    fn placements_flatten_depth_first() {
        let inputs: Vec<String> = sample().placements().into_iter().map(|p| p.input).collect();
        assert_eq!(inputs, vec!["Speed", "Falloff", "Seed", "Jitter"]);
    }

    #[test]
    fn rename_and_reparent() {
        let hierarchy = sample();
        let speed = hierarchy.placement("Speed").unwrap();
        assert_eq!(speed.display_name, "Velocity Scale");
        assert_eq!(speed.section, "Motion");

        let falloff = hierarchy.placement("Falloff").unwrap();
        assert_eq!(falloff.display_parent.as_deref(), Some("Speed"));
        assert_eq!(falloff.display_name, "Falloff");
    }

    #[test]
    fn hidden_is_inherited() {
        let hierarchy = sample();
        assert!(hierarchy.placement("Seed").unwrap().hidden);
        assert!(hierarchy.placement("Jitter").unwrap().hidden);
        assert!(!hierarchy.placement("Falloff").unwrap().hidden);
    }

    #[test]
    fn unknown_input_has_no_placement() {
        assert!(sample().placement("Missing").is_none());
    }
}
