//! Nested input expansion and reset predicates
//!
//! An input whose value comes from a nested function call (`Dynamic` or
//! `DefaultFunction`) exposes the inputs of that call as children. Child
//! identities extend the parent's name with the input name and live on the
//! nested call-site.
//!
//! Display hints from the function's [`InputHierarchy`]
//! only order, rename and hide children. Hidden children are still resolved
//! and still count towards [`ResolutionEngine::can_reset`].

use crate::context::ResolutionContext;
use crate::engine::ResolutionEngine;
use pore_graph::{DefaultSpec, GraphAccessor, InputHierarchy, PlaceholderResourceManager, Producer};
use pore_types::{CallNodeHandle, CallSiteId, OverrideKey, ParameterIdentity, ValueSource};
use std::collections::HashSet;
use tracing::{debug, warn};

/// One child input with its display hints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildInput {
    /// Resolvable identity of the child
    pub identity: ParameterIdentity,
    /// Label to show (hierarchy rename or the input name)
    pub display_name: String,
    /// Hidden from display, still resolved
    pub hidden: bool,
    /// Hierarchy section, `None` for inputs the hierarchy does not mention
    pub section: Option<String>,
    /// Input this one is displayed under
    pub display_parent: Option<String>,
}

impl<G: GraphAccessor, P: PlaceholderResourceManager> ResolutionEngine<G, P> {
    /// Children of `identity` with display hints
    ///
    /// Inputs placed by the hierarchy come first in hierarchy order, the
    /// remaining inputs follow in declaration order. Empty when the input is
    /// not driven by a nested call.
    pub fn child_inputs(&mut self, identity: &ParameterIdentity, ctx: &ResolutionContext) -> Vec<ChildInput> {
        let Some(handle) = self.resolve(identity, ctx).call_handle() else {
            return Vec::new();
        };
        let Some(signature) = self.graph.function_signature(handle.function) else {
            warn!(%identity, function = %handle.function, "nested call has no signature");
            return Vec::new();
        };

        let placements = signature
            .hierarchy
            .as_ref()
            .map(InputHierarchy::placements)
            .unwrap_or_default();

        let mut ordered = Vec::with_capacity(signature.inputs.len());
        for placement in placements {
            if let Some(input) = signature.input(&placement.input) {
                ordered.push((input, Some(placement)));
            }
        }
        for input in &signature.inputs {
            if !ordered.iter().any(|(placed, _)| placed.name == input.name) {
                ordered.push((input, None));
            }
        }

        let mut children = Vec::with_capacity(ordered.len());
        for (input, placement) in ordered {
            let child = match identity.nested(
                &input.name,
                input.type_def.clone(),
                handle.call_site,
                input.static_param,
            ) {
                Ok(child) => child,
                Err(err) => {
                    warn!(%identity, input = %input.name, error = %err, "skipping child input");
                    continue;
                }
            };
            children.push(match placement {
                Some(placement) => ChildInput {
                    identity: child,
                    display_name: placement.display_name,
                    hidden: placement.hidden,
                    section: Some(placement.section),
                    display_parent: placement.display_parent,
                },
                None => ChildInput {
                    identity: child,
                    display_name: input.name.clone(),
                    hidden: false,
                    section: None,
                    display_parent: None,
                },
            });
        }
        children
    }

    /// Child identities of `identity`, hidden ones included
    pub fn expand_children(
        &mut self,
        identity: &ParameterIdentity,
        ctx: &ResolutionContext,
    ) -> Vec<ParameterIdentity> {
        self.child_inputs(identity, ctx)
            .into_iter()
            .map(|child| child.identity)
            .collect()
    }

    /// Child identities meant for display
    pub fn visible_children(
        &mut self,
        identity: &ParameterIdentity,
        ctx: &ResolutionContext,
    ) -> Vec<ParameterIdentity> {
        self.child_inputs(identity, ctx)
            .into_iter()
            .filter(|child| !child.hidden)
            .map(|child| child.identity)
            .collect()
    }

    /// Check if [`Self::reset`] would change anything visible
    ///
    /// True when this input holds local state that differs from its default,
    /// or when any child, hidden or not, can be reset.
    pub fn can_reset(&mut self, identity: &ParameterIdentity, ctx: &ResolutionContext) -> bool {
        self.can_reset_at(identity, ctx, 0)
    }

    fn can_reset_at(&mut self, identity: &ParameterIdentity, ctx: &ResolutionContext, depth: usize) -> bool {
        if depth > self.config.max_expansion_depth {
            return false;
        }
        if self.differs_from_default(identity, ctx) {
            return true;
        }
        self.expand_children(identity, ctx)
            .iter()
            .any(|child| self.can_reset_at(child, ctx, depth + 1))
    }

    fn differs_from_default(&mut self, identity: &ParameterIdentity, ctx: &ResolutionContext) -> bool {
        if !self.has_local_state(identity) {
            return false;
        }
        let Some(site) = self.graph.call_site(identity.call_site()) else {
            return false;
        };
        let Some(declared) = self.graph.declared_input(identity) else {
            return true;
        };
        let current = self.resolve(identity, ctx);
        let default = self.resolve_default(identity, &site, &declared, ctx);
        !current.structurally_equal(&default)
    }

    /// Override pin or rapid-cache entry present
    pub(crate) fn has_local_state(&self, identity: &ParameterIdentity) -> bool {
        let Some(site) = self.graph.call_site(identity.call_site()) else {
            return false;
        };
        let key = OverrideKey::for_identity(identity, &site.instance_name);
        self.graph.find_override_connection(&key).is_some()
            || self.rapid.get(site.owning_graph, identity).is_some()
    }

    /// Check if [`Self::reset_to_inherited`] would change anything
    ///
    /// False for call-sites without a live parent and when neither side holds
    /// local state; otherwise compares both resolved values.
    pub fn can_reset_to_inherited(&mut self, identity: &ParameterIdentity, ctx: &ResolutionContext) -> bool {
        let Some(site) = self.graph.call_site(identity.call_site()) else {
            return false;
        };
        let Some(parent) = site.inherited_from else {
            return false;
        };
        if self.graph.call_site(parent).is_none() {
            return false;
        }
        let parent_identity = identity.rebased(parent);
        if !self.has_local_state(identity) && !self.has_local_state(&parent_identity) {
            return false;
        }
        let own = self.resolve(identity, ctx);
        let inherited = self.resolve(&parent_identity, ctx);
        !own.structurally_equal(&inherited)
    }

    /// Nested call driving an input, read from its override or connected default
    ///
    /// Reads the graph directly so it can run while memoized results are
    /// being dropped.
    fn nested_call(&self, identity: &ParameterIdentity) -> Option<CallNodeHandle> {
        let site = self.graph.call_site(identity.call_site())?;
        let key = OverrideKey::for_identity(identity, &site.instance_name);
        let producer = match self.graph.find_override_connection(&key) {
            Some(point) => self.graph.classify_producer(point),
            None => match self.graph.declared_input(identity)?.default {
                DefaultSpec::Connected(point) => self.graph.classify_producer(point),
                _ => return None,
            },
        };
        match producer {
            Producer::NestedCall(handle) => Some(handle),
            _ => None,
        }
    }

    /// Call-sites of every nested call reachable below `identity`
    pub(crate) fn nested_call_sites(&self, identity: &ParameterIdentity) -> HashSet<CallSiteId> {
        let mut sites = HashSet::new();
        self.collect_nested_call_sites(identity, 0, &mut sites);
        sites
    }

    fn collect_nested_call_sites(
        &self,
        identity: &ParameterIdentity,
        depth: usize,
        sites: &mut HashSet<CallSiteId>,
    ) {
        if depth > self.config.max_expansion_depth {
            return;
        }
        let Some(handle) = self.nested_call(identity) else {
            return;
        };
        if !sites.insert(handle.call_site) {
            return;
        }
        let Some(signature) = self.graph.function_signature(handle.function) else {
            return;
        };
        for input in &signature.inputs {
            if let Ok(child) =
                identity.nested(&input.name, input.type_def.clone(), handle.call_site, input.static_param)
            {
                self.collect_nested_call_sites(&child, depth + 1, sites);
            }
        }
    }

    /// Resolve every nested input below a freshly attached call
    ///
    /// Resource inputs of the direct children get their own graph-owned
    /// instance instead of the shared placeholder. Returns the number of
    /// children resolved.
    pub(crate) fn initialize_children(
        &mut self,
        identity: &ParameterIdentity,
        ctx: &ResolutionContext,
    ) -> usize {
        self.initialize_children_at(identity, ctx, 0)
    }

    fn initialize_children_at(
        &mut self,
        identity: &ParameterIdentity,
        ctx: &ResolutionContext,
        depth: usize,
    ) -> usize {
        if depth >= self.config.max_expansion_depth {
            warn!(%identity, depth, "nested inputs exceed expansion depth");
            return 0;
        }
        let mut count = 0;
        for child in self.expand_children(identity, ctx) {
            let value = self.resolve(&child, ctx);
            count += 1;
            if depth == 0 && matches!(value, ValueSource::Data(_)) && !self.has_local_state(&child) {
                if let Err(err) = self.set_data(&child) {
                    warn!(identity = %child, error = %err, "could not promote placeholder resource");
                }
            }
            if value.call_handle().is_some() {
                count += self.initialize_children_at(&child, ctx, depth + 1);
            }
        }
        debug!(%identity, depth, count, "initialized nested inputs");
        count
    }
}
