//! Value-changing operations
//!
//! Every operation validates all of its preconditions before the first graph
//! write, so a rejected call leaves graph, rapid cache and memo untouched.
//! Every applied operation drops the memoized results of the identity and
//! its nested children before returning.

use crate::context::ResolutionContext;
use crate::engine::ResolutionEngine;
use crate::error::{MutationError, MutationOutcome, MutationResult};
use crate::rapid_cache::RapidCacheEntry;
use pore_graph::{
    CallSiteInfo, ConnectionPoint, DeclaredInput, GraphAccessor, GraphError,
    PlaceholderResourceManager, Producer,
};
use pore_types::{
    CallNodeHandle, FunctionId, LinkedParameter, OverrideKey, ParameterIdentity, ValueBytes,
    ValueSource,
};
use tracing::{debug, warn};

/// Live call-site, declaration and override key of one identity
struct Target {
    site: CallSiteInfo,
    declared: DeclaredInput,
    key: OverrideKey,
    existing: Option<ConnectionPoint>,
}

fn rejected(identity: &ParameterIdentity, err: MutationError) -> MutationError {
    warn!(%identity, error = %err, "mutation rejected");
    err
}

impl<G: GraphAccessor, P: PlaceholderResourceManager> ResolutionEngine<G, P> {
    fn target(&self, identity: &ParameterIdentity) -> MutationResult<Target> {
        let site = self
            .graph
            .call_site(identity.call_site())
            .ok_or_else(|| rejected(identity, MutationError::CallSiteDestroyed(identity.call_site())))?;
        let declared = self
            .graph
            .declared_input(identity)
            .ok_or_else(|| rejected(identity, MutationError::UnknownInput(identity.name().clone())))?;
        let key = OverrideKey::for_identity(identity, &site.instance_name);
        let existing = self.graph.find_override_connection(&key);
        Ok(Target {
            site,
            declared,
            key,
            existing,
        })
    }

    fn current_producer(&self, target: &Target) -> Option<Producer> {
        target.existing.map(|point| self.graph.classify_producer(point))
    }

    /// Drop any existing override subgraph and create a fresh, empty pin
    fn fresh_override(&mut self, target: &Target) -> MutationResult<ConnectionPoint> {
        if let Some(point) = target.existing {
            self.graph.remove_override_subgraph(point)?;
        }
        Ok(self.graph.create_override_connection(&target.key)?)
    }

    fn finish(&mut self, identity: &ParameterIdentity, target: &Target, operation: &str) -> MutationOutcome {
        self.rapid.remove(target.site.owning_graph, identity);
        self.invalidate_subtree(identity);
        debug!(%identity, operation, "mutation applied");
        MutationOutcome::Applied
    }

    /// Store an inline constant
    ///
    /// Untouched, rapid-cache eligible inputs keep the value in the rapid
    /// cache without any graph edit. Everything else gets an inline-literal
    /// override pin.
    ///
    /// # Errors
    /// Returns error if the input is resource-typed, not inline, or `bytes`
    /// is not a well-formed value of its type
    pub fn set_local(
        &mut self,
        identity: &ParameterIdentity,
        bytes: &[u8],
        ctx: &ResolutionContext,
    ) -> MutationResult {
        let type_def = identity.type_def();
        if type_def.is_resource() {
            return Err(rejected(identity, MutationError::ResourceTyped(identity.name().clone())));
        }
        if !type_def.is_inline() {
            return Err(rejected(identity, MutationError::NotInlineEncodable(type_def.name().to_string())));
        }
        let target = self.target(identity)?;
        if !target.declared.type_def.is_assignable_from(type_def) {
            return Err(rejected(
                identity,
                MutationError::incompatible(&target.declared.type_def, type_def),
            ));
        }
        if let Some(expected) = type_def.byte_size().filter(|size| *size != bytes.len()) {
            return Err(rejected(
                identity,
                MutationError::MalformedValue {
                    expected,
                    actual: bytes.len(),
                },
            ));
        }
        type_def
            .check_bytes(bytes)
            .map_err(|err| rejected(identity, err.into()))?;

        let use_rapid = target.existing.is_none()
            && self.rapid_eligible(identity, &target.declared)
            && matches!(
                self.resolve_default(identity, &target.site, &target.declared, ctx),
                ValueSource::Local(_)
            );

        if use_rapid {
            let entry = RapidCacheEntry::new(type_def.clone(), ValueBytes::from_slice(bytes));
            let graph = target.site.owning_graph;
            if self.rapid.get(graph, identity) == Some(&entry) {
                return Ok(MutationOutcome::Unchanged);
            }
            self.rapid.insert(graph, identity, entry);
            self.invalidate_subtree(identity);
            debug!(%identity, "stored local value in rapid cache");
            return Ok(MutationOutcome::Applied);
        }

        let literal = type_def.encode_literal(bytes)?;
        if self.current_producer(&target) == Some(Producer::Literal(literal.clone())) {
            return Ok(MutationOutcome::Unchanged);
        }
        let point = self.fresh_override(&target)?;
        self.graph.set_override_literal(point, &literal)?;
        Ok(self.finish(identity, &target, "set_local"))
    }

    /// Link the input to another parameter
    ///
    /// A user-scoped target that is not declared yet is declared first.
    ///
    /// # Errors
    /// Returns error if the target's type is not assignable to the input
    pub fn set_linked(&mut self, identity: &ParameterIdentity, target_param: &LinkedParameter) -> MutationResult {
        let target = self.target(identity)?;
        if !identity.type_def().is_assignable_from(&target_param.type_def) {
            return Err(rejected(
                identity,
                MutationError::incompatible(identity.type_def(), &target_param.type_def),
            ));
        }
        if let Some(Producer::ReadParameter { name, .. }) = self.current_producer(&target) {
            if name == target_param.name {
                return Ok(MutationOutcome::Unchanged);
            }
        }

        if target_param.name.is_user_scoped()
            && self
                .graph
                .declare_user_parameter(&target_param.name, &target_param.type_def)
        {
            debug!(name = %target_param.name, "declared user parameter for link");
        }
        let point = self.fresh_override(&target)?;
        self.graph
            .attach_read_parameter(point, &target_param.name, &target_param.type_def)?;
        Ok(self.finish(identity, &target, "set_linked"))
    }

    /// Compute the input with a nested function call
    ///
    /// The new call's own inputs are initialized right away; see
    /// [`Self::expand_children`].
    ///
    /// # Errors
    /// Returns error if the function is unknown or its output type is not
    /// assignable to the input
    pub fn set_dynamic(
        &mut self,
        identity: &ParameterIdentity,
        function: FunctionId,
        ctx: &ResolutionContext,
    ) -> MutationResult<CallNodeHandle> {
        let target = self.target(identity)?;
        let signature = self
            .graph
            .function_signature(function)
            .ok_or_else(|| rejected(identity, MutationError::UnknownFunction(function)))?;
        match &signature.output {
            Some(output) if identity.type_def().is_assignable_from(output) => {}
            Some(output) => {
                return Err(rejected(identity, MutationError::incompatible(identity.type_def(), output)));
            }
            None => {
                return Err(rejected(
                    identity,
                    MutationError::incompatible(identity.type_def(), "<no output>"),
                ));
            }
        }

        let point = self.fresh_override(&target)?;
        let handle = self.graph.attach_nested_call(point, function)?;
        self.finish(identity, &target, "set_dynamic");

        let initialized = self.initialize_children(identity, ctx);
        debug!(%identity, function = %signature.name, initialized, "nested call attached");
        Ok(handle)
    }

    /// Compute the input with an inline expression
    ///
    /// # Errors
    /// Returns error if the input type does not accept expressions
    pub fn set_expression(&mut self, identity: &ParameterIdentity, code: &str) -> MutationResult {
        if !identity.type_def().supports_expressions() {
            return Err(rejected(
                identity,
                MutationError::ExpressionsUnsupported(identity.type_def().name().to_string()),
            ));
        }
        let target = self.target(identity)?;
        if self.current_producer(&target) == Some(Producer::Expression(code.to_string())) {
            return Ok(MutationOutcome::Unchanged);
        }
        let point = self.fresh_override(&target)?;
        self.graph.attach_expression(point, code)?;
        Ok(self.finish(identity, &target, "set_expression"))
    }

    /// Promote the shared placeholder of a resource input into a graph-owned instance
    ///
    /// # Errors
    /// Returns error if the input is not resource-typed
    pub fn set_data(&mut self, identity: &ParameterIdentity) -> MutationResult {
        if !identity.type_def().is_resource() {
            return Err(rejected(identity, MutationError::NotResourceTyped(identity.name().clone())));
        }
        let target = self.target(identity)?;
        if matches!(self.current_producer(&target), Some(Producer::Resource(_))) {
            return Ok(MutationOutcome::Unchanged);
        }

        let call_site = identity.call_site();
        let handle = match self.placeholders.release(call_site, identity) {
            Some(handle) => handle,
            None => {
                let handle = self
                    .placeholders
                    .get_or_create(call_site, identity, identity.type_def().name());
                self.placeholders.release(call_site, identity);
                handle
            }
        };
        let point = self.fresh_override(&target)?;
        self.graph.attach_resource(point, &handle)?;
        Ok(self.finish(identity, &target, "set_data"))
    }

    /// Remove every local value so resolution falls through to the default
    ///
    /// # Errors
    /// Returns error if the call-site is gone or the input has no declaration
    /// to fall back to
    pub fn reset(&mut self, identity: &ParameterIdentity) -> MutationResult {
        let target = self.target(identity).map_err(|err| match err {
            MutationError::UnknownInput(name) => MutationError::DefaultUnavailable(name),
            other => other,
        })?;
        let has_rapid = self.rapid.get(target.site.owning_graph, identity).is_some();
        if target.existing.is_none() && !has_rapid {
            return Ok(MutationOutcome::Unchanged);
        }
        if let Some(point) = target.existing {
            self.graph.remove_override_subgraph(point)?;
        }
        Ok(self.finish(identity, &target, "reset"))
    }

    /// Replace local state with a copy of the parent call-site's state
    ///
    /// Override subgraphs are copied node for node (resources are duplicated
    /// into fresh instances). A rapid-cache value is copied here and to every
    /// other untouched call-site of the same lineage.
    ///
    /// # Errors
    /// Returns error if the call-site was not inherited from a live parent,
    /// or if part of the parent's state cannot be copied (an uninterpretable
    /// override, a resource the graph does not own, an unknown nested function)
    pub fn reset_to_inherited(&mut self, identity: &ParameterIdentity, ctx: &ResolutionContext) -> MutationResult {
        let target = self.target(identity)?;
        let parent_call_site = target
            .site
            .inherited_from
            .ok_or_else(|| rejected(identity, MutationError::NoInheritedSource(identity.call_site())))?;
        let parent_site = self
            .graph
            .call_site(parent_call_site)
            .ok_or_else(|| rejected(identity, MutationError::NoInheritedSource(identity.call_site())))?;
        if !self.can_reset_to_inherited(identity, ctx) {
            return Ok(MutationOutcome::Unchanged);
        }

        let parent_identity = identity.rebased(parent_call_site);
        self.check_inherited(&parent_identity, &parent_site, identity, 0)
            .map_err(|err| rejected(identity, err))?;

        if let Some(point) = target.existing {
            self.graph.remove_override_subgraph(point)?;
        }
        self.rapid.remove(target.site.owning_graph, identity);
        let copied = self.copy_inherited(&parent_identity, &parent_site, identity, &target.site, 0);
        self.invalidate_subtree(identity);
        copied?;

        if let Some(entry) = self.rapid.get(parent_site.owning_graph, &parent_identity).cloned() {
            for sibling in self.graph.lineage(identity.call_site()) {
                let Some(sibling_site) = self.graph.call_site(sibling) else {
                    continue;
                };
                let sibling_identity = identity.rebased(sibling);
                let key = OverrideKey::for_identity(&sibling_identity, &sibling_site.instance_name);
                if self.graph.find_override_connection(&key).is_some() {
                    continue;
                }
                self.rapid
                    .insert(sibling_site.owning_graph, &sibling_identity, entry.clone());
                self.invalidate_subtree(&sibling_identity);
            }
        }

        debug!(%identity, parent = %parent_call_site, "reset to inherited");
        Ok(MutationOutcome::Applied)
    }

    /// Check that the parent's state below `source` can be copied onto `dest`
    ///
    /// Mirrors `copy_inherited` without editing anything, so a rejected reset
    /// leaves the target as it was.
    fn check_inherited(
        &self,
        source: &ParameterIdentity,
        source_site: &CallSiteInfo,
        dest: &ParameterIdentity,
        depth: usize,
    ) -> MutationResult<()> {
        if depth > self.config.max_expansion_depth {
            return Ok(());
        }
        let source_key = OverrideKey::for_identity(source, &source_site.instance_name);
        let Some(source_point) = self.graph.find_override_connection(&source_key) else {
            return Ok(());
        };
        match self.graph.classify_producer(source_point) {
            Producer::Empty | Producer::MultipleProducers(_) | Producer::Malformed => {
                Err(MutationError::InvalidInheritedOverride(source.name().clone()))
            }
            Producer::Resource(handle) if !self.graph.owns_resource(&handle) => {
                Err(GraphError::UnknownResource(handle.id).into())
            }
            Producer::NestedCall(handle) => {
                let signature = self
                    .graph
                    .function_signature(handle.function)
                    .ok_or(MutationError::UnknownFunction(handle.function))?;
                let Some(nested_site) = self.graph.call_site(handle.call_site) else {
                    return Ok(());
                };
                for input in &signature.inputs {
                    let child_source =
                        source.nested(&input.name, input.type_def.clone(), handle.call_site, input.static_param)?;
                    let child_dest =
                        dest.nested(&input.name, input.type_def.clone(), handle.call_site, input.static_param)?;
                    self.check_inherited(&child_source, &nested_site, &child_dest, depth + 1)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn copy_inherited(
        &mut self,
        source: &ParameterIdentity,
        source_site: &CallSiteInfo,
        dest: &ParameterIdentity,
        dest_site: &CallSiteInfo,
        depth: usize,
    ) -> MutationResult<()> {
        if depth > self.config.max_expansion_depth {
            warn!(%dest, depth, "inherited copy exceeds expansion depth");
            return Ok(());
        }

        let source_key = OverrideKey::for_identity(source, &source_site.instance_name);
        let Some(source_point) = self.graph.find_override_connection(&source_key) else {
            if let Some(entry) = self.rapid.get(source_site.owning_graph, source).cloned() {
                self.rapid.insert(dest_site.owning_graph, dest, entry);
            }
            return Ok(());
        };

        let producer = self.graph.classify_producer(source_point);
        if matches!(producer, Producer::Empty | Producer::MultipleProducers(_) | Producer::Malformed) {
            return Err(MutationError::InvalidInheritedOverride(source.name().clone()));
        }

        let dest_key = OverrideKey::for_identity(dest, &dest_site.instance_name);
        let point = self.graph.create_override_connection(&dest_key)?;
        match producer {
            Producer::Literal(text) => self.graph.set_override_literal(point, &text)?,
            Producer::ReadParameter { name, .. } => {
                self.graph.attach_read_parameter(point, &name, dest.type_def())?;
            }
            Producer::Expression(code) => self.graph.attach_expression(point, &code)?,
            Producer::ObjectAsset(object) => self.graph.attach_object_asset(point, &object)?,
            Producer::Resource(handle) => {
                let copy = self.graph.duplicate_resource(&handle)?;
                self.graph.attach_resource(point, &copy)?;
            }
            Producer::NestedCall(handle) => {
                let copy = self.graph.attach_nested_call(point, handle.function)?;
                self.copy_nested_inputs(source, handle, dest, copy, depth)?;
            }
            Producer::Empty | Producer::MultipleProducers(_) | Producer::Malformed => {}
        }
        Ok(())
    }

    fn copy_nested_inputs(
        &mut self,
        source: &ParameterIdentity,
        source_call: CallNodeHandle,
        dest: &ParameterIdentity,
        dest_call: CallNodeHandle,
        depth: usize,
    ) -> MutationResult<()> {
        let Some(signature) = self.graph.function_signature(source_call.function) else {
            return Ok(());
        };
        let (Some(source_site), Some(dest_site)) = (
            self.graph.call_site(source_call.call_site),
            self.graph.call_site(dest_call.call_site),
        ) else {
            return Ok(());
        };
        for input in &signature.inputs {
            let child_source = source.nested(
                &input.name,
                input.type_def.clone(),
                source_call.call_site,
                input.static_param,
            )?;
            let child_dest = dest.nested(
                &input.name,
                input.type_def.clone(),
                dest_call.call_site,
                input.static_param,
            )?;
            self.copy_inherited(&child_source, &source_site, &child_dest, &dest_site, depth + 1)?;
        }
        Ok(())
    }
}
