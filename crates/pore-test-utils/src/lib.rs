//! Testing utilities for PORE workspace
//!
//! Shared fixtures, an instrumented graph double and test tracing setup.

#![allow(missing_docs)]

use pore_graph::{
    CallSiteInfo, ChangeTokens, ConnectionPoint, DeclaredInput, DefaultSpec, FunctionSignature,
    GraphAccessor, GraphResult, Producer, ScriptGraph,
};
use pore_types::{
    CallNodeHandle, CallSiteId, FunctionId, GraphId, ObjectRef, OverrideKey, ParameterIdentity,
    ParameterName, ResourceHandle, TypeDef,
};
use std::cell::Cell;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a fmt subscriber honouring `RUST_LOG`, once per test binary
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Snapshot of [`CountingGraph`] counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadCounts {
    pub token_reads: usize,
    pub override_lookups: usize,
    pub producer_classifications: usize,
    pub declaration_reads: usize,
    pub signature_reads: usize,
    pub overrides_created: usize,
}

impl ReadCounts {
    /// Reads other than change-token checks
    pub fn structural_reads(&self) -> usize {
        self.override_lookups + self.producer_classifications + self.declaration_reads + self.signature_reads
    }
}

/// [`ScriptGraph`] wrapper that counts every accessor call
#[derive(Debug, Default)]
pub struct CountingGraph {
    inner: ScriptGraph,
    token_reads: Cell<usize>,
    override_lookups: Cell<usize>,
    producer_classifications: Cell<usize>,
    declaration_reads: Cell<usize>,
    signature_reads: Cell<usize>,
    overrides_created: Cell<usize>,
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

impl CountingGraph {
    pub fn new(inner: ScriptGraph) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &ScriptGraph {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut ScriptGraph {
        &mut self.inner
    }

    pub fn reads(&self) -> ReadCounts {
        ReadCounts {
            token_reads: self.token_reads.get(),
            override_lookups: self.override_lookups.get(),
            producer_classifications: self.producer_classifications.get(),
            declaration_reads: self.declaration_reads.get(),
            signature_reads: self.signature_reads.get(),
            overrides_created: self.overrides_created.get(),
        }
    }

    pub fn reset_counts(&self) {
        for counter in [
            &self.token_reads,
            &self.override_lookups,
            &self.producer_classifications,
            &self.declaration_reads,
            &self.signature_reads,
            &self.overrides_created,
        ] {
            counter.set(0);
        }
    }
}

impl GraphAccessor for CountingGraph {
    fn call_site(&self, call_site: CallSiteId) -> Option<CallSiteInfo> {
        self.inner.call_site(call_site)
    }

    fn change_tokens(&self, call_site: CallSiteId) -> Option<ChangeTokens> {
        bump(&self.token_reads);
        self.inner.change_tokens(call_site)
    }

    fn find_override_connection(&self, key: &OverrideKey) -> Option<ConnectionPoint> {
        bump(&self.override_lookups);
        self.inner.find_override_connection(key)
    }

    fn classify_producer(&self, point: ConnectionPoint) -> Producer {
        bump(&self.producer_classifications);
        self.inner.classify_producer(point)
    }

    fn declared_input(&self, identity: &ParameterIdentity) -> Option<DeclaredInput> {
        bump(&self.declaration_reads);
        self.inner.declared_input(identity)
    }

    fn function_signature(&self, function: FunctionId) -> Option<FunctionSignature> {
        bump(&self.signature_reads);
        self.inner.function_signature(function)
    }

    fn lineage(&self, call_site: CallSiteId) -> Vec<CallSiteId> {
        self.inner.lineage(call_site)
    }

    fn owns_resource(&self, resource: &ResourceHandle) -> bool {
        self.inner.owns_resource(resource)
    }

    fn create_override_connection(&mut self, key: &OverrideKey) -> GraphResult<ConnectionPoint> {
        bump(&self.overrides_created);
        self.inner.create_override_connection(key)
    }

    fn remove_override_subgraph(&mut self, point: ConnectionPoint) -> GraphResult<()> {
        self.inner.remove_override_subgraph(point)
    }

    fn set_override_literal(&mut self, point: ConnectionPoint, literal: &str) -> GraphResult<()> {
        self.inner.set_override_literal(point, literal)
    }

    fn attach_read_parameter(
        &mut self,
        point: ConnectionPoint,
        name: &ParameterName,
        type_def: &TypeDef,
    ) -> GraphResult<()> {
        self.inner.attach_read_parameter(point, name, type_def)
    }

    fn attach_nested_call(&mut self, point: ConnectionPoint, function: FunctionId) -> GraphResult<CallNodeHandle> {
        self.inner.attach_nested_call(point, function)
    }

    fn attach_expression(&mut self, point: ConnectionPoint, code: &str) -> GraphResult<()> {
        self.inner.attach_expression(point, code)
    }

    fn attach_resource(&mut self, point: ConnectionPoint, resource: &ResourceHandle) -> GraphResult<()> {
        self.inner.attach_resource(point, resource)
    }

    fn attach_object_asset(&mut self, point: ConnectionPoint, object: &ObjectRef) -> GraphResult<()> {
        self.inner.attach_object_asset(point, object)
    }

    fn duplicate_resource(&mut self, resource: &ResourceHandle) -> GraphResult<ResourceHandle> {
        self.inner.duplicate_resource(resource)
    }

    fn declare_user_parameter(&mut self, name: &ParameterName, type_def: &TypeDef) -> bool {
        self.inner.declare_user_parameter(name, type_def)
    }
}

/// One script with one call-site of a single-input module
#[derive(Debug)]
pub struct ModuleFixture {
    pub graph: ScriptGraph,
    pub script: GraphId,
    pub function: FunctionId,
    pub call_site: CallSiteId,
    pub input: String,
    pub type_def: TypeDef,
}

impl ModuleFixture {
    /// `Foo` module with input `Bar` of `type_def`, no default
    pub fn new(type_def: TypeDef) -> Self {
        Self::named("Foo", "Bar", type_def)
    }

    pub fn named(module: &str, input: &str, type_def: TypeDef) -> Self {
        let mut graph = ScriptGraph::new();
        let script = graph.add_script("Fountain");
        let function = graph.add_function(module, None);
        graph.declare_input(function, input, type_def.clone()).unwrap();
        let call_site = graph
            .add_call_site(script, function, format!("{module}_001"))
            .unwrap();
        Self {
            graph,
            script,
            function,
            call_site,
            input: input.to_string(),
            type_def,
        }
    }

    /// Int module `Foo.Bar` with literal default `0`
    pub fn int_with_zero_default() -> Self {
        Self::new(TypeDef::int()).with_default(DefaultSpec::Literal("0".into()))
    }

    pub fn with_default(mut self, default: DefaultSpec) -> Self {
        self.graph
            .set_input_default(self.function, &self.input, default)
            .unwrap();
        self
    }

    pub fn name(&self) -> ParameterName {
        ParameterName::module_input(&self.input).unwrap()
    }

    pub fn identity(&self) -> ParameterIdentity {
        ParameterIdentity::new(self.name(), self.type_def.clone(), self.call_site)
    }

    pub fn counting(self) -> (CountingGraph, ParameterIdentity) {
        let identity = self.identity();
        (CountingGraph::new(self.graph), identity)
    }
}

/// User-scoped parameter name (`User.<name>`)
pub fn user_name(name: &str) -> ParameterName {
    format!("User.{name}").parse().unwrap()
}

/// Engine-scoped parameter name (`Engine.<path>`)
pub fn engine_name(path: &str) -> ParameterName {
    format!("Engine.{path}").parse().unwrap()
}
