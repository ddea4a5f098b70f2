//! In-memory script graph
//!
//! [`ScriptGraph`] is a complete [`GraphAccessor`] backed by hash maps. It
//! holds script graphs and function graphs side by side: call-sites live in
//! one graph and call a function whose own graph holds default wiring.
//!
//! Every write bumps the version of the graph it touches. Versions come from
//! a single counter shared by all graphs.
//!
//! # Example
//!
//! ```rust
//! use pore_graph::{GraphAccessor, ScriptGraph};
//! use pore_types::TypeDef;
//!
//! let mut graph = ScriptGraph::new();
//! let script = graph.add_script("Fountain");
//! let drag = graph.add_function("Drag", None);
//! graph.declare_input(drag, "Speed", TypeDef::float()).unwrap();
//! let site = graph.add_call_site(script, drag, "Drag_001").unwrap();
//!
//! assert_eq!(graph.call_site(site).unwrap().instance_name, "Drag_001");
//! ```

use crate::accessor::{
    CallSiteInfo, DeclaredInput, FunctionSignature, GraphAccessor, SignatureInput,
};
use crate::error::{GraphError, GraphResult};
use crate::hierarchy::InputHierarchy;
use crate::producer::{ConnectionPoint, DefaultSpec, Producer};
use crate::resources::ResourceArena;
use crate::tokens::{ChangeTokens, GraphVersion, VersionCounter};
use indexmap::IndexMap;
use pore_types::{
    CallNodeHandle, CallSiteId, FunctionId, GraphId, NodeId, ObjectRef, OverrideKey,
    ParameterIdentity, ParameterName, PinId, ResourceHandle, TypeDef,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Role of a graph in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphKind {
    /// Top-level script containing module call-sites
    Script,
    /// Body of a reusable function
    Function,
}

#[derive(Debug, Clone)]
struct GraphRecord {
    name: String,
    kind: GraphKind,
    version: GraphVersion,
}

#[derive(Debug, Clone)]
struct InputRecord {
    type_def: TypeDef,
    static_param: bool,
    default: DefaultSpec,
}

#[derive(Debug, Clone)]
struct FunctionRecord {
    name: String,
    graph: GraphId,
    inputs: IndexMap<String, InputRecord>,
    output: Option<TypeDef>,
    hierarchy: Option<InputHierarchy>,
}

#[derive(Debug, Clone)]
struct CallSiteRecord {
    instance_name: String,
    owning_graph: GraphId,
    function: FunctionId,
    inherited_from: Option<CallSiteId>,
    node: NodeId,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Call(CallSiteId),
    ReadParameter {
        name: ParameterName,
        default_pin: PinId,
    },
    Expression(String),
    Resource(ResourceHandle),
    ObjectAsset(ObjectRef),
    Opaque,
}

#[derive(Debug, Clone)]
struct NodeRecord {
    graph: GraphId,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
struct PinRecord {
    graph: GraphId,
    literal: Option<String>,
    producers: Vec<NodeId>,
}

/// In-memory graph store implementing [`GraphAccessor`]
#[derive(Debug, Clone, Default)]
pub struct ScriptGraph {
    versions: VersionCounter,
    graphs: HashMap<GraphId, GraphRecord>,
    functions: HashMap<FunctionId, FunctionRecord>,
    call_sites: HashMap<CallSiteId, CallSiteRecord>,
    nodes: HashMap<NodeId, NodeRecord>,
    pins: HashMap<PinId, PinRecord>,
    overrides: HashMap<OverrideKey, PinId>,
    user_parameters: IndexMap<ParameterName, TypeDef>,
    resources: ResourceArena,
    instance_counter: u64,
}

impl ScriptGraph {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn add_graph(&mut self, name: String, kind: GraphKind) -> GraphId {
        let id = GraphId::new();
        let version = self.versions.next_version();
        self.graphs.insert(id, GraphRecord { name, kind, version });
        id
    }

    fn touch(&mut self, graph: GraphId) {
        let version = self.versions.next_version();
        if let Some(record) = self.graphs.get_mut(&graph) {
            record.version = version;
        }
    }

    fn require_graph(&self, graph: GraphId) -> GraphResult<()> {
        if self.graphs.contains_key(&graph) {
            Ok(())
        } else {
            Err(GraphError::UnknownGraph(graph))
        }
    }

    fn function_mut(&mut self, function: FunctionId) -> GraphResult<&mut FunctionRecord> {
        self.functions
            .get_mut(&function)
            .ok_or(GraphError::UnknownFunction(function))
    }

    fn input_mut(&mut self, function: FunctionId, input: &str) -> GraphResult<(GraphId, &mut InputRecord)> {
        let record = self.function_mut(function)?;
        let graph = record.graph;
        let name = record.name.clone();
        record
            .inputs
            .get_mut(input)
            .map(|decl| (graph, decl))
            .ok_or_else(|| GraphError::unknown_input(name, input))
    }

    // ------------------------------------------------------------------
    // Scripts and functions
    // ------------------------------------------------------------------

    /// Register a script graph
    pub fn add_script(&mut self, name: impl Into<String>) -> GraphId {
        self.add_graph(name.into(), GraphKind::Script)
    }

    /// Declare a function with its own body graph
    pub fn add_function(&mut self, name: impl Into<String>, output: Option<TypeDef>) -> FunctionId {
        let name = name.into();
        let graph = self.add_graph(name.clone(), GraphKind::Function);
        let id = FunctionId::new();
        self.functions.insert(
            id,
            FunctionRecord {
                name,
                graph,
                inputs: IndexMap::new(),
                output,
                hierarchy: None,
            },
        );
        id
    }

    /// Declare an input with no default
    ///
    /// # Errors
    /// Returns error if the function is unknown or already declares `input`
    pub fn declare_input(&mut self, function: FunctionId, input: &str, type_def: TypeDef) -> GraphResult<()> {
        let record = self.function_mut(function)?;
        if record.inputs.contains_key(input) {
            return Err(GraphError::DuplicateInput {
                function: record.name.clone(),
                input: input.to_string(),
            });
        }
        record.inputs.insert(
            input.to_string(),
            InputRecord {
                type_def,
                static_param: false,
                default: DefaultSpec::None,
            },
        );
        let graph = record.graph;
        self.touch(graph);
        Ok(())
    }

    /// Mark an input as compile-time only
    ///
    /// # Errors
    /// Returns error if the function or input is unknown
    pub fn set_input_static(&mut self, function: FunctionId, input: &str, static_param: bool) -> GraphResult<()> {
        let (graph, decl) = self.input_mut(function, input)?;
        decl.static_param = static_param;
        self.touch(graph);
        Ok(())
    }

    /// Replace an input's declared default
    ///
    /// # Errors
    /// Returns error if the function or input is unknown
    pub fn set_input_default(&mut self, function: FunctionId, input: &str, default: DefaultSpec) -> GraphResult<()> {
        let (graph, decl) = self.input_mut(function, input)?;
        decl.default = default;
        self.touch(graph);
        Ok(())
    }

    /// Change an input's declared type
    ///
    /// # Errors
    /// Returns error if the function or input is unknown
    pub fn set_input_type(&mut self, function: FunctionId, input: &str, type_def: TypeDef) -> GraphResult<()> {
        let (graph, decl) = self.input_mut(function, input)?;
        decl.type_def = type_def;
        self.touch(graph);
        Ok(())
    }

    /// Remove an input declaration
    ///
    /// # Errors
    /// Returns error if the function or input is unknown
    pub fn remove_input(&mut self, function: FunctionId, input: &str) -> GraphResult<()> {
        let record = self.function_mut(function)?;
        if record.inputs.shift_remove(input).is_none() {
            return Err(GraphError::unknown_input(record.name.clone(), input));
        }
        let graph = record.graph;
        self.touch(graph);
        Ok(())
    }

    /// Attach a display hierarchy to a function
    ///
    /// # Errors
    /// Returns error if the function is unknown
    pub fn set_hierarchy(&mut self, function: FunctionId, hierarchy: InputHierarchy) -> GraphResult<()> {
        let record = self.function_mut(function)?;
        record.hierarchy = Some(hierarchy);
        let graph = record.graph;
        self.touch(graph);
        Ok(())
    }

    /// Body graph of a function
    #[must_use]
    pub fn function_graph(&self, function: FunctionId) -> Option<GraphId> {
        self.functions.get(&function).map(|record| record.graph)
    }

    /// Current version of a graph
    #[must_use]
    pub fn version(&self, graph: GraphId) -> Option<GraphVersion> {
        self.graphs.get(&graph).map(|record| record.version)
    }

    /// Role of a graph
    #[must_use]
    pub fn graph_kind(&self, graph: GraphId) -> Option<GraphKind> {
        self.graphs.get(&graph).map(|record| record.kind)
    }

    /// Name of a graph
    #[must_use]
    pub fn graph_name(&self, graph: GraphId) -> Option<&str> {
        self.graphs.get(&graph).map(|record| record.name.as_str())
    }

    // ------------------------------------------------------------------
    // Call-sites
    // ------------------------------------------------------------------

    fn insert_call_site(
        &mut self,
        graph: GraphId,
        function: FunctionId,
        instance_name: String,
        inherited_from: Option<CallSiteId>,
    ) -> GraphResult<CallSiteId> {
        self.require_graph(graph)?;
        if !self.functions.contains_key(&function) {
            return Err(GraphError::UnknownFunction(function));
        }
        let id = CallSiteId::new();
        let node = NodeId::new();
        self.nodes.insert(
            node,
            NodeRecord {
                graph,
                kind: NodeKind::Call(id),
            },
        );
        self.call_sites.insert(
            id,
            CallSiteRecord {
                instance_name,
                owning_graph: graph,
                function,
                inherited_from,
                node,
            },
        );
        self.touch(graph);
        Ok(id)
    }

    /// Place a call to `function` in `graph`
    ///
    /// # Errors
    /// Returns error if the graph or the function is unknown
    pub fn add_call_site(
        &mut self,
        graph: GraphId,
        function: FunctionId,
        instance_name: impl Into<String>,
    ) -> GraphResult<CallSiteId> {
        self.insert_call_site(graph, function, instance_name.into(), None)
    }

    /// Place a call inherited from `parent`, calling the same function
    ///
    /// # Errors
    /// Returns error if the graph or the parent call-site is unknown
    pub fn add_inherited_call_site(
        &mut self,
        graph: GraphId,
        parent: CallSiteId,
        instance_name: impl Into<String>,
    ) -> GraphResult<CallSiteId> {
        let function = self
            .call_sites
            .get(&parent)
            .map(|record| record.function)
            .ok_or(GraphError::UnknownCallSite(parent))?;
        self.insert_call_site(graph, function, instance_name.into(), Some(parent))
    }

    /// Destroy a call node along with its override pins
    ///
    /// # Errors
    /// Returns error if the call-site is unknown
    pub fn destroy_call_site(&mut self, call_site: CallSiteId) -> GraphResult<()> {
        let record = self
            .call_sites
            .get(&call_site)
            .cloned()
            .ok_or(GraphError::UnknownCallSite(call_site))?;
        let mut visited = HashSet::new();
        self.remove_node(record.node, &mut visited);
        debug!(%call_site, instance = %record.instance_name, "destroyed call-site");
        self.touch(record.owning_graph);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pins and nodes
    // ------------------------------------------------------------------

    fn new_pin(&mut self, graph: GraphId) -> ConnectionPoint {
        let pin = PinId::new();
        self.pins.insert(
            pin,
            PinRecord {
                graph,
                literal: None,
                producers: Vec::new(),
            },
        );
        ConnectionPoint::new(graph, pin)
    }

    fn new_node(&mut self, graph: GraphId, kind: NodeKind) -> NodeId {
        let node = NodeId::new();
        self.nodes.insert(node, NodeRecord { graph, kind });
        node
    }

    fn link(&mut self, node: NodeId, point: ConnectionPoint) -> GraphResult<()> {
        let pin = self
            .pins
            .get_mut(&point.pin)
            .ok_or(GraphError::UnknownPin(point.pin))?;
        pin.producers.push(node);
        Ok(())
    }

    fn require_pin(&self, point: ConnectionPoint) -> GraphResult<()> {
        if self.pins.contains_key(&point.pin) {
            Ok(())
        } else {
            Err(GraphError::UnknownPin(point.pin))
        }
    }

    /// Add a free pin to a graph, e.g. a default-producing pin
    ///
    /// # Errors
    /// Returns error if the graph is unknown
    pub fn add_pin(&mut self, graph: GraphId) -> GraphResult<ConnectionPoint> {
        self.require_graph(graph)?;
        let point = self.new_pin(graph);
        self.touch(graph);
        Ok(point)
    }

    /// Store an inline literal on a pin
    ///
    /// # Errors
    /// Returns error if the pin is unknown
    pub fn set_pin_literal(&mut self, point: ConnectionPoint, literal: impl Into<String>) -> GraphResult<()> {
        let pin = self
            .pins
            .get_mut(&point.pin)
            .ok_or(GraphError::UnknownPin(point.pin))?;
        pin.literal = Some(literal.into());
        let graph = pin.graph;
        self.touch(graph);
        Ok(())
    }

    /// Add a read-parameter node; returns the node and its own default pin
    ///
    /// # Errors
    /// Returns error if the graph is unknown
    pub fn add_read_parameter_node(
        &mut self,
        graph: GraphId,
        name: ParameterName,
    ) -> GraphResult<(NodeId, ConnectionPoint)> {
        self.require_graph(graph)?;
        let default_pin = self.new_pin(graph);
        let node = self.new_node(
            graph,
            NodeKind::ReadParameter {
                name,
                default_pin: default_pin.pin,
            },
        );
        self.touch(graph);
        Ok((node, default_pin))
    }

    /// Default pin of a read-parameter node
    #[must_use]
    pub fn read_parameter_pin(&self, node: NodeId) -> Option<ConnectionPoint> {
        let record = self.nodes.get(&node)?;
        match &record.kind {
            NodeKind::ReadParameter { default_pin, .. } => {
                Some(ConnectionPoint::new(record.graph, *default_pin))
            }
            _ => None,
        }
    }

    /// Add an expression node
    ///
    /// # Errors
    /// Returns error if the graph is unknown
    pub fn add_expression_node(&mut self, graph: GraphId, code: impl Into<String>) -> GraphResult<NodeId> {
        self.require_graph(graph)?;
        let node = self.new_node(graph, NodeKind::Expression(code.into()));
        self.touch(graph);
        Ok(node)
    }

    /// Add a resource node owning a fresh instance of `class`
    ///
    /// # Errors
    /// Returns error if the graph is unknown
    pub fn add_resource_node(&mut self, graph: GraphId, class: &str) -> GraphResult<(NodeId, ResourceHandle)> {
        self.require_graph(graph)?;
        let handle = self.resources.allocate(class);
        let node = self.new_node(graph, NodeKind::Resource(handle.clone()));
        self.touch(graph);
        Ok((node, handle))
    }

    /// Add an object asset node
    ///
    /// # Errors
    /// Returns error if the graph is unknown
    pub fn add_object_node(&mut self, graph: GraphId, object: ObjectRef) -> GraphResult<NodeId> {
        self.require_graph(graph)?;
        let node = self.new_node(graph, NodeKind::ObjectAsset(object));
        self.touch(graph);
        Ok(node)
    }

    /// Add a node with no value interpretation
    ///
    /// # Errors
    /// Returns error if the graph is unknown
    pub fn add_opaque_node(&mut self, graph: GraphId) -> GraphResult<NodeId> {
        self.require_graph(graph)?;
        let node = self.new_node(graph, NodeKind::Opaque);
        self.touch(graph);
        Ok(node)
    }

    /// Add a nested call node (a new call-site) to a graph
    ///
    /// # Errors
    /// Returns error if the graph or the function is unknown
    pub fn add_call_node(&mut self, graph: GraphId, function: FunctionId) -> GraphResult<CallNodeHandle> {
        let instance_name = self.next_instance_name(function)?;
        let call_site = self.insert_call_site(graph, function, instance_name, None)?;
        Ok(CallNodeHandle { call_site, function })
    }

    /// Wire a node's output into a pin
    ///
    /// # Errors
    /// Returns error if the node or the pin is unknown
    pub fn connect(&mut self, node: NodeId, point: ConnectionPoint) -> GraphResult<()> {
        if !self.nodes.contains_key(&node) {
            return Err(GraphError::UnknownNode(node));
        }
        self.link(node, point)?;
        self.touch(point.graph);
        Ok(())
    }

    /// Call node backing a call-site
    #[must_use]
    pub fn call_node(&self, call_site: CallSiteId) -> Option<NodeId> {
        self.call_sites.get(&call_site).map(|record| record.node)
    }

    /// Number of override pins
    #[inline]
    #[must_use]
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Number of live nodes
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Declared user parameters
    #[must_use]
    pub fn user_parameter(&self, name: &ParameterName) -> Option<&TypeDef> {
        self.user_parameters.get(name)
    }

    /// Graph-owned resource instances
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &ResourceArena {
        &self.resources
    }

    /// Graph-owned resource instances, for editing
    #[inline]
    pub fn resources_mut(&mut self) -> &mut ResourceArena {
        &mut self.resources
    }

    fn next_instance_name(&mut self, function: FunctionId) -> GraphResult<String> {
        let name = self
            .functions
            .get(&function)
            .map(|record| record.name.clone())
            .ok_or(GraphError::UnknownFunction(function))?;
        self.instance_counter += 1;
        let base: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        Ok(format!("{base}_{:03}", self.instance_counter))
    }

    fn remove_pin(&mut self, pin: PinId, visited: &mut HashSet<NodeId>) {
        let Some(record) = self.pins.remove(&pin) else {
            return;
        };
        self.overrides.retain(|_, p| *p != pin);
        for node in record.producers {
            self.remove_node(node, visited);
        }
    }

    fn remove_node(&mut self, node: NodeId, visited: &mut HashSet<NodeId>) {
        if !visited.insert(node) {
            return;
        }
        let Some(record) = self.nodes.remove(&node) else {
            return;
        };
        for pin in self.pins.values_mut() {
            pin.producers.retain(|n| *n != node);
        }
        match record.kind {
            NodeKind::Call(call_site) => {
                self.call_sites.remove(&call_site);
                let owned: Vec<PinId> = self
                    .overrides
                    .iter()
                    .filter(|(key, _)| key.call_site() == call_site)
                    .map(|(_, pin)| *pin)
                    .collect();
                for pin in owned {
                    self.remove_pin(pin, visited);
                }
            }
            NodeKind::ReadParameter { default_pin, .. } => self.remove_pin(default_pin, visited),
            NodeKind::Resource(handle) => {
                self.resources.remove(handle.id);
            }
            NodeKind::Expression(_) | NodeKind::ObjectAsset(_) | NodeKind::Opaque => {}
        }
    }

    fn attach(&mut self, point: ConnectionPoint, kind: NodeKind) -> GraphResult<NodeId> {
        self.require_pin(point)?;
        let node = self.new_node(point.graph, kind);
        self.link(node, point)?;
        self.touch(point.graph);
        Ok(node)
    }
}

impl GraphAccessor for ScriptGraph {
    fn call_site(&self, call_site: CallSiteId) -> Option<CallSiteInfo> {
        self.call_sites.get(&call_site).map(|record| CallSiteInfo {
            instance_name: record.instance_name.clone(),
            owning_graph: record.owning_graph,
            function: record.function,
            inherited_from: record.inherited_from,
        })
    }

    fn change_tokens(&self, call_site: CallSiteId) -> Option<ChangeTokens> {
        let record = self.call_sites.get(&call_site)?;
        let owning = self.graphs.get(&record.owning_graph)?.version;
        let called = self
            .functions
            .get(&record.function)
            .and_then(|function| self.graphs.get(&function.graph))
            .map(|graph| graph.version);
        Some(ChangeTokens::new(owning, called))
    }

    fn find_override_connection(&self, key: &OverrideKey) -> Option<ConnectionPoint> {
        let pin = self.overrides.get(key)?;
        let record = self.pins.get(pin)?;
        Some(ConnectionPoint::new(record.graph, *pin))
    }

    fn classify_producer(&self, point: ConnectionPoint) -> Producer {
        let Some(pin) = self.pins.get(&point.pin) else {
            return Producer::Malformed;
        };
        match pin.producers.as_slice() {
            [] => pin
                .literal
                .clone()
                .map_or(Producer::Empty, Producer::Literal),
            [node] => {
                let Some(record) = self.nodes.get(node) else {
                    return Producer::Malformed;
                };
                match &record.kind {
                    NodeKind::Call(call_site) => match self.call_sites.get(call_site) {
                        Some(site) => Producer::NestedCall(CallNodeHandle {
                            call_site: *call_site,
                            function: site.function,
                        }),
                        None => Producer::Malformed,
                    },
                    NodeKind::ReadParameter { name, default_pin } => {
                        let next = self
                            .pins
                            .get(default_pin)
                            .filter(|p| !p.producers.is_empty())
                            .map(|p| ConnectionPoint::new(p.graph, *default_pin));
                        Producer::ReadParameter {
                            node: *node,
                            name: name.clone(),
                            next,
                        }
                    }
                    NodeKind::Expression(code) => Producer::Expression(code.clone()),
                    NodeKind::Resource(handle) => Producer::Resource(handle.clone()),
                    NodeKind::ObjectAsset(object) => Producer::ObjectAsset(object.clone()),
                    NodeKind::Opaque => Producer::Malformed,
                }
            }
            many => Producer::MultipleProducers(many.len()),
        }
    }

    fn declared_input(&self, identity: &ParameterIdentity) -> Option<DeclaredInput> {
        let site = self.call_sites.get(&identity.call_site())?;
        let function = self.functions.get(&site.function)?;
        let decl = function.inputs.get(identity.input_name())?;
        Some(DeclaredInput {
            type_def: decl.type_def.clone(),
            static_param: decl.static_param,
            default: decl.default.clone(),
        })
    }

    fn function_signature(&self, function: FunctionId) -> Option<FunctionSignature> {
        let record = self.functions.get(&function)?;
        Some(FunctionSignature {
            name: record.name.clone(),
            inputs: record
                .inputs
                .iter()
                .map(|(name, decl)| SignatureInput {
                    name: name.clone(),
                    type_def: decl.type_def.clone(),
                    static_param: decl.static_param,
                })
                .collect(),
            output: record.output.clone(),
            hierarchy: record.hierarchy.clone(),
        })
    }

    fn owns_resource(&self, resource: &ResourceHandle) -> bool {
        self.resources.contains(resource.id)
    }

    fn lineage(&self, call_site: CallSiteId) -> Vec<CallSiteId> {
        let Some(parent) = self
            .call_sites
            .get(&call_site)
            .and_then(|record| record.inherited_from)
        else {
            return Vec::new();
        };
        let mut siblings: Vec<CallSiteId> = self
            .call_sites
            .iter()
            .filter(|(id, record)| **id != call_site && record.inherited_from == Some(parent))
            .map(|(id, _)| *id)
            .collect();
        siblings.sort();
        siblings
    }

    fn create_override_connection(&mut self, key: &OverrideKey) -> GraphResult<ConnectionPoint> {
        if let Some(point) = self.find_override_connection(key) {
            return Ok(point);
        }
        let graph = self
            .call_sites
            .get(&key.call_site())
            .map(|record| record.owning_graph)
            .ok_or(GraphError::UnknownCallSite(key.call_site()))?;
        let point = self.new_pin(graph);
        self.overrides.insert(key.clone(), point.pin);
        self.touch(graph);
        debug!(%key, "created override pin");
        Ok(point)
    }

    fn remove_override_subgraph(&mut self, point: ConnectionPoint) -> GraphResult<()> {
        self.require_pin(point)?;
        let mut visited = HashSet::new();
        self.remove_pin(point.pin, &mut visited);
        self.touch(point.graph);
        debug!(%point, removed_nodes = visited.len(), "removed override subgraph");
        Ok(())
    }

    fn set_override_literal(&mut self, point: ConnectionPoint, literal: &str) -> GraphResult<()> {
        self.set_pin_literal(point, literal)
    }

    fn attach_read_parameter(
        &mut self,
        point: ConnectionPoint,
        name: &ParameterName,
        _type_def: &TypeDef,
    ) -> GraphResult<()> {
        self.require_pin(point)?;
        let default_pin = self.new_pin(point.graph);
        self.attach(
            point,
            NodeKind::ReadParameter {
                name: name.clone(),
                default_pin: default_pin.pin,
            },
        )?;
        Ok(())
    }

    fn attach_nested_call(
        &mut self,
        point: ConnectionPoint,
        function: FunctionId,
    ) -> GraphResult<CallNodeHandle> {
        self.require_pin(point)?;
        let handle = self.add_call_node(point.graph, function)?;
        let node = self
            .call_node(handle.call_site)
            .ok_or(GraphError::UnknownCallSite(handle.call_site))?;
        self.link(node, point)?;
        self.touch(point.graph);
        Ok(handle)
    }

    fn attach_expression(&mut self, point: ConnectionPoint, code: &str) -> GraphResult<()> {
        self.attach(point, NodeKind::Expression(code.to_string()))?;
        Ok(())
    }

    fn attach_resource(&mut self, point: ConnectionPoint, resource: &ResourceHandle) -> GraphResult<()> {
        self.require_pin(point)?;
        self.resources.adopt(resource);
        self.attach(point, NodeKind::Resource(resource.clone()))?;
        Ok(())
    }

    fn attach_object_asset(&mut self, point: ConnectionPoint, object: &ObjectRef) -> GraphResult<()> {
        self.attach(point, NodeKind::ObjectAsset(object.clone()))?;
        Ok(())
    }

    fn duplicate_resource(&mut self, resource: &ResourceHandle) -> GraphResult<ResourceHandle> {
        self.resources
            .duplicate(resource)
            .ok_or(GraphError::UnknownResource(resource.id))
    }

    fn declare_user_parameter(&mut self, name: &ParameterName, type_def: &TypeDef) -> bool {
        if self.user_parameters.contains_key(name) {
            return false;
        }
        self.user_parameters.insert(name.clone(), type_def.clone());
        debug!(%name, "declared user parameter");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Fixture {
        graph: ScriptGraph,
        script: GraphId,
        function: FunctionId,
        site: CallSiteId,
    }

    fn fixture() -> Fixture {
        let mut graph = ScriptGraph::new();
        let script = graph.add_script("Fountain");
        let function = graph.add_function("Drag", None);
        graph.declare_input(function, "Speed", TypeDef::float()).unwrap();
        let site = graph.add_call_site(script, function, "Drag_001").unwrap();
        Fixture {
            graph,
            script,
            function,
            site,
        }
    }

    fn speed(site: CallSiteId) -> ParameterIdentity {
        ParameterIdentity::new("Module.Speed".parse().unwrap(), TypeDef::float(), site)
    }

    fn key(site: CallSiteId) -> OverrideKey {
        OverrideKey::for_identity(&speed(site), "Drag_001")
    }

    #[test]
    fn writes_bump_owning_version() {
        let mut f = fixture();
        let before = f.graph.change_tokens(f.site).unwrap();
        f.graph.create_override_connection(&key(f.site)).unwrap();
        let after = f.graph.change_tokens(f.site).unwrap();
        assert!(after.owning > before.owning);
        assert_eq!(after.called, before.called);
    }

    #[test]
    fn declaration_edits_bump_called_version() {
        let mut f = fixture();
        let before = f.graph.change_tokens(f.site).unwrap();
        f.graph
            .set_input_default(f.function, "Speed", DefaultSpec::Literal("2.0".into()))
            .unwrap();
        let after = f.graph.change_tokens(f.site).unwrap();
        assert_eq!(after.owning, before.owning);
        assert_ne!(after.called, before.called);
    }

    #[test]
    fn override_pin_is_reused() {
        let mut f = fixture();
        let a = f.graph.create_override_connection(&key(f.site)).unwrap();
        let b = f.graph.create_override_connection(&key(f.site)).unwrap();
        assert_eq!(a, b);
        assert_eq!(f.graph.override_count(), 1);
    }

    #[test]
    fn classify_literal_and_empty() {
        let mut f = fixture();
        let point = f.graph.create_override_connection(&key(f.site)).unwrap();
        assert_eq!(f.graph.classify_producer(point), Producer::Empty);
        f.graph.set_override_literal(point, "4.0").unwrap();
        assert_eq!(f.graph.classify_producer(point), Producer::Literal("4.0".into()));
    }

    #[test]
    fn classify_multiple_producers() {
        let mut f = fixture();
        let point = f.graph.create_override_connection(&key(f.site)).unwrap();
        f.graph.attach_expression(point, "a + b").unwrap();
        f.graph.attach_expression(point, "c").unwrap();
        assert_eq!(f.graph.classify_producer(point), Producer::MultipleProducers(2));
    }

    #[test]
    fn classify_opaque_is_malformed() {
        let mut f = fixture();
        let point = f.graph.create_override_connection(&key(f.site)).unwrap();
        let node = f.graph.add_opaque_node(f.script).unwrap();
        f.graph.connect(node, point).unwrap();
        assert_eq!(f.graph.classify_producer(point), Producer::Malformed);
    }

    #[test]
    fn remove_subgraph_drops_nested_call_sites() {
        let mut f = fixture();
        let inner = f.graph.add_function("Noise", Some(TypeDef::float()));
        f.graph.declare_input(inner, "Seed", TypeDef::int()).unwrap();

        let point = f.graph.create_override_connection(&key(f.site)).unwrap();
        let handle = f.graph.attach_nested_call(point, inner).unwrap();
        assert!(f.graph.call_site(handle.call_site).is_some());

        let nodes_before = f.graph.node_count();
        f.graph.remove_override_subgraph(point).unwrap();
        assert!(f.graph.call_site(handle.call_site).is_none());
        assert!(f.graph.find_override_connection(&key(f.site)).is_none());
        assert_eq!(f.graph.node_count(), nodes_before - 1);
    }

    #[test]
    fn read_parameter_chain_reports_next() {
        let mut f = fixture();
        let body = f.graph.function_graph(f.function).unwrap();
        let (first, first_pin) = f
            .graph
            .add_read_parameter_node(body, "Engine.Time".parse().unwrap())
            .unwrap();
        let (second, _) = f
            .graph
            .add_read_parameter_node(body, "User.Speed".parse().unwrap())
            .unwrap();
        f.graph.connect(second, first_pin).unwrap();

        let head = f.graph.add_pin(body).unwrap();
        f.graph.connect(first, head).unwrap();

        match f.graph.classify_producer(head) {
            Producer::ReadParameter { node, next, .. } => {
                assert_eq!(node, first);
                assert_eq!(next, Some(first_pin));
            }
            other => panic!("unexpected producer {other:?}"),
        }
        match f.graph.classify_producer(first_pin) {
            Producer::ReadParameter { next, .. } => assert_eq!(next, None),
            other => panic!("unexpected producer {other:?}"),
        }
    }

    #[test]
    fn destroyed_call_site_is_gone() {
        let mut f = fixture();
        f.graph.create_override_connection(&key(f.site)).unwrap();
        f.graph.destroy_call_site(f.site).unwrap();
        assert!(f.graph.call_site(f.site).is_none());
        assert!(f.graph.change_tokens(f.site).is_none());
        assert_eq!(f.graph.override_count(), 0);
    }

    #[test]
    fn lineage_lists_siblings() {
        let mut f = fixture();
        let other_script = f.graph.add_script("Sparks");
        let a = f.graph.add_inherited_call_site(f.script, f.site, "Drag_001").unwrap();
        let b = f.graph.add_inherited_call_site(other_script, f.site, "Drag_001").unwrap();

        assert_eq!(f.graph.lineage(a), vec![b]);
        assert!(f.graph.lineage(f.site).is_empty());
    }

    #[test]
    fn declare_user_parameter_is_idempotent() {
        let mut f = fixture();
        let name: ParameterName = "User.Wind".parse().unwrap();
        assert!(f.graph.declare_user_parameter(&name, &TypeDef::vec3()));
        assert!(!f.graph.declare_user_parameter(&name, &TypeDef::vec3()));
    }

    #[test]
    fn duplicate_input_rejected() {
        let mut f = fixture();
        let err = f.graph.declare_input(f.function, "Speed", TypeDef::int()).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateInput { .. }));
    }

    #[test]
    fn attached_resource_is_adopted() {
        let mut f = fixture();
        let point = f.graph.create_override_connection(&key(f.site)).unwrap();
        let handle = ResourceHandle {
            id: pore_types::ResourceId::new(),
            class: "CurveData".into(),
        };
        assert!(!f.graph.owns_resource(&handle));
        f.graph.attach_resource(point, &handle).unwrap();
        assert!(f.graph.owns_resource(&handle));
        assert_eq!(f.graph.classify_producer(point), Producer::Resource(handle.clone()));

        f.graph.remove_override_subgraph(point).unwrap();
        assert!(!f.graph.owns_resource(&handle));
    }
}
