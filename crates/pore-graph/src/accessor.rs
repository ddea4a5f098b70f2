//! Graph collaborator contract
//!
//! [`GraphAccessor`] is the minimal read/write surface the resolver and the
//! mutator need from the node graph. Reads never fail: a missing object is
//! reported as `None` or [`Producer::Malformed`]. Writes return
//! [`GraphResult`] so that a mutation can be rejected before any state
//! changes.

use crate::error::GraphResult;
use crate::hierarchy::InputHierarchy;
use crate::producer::{ConnectionPoint, DefaultSpec, Producer};
use crate::tokens::ChangeTokens;
use pore_types::{
    CallNodeHandle, CallSiteId, FunctionId, GraphId, ObjectRef, OverrideKey, ParameterIdentity,
    ParameterName, ResourceHandle, TypeDef,
};

/// Call-site metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteInfo {
    /// Unique instance name, substituted for the generic module namespace
    pub instance_name: String,
    /// Script (or function) graph containing the call node
    pub owning_graph: GraphId,
    /// Function the call-site instantiates
    pub function: FunctionId,
    /// Parent call-site this one was inherited from
    pub inherited_from: Option<CallSiteId>,
}

/// Declaration of one function input as seen from a call-site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredInput {
    /// Declared type
    pub type_def: TypeDef,
    /// Compile-time only parameter
    pub static_param: bool,
    /// Declared default
    pub default: DefaultSpec,
}

/// One input in a function signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInput {
    /// Input name (single segment)
    pub name: String,
    /// Declared type
    pub type_def: TypeDef,
    /// Compile-time only parameter
    pub static_param: bool,
}

/// Public surface of a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    /// Function name
    pub name: String,
    /// Inputs in declaration order
    pub inputs: Vec<SignatureInput>,
    /// Single output type, if the function produces a value
    pub output: Option<TypeDef>,
    /// Optional display grouping
    pub hierarchy: Option<InputHierarchy>,
}

impl FunctionSignature {
    /// Look up an input by name
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&SignatureInput> {
        self.inputs.iter().find(|input| input.name == name)
    }
}

/// Read/write access to the node graph
pub trait GraphAccessor {
    /// Live call-site metadata; `None` once the call node is destroyed
    fn call_site(&self, call_site: CallSiteId) -> Option<CallSiteInfo>;

    /// Current versions relevant to a call-site; `None` once it is destroyed
    fn change_tokens(&self, call_site: CallSiteId) -> Option<ChangeTokens>;

    /// Override pin for an aliased key, if one exists
    fn find_override_connection(&self, key: &OverrideKey) -> Option<ConnectionPoint>;

    /// Classify what feeds a pin
    fn classify_producer(&self, point: ConnectionPoint) -> Producer;

    /// Declaration of the input `identity` names on its call-site's function
    fn declared_input(&self, identity: &ParameterIdentity) -> Option<DeclaredInput>;

    /// Signature of a function
    fn function_signature(&self, function: FunctionId) -> Option<FunctionSignature>;

    /// Other live call-sites inherited from the same parent as `call_site`
    fn lineage(&self, call_site: CallSiteId) -> Vec<CallSiteId>;

    /// Check if the graph owns a resource instance
    fn owns_resource(&self, resource: &ResourceHandle) -> bool;

    /// Create the override pin for `key`, or return the existing one
    ///
    /// # Errors
    /// Returns error if the key's call-site is not live
    fn create_override_connection(&mut self, key: &OverrideKey) -> GraphResult<ConnectionPoint>;

    /// Remove an override pin together with every node feeding it
    ///
    /// # Errors
    /// Returns error if the pin does not exist
    fn remove_override_subgraph(&mut self, point: ConnectionPoint) -> GraphResult<()>;

    /// Store an inline literal on an unconnected pin
    ///
    /// # Errors
    /// Returns error if the pin does not exist
    fn set_override_literal(&mut self, point: ConnectionPoint, literal: &str) -> GraphResult<()>;

    /// Wire a new read-parameter node into a pin
    ///
    /// # Errors
    /// Returns error if the pin does not exist
    fn attach_read_parameter(
        &mut self,
        point: ConnectionPoint,
        name: &ParameterName,
        type_def: &TypeDef,
    ) -> GraphResult<()>;

    /// Wire a new nested function call into a pin
    ///
    /// # Errors
    /// Returns error if the pin or the function does not exist
    fn attach_nested_call(
        &mut self,
        point: ConnectionPoint,
        function: FunctionId,
    ) -> GraphResult<CallNodeHandle>;

    /// Wire a new expression node into a pin
    ///
    /// # Errors
    /// Returns error if the pin does not exist
    fn attach_expression(&mut self, point: ConnectionPoint, code: &str) -> GraphResult<()>;

    /// Wire a resource node into a pin; the graph takes ownership of the instance
    ///
    /// # Errors
    /// Returns error if the pin does not exist
    fn attach_resource(&mut self, point: ConnectionPoint, resource: &ResourceHandle) -> GraphResult<()>;

    /// Wire an object asset reference into a pin
    ///
    /// # Errors
    /// Returns error if the pin does not exist
    fn attach_object_asset(&mut self, point: ConnectionPoint, object: &ObjectRef) -> GraphResult<()>;

    /// Copy a graph-owned resource instance under a fresh id
    ///
    /// # Errors
    /// Returns error if the graph does not own the resource
    fn duplicate_resource(&mut self, resource: &ResourceHandle) -> GraphResult<ResourceHandle>;

    /// Declare a user-exposed parameter; returns `true` if it was new
    fn declare_user_parameter(&mut self, name: &ParameterName, type_def: &TypeDef) -> bool;
}
