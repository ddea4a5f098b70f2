//! Value resolution
//!
//! Precedence, strictly in order:
//!
//! 1. memo, when the call-site's change tokens and the context fingerprint
//!    match the stamp
//! 2. override pin for the aliased identity
//! 3. rapid-cache entry, only for untouched inputs whose default is local
//! 4. declared default, including default-chain selection
//!
//! Resolution never fails. Anything that cannot be interpreted becomes
//! `None`, `InvalidOverride` or `UnsupportedDefault`.

use crate::context::ResolutionContext;
use crate::engine::ResolutionEngine;
use crate::memo::MemoStamp;
use pore_graph::{
    CallSiteInfo, ConnectionPoint, DeclaredInput, DefaultSpec, GraphAccessor,
    PlaceholderResourceManager, Producer,
};
use pore_types::{
    LinkedParameter, LocalValue, ObjectRef, OverrideKey, ParameterIdentity, ParameterName, TypeDef,
    ValueSource,
};
use std::collections::HashSet;
use tracing::{debug, trace, warn};

impl<G: GraphAccessor, P: PlaceholderResourceManager> ResolutionEngine<G, P> {
    /// Effective value source of an input
    ///
    /// Answers from the memo when nothing relevant changed since the last
    /// derivation. A destroyed call-site resolves to [`ValueSource::None`]
    /// without any further graph access.
    pub fn resolve(&mut self, identity: &ParameterIdentity, ctx: &ResolutionContext) -> ValueSource {
        let Some(tokens) = self.graph.change_tokens(identity.call_site()) else {
            debug!(%identity, "call-site destroyed");
            self.memo.invalidate(identity);
            return ValueSource::None;
        };

        let stamp = MemoStamp::new(tokens, ctx.fingerprint());
        if let Some(value) = self.memo.lookup(identity, stamp) {
            trace!(%identity, "memo hit");
            return value;
        }

        let value = self.derive(identity, ctx);
        debug!(%identity, %tokens, source = %value, "resolved");
        self.memo.store(identity.clone(), stamp, value.clone());
        value
    }

    fn derive(&mut self, identity: &ParameterIdentity, ctx: &ResolutionContext) -> ValueSource {
        let Some(site) = self.graph.call_site(identity.call_site()) else {
            return ValueSource::None;
        };

        let key = OverrideKey::for_identity(identity, &site.instance_name);
        if let Some(point) = self.graph.find_override_connection(&key) {
            return self.classify_override(identity, point);
        }

        let Some(declared) = self.graph.declared_input(identity) else {
            warn!(%identity, "input not declared by the called function");
            return ValueSource::None;
        };

        let default = self.resolve_default(identity, &site, &declared, ctx);
        if !self.rapid_eligible(identity, &declared) {
            return default;
        }

        let Some(entry) = self.rapid.get(site.owning_graph, identity) else {
            return default;
        };
        let stale_reason = if !matches!(default, ValueSource::Local(_)) {
            "default is no longer local"
        } else if entry.is_fresh_for(&declared.type_def) {
            debug!(%identity, "rapid-cache hit");
            return ValueSource::Local(entry.to_local(&declared.type_def));
        } else {
            "declared type changed"
        };

        if self.config.purge_stale_rapid_entries {
            warn!(%identity, reason = stale_reason, "purging stale rapid-cache entry");
            self.rapid.remove(site.owning_graph, identity);
        } else {
            warn!(%identity, reason = stale_reason, "skipping stale rapid-cache entry");
        }
        default
    }

    /// Whether an input may keep its value in the rapid cache
    ///
    /// The default must also be local; callers check that separately because
    /// it needs a default resolution.
    pub(crate) fn rapid_eligible(&self, identity: &ParameterIdentity, declared: &DeclaredInput) -> bool {
        self.config.rapid_cache_enabled
            && identity.type_def().is_plain()
            && !identity.is_static()
            && !declared.static_param
    }

    fn classify_override(&self, identity: &ParameterIdentity, point: ConnectionPoint) -> ValueSource {
        let type_def = identity.type_def();
        match self.graph.classify_producer(point) {
            Producer::Literal(text) => {
                if !type_def.is_inline() {
                    warn!(%identity, "literal override on a type that is never inline");
                    return ValueSource::InvalidOverride;
                }
                match type_def.decode_literal(&text) {
                    Ok(bytes) => ValueSource::Local(LocalValue::new(type_def.clone(), bytes)),
                    Err(err) => {
                        warn!(%identity, error = %err, "override literal does not decode");
                        ValueSource::InvalidOverride
                    }
                }
            }
            Producer::Resource(handle) => ValueSource::Data(handle),
            Producer::ReadParameter { name, .. } => {
                ValueSource::Linked(LinkedParameter::new(name, type_def.clone()))
            }
            Producer::Expression(code) => ValueSource::Expression(code),
            Producer::NestedCall(handle) => ValueSource::Dynamic(handle),
            Producer::ObjectAsset(object) => ValueSource::ObjectAsset(object),
            other @ (Producer::Empty | Producer::MultipleProducers(_) | Producer::Malformed) => {
                warn!(%identity, producer = other.label(), "override cannot be interpreted");
                ValueSource::InvalidOverride
            }
        }
    }

    /// Value the input would have with no override and no rapid-cache entry
    pub(crate) fn resolve_default(
        &mut self,
        identity: &ParameterIdentity,
        site: &CallSiteInfo,
        declared: &DeclaredInput,
        ctx: &ResolutionContext,
    ) -> ValueSource {
        let type_def = &declared.type_def;
        match &declared.default {
            DefaultSpec::Binding(name) => ValueSource::Linked(LinkedParameter::new(
                name.aliased(&site.instance_name),
                type_def.clone(),
            )),
            DefaultSpec::Literal(text) => self.literal_default(identity, type_def, Some(text)),
            DefaultSpec::None => self.literal_default(identity, type_def, None),
            DefaultSpec::Connected(point) => match self.graph.classify_producer(*point) {
                Producer::Literal(text) => self.literal_default(identity, type_def, Some(&text)),
                Producer::Empty => self.literal_default(identity, type_def, None),
                Producer::Resource(handle) => ValueSource::Data(handle),
                Producer::ObjectAsset(object) => ValueSource::ObjectAsset(object),
                Producer::Expression(code) => ValueSource::Expression(code),
                Producer::NestedCall(handle) => ValueSource::DefaultFunction(handle),
                first @ Producer::ReadParameter { .. } => {
                    self.walk_default_chain(identity, site, type_def, first, ctx)
                }
                other @ (Producer::MultipleProducers(_) | Producer::Malformed) => {
                    warn!(%identity, producer = other.label(), "default cannot be interpreted");
                    ValueSource::UnsupportedDefault
                }
            },
        }
    }

    fn literal_default(
        &mut self,
        identity: &ParameterIdentity,
        type_def: &TypeDef,
        text: Option<&str>,
    ) -> ValueSource {
        if type_def.is_resource() {
            let handle = self
                .placeholders
                .get_or_create(identity.call_site(), identity, type_def.name());
            return ValueSource::Data(handle);
        }
        if type_def.is_object() {
            return match text.map(str::trim).filter(|path| !path.is_empty()) {
                Some(path) => ValueSource::ObjectAsset(ObjectRef::new(path)),
                None => ValueSource::UnsupportedDefault,
            };
        }

        let decoded = match text {
            Some(text) => type_def.decode_literal(text).ok(),
            None => type_def.zero_value(),
        };
        match decoded {
            Some(bytes) => ValueSource::Local(LocalValue::new(type_def.clone(), bytes)),
            None => {
                warn!(%identity, literal = ?text, "default literal does not decode");
                ValueSource::UnsupportedDefault
            }
        }
    }

    /// Walk a read-parameter chain and select one candidate
    ///
    /// Candidates are collected starting at the node wired to the input pin.
    /// The first candidate visible in `ctx` wins. When none is, the chain
    /// falls back to the head node, which is the last link in data-flow
    /// order (every deeper node only feeds the default of the one above it),
    /// so there is always something to display.
    fn walk_default_chain(
        &mut self,
        identity: &ParameterIdentity,
        site: &CallSiteInfo,
        type_def: &TypeDef,
        first: Producer,
        ctx: &ResolutionContext,
    ) -> ValueSource {
        let mut visited = HashSet::new();
        let mut candidates: Vec<ParameterName> = Vec::new();
        let mut current = Some(first);

        while let Some(Producer::ReadParameter { node, name, next }) = current {
            if !visited.insert(node) {
                warn!(%identity, %node, "cycle in default chain");
                return ValueSource::UnsupportedDefault;
            }
            if candidates.len() >= self.config.max_default_chain_length {
                warn!(%identity, limit = self.config.max_default_chain_length, "default chain too long");
                return ValueSource::UnsupportedDefault;
            }
            candidates.push(name.aliased(&site.instance_name));
            current = next.map(|point| self.graph.classify_producer(point));
        }

        let chosen = match candidates.iter().find(|name| ctx.is_resolvable(name)) {
            Some(name) => Some(name),
            None => {
                debug!(%identity, candidates = candidates.len(), "no resolvable chain candidate; using head");
                candidates.first()
            }
        };
        match chosen {
            Some(name) => ValueSource::Linked(LinkedParameter::new(name.clone(), type_def.clone())),
            None => ValueSource::UnsupportedDefault,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{ResolutionContext, ResolutionEngine, ResolverConfig};
    use pore_graph::{DefaultSpec, GraphAccessor, ScriptGraph};
    use pore_types::{CallSiteId, FunctionId, OverrideKey, ParameterIdentity, TypeDef, ValueSource};

    struct Setup {
        graph: ScriptGraph,
        function: FunctionId,
        site: CallSiteId,
    }

    fn setup(type_def: TypeDef) -> Setup {
        let mut graph = ScriptGraph::new();
        let script = graph.add_script("Fountain");
        let function = graph.add_function("Foo", None);
        graph.declare_input(function, "Bar", type_def).unwrap();
        let site = graph.add_call_site(script, function, "Foo_001").unwrap();
        Setup {
            graph,
            function,
            site,
        }
    }

    fn bar(site: CallSiteId, type_def: TypeDef) -> ParameterIdentity {
        ParameterIdentity::new("Module.Bar".parse().unwrap(), type_def, site)
    }

    #[test]
    fn missing_default_uses_zero_value() {
        let s = setup(TypeDef::quat());
        let mut engine = ResolutionEngine::new(s.graph);
        let value = engine.resolve(&bar(s.site, TypeDef::quat()), &ResolutionContext::new());
        let local = value.as_local().unwrap();
        assert_eq!(local.components(), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn undecodable_default_is_unsupported() {
        let mut s = setup(TypeDef::int());
        s.graph
            .set_input_default(s.function, "Bar", DefaultSpec::Literal("seven".into()))
            .unwrap();
        let mut engine = ResolutionEngine::new(s.graph);
        let value = engine.resolve(&bar(s.site, TypeDef::int()), &ResolutionContext::new());
        assert_eq!(value, ValueSource::UnsupportedDefault);
    }

    #[test]
    fn binding_is_aliased_to_instance() {
        let mut s = setup(TypeDef::float());
        s.graph
            .set_input_default(s.function, "Bar", DefaultSpec::Binding("Module.Scale".parse().unwrap()))
            .unwrap();
        let mut engine = ResolutionEngine::new(s.graph);
        match engine.resolve(&bar(s.site, TypeDef::float()), &ResolutionContext::new()) {
            ValueSource::Linked(linked) => assert_eq!(linked.name.to_string(), "Foo_001.Scale"),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn object_default_literal_is_asset_path() {
        let mut s = setup(TypeDef::object("Mesh"));
        s.graph
            .set_input_default(s.function, "Bar", DefaultSpec::Literal("/Game/Rock".into()))
            .unwrap();
        let mut engine = ResolutionEngine::new(s.graph);
        match engine.resolve(&bar(s.site, TypeDef::object("Mesh")), &ResolutionContext::new()) {
            ValueSource::ObjectAsset(object) => assert_eq!(object.path, "/Game/Rock"),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn resource_default_is_shared_placeholder() {
        let s = setup(TypeDef::resource("CurveData"));
        let mut engine = ResolutionEngine::new(s.graph);
        let id = bar(s.site, TypeDef::resource("CurveData"));
        let ctx = ResolutionContext::new();

        let first = engine.resolve(&id, &ctx);
        engine.invalidate_all();
        let second = engine.resolve(&id, &ctx);
        assert!(matches!(first, ValueSource::Data(_)));
        assert_eq!(first, second);
    }

    #[test]
    fn expression_default_passes_through() {
        let mut s = setup(TypeDef::float());
        let body = s.graph.function_graph(s.function).unwrap();
        let pin = s.graph.add_pin(body).unwrap();
        let node = s.graph.add_expression_node(body, "Engine.Time * 2").unwrap();
        s.graph.connect(node, pin).unwrap();
        s.graph
            .set_input_default(s.function, "Bar", DefaultSpec::Connected(pin))
            .unwrap();

        let mut engine = ResolutionEngine::new(s.graph);
        let value = engine.resolve(&bar(s.site, TypeDef::float()), &ResolutionContext::new());
        assert_eq!(value, ValueSource::Expression("Engine.Time * 2".into()));
    }

    #[test]
    fn chain_length_bound() {
        let mut s = setup(TypeDef::float());
        let body = s.graph.function_graph(s.function).unwrap();
        let head = s.graph.add_pin(body).unwrap();
        let mut pin = head;
        for i in 0..4 {
            let (node, next) = s
                .graph
                .add_read_parameter_node(body, format!("User.P{i}").parse().unwrap())
                .unwrap();
            s.graph.connect(node, pin).unwrap();
            pin = next;
        }
        s.graph
            .set_input_default(s.function, "Bar", DefaultSpec::Connected(head))
            .unwrap();

        let config = ResolverConfig::new().with_max_default_chain_length(3);
        let mut engine = ResolutionEngine::with_config(s.graph, config).unwrap();
        let value = engine.resolve(&bar(s.site, TypeDef::float()), &ResolutionContext::new());
        assert_eq!(value, ValueSource::UnsupportedDefault);
    }

    #[test]
    fn undeclared_input_is_none() {
        let s = setup(TypeDef::float());
        let mut engine = ResolutionEngine::new(s.graph);
        let missing = ParameterIdentity::new("Module.Missing".parse().unwrap(), TypeDef::float(), s.site);
        assert_eq!(engine.resolve(&missing, &ResolutionContext::new()), ValueSource::None);
    }

    #[test]
    fn static_inputs_skip_rapid_cache() {
        let mut s = setup(TypeDef::int());
        s.graph.set_input_static(s.function, "Bar", true).unwrap();
        let mut engine = ResolutionEngine::new(s.graph);
        let id = bar(s.site, TypeDef::int()).with_static(true);
        engine
            .set_local(&id, &7i32.to_le_bytes(), &ResolutionContext::new())
            .unwrap();
        assert_eq!(engine.rapid_cache_len(), 0);
        let key = OverrideKey::for_identity(&id, "Foo_001");
        assert!(engine.graph().find_override_connection(&key).is_some());
    }
}
