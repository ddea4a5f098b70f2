use pore_core::{ResolutionContext, ResolutionEngine, ResolverConfig, ScopeKind};
use pore_graph::{DefaultSpec, GraphAccessor, ScriptGraph};
use pore_test_utils::{engine_name, init_test_tracing, user_name, ModuleFixture};
use pore_types::{LinkedParameter, LocalValue, OverrideKey, TypeDef, ValueSource};
use pretty_assertions::assert_eq;

fn linked_name(value: &ValueSource) -> String {
    match value {
        ValueSource::Linked(linked) => linked.name.to_string(),
        other => panic!("expected linked value, got {other}"),
    }
}

#[test]
fn test_memo_serves_repeat_resolves_without_graph_reads() {
    init_test_tracing();
    let (graph, id) = ModuleFixture::int_with_zero_default().counting();
    let mut engine = ResolutionEngine::new(graph);
    let ctx = ResolutionContext::new();

    let first = engine.resolve(&id, &ctx);
    let after_first = engine.graph().reads();
    assert!(after_first.structural_reads() > 0);
    assert_eq!(after_first.override_lookups, 1);

    for _ in 0..5 {
        assert_eq!(engine.resolve(&id, &ctx), first);
    }
    let after_repeats = engine.graph().reads();
    assert_eq!(after_repeats.structural_reads(), after_first.structural_reads());
    assert_eq!(after_repeats.token_reads, after_first.token_reads + 5);
    assert_eq!(engine.memo_stats().hits, 5);
    assert_eq!(engine.memo_stats().misses, 1);
}

#[test]
fn test_mutation_costs_exactly_one_rederivation() {
    let (graph, id) = ModuleFixture::int_with_zero_default().counting();
    let mut engine = ResolutionEngine::new(graph);
    let ctx = ResolutionContext::new();

    engine.resolve(&id, &ctx);
    engine.set_local(&id, &5i32.to_le_bytes(), &ctx).unwrap();
    engine.graph().reset_counts();

    assert_eq!(engine.resolve(&id, &ctx), ValueSource::Local(LocalValue::int(5)));
    assert_eq!(engine.graph().reads().override_lookups, 1);
    assert_eq!(engine.resolve(&id, &ctx), ValueSource::Local(LocalValue::int(5)));
    assert_eq!(engine.graph().reads().override_lookups, 1);
}

#[test]
fn test_external_graph_edit_rolls_change_tokens() {
    let fixture = ModuleFixture::int_with_zero_default();
    let function = fixture.function;
    let id = fixture.identity();
    let mut engine = ResolutionEngine::new(fixture.graph);
    let ctx = ResolutionContext::new();

    assert_eq!(engine.resolve(&id, &ctx), ValueSource::Local(LocalValue::int(0)));
    engine
        .graph_mut()
        .set_input_default(function, "Bar", DefaultSpec::Literal("3".into()))
        .unwrap();
    assert_eq!(engine.resolve(&id, &ctx), ValueSource::Local(LocalValue::int(3)));
}

#[test]
fn test_override_beats_stale_rapid_entry() {
    let fixture = ModuleFixture::int_with_zero_default();
    let id = fixture.identity();
    let mut engine = ResolutionEngine::new(fixture.graph);
    let ctx = ResolutionContext::new();

    engine.set_local(&id, &5i32.to_le_bytes(), &ctx).unwrap();
    assert!(engine.rapid_cache_entry(&id).is_some());

    let key = OverrideKey::for_identity(&id, "Foo_001");
    let point = engine.graph_mut().create_override_connection(&key).unwrap();
    engine.graph_mut().set_override_literal(point, "9").unwrap();

    assert_eq!(engine.resolve(&id, &ctx), ValueSource::Local(LocalValue::int(9)));
}

#[test]
fn test_empty_override_pin_is_invalid() {
    let fixture = ModuleFixture::int_with_zero_default();
    let id = fixture.identity();
    let mut engine = ResolutionEngine::new(fixture.graph);
    let key = OverrideKey::for_identity(&id, "Foo_001");
    engine.graph_mut().create_override_connection(&key).unwrap();

    let value = engine.resolve(&id, &ResolutionContext::new());
    assert_eq!(value, ValueSource::InvalidOverride);
    assert!(value.needs_user_action());
}

#[test]
fn test_stale_rapid_entry_is_purged_after_type_change() {
    let fixture = ModuleFixture::new(TypeDef::float());
    let function = fixture.function;
    let id = fixture.identity();
    let mut engine = ResolutionEngine::new(fixture.graph);
    let ctx = ResolutionContext::new();

    engine.set_local(&id, &2.0f32.to_le_bytes(), &ctx).unwrap();
    engine.graph_mut().set_input_type(function, "Bar", TypeDef::vec3()).unwrap();

    let retyped = pore_types::ParameterIdentity::new(id.name().clone(), TypeDef::vec3(), id.call_site());
    let value = engine.resolve(&retyped, &ctx);
    assert_eq!(value.as_local().map(LocalValue::components), Some(vec![0.0, 0.0, 0.0]));
    assert_eq!(engine.rapid_cache_len(), 0);
}

#[test]
fn test_stale_rapid_entry_kept_when_purge_disabled() {
    let fixture = ModuleFixture::new(TypeDef::float());
    let function = fixture.function;
    let id = fixture.identity();
    let config = ResolverConfig::new().with_stale_purge(false);
    let mut engine = ResolutionEngine::with_config(fixture.graph, config).unwrap();
    let ctx = ResolutionContext::new();

    engine.set_local(&id, &2.0f32.to_le_bytes(), &ctx).unwrap();
    engine.graph_mut().set_input_type(function, "Bar", TypeDef::vec3()).unwrap();

    let retyped = pore_types::ParameterIdentity::new(id.name().clone(), TypeDef::vec3(), id.call_site());
    assert!(engine.resolve(&retyped, &ctx).as_local().is_some());
    assert_eq!(engine.rapid_cache_len(), 1);
}

#[test]
fn test_default_chain_cycle_is_unsupported() {
    let mut fixture = ModuleFixture::new(TypeDef::float());
    let body = fixture.graph.function_graph(fixture.function).unwrap();
    let head = fixture.graph.add_pin(body).unwrap();
    let (a, a_default) = fixture.graph.add_read_parameter_node(body, user_name("A")).unwrap();
    let (b, b_default) = fixture.graph.add_read_parameter_node(body, user_name("B")).unwrap();
    fixture.graph.connect(a, head).unwrap();
    fixture.graph.connect(b, a_default).unwrap();
    fixture.graph.connect(a, b_default).unwrap();
    let fixture = fixture.with_default(DefaultSpec::Connected(head));

    let id = fixture.identity();
    let mut engine = ResolutionEngine::new(fixture.graph);
    assert_eq!(engine.resolve(&id, &ResolutionContext::new()), ValueSource::UnsupportedDefault);
}

#[test]
fn test_default_chain_prefers_resolvable_then_falls_back_to_head() {
    let mut fixture = ModuleFixture::new(TypeDef::float());
    let body = fixture.graph.function_graph(fixture.function).unwrap();
    let head = fixture.graph.add_pin(body).unwrap();
    let (time, time_default) = fixture
        .graph
        .add_read_parameter_node(body, engine_name("Time"))
        .unwrap();
    let (speed, _) = fixture.graph.add_read_parameter_node(body, user_name("Speed")).unwrap();
    fixture.graph.connect(time, head).unwrap();
    fixture.graph.connect(speed, time_default).unwrap();
    let fixture = fixture.with_default(DefaultSpec::Connected(head));

    let id = fixture.identity();
    let mut engine = ResolutionEngine::new(fixture.graph);
    let mut ctx = ResolutionContext::new().with_user_parameter(user_name("Speed"), TypeDef::float());

    assert_eq!(linked_name(&engine.resolve(&id, &ctx)), "User.Speed");

    assert!(ctx.remove(ScopeKind::User, &user_name("Speed")));
    assert_eq!(linked_name(&engine.resolve(&id, &ctx)), "Engine.Time");

    ctx.declare(ScopeKind::Engine, engine_name("Time"), TypeDef::float());
    assert_eq!(linked_name(&engine.resolve(&id, &ctx)), "Engine.Time");
}

#[test]
fn test_nested_call_default_is_default_function() {
    let mut fixture = ModuleFixture::new(TypeDef::vec3());
    let sampler = fixture.graph.add_function("Sampler", Some(TypeDef::vec3()));
    let body = fixture.graph.function_graph(fixture.function).unwrap();
    let pin = fixture.graph.add_pin(body).unwrap();
    let handle = fixture.graph.add_call_node(body, sampler).unwrap();
    let node = fixture.graph.call_node(handle.call_site).unwrap();
    fixture.graph.connect(node, pin).unwrap();
    let fixture = fixture.with_default(DefaultSpec::Connected(pin));

    let id = fixture.identity();
    let mut engine = ResolutionEngine::new(fixture.graph);
    assert_eq!(engine.resolve(&id, &ResolutionContext::new()), ValueSource::DefaultFunction(handle));
}

#[test]
fn test_destroyed_call_site_resolves_to_none() {
    let fixture = ModuleFixture::int_with_zero_default();
    let id = fixture.identity();
    let mut engine = ResolutionEngine::new(fixture.graph);
    let ctx = ResolutionContext::new();

    engine.set_local(&id, &4i32.to_le_bytes(), &ctx).unwrap();
    assert_eq!(engine.resolve(&id, &ctx), ValueSource::Local(LocalValue::int(4)));

    engine.graph_mut().destroy_call_site(id.call_site()).unwrap();
    assert_eq!(engine.resolve(&id, &ctx), ValueSource::None);

    let report = engine.purge_call_site(id.call_site());
    assert_eq!(report.rapid_entries, 1);
    assert_eq!(engine.rapid_cache_len(), 0);
}

#[test]
fn test_linked_override_resolves_to_name() {
    let fixture = ModuleFixture::new(TypeDef::float());
    let id = fixture.identity();
    let mut engine = ResolutionEngine::new(fixture.graph);
    let target = LinkedParameter::new(user_name("Wind"), TypeDef::float());

    engine.set_linked(&id, &target).unwrap();
    assert_eq!(engine.resolve(&id, &ResolutionContext::new()), ValueSource::Linked(target));
    assert!(engine.graph().user_parameter(&user_name("Wind")).is_some());
}

#[test]
fn test_rapid_cache_disabled_writes_override_literal() {
    let fixture = ModuleFixture::int_with_zero_default();
    let id = fixture.identity();
    let config = ResolverConfig::new().with_rapid_cache(false);
    let mut engine = ResolutionEngine::with_config(fixture.graph, config).unwrap();
    let ctx = ResolutionContext::new();

    engine.set_local(&id, &6i32.to_le_bytes(), &ctx).unwrap();
    assert_eq!(engine.rapid_cache_len(), 0);
    assert_eq!(engine.graph().override_count(), 1);
    assert_eq!(engine.resolve(&id, &ctx), ValueSource::Local(LocalValue::int(6)));
}

#[test]
fn test_config_from_toml() {
    let config = ResolverConfig::from_toml_str("max_expansion_depth = 4\nrapid_cache_enabled = false\n").unwrap();
    assert_eq!(config.max_expansion_depth, 4);
    assert!(!config.rapid_cache_enabled);
    assert_eq!(config.max_default_chain_length, ResolverConfig::default().max_default_chain_length);

    let engine = ResolutionEngine::with_config(ScriptGraph::new(), config.clone()).unwrap();
    assert_eq!(engine.config(), &config);
}
