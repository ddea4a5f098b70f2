use pore_core::{ResolutionContext, ResolutionEngine};
use pore_graph::{DefaultSpec, HierarchyEntry, HierarchySection, InputHierarchy, ScriptGraph};
use pore_test_utils::{init_test_tracing, ModuleFixture};
use pore_types::{FunctionId, LocalValue, ParameterIdentity, TypeDef, ValueSource};
use pretty_assertions::assert_eq;

fn sampler(graph: &mut ScriptGraph) -> FunctionId {
    let sampler = graph.add_function("Sampler", Some(TypeDef::vec3()));
    graph.declare_input(sampler, "Speed", TypeDef::float()).unwrap();
    graph
        .set_input_default(sampler, "Speed", DefaultSpec::Literal("1.0".into()))
        .unwrap();
    sampler
}

#[test]
fn test_dynamic_input_exposes_child_with_default() {
    init_test_tracing();
    let mut fixture = ModuleFixture::new(TypeDef::vec3());
    let sampler = sampler(&mut fixture.graph);
    let id = fixture.identity();
    let mut engine = ResolutionEngine::new(fixture.graph);
    let ctx = ResolutionContext::new();

    let handle = engine.set_dynamic(&id, sampler, &ctx).unwrap();
    assert_eq!(engine.resolve(&id, &ctx), ValueSource::Dynamic(handle));

    let children = engine.expand_children(&id, &ctx);
    let speed = id.nested("Speed", TypeDef::float(), handle.call_site, false).unwrap();
    assert_eq!(children, vec![speed.clone()]);
    assert_eq!(speed.name().to_string(), "Module.Bar.Speed");
    assert_eq!(engine.resolve(&speed, &ctx), ValueSource::Local(LocalValue::float(1.0)));
}

#[test]
fn test_child_local_value_overrides_its_default() {
    let mut fixture = ModuleFixture::new(TypeDef::vec3());
    let sampler = sampler(&mut fixture.graph);
    let id = fixture.identity();
    let mut engine = ResolutionEngine::new(fixture.graph);
    let ctx = ResolutionContext::new();

    engine.set_dynamic(&id, sampler, &ctx).unwrap();
    let speed = engine.expand_children(&id, &ctx).remove(0);
    engine.set_local(&speed, &4.0f32.to_le_bytes(), &ctx).unwrap();

    assert_eq!(engine.resolve(&speed, &ctx), ValueSource::Local(LocalValue::float(4.0)));
    assert!(engine.can_reset(&id, &ctx));
}

#[test]
fn test_replacing_dynamic_input_drops_children() {
    let mut fixture = ModuleFixture::new(TypeDef::vec3());
    let sampler = sampler(&mut fixture.graph);
    let id = fixture.identity();
    let mut engine = ResolutionEngine::new(fixture.graph);
    let ctx = ResolutionContext::new();

    engine.set_dynamic(&id, sampler, &ctx).unwrap();
    assert_eq!(engine.expand_children(&id, &ctx).len(), 1);

    engine.reset(&id).unwrap();
    assert!(engine.expand_children(&id, &ctx).is_empty());
    assert_eq!(engine.graph().override_count(), 0);
}

#[test]
fn test_dynamic_initializes_resource_children() {
    let mut fixture = ModuleFixture::new(TypeDef::vec3());
    let curve = fixture.graph.add_function("CurveSampler", Some(TypeDef::vec3()));
    fixture
        .graph
        .declare_input(curve, "Curve", TypeDef::resource("CurveData"))
        .unwrap();
    let id = fixture.identity();
    let mut engine = ResolutionEngine::new(fixture.graph);
    let ctx = ResolutionContext::new();

    engine.set_dynamic(&id, curve, &ctx).unwrap();

    let child = engine.expand_children(&id, &ctx).remove(0);
    assert!(matches!(engine.resolve(&child, &ctx), ValueSource::Data(_)));
    assert_eq!(engine.placeholders().len(), 0);
    assert_eq!(engine.graph().resources().len(), 1);
}

/// `Foo.Bar` defaults to a nested `Sampler` call whose `Seed` input is hidden
fn default_function_fixture() -> (ResolutionEngine<ScriptGraph>, ParameterIdentity) {
    let mut fixture = ModuleFixture::new(TypeDef::vec3());
    let sampler = sampler(&mut fixture.graph);
    fixture.graph.declare_input(sampler, "Seed", TypeDef::int()).unwrap();
    fixture
        .graph
        .set_hierarchy(
            sampler,
            InputHierarchy::new().with_section(
                HierarchySection::new("Noise").with_entry(HierarchyEntry::new("Seed").hidden()),
            ),
        )
        .unwrap();

    let body = fixture.graph.function_graph(fixture.function).unwrap();
    let pin = fixture.graph.add_pin(body).unwrap();
    let handle = fixture.graph.add_call_node(body, sampler).unwrap();
    let node = fixture.graph.call_node(handle.call_site).unwrap();
    fixture.graph.connect(node, pin).unwrap();
    let fixture = fixture.with_default(DefaultSpec::Connected(pin));

    let id = fixture.identity();
    (ResolutionEngine::new(fixture.graph), id)
}

#[test]
fn test_hidden_child_still_counts_for_reset() {
    let (mut engine, id) = default_function_fixture();
    let ctx = ResolutionContext::new();

    assert!(matches!(engine.resolve(&id, &ctx), ValueSource::DefaultFunction(_)));
    let visible: Vec<String> = engine
        .visible_children(&id, &ctx)
        .iter()
        .map(|child| child.input_name().to_string())
        .collect();
    assert_eq!(visible, vec!["Speed"]);
    assert!(!engine.can_reset(&id, &ctx));

    let seed = engine
        .expand_children(&id, &ctx)
        .into_iter()
        .find(|child| child.input_name() == "Seed")
        .unwrap();
    engine.set_local(&seed, &42i32.to_le_bytes(), &ctx).unwrap();

    assert_eq!(engine.resolve(&seed, &ctx), ValueSource::Local(LocalValue::int(42)));
    assert!(engine.can_reset(&id, &ctx));

    engine.reset(&seed).unwrap();
    assert!(!engine.can_reset(&id, &ctx));
}

#[test]
fn test_child_inputs_report_hierarchy_placement() {
    let (mut engine, id) = default_function_fixture();
    let ctx = ResolutionContext::new();

    let children = engine.child_inputs(&id, &ctx);
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].identity.input_name(), "Seed");
    assert_eq!(children[0].section.as_deref(), Some("Noise"));
    assert!(children[0].hidden);
    assert_eq!(children[1].display_name, "Speed");
    assert!(!children[1].hidden);
}
