use super::*;
use crate::expression::table::TableSet;
use crate::stage::blend::BlendFactor;
use kurbo::Point;

struct TestEntity([f32; 12]);

impl EntityParms for TestEntity {
    fn shader_parm(&self, parm: usize) -> f32 {
        self.0[parm]
    }
}

fn entity_with_parm11(value: f32) -> TestEntity {
    let mut parms = [0.0; 12];
    parms[11] = value;
    TestEntity(parms)
}

fn no_tables() -> TableSet {
    TableSet::new()
}

fn expr(src: &str) -> Expression {
    Expression::parse(src, &no_tables()).unwrap()
}

#[test]
fn new_stage_defaults() {
    let mut stage = Stage::new(StageType::Diffuse);
    stage.evaluate_expressions(TimeMs(0));

    assert!(stage.is_visible());
    assert_eq!(stage.colour(), [1.0, 1.0, 1.0, 1.0]);
    assert!(!stage.has_alpha_test());
    assert_eq!(stage.alpha_test(), 0.0);
    assert_eq!(stage.blend_func_strings(), ("gl_one", "gl_zero"));
    assert_eq!(stage.clamp_type(), ClampType::Repeat);
    assert_eq!(stage.map_type(), MapType::Map);
    assert_eq!(stage.texgen_type(), TexGenType::Normal);
    assert!(stage.flags().is_empty());
    assert_eq!(stage.num_vertex_parms(), 0);
    assert_eq!(stage.num_fragment_maps(), 0);

    let m = stage.texture_transform();
    let p = m * Point::new(0.25, 0.75);
    assert_eq!((p.x, p.y), (0.25, 0.75));
}

#[test]
fn condition_gates_visibility() {
    let mut stage = Stage::new(StageType::Blend);
    stage
        .set_condition_expression_from_string("parm11 > 0", &no_tables())
        .unwrap();

    for (value, expected) in [(-1.0, false), (0.0, false), (1.0, true), (0.5, true)] {
        let entity = entity_with_parm11(value);
        stage.evaluate_expressions_for_entity(TimeMs(0), &entity);
        assert_eq!(stage.is_visible(), expected, "parm11 = {value}");
    }
}

#[test]
fn parm11_defaults_to_zero_without_an_entity() {
    let mut stage = Stage::new(StageType::Blend);
    stage
        .set_condition_expression_from_string("parm11 > 0", &no_tables())
        .unwrap();
    stage.evaluate_expressions(TimeMs(0));
    assert!(!stage.is_visible());
}

#[test]
fn clearing_the_condition_restores_unconditional_visibility() {
    let mut stage = Stage::new(StageType::Blend);
    stage
        .set_condition_expression_from_string("0", &no_tables())
        .unwrap();
    stage.evaluate_expressions(TimeMs(0));
    assert!(!stage.is_visible());

    stage
        .set_condition_expression_from_string("", &no_tables())
        .unwrap();
    assert!(stage.is_visible());
    assert!(stage.condition_expression().is_none());
}

#[test]
fn parse_failures_leave_the_condition_untouched() {
    let mut stage = Stage::new(StageType::Blend);
    stage
        .set_condition_expression_from_string("parm11 > 0", &no_tables())
        .unwrap();

    let err = stage.set_condition_expression_from_string("flargle", &no_tables());
    assert!(err.is_err());
    assert_eq!(
        stage.condition_expression().map(Expression::source),
        Some("parm11 > 0")
    );
}

#[test]
fn disabled_stages_are_never_visible() {
    let mut stage = Stage::new(StageType::Diffuse);
    stage.evaluate_expressions(TimeMs(0));
    assert!(stage.is_visible());

    stage.set_enabled(false);
    assert!(!stage.is_visible());
    stage.set_enabled(true);
    assert!(stage.is_visible());
}

#[test]
fn declared_alpha_test_evaluates() {
    let mut stage = Stage::new(StageType::Diffuse);
    stage
        .set_alpha_test_expression_from_string("0.5", &no_tables())
        .unwrap();
    stage.evaluate_expressions(TimeMs(0));

    assert!(stage.has_alpha_test());
    assert_eq!(stage.alpha_test(), 0.5);

    stage
        .set_alpha_test_expression_from_string("", &no_tables())
        .unwrap();
    assert!(!stage.has_alpha_test());
    assert_eq!(stage.alpha_test(), 0.0);
}

#[test]
fn rgb_combo_drives_three_components() {
    let mut stage = Stage::new(StageType::Blend);
    stage
        .set_colour_expression_from_string(ColourComponent::Rgb, "0.4 * parm11", &no_tables())
        .unwrap();

    let entity = entity_with_parm11(0.5);
    stage.evaluate_expressions_for_entity(TimeMs(0), &entity);

    let [r, g, b, a] = stage.colour();
    assert!((r - 0.2).abs() < 1e-6);
    assert_eq!(r, g);
    assert_eq!(g, b);
    assert_eq!(a, 1.0);
    assert!(stage.colour_expression(ColourComponent::Rgb).is_some());
}

#[test]
fn splitting_a_combo_keeps_the_other_components() {
    let mut stage = Stage::new(StageType::Blend);
    stage.set_colour_expression(ColourComponent::Rgb, Some(expr("0.5")));
    stage.set_colour_expression(ColourComponent::Red, Some(expr("0.125")));
    stage.evaluate_expressions(TimeMs(0));

    assert_eq!(stage.colour(), [0.125, 0.5, 0.5, 1.0]);
    assert!(stage.colour_expression(ColourComponent::Rgb).is_none());
    assert!(stage.colour_expression(ColourComponent::Green).is_some());
}

#[test]
fn replacing_a_colour_expression_keeps_its_register() {
    let mut stage = Stage::new(StageType::Blend);
    stage
        .set_colour_expression_from_string(ColourComponent::Red, "time", &no_tables())
        .unwrap();
    let before = stage
        .colour_expression(ColourComponent::Red)
        .and_then(Expression::register)
        .unwrap();

    stage
        .set_colour_expression_from_string(ColourComponent::Red, "time * 2", &no_tables())
        .unwrap();
    let after = stage
        .colour_expression(ColourComponent::Red)
        .and_then(Expression::register)
        .unwrap();

    assert_eq!(before, after);

    stage.evaluate_expressions(TimeMs(3000));
    assert_eq!(stage.colour()[0], 6.0);
}

#[test]
fn set_colour_overrides_with_constants() {
    let mut stage = Stage::new(StageType::Blend);
    stage.set_colour([0.1, 0.2, 0.3, 0.4]);
    assert_eq!(stage.colour(), [0.1, 0.2, 0.3, 0.4]);

    // The reserved constants are never written through.
    assert_eq!(stage.registers().get(RegisterBank::ONE), 1.0);
    assert_eq!(stage.registers().get(RegisterBank::ZERO), 0.0);
}

#[test]
fn out_of_range_colours_pass_through() {
    let mut stage = Stage::new(StageType::Blend);
    stage.set_colour_expression(ColourComponent::Red, Some(expr("3 - 5")));
    stage.evaluate_expressions(TimeMs(0));
    assert_eq!(stage.colour()[0], -2.0);
}

#[test]
fn transforms_compose_in_declaration_order() {
    let mut stage = Stage::new(StageType::Diffuse);
    stage
        .add_transformation_from_strings(TransformKind::Translate, "1", Some("0"), &no_tables())
        .unwrap();
    stage
        .add_transformation_from_strings(TransformKind::Scale, "2", Some("2"), &no_tables())
        .unwrap();
    stage.evaluate_expressions(TimeMs(0));

    let p = stage.texture_transform() * Point::new(0.0, 0.0);
    assert!((p.x - 2.0).abs() < 1e-9 && p.y.abs() < 1e-9);
    assert_eq!(stage.transformations().len(), 2);
    assert_eq!(stage.transformations()[0].kind(), TransformKind::Translate);
}

#[test]
fn update_transformation_reparses_in_place() {
    let mut stage = Stage::new(StageType::Diffuse);
    stage
        .add_transformation_from_strings(TransformKind::Translate, "1", Some("0"), &no_tables())
        .unwrap();

    stage
        .update_transformation(0, TransformKind::Translate, "0", Some("3"), &no_tables())
        .unwrap();
    stage.evaluate_expressions(TimeMs(0));

    let p = stage.texture_transform() * Point::new(0.0, 0.0);
    assert!((p.x).abs() < 1e-9 && (p.y - 3.0).abs() < 1e-9);
}

#[test]
fn failed_transform_updates_leave_the_entry_untouched() {
    let mut stage = Stage::new(StageType::Diffuse);
    stage
        .add_transformation_from_strings(TransformKind::Translate, "1", Some("0"), &no_tables())
        .unwrap();
    stage.evaluate_expressions(TimeMs(0));

    let err = stage.update_transformation(0, TransformKind::Translate, "nonsense", None, &no_tables());
    assert!(err.is_err());

    let p = stage.texture_transform() * Point::new(0.0, 0.0);
    assert!((p.x - 1.0).abs() < 1e-9);
}

#[test]
fn updating_a_missing_transform_is_a_validation_error() {
    let mut stage = Stage::new(StageType::Diffuse);
    let err = stage
        .update_transformation(3, TransformKind::Rotate, "90", None, &no_tables())
        .unwrap_err();
    assert!(matches!(err, MaterialError::Validation(_)));
}

#[test]
fn remove_transformation_shortens_the_list() {
    let mut stage = Stage::new(StageType::Diffuse);
    stage
        .add_transformation_from_strings(TransformKind::Translate, "1", Some("0"), &no_tables())
        .unwrap();
    stage
        .add_transformation_from_strings(TransformKind::Rotate, "90", None, &no_tables())
        .unwrap();
    stage.remove_transformation(0);

    assert_eq!(stage.transformations().len(), 1);
    assert_eq!(stage.transformations()[0].kind(), TransformKind::Rotate);
}

#[test]
fn vertex_parm_components_default() {
    let mut stage = Stage::new(StageType::Diffuse);
    stage
        .add_vertex_parm(VertexParm {
            index: 0,
            expressions: vec![expr("0.5")],
        })
        .unwrap();
    stage
        .add_vertex_parm(VertexParm {
            index: 1,
            expressions: vec![expr("0.25"), expr("0.75")],
        })
        .unwrap();
    stage
        .add_vertex_parm(VertexParm {
            index: 2,
            expressions: vec![expr("0.1"), expr("0.2"), expr("0.3")],
        })
        .unwrap();
    stage.evaluate_expressions(TimeMs(0));

    assert_eq!(stage.vertex_parm_value(0), [0.5, 0.5, 0.5, 0.5]);
    assert_eq!(stage.vertex_parm_value(1), [0.25, 0.75, 0.0, 1.0]);
    assert_eq!(stage.vertex_parm_value(2), [0.1, 0.2, 0.3, 1.0]);
    assert_eq!(stage.num_vertex_parms(), 3);
}

#[test]
fn redeclaring_a_vertex_parm_releases_its_expressions() {
    let mut stage = Stage::new(StageType::Diffuse);
    stage
        .add_vertex_parm(VertexParm {
            index: 0,
            expressions: vec![expr("time")],
        })
        .unwrap();
    stage.evaluate_expressions(TimeMs(1000));

    // The first declaration linked its expression to the first register
    // after the reserved constants.
    let old = RegisterId(2);
    assert_eq!(stage.registers().get(old), 1.0);

    stage
        .add_vertex_parm(VertexParm {
            index: 0,
            expressions: vec![expr("0.25")],
        })
        .unwrap();
    stage.evaluate_expressions(TimeMs(2000));

    assert_eq!(stage.vertex_parm_value(0), [0.25; 4]);
    // The superseded expression no longer runs, so its register keeps the
    // stale value instead of tracking time.
    assert_eq!(stage.registers().get(old), 1.0);
}

#[test]
fn undeclared_vertex_parms_report_the_fixed_default() {
    let stage = Stage::new(StageType::Diffuse);
    assert_eq!(stage.vertex_parm_value(5), [0.0, 0.0, 0.0, 1.0]);
}

#[test]
fn vertex_parm_expression_counts_are_validated() {
    let mut stage = Stage::new(StageType::Diffuse);
    let err = stage
        .add_vertex_parm(VertexParm {
            index: 0,
            expressions: vec![],
        })
        .unwrap_err();
    assert!(matches!(err, MaterialError::Validation(_)));

    let too_many = (0..5).map(|_| expr("1")).collect();
    assert!(
        stage
            .add_vertex_parm(VertexParm {
                index: 0,
                expressions: too_many,
            })
            .is_err()
    );
}

#[test]
fn fragment_maps_index_by_texture_unit() {
    let mut stage = Stage::new(StageType::Diffuse);
    stage.add_fragment_map(FragmentMap {
        index: 2,
        options: vec!["cubeMap".to_owned()],
        map: "env/cells".to_owned(),
    });

    assert_eq!(stage.num_fragment_maps(), 3);
    assert_eq!(stage.fragment_map(2).map(|m| m.map.as_str()), Some("env/cells"));
    assert_eq!(stage.fragment_map(1).map(|m| m.map.as_str()), Some(""));
    assert!(stage.fragment_map(3).is_none());
}

#[test]
fn texgen_parameters_evaluate() {
    let mut stage = Stage::new(StageType::Diffuse);
    stage.set_texgen_type(TexGenType::WobbleSky);
    stage.set_texgen_expression(0, expr("time"));
    stage.evaluate_expressions(TimeMs(2000));

    assert_eq!(stage.texgen_type(), TexGenType::WobbleSky);
    assert_eq!(stage.texgen_param(0), 2.0);
    assert_eq!(stage.texgen_param(1), 0.0);
}

#[test]
fn stage_flags_set_and_clear() {
    let mut stage = Stage::new(StageType::Diffuse);
    stage.set_stage_flag(StageFlags::MASK_RED | StageFlags::NO_PICMIP);
    assert!(stage.flags().contains(StageFlags::MASK_RED));
    assert!(stage.flags().contains(StageFlags::NO_PICMIP));

    stage.clear_stage_flag(StageFlags::MASK_RED);
    assert!(!stage.flags().contains(StageFlags::MASK_RED));
    assert!(stage.flags().contains(StageFlags::NO_PICMIP));
}

#[test]
fn blend_stage_resolves_its_blend_func() {
    let mut stage = Stage::new(StageType::Blend);
    stage.set_blend_func_strings("add", "");
    let f = stage.blend_func();
    assert_eq!(f.src, BlendFactor::One);
    assert_eq!(f.dst, BlendFactor::One);
}

#[test]
fn evaluation_is_deterministic() {
    let mut stage = Stage::new(StageType::Blend);
    stage
        .set_colour_expression_from_string(ColourComponent::Rgba, "time * 0.5", &no_tables())
        .unwrap();
    stage
        .add_transformation_from_strings(TransformKind::Rotate, "time * 10", None, &no_tables())
        .unwrap();

    stage.evaluate_expressions(TimeMs(1250));
    let colour = stage.colour();
    let transform = stage.texture_transform();

    stage.evaluate_expressions(TimeMs(1250));
    assert_eq!(stage.colour(), colour);
    assert_eq!(stage.texture_transform(), transform);
}

#[test]
fn stage_types_sort_in_pass_order() {
    let mut types = vec![
        StageType::Blend,
        StageType::Specular,
        StageType::Bump,
        StageType::Diffuse,
    ];
    types.sort();
    assert_eq!(
        types,
        vec![
            StageType::Bump,
            StageType::Diffuse,
            StageType::Specular,
            StageType::Blend,
        ]
    );
}
