use super::*;
use crate::expression::table::TableSet;
use crate::stage::model::{ColourComponent, StageType};

fn no_tables() -> TableSet {
    TableSet::new()
}

#[test]
fn new_material_is_empty() {
    let material = Material::new("textures/base_wall/panel");
    assert_eq!(material.name(), "textures/base_wall/panel");
    assert_eq!(material.polygon_offset(), 0.0);
    assert!(material.stages().is_empty());
}

#[test]
fn add_stage_returns_declaration_indices() {
    let mut material = Material::new("m");
    assert_eq!(material.add_stage(Stage::new(StageType::Diffuse)), 0);
    assert_eq!(material.add_stage(Stage::new(StageType::Blend)), 1);
    assert_eq!(material.stages().len(), 2);
}

#[test]
fn sorted_pass_indices_follow_canonical_order() {
    let mut material = Material::new("m");
    material.add_stage(Stage::new(StageType::Blend));
    material.add_stage(Stage::new(StageType::Specular));
    material.add_stage(Stage::new(StageType::Diffuse));
    material.add_stage(Stage::new(StageType::Bump));

    assert_eq!(material.sorted_pass_indices(), vec![3, 2, 1, 0]);
}

#[test]
fn equal_stage_types_keep_declaration_order() {
    let mut material = Material::new("m");
    material.add_stage(Stage::new(StageType::Blend));
    material.add_stage(Stage::new(StageType::Diffuse));
    material.add_stage(Stage::new(StageType::Blend));
    material.add_stage(Stage::new(StageType::Blend));

    assert_eq!(material.sorted_pass_indices(), vec![1, 0, 2, 3]);
}

#[test]
fn private_polygon_offset_overrides_the_material() {
    let mut material = Material::new("m");
    material.set_polygon_offset(1.0);
    material.add_stage(Stage::new(StageType::Diffuse));
    material.add_stage(Stage::new(StageType::Blend));
    material.stages_mut()[1].set_private_polygon_offset(-3.0);

    assert_eq!(material.polygon_offset_for_stage(0), 1.0);
    assert_eq!(material.polygon_offset_for_stage(1), -3.0);
}

#[test]
fn texture_providers_resolve_map_expressions() {
    struct FixedProvider;
    impl TextureProvider for FixedProvider {
        fn texture(&self, map_expression: &str) -> Option<TextureHandle> {
            (map_expression == "textures/decals/grime").then_some(TextureHandle {
                width: 256,
                height: 128,
            })
        }
    }

    let mut stage = Stage::new(StageType::Diffuse);
    stage.set_map_expression_from_string("textures/decals/grime");

    let provider = FixedProvider;
    let handle = stage.map_expression().and_then(|m| provider.texture(m));
    assert_eq!(
        handle,
        Some(TextureHandle {
            width: 256,
            height: 128,
        })
    );
}

#[test]
fn evaluate_reaches_every_stage() {
    let mut material = Material::new("m");
    for _ in 0..2 {
        let mut stage = Stage::new(StageType::Blend);
        stage
            .set_colour_expression_from_string(ColourComponent::Rgba, "time", &no_tables())
            .unwrap();
        material.add_stage(stage);
    }

    material.evaluate_expressions(TimeMs(1500));
    for stage in material.stages() {
        assert_eq!(stage.colour(), [1.5, 1.5, 1.5, 1.5]);
    }
}
