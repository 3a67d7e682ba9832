use crate::expression::node::EntityParms;
use crate::foundation::core::TimeMs;
use crate::stage::model::Stage;

/// An opaque handle to a resolved texture: the engine-facing result of
/// binding a stage's image expression through a [`TextureProvider`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TextureHandle {
    /// Texture width in pixels.
    pub width: u32,
    /// Texture height in pixels.
    pub height: u32,
}

/// Resolves image expression strings to texture handles.
///
/// The evaluation engine never touches image data itself; renderers and
/// editors supply whatever backing store they have.
pub trait TextureProvider {
    /// Resolve an image expression string, `None` when it names nothing.
    fn texture(&self, map_expression: &str) -> Option<TextureHandle>;
}

/// A material: a named, ordered collection of stages plus material-wide
/// render state.
///
/// Stage order is declaration order; [`Material::sorted_pass_indices`]
/// produces the canonical interaction-pass order without disturbing it.
#[derive(Debug, Default)]
pub struct Material {
    name: String,
    polygon_offset: f32,
    stages: Vec<Stage>,
}

impl Material {
    /// Create an empty material with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            polygon_offset: 0.0,
            stages: Vec::new(),
        }
    }

    /// The material's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Material-wide polygon offset.
    pub fn polygon_offset(&self) -> f32 {
        self.polygon_offset
    }

    /// Set the material-wide polygon offset.
    pub fn set_polygon_offset(&mut self, offset: f32) {
        self.polygon_offset = offset;
    }

    /// Append a stage, returning its declaration index.
    pub fn add_stage(&mut self, stage: Stage) -> usize {
        self.stages.push(stage);
        self.stages.len() - 1
    }

    /// The stages in declaration order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Mutable access to the stages in declaration order.
    pub fn stages_mut(&mut self) -> &mut [Stage] {
        &mut self.stages
    }

    /// Evaluate every stage's expressions for the given time without an
    /// entity.
    pub fn evaluate_expressions(&mut self, time: TimeMs) {
        for stage in &mut self.stages {
            stage.evaluate_expressions(time);
        }
    }

    /// Evaluate every stage's expressions, resolving `parmN` references
    /// against `entity`.
    pub fn evaluate_expressions_for_entity(&mut self, time: TimeMs, entity: &dyn EntityParms) {
        for stage in &mut self.stages {
            stage.evaluate_expressions_for_entity(time, entity);
        }
    }

    /// Stage indices in canonical pass order: bump, diffuse, specular, then
    /// blend stages. The sort is stable, so stages of equal type keep their
    /// declaration order.
    pub fn sorted_pass_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.stages.len()).collect();
        indices.sort_by_key(|&i| self.stages[i].stage_type());
        indices
    }

    /// The polygon offset in effect for a stage: its private offset when
    /// non-zero, the material-wide offset otherwise.
    pub fn polygon_offset_for_stage(&self, stage: usize) -> f32 {
        let private = self.stages[stage].private_polygon_offset();
        if private != 0.0 {
            private
        } else {
            self.polygon_offset
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/material/template.rs"]
mod tests;
