//! Material stage expression and evaluation engine.
//!
//! Materials in idTech-style declaration files animate their rendering state
//! with small scalar expressions over time, per-entity parameters and lookup
//! tables. This crate compiles those expressions into evaluable graphs,
//! links them into per-stage register banks, and exposes the evaluated state
//! a renderer or editor needs per frame: visibility conditions, colour,
//! alpha-test thresholds, texture-matrix transforms, blend functions and
//! vertex program parameters.
//!
//! The core loop is: build a [`Material`] out of [`Stage`]s, bind expressions
//! to stage properties, call [`Material::evaluate_expressions`] once per
//! frame, then read the evaluated properties off each visible stage.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod expression;
mod foundation;
mod material;
mod stage;

pub use expression::node::{EntityParms, EvalContext, Expression};
pub use expression::table::{TableDef, TableMode, TableSample, TableSet, TableSource};
pub use foundation::core::{Affine, Point, TimeMs, Vec2};
pub use foundation::error::{MaterialError, MaterialResult};
pub use foundation::registers::{RegisterBank, RegisterId};
pub use material::template::{Material, TextureHandle, TextureProvider};
pub use stage::blend::{BlendFactor, BlendFunc};
pub use stage::model::{
    ClampType, ColourComponent, CubeMapMode, FragmentMap, MapType, Stage, StageFlags, StageType,
    TexGenType, Transformation, VertexColourMode, VertexParm,
};
pub use stage::transform::TransformKind;
