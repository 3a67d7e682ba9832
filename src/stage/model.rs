use kurbo::{Affine, Vec2};

use crate::expression::node::{EntityParms, EvalContext, Expression};
use crate::expression::table::TableSource;
use crate::foundation::core::TimeMs;
use crate::foundation::error::{MaterialError, MaterialResult};
use crate::foundation::registers::{RegisterBank, RegisterId};
use crate::stage::blend::BlendFunc;
use crate::stage::transform::{self, TransformKind};

/// Stage (layer) type of a material pass.
///
/// The derived ordering is the canonical interaction-pass sort order renderers
/// rely on: bump before diffuse before specular, blends last.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum StageType {
    /// Normal map pass.
    Bump,
    /// Diffuse map pass.
    Diffuse,
    /// Specular map pass.
    Specular,
    /// Non-interaction blend pass.
    Blend,
}

/// Per-stage texture clamp behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ClampType {
    /// Tile in both directions (the default).
    Repeat,
    /// Clamp to the edge texel.
    NoRepeat,
    /// Clamp to an all-zero border.
    ZeroClamp,
    /// Clamp to a border that is zero in alpha only.
    AlphaZeroClamp,
}

/// Texture-coordinate generation mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TexGenType {
    /// Declared texture coordinates.
    Normal,
    /// Reflection vector lookup.
    Reflect,
    /// Skybox lookup.
    Skybox,
    /// Skybox lookup distorted by the three wobble parameters.
    WobbleSky,
    /// Screen-aligned coordinates.
    Screen,
}

/// How a cube map stage orients its lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CubeMapMode {
    /// Not a cube map stage.
    None,
    /// Oriented to the camera.
    Camera,
    /// Oriented to the object.
    Object,
}

/// How the stage colour combines with vertex colours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VertexColourMode {
    /// Vertex colours are ignored.
    None,
    /// Multiply by the vertex colour.
    Multiply,
    /// Multiply by one minus the vertex colour.
    InverseMultiply,
}

/// How the stage's image is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MapType {
    /// Plain 2D image map (the default).
    Map,
    /// Cube map set.
    CubeMap,
    /// Camera-oriented cube map set.
    CameraCubeMap,
    /// Video stream.
    VideoMap,
    /// Sound amplitude visualisation.
    SoundMap,
    /// Offscreen mirror render target.
    MirrorRenderMap,
    /// Offscreen remote-view render target.
    RemoteRenderMap,
}

bitflags::bitflags! {
    /// Static per-stage option flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct StageFlags: u32 {
        /// Ignore the material-wide alpha test.
        const IGNORE_ALPHA_TEST = 1 << 0;
        /// Force nearest-neighbour filtering.
        const FILTER_NEAREST = 1 << 1;
        /// Force linear filtering.
        const FILTER_LINEAR = 1 << 2;
        /// Use high quality (uncompressed) image data.
        const HIGH_QUALITY = 1 << 3;
        /// Use high quality image data even when quality is turned down.
        const FORCE_HIGH_QUALITY = 1 << 4;
        /// Exempt from picmip resolution reduction.
        const NO_PICMIP = 1 << 5;
        /// Mask the red channel.
        const MASK_RED = 1 << 6;
        /// Mask the green channel.
        const MASK_GREEN = 1 << 7;
        /// Mask the blue channel.
        const MASK_BLUE = 1 << 8;
        /// Mask the alpha channel.
        const MASK_ALPHA = 1 << 9;
        /// Mask depth writes.
        const MASK_DEPTH = 1 << 10;
        /// Draw ignoring the depth buffer.
        const IGNORE_DEPTH = 1 << 11;
    }
}

/// Selector for the colour component mutators: one of the four components, or
/// the RGB/RGBA combos that bind one expression to several components at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColourComponent {
    /// Red only.
    Red,
    /// Green only.
    Green,
    /// Blue only.
    Blue,
    /// Alpha only.
    Alpha,
    /// Red, green and blue share one expression.
    Rgb,
    /// All four components share one expression.
    Rgba,
}

/// One dynamic property: the register index is the stable handle other code
/// holds on to, the expression index points into the stage's expression list
/// and is re-bound by the editing mutators.
#[derive(Clone, Copy, Debug)]
struct ExpressionSlot {
    expr: Option<usize>,
    register: RegisterId,
}

impl ExpressionSlot {
    fn unset(default_register: RegisterId) -> Self {
        Self {
            expr: None,
            register: default_register,
        }
    }
}

/// One entry of a stage's ordered texture-transform list.
#[derive(Clone, Debug)]
pub struct Transformation {
    kind: TransformKind,
    slots: [ExpressionSlot; 2],
}

impl Transformation {
    /// The transform kind of this entry.
    pub fn kind(&self) -> TransformKind {
        self.kind
    }
}

/// A `vertexParm` declaration: parm slot index plus 1 to 4 expressions.
///
/// Missing components follow the declaration defaults: a single expression is
/// broadcast to all four components, two expressions get `z = 0, w = 1`, and
/// three get `w = 1`.
#[derive(Debug)]
pub struct VertexParm {
    /// Vertex program parameter slot.
    pub index: usize,
    /// 1 to 4 component expressions.
    pub expressions: Vec<Expression>,
}

/// A `fragmentMap` declaration: texture unit index, option keywords and the
/// image expression string resolved by the texture provider.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct FragmentMap {
    /// Fragment program texture unit.
    pub index: usize,
    /// Option keywords such as `cubeMap` or `nearest`.
    pub options: Vec<String>,
    /// Image expression string.
    pub map: String,
}

/// One rendering pass of a material.
///
/// A stage owns its register bank and expression list; every dynamic property
/// is an expression slot whose register holds the value of the most recent
/// [`Stage::evaluate_expressions`] call. Static metadata (flags, clamp, blend
/// tokens, map type) is plain data mutated only through the editing API.
#[derive(Clone, Debug)]
pub struct Stage {
    stage_type: StageType,
    flags: StageFlags,
    clamp: ClampType,
    map_type: MapType,
    cube_map_mode: CubeMapMode,
    vertex_colour_mode: VertexColourMode,
    texgen: TexGenType,
    blend_strings: (String, String),
    map_expression: Option<String>,
    render_map_size: Vec2,
    vertex_program: String,
    fragment_program: String,
    private_polygon_offset: f32,
    enabled: bool,

    registers: RegisterBank,
    expressions: Vec<Option<Expression>>,

    condition: ExpressionSlot,
    alpha_test: ExpressionSlot,
    colour: [ExpressionSlot; 4],
    texgen_params: [ExpressionSlot; 3],
    transforms: Vec<Transformation>,
    vertex_parms: Vec<VertexParmSlot>,
    fragment_maps: Vec<FragmentMap>,
}

/// Installed vertex parm slot: the four component registers plus the
/// expression indices this slot owns, released when it is redeclared.
#[derive(Clone, Debug)]
struct VertexParmSlot {
    registers: [RegisterId; 4],
    exprs: Vec<usize>,
}

impl VertexParmSlot {
    fn unset() -> Self {
        Self {
            registers: [RegisterBank::ZERO; 4],
            exprs: Vec::new(),
        }
    }
}

impl Stage {
    /// Create a stage of the given type with legacy defaults: visible, white
    /// colour, no alpha test, identity texture transform, `gl_one, gl_zero`
    /// blend tokens.
    pub fn new(stage_type: StageType) -> Self {
        Self {
            stage_type,
            flags: StageFlags::empty(),
            clamp: ClampType::Repeat,
            map_type: MapType::Map,
            cube_map_mode: CubeMapMode::None,
            vertex_colour_mode: VertexColourMode::None,
            texgen: TexGenType::Normal,
            blend_strings: ("gl_one".to_owned(), "gl_zero".to_owned()),
            map_expression: None,
            render_map_size: Vec2::ZERO,
            vertex_program: String::new(),
            fragment_program: String::new(),
            private_polygon_offset: 0.0,
            enabled: true,
            registers: RegisterBank::new(),
            expressions: Vec::new(),
            condition: ExpressionSlot::unset(RegisterBank::ONE),
            alpha_test: ExpressionSlot::unset(RegisterBank::ZERO),
            colour: [ExpressionSlot::unset(RegisterBank::ONE); 4],
            texgen_params: [ExpressionSlot::unset(RegisterBank::ZERO); 3],
            transforms: Vec::new(),
            vertex_parms: Vec::new(),
            fragment_maps: Vec::new(),
        }
    }

    // --- evaluation -------------------------------------------------------

    /// Evaluate every expression owned by this stage for the given time,
    /// without an entity (parm0-3 default to 1, the rest to 0).
    pub fn evaluate_expressions(&mut self, time: TimeMs) {
        self.eval_all(&EvalContext::new(time));
    }

    /// Evaluate every expression owned by this stage, resolving `parmN`
    /// references against `entity`.
    pub fn evaluate_expressions_for_entity(&mut self, time: TimeMs, entity: &dyn EntityParms) {
        self.eval_all(&EvalContext::with_entity(time, entity));
    }

    /// Fixed evaluation order: condition, alpha test, colour, texgen,
    /// transforms, vertex parms. The order is irrelevant to correctness but
    /// pinned for determinism.
    fn eval_all(&mut self, ctx: &EvalContext<'_>) {
        fn eval(
            exprs: &[Option<Expression>],
            bank: &mut RegisterBank,
            ctx: &EvalContext<'_>,
            idx: Option<usize>,
        ) {
            if let Some(i) = idx {
                if let Some(e) = exprs[i].as_ref() {
                    e.evaluate(ctx, bank);
                }
            }
        }

        let exprs = &self.expressions;
        let bank = &mut self.registers;

        eval(exprs, bank, ctx, self.condition.expr);
        eval(exprs, bank, ctx, self.alpha_test.expr);
        for slot in &self.colour {
            eval(exprs, bank, ctx, slot.expr);
        }
        for slot in &self.texgen_params {
            eval(exprs, bank, ctx, slot.expr);
        }
        for t in &self.transforms {
            for slot in &t.slots {
                eval(exprs, bank, ctx, slot.expr);
            }
        }
        for parm in &self.vertex_parms {
            for &i in &parm.exprs {
                eval(exprs, bank, ctx, Some(i));
            }
        }
    }

    // --- visibility & condition -------------------------------------------

    /// Whether the stage should render, from the last evaluation: true for
    /// unconditional stages, the condition register's boolean interpretation
    /// otherwise. A disabled stage is never visible.
    pub fn is_visible(&self) -> bool {
        self.enabled && self.registers.get(self.condition.register) != 0.0
    }

    /// The condition expression, if one is declared.
    pub fn condition_expression(&self) -> Option<&Expression> {
        self.slot_expression(&self.condition)
    }

    /// Replace or clear the condition expression. `None` restores the
    /// unconditional default.
    pub fn set_condition(&mut self, expr: Option<Expression>) {
        let shared = self.register_use_count(self.condition.register) > 1;
        Self::assign_slot(
            &mut self.expressions,
            &mut self.registers,
            &mut self.condition,
            expr,
            RegisterBank::ONE,
            shared,
        );
    }

    /// Parse and install a condition expression. An empty string clears it;
    /// a parse failure is reported and leaves the current expression in place.
    pub fn set_condition_expression_from_string(
        &mut self,
        src: &str,
        tables: &dyn TableSource,
    ) -> MaterialResult<()> {
        match Self::parse_optional(src, tables, "condition")? {
            Parsed::Cleared => self.set_condition(None),
            Parsed::Expr(e) => self.set_condition(Some(e)),
        }
        Ok(())
    }

    /// Whether the stage takes part in rendering at all; an editing-only
    /// override independent of the condition expression.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle the editing-only enable override.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    // --- alpha test -------------------------------------------------------

    /// Whether an alpha-test expression is declared.
    pub fn has_alpha_test(&self) -> bool {
        self.alpha_test.expr.is_some()
    }

    /// The alpha-test threshold from the last evaluation, exactly 0 when no
    /// alpha-test expression is declared. Any clamping to (0, 1] is the
    /// renderer's concern.
    pub fn alpha_test(&self) -> f32 {
        self.registers.get(self.alpha_test.register)
    }

    /// The alpha-test expression, if one is declared.
    pub fn alpha_test_expression(&self) -> Option<&Expression> {
        self.slot_expression(&self.alpha_test)
    }

    /// Replace or clear the alpha-test expression.
    pub fn set_alpha_test(&mut self, expr: Option<Expression>) {
        let shared = self.register_use_count(self.alpha_test.register) > 1;
        Self::assign_slot(
            &mut self.expressions,
            &mut self.registers,
            &mut self.alpha_test,
            expr,
            RegisterBank::ZERO,
            shared,
        );
    }

    /// Parse and install an alpha-test expression, with the same recovery
    /// rules as the condition mutator.
    pub fn set_alpha_test_expression_from_string(
        &mut self,
        src: &str,
        tables: &dyn TableSource,
    ) -> MaterialResult<()> {
        match Self::parse_optional(src, tables, "alpha test")? {
            Parsed::Cleared => self.set_alpha_test(None),
            Parsed::Expr(e) => self.set_alpha_test(Some(e)),
        }
        Ok(())
    }

    // --- colour -----------------------------------------------------------

    /// The stage colour (r, g, b, a) from the last evaluation. Out-of-range
    /// components are passed through; submission-time clamping is the
    /// renderer's concern.
    pub fn colour(&self) -> [f32; 4] {
        [
            self.registers.get(self.colour[0].register),
            self.registers.get(self.colour[1].register),
            self.registers.get(self.colour[2].register),
            self.registers.get(self.colour[3].register),
        ]
    }

    /// The expression bound to a colour component. The RGB/RGBA combos
    /// resolve only when the components actually share one expression.
    pub fn colour_expression(&self, comp: ColourComponent) -> Option<&Expression> {
        let single = |i: usize| self.slot_expression(&self.colour[i]);
        match comp {
            ColourComponent::Red => single(0),
            ColourComponent::Green => single(1),
            ColourComponent::Blue => single(2),
            ColourComponent::Alpha => single(3),
            ColourComponent::Rgb => {
                (self.colour[0].expr == self.colour[1].expr
                    && self.colour[1].expr == self.colour[2].expr)
                    .then(|| single(0))
                    .flatten()
            }
            ColourComponent::Rgba => {
                (self.colour[0].expr == self.colour[1].expr
                    && self.colour[1].expr == self.colour[2].expr
                    && self.colour[2].expr == self.colour[3].expr)
                    .then(|| single(0))
                    .flatten()
            }
        }
    }

    /// Bind an expression to one colour component, or to several at once via
    /// the RGB/RGBA combos. `None` restores the component default (1.0).
    pub fn set_colour_expression(&mut self, comp: ColourComponent, expr: Option<Expression>) {
        match comp {
            ColourComponent::Red => self.assign_colour(0, expr),
            ColourComponent::Green => self.assign_colour(1, expr),
            ColourComponent::Blue => self.assign_colour(2, expr),
            ColourComponent::Alpha => self.assign_colour(3, expr),
            ColourComponent::Rgb => {
                self.assign_colour(0, expr);
                self.alias_colour(0, 1);
                self.alias_colour(0, 2);
            }
            ColourComponent::Rgba => {
                self.assign_colour(0, expr);
                self.alias_colour(0, 1);
                self.alias_colour(0, 2);
                self.alias_colour(0, 3);
            }
        }
    }

    /// Parse and bind a colour component expression, with the usual recovery
    /// rules.
    pub fn set_colour_expression_from_string(
        &mut self,
        comp: ColourComponent,
        src: &str,
        tables: &dyn TableSource,
    ) -> MaterialResult<()> {
        match Self::parse_optional(src, tables, "colour")? {
            Parsed::Cleared => self.set_colour_expression(comp, None),
            Parsed::Expr(e) => self.set_colour_expression(comp, Some(e)),
        }
        Ok(())
    }

    /// Set the colour to constant values, overriding whatever the component
    /// expressions last wrote. Components still bound to a reserved default
    /// register get a private register allocated on the fly.
    pub fn set_colour(&mut self, col: [f32; 4]) {
        for (i, value) in col.into_iter().enumerate() {
            if self.colour[i].register.is_reserved() {
                self.colour[i].register = self.registers.allocate(value);
            } else {
                self.registers.set(self.colour[i].register, value);
            }
        }
    }

    fn assign_colour(&mut self, i: usize, expr: Option<Expression>) {
        let shared = self.register_use_count(self.colour[i].register) > 1;
        Self::assign_slot(
            &mut self.expressions,
            &mut self.registers,
            &mut self.colour[i],
            expr,
            RegisterBank::ONE,
            shared,
        );
    }

    /// Point colour slot `to` at the same expression and register as `from`,
    /// dropping `to`'s previous expression when nothing else references it.
    fn alias_colour(&mut self, from: usize, to: usize) {
        if let Some(old) = self.colour[to].expr {
            if self.colour[from].expr != Some(old) && self.expr_use_count(old) == 1 {
                self.expressions[old] = None;
            }
        }
        self.colour[to] = self.colour[from];
    }

    // --- texgen -----------------------------------------------------------

    /// Texture-coordinate generation mode.
    pub fn texgen_type(&self) -> TexGenType {
        self.texgen
    }

    /// Set the texture-coordinate generation mode.
    pub fn set_texgen_type(&mut self, texgen: TexGenType) {
        self.texgen = texgen;
    }

    /// The value of one of the three texgen parameters (wobblesky only).
    pub fn texgen_param(&self, index: usize) -> f32 {
        self.registers.get(self.texgen_params[index].register)
    }

    /// Bind one of the three texgen parameter expressions.
    pub fn set_texgen_expression(&mut self, index: usize, expr: Expression) {
        assert!(index < 3, "texgen parameter index out of range");
        let shared = self.register_use_count(self.texgen_params[index].register) > 1;
        Self::assign_slot(
            &mut self.expressions,
            &mut self.registers,
            &mut self.texgen_params[index],
            Some(expr),
            RegisterBank::ZERO,
            shared,
        );
    }

    // --- texture transforms -----------------------------------------------

    /// The stage's ordered transform list.
    pub fn transformations(&self) -> &[Transformation] {
        &self.transforms
    }

    /// Append a transform entry; `y` is ignored by single-operand kinds.
    /// Returns the entry's position.
    pub fn add_transformation(
        &mut self,
        kind: TransformKind,
        x: Expression,
        y: Option<Expression>,
    ) -> usize {
        let (dx, dy) = default_transform_registers(kind);
        self.transforms.push(Transformation {
            kind,
            slots: [ExpressionSlot::unset(dx), ExpressionSlot::unset(dy)],
        });
        let index = self.transforms.len() - 1;
        self.assign_transform_operand(index, 0, Some(x), dx);
        self.assign_transform_operand(index, 1, y, dy);
        index
    }

    /// Parse operand strings and append a transform entry.
    pub fn add_transformation_from_strings(
        &mut self,
        kind: TransformKind,
        x: &str,
        y: Option<&str>,
        tables: &dyn TableSource,
    ) -> MaterialResult<usize> {
        let x = Expression::parse(x, tables)?;
        let y = y.map(|src| Expression::parse(src, tables)).transpose()?;
        Ok(self.add_transformation(kind, x, y))
    }

    /// Re-parse an existing transform entry in place. Parse failures leave
    /// the entry untouched; register indices of other entries never change.
    pub fn update_transformation(
        &mut self,
        index: usize,
        kind: TransformKind,
        x: &str,
        y: Option<&str>,
        tables: &dyn TableSource,
    ) -> MaterialResult<()> {
        if index >= self.transforms.len() {
            return Err(MaterialError::validation(format!(
                "no transformation at index {index}"
            )));
        }
        let x = Expression::parse(x, tables)?;
        let y = y.map(|src| Expression::parse(src, tables)).transpose()?;

        let (dx, dy) = default_transform_registers(kind);
        self.transforms[index].kind = kind;
        self.assign_transform_operand(index, 0, Some(x), dx);
        self.assign_transform_operand(index, 1, y, dy);
        Ok(())
    }

    /// Remove a transform entry, releasing its expressions.
    pub fn remove_transformation(&mut self, index: usize) {
        if index >= self.transforms.len() {
            return;
        }
        let (dx, dy) = default_transform_registers(self.transforms[index].kind);
        self.assign_transform_operand(index, 0, None, dx);
        self.assign_transform_operand(index, 1, None, dy);
        self.transforms.remove(index);
    }

    /// Fold the ordered transform list into one affine matrix from the
    /// current register values. Evaluated fresh on every call since the
    /// operands typically depend on time.
    pub fn texture_transform(&self) -> Affine {
        transform::compose(self.transforms.iter().map(|t| {
            (
                t.kind,
                f64::from(self.registers.get(t.slots[0].register)),
                f64::from(self.registers.get(t.slots[1].register)),
            )
        }))
    }

    fn assign_transform_operand(
        &mut self,
        index: usize,
        operand: usize,
        expr: Option<Expression>,
        default_register: RegisterId,
    ) {
        let shared = self.register_use_count(self.transforms[index].slots[operand].register) > 1;
        Self::assign_slot(
            &mut self.expressions,
            &mut self.registers,
            &mut self.transforms[index].slots[operand],
            expr,
            default_register,
            shared,
        );
    }

    // --- blend ------------------------------------------------------------

    /// The declared blend token pair, e.g. `("add", "")` or
    /// `("gl_one", "gl_zero")`.
    pub fn blend_func_strings(&self) -> (&str, &str) {
        (&self.blend_strings.0, &self.blend_strings.1)
    }

    /// Set the declared blend token pair.
    pub fn set_blend_func_strings(&mut self, src: impl Into<String>, dst: impl Into<String>) {
        self.blend_strings = (src.into(), dst.into());
    }

    /// The resolved blend function. Only meaningful for [`StageType::Blend`]
    /// stages; querying an interaction stage is a logic error.
    pub fn blend_func(&self) -> BlendFunc {
        debug_assert!(
            self.stage_type == StageType::Blend,
            "blend func queried on a {:?} stage",
            self.stage_type
        );
        BlendFunc::from_strings(&self.blend_strings.0, &self.blend_strings.1)
    }

    // --- static metadata --------------------------------------------------

    /// The stage (layer) type.
    pub fn stage_type(&self) -> StageType {
        self.stage_type
    }

    /// Change the stage (layer) type.
    pub fn set_stage_type(&mut self, stage_type: StageType) {
        self.stage_type = stage_type;
    }

    /// The stage option flags.
    pub fn flags(&self) -> StageFlags {
        self.flags
    }

    /// Set one or more option flags.
    pub fn set_stage_flag(&mut self, flag: StageFlags) {
        self.flags |= flag;
    }

    /// Clear one or more option flags.
    pub fn clear_stage_flag(&mut self, flag: StageFlags) {
        self.flags &= !flag;
    }

    /// Per-stage clamp behaviour.
    pub fn clamp_type(&self) -> ClampType {
        self.clamp
    }

    /// Set the per-stage clamp behaviour.
    pub fn set_clamp_type(&mut self, clamp: ClampType) {
        self.clamp = clamp;
    }

    /// How the stage's image is produced.
    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    /// Set how the stage's image is produced.
    pub fn set_map_type(&mut self, map_type: MapType) {
        self.map_type = map_type;
    }

    /// Cube map orientation mode.
    pub fn cube_map_mode(&self) -> CubeMapMode {
        self.cube_map_mode
    }

    /// Set the cube map orientation mode.
    pub fn set_cube_map_mode(&mut self, mode: CubeMapMode) {
        self.cube_map_mode = mode;
    }

    /// Vertex colour blend mode.
    pub fn vertex_colour_mode(&self) -> VertexColourMode {
        self.vertex_colour_mode
    }

    /// Set the vertex colour blend mode.
    pub fn set_vertex_colour_mode(&mut self, mode: VertexColourMode) {
        self.vertex_colour_mode = mode;
    }

    /// The image expression string, if a map is declared.
    pub fn map_expression(&self) -> Option<&str> {
        self.map_expression.as_deref()
    }

    /// Set the image expression string; an empty string clears it.
    pub fn set_map_expression_from_string(&mut self, expression: &str) {
        self.map_expression = if expression.is_empty() {
            None
        } else {
            Some(expression.to_owned())
        };
    }

    /// Render target size for mirror/remote render map stages.
    pub fn render_map_size(&self) -> Vec2 {
        self.render_map_size
    }

    /// Set the render target size for mirror/remote render map stages.
    pub fn set_render_map_size(&mut self, size: Vec2) {
        self.render_map_size = size;
    }

    /// Vertex program name, empty when none is declared.
    pub fn vertex_program(&self) -> &str {
        &self.vertex_program
    }

    /// Set the vertex program name.
    pub fn set_vertex_program(&mut self, name: impl Into<String>) {
        self.vertex_program = name.into();
    }

    /// Fragment program name, empty when none is declared.
    pub fn fragment_program(&self) -> &str {
        &self.fragment_program
    }

    /// Set the fragment program name.
    pub fn set_fragment_program(&mut self, name: impl Into<String>) {
        self.fragment_program = name.into();
    }

    /// Stage-specific polygon offset; 0 means the material default applies.
    pub fn private_polygon_offset(&self) -> f32 {
        self.private_polygon_offset
    }

    /// Set the stage-specific polygon offset.
    pub fn set_private_polygon_offset(&mut self, offset: f32) {
        self.private_polygon_offset = offset;
    }

    // --- vertex parms & fragment maps -------------------------------------

    /// Install a `vertexParm` declaration, linking its expressions and
    /// filling missing components with the declaration defaults.
    pub fn add_vertex_parm(&mut self, parm: VertexParm) -> MaterialResult<()> {
        let count = parm.expressions.len();
        if count == 0 || count > 4 {
            return Err(MaterialError::validation(format!(
                "vertexParm {} declares {count} expressions, expected 1 to 4",
                parm.index
            )));
        }

        if self.vertex_parms.len() <= parm.index {
            self.vertex_parms
                .resize(parm.index + 1, VertexParmSlot::unset());
        }
        // A redeclaration releases the expressions the slot owned, so they
        // stop being evaluated.
        for i in std::mem::take(&mut self.vertex_parms[parm.index].exprs) {
            self.expressions[i] = None;
        }

        let mut ids = Vec::with_capacity(count);
        let mut owned = Vec::with_capacity(count);
        for mut expr in parm.expressions {
            let id = expr.link_to_register(&mut self.registers);
            owned.push(self.expressions.len());
            self.expressions.push(Some(expr));
            ids.push(id);
        }

        let quad = match ids.len() {
            1 => [ids[0]; 4],
            2 => [ids[0], ids[1], RegisterBank::ZERO, RegisterBank::ONE],
            3 => [ids[0], ids[1], ids[2], RegisterBank::ONE],
            _ => [ids[0], ids[1], ids[2], ids[3]],
        };

        self.vertex_parms[parm.index] = VertexParmSlot {
            registers: quad,
            exprs: owned,
        };
        Ok(())
    }

    /// Number of declared vertex parm slots.
    pub fn num_vertex_parms(&self) -> usize {
        self.vertex_parms.len()
    }

    /// The four components of a vertex parm from the last evaluation.
    /// Undeclared parms report the fixed default (0, 0, 0, 1).
    pub fn vertex_parm_value(&self, parm: usize) -> [f32; 4] {
        match self.vertex_parms.get(parm) {
            Some(slot) => [
                self.registers.get(slot.registers[0]),
                self.registers.get(slot.registers[1]),
                self.registers.get(slot.registers[2]),
                self.registers.get(slot.registers[3]),
            ],
            None => [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Install a `fragmentMap` declaration at its texture unit index.
    pub fn add_fragment_map(&mut self, map: FragmentMap) {
        if self.fragment_maps.len() <= map.index {
            self.fragment_maps.resize(map.index + 1, FragmentMap::default());
        }
        let index = map.index;
        self.fragment_maps[index] = map;
    }

    /// Number of fragment map texture units.
    pub fn num_fragment_maps(&self) -> usize {
        self.fragment_maps.len()
    }

    /// The fragment map at the given texture unit, if declared.
    pub fn fragment_map(&self, index: usize) -> Option<&FragmentMap> {
        self.fragment_maps.get(index)
    }

    // --- registers --------------------------------------------------------

    /// Read-only view of the stage's register bank, mainly for diagnostics
    /// and tests.
    pub fn registers(&self) -> &RegisterBank {
        &self.registers
    }

    // --- slot plumbing ----------------------------------------------------

    fn slot_expression(&self, slot: &ExpressionSlot) -> Option<&Expression> {
        slot.expr.and_then(|i| self.expressions[i].as_ref())
    }

    /// Bind `new_expr` to a slot, or clear it back to its default register.
    ///
    /// The register index is the stable handle: a replaced expression re-uses
    /// its predecessor's register unless that register is reserved or shared
    /// with another slot, so values held by other code stay valid and no
    /// unrelated slot is ever renumbered.
    fn assign_slot(
        expressions: &mut Vec<Option<Expression>>,
        registers: &mut RegisterBank,
        slot: &mut ExpressionSlot,
        new_expr: Option<Expression>,
        default_register: RegisterId,
        register_shared: bool,
    ) {
        let Some(mut expr) = new_expr else {
            if let Some(i) = slot.expr.take() {
                if !register_shared {
                    expressions[i] = None;
                }
            }
            slot.register = default_register;
            return;
        };

        match slot.expr {
            Some(i) if !slot.register.is_reserved() && !register_shared => {
                expr.link_to_specific_register(slot.register);
                expressions[i] = Some(expr);
            }
            _ => {
                slot.register = expr.link_to_register(registers);
                slot.expr = Some(expressions.len());
                expressions.push(Some(expr));
            }
        }
    }

    /// How many slots currently resolve to the given register.
    fn register_use_count(&self, id: RegisterId) -> usize {
        self.slot_registers().filter(|&r| r == id).count()
    }

    /// How many slots currently reference the given expression index.
    fn expr_use_count(&self, idx: usize) -> usize {
        let slots = self
            .slot_exprs()
            .filter(|&e| e == Some(idx))
            .count();
        let parms = self
            .vertex_parms
            .iter()
            .flat_map(|p| p.exprs.iter())
            .filter(|&&e| e == idx)
            .count();
        slots + parms
    }

    fn slot_registers(&self) -> impl Iterator<Item = RegisterId> + '_ {
        self.all_slots().map(|s| s.register)
    }

    fn slot_exprs(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.all_slots().map(|s| s.expr)
    }

    fn all_slots(&self) -> impl Iterator<Item = &ExpressionSlot> + '_ {
        [&self.condition, &self.alpha_test]
            .into_iter()
            .chain(self.colour.iter())
            .chain(self.texgen_params.iter())
            .chain(self.transforms.iter().flat_map(|t| t.slots.iter()))
    }

    fn parse_optional(
        src: &str,
        tables: &dyn TableSource,
        what: &str,
    ) -> MaterialResult<Parsed> {
        if src.trim().is_empty() {
            return Ok(Parsed::Cleared);
        }
        match Expression::parse(src, tables) {
            Ok(e) => Ok(Parsed::Expr(e)),
            Err(err) => {
                tracing::warn!(expression = src, error = %err, "discarding unparseable {what} expression");
                Err(err)
            }
        }
    }
}

enum Parsed {
    Cleared,
    Expr(Expression),
}

/// Default operand registers for a transform kind: scales default to 1,
/// everything else to 0.
fn default_transform_registers(kind: TransformKind) -> (RegisterId, RegisterId) {
    match kind {
        TransformKind::Scale | TransformKind::CenterScale => (RegisterBank::ONE, RegisterBank::ONE),
        _ => (RegisterBank::ZERO, RegisterBank::ZERO),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/model.rs"]
mod tests;
