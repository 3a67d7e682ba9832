use kurbo::{Affine, Vec2};

/// Kinds of texture-coordinate transforms a stage can declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TransformKind {
    /// `translate x, y`
    Translate,
    /// `scale x, y` about the texture origin corner.
    Scale,
    /// `centerScale x, y` about the texture centre (0.5, 0.5).
    CenterScale,
    /// `shear x, y`
    Shear,
    /// `rotate degrees`
    Rotate,
}

impl TransformKind {
    /// Number of expressions this transform kind declares (1 or 2).
    pub fn arity(self) -> usize {
        match self {
            Self::Rotate => 1,
            _ => 2,
        }
    }
}

/// The elementary matrix for one transform entry with resolved operands.
/// Rotation operands are in degrees.
pub(crate) fn elementary(kind: TransformKind, x: f64, y: f64) -> Affine {
    match kind {
        TransformKind::Translate => Affine::translate(Vec2::new(x, y)),
        TransformKind::Scale => Affine::scale_non_uniform(x, y),
        // Historically its own transform type: translate to the texture
        // centre, scale, translate back.
        TransformKind::CenterScale => {
            Affine::translate(Vec2::new(0.5, 0.5))
                * Affine::scale_non_uniform(x, y)
                * Affine::translate(Vec2::new(-0.5, -0.5))
        }
        TransformKind::Shear => Affine::new([1.0, y, x, 1.0, 0.0, 0.0]),
        TransformKind::Rotate => Affine::rotate(x.to_radians()),
    }
}

/// Fold transform entries into one affine matrix.
///
/// Each entry is left-multiplied onto the accumulator, so the first-declared
/// transform applies first to a texture coordinate, consistent with the
/// declaration's reading order.
pub(crate) fn compose(entries: impl IntoIterator<Item = (TransformKind, f64, f64)>) -> Affine {
    let mut acc = Affine::IDENTITY;
    for (kind, x, y) in entries {
        acc = elementary(kind, x, y) * acc;
    }
    acc
}

#[cfg(test)]
#[path = "../../tests/unit/stage/transform.rs"]
mod tests;
