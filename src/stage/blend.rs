/// OpenGL-style blend factor tokens a stage's blend function resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BlendFactor {
    /// `gl_zero`
    Zero,
    /// `gl_one`
    One,
    /// `gl_src_color`
    SrcColor,
    /// `gl_one_minus_src_color`
    OneMinusSrcColor,
    /// `gl_src_alpha`
    SrcAlpha,
    /// `gl_one_minus_src_alpha`
    OneMinusSrcAlpha,
    /// `gl_dst_color`
    DstColor,
    /// `gl_one_minus_dst_color`
    OneMinusDstColor,
    /// `gl_dst_alpha`
    DstAlpha,
    /// `gl_one_minus_dst_alpha`
    OneMinusDstAlpha,
    /// `gl_src_alpha_saturate`
    SrcAlphaSaturate,
}

impl BlendFactor {
    /// Map a declared `gl_*` token to its factor. Unknown tokens resolve to
    /// [`BlendFactor::Zero`], matching the legacy engine's tolerance for typos
    /// in material files.
    pub fn from_gl_token(token: &str) -> Self {
        match token {
            "gl_zero" => Self::Zero,
            "gl_one" => Self::One,
            "gl_src_color" => Self::SrcColor,
            "gl_one_minus_src_color" => Self::OneMinusSrcColor,
            "gl_src_alpha" => Self::SrcAlpha,
            "gl_one_minus_src_alpha" => Self::OneMinusSrcAlpha,
            "gl_dst_color" => Self::DstColor,
            "gl_one_minus_dst_color" => Self::OneMinusDstColor,
            "gl_dst_alpha" => Self::DstAlpha,
            "gl_one_minus_dst_alpha" => Self::OneMinusDstAlpha,
            "gl_src_alpha_saturate" => Self::SrcAlphaSaturate,
            _ => Self::Zero,
        }
    }
}

/// Resolved source/destination blend factor pair of a blend stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlendFunc {
    /// Source factor.
    pub src: BlendFactor,
    /// Destination factor.
    pub dst: BlendFactor,
}

impl BlendFunc {
    /// Resolve a declared string pair into blend factors.
    ///
    /// The shorthand forms `add`, `filter`/`modulate`, `blend` and `none` carry
    /// fixed factor pairs; everything else is taken as two `gl_*` tokens.
    pub fn from_strings(src: &str, dst: &str) -> Self {
        match src {
            "add" => Self {
                src: BlendFactor::One,
                dst: BlendFactor::One,
            },
            "filter" | "modulate" => Self {
                src: BlendFactor::DstColor,
                dst: BlendFactor::Zero,
            },
            "blend" => Self {
                src: BlendFactor::SrcAlpha,
                dst: BlendFactor::OneMinusSrcAlpha,
            },
            "none" => Self {
                src: BlendFactor::Zero,
                dst: BlendFactor::One,
            },
            _ => Self {
                src: BlendFactor::from_gl_token(src),
                dst: BlendFactor::from_gl_token(dst),
            },
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/blend.rs"]
mod tests;
