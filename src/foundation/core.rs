pub use kurbo::{Affine, Point, Vec2};

/// Engine time in integer milliseconds.
///
/// Material declarations use the `time` keyword in seconds; the conversion
/// happens at evaluation, so callers keep passing the engine's millisecond
/// counter around without drift.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TimeMs(pub u64);

impl TimeMs {
    /// The time value as seconds, the unit expression text operates in.
    pub fn secs(self) -> f32 {
        self.0 as f32 / 1000.0
    }
}
