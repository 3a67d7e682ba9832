/// Opaque index of a register inside a [`RegisterBank`].
///
/// Ids are only ever produced by the bank itself (allocation during expression
/// linking), so an out-of-bounds access is a programming error and panics in the
/// central accessor rather than being a recoverable condition.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct RegisterId(pub(crate) u32);

impl RegisterId {
    /// Raw index into the bank, mainly useful for diagnostics.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this id addresses one of the reserved constant registers.
    pub fn is_reserved(self) -> bool {
        (self.0 as usize) < RegisterBank::NUM_RESERVED
    }
}

/// Growable arena of scalar registers that expression results are written into.
///
/// The first two registers are the universal constants 0.0 and 1.0; unset stage
/// properties point at those, and evaluation never writes to them.
#[derive(Clone, Debug)]
pub struct RegisterBank {
    values: Vec<f32>,
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBank {
    /// The reserved register holding the constant 0.0.
    pub const ZERO: RegisterId = RegisterId(0);
    /// The reserved register holding the constant 1.0.
    pub const ONE: RegisterId = RegisterId(1);

    pub(crate) const NUM_RESERVED: usize = 2;

    /// Create a bank containing only the reserved constant registers.
    pub fn new() -> Self {
        Self {
            values: vec![0.0, 1.0],
        }
    }

    /// Append a new register initialised with `initial` and return its id.
    pub fn allocate(&mut self, initial: f32) -> RegisterId {
        self.values.push(initial);
        RegisterId((self.values.len() - 1) as u32)
    }

    /// Read a register value. Panics on an id from a foreign bank.
    pub fn get(&self, id: RegisterId) -> f32 {
        self.values[id.index()]
    }

    /// Overwrite a register value. The reserved constants stay immutable.
    pub fn set(&mut self, id: RegisterId, value: f32) {
        debug_assert!(!id.is_reserved(), "reserved registers must not be written");
        self.values[id.index()] = value;
    }

    /// Number of registers, reserved constants included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True only for a bank stripped of its reserved registers, i.e. never.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/registers.rs"]
mod tests;
