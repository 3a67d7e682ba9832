use std::collections::HashMap;
use std::sync::Arc;

/// How a [`TableDef`] resolves indices outside its declared domain, and whether
/// values between samples are interpolated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TableMode {
    /// Map the index into the domain by modulo over the domain length, then
    /// interpolate linearly between neighbouring samples.
    Wrap,
    /// Pin out-of-domain indices to the nearest endpoint, then interpolate.
    Clamp,
    /// Wrap like [`TableMode::Wrap`], but take the sample at or below the index
    /// instead of interpolating.
    Snap,
}

/// One `(input, output)` sample of a lookup table.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TableSample {
    /// Position of the sample inside the table's domain.
    pub input: f32,
    /// Value the table yields at exactly this position.
    pub output: f32,
}

/// A named lookup table declared alongside materials.
///
/// The domain is the closed interval between the first and last sample input;
/// samples are expected in ascending input order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TableDef {
    name: String,
    mode: TableMode,
    samples: Vec<TableSample>,
}

impl TableDef {
    /// Create a table from already-ordered samples.
    pub fn new(name: impl Into<String>, mode: TableMode, samples: Vec<TableSample>) -> Self {
        Self {
            name: name.into(),
            mode,
            samples,
        }
    }

    /// The declaration name expressions reference this table by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table's out-of-domain / interpolation mode.
    pub fn mode(&self) -> TableMode {
        self.mode
    }

    /// The ordered sample list.
    pub fn samples(&self) -> &[TableSample] {
        &self.samples
    }

    /// Resolve a lookup index to an output value.
    ///
    /// Empty tables yield 0, single-sample tables their only output.
    pub fn lookup(&self, index: f32) -> f32 {
        let (first, last) = match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => (first.input, last.input),
            _ => return 0.0,
        };
        if self.samples.len() == 1 {
            return self.samples[0].output;
        }

        let span = last - first;
        let x = match self.mode {
            TableMode::Clamp => index.clamp(first, last),
            TableMode::Wrap | TableMode::Snap => {
                if span > 0.0 {
                    first + (index - first).rem_euclid(span)
                } else {
                    first
                }
            }
        };

        for pair in self.samples.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if x < a.input || x > b.input {
                continue;
            }
            if self.mode == TableMode::Snap {
                // An exactly-sampled index snaps to its own sample, not the
                // previous one.
                return if x >= b.input { b.output } else { a.output };
            }
            let width = b.input - a.input;
            if width <= 0.0 {
                return a.output;
            }
            let fraction = (x - a.input) / width;
            return a.output + (b.output - a.output) * fraction;
        }

        // Unordered sample lists can leave x between no pair; fall back to the
        // nearest endpoint.
        if x <= first {
            self.samples[0].output
        } else {
            self.samples[self.samples.len() - 1].output
        }
    }
}

/// Source of named lookup tables, consulted while parsing expression text.
pub trait TableSource {
    /// Resolve a table by its declaration name.
    fn table(&self, name: &str) -> Option<Arc<TableDef>>;
}

/// Simple owned [`TableSource`] backed by a map, sufficient for parsers and
/// tests that do not have a full declaration manager behind them.
#[derive(Clone, Debug, Default)]
pub struct TableSet {
    tables: HashMap<String, Arc<TableDef>>,
}

impl TableSet {
    /// Create an empty table set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under its declaration name.
    pub fn insert(&mut self, table: TableDef) {
        self.tables.insert(table.name.clone(), Arc::new(table));
    }
}

impl TableSource for TableSet {
    fn table(&self, name: &str) -> Option<Arc<TableDef>> {
        self.tables.get(name).cloned()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/expression/table.rs"]
mod tests;
