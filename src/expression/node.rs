use std::sync::Arc;

use crate::expression::ast::{BinaryOp, ExprNode, UnaryOp};
use crate::expression::parser::parse_expr;
use crate::expression::table::{TableDef, TableSource};
use crate::foundation::core::TimeMs;
use crate::foundation::error::MaterialResult;
use crate::foundation::registers::{RegisterBank, RegisterId};

/// Source of per-entity shader parameters `parm0`..`parm11`.
///
/// Entities are the only state that crosses into evaluation from outside the
/// expression graph; values are re-resolved on every call so one material can
/// serve many entities without caching hazards.
pub trait EntityParms {
    /// Current value of the given parameter index, 0 through 11.
    fn shader_parm(&self, parm: usize) -> f32;
}

/// Per-call evaluation inputs: the frame time and an optional entity.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    /// Engine time for this evaluation.
    pub time: TimeMs,
    /// Entity whose parameters `parmN` expressions resolve against, if any.
    pub entity: Option<&'a dyn EntityParms>,
}

impl<'a> EvalContext<'a> {
    /// Context without an entity; `parm0`..`parm3` fall back to 1, the rest to 0.
    pub fn new(time: TimeMs) -> Self {
        Self { time, entity: None }
    }

    /// Context resolving `parmN` against `entity`.
    pub fn with_entity(time: TimeMs, entity: &'a dyn EntityParms) -> Self {
        Self {
            time,
            entity: Some(entity),
        }
    }
}

/// A compiled scalar expression plus its link into a register bank.
///
/// Linking allocates the target register that [`Expression::evaluate`] writes
/// into; the id stays stable for the expression's lifetime, which is what lets
/// stage properties hold register ids as handles while the bound expression is
/// replaced by editing tools.
#[derive(Clone, Debug)]
pub struct Expression {
    root: ExprNode,
    source: String,
    register: Option<RegisterId>,
}

impl Expression {
    /// Compile expression text, resolving table names through `tables`.
    pub fn parse(src: &str, tables: &dyn TableSource) -> MaterialResult<Self> {
        let trimmed = src.trim();
        let root = parse_expr(trimmed, tables)?;
        Ok(Self {
            root,
            source: trimmed.to_owned(),
            register: None,
        })
    }

    /// A constant-valued expression.
    pub fn constant(value: f32) -> Self {
        Self {
            root: ExprNode::Constant(value),
            source: format!("{value}"),
            register: None,
        }
    }

    /// An expression reading another register of the same bank.
    pub fn register_ref(id: RegisterId) -> Self {
        Self {
            root: ExprNode::RegisterRef(id),
            source: format!("reg{}", id.index()),
            register: None,
        }
    }

    /// The sum of two expressions.
    pub fn add(a: Self, b: Self) -> Self {
        Self::binary(BinaryOp::Add, "+", a, b)
    }

    /// The product of two expressions.
    pub fn multiply(a: Self, b: Self) -> Self {
        Self::binary(BinaryOp::Mul, "*", a, b)
    }

    /// A lookup of `index` in `table`.
    pub fn table_lookup(table: Arc<TableDef>, index: Self) -> Self {
        let source = format!("{}[{}]", table.name(), index.source);
        Self {
            root: ExprNode::TableLookup {
                table,
                index: Box::new(index.root),
            },
            source,
            register: None,
        }
    }

    fn binary(op: BinaryOp, symbol: &str, a: Self, b: Self) -> Self {
        Self {
            source: format!("{} {symbol} {}", a.source, b.source),
            root: ExprNode::Binary {
                op,
                left: Box::new(a.root),
                right: Box::new(b.root),
            },
            register: None,
        }
    }

    /// Allocate a fresh target register in `bank` and bind this expression to it.
    pub fn link_to_register(&mut self, bank: &mut RegisterBank) -> RegisterId {
        let id = bank.allocate(0.0);
        self.register = Some(id);
        id
    }

    /// Bind this expression to an existing register, re-using a replaced
    /// expression's slot so handles held elsewhere stay valid.
    pub fn link_to_specific_register(&mut self, id: RegisterId) {
        self.register = Some(id);
    }

    /// Drop the register binding and return the index it had, if any.
    pub fn unlink_from_registers(&mut self) -> Option<RegisterId> {
        self.register.take()
    }

    /// Whether this expression has been linked to a register.
    pub fn is_linked(&self) -> bool {
        self.register.is_some()
    }

    /// The linked target register, if any.
    pub fn register(&self) -> Option<RegisterId> {
        self.register
    }

    /// Recompute the expression, write the result into the linked register and
    /// return it. Total: degenerate values (inf/NaN) are written as-is.
    pub fn evaluate(&self, ctx: &EvalContext<'_>, bank: &mut RegisterBank) -> f32 {
        let value = self.root.value_at(ctx, bank);
        if let Some(id) = self.register {
            bank.set(id, value);
        }
        value
    }

    /// The last-evaluated value, read from the linked register without
    /// recomputation. Unlinked expressions report 0.
    pub fn value(&self, bank: &RegisterBank) -> f32 {
        match self.register {
            Some(id) => bank.get(id),
            None => 0.0,
        }
    }

    /// Round-trippable source text of this expression.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl ExprNode {
    fn value_at(&self, ctx: &EvalContext<'_>, bank: &RegisterBank) -> f32 {
        match self {
            Self::Constant(v) => *v,
            Self::Time => ctx.time.secs(),
            Self::Parm(n) => match ctx.entity {
                Some(entity) => entity.shader_parm(*n as usize),
                // The RGBA colour parms 0-3 default to 1, the rest to 0.
                None => {
                    if *n < 4 {
                        1.0
                    } else {
                        0.0
                    }
                }
            },
            Self::Global(_) => 0.0,
            Self::RegisterRef(id) => bank.get(*id),
            Self::Unary { op, operand } => match op {
                UnaryOp::Neg => -operand.value_at(ctx, bank),
            },
            Self::Binary { op, left, right } => {
                let a = left.value_at(ctx, bank);
                let b = right.value_at(ctx, bank);
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Mod => a % b,
                    BinaryOp::Lt => bool_value(a < b),
                    BinaryOp::Le => bool_value(a <= b),
                    BinaryOp::Gt => bool_value(a > b),
                    BinaryOp::Ge => bool_value(a >= b),
                    BinaryOp::Eq => bool_value(a == b),
                    BinaryOp::Ne => bool_value(a != b),
                    BinaryOp::And => bool_value(a != 0.0 && b != 0.0),
                    BinaryOp::Or => bool_value(a != 0.0 || b != 0.0),
                }
            }
            Self::TableLookup { table, index } => table.lookup(index.value_at(ctx, bank)),
            // Only the selected branch is evaluated.
            Self::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                if cond.value_at(ctx, bank) != 0.0 {
                    then_branch.value_at(ctx, bank)
                } else {
                    else_branch.value_at(ctx, bank)
                }
            }
        }
    }
}

fn bool_value(b: bool) -> f32 {
    if b { 1.0 } else { 0.0 }
}

#[cfg(test)]
#[path = "../../tests/unit/expression/node.rs"]
mod tests;
