use std::sync::Arc;

use crate::expression::table::TableDef;
use crate::foundation::registers::RegisterId;

/// Closed set of expression node kinds. Evaluation is an exhaustive match over
/// the tag, so adding an operator kind is a compile-checked change.
#[derive(Clone, Debug)]
pub(crate) enum ExprNode {
    Constant(f32),
    /// The `time` keyword, in seconds.
    Time,
    /// Per-entity shader parameter `parm0`..`parm11`.
    Parm(u8),
    /// Global parameter `global0`..`global7`. Always 0 in this engine, kept so
    /// declarations referencing globals still parse and evaluate.
    Global(u8),
    /// Reads another register of the same bank.
    RegisterRef(RegisterId),
    Unary {
        op: UnaryOp,
        operand: Box<ExprNode>,
    },
    Binary {
        op: BinaryOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    TableLookup {
        table: Arc<TableDef>,
        index: Box<ExprNode>,
    },
    /// Ternary; only the selected branch is evaluated.
    Conditional {
        cond: Box<ExprNode>,
        then_branch: Box<ExprNode>,
        else_branch: Box<ExprNode>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}
