use crate::expression::ast::{BinaryOp, ExprNode, UnaryOp};
use crate::expression::lexer::{Span, Token, TokenKind, lex};
use crate::expression::table::TableSource;
use crate::foundation::error::{MaterialError, MaterialResult};

const MAX_PARM_INDEX: u8 = 11;
const MAX_GLOBAL_INDEX: u8 = 7;

/// Parse expression text into a node graph, resolving table names through
/// `tables` so that undefined tables surface here, at link time, rather than
/// during evaluation.
pub(crate) fn parse_expr(src: &str, tables: &dyn TableSource) -> MaterialResult<ExprNode> {
    let tokens = lex(src)?;
    let mut p = Parser {
        src,
        tokens,
        pos: 0,
        tables,
    };
    let expr = p.parse_conditional()?;
    p.expect(TokenKind::Eof)?;
    Ok(expr)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    tables: &'a dyn TableSource,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn bump(&mut self) -> &Token {
        let t = &self.tokens[self.pos];
        self.pos += 1;
        t
    }

    fn span(&self) -> Span {
        self.peek().span
    }

    fn expect(&mut self, kind: TokenKind) -> MaterialResult<()> {
        if self.peek().kind == kind {
            self.bump();
            Ok(())
        } else {
            Err(MaterialError::expression(
                self.span().start,
                format!("expected {kind:?}, found {}", self.describe(self.span())),
            ))
        }
    }

    /// Quote the source text a span covers; the empty span at the end of the
    /// token stream is the Eof token.
    fn describe(&self, span: Span) -> String {
        if span.start == span.end {
            "end of input".to_owned()
        } else {
            format!("'{}'", &self.src[span.start..span.end])
        }
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn parse_conditional(&mut self) -> MaterialResult<ExprNode> {
        let cond = self.parse_or()?;
        if !self.consume(TokenKind::Question) {
            return Ok(cond);
        }
        let then_branch = self.parse_conditional()?;
        self.expect(TokenKind::Colon)?;
        let else_branch = self.parse_conditional()?;
        Ok(ExprNode::Conditional {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn parse_or(&mut self) -> MaterialResult<ExprNode> {
        let mut e = self.parse_and()?;
        while self.consume(TokenKind::OrOr) {
            let r = self.parse_and()?;
            e = binary(BinaryOp::Or, e, r);
        }
        Ok(e)
    }

    fn parse_and(&mut self) -> MaterialResult<ExprNode> {
        let mut e = self.parse_equality()?;
        while self.consume(TokenKind::AndAnd) {
            let r = self.parse_equality()?;
            e = binary(BinaryOp::And, e, r);
        }
        Ok(e)
    }

    fn parse_equality(&mut self) -> MaterialResult<ExprNode> {
        let mut e = self.parse_comparison()?;
        loop {
            if self.consume(TokenKind::EqEq) {
                let r = self.parse_comparison()?;
                e = binary(BinaryOp::Eq, e, r);
            } else if self.consume(TokenKind::Ne) {
                let r = self.parse_comparison()?;
                e = binary(BinaryOp::Ne, e, r);
            } else {
                break;
            }
        }
        Ok(e)
    }

    fn parse_comparison(&mut self) -> MaterialResult<ExprNode> {
        let mut e = self.parse_term()?;
        loop {
            let op = if self.consume(TokenKind::Lt) {
                Some(BinaryOp::Lt)
            } else if self.consume(TokenKind::Le) {
                Some(BinaryOp::Le)
            } else if self.consume(TokenKind::Gt) {
                Some(BinaryOp::Gt)
            } else if self.consume(TokenKind::Ge) {
                Some(BinaryOp::Ge)
            } else {
                None
            };
            if let Some(op) = op {
                let r = self.parse_term()?;
                e = binary(op, e, r);
            } else {
                break;
            }
        }
        Ok(e)
    }

    fn parse_term(&mut self) -> MaterialResult<ExprNode> {
        let mut e = self.parse_factor()?;
        loop {
            if self.consume(TokenKind::Plus) {
                let r = self.parse_factor()?;
                e = binary(BinaryOp::Add, e, r);
            } else if self.consume(TokenKind::Minus) {
                let r = self.parse_factor()?;
                e = binary(BinaryOp::Sub, e, r);
            } else {
                break;
            }
        }
        Ok(e)
    }

    fn parse_factor(&mut self) -> MaterialResult<ExprNode> {
        let mut e = self.parse_unary()?;
        loop {
            if self.consume(TokenKind::Star) {
                let r = self.parse_unary()?;
                e = binary(BinaryOp::Mul, e, r);
            } else if self.consume(TokenKind::Slash) {
                let r = self.parse_unary()?;
                e = binary(BinaryOp::Div, e, r);
            } else if self.consume(TokenKind::Percent) {
                let r = self.parse_unary()?;
                e = binary(BinaryOp::Mod, e, r);
            } else {
                break;
            }
        }
        Ok(e)
    }

    fn parse_unary(&mut self) -> MaterialResult<ExprNode> {
        // A leading + is ignored, a leading - negates.
        if self.consume(TokenKind::Plus) {
            return self.parse_unary();
        }
        if self.consume(TokenKind::Minus) {
            let e = self.parse_unary()?;
            return Ok(ExprNode::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(e),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> MaterialResult<ExprNode> {
        let t = self.bump().clone();
        match t.kind {
            TokenKind::Number(v) => Ok(ExprNode::Constant(v)),
            TokenKind::Ident(s) => self.resolve_ident(&s, t.span.start),
            TokenKind::LParen => {
                let e = self.parse_conditional()?;
                self.expect(TokenKind::RParen)?;
                Ok(e)
            }
            _ => Err(MaterialError::expression(
                t.span.start,
                format!("unexpected {}", self.describe(t.span)),
            )),
        }
    }

    fn resolve_ident(&mut self, name: &str, offset: usize) -> MaterialResult<ExprNode> {
        let lower = name.to_ascii_lowercase();

        if lower == "time" {
            return Ok(ExprNode::Time);
        }
        if let Some(digits) = lower.strip_prefix("parm") {
            let num = parse_index(digits, MAX_PARM_INDEX)
                .ok_or_else(|| MaterialError::link(format!("shaderparm '{name}' out of bounds")))?;
            return Ok(ExprNode::Parm(num));
        }
        if let Some(digits) = lower.strip_prefix("global") {
            let num = parse_index(digits, MAX_GLOBAL_INDEX).ok_or_else(|| {
                MaterialError::link(format!("global shaderparm '{name}' out of bounds"))
            })?;
            return Ok(ExprNode::Global(num));
        }
        // Sound amplitude has no backing in this engine; declarations using it
        // evaluate to silence.
        if lower == "sound" {
            return Ok(ExprNode::Constant(0.0));
        }
        // Fragment program support is assumed to be present.
        if lower == "fragmentprograms" {
            return Ok(ExprNode::Constant(1.0));
        }

        if let Some(table) = self.tables.table(name) {
            self.expect(TokenKind::LBracket).map_err(|_| {
                MaterialError::expression(offset, format!("expected '[' after table '{name}'"))
            })?;
            let index = self.parse_conditional()?;
            self.expect(TokenKind::RBracket)?;
            return Ok(ExprNode::TableLookup {
                table,
                index: Box::new(index),
            });
        }

        Err(MaterialError::link(format!(
            "'{name}' is neither a keyword nor a known table"
        )))
    }
}

fn binary(op: BinaryOp, left: ExprNode, right: ExprNode) -> ExprNode {
    ExprNode::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn parse_index(digits: &str, max: u8) -> Option<u8> {
    let num: u8 = digits.parse().ok()?;
    (num <= max).then_some(num)
}

#[cfg(test)]
#[path = "../../tests/unit/expression/parser.rs"]
mod tests;
