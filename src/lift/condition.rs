// Operator-precedence parser for `test` / `[` argument lists.
//
//   or      := and ( "-o" and )*
//   and     := unary ( "-a" unary )*
//   unary   := "!" unary | primary
//   primary := "(" or ")" | word BINOP word | UNOP word | word

use crate::lift::error::{LiftResult, UnhandledTranslation};
use crate::lift::expand::Template;
use crate::lift::value::translate_value;
use crate::target::ast::{CompareOp, Expr, Predicate};
use std::collections::BTreeSet;

fn binary_op(op: &str) -> Option<(CompareOp, bool)> {
    let op = match op {
        "=" | "==" => (CompareOp::Eq, false),
        "!=" => (CompareOp::Ne, false),
        "-eq" => (CompareOp::Eq, true),
        "-ne" => (CompareOp::Ne, true),
        "-lt" => (CompareOp::Lt, true),
        "-le" => (CompareOp::Le, true),
        "-gt" => (CompareOp::Gt, true),
        "-ge" => (CompareOp::Ge, true),
        _ => return None,
    };
    Some(op)
}

fn unary_op(op: &str) -> Option<Predicate> {
    let pred = match op {
        "-n" => Predicate::NonEmpty,
        "-z" => Predicate::Empty,
        "-d" => Predicate::IsDir,
        "-f" => Predicate::IsFile,
        "-e" => Predicate::Exists,
        "-s" => Predicate::NonEmptyFile,
        "-x" => Predicate::Executable,
        "-h" | "-L" => Predicate::Symlink,
        _ => return None,
    };
    Some(pred)
}

struct ConditionParser<'a> {
    tokens: &'a [Template],
    pos: usize,
    variables: &'a BTreeSet<String>,
    captures: &'a [Expr],
}

impl<'a> ConditionParser<'a> {
    fn remaining(&self) -> usize {
        self.tokens.len() - self.pos
    }

    // Operators only count when the token is plain literal text.
    fn op_at(&self, i: usize) -> Option<String> {
        let tok = self.tokens.get(i)?;
        if tok.is_literal() { Some(tok.text()) } else { None }
    }

    fn is_op(&self, i: usize, op: &str) -> bool {
        self.op_at(i).as_deref() == Some(op)
    }

    fn binary_at(&self, i: usize) -> Option<(CompareOp, bool)> {
        self.op_at(i).and_then(|op| binary_op(&op))
    }

    fn operand(&mut self) -> LiftResult<Expr> {
        let tok = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| UnhandledTranslation::new("test expression", "missing operand"))?;
        self.pos += 1;
        translate_value(tok, self.variables, self.captures)
    }

    fn parse_or(&mut self) -> LiftResult<Expr> {
        let mut left = self.parse_and()?;
        while self.is_op(self.pos, "-o") {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> LiftResult<Expr> {
        let mut left = self.parse_unary()?;
        while self.is_op(self.pos, "-a") {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> LiftResult<Expr> {
        // "! = x" compares the string "!", it does not negate
        let is_compare = self.remaining() >= 3 && self.binary_at(self.pos + 1).is_some();
        if self.is_op(self.pos, "!") && self.remaining() >= 2 && !is_compare {
            self.pos += 1;
            return Ok(self.parse_unary()?.negate());
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> LiftResult<Expr> {
        if self.remaining() == 0 {
            return Err(UnhandledTranslation::new("test expression", "expression expected"));
        }

        if self.remaining() >= 3 {
            if let Some((op, numeric)) = self.binary_at(self.pos + 1) {
                let left = self.operand()?;
                self.pos += 1;
                let right = self.operand()?;
                return Ok(Expr::Compare {
                    op,
                    numeric,
                    left: Box::new(left),
                    right: Box::new(right),
                });
            }
        }

        if self.is_op(self.pos, "(") && self.remaining() >= 2 {
            self.pos += 1;
            let inner = self.parse_or()?;
            if !self.is_op(self.pos, ")") {
                return Err(UnhandledTranslation::new("test expression", "missing ')'"));
            }
            self.pos += 1;
            return Ok(inner);
        }

        if self.remaining() >= 2 {
            if let Some(predicate) = self.op_at(self.pos).and_then(|op| unary_op(&op)) {
                self.pos += 1;
                let operand = self.operand()?;
                return Ok(Expr::Test { predicate, operand: Box::new(operand) });
            }
        }

        let operand = self.operand()?;
        Ok(Expr::Test {
            predicate: Predicate::NonEmpty,
            operand: Box::new(operand),
        })
    }
}

/// Translates the arguments of one `test` invocation into a boolean
/// expression that is true when the shell test would succeed.
pub fn parse_condition(tokens: &[Template], variables: &BTreeSet<String>, captures: &[Expr]) -> LiftResult<Expr> {
    if tokens.is_empty() {
        // `test` with no arguments fails
        return Ok(Expr::Test {
            predicate: Predicate::NonEmpty,
            operand: Box::new(Expr::str("")),
        });
    }

    let mut parser = ConditionParser { tokens, pos: 0, variables, captures };
    let expr = parser.parse_or()?;
    if parser.pos < tokens.len() {
        let rest = tokens[parser.pos].render();
        return Err(UnhandledTranslation::new("test expression", format!("unexpected '{}'", rest)));
    }
    Ok(expr)
}
