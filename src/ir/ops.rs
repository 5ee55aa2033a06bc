//! IR operator definitions

use serde::{Deserialize, Serialize};

/// Binary operators of the target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TsBinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// `===`
    Eq,
    /// `!==`
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Instanceof,
}

impl TsBinOp {
    pub fn text(self) -> &'static str {
        match self {
            TsBinOp::Add => "+",
            TsBinOp::Sub => "-",
            TsBinOp::Mul => "*",
            TsBinOp::Div => "/",
            TsBinOp::Mod => "%",
            TsBinOp::Eq => "===",
            TsBinOp::NotEq => "!==",
            TsBinOp::Lt => "<",
            TsBinOp::Gt => ">",
            TsBinOp::LtEq => "<=",
            TsBinOp::GtEq => ">=",
            TsBinOp::And => "&&",
            TsBinOp::Or => "||",
            TsBinOp::BitAnd => "&",
            TsBinOp::BitOr => "|",
            TsBinOp::BitXor => "^",
            TsBinOp::Shl => "<<",
            TsBinOp::Shr => ">>",
            TsBinOp::Instanceof => "instanceof",
        }
    }

    /// Precedence for parenthesization when flattening; larger binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            TsBinOp::Or => 1,
            TsBinOp::And => 2,
            TsBinOp::BitOr => 3,
            TsBinOp::BitXor => 4,
            TsBinOp::BitAnd => 5,
            TsBinOp::Eq | TsBinOp::NotEq => 6,
            TsBinOp::Lt | TsBinOp::Gt | TsBinOp::LtEq | TsBinOp::GtEq | TsBinOp::Instanceof => 7,
            TsBinOp::Shl | TsBinOp::Shr => 8,
            TsBinOp::Add | TsBinOp::Sub => 9,
            TsBinOp::Mul | TsBinOp::Div | TsBinOp::Mod => 10,
        }
    }
}

/// Unary operators of the target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TsUnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

impl TsUnaryOp {
    pub fn text(self) -> &'static str {
        match self {
            TsUnaryOp::Neg => "-",
            TsUnaryOp::Plus => "+",
            TsUnaryOp::Not => "!",
            TsUnaryOp::BitNot => "~",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_ordering() {
        assert!(TsBinOp::Mul.precedence() > TsBinOp::Add.precedence());
        assert!(TsBinOp::Add.precedence() > TsBinOp::Eq.precedence());
        assert!(TsBinOp::And.precedence() > TsBinOp::Or.precedence());
    }

    #[test]
    fn test_strict_equality_spelling() {
        assert_eq!(TsBinOp::Eq.text(), "===");
        assert_eq!(TsBinOp::NotEq.text(), "!==");
    }
}
