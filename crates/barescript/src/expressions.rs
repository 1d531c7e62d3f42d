//! The expression AST shared by the script runtime and the standalone
//! expression evaluator.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Binary operators, in source form.
///
/// Uses strum derives so the parser can go from token text to operator and
/// diagnostics can render the source form back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[strum(serialize = "**")]
    Exponent,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "<<")]
    ShiftLeft,
    #[strum(serialize = ">>")]
    ShiftRight,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "^")]
    BitXor,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
}

impl BinaryOperator {
    /// The set of operators that bind more loosely than `self`.
    ///
    /// The expression parser builds a left-leaning chain and, on seeing a new
    /// operator, descends the right spine of the left operand while the spine
    /// node's operator is weaker, splicing the new node where precedence
    /// matches. Operators are not weaker than themselves, which makes every
    /// level left-associative.
    pub(crate) fn is_weaker(self, other: Self) -> bool {
        use BinaryOperator as Op;
        let level = |op: Self| match op {
            Op::Or => 0,
            Op::And => 1,
            Op::BitOr => 2,
            Op::BitXor => 3,
            Op::BitAnd => 4,
            Op::Equal | Op::NotEqual => 5,
            Op::LessEqual | Op::Less | Op::GreaterEqual | Op::Greater => 6,
            Op::ShiftLeft | Op::ShiftRight => 7,
            Op::Add | Op::Subtract => 8,
            Op::Multiply | Op::Divide | Op::Modulo => 9,
            Op::Exponent => 10,
        };
        level(self) < level(other)
    }
}

/// Unary prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum UnaryOperator {
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "-")]
    Negate,
    #[strum(serialize = "~")]
    BitNot,
}

/// A parsed expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// String literal, escapes already resolved.
    String(String),
    /// Variable reference. The names `null`, `true`, and `false` are
    /// keywords resolved by the evaluator, not lookups.
    Variable(String),
    /// Function call with positional argument expressions.
    Function(FunctionCall),
    /// Binary operation.
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary prefix operation.
    Unary { op: UnaryOperator, expr: Box<Expr> },
    /// Parenthesized subexpression.
    Group(Box<Expr>),
}

/// A function call expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
}

impl Expr {
    /// Visits every function call node in the tree, outermost first.
    pub(crate) fn visit_calls(&self, visit: &mut impl FnMut(&FunctionCall)) {
        match self {
            Self::Number(_) | Self::String(_) | Self::Variable(_) => {}
            Self::Function(call) => {
                visit(call);
                for arg in &call.args {
                    arg.visit_calls(visit);
                }
            }
            Self::Binary { left, right, .. } => {
                left.visit_calls(visit);
                right.visit_calls(visit);
            }
            Self::Unary { expr, .. } => expr.visit_calls(visit),
            Self::Group(expr) => expr.visit_calls(visit),
        }
    }

    /// Visits every variable reference in the tree.
    pub(crate) fn visit_variables(&self, visit: &mut impl FnMut(&str)) {
        match self {
            Self::Number(_) | Self::String(_) => {}
            Self::Variable(name) => visit(name),
            Self::Function(call) => {
                for arg in &call.args {
                    arg.visit_variables(visit);
                }
            }
            Self::Binary { left, right, .. } => {
                left.visit_variables(visit);
                right.visit_variables(visit);
            }
            Self::Unary { expr, .. } => expr.visit_variables(visit),
            Self::Group(expr) => expr.visit_variables(visit),
        }
    }

    /// True when the tree contains at least one function call.
    ///
    /// Expression statements without a call cannot have side effects under
    /// this language's call model, which drives the pointless-statement lint.
    pub(crate) fn has_call(&self) -> bool {
        let mut found = false;
        self.visit_calls(&mut |_| found = true);
        found
    }
}
