//! Declarative description of a routine body.
//!
//! These types describe loop nests, assignments and conditionals so that a
//! [`Tree`](crate::ir::Tree) can be built without a source parser. They
//! preserve the high-level statement structure; [`crate::ir::lower`] turns
//! them into the raw node layout the engine navigates.

use std::fmt;

/// A block of statements.
pub type Block = Vec<Stmt>;

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Counted loop: `do iterator = start, end, step`
    For {
        iterator: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Block,
    },

    /// Assignment: `x = expr` or `a(i, j) = expr`
    Assignment {
        target: AssignTarget,
        value: Expr,
    },

    /// Conditional: `if cond then ... else ... end if`
    If {
        condition: Expr,
        then_branch: Block,
        else_branch: Option<Block>,
    },

    /// Transparent kernel wrapper around a statement list
    Kernel {
        body: Block,
    },

    /// Subroutine call
    Call {
        function: String,
        args: Vec<Expr>,
    },
}

impl Stmt {
    /// A loop `iterator = 1, end` with unit step.
    pub fn for_loop(iterator: &str, end: impl Into<Expr>, body: Block) -> Self {
        Stmt::For {
            iterator: iterator.to_string(),
            start: Expr::int(1),
            end: end.into(),
            step: None,
            body,
        }
    }

    /// Perfectly nested loops over `iterators` (outer-most first) around `body`.
    pub fn loop_nest(iterators: &[&str], end: i64, body: Block) -> Block {
        iterators.iter().rev().fold(body, |inner, iterator| {
            vec![Stmt::for_loop(iterator, Expr::int(end), inner)]
        })
    }

    /// Assignment to an array element.
    pub fn assign(array: &str, indices: &[&str], value: Expr) -> Self {
        Stmt::Assignment {
            target: AssignTarget::ArrayAccess {
                array: array.to_string(),
                indices: indices.iter().map(|i| Expr::var(i)).collect(),
            },
            value,
        }
    }

    /// Assignment to a scalar.
    pub fn assign_scalar(name: &str, value: Expr) -> Self {
        Stmt::Assignment {
            target: AssignTarget::Variable(name.to_string()),
            value,
        }
    }

    /// Conditional without an else branch.
    pub fn if_then(condition: Expr, then_branch: Block) -> Self {
        Stmt::If {
            condition,
            then_branch,
            else_branch: None,
        }
    }

    /// Subroutine call.
    pub fn call(function: &str, args: Vec<Expr>) -> Self {
        Stmt::Call {
            function: function.to_string(),
            args,
        }
    }
}

/// An assignment target.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    /// Simple variable
    Variable(String),
    /// Array element
    ArrayAccess {
        array: String,
        indices: Vec<Expr>,
    },
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal
    IntLiteral(i64),
    /// Real literal, kept as written
    RealLiteral(String),
    /// Variable reference
    Variable(String),
    /// Array element: `a(i, j)`
    ArrayAccess {
        array: String,
        indices: Vec<Expr>,
    },
    /// Binary operation: `left op right`
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Negation: `-operand`
    Neg(Box<Expr>),
    /// Function call: `func(args)`
    Call {
        function: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Expr::IntLiteral(value)
    }

    pub fn real(text: &str) -> Self {
        Expr::RealLiteral(text.to_string())
    }

    pub fn var(name: &str) -> Self {
        Expr::Variable(name.to_string())
    }

    pub fn array(array: &str, indices: Vec<Expr>) -> Self {
        Expr::ArrayAccess {
            array: array.to_string(),
            indices,
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::IntLiteral(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::IntLiteral(value.into())
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::var(name)
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Eq => write!(f, "=="),
            BinaryOp::Ne => write!(f, "/="),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Le => write!(f, "<="),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::Ge => write!(f, ">="),
            BinaryOp::And => write!(f, ".and."),
            BinaryOp::Or => write!(f, ".or."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_nest_shape() {
        let body = vec![Stmt::assign("a", &["i", "j"], Expr::real("0.0"))];
        let nest = Stmt::loop_nest(&["j", "i"], 10, body);
        assert_eq!(nest.len(), 1);
        match &nest[0] {
            Stmt::For { iterator, body, .. } => {
                assert_eq!(iterator, "j");
                match &body[0] {
                    Stmt::For { iterator, body, .. } => {
                        assert_eq!(iterator, "i");
                        assert!(matches!(body[0], Stmt::Assignment { .. }));
                    }
                    other => panic!("expected inner loop, got {:?}", other),
                }
            }
            other => panic!("expected loop, got {:?}", other),
        }
    }
}
