//! Statement description to arena lowering.
//!
//! The lowering process:
//! - Gives every loop an explicit step (unit when omitted)
//! - Places each statement list under a `Schedule` node
//! - Turns array accesses into References whose children are the subscripts

use crate::ir::arena::{Payload, Tree};
use crate::ir::ast::{AssignTarget, Expr, Stmt};
use crate::ir::{NodeId, NodeKind};
use log::{trace, warn};

/// Context for lowering, tracking enclosing loop variables.
struct LoweringContext<'a> {
    tree: &'a mut Tree,
    /// Stack of loop variable names, outer-most first
    loop_vars: Vec<String>,
}

impl<'a> LoweringContext<'a> {
    fn new(tree: &'a mut Tree) -> Self {
        Self {
            tree,
            loop_vars: Vec::new(),
        }
    }

    fn is_loop_var(&self, name: &str) -> bool {
        self.loop_vars.iter().any(|v| v == name)
    }

    fn lower_block(&mut self, schedule: NodeId, stmts: &[Stmt]) {
        for stmt in stmts {
            self.lower_stmt(schedule, stmt);
        }
    }

    fn lower_stmt(&mut self, parent: NodeId, stmt: &Stmt) {
        match stmt {
            Stmt::For {
                iterator,
                start,
                end,
                step,
                body,
            } => {
                if self.is_loop_var(iterator) {
                    warn!("loop variable '{}' shadows an enclosing loop", iterator);
                }
                let sym = self.tree.intern(iterator);
                let node = self.tree.add_child(parent, NodeKind::Loop, Payload::Variable(sym));
                self.lower_expr(node, start);
                self.lower_expr(node, end);
                match step {
                    Some(step) => self.lower_expr(node, step),
                    None => self.lower_expr(node, &Expr::int(1)),
                }
                let schedule = self.tree.add_child(node, NodeKind::Schedule, Payload::Empty);
                self.loop_vars.push(iterator.clone());
                self.lower_block(schedule, body);
                self.loop_vars.pop();
                trace!("lowered loop '{}' as {}", iterator, node);
            }

            Stmt::Assignment { target, value } => {
                let node = self.tree.add_child(parent, NodeKind::Assignment, Payload::Empty);
                match target {
                    AssignTarget::Variable(name) => {
                        self.lower_expr(node, &Expr::var(name));
                    }
                    AssignTarget::ArrayAccess { array, indices } => {
                        self.lower_reference(node, array, indices);
                    }
                }
                self.lower_expr(node, value);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let node = self.tree.add_child(parent, NodeKind::Conditional, Payload::Empty);
                self.lower_expr(node, condition);
                let then_schedule = self.tree.add_child(node, NodeKind::Schedule, Payload::Empty);
                self.lower_block(then_schedule, then_branch);
                if let Some(else_branch) = else_branch {
                    let else_schedule = self.tree.add_child(node, NodeKind::Schedule, Payload::Empty);
                    self.lower_block(else_schedule, else_branch);
                }
            }

            Stmt::Kernel { body } => {
                let node = self.tree.add_child(parent, NodeKind::Kernel, Payload::Empty);
                let schedule = self.tree.add_child(node, NodeKind::Schedule, Payload::Empty);
                self.lower_block(schedule, body);
            }

            Stmt::Call { function, args } => {
                self.lower_call(parent, function, args);
            }
        }
    }

    fn lower_expr(&mut self, parent: NodeId, expr: &Expr) {
        match expr {
            Expr::IntLiteral(value) => {
                self.tree
                    .add_child(parent, NodeKind::Literal, Payload::Literal(value.to_string()));
            }
            Expr::RealLiteral(text) => {
                self.tree
                    .add_child(parent, NodeKind::Literal, Payload::Literal(text.clone()));
            }
            Expr::Variable(name) => {
                self.lower_reference(parent, name, &[]);
            }
            Expr::ArrayAccess { array, indices } => {
                self.lower_reference(parent, array, indices);
            }
            Expr::Binary { op, left, right } => {
                let node = self
                    .tree
                    .add_child(parent, NodeKind::Other, Payload::Operator(op.to_string()));
                self.lower_expr(node, left);
                self.lower_expr(node, right);
            }
            Expr::Neg(operand) => {
                let node = self
                    .tree
                    .add_child(parent, NodeKind::Other, Payload::Operator("-".to_string()));
                self.lower_expr(node, operand);
            }
            Expr::Call { function, args } => {
                self.lower_call(parent, function, args);
            }
        }
    }

    fn lower_reference(&mut self, parent: NodeId, name: &str, indices: &[Expr]) {
        let sym = self.tree.intern(name);
        let node = self.tree.add_child(parent, NodeKind::Reference, Payload::Name(sym));
        for index in indices {
            self.lower_expr(node, index);
        }
    }

    fn lower_call(&mut self, parent: NodeId, function: &str, args: &[Expr]) {
        let sym = self.tree.intern(function);
        let node = self.tree.add_child(parent, NodeKind::Other, Payload::Call(sym));
        for arg in args {
            self.lower_expr(node, arg);
        }
    }
}

/// Lower `stmts` into the statement list held by `schedule`.
pub fn lower_block(tree: &mut Tree, schedule: NodeId, stmts: &[Stmt]) {
    let mut ctx = LoweringContext::new(tree);
    ctx.lower_block(schedule, stmts);
}
