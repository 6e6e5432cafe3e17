//! Domain elements: the facts an analysis tracks per program point.
//!
//! A domain is enumerated once per function, in first-encountered order,
//! before the fixed-point loop starts; its order never changes afterwards.
//! Two element kinds exist: `Expression` (for available-expressions style
//! must-analyses) and `Variable` (for liveness and constant propagation).

use std::hash::Hash;

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;

use crate::ir::{ArgId, BinaryOp, Function, InstId, InstKind, Operand};

/// Index of a domain element within its function's domain vector.
pub type DomainId = usize;

/// A fact type the framework can attach lattice values to.
pub trait DomainElement: Clone + Eq + Hash + Sized {
    /// Scan `function` once, producing the ordered domain. Duplicates (by
    /// structural equality) are not re-inserted.
    fn collect(function: &Function) -> Domain<Self>;

    /// Whether this element mentions `operand`.
    fn references(&self, operand: Operand) -> bool;

    /// Substitute `from` with `to` in this element's operands. Used by
    /// passes that rewrite the program after consuming analysis results.
    fn replace(&self, from: Operand, to: Operand) -> Self;

    /// Textual form, using `function` to name operands.
    fn render(&self, function: &Function) -> String;
}

/// The ordered set of domain elements for one analysis run.
///
/// Doubles as the id map (`id_of`) and the ordered domain vector
/// (`element`), which are the same structure viewed from both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain<E: Eq + Hash> {
    elements: IndexSet<E, FxBuildHasher>,
}

impl<E: DomainElement> Domain<E> {
    fn new() -> Self {
        Domain {
            elements: IndexSet::default(),
        }
    }

    fn insert(&mut self, element: E) {
        self.elements.insert(element);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn id_of(&self, element: &E) -> Option<DomainId> {
        self.elements.get_index_of(element)
    }

    pub fn element(&self, id: DomainId) -> &E {
        &self.elements[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = (DomainId, &E)> {
        self.elements.iter().enumerate()
    }
}

/// A computed expression: opcode plus operand pair.
///
/// Commutative expressions are canonicalised at construction (operands
/// sorted), so the derived equality and hash treat `a + b` and `b + a` as
/// the same expression while keeping `a - b` and `b - a` distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Expression {
    pub op: BinaryOp,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Expression {
    pub fn new(op: BinaryOp, lhs: Operand, rhs: Operand) -> Self {
        if op.is_commutative() && rhs < lhs {
            Expression {
                op,
                lhs: rhs,
                rhs: lhs,
            }
        } else {
            Expression { op, lhs, rhs }
        }
    }
}

impl DomainElement for Expression {
    fn collect(function: &Function) -> Domain<Self> {
        let mut domain = Domain::new();
        for id in function.inst_ids() {
            if let InstKind::Binary { op, lhs, rhs } = function.inst(id).kind {
                domain.insert(Expression::new(op, lhs, rhs));
            }
        }
        domain
    }

    fn references(&self, operand: Operand) -> bool {
        self.lhs == operand || self.rhs == operand
    }

    fn replace(&self, from: Operand, to: Operand) -> Self {
        let swap = |op: Operand| if op == from { to } else { op };
        Expression::new(self.op, swap(self.lhs), swap(self.rhs))
    }

    fn render(&self, function: &Function) -> String {
        format!(
            "[{} {}, {}]",
            self.op.name(),
            function.operand_name(self.lhs),
            function.operand_name(self.rhs)
        )
    }
}

/// A value the program computes or receives: an instruction result or a
/// function argument. Equality is reference identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    Inst(InstId),
    Arg(ArgId),
}

impl Variable {
    pub fn from_operand(operand: Operand) -> Option<Variable> {
        match operand {
            Operand::Inst(id) => Some(Variable::Inst(id)),
            Operand::Arg(id) => Some(Variable::Arg(id)),
            Operand::Const(_) => None,
        }
    }

    pub fn as_operand(self) -> Operand {
        match self {
            Variable::Inst(id) => Operand::Inst(id),
            Variable::Arg(id) => Operand::Arg(id),
        }
    }
}

impl DomainElement for Variable {
    /// One entry per instruction or argument referenced as an operand,
    /// regardless of how many times it is used. Phi incoming values count.
    fn collect(function: &Function) -> Domain<Self> {
        let mut domain = Domain::new();
        for id in function.inst_ids() {
            for operand in function.inst(id).kind.operands() {
                if let Some(var) = Variable::from_operand(operand) {
                    domain.insert(var);
                }
            }
        }
        domain
    }

    fn references(&self, operand: Operand) -> bool {
        self.as_operand() == operand
    }

    fn replace(&self, from: Operand, to: Operand) -> Self {
        if self.as_operand() == from {
            Variable::from_operand(to).unwrap_or(*self)
        } else {
            *self
        }
    }

    fn render(&self, function: &Function) -> String {
        function.operand_name(self.as_operand())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CmpOp, FunctionBuilder};

    #[test]
    fn commutative_expressions_match_either_order() {
        let a = Operand::Arg(ArgId(0));
        let b = Operand::Arg(ArgId(1));
        assert_eq!(
            Expression::new(BinaryOp::Add, a, b),
            Expression::new(BinaryOp::Add, b, a)
        );
        assert_ne!(
            Expression::new(BinaryOp::Sub, a, b),
            Expression::new(BinaryOp::Sub, b, a)
        );
    }

    #[test]
    fn expression_domain_dedupes_and_keeps_order() {
        let mut fb = FunctionBuilder::new("f", &["a", "b"]);
        fb.block("entry");
        let x = fb.binary(BinaryOp::Add, fb.arg(0), fb.arg(1));
        let _y = fb.binary(BinaryOp::Add, fb.arg(1), fb.arg(0)); // same expression
        let _z = fb.binary(BinaryOp::Mul, x, fb.arg(0));
        fb.ret(None);
        let f = fb.finish();

        let domain = Expression::collect(&f);
        assert_eq!(domain.len(), 2);
        assert_eq!(
            domain.id_of(&Expression::new(
                BinaryOp::Add,
                Operand::Arg(ArgId(1)),
                Operand::Arg(ArgId(0))
            )),
            Some(0)
        );
    }

    #[test]
    fn variable_domain_includes_phi_incoming() {
        let mut fb = FunctionBuilder::new("f", &["a"]);
        let entry = fb.block("entry");
        let other = fb.block("other");
        let join = fb.block("join");
        fb.switch_to(entry);
        let c = fb.cmp(CmpOp::Eq, fb.arg(0), Operand::Const(0));
        fb.branch(c, join, other);
        fb.switch_to(other);
        fb.jump(join);
        fb.switch_to(join);
        let p = fb.phi(vec![(entry, fb.arg(0)), (other, Operand::Const(7))]);
        fb.ret(Some(p));
        let f = fb.finish();

        let domain = Variable::collect(&f);
        // a (cmp + phi incoming, once), %c (branch), %p (ret)
        assert_eq!(domain.len(), 3);
        assert!(domain.id_of(&Variable::Arg(ArgId(0))).is_some());
    }

    #[test]
    fn replace_recanonicalises() {
        let a = Operand::Arg(ArgId(0));
        let b = Operand::Arg(ArgId(1));
        let c = Operand::Const(3);
        let expr = Expression::new(BinaryOp::Add, a, b);
        let replaced = expr.replace(a, c);
        assert!(replaced.references(c));
        assert!(!replaced.references(a));
        assert_eq!(replaced, Expression::new(BinaryOp::Add, c, b));
    }
}
