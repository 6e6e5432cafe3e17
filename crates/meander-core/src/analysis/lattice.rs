//! Lattice values, meet operators, and per-point value vectors.
//!
//! Each domain element carries one lattice value per program point. The
//! meet operator combines the vectors flowing in from CFG neighbours; it
//! must be associative and commutative so the left-to-right pairwise
//! reduction is order-independent.

use std::fmt;
use std::ops::Index;

use crate::analysis::domain::DomainId;

/// How values from multiple CFG neighbours are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetOp {
    /// Must-analysis combinator (e.g. available expressions).
    Intersect,
    /// May-analysis combinator (e.g. liveness).
    Union,
}

/// The abstract value attached to one domain element at one program point.
pub trait LatticeValue: Clone + PartialEq + fmt::Debug {
    /// The boundary value used when a block has no meet neighbours, and
    /// the initial value of every cache slot.
    fn top(op: MeetOp) -> Self;

    /// Binary meet under `op`.
    fn meet(&self, other: &Self, op: MeetOp) -> Self;

    /// Whether the diagnostic dump should list this slot.
    fn is_informative(&self) -> bool;

    /// Suffix appended after the element in the dump.
    fn render(&self) -> String {
        String::new()
    }
}

/// Set-membership bit: is the fact present at this point?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Presence(pub bool);

impl LatticeValue for Presence {
    /// The empty set for both operators: nothing is available at entry,
    /// nothing is live at exit.
    fn top(_op: MeetOp) -> Self {
        Presence(false)
    }

    fn meet(&self, other: &Self, op: MeetOp) -> Self {
        match op {
            MeetOp::Intersect => Presence(self.0 && other.0),
            MeetOp::Union => Presence(self.0 || other.0),
        }
    }

    fn is_informative(&self) -> bool {
        self.0
    }
}

/// Constant-propagation state for one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstantState {
    /// No information yet; may still resolve to a constant.
    #[default]
    Undefined,
    /// Known to always hold this value.
    Constant(i64),
    /// Observed with conflicting values; will never be constant.
    Overdefined,
}

impl ConstantState {
    pub fn is_constant(self) -> bool {
        matches!(self, ConstantState::Constant(_))
    }

    pub fn as_constant(self) -> Option<i64> {
        match self {
            ConstantState::Constant(value) => Some(value),
            _ => None,
        }
    }
}

impl LatticeValue for ConstantState {
    fn top(_op: MeetOp) -> Self {
        ConstantState::Undefined
    }

    /// The ⊓ of the three-level constant lattice; the same for either
    /// meet operator.
    fn meet(&self, other: &Self, _op: MeetOp) -> Self {
        use ConstantState::*;
        match (*self, *other) {
            (Undefined, x) | (x, Undefined) => x,
            (Overdefined, _) | (_, Overdefined) => Overdefined,
            (Constant(a), Constant(b)) if a == b => Constant(a),
            (Constant(_), Constant(_)) => Overdefined,
        }
    }

    fn is_informative(&self) -> bool {
        self.is_constant()
    }

    fn render(&self) -> String {
        match self {
            ConstantState::Constant(value) => format!(" = {value}"),
            _ => String::new(),
        }
    }
}

/// A vector of lattice values, one slot per domain id: semantically a
/// total map from domain element to its abstract value at one point.
///
/// Invariant: the length always equals the domain vector's size. A
/// mismatch is a programmer error in a transfer function or meet
/// operator and aborts via assertion.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainValue<V> {
    slots: Vec<V>,
}

impl<V: LatticeValue> DomainValue<V> {
    pub fn top(len: usize, op: MeetOp) -> Self {
        DomainValue {
            slots: vec![V::top(op); len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn set(&mut self, id: DomainId, value: V) {
        self.slots[id] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (DomainId, &V)> {
        self.slots.iter().enumerate()
    }

    /// Elementwise binary meet.
    pub fn meet_with(&self, other: &Self, op: MeetOp) -> Self {
        assert_eq!(
            self.len(),
            other.len(),
            "domain value length mismatch in meet"
        );
        DomainValue {
            slots: self
                .slots
                .iter()
                .zip(&other.slots)
                .map(|(a, b)| a.meet(b, op))
                .collect(),
        }
    }

    /// Left-to-right pairwise reduction over `operands`; the top vector
    /// when the iterator is empty.
    pub fn meet_all<'a>(
        mut operands: impl Iterator<Item = &'a Self>,
        op: MeetOp,
        len: usize,
    ) -> Self
    where
        V: 'a,
    {
        let Some(first) = operands.next() else {
            return DomainValue::top(len, op);
        };
        assert_eq!(first.len(), len, "domain value length mismatch in meet");
        operands.fold(first.clone(), |acc, next| acc.meet_with(next, op))
    }
}

impl<V> Index<DomainId> for DomainValue<V> {
    type Output = V;

    fn index(&self, id: DomainId) -> &V {
        &self.slots[id]
    }
}
