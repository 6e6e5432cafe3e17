//! Sparse conditional constant propagation.
//!
//! Forward analysis over the three-level constant lattice, combined with
//! block-level reachability: only the entry block starts executable, and
//! terminators extend the executable set as their conditions resolve. A
//! branch on a known constant marks only the taken successor, so code on
//! the untaken side never advances past `Undefined` and cannot pollute
//! the lattice at later joins.

use tracing::trace;

use crate::analysis::domain::Variable;
use crate::analysis::engine::{Direction, Transfer, TransferCx};
use crate::analysis::lattice::{ConstantState, DomainValue, LatticeValue, MeetOp};
use crate::ir::{BlockId, Function, InstId, InstKind, Operand};

#[derive(Debug, Default)]
pub struct ConstantPropagation {
    /// Reachability, indexed by `BlockId`. Seeded with the entry block.
    executable: Vec<bool>,
}

impl ConstantPropagation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a two-operand instruction: all-constant operands evaluate,
    /// any overdefined operand is overdefined, anything else is still
    /// undefined pending more information. An evaluation with no defined
    /// result (division by zero) is overdefined.
    fn fold(
        lhs: ConstantState,
        rhs: ConstantState,
        eval: impl FnOnce(i64, i64) -> Option<i64>,
    ) -> ConstantState {
        use ConstantState::*;
        match (lhs, rhs) {
            (Constant(a), Constant(b)) => eval(a, b).map_or(Overdefined, Constant),
            (Overdefined, _) | (_, Overdefined) => Overdefined,
            _ => Undefined,
        }
    }

    fn mark(&mut self, block: BlockId) -> bool {
        let slot = &mut self.executable[block.index()];
        let newly = !*slot;
        *slot = true;
        if newly {
            trace!(block = block.index(), "block became executable");
        }
        newly
    }
}

impl Transfer for ConstantPropagation {
    type Element = Variable;
    type Value = ConstantState;

    const NAME: &'static str = "const-prop";

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn meet_op(&self) -> MeetOp {
        MeetOp::Intersect
    }

    fn initialize(&mut self, function: &Function) {
        self.executable = vec![false; function.blocks.len()];
        self.executable[function.entry().index()] = true;
    }

    fn transfer(
        &mut self,
        cx: &TransferCx<'_, Variable, ConstantState>,
        inst: InstId,
        input: &DomainValue<ConstantState>,
        output: &mut DomainValue<ConstantState>,
    ) -> bool {
        // Unreachable code is a pass-through: keep the cached value and
        // report no change, so it never advances the lattice.
        if !self.executable[cx.block.index()] {
            *output = cx.cached(inst).clone();
            return false;
        }

        *output = input.clone();

        // Operand resolution: constants fold immediately, values look up
        // their domain slot in the running input.
        let resolve = |operand: Operand| -> ConstantState {
            match operand {
                Operand::Const(value) => ConstantState::Constant(value),
                value => Variable::from_operand(value)
                    .and_then(|var| cx.domain.id_of(&var))
                    .map_or(ConstantState::Undefined, |id| input[id]),
            }
        };

        let mut computed = None;
        let mut newly_executable = false;
        match &cx.function.inst(inst).kind {
            InstKind::Binary { op, lhs, rhs } => {
                computed = Some(Self::fold(resolve(*lhs), resolve(*rhs), |a, b| {
                    op.eval(a, b)
                }));
            }
            InstKind::Cmp { op, lhs, rhs } => {
                computed = Some(Self::fold(resolve(*lhs), resolve(*rhs), |a, b| {
                    Some(op.eval(a, b))
                }));
            }
            InstKind::Phi { incoming } => {
                // Meet over the reachable incoming edges only, each value
                // taken from the incoming block's cached exit.
                let mut merged = ConstantState::Undefined;
                for &(pred, operand) in incoming {
                    if !self.executable[pred.index()] {
                        continue;
                    }
                    let value = match operand {
                        Operand::Const(value) => ConstantState::Constant(value),
                        value => {
                            let at_exit = cx
                                .function
                                .block(pred)
                                .insts
                                .last()
                                .map(|&last| cx.cached(last));
                            Variable::from_operand(value)
                                .and_then(|var| cx.domain.id_of(&var))
                                .zip(at_exit)
                                .map_or(ConstantState::Undefined, |(id, exit)| exit[id])
                        }
                    };
                    merged = merged.meet(&value, MeetOp::Intersect);
                }
                computed = Some(merged);
            }
            InstKind::Branch {
                cond,
                then_dest,
                else_dest,
            } => match resolve(*cond) {
                ConstantState::Constant(value) => {
                    let taken = if value != 0 { *then_dest } else { *else_dest };
                    newly_executable |= self.mark(taken);
                }
                _ => {
                    // Condition not (yet) constant: both sides may run.
                    newly_executable |= self.mark(*then_dest);
                    newly_executable |= self.mark(*else_dest);
                }
            },
            InstKind::Jump { dest } => {
                newly_executable |= self.mark(*dest);
            }
            InstKind::Ret { .. } => {}
        }

        let mut changed = newly_executable;
        if let Some(value) = computed {
            if let Some(id) = cx.domain.id_of(&Variable::Inst(inst)) {
                // Monotone narrowing: meet with the previous cached value
                // so a slot never moves back toward undefined.
                let previous = cx.cached(inst)[id];
                let narrowed = previous.meet(&value, MeetOp::Intersect);
                output.set(id, narrowed);
                changed |= narrowed != previous;
            }
        }
        changed
    }
}
