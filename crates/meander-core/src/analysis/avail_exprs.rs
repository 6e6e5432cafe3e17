//! Available expressions: which computed expressions still hold their
//! value at each point.
//!
//! Forward must-analysis: an expression is available only when every path
//! to the point computes it with no later redefinition of its operands.

use crate::analysis::domain::{DomainElement, Expression};
use crate::analysis::engine::{Direction, Transfer, TransferCx};
use crate::analysis::lattice::{DomainValue, MeetOp, Presence};
use crate::ir::{InstId, InstKind, Operand};

#[derive(Debug, Default)]
pub struct AvailableExpressions;

impl Transfer for AvailableExpressions {
    type Element = Expression;
    type Value = Presence;

    const NAME: &'static str = "avail-expr";

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn meet_op(&self) -> MeetOp {
        MeetOp::Intersect
    }

    fn transfer(
        &mut self,
        cx: &TransferCx<'_, Expression, Presence>,
        inst: InstId,
        input: &DomainValue<Presence>,
        output: &mut DomainValue<Presence>,
    ) -> bool {
        // gen: the expression this instruction computes, if any.
        let gen = match cx.function.inst(inst).kind {
            InstKind::Binary { op, lhs, rhs } => cx.domain.id_of(&Expression::new(op, lhs, rhs)),
            _ => None,
        };

        // kill: every expression whose operands mention this result; the
        // expression has to be recomputed once an operand is redefined.
        let result = Operand::Inst(inst);
        for (id, expr) in cx.domain.iter() {
            let survives = input[id].0 && !expr.references(result);
            output.set(id, Presence(survives || gen == Some(id)));
        }

        *output != *cx.cached(inst)
    }
}
