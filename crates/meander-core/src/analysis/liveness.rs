//! Live variables: which values may still be read later.
//!
//! Backward may-analysis: a variable is live before an instruction when
//! the instruction uses it, or it is live after and the instruction does
//! not redefine it. Phi incoming values count as uses — they may be read
//! when control arrives along the matching edge.

use crate::analysis::domain::{DomainElement, Variable};
use crate::analysis::engine::{Direction, Transfer, TransferCx};
use crate::analysis::lattice::{DomainValue, MeetOp, Presence};
use crate::ir::{InstId, Operand};

#[derive(Debug, Default)]
pub struct Liveness;

impl Transfer for Liveness {
    type Element = Variable;
    type Value = Presence;

    const NAME: &'static str = "liveness";

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn meet_op(&self) -> MeetOp {
        MeetOp::Union
    }

    fn transfer(
        &mut self,
        cx: &TransferCx<'_, Variable, Presence>,
        inst: InstId,
        input: &DomainValue<Presence>,
        output: &mut DomainValue<Presence>,
    ) -> bool {
        let operands = cx.function.inst(inst).kind.operands();
        let result = Operand::Inst(inst);

        for (id, var) in cx.domain.iter() {
            let used = operands.contains(&var.as_operand());
            // def: the instruction's own result dies above its definition.
            let killed = var.references(result);
            output.set(id, Presence(used || (input[id].0 && !killed)));
        }

        *output != *cx.cached(inst)
    }
}
