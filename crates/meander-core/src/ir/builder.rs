//! Programmatic construction of functions, one block at a time.
//!
//! The builder assigns instruction ids in insertion order and derives
//! CFG edges from terminators when finished. Misuse (appending past a
//! terminator, finishing with an unterminated block) is a programmer
//! error and panics.

use super::{
    ArgId, BasicBlock, BinaryOp, BlockId, CmpOp, Function, InstId, InstKind, Instruction, Operand,
};

pub struct FunctionBuilder {
    name: String,
    params: Vec<String>,
    blocks: Vec<BasicBlock>,
    insts: Vec<Instruction>,
    current: Option<BlockId>,
    next_value: u32,
}

impl FunctionBuilder {
    pub fn new(name: &str, params: &[&str]) -> Self {
        FunctionBuilder {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            blocks: Vec::new(),
            insts: Vec::new(),
            current: None,
            next_value: 0,
        }
    }

    /// Operand referring to the `index`-th parameter.
    pub fn arg(&self, index: usize) -> Operand {
        assert!(index < self.params.len(), "no parameter with index {index}");
        Operand::Arg(ArgId(index as u32))
    }

    /// Append a new (empty) block and make it current.
    pub fn block(&mut self, label: &str) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock {
            id,
            label: label.to_string(),
            insts: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
        });
        self.current = Some(id);
        id
    }

    /// Make an existing block current, so later instructions append to it.
    pub fn switch_to(&mut self, block: BlockId) {
        assert!(block.index() < self.blocks.len());
        self.current = Some(block);
    }

    fn push(&mut self, kind: InstKind) -> InstId {
        let current = self.current.expect("no current block; call block() first");
        let block = &mut self.blocks[current.index()];
        if let Some(&last) = block.insts.last() {
            assert!(
                !self.insts[last.index()].kind.is_terminator(),
                "block `{}` is already terminated",
                block.label
            );
        }
        let name = if kind.produces_value() {
            let name = format!("%{}", self.next_value);
            self.next_value += 1;
            name
        } else {
            String::new()
        };
        let id = InstId(self.insts.len() as u32);
        self.insts.push(Instruction { name, kind });
        block.insts.push(id);
        id
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: Operand, rhs: Operand) -> Operand {
        Operand::Inst(self.push(InstKind::Binary { op, lhs, rhs }))
    }

    pub fn cmp(&mut self, op: CmpOp, lhs: Operand, rhs: Operand) -> Operand {
        Operand::Inst(self.push(InstKind::Cmp { op, lhs, rhs }))
    }

    pub fn phi(&mut self, incoming: Vec<(BlockId, Operand)>) -> Operand {
        Operand::Inst(self.push(InstKind::Phi { incoming }))
    }

    pub fn branch(&mut self, cond: Operand, then_dest: BlockId, else_dest: BlockId) {
        self.push(InstKind::Branch {
            cond,
            then_dest,
            else_dest,
        });
    }

    pub fn jump(&mut self, dest: BlockId) {
        self.push(InstKind::Jump { dest });
    }

    pub fn ret(&mut self, value: Option<Operand>) {
        self.push(InstKind::Ret { value });
    }

    /// Finish construction: check every block is terminated, then compute
    /// predecessor/successor edges.
    pub fn finish(self) -> Function {
        let mut function = Function {
            name: self.name,
            params: self.params,
            blocks: self.blocks,
            insts: self.insts,
        };
        assert!(!function.blocks.is_empty(), "function has no blocks");
        for block in &function.blocks {
            let last = block
                .insts
                .last()
                .unwrap_or_else(|| panic!("block `{}` is empty", block.label));
            assert!(
                function.insts[last.index()].kind.is_terminator(),
                "block `{}` is not terminated",
                block.label
            );
        }
        function.compute_edges();
        function
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_diamond_edges() {
        let mut b = FunctionBuilder::new("max", &["a", "b"]);
        let entry = b.block("entry");
        let c = b.cmp(CmpOp::Lt, b.arg(0), b.arg(1));
        let take_b = b.block("take_b");
        let take_a = b.block("take_a");
        let done = b.block("done");
        b.switch_to(entry);
        b.branch(c, take_b, take_a);
        b.switch_to(take_b);
        b.jump(done);
        b.switch_to(take_a);
        b.jump(done);
        b.switch_to(done);
        let m = b.phi(vec![(take_b, b.arg(1)), (take_a, b.arg(0))]);
        b.ret(Some(m));
        let f = b.finish();

        assert_eq!(f.block(entry).succs, vec![take_b, take_a]);
        assert_eq!(f.block(done).preds, vec![take_b, take_a]);
        assert_eq!(f.block(take_b).preds, vec![entry]);
        assert_eq!(f.num_insts(), 6);
    }

    #[test]
    #[should_panic(expected = "already terminated")]
    fn rejects_instructions_after_terminator() {
        let mut b = FunctionBuilder::new("f", &["a"]);
        b.block("entry");
        b.ret(None);
        b.binary(BinaryOp::Add, b.arg(0), Operand::Const(1));
    }

    #[test]
    fn duplicate_branch_targets_collapse() {
        let mut b = FunctionBuilder::new("f", &["a"]);
        let entry = b.block("entry");
        let next = b.block("next");
        b.switch_to(entry);
        b.branch(b.arg(0), next, next);
        b.switch_to(next);
        b.ret(None);
        let f = b.finish();
        assert_eq!(f.block(entry).succs, vec![next]);
        assert_eq!(f.block(next).preds, vec![entry]);
    }
}
