//! Program model: functions, basic blocks, instructions.
//!
//! Design: index-addressed storage. Blocks and instructions live in `Vec`s
//! owned by the `Function` and are referenced by `BlockId` / `InstId`
//! newtypes, so analyses never hold references into the model and the
//! model can be borrowed read-only for the duration of a run.

mod builder;
mod parse;

pub use builder::FunctionBuilder;
pub use parse::{parse_function, parse_module, ParseError};

use std::fmt;

/// Unique identifier for a basic block within a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    /// The entry block — control flow begins here.
    pub const ENTRY: BlockId = BlockId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Unique identifier for an instruction within a function's instruction pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub u32);

impl InstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Unique identifier for a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArgId(pub u32);

impl ArgId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An instruction operand: the result of another instruction, a function
/// argument, or an integer constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operand {
    Inst(InstId),
    Arg(ArgId),
    Const(i64),
}

impl Operand {
    /// Whether this operand names a value (instruction result or argument)
    /// rather than a constant.
    pub fn is_value(self) -> bool {
        !matches!(self, Operand::Const(_))
    }
}

/// Binary arithmetic opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn is_commutative(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Mul)
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
        }
    }

    /// Evaluate on constants. Returns `None` when the result is not
    /// defined (division by zero, `i64::MIN / -1`).
    pub fn eval(self, lhs: i64, rhs: i64) -> Option<i64> {
        match self {
            BinaryOp::Add => Some(lhs.wrapping_add(rhs)),
            BinaryOp::Sub => Some(lhs.wrapping_sub(rhs)),
            BinaryOp::Mul => Some(lhs.wrapping_mul(rhs)),
            BinaryOp::Div => lhs.checked_div(rhs),
        }
    }
}

/// Comparison opcodes. Produce 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn is_commutative(self) -> bool {
        matches!(self, CmpOp::Eq | CmpOp::Ne)
    }

    pub fn name(self) -> &'static str {
        match self {
            CmpOp::Eq => "eq",
            CmpOp::Ne => "ne",
            CmpOp::Lt => "lt",
            CmpOp::Le => "le",
            CmpOp::Gt => "gt",
            CmpOp::Ge => "ge",
        }
    }

    pub fn eval(self, lhs: i64, rhs: i64) -> i64 {
        let holds = match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
        };
        holds as i64
    }
}

/// What an instruction does. The variant set is closed, so consumers match
/// exhaustively instead of inspecting an opcode table.
#[derive(Debug, Clone, PartialEq)]
pub enum InstKind {
    Binary {
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    },
    Cmp {
        op: CmpOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// Merge point: one incoming value per predecessor edge.
    Phi { incoming: Vec<(BlockId, Operand)> },
    /// Conditional branch: nonzero condition takes `then_dest`.
    Branch {
        cond: Operand,
        then_dest: BlockId,
        else_dest: BlockId,
    },
    Jump { dest: BlockId },
    Ret { value: Option<Operand> },
}

impl InstKind {
    /// Whether this instruction defines a value other instructions can use.
    pub fn produces_value(&self) -> bool {
        matches!(
            self,
            InstKind::Binary { .. } | InstKind::Cmp { .. } | InstKind::Phi { .. }
        )
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstKind::Branch { .. } | InstKind::Jump { .. } | InstKind::Ret { .. }
        )
    }

    /// All operands in textual order. Phi incoming values are included.
    pub fn operands(&self) -> Vec<Operand> {
        match self {
            InstKind::Binary { lhs, rhs, .. } | InstKind::Cmp { lhs, rhs, .. } => {
                vec![*lhs, *rhs]
            }
            InstKind::Phi { incoming } => incoming.iter().map(|(_, op)| *op).collect(),
            InstKind::Branch { cond, .. } => vec![*cond],
            InstKind::Jump { .. } => Vec::new(),
            InstKind::Ret { value } => value.iter().copied().collect(),
        }
    }
}

/// One instruction in a function's pool. `name` is the textual result name
/// (e.g. `%sum`) for value-producing instructions, empty for terminators.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub name: String,
    pub kind: InstKind,
}

/// A basic block: an ordered instruction sequence ending in a terminator,
/// plus its CFG edge lists.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub label: String,
    /// Instruction ids in textual order.
    pub insts: Vec<InstId>,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
}

/// A function: an ordered block sequence (the first block is the entry)
/// over a shared instruction pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub blocks: Vec<BasicBlock>,
    pub insts: Vec<Instruction>,
}

impl Function {
    pub fn entry(&self) -> BlockId {
        BlockId::ENTRY
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn inst(&self, id: InstId) -> &Instruction {
        &self.insts[id.index()]
    }

    pub fn num_insts(&self) -> usize {
        self.insts.len()
    }

    /// Instruction ids in textual (program) order across all blocks.
    pub fn inst_ids(&self) -> impl Iterator<Item = InstId> + '_ {
        self.blocks.iter().flat_map(|b| b.insts.iter().copied())
    }

    /// The textual name of an operand: an instruction's result name, a
    /// parameter name, or a constant literal.
    pub fn operand_name(&self, op: Operand) -> String {
        match op {
            Operand::Inst(id) => self.inst(id).name.clone(),
            Operand::Arg(id) => self.params[id.index()].clone(),
            Operand::Const(value) => value.to_string(),
        }
    }

    /// Render one instruction the way the parser reads it.
    pub fn inst_to_string(&self, id: InstId) -> String {
        let inst = self.inst(id);
        match &inst.kind {
            InstKind::Binary { op, lhs, rhs } => format!(
                "{} = {} {}, {}",
                inst.name,
                op.name(),
                self.operand_name(*lhs),
                self.operand_name(*rhs)
            ),
            InstKind::Cmp { op, lhs, rhs } => format!(
                "{} = cmp.{} {}, {}",
                inst.name,
                op.name(),
                self.operand_name(*lhs),
                self.operand_name(*rhs)
            ),
            InstKind::Phi { incoming } => {
                let edges: Vec<String> = incoming
                    .iter()
                    .map(|(block, op)| {
                        format!("[{}: {}]", self.block(*block).label, self.operand_name(*op))
                    })
                    .collect();
                format!("{} = phi {}", inst.name, edges.join(", "))
            }
            InstKind::Branch {
                cond,
                then_dest,
                else_dest,
            } => format!(
                "br {}, {}, {}",
                self.operand_name(*cond),
                self.block(*then_dest).label,
                self.block(*else_dest).label
            ),
            InstKind::Jump { dest } => format!("jmp {}", self.block(*dest).label),
            InstKind::Ret { value } => match value {
                Some(op) => format!("ret {}", self.operand_name(*op)),
                None => "ret".to_string(),
            },
        }
    }

    /// Recompute predecessor/successor edge lists from block terminators.
    /// Duplicate edges (a branch with both targets equal) collapse to one.
    pub(crate) fn compute_edges(&mut self) {
        for block in &mut self.blocks {
            block.preds.clear();
            block.succs.clear();
        }
        let mut edges: Vec<(BlockId, BlockId)> = Vec::new();
        for block in &self.blocks {
            let Some(&last) = block.insts.last() else {
                continue;
            };
            match &self.insts[last.index()].kind {
                InstKind::Branch {
                    then_dest,
                    else_dest,
                    ..
                } => {
                    edges.push((block.id, *then_dest));
                    edges.push((block.id, *else_dest));
                }
                InstKind::Jump { dest } => edges.push((block.id, *dest)),
                _ => {}
            }
        }
        for (from, to) in edges {
            if !self.blocks[from.index()].succs.contains(&to) {
                self.blocks[from.index()].succs.push(to);
            }
            if !self.blocks[to.index()].preds.contains(&from) {
                self.blocks[to.index()].preds.push(from);
            }
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fn {}({}) {{", self.name, self.params.join(", "))?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.label)?;
            for &inst in &block.insts {
                writeln!(f, "  {}", self.inst_to_string(inst))?;
            }
        }
        write!(f, "}}")
    }
}
