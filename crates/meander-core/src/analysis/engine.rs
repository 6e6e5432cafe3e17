//! The generic fixed-point engine.
//!
//! An analysis is a [`Transfer`] implementation plugged into [`run`]: the
//! engine owns the traversal (direction-aware block and instruction
//! orders, meet over CFG neighbours) and the value caches, while the
//! transfer function owns the per-instruction semantics. The loop repeats
//! full passes over the function until one pass reports no change, which
//! is guaranteed to happen for monotone transfer functions over these
//! finite-height lattices.

use tracing::{debug, trace};

use crate::analysis::domain::{Domain, DomainElement};
use crate::analysis::lattice::{DomainValue, LatticeValue, MeetOp};
use crate::ir::{BasicBlock, BlockId, Function, InstId};

/// Traversal strategy: which neighbours feed the meet, and in what order
/// blocks and instructions are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Blocks in visitation order: program order going forward, reverse
    /// program order going backward.
    pub fn block_order(self, function: &Function) -> Vec<BlockId> {
        let mut order: Vec<BlockId> = function.blocks.iter().map(|b| b.id).collect();
        if self == Direction::Backward {
            order.reverse();
        }
        order
    }

    /// Instructions within a block, in visitation order.
    pub fn inst_order(self, block: &BasicBlock) -> Vec<InstId> {
        let mut order = block.insts.clone();
        if self == Direction::Backward {
            order.reverse();
        }
        order
    }

    /// The neighbouring blocks whose values feed this block's meet.
    pub fn meet_sources(self, block: &BasicBlock) -> &[BlockId] {
        match self {
            Direction::Forward => &block.preds,
            Direction::Backward => &block.succs,
        }
    }
}

/// Read-only view handed to a transfer function.
pub struct TransferCx<'a, E: DomainElement, V: LatticeValue> {
    pub function: &'a Function,
    pub domain: &'a Domain<E>,
    /// Cached value immediately after (in visitation order) each
    /// instruction, indexed by `InstId`. Values from the previous pass
    /// until this pass overwrites them.
    pub inst_values: &'a [DomainValue<V>],
    /// The block currently being visited.
    pub block: BlockId,
}

impl<E: DomainElement, V: LatticeValue> TransferCx<'_, E, V> {
    /// Previous cached output of `inst`.
    pub fn cached(&self, inst: InstId) -> &DomainValue<V> {
        &self.inst_values[inst.index()]
    }
}

/// The analysis-specific half of the framework: a transfer function plus
/// the direction and meet operator it runs under.
pub trait Transfer {
    type Element: DomainElement;
    type Value: LatticeValue;

    /// Short name used by hosting tools to select this analysis.
    const NAME: &'static str;

    fn direction(&self) -> Direction;

    fn meet_op(&self) -> MeetOp;

    /// Called once before the fixed-point loop starts.
    fn initialize(&mut self, _function: &Function) {}

    /// Apply this instruction's transfer to `input`, writing the result
    /// into `output` (pre-filled with the boundary vector). Returns
    /// whether anything observable changed since the previous pass.
    fn transfer(
        &mut self,
        cx: &TransferCx<'_, Self::Element, Self::Value>,
        inst: InstId,
        input: &DomainValue<Self::Value>,
        output: &mut DomainValue<Self::Value>,
    ) -> bool;
}

/// The immutable outcome of one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult<E: Eq + std::hash::Hash, V> {
    domain: Domain<E>,
    block_values: Vec<DomainValue<V>>,
    inst_values: Vec<DomainValue<V>>,
}

impl<E: DomainElement, V: LatticeValue> AnalysisResult<E, V> {
    /// The ordered domain (id map and domain vector in one).
    pub fn domain(&self) -> &Domain<E> {
        &self.domain
    }

    /// The block's boundary value: its entry value going forward, its
    /// exit value going backward.
    pub fn block_value(&self, block: BlockId) -> &DomainValue<V> {
        &self.block_values[block.index()]
    }

    /// The value immediately after (in visitation order) `inst`.
    pub fn inst_value(&self, inst: InstId) -> &DomainValue<V> {
        &self.inst_values[inst.index()]
    }

    /// Diagnostic dump: one line per instruction in program order — the
    /// instruction's textual form, a tab, then the informative slots as
    /// `{element, element, ...}`.
    pub fn render(&self, function: &Function) -> String {
        let mut out = String::new();
        for inst in function.inst_ids() {
            out.push_str(&function.inst_to_string(inst));
            out.push('\t');
            out.push('{');
            let mut first = true;
            for (id, value) in self.inst_value(inst).iter() {
                if !value.is_informative() {
                    continue;
                }
                if !first {
                    out.push_str(", ");
                }
                first = false;
                out.push_str(&self.domain.element(id).render(function));
                out.push_str(&value.render());
            }
            out.push_str("}\n");
        }
        out
    }
}

/// Run `analysis` over `function` to fixed point.
///
/// Preconditions: the function has at least one block and its entry block
/// has at least one instruction. Violations abort; they are programmer
/// errors in the caller, not recoverable conditions.
pub fn run<T: Transfer>(
    function: &Function,
    mut analysis: T,
) -> AnalysisResult<T::Element, T::Value> {
    assert!(
        !function.blocks.is_empty(),
        "analysis requires at least one block"
    );
    assert!(
        !function.block(function.entry()).insts.is_empty(),
        "analysis requires a non-empty entry block"
    );

    let domain = <T::Element as DomainElement>::collect(function);
    let direction = analysis.direction();
    let meet_op = analysis.meet_op();
    let len = domain.len();
    debug!(
        analysis = T::NAME,
        function = %function.name,
        domain_size = len,
        "starting analysis"
    );

    analysis.initialize(function);

    let mut block_values: Vec<DomainValue<T::Value>> = function
        .blocks
        .iter()
        .map(|_| DomainValue::top(len, meet_op))
        .collect();
    let mut inst_values: Vec<DomainValue<T::Value>> = function
        .insts
        .iter()
        .map(|_| DomainValue::top(len, meet_op))
        .collect();

    let block_order = direction.block_order(function);
    let mut passes = 0usize;
    loop {
        passes += 1;
        let mut changed = false;
        for &block_id in &block_order {
            let block = function.block(block_id);
            let order = direction.inst_order(block);

            // Boundary value: meet of each neighbour's value at its last
            // visited instruction, or the top vector with no neighbours.
            let neighbours = direction.meet_sources(block);
            let mut value = DomainValue::meet_all(
                neighbours.iter().filter_map(|&n| {
                    let neighbour = function.block(n);
                    direction
                        .inst_order(neighbour)
                        .last()
                        .map(|&last| &inst_values[last.index()])
                }),
                meet_op,
                len,
            );
            block_values[block_id.index()] = value.clone();

            for &inst in &order {
                let mut output = DomainValue::top(len, meet_op);
                let inst_changed = {
                    let cx = TransferCx {
                        function,
                        domain: &domain,
                        inst_values: &inst_values,
                        block: block_id,
                    };
                    analysis.transfer(&cx, inst, &value, &mut output)
                };
                changed |= inst_changed;
                assert_eq!(
                    output.len(),
                    len,
                    "transfer function changed the domain value length"
                );
                value = output.clone();
                inst_values[inst.index()] = output;
            }
        }
        trace!(analysis = T::NAME, pass = passes, changed, "pass complete");
        if !changed {
            break;
        }
    }

    let result = AnalysisResult {
        domain,
        block_values,
        inst_values,
    };
    debug!(
        analysis = T::NAME,
        function = %function.name,
        passes,
        "fixed point reached"
    );
    debug!(target: "meander::dump", "\n{}", result.render(function));
    result
}
