//! Dataflow analysis infrastructure.
//!
//! The pieces form a small dependency chain:
//!
//! ```text
//! Domain (facts: Expression / Variable, enumerated per function)
//!  └─> Lattice (Presence / ConstantState, meet operators, value vectors)
//!       └─> Engine (direction strategies + fixed-point driver)
//!            └─> Concrete analyses (avail-expr, liveness, const-prop)
//! ```
//!
//! All state is indexed by `BlockId` / `InstId` / `DomainId`, keeping the
//! analyses decoupled from references into the program model; the model
//! is borrowed read-only for the duration of a run.

pub mod avail_exprs;
pub mod domain;
pub mod engine;
pub mod lattice;
pub mod liveness;
pub mod sccp;

pub use avail_exprs::AvailableExpressions;
pub use domain::{Domain, DomainElement, DomainId, Expression, Variable};
pub use engine::{run, AnalysisResult, Direction, Transfer, TransferCx};
pub use lattice::{ConstantState, DomainValue, LatticeValue, MeetOp, Presence};
pub use liveness::Liveness;
pub use sccp::ConstantPropagation;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::ir::Function;

/// The analyses a hosting tool can select by short name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    AvailableExpressions,
    Liveness,
    ConstantPropagation,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 3] = [
        AnalysisKind::AvailableExpressions,
        AnalysisKind::Liveness,
        AnalysisKind::ConstantPropagation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AnalysisKind::AvailableExpressions => AvailableExpressions::NAME,
            AnalysisKind::Liveness => Liveness::NAME,
            AnalysisKind::ConstantPropagation => ConstantPropagation::NAME,
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown analysis `{0}`; expected one of avail-expr, liveness, const-prop")]
pub struct UnknownAnalysis(String);

impl FromStr for AnalysisKind {
    type Err = UnknownAnalysis;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownAnalysis(s.to_string()))
    }
}

/// Run the named analysis over `function` and return its diagnostic dump.
pub fn run_named(kind: AnalysisKind, function: &Function) -> String {
    match kind {
        AnalysisKind::AvailableExpressions => {
            run(function, AvailableExpressions).render(function)
        }
        AnalysisKind::Liveness => run(function, Liveness).render(function),
        AnalysisKind::ConstantPropagation => {
            run(function, ConstantPropagation::new()).render(function)
        }
    }
}
