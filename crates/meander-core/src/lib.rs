//! Meander: a monotone dataflow-analysis framework over a small CFG IR.
//!
//! The framework computes fixed-point facts over a function's control
//! flow graph, parameterised over the fact being tracked (a domain
//! element), the abstract value attached to each fact (a lattice value),
//! and the operator combining values from CFG neighbours. Three concrete
//! analyses are built on it: available expressions, live variables, and
//! sparse conditional constant propagation.
//!
//! ```
//! use meander_core::analysis::{run, ConstantPropagation};
//! use meander_core::ir::parse_function;
//!
//! let f = parse_function(
//!     "fn f() {\nentry:\n  %x = add 1, 2\n  %y = add %x, 2\n  ret %y\n}\n",
//! )
//! .unwrap();
//! let result = run(&f, ConstantPropagation::new());
//! println!("{}", result.render(&f));
//! ```

pub mod analysis;
pub mod ir;
