//! Meaning-preserving transformation of ground probabilistic logic
//! programs into weighted CNF: normalize annotated disjunctions into a
//! weighted normal program, break its positive loops, and complete it
//! by transforming rules from implications into equivalences.

#![allow(rustdoc::private_intra_doc_links)]

mod compiler;
mod completion;
mod loops;
mod lpad;
mod program;
mod translation;
mod weights;

pub use compiler::{CompileError, WmcCompiler, WmcProblem};
pub use completion::{complete, ClarkCompletion, Compilation};
pub use loops::{break_loops, Ancestors, Cuts, LoopBreaker, Resolved, Unlooped};
pub use lpad::{Choices, GroundProgram, LpadError};
pub use program::{Body, RuleDatabase};
pub use translation::{Translation, Variable};
pub use weights::{Signed, WeightError, Weights};
