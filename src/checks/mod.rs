//! Rule predicates, the evaluator that attributes their hits, and the
//! per-invocation runner.

pub mod docs;
mod evaluator;
pub mod formatting;
pub mod handlers;
pub mod naming;
pub mod performance;
mod runner;
pub mod security;
pub mod size;
mod suppress;
mod types;

pub use evaluator::{evaluate, Evaluator};
pub use runner::{CancelFlag, Runner, Stage};
pub use suppress::{
    filter_suppressed, matches_suppression, parse_suppressions, SuppressedFinding, Suppression,
    SuppressionKind,
};
pub use types::{Finding, Hit, Thresholds};
