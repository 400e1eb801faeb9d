//! Source analysis: language adapters and the normalized facts they produce.
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Source Files    │────▶│ Adapters     │────▶│ SourceUnit    │
//! └─────────────────┘     │ (tf, js, py) │     │ (Declarations,│
//!                         └──────────────┘     │  calls, ...)  │
//!                                              └───────────────┘
//!                                                      │
//!                                                      ▼
//!                         ┌──────────────┐     ┌───────────────┐
//!                         │ Rule         │◀────│ UnitCache     │
//!                         │ Evaluator    │     │ (by SHA-256)  │
//!                         └──────────────┘     └───────────────┘
//! ```
//!
//! # Adding a New Language
//!
//! 1. Add a variant to `Language` with its extensions
//! 2. Create a module in `src/analysis/languages/` implementing `LanguageAdapter`
//! 3. Register the adapter in `languages/mod.rs`
//! 4. Tag the catalog rules that apply to it

mod context;
mod facts;
mod languages;
mod traits;
pub(crate) mod treesitter;

pub use context::UnitCache;
pub use facts::{
    Argument, CallSite, Comment, Declaration, DeclarationKind, Handler, LiteralAssignment,
    LoopHazard, LoopHazardKind, SourceUnit, Span,
};
pub use languages::{
    adapter_for, register_adapters, JavaScriptAdapter, PythonAdapter, TerraformAdapter,
};
pub use traits::LanguageAdapter;
