#![warn(clippy::pedantic)]
//! Arena-backed syntax tree consumed by the checker passes.
//!
//! Every [`Node`](nodes::Node) owns a semantic type slot and an
//! [`AnalysisStage`](nodes::AnalysisStage) watermark; passes use the watermark to skip nodes
//! they already handled. Rewrites never mutate nodes in place beyond the type slot: they allocate
//! replacement nodes and redirect the parent's child slot.
pub mod arena;
pub mod builder;
pub mod nodes;
pub mod visitor;
