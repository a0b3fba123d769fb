#![warn(clippy::pedantic)]
//! Semantic Checker for the Stream Processing Language
//!
//! This crate assigns semantic types to the expressions of a resolved syntax tree, reports type
//! errors, and rewrites the tree so that every implicit conversion becomes an explicit cast.
//!
//! ## Passes
//!
//! Checking a compilation unit runs two passes, strictly one after the other:
//!
//! 1. **Expression Type Finder** - a bottom-up walk that types every expression and reports
//!    operand mismatches, invalid casts, bad subscripts, misplaced `break`/`return`, operator
//!    invocation errors, side-effect conflicts and the like. A failing expression gets the
//!    `unknown` type, which satisfies every later check, so one mistake is reported once.
//! 2. **Type Promoter** - a top-down walk over promotion sites (initializers, assignments,
//!    arguments, returns, output attributes, literal entries). Each site knows the type its
//!    child should have; the child is wrapped in a cast, or a `null` literal is given that type.
//!
//! Both passes always run, and the driver checks for errors once they are done, so one run reports
//! every independent mistake. The promoter leaves `unknown` nodes alone, and it never casts an
//! initializer the finder rejected: narrowing such as `int32 x = 3.0;` is an error, never an
//! implicit conversion.
//!
//! ## Analysis Stages
//!
//! Every node carries a watermark (`Unanalyzed`, `TypeFound`, `Promoted`). A pass raises it on
//! first contact and skips nodes already at its stage, so both passes are idempotent and shared
//! subtrees are handled once.
//!
//! ## Quick Start
//!
//! ```ignore
//! use streamc_type_checker::{TypeCheckerBuilder, typed_context::TypedContext};
//!
//! let ctx = TypedContext::new(arena, root, types, symbols);
//! let typed_context = TypeCheckerBuilder::build_typed_context(ctx)?.typed_context();
//!
//! if let Some(ty) = typed_context.node_type(node_id) {
//!     println!("{node_id} has type {ty}");
//! }
//! ```
//!
//! On failure the error message joins every failing diagnostic with `"; "`; the individual
//! diagnostics stay available on the context for callers that keep it.
//!
//! ## Public Modules
//!
//! - [`diagnostics`] - the diagnostics sink and collector
//! - [`errors`] - every diagnostic the passes report
//! - [`operator_model`] - operator parameter and port metadata
//! - [`options`] - checker options, loadable from JSON
//! - [`symbol_table`] - symbols, function signatures and operator models by id
//! - [`typed_context`] - the tree, its types and diagnostics after checking

use std::marker::PhantomData;

use anyhow::bail;
use tracing::info;

use crate::typed_context::TypedContext;

mod contexts;
pub mod diagnostics;
pub mod errors;
pub mod operator_model;
pub mod options;
mod promoter;
mod side_effects;
pub mod symbol_table;
mod type_finder;
pub mod typed_context;
mod xml;

/// Marker state indicating the builder has not checked anything yet.
pub struct TypeCheckerInitState;

/// Marker state indicating checking succeeded and the context is ready.
pub struct TypeCheckerCompleteState;

/// Type alias for a completed type checker builder ready to yield its context.
pub type CompletedTypeCheckerBuilder = TypeCheckerBuilder<TypeCheckerCompleteState>;

/// Builder for running both checker passes over a compilation unit.
///
/// Uses the typestate pattern to ensure checking completes before the typed context can be
/// taken out.
pub struct TypeCheckerBuilder<S> {
    typed_context: TypedContext,
    _state: PhantomData<S>,
}

impl Default for TypeCheckerBuilder<TypeCheckerInitState> {
    fn default() -> Self {
        TypeCheckerBuilder::new()
    }
}

impl TypeCheckerBuilder<TypeCheckerInitState> {
    #[must_use]
    pub fn new() -> Self {
        TypeCheckerBuilder {
            typed_context: TypedContext::default(),
            _state: PhantomData,
        }
    }

    /// Runs the type finder and the type promoter over `ctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if either pass reported errors (or warnings, under
    /// `warnings_as_errors`). The message joins the failing diagnostics with `"; "`.
    #[must_use = "returns builder with typed context, extract with .typed_context()"]
    pub fn build_typed_context(
        mut ctx: TypedContext,
    ) -> anyhow::Result<TypeCheckerBuilder<TypeCheckerCompleteState>> {
        type_finder::run(&mut ctx);
        promoter::run(&mut ctx);
        if ctx.error_count() > 0 {
            bail!(ctx.failure_messages().join("; "));
        }
        info!(
            target: "streamc::checker",
            warnings = ctx.diagnostics().warning_count(),
            "compilation unit checked"
        );

        debug_assert!(
            {
                let untyped = ctx.find_untyped_expressions();
                if !untyped.is_empty() {
                    eprintln!(
                        "Type checker bug: {} expression(s) without a type:",
                        untyped.len()
                    );
                    for m in &untyped {
                        eprintln!("  - {} at {} (id: {})", m.kind, m.location, m.id);
                    }
                }
                untyped.is_empty()
            },
            "All expressions should have a type after checking"
        );

        Ok(TypeCheckerBuilder {
            typed_context: ctx,
            _state: PhantomData,
        })
    }
}

impl TypeCheckerBuilder<TypeCheckerCompleteState> {
    /// Consume the builder and return the typed context.
    #[must_use = "consumes builder and returns the typed context"]
    pub fn typed_context(self) -> TypedContext {
        self.typed_context
    }
}
