//! Typed Context - State Shared by the Checker Passes
//!
//! This module provides [`TypedContext`], the compilation-unit state that both passes read and
//! rewrite, and that the driver hands back once checking succeeded.
//!
//! ## Architecture
//!
//! ```text
//! TypedContext
//! ├─ Arena (AST)
//! │  └─ Nodes with a type slot and an analysis-stage watermark
//! ├─ TypeFactory
//! │  └─ Interned types for this unit
//! ├─ SymbolTable
//! │  ├─ Symbols (variables, streams, attributes, type definitions, ...)
//! │  ├─ Function signatures
//! │  └─ Operator models
//! ├─ Diagnostics
//! │  └─ Errors, warnings and details in report order
//! └─ CheckerOptions
//! ```
//!
//! ## Node Types
//!
//! Types live on the nodes themselves, so [`TypedContext::node_type`] is a direct read of the
//! node's slot. After a successful run every expression reachable from the root carries a type;
//! [`TypedContext::find_untyped_expressions`] lists the ones that do not, which is always a
//! checker bug.
//!
//! Statement and clause nodes (blocks, declarations, operator clauses) have no type.
//!
//! ## Promotion Rewrites
//!
//! The promoter never edits nodes in place beyond their type slot. Implicit conversions are
//! new cast nodes whose id replaces the original in the parent's child slot, so ids held by a
//! caller stay valid but may no longer be reachable from the root.

use streamc_ast::{
    arena::Arena,
    nodes::{Location, Node, NodeId, NodeKind},
};
use streamc_types::{Type, TypeFactory};

use crate::{
    diagnostics::{Diagnostics, Severity},
    options::CheckerOptions,
    symbol_table::SymbolTable,
};

#[derive(Debug)]
pub struct TypedContext {
    pub(crate) arena: Arena,
    pub(crate) root: NodeId,
    pub(crate) types: TypeFactory,
    pub(crate) symbols: SymbolTable,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) options: CheckerOptions,
}

impl Default for TypedContext {
    /// An empty compilation unit.
    fn default() -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc(
            NodeKind::CompilationUnit {
                definitions: Vec::new(),
            },
            Location::default(),
        );
        Self::new(arena, root, TypeFactory::new(), SymbolTable::new())
    }
}

impl TypedContext {
    /// Bundles a resolved tree with the factory and symbols its types and ids came from.
    #[must_use]
    pub fn new(arena: Arena, root: NodeId, types: TypeFactory, symbols: SymbolTable) -> Self {
        Self {
            arena,
            root,
            types,
            symbols,
            diagnostics: Diagnostics::new(),
            options: CheckerOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: CheckerOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use = "this is a pure lookup with no side effects"]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    #[must_use = "this is a pure lookup with no side effects"]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use = "this is a pure lookup with no side effects"]
    pub fn types(&self) -> &TypeFactory {
        &self.types
    }

    #[must_use = "this is a pure lookup with no side effects"]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    #[must_use = "this is a pure lookup with no side effects"]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    #[must_use = "this is a pure lookup with no side effects"]
    pub fn options(&self) -> &CheckerOptions {
        &self.options
    }

    /// The semantic type of `id`, if a pass assigned one.
    ///
    /// # Example
    ///
    /// ```ignore
    /// if let Some(ty) = typed_context.node_type(node_id) {
    ///     println!("{node_id} has type {ty}");
    /// }
    /// ```
    #[must_use = "this is a pure lookup with no side effects"]
    pub fn node_type(&self, id: NodeId) -> Option<Type> {
        self.arena.ty(id).cloned()
    }

    /// Errors that fail the build; warnings count too under `warnings_as_errors`.
    #[must_use]
    pub fn error_count(&self) -> usize {
        let errors = self.diagnostics.error_count();
        if self.options.warnings_as_errors {
            errors + self.diagnostics.warning_count()
        } else {
            errors
        }
    }

    /// Messages that make up the driver's failure report, capped by `max_reported_errors`.
    pub(crate) fn failure_messages(&self) -> Vec<String> {
        let warnings_fail = self.options.warnings_as_errors;
        let failing = self
            .diagnostics
            .entries()
            .iter()
            .filter(|entry| match entry.severity {
                Severity::Error => true,
                Severity::Warning => warnings_fail,
                Severity::Detail => false,
            });
        failing
            .take(self.options.max_reported_errors.unwrap_or(usize::MAX))
            .map(|entry| entry.error.to_string())
            .collect()
    }

    /// Nodes reachable from the root that match `fn_predicate`, in source order.
    #[must_use = "returns filtered nodes without side effects"]
    pub fn filter_nodes<T: Fn(&Node) -> bool>(&self, fn_predicate: T) -> Vec<NodeId> {
        self.arena
            .descendants(self.root)
            .into_iter()
            .filter(|id| fn_predicate(self.arena.get(*id)))
            .collect()
    }

    /// Verifies that every expression reachable from the root has a type.
    ///
    /// An empty list means the passes typed the whole tree.
    #[must_use = "returns list of missing expression types for verification"]
    pub fn find_untyped_expressions(&self) -> Vec<MissingExpressionType> {
        self.filter_nodes(|node| node.kind.is_expression() && node.ty.is_none())
            .into_iter()
            .map(|id| {
                let node = self.arena.get(id);
                MissingExpressionType {
                    id,
                    kind: expression_kind_name(&node.kind).to_string(),
                    location: node.location.clone(),
                }
            })
            .collect()
    }
}

fn expression_kind_name(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Identifier { .. } => "Identifier",
        NodeKind::AttributeExpr { .. } => "AttributeExpr",
        NodeKind::Infix { .. } => "Infix",
        NodeKind::Prefix { .. } => "Prefix",
        NodeKind::Postfix { .. } => "Postfix",
        NodeKind::Conditional { .. } => "Conditional",
        NodeKind::Cast { .. } => "Cast",
        NodeKind::Call { .. } => "Call",
        NodeKind::Subscript { .. } => "Subscript",
        NodeKind::Unwrap { .. } => "Unwrap",
        NodeKind::UnwrapOrElse { .. } => "UnwrapOrElse",
        NodeKind::IsPresent { .. } => "IsPresent",
        _ => "Literal",
    }
}

/// Information about an expression missing its type after checking.
#[derive(Debug)]
pub struct MissingExpressionType {
    pub id: NodeId,
    pub kind: String,
    pub location: Location,
}
