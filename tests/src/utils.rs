use streamc_ast::{builder::Builder, nodes::{NodeId, NodeKind, SymbolId}};
use streamc_type_checker::{
    TypeCheckerBuilder,
    options::CheckerOptions,
    symbol_table::{SymbolKind, SymbolTable},
    typed_context::TypedContext,
};
use streamc_types::{Type, TypeFactory};

/// Everything a test needs to assemble a resolved compilation unit by hand.
///
/// Symbols and types are registered up front, the tree is built with `b`, and
/// [`Fixture::type_check`] hands the finished arena to the checker.
pub(crate) struct Fixture {
    pub(crate) b: Builder,
    pub(crate) tf: TypeFactory,
    pub(crate) symbols: SymbolTable,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self {
            b: Builder::new("test.spl"),
            tf: TypeFactory::new(),
            symbols: SymbolTable::new(),
        }
    }

    pub(crate) fn variable(&mut self, name: &str, ty: Type) -> SymbolId {
        self.symbols.add_symbol(
            name,
            SymbolKind::Variable {
                mutable: true,
                is_static: false,
            },
            ty,
        )
    }

    pub(crate) fn constant(&mut self, name: &str, ty: Type) -> SymbolId {
        self.symbols.add_symbol(
            name,
            SymbolKind::Variable {
                mutable: false,
                is_static: false,
            },
            ty,
        )
    }

    pub(crate) fn stream(&mut self, name: &str, tuple: Type) -> SymbolId {
        self.symbols.add_symbol(name, SymbolKind::Stream, tuple)
    }

    /// `ty name = init;` for a fresh mutable variable.
    pub(crate) fn declare(&mut self, name: &str, ty: Type, init: NodeId) -> NodeId {
        let symbol = self.variable(name, ty.clone());
        self.b.local_decl(ty, true, vec![(symbol, Some(init))])
    }

    pub(crate) fn type_check(self, root: NodeId) -> anyhow::Result<TypedContext> {
        self.type_check_with(root, CheckerOptions::default())
    }

    pub(crate) fn type_check_with(
        self,
        root: NodeId,
        options: CheckerOptions,
    ) -> anyhow::Result<TypedContext> {
        let ctx = TypedContext::new(self.b.finish(), root, self.tf, self.symbols)
            .with_options(options);
        Ok(TypeCheckerBuilder::build_typed_context(ctx)?.typed_context())
    }
}

/// The initializer of the first item of a local declaration, as it stands after promotion.
pub(crate) fn initializer(ctx: &TypedContext, decl: NodeId) -> NodeId {
    let NodeKind::LocalDecl { items, .. } = ctx.arena().kind(decl) else {
        panic!("{decl} is not a declaration");
    };
    let NodeKind::LocalDeclItem {
        init: Some(init), ..
    } = ctx.arena().kind(items[0])
    else {
        panic!("{decl} has no initializer");
    };
    *init
}

/// Target type and operand of a cast node, `None` for any other node.
pub(crate) fn cast_of(ctx: &TypedContext, id: NodeId) -> Option<(Type, NodeId)> {
    match ctx.arena().kind(id) {
        NodeKind::Cast { target, expr } => Some((target.clone(), *expr)),
        _ => None,
    }
}
