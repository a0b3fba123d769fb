//! Side-effect analysis of a single expression.
//!
//! A variable that one part of an expression modifies may not be read or modified by another
//! part of the same expression, and at most one stateful function may be called. Assignments at
//! statement level are checked one side at a time by the caller, so `x = f(x)` stays legal.

use streamc_ast::{
    arena::Arena,
    nodes::{Location, NodeId, NodeKind, PrefixOp, SymbolId},
};

use crate::{
    diagnostics::DiagnosticSink,
    errors::TypeCheckError,
    symbol_table::SymbolTable,
    typed_context::TypedContext,
};

struct Occurrence {
    node: NodeId,
    symbol: SymbolId,
    location: Location,
}

struct StatefulCall {
    name: String,
    location: Location,
}

#[derive(Default)]
struct Effects {
    uses: Vec<Occurrence>,
    modifications: Vec<Occurrence>,
    stateful_calls: Vec<StatefulCall>,
}

/// Reports use/mod conflicts and repeated stateful calls inside `expr`.
pub(crate) fn check(ctx: &mut TypedContext, expr: NodeId) {
    let mut effects = Effects::default();
    collect(&ctx.arena, &ctx.symbols, expr, &mut effects);

    for modification in &effects.modifications {
        let other = effects
            .uses
            .iter()
            .find(|other| other.symbol == modification.symbol && other.node != modification.node);
        if let Some(other) = other {
            let name = ctx.symbols.symbol(modification.symbol).name.clone();
            ctx.diagnostics.error_with_detail(
                TypeCheckError::UseModConflict {
                    name: name.clone(),
                    location: modification.location.clone(),
                },
                TypeCheckError::UseModConflictDetail {
                    name,
                    location: other.location.clone(),
                },
            );
        }
    }

    if let [first, second, ..] = effects.stateful_calls.as_slice() {
        ctx.diagnostics.error(TypeCheckError::TwoStatefulCalls {
            first: first.name.clone(),
            second: second.name.clone(),
            location: second.location.clone(),
        });
    }
}

fn collect(arena: &Arena, symbols: &SymbolTable, id: NodeId, effects: &mut Effects) {
    match arena.kind(id) {
        NodeKind::Identifier {
            symbol: Some(symbol),
            ..
        } => effects.uses.push(Occurrence {
            node: id,
            symbol: *symbol,
            location: arena.location(id).clone(),
        }),
        NodeKind::Infix { op, lhs, .. } if op.is_assignment() => {
            record_modification(arena, *lhs, effects);
        }
        NodeKind::Prefix {
            op: PrefixOp::Increment | PrefixOp::Decrement,
            operand,
        }
        | NodeKind::Postfix { operand, .. } => record_modification(arena, *operand, effects),
        NodeKind::Call {
            name,
            function: Some(function),
            args,
        } => {
            let signature = symbols.function(*function);
            if signature.stateful {
                effects.stateful_calls.push(StatefulCall {
                    name: name.clone(),
                    location: arena.location(id).clone(),
                });
            }
            for (arg, formal) in args.iter().zip(&signature.formals) {
                if formal.mutable {
                    record_modification(arena, *arg, effects);
                }
            }
        }
        _ => {}
    }
    for child in arena.children(id) {
        collect(arena, symbols, child, effects);
    }
}

fn record_modification(arena: &Arena, target: NodeId, effects: &mut Effects) {
    if let Some((node, symbol)) = modified_variable(arena, target) {
        effects.modifications.push(Occurrence {
            node,
            symbol,
            location: arena.location(node).clone(),
        });
    }
}

/// The identifier whose storage an assignment target writes to.
fn modified_variable(arena: &Arena, target: NodeId) -> Option<(NodeId, SymbolId)> {
    match arena.kind(target) {
        NodeKind::Identifier {
            symbol: Some(symbol),
            ..
        } => Some((target, *symbol)),
        NodeKind::AttributeExpr { base, .. }
        | NodeKind::Subscript { base, .. }
        | NodeKind::Unwrap { operand: base } => modified_variable(arena, *base),
        _ => None,
    }
}
