//! Promotion contexts.
//!
//! While the promoter descends, every promotion site pushes a frame that knows which type its
//! child should end up with. Frames hold node ids rather than types and answer lazily: a
//! conditional branch asks for its sibling's type, which is only final once the sibling has been
//! promoted, and a call argument asks for a generic substitution over all arguments.

use streamc_ast::nodes::{FunctionId, NodeId, NodeKind};
use streamc_types::{
    Type, TypeKind,
    queries::{contains_null, element_type, subscript_type},
    unifier::Unifier,
};

use crate::typed_context::TypedContext;

/// What the node currently being promoted is nested in.
#[derive(Debug, Clone)]
pub(crate) enum PromotionContext {
    /// No expectation.
    Start,
    ListElement { literal: NodeId },
    SetElement { literal: NodeId },
    MapKey { literal: NodeId },
    MapValue { literal: NodeId },
    LocalDeclItem { declared: Type },
    Subscript { base: NodeId },
    Cast { target: Type },
    /// The right operand of `=`, `==` or `!=`.
    Infix { lhs: NodeId },
    OpInvokeOutput { attribute: NodeId },
    AttributeAssign { name: String },
    Return { function: Option<FunctionId> },
    Conditional {
        then_expr: NodeId,
        else_expr: NodeId,
        in_then: bool,
    },
    CallParam { call: NodeId, position: usize },
    OpActual { parameter: Option<Type> },
}

#[derive(Debug)]
pub(crate) struct ContextStack {
    frames: Vec<PromotionContext>,
}

impl ContextStack {
    pub(crate) fn new() -> Self {
        Self {
            frames: vec![PromotionContext::Start],
        }
    }

    pub(crate) fn push(&mut self, context: PromotionContext) {
        self.frames.push(context);
    }

    pub(crate) fn pop(&mut self) {
        assert!(
            self.frames.len() > 1,
            "promotion context stack popped past its start frame"
        );
        self.frames.pop();
    }

    /// The type the innermost frame expects.
    pub(crate) fn current_type(&self, ctx: &TypedContext) -> Type {
        self.frame_type(ctx, self.frames.len() - 1)
    }

    fn enclosing_type(&self, ctx: &TypedContext, index: usize) -> Type {
        match index.checked_sub(1) {
            Some(outer) => self.frame_type(ctx, outer),
            None => ctx.types.unknown(),
        }
    }

    fn frame_type(&self, ctx: &TypedContext, index: usize) -> Type {
        let tf = &ctx.types;
        match &self.frames[index] {
            PromotionContext::Start => tf.unknown(),
            PromotionContext::ListElement { literal } | PromotionContext::SetElement { literal } => {
                let element = element_type(tf, &node_type(ctx, *literal));
                if is_resolved(&element) {
                    element
                } else {
                    element_type(tf, &self.enclosing_type(ctx, index))
                }
            }
            PromotionContext::MapKey { literal } => {
                let key = map_parts(&node_type(ctx, *literal)).map(|(key, _)| key);
                match key {
                    Some(key) if is_resolved(&key) => key,
                    _ => map_parts(&self.enclosing_type(ctx, index))
                        .map_or_else(|| tf.unknown(), |(key, _)| key),
                }
            }
            PromotionContext::MapValue { literal } => {
                let value = map_parts(&node_type(ctx, *literal)).map(|(_, value)| value);
                match value {
                    Some(value) if is_resolved(&value) => value,
                    _ => map_parts(&self.enclosing_type(ctx, index))
                        .map_or_else(|| tf.unknown(), |(_, value)| value),
                }
            }
            PromotionContext::LocalDeclItem { declared } => declared.clone(),
            PromotionContext::Subscript { base } => {
                let is_stream = match ctx.arena.kind(*base) {
                    NodeKind::Identifier {
                        symbol: Some(symbol),
                        ..
                    } => ctx.symbols.symbol(*symbol).is_stream(),
                    _ => false,
                };
                let collection = node_type(ctx, *base);
                if is_stream {
                    tf.uint32()
                } else if collection.is_string() {
                    // character positions stay integral
                    tf.unknown()
                } else {
                    subscript_type(tf, &collection)
                }
            }
            PromotionContext::Cast { target } => target.clone(),
            PromotionContext::Infix { lhs } => node_type(ctx, *lhs),
            PromotionContext::OpInvokeOutput { attribute } => node_type(ctx, *attribute),
            PromotionContext::AttributeAssign { name } => (0..index)
                .rev()
                .find_map(|outer| {
                    let owner = self.frame_type(ctx, outer);
                    owner
                        .strip_optional()
                        .tuple_attribute(name)
                        .filter(|ty| is_resolved(ty))
                        .cloned()
                })
                .unwrap_or_else(|| tf.unknown()),
            PromotionContext::Return { function } => function.map_or_else(
                || tf.unknown(),
                |function| ctx.symbols.function(function).return_type.clone(),
            ),
            PromotionContext::Conditional {
                then_expr,
                else_expr,
                in_then,
            } => {
                let other = node_type(ctx, if *in_then { *else_expr } else { *then_expr });
                if is_resolved(&other) {
                    other
                } else {
                    self.enclosing_type(ctx, index)
                }
            }
            PromotionContext::CallParam { call, position } => {
                call_parameter_type(ctx, *call, *position)
            }
            PromotionContext::OpActual { parameter } => {
                parameter.clone().unwrap_or_else(|| tf.unknown())
            }
        }
    }
}

fn node_type(ctx: &TypedContext, id: NodeId) -> Type {
    ctx.arena
        .ty(id)
        .cloned()
        .unwrap_or_else(|| ctx.types.unknown())
}

/// Neither unknown nor still carrying an unresolved `null`.
fn is_resolved(ty: &Type) -> bool {
    !ty.is_unknown() && !contains_null(ty)
}

/// Key and value types of a map, looking through one optional.
pub(crate) fn map_parts(ty: &Type) -> Option<(Type, Type)> {
    match ty.strip_optional().kind() {
        TypeKind::Map(key, value) | TypeKind::BMap(key, value, _) => {
            Some((key.clone(), value.clone()))
        }
        _ => None,
    }
}

/// The formal type of argument `position` after generic substitution.
///
/// A formal that is a bare type formal prefers the type of a sibling argument bound to the same
/// formal, provided that argument carries no `null`: in `f(null, 3)` against `f(T, T)` the second
/// argument decides `T`.
fn call_parameter_type(ctx: &TypedContext, call: NodeId, position: usize) -> Type {
    let NodeKind::Call {
        name,
        function: Some(function),
        args,
    } = ctx.arena.kind(call)
    else {
        return ctx.types.unknown();
    };
    let signature = ctx.symbols.function(*function);
    let Some(formal) = signature.formals.get(position) else {
        return ctx.types.unknown();
    };
    let actuals: Vec<Type> = args.iter().map(|arg| node_type(ctx, *arg)).collect();

    if let TypeKind::TypeFormal { identifier, .. } = formal.ty.kind() {
        let sibling = signature
            .formals
            .iter()
            .zip(&actuals)
            .enumerate()
            .find_map(|(index, (other, actual))| {
                let same_formal = matches!(
                    other.ty.kind(),
                    TypeKind::TypeFormal { identifier: other, .. } if other == identifier
                );
                (index != position && same_formal && is_resolved(actual)).then(|| actual.clone())
            });
        if let Some(sibling) = sibling {
            return sibling;
        }
    }

    Unifier::unify_call(name, &actuals, &signature.formal_types()).substitute(&ctx.types, &formal.ty)
}
