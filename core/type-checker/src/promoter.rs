//! Type Promoter
//!
//! The second checker pass. It makes implicit conversions explicit: wherever a value flows into
//! a slot of an optional type (an initializer, an assignment, an argument, a returned value, an
//! output attribute) the value is wrapped in a cast node, `null` literals take the optional type
//! they are used as, and container literals with `null` entries get optional element types. Only
//! initializers also admit other implicit casts, such as numeric widening.
//!
//! Nodes the finder typed `unknown` are left alone, so the pass can run over a tree with finder
//! errors without repeating them.
//!
//! Promotion sites push a [`PromotionContext`] before visiting their child; the child is rewritten
//! bottom-up once its own subtree is done. All rewrites go through
//! [`TypePromoter::perform_promotions`].

use rustc_hash::FxHashSet;
use streamc_ast::{
    arena::Arena,
    nodes::{AnalysisStage, FunctionId, InfixOp, NodeId, NodeKind},
    visitor::Transformer,
};
use streamc_types::{
    Type,
    cast::{explicit_cast_allowed, implicit_init_allowed},
    constraints::satisfies_constraint,
    queries::{element_type, key_type},
};
use tracing::{debug, trace};

use crate::{
    contexts::{ContextStack, PromotionContext, map_parts},
    diagnostics::DiagnosticSink,
    errors::TypeCheckError,
    operator_model::{ExpressionMode, OperatorModel},
    symbol_table::SymbolKind,
    type_finder,
    typed_context::TypedContext,
};

pub(crate) fn run(ctx: &mut TypedContext) {
    let root = ctx.root;
    debug!(target: "streamc::promoter", %root, "promoting types");
    TypePromoter::new(ctx).visit(root);
    report_uncasted_nulls(ctx);
    debug!(
        target: "streamc::promoter",
        errors = ctx.diagnostics.error_count(),
        "types promoted"
    );
}

/// A `null` whose type could not be inferred must be given one with a cast.
fn report_uncasted_nulls(ctx: &mut TypedContext) {
    let nodes = ctx.arena.descendants(ctx.root);
    let cast_operands: FxHashSet<NodeId> = nodes
        .iter()
        .filter_map(|id| match ctx.arena.kind(*id) {
            NodeKind::Cast { expr, .. } => Some(*expr),
            _ => None,
        })
        .collect();
    let uncasted: Vec<NodeId> = nodes
        .into_iter()
        .filter(|id| {
            matches!(ctx.arena.kind(*id), NodeKind::NullLiteral)
                && ctx.arena.ty(*id).is_some_and(Type::is_null)
                && !cast_operands.contains(id)
        })
        .collect();
    for id in uncasted {
        let location = ctx.arena.location(id).clone();
        ctx.diagnostics
            .error(TypeCheckError::CantHaveUncastedNull { location });
    }
}

pub(crate) struct TypePromoter<'a> {
    ctx: &'a mut TypedContext,
    contexts: ContextStack,
    function: Option<FunctionId>,
    invocation: Option<NodeId>,
}

impl Transformer for TypePromoter<'_> {
    fn arena_mut(&mut self) -> &mut Arena {
        &mut self.ctx.arena
    }

    fn visit(&mut self, id: NodeId) -> NodeId {
        if !self.ctx.arena.advance_stage(id, AnalysisStage::Promoted) {
            return id;
        }
        trace!(target: "streamc::promoter", node = %id, "visit");
        match self.ctx.arena.kind(id).clone() {
            NodeKind::FunctionDef { function, body } => {
                let saved = self.function.replace(function);
                self.visit(body);
                self.function = saved;
            }
            NodeKind::OpInvoke { .. } => {
                let saved = self.invocation.replace(id);
                self.visit_children(id);
                self.invocation = saved;
            }
            NodeKind::LocalDecl { ty, items, .. } => {
                for item in items {
                    if !self.ctx.arena.advance_stage(item, AnalysisStage::Promoted) {
                        continue;
                    }
                    if let NodeKind::LocalDeclItem {
                        init: Some(init), ..
                    } = *self.ctx.arena.kind(item)
                    {
                        let declared = ty.clone();
                        let widening = implicit_init_allowed(&self.ty(init), &declared);
                        self.promote_child(
                            item,
                            init,
                            PromotionContext::LocalDeclItem { declared },
                            widening,
                            false,
                        );
                    }
                }
            }
            NodeKind::Return { expr: Some(expr) } => {
                let function = self.function;
                self.promote_child(id, expr, PromotionContext::Return { function }, false, false);
            }
            NodeKind::OpInvokeOutput { assignments, .. } => {
                for assignment in assignments {
                    self.output_assignment(assignment);
                }
            }
            NodeKind::OpActual { name, values } => {
                let parameter = self.actual_parameter_type(&name);
                for value in values {
                    let context = PromotionContext::OpActual {
                        parameter: parameter.clone(),
                    };
                    self.promote_child(id, value, context, false, true);
                }
            }

            NodeKind::Infix { op, lhs, rhs } => self.infix(id, op, lhs, rhs),
            NodeKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => self.conditional(id, cond, then_expr, else_expr),
            NodeKind::Cast { target, expr } => {
                self.in_context(PromotionContext::Cast { target: target.clone() }, |promoter| {
                    let expr = promoter.visit_child(id, expr);
                    if is_promotable_under_cast(promoter.ctx.arena.kind(expr)) {
                        let (promoted, _) = promoter.perform_promotions(&target, expr, false, false);
                        promoter.replace(id, expr, promoted);
                    }
                });
            }
            NodeKind::Call { args, .. } => {
                for (position, arg) in args.into_iter().enumerate() {
                    let context = PromotionContext::CallParam { call: id, position };
                    self.promote_child(id, arg, context, false, true);
                }
            }
            NodeKind::Subscript { base, index } => {
                self.in_context(PromotionContext::Start, |promoter| {
                    promoter.visit_child(id, base);
                });
                if let NodeKind::Slice { lower, upper } = *self.ctx.arena.kind(index) {
                    self.ctx.arena.advance_stage(index, AnalysisStage::Promoted);
                    for bound in [lower, upper].into_iter().flatten() {
                        self.promote_child(index, bound, PromotionContext::Subscript { base }, false, false);
                    }
                } else {
                    self.promote_child(id, index, PromotionContext::Subscript { base }, false, false);
                }
            }

            NodeKind::ListLiteral { elements } => {
                for element in elements {
                    self.in_context(PromotionContext::ListElement { literal: id }, |promoter| {
                        promoter.visit_child(id, element);
                    });
                }
                self.unify_literal_elements(id);
            }
            NodeKind::SetLiteral { elements } => {
                for element in elements {
                    self.in_context(PromotionContext::SetElement { literal: id }, |promoter| {
                        promoter.visit_child(id, element);
                    });
                }
                self.unify_literal_elements(id);
            }
            NodeKind::MapLiteral { entries } => {
                for (key, value) in entries {
                    self.in_context(PromotionContext::MapKey { literal: id }, |promoter| {
                        promoter.visit_child(id, key);
                    });
                    self.in_context(PromotionContext::MapValue { literal: id }, |promoter| {
                        promoter.visit_child(id, value);
                    });
                }
                self.unify_literal_elements(id);
            }
            NodeKind::TupleLiteral { attributes } => {
                for attribute in attributes {
                    if !self.ctx.arena.advance_stage(attribute, AnalysisStage::Promoted) {
                        continue;
                    }
                    if let NodeKind::AttributeAssign { name, value } =
                        self.ctx.arena.kind(attribute).clone()
                    {
                        let context = PromotionContext::AttributeAssign { name };
                        self.promote_child(attribute, value, context, false, false);
                    }
                }
                self.rebuild_tuple_type(id);
            }

            kind if kind.is_expression() => {
                self.in_context(PromotionContext::Start, |promoter| promoter.visit_children(id));
            }
            _ => self.visit_children(id),
        }
        id
    }
}

impl<'a> TypePromoter<'a> {
    fn new(ctx: &'a mut TypedContext) -> Self {
        Self {
            ctx,
            contexts: ContextStack::new(),
            function: None,
            invocation: None,
        }
    }

    fn ty(&self, id: NodeId) -> Type {
        self.ctx
            .arena
            .ty(id)
            .cloned()
            .unwrap_or_else(|| self.ctx.types.unknown())
    }

    fn in_context(&mut self, context: PromotionContext, f: impl FnOnce(&mut Self)) {
        self.contexts.push(context);
        f(self);
        self.contexts.pop();
    }

    fn replace(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if old != new {
            self.ctx.arena.replace_child(parent, old, new);
        }
    }

    /// Visits `child` under `context`, then promotes it to the type the context expects.
    fn promote_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        context: PromotionContext,
        allow_implicit: bool,
        is_parameter: bool,
    ) -> NodeId {
        self.contexts.push(context);
        let child = self.visit_child(parent, child);
        let target = self.contexts.current_type(self.ctx);
        let (promoted, _) = self.perform_promotions(&target, child, allow_implicit, is_parameter);
        self.contexts.pop();
        self.replace(parent, child, promoted);
        promoted
    }

    /// Rewrites `node` so that its type becomes `target`, when the language allows it.
    ///
    /// Returns the node now standing in `node`'s place and whether a promotion applied. Equal
    /// types count as promoted without a rewrite.
    pub(crate) fn perform_promotions(
        &mut self,
        target: &Type,
        node: NodeId,
        allow_implicit: bool,
        is_parameter: bool,
    ) -> (NodeId, bool) {
        let current = self.ty(node);
        if target.is_unknown() || current.is_unknown() {
            return (node, false);
        }
        if *target == current {
            return (node, true);
        }

        let kind = self.ctx.arena.kind(node).clone();
        if matches!(kind, NodeKind::NullLiteral) {
            self.ctx.arena.set_type(node, target.clone());
            if !target.is_optional() {
                let location = self.ctx.arena.location(node).clone();
                self.ctx.diagnostics.error(TypeCheckError::CantPromoteNull {
                    target: target.clone(),
                    location,
                });
            }
            return (node, true);
        }
        if target.is_optional_of_same(&current) {
            return (self.wrap_in_cast(node, target), true);
        }
        if allow_implicit && explicit_cast_allowed(&self.ctx.types, &current, target) {
            return (self.wrap_in_cast(node, target), true);
        }

        match kind {
            NodeKind::TupleLiteral { .. }
            | NodeKind::ListLiteral { .. }
            | NodeKind::SetLiteral { .. }
            | NodeKind::MapLiteral { .. } => {
                if let Some(underlying) = target.underlying() {
                    let (inner, promoted) =
                        self.perform_promotions(underlying, node, allow_implicit, is_parameter);
                    if !promoted {
                        return (node, false);
                    }
                    return (self.wrap_in_cast(inner, target), true);
                }
                let promoted = if matches!(kind, NodeKind::TupleLiteral { .. }) {
                    self.promote_tuple_literal(target, node, allow_implicit)
                } else {
                    self.promote_container_literal(target, node, allow_implicit)
                };
                (node, promoted)
            }
            NodeKind::NumericLiteral { .. } if allow_implicit => {
                let Some(underlying) = target.underlying() else {
                    return (node, false);
                };
                if !satisfies_constraint(underlying, "numeric", false) || *underlying == current {
                    return (node, false);
                }
                trace!(target: "streamc::promoter", node = %node, to = %target, "retarget literal");
                if is_parameter {
                    self.ctx.arena.set_type(node, underlying.clone());
                    return (self.wrap_in_cast(node, target), true);
                }
                self.ctx.arena.set_type(node, target.clone());
                (node, true)
            }
            _ => (node, false),
        }
    }

    fn wrap_in_cast(&mut self, node: NodeId, target: &Type) -> NodeId {
        if self.ty(node) == *target {
            return node;
        }
        let location = self.ctx.arena.location(node).clone();
        let cast = self.ctx.arena.alloc(
            NodeKind::Cast {
                target: target.clone(),
                expr: node,
            },
            location,
        );
        type_finder::type_node(self.ctx, cast);
        self.ctx.arena.advance_stage(cast, AnalysisStage::Promoted);
        trace!(target: "streamc::promoter", node = %node, %cast, to = %target, "inserted cast");
        cast
    }

    /// Promotes attribute values by name; the literal and the target must name the same
    /// attributes.
    fn promote_tuple_literal(&mut self, target: &Type, node: NodeId, allow_implicit: bool) -> bool {
        let NodeKind::TupleLiteral { attributes } = self.ctx.arena.kind(node).clone() else {
            return false;
        };
        let Some(expected) = target.tuple_attributes() else {
            return false;
        };
        let assignments: Vec<(NodeId, String, NodeId)> = attributes
            .iter()
            .filter_map(|attribute| match self.ctx.arena.kind(*attribute) {
                NodeKind::AttributeAssign { name, value } => Some((*attribute, name.clone(), *value)),
                _ => None,
            })
            .collect();
        let same_names = assignments.len() == expected.len()
            && assignments
                .iter()
                .all(|(_, name, _)| target.tuple_attribute(name).is_some());
        if !same_names {
            return false;
        }
        for (attribute, name, value) in assignments {
            if let Some(expected) = target.tuple_attribute(&name).cloned() {
                let (promoted, _) = self.perform_promotions(&expected, value, allow_implicit, false);
                self.replace(attribute, value, promoted);
            }
        }
        self.rebuild_tuple_type(node);
        true
    }

    fn promote_container_literal(
        &mut self,
        target: &Type,
        node: NodeId,
        allow_implicit: bool,
    ) -> bool {
        let current = self.ty(node);
        match self.ctx.arena.kind(node).clone() {
            NodeKind::ListLiteral { elements } | NodeKind::SetLiteral { elements } => {
                if !target.is_collection() || map_parts(target).is_some() {
                    return false;
                }
                let slot = settled_slot(
                    &element_type(&self.ctx.types, &current),
                    element_type(&self.ctx.types, target),
                );
                let elements = self.promote_entries(node, &elements, &slot, allow_implicit);
                let element = self.entries_type(&elements, slot);
                self.set_container_type(node, None, element);
            }
            NodeKind::MapLiteral { entries } => {
                let (Some((key, value)), Some((current_key, current_value))) =
                    (map_parts(target), map_parts(&current))
                else {
                    return false;
                };
                let key = settled_slot(&current_key, key);
                let value = settled_slot(&current_value, value);
                let (keys, values): (Vec<NodeId>, Vec<NodeId>) = entries.into_iter().unzip();
                let keys = self.promote_entries(node, &keys, &key, allow_implicit);
                let values = self.promote_entries(node, &values, &value, allow_implicit);
                let key = self.entries_type(&keys, key);
                let value = self.entries_type(&values, value);
                self.set_container_type(node, Some(key), value);
            }
            _ => return false,
        }
        true
    }

    /// Promotes each entry toward `target` and returns the entries now standing in their place.
    fn promote_entries(
        &mut self,
        literal: NodeId,
        entries: &[NodeId],
        target: &Type,
        allow_implicit: bool,
    ) -> Vec<NodeId> {
        entries
            .iter()
            .map(|&entry| {
                let (promoted, _) = self.perform_promotions(target, entry, allow_implicit, false);
                self.replace(literal, entry, promoted);
                promoted
            })
            .collect()
    }

    /// The common type of promoted entries, or `fallback` when they disagree or there are none.
    fn entries_type(&self, entries: &[NodeId], fallback: Type) -> Type {
        let mut types = entries.iter().map(|entry| self.ty(*entry));
        match types.next() {
            Some(first) if types.all(|ty| ty == first) => first,
            _ => fallback,
        }
    }

    fn set_container_type(&mut self, literal: NodeId, key: Option<Type>, element: Type) {
        let tf = &self.ctx.types;
        let ty = match (self.ctx.arena.kind(literal), key) {
            (NodeKind::SetLiteral { .. }, _) => tf.set(element),
            (NodeKind::MapLiteral { .. }, Some(key)) => tf.map(key, element),
            _ => tf.list(element),
        };
        self.ctx.arena.set_type(literal, ty);
    }

    /// Settles the element types of a container literal once its entries are promoted.
    ///
    /// Non-null entries must agree up to one level of optional. A `null` entry makes the element
    /// type optional; a literal of nothing but `null` takes its element type from the context.
    fn unify_literal_elements(&mut self, literal: NodeId) {
        match self.ctx.arena.kind(literal).clone() {
            NodeKind::ListLiteral { elements } | NodeKind::SetLiteral { elements } => {
                let expected = element_type(&self.ctx.types, &self.contexts.current_type(self.ctx));
                if let Some(element) = self.unified_entry_type(&elements, expected) {
                    self.promote_entries(literal, &elements, &element, false);
                    self.set_container_type(literal, None, element);
                }
            }
            NodeKind::MapLiteral { entries } => {
                let (keys, values): (Vec<NodeId>, Vec<NodeId>) = entries.into_iter().unzip();
                let expected = map_parts(&self.contexts.current_type(self.ctx));
                let (expected_key, expected_value) = match expected {
                    Some((key, value)) => (key, value),
                    None => (self.ctx.types.unknown(), self.ctx.types.unknown()),
                };
                let key = self.unified_entry_type(&keys, expected_key);
                let value = self.unified_entry_type(&values, expected_value);
                if let (Some(key), Some(value)) = (key, value) {
                    self.promote_entries(literal, &keys, &key, false);
                    self.promote_entries(literal, &values, &value, false);
                    self.set_container_type(literal, Some(key), value);
                }
            }
            _ => {}
        }
    }

    fn unified_entry_type(&self, entries: &[NodeId], expected: Type) -> Option<Type> {
        let mut concrete: Option<Type> = None;
        let (mut saw_null, mut saw_optional) = (false, false);
        for entry in entries {
            let ty = self.ty(*entry);
            if ty.is_null() {
                saw_null = true;
                continue;
            }
            if ty.is_unknown() {
                return None;
            }
            saw_optional |= ty.is_optional();
            let base = ty.strip_optional().clone();
            match &concrete {
                None => concrete = Some(base),
                Some(existing) if *existing == base => {}
                Some(_) => return None,
            }
        }
        match concrete {
            Some(base) if saw_null || saw_optional => Some(self.ctx.types.optional(base)),
            Some(base) => Some(base),
            None if saw_null && !expected.is_unknown() => Some(expected),
            None => None,
        }
    }

    fn rebuild_tuple_type(&mut self, literal: NodeId) {
        let NodeKind::TupleLiteral { attributes } = self.ctx.arena.kind(literal) else {
            return;
        };
        let attributes = attributes
            .iter()
            .filter_map(|attribute| match self.ctx.arena.kind(*attribute) {
                NodeKind::AttributeAssign { name, value } => Some((name.clone(), self.ty(*value))),
                _ => None,
            })
            .collect();
        let ty = self.ctx.types.tuple(attributes);
        self.ctx.arena.set_type(literal, ty);
    }

    fn output_assignment(&mut self, assignment: NodeId) {
        if !self.ctx.arena.advance_stage(assignment, AnalysisStage::Promoted) {
            return;
        }
        let NodeKind::Infix { lhs, rhs, .. } = *self.ctx.arena.kind(assignment) else {
            return;
        };
        self.ctx.arena.advance_stage(lhs, AnalysisStage::Promoted);
        let context = PromotionContext::OpInvokeOutput { attribute: lhs };
        self.promote_child(assignment, rhs, context, false, false);
    }

    /// The declared type of an actual of the enclosing invocation, for value parameters only.
    fn actual_parameter_type(&self, name: &str) -> Option<Type> {
        let invocation = self.invocation?;
        let NodeKind::OpInvoke { operator, .. } = self.ctx.arena.kind(invocation) else {
            return None;
        };
        match self.ctx.symbols.operator(*operator) {
            OperatorModel::Primitive(primitive) => {
                primitive.parameters.get(name).map(|parameter| parameter.ty.clone())
            }
            OperatorModel::Composite(composite) => {
                let symbol = self.ctx.symbols.symbol(*composite.formals.get(name)?);
                matches!(
                    symbol.kind,
                    SymbolKind::CompositeFormal {
                        mode: ExpressionMode::Expression
                    }
                )
                .then(|| symbol.ty.clone())
            }
        }
    }

    fn infix(&mut self, id: NodeId, op: InfixOp, lhs: NodeId, rhs: NodeId) {
        match op {
            InfixOp::Assign => {
                let lhs = self.visit_in_start(id, lhs);
                self.promote_child(id, rhs, PromotionContext::Infix { lhs }, false, false);
            }
            InfixOp::Eq | InfixOp::NotEq => {
                let lhs = self.visit_in_start(id, lhs);
                let rhs = self.in_infix_context(id, lhs, rhs);
                let left = self.ty(lhs);
                let (promoted, done) = self.perform_promotions(&left, rhs, false, false);
                self.replace(id, rhs, promoted);
                if !done {
                    let right = self.ty(rhs);
                    let (promoted, _) = self.perform_promotions(&right, lhs, false, false);
                    self.replace(id, lhs, promoted);
                }
            }
            InfixOp::In => {
                let lhs = self.visit_in_start(id, lhs);
                let rhs = self.visit_in_start(id, rhs);
                let collection = self.ty(rhs);
                let member = if map_parts(&collection).is_some() {
                    key_type(&collection)
                } else {
                    element_type(&self.ctx.types, &collection)
                };
                let (promoted, _) = self.perform_promotions(&member, lhs, false, false);
                self.replace(id, lhs, promoted);
            }
            _ => {
                self.visit_in_start(id, lhs);
                self.visit_in_start(id, rhs);
            }
        }
    }

    fn visit_in_start(&mut self, parent: NodeId, child: NodeId) -> NodeId {
        self.contexts.push(PromotionContext::Start);
        let child = self.visit_child(parent, child);
        self.contexts.pop();
        child
    }

    fn in_infix_context(&mut self, parent: NodeId, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.contexts.push(PromotionContext::Infix { lhs });
        let rhs = self.visit_child(parent, rhs);
        self.contexts.pop();
        rhs
    }

    /// Each branch is promoted toward the other one, or toward the expected type when the other
    /// branch has no concrete type yet.
    fn conditional(&mut self, id: NodeId, cond: NodeId, then_expr: NodeId, else_expr: NodeId) {
        self.visit_in_start(id, cond);
        let then_expr = self.promote_child(
            id,
            then_expr,
            PromotionContext::Conditional {
                then_expr,
                else_expr,
                in_then: true,
            },
            false,
            false,
        );
        let else_expr = self.promote_child(
            id,
            else_expr,
            PromotionContext::Conditional {
                then_expr,
                else_expr,
                in_then: false,
            },
            false,
            false,
        );
        if self.ty(id).is_unknown() {
            return;
        }
        let (then_type, else_type) = (self.ty(then_expr), self.ty(else_expr));
        let ty = if then_type.is_null() || then_type.is_unknown() {
            else_type
        } else {
            then_type
        };
        self.ctx.arena.set_type(id, ty);
    }
}

/// A literal whose entries were settled as `optional<E>` keeps that slot type where `E` is
/// expected; promoting its `null` entries to `E` would be an error.
fn settled_slot(current: &Type, target: Type) -> Type {
    if current.is_optional_of_same(&target) {
        current.clone()
    } else {
        target
    }
}

/// Operands of an explicit cast that still need a type from it.
fn is_promotable_under_cast(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::NullLiteral
            | NodeKind::ListLiteral { .. }
            | NodeKind::SetLiteral { .. }
            | NodeKind::MapLiteral { .. }
            | NodeKind::TupleLiteral { .. }
    )
}
