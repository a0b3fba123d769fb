//! Expression Type Finder
//!
//! The first checker pass. It walks the tree bottom-up, assigns a semantic type to every
//! expression and reports the type errors it finds on the way. The pass never stops early: an
//! expression that fails a check gets the `Unknown` type, and since `Unknown` satisfies every
//! check, nothing above it reports the same problem again.
//!
//! ## Watermark
//!
//! A node is handled at most once. [`Arena::advance_stage`] raises its watermark to
//! [`AnalysisStage::TypeFound`] on first contact and every later visit returns immediately, so
//! running the pass twice, or on a subtree that is reachable from several parents, neither
//! changes types nor repeats diagnostics.
//!
//! ## Scope
//!
//! The finder tracks the enclosing function, loop nesting, logic clause, operator invocation,
//! output port and composite definition. Scopes are saved and restored around the subtrees
//! that change them.

use rustc_hash::{FxHashMap, FxHashSet};
use streamc_ast::{
    arena::Arena,
    nodes::{
        AnalysisStage, FunctionId, InfixOp, Location, NodeId, NodeKind, NumericForm, OperatorId,
        PostfixOp, PrefixOp, SymbolId,
    },
    visitor::Transformer,
};
use streamc_types::{
    Constraint, MetaType, Type, TypeFactory, TypeKind,
    cast::{explicit_cast_allowed, implicit_init_allowed},
    constraints::satisfies_constraint,
    queries::{
        collection_subst, element_type, is_element_of, is_mappable_container, is_member_of,
        is_subscriptable, key_type,
    },
    unifier::{Unifier, unifies},
};
use tracing::{debug, trace};

use crate::{
    diagnostics::DiagnosticSink,
    errors::{InvocationClause, OperandRelation, PortDirection, TypeCheckError},
    operator_model::{ExpressionMode, OperatorModel, ParameterModel},
    side_effects,
    symbol_table::SymbolKind,
    typed_context::TypedContext,
    xml,
};

const GET_THIS_COMPOSITE_INSTANCE_NAME: &str = "getThisCompositeInstanceName";

/// Finds types for the whole compilation unit.
pub(crate) fn run(ctx: &mut TypedContext) {
    let root = ctx.root;
    debug!(target: "streamc::finder", %root, "finding expression types");
    TypeFinder::new(ctx).visit(root);
    debug!(
        target: "streamc::finder",
        errors = ctx.diagnostics.error_count(),
        "expression types found"
    );
}

/// Types a single subtree, such as a cast the promoter just inserted.
pub(crate) fn type_node(ctx: &mut TypedContext, id: NodeId) {
    TypeFinder::new(ctx).visit(id);
}

#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    function: Option<FunctionId>,
    loop_depth: usize,
    in_logic_clause: bool,
    invocation: Option<NodeId>,
    output_port: usize,
    composite: Option<NodeId>,
}

/// Operand shapes an infix operator accepts.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Same,
    SameCollection,
    LeftElementOfRight,
    RightElementOfLeft,
}

impl Shape {
    fn relation(self) -> OperandRelation {
        match self {
            Shape::Same => OperandRelation::SameType,
            Shape::SameCollection => OperandRelation::SameCollectionType,
            Shape::LeftElementOfRight => OperandRelation::ElementOf,
            Shape::RightElementOfLeft => OperandRelation::ContainerFor,
        }
    }
}

/// Result type of an infix expression once its shape matched.
#[derive(Debug, Clone, Copy)]
enum Outcome {
    Boolean,
    Void,
    Left,
    Right,
    /// The left collection with `boolean` elements.
    BooleanLeft,
    BooleanRight,
}

const ARITHMETIC: &[(Shape, Outcome)] = &[
    (Shape::Same, Outcome::Left),
    (Shape::LeftElementOfRight, Outcome::Right),
    (Shape::RightElementOfLeft, Outcome::Left),
];
const COMPARISON: &[(Shape, Outcome)] = &[
    (Shape::Same, Outcome::Boolean),
    (Shape::LeftElementOfRight, Outcome::BooleanRight),
    (Shape::RightElementOfLeft, Outcome::BooleanLeft),
];
const ASSIGNMENT: &[(Shape, Outcome)] = &[(Shape::Same, Outcome::Void)];
const COMPOUND_ASSIGNMENT: &[(Shape, Outcome)] = &[
    (Shape::Same, Outcome::Void),
    (Shape::RightElementOfLeft, Outcome::Void),
];
const ELEMENTWISE: &[(Shape, Outcome)] = &[(Shape::SameCollection, Outcome::Left)];
const ELEMENTWISE_COMPARISON: &[(Shape, Outcome)] =
    &[(Shape::SameCollection, Outcome::BooleanLeft)];

/// A previously seen default of a submission time value.
struct SubmissionDefault {
    value: String,
    location: Location,
}

pub(crate) struct TypeFinder<'a> {
    ctx: &'a mut TypedContext,
    scope: Scope,
    submission_values: FxHashMap<String, SubmissionDefault>,
}

impl Transformer for TypeFinder<'_> {
    fn arena_mut(&mut self) -> &mut Arena {
        &mut self.ctx.arena
    }

    fn visit(&mut self, id: NodeId) -> NodeId {
        if !self.ctx.arena.advance_stage(id, AnalysisStage::TypeFound) {
            return id;
        }
        trace!(target: "streamc::finder", node = %id, "visit");
        let kind = self.ctx.arena.kind(id).clone();
        match kind {
            NodeKind::CompilationUnit { .. }
            | NodeKind::Block { .. }
            | NodeKind::Logic { .. }
            | NodeKind::LocalDeclItem { .. }
            | NodeKind::Slice { .. }
            | NodeKind::AttributeAssign { .. } => self.visit_children(id),
            NodeKind::FunctionDef { function, body } => self.function_def(id, function, body),
            NodeKind::CompositeDef { config, .. } => self.composite_def(id, &config),
            NodeKind::CompositeFormal { symbol, defaults } => {
                self.composite_formal(id, symbol, &defaults);
            }
            NodeKind::TypeDef { symbol, references } => self.type_def(id, symbol, &references),
            NodeKind::OpInvoke { operator, .. } => self.op_invoke(id, operator),
            NodeKind::PortInputs { streams, declared } => {
                self.port_inputs(id, &streams, declared.as_ref());
            }
            NodeKind::OnClause { body, .. } => {
                let scope = Scope {
                    in_logic_clause: true,
                    invocation: self.scope.invocation,
                    composite: self.scope.composite,
                    ..Scope::default()
                };
                self.with_scope(scope, |finder| {
                    finder.visit(body);
                });
            }
            NodeKind::Window { exprs } => {
                self.visit_children(id);
                for expr in exprs {
                    side_effects::check(self.ctx, expr);
                }
            }
            NodeKind::OutputClause { ports } => {
                for (index, port) in ports.into_iter().enumerate() {
                    let scope = Scope {
                        output_port: index,
                        ..self.scope
                    };
                    self.with_scope(scope, |finder| {
                        finder.visit(port);
                    });
                }
            }
            NodeKind::OpInvokeOutput {
                stream,
                assignments,
            } => self.op_invoke_output(stream, &assignments),
            NodeKind::OpActual { name, values } => self.op_actual(id, &name, &values),
            NodeKind::ConfigItem { name, exprs } => self.config_item(id, &name, &exprs),
            NodeKind::Annotation { name, params } => self.annotation(id, &name, &params),
            NodeKind::LocalDecl { ty, items, .. } => self.local_decl(&ty, &items),
            NodeKind::ExprStmt { expr } => {
                self.visit(expr);
                self.check_statement_effects(expr);
            }
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit(cond);
                self.check_condition(cond);
                self.visit(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit(else_branch);
                }
            }
            NodeKind::While { cond, body } => {
                self.visit(cond);
                self.check_condition(cond);
                self.in_loop(body);
            }
            NodeKind::For {
                item,
                collection,
                body,
            } => {
                self.visit(collection);
                self.for_item(item, collection);
                self.in_loop(body);
            }
            NodeKind::Break => {
                if self.scope.loop_depth == 0 {
                    let location = self.location(id);
                    self.error(TypeCheckError::BreakOutsideLoop { location });
                }
            }
            NodeKind::Continue => {
                if self.scope.loop_depth == 0 {
                    let location = self.location(id);
                    self.error(TypeCheckError::ContinueOutsideLoop { location });
                }
            }
            NodeKind::Return { expr } => self.return_stmt(id, expr),

            NodeKind::Identifier { symbol, .. } => {
                let ty = match symbol {
                    Some(symbol) => self.ctx.symbols.symbol(symbol).ty.clone(),
                    None => self.ctx.types.unknown(),
                };
                self.set_type(id, ty);
            }
            NodeKind::AttributeExpr { base, attribute } => {
                self.visit(base);
                let ty = self.attribute_type(id, base, &attribute);
                self.set_type(id, ty);
            }
            NodeKind::Infix { op, lhs, rhs } => self.infix(id, op, lhs, rhs),
            NodeKind::Prefix { op, operand } => self.prefix(id, op, operand),
            NodeKind::Postfix { op, operand } => self.postfix(id, op, operand),
            NodeKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => self.conditional(id, cond, then_expr, else_expr),
            NodeKind::Cast { target, expr } => self.cast(id, &target, expr),
            NodeKind::Call {
                name,
                function,
                args,
            } => self.call(id, &name, function, &args),
            NodeKind::Subscript { base, index } => {
                self.visit(base);
                self.visit(index);
                let ty = self.subscript_type(id, base, index);
                self.set_type(id, ty);
            }
            NodeKind::Unwrap { operand } => {
                self.visit(operand);
                let found = self.ty(operand);
                let ty = if found.is_null() {
                    self.optional_operand_null(id, "!")
                } else {
                    found.strip_optional().clone()
                };
                self.set_type(id, ty);
            }
            NodeKind::UnwrapOrElse { operand, fallback } => {
                self.unwrap_or_else(id, operand, fallback);
            }
            NodeKind::IsPresent { operand } => {
                self.visit(operand);
                if self.ty(operand).is_null() {
                    self.optional_operand_null(id, "??");
                }
                let boolean = self.ctx.types.boolean();
                self.set_type(id, boolean);
            }

            NodeKind::NullLiteral => {
                let null = self.ctx.types.null();
                self.set_type(id, null);
            }
            NodeKind::BooleanLiteral { .. } => {
                let boolean = self.ctx.types.boolean();
                self.set_type(id, boolean);
            }
            NodeKind::NumericLiteral { text, form } => {
                let ty = match numeric_literal_type(&self.ctx.types, &text, form) {
                    Some(ty) => ty,
                    None => {
                        let location = self.location(id);
                        self.error(TypeCheckError::InvalidNumericLiteral { text, location });
                        self.ctx.types.unknown()
                    }
                };
                self.set_type(id, ty);
            }
            NodeKind::StringLiteral { suffix, .. } => {
                let ty = if suffix == Some('u') {
                    self.ctx.types.primitive(MetaType::Ustring)
                } else {
                    self.ctx.types.rstring()
                };
                self.set_type(id, ty);
            }
            NodeKind::XmlLiteral { text } => {
                let ty = self.ctx.types.xml(None);
                self.validate_xml(id, &text, &ty);
                self.set_type(id, ty);
            }
            NodeKind::EmptyCurly => {
                let ty = self.ctx.types.empty_curly();
                self.set_type(id, ty);
            }
            NodeKind::ListLiteral { elements } => {
                self.visit_children(id);
                let element = self.unify_elements(id, &elements, "list");
                let ty = self.ctx.types.list(element);
                self.set_type(id, ty);
            }
            NodeKind::SetLiteral { elements } => {
                self.visit_children(id);
                let element = self.unify_elements(id, &elements, "set");
                let ty = self.ctx.types.set(element);
                self.set_type(id, ty);
            }
            NodeKind::MapLiteral { entries } => {
                self.visit_children(id);
                let (keys, values): (Vec<NodeId>, Vec<NodeId>) = entries.into_iter().unzip();
                let key = self.unify_elements(id, &keys, "map");
                let value = self.unify_elements(id, &values, "map");
                let ty = self.ctx.types.map(key, value);
                self.set_type(id, ty);
            }
            NodeKind::TupleLiteral { attributes } => {
                self.visit_children(id);
                let ty = self.tuple_literal_type(&attributes);
                self.set_type(id, ty);
            }
        }
        id
    }
}

impl<'a> TypeFinder<'a> {
    fn new(ctx: &'a mut TypedContext) -> Self {
        Self {
            ctx,
            scope: Scope::default(),
            submission_values: FxHashMap::default(),
        }
    }

    fn ty(&self, id: NodeId) -> Type {
        self.ctx
            .arena
            .ty(id)
            .cloned()
            .unwrap_or_else(|| self.ctx.types.unknown())
    }

    fn set_type(&mut self, id: NodeId, ty: Type) {
        self.ctx.arena.set_type(id, ty);
    }

    fn location(&self, id: NodeId) -> Location {
        self.ctx.arena.location(id).clone()
    }

    fn error(&mut self, error: TypeCheckError) {
        self.ctx.diagnostics.error(error);
    }

    fn with_scope(&mut self, scope: Scope, f: impl FnOnce(&mut Self)) {
        let saved = std::mem::replace(&mut self.scope, scope);
        f(self);
        self.scope = saved;
    }

    fn in_loop(&mut self, body: NodeId) {
        let scope = Scope {
            loop_depth: self.scope.loop_depth + 1,
            ..self.scope
        };
        self.with_scope(scope, |finder| {
            finder.visit(body);
        });
    }

    fn operator_of(&self, invocation: NodeId) -> Option<OperatorId> {
        match self.ctx.arena.kind(invocation) {
            NodeKind::OpInvoke { operator, .. } => Some(*operator),
            _ => None,
        }
    }

    fn function_def(&mut self, id: NodeId, function: FunctionId, body: NodeId) {
        let scope = Scope {
            function: Some(function),
            ..Scope::default()
        };
        self.with_scope(scope, |finder| {
            finder.visit(body);
        });

        let location = self.location(id);
        let signature = self.ctx.symbols.function(function);
        let name = signature.name.clone();
        let needless_stateful =
            signature.stateful && !signature.makes_stateful_call && !signature.intrinsic;
        let returns_value = !signature.return_type.is_void();
        if needless_stateful {
            self.ctx
                .diagnostics
                .warning(TypeCheckError::FunctionNeedNotBeStateful {
                    function: name.clone(),
                    location: location.clone(),
                });
        }
        if returns_value && !self.ends_with_return(body) {
            self.error(TypeCheckError::MissingReturn {
                function: name,
                location,
            });
        }
    }

    fn ends_with_return(&self, stmt: NodeId) -> bool {
        match self.ctx.arena.kind(stmt) {
            NodeKind::Return { .. } => true,
            NodeKind::Block { stmts } => stmts.last().is_some_and(|last| self.ends_with_return(*last)),
            NodeKind::If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => self.ends_with_return(*then_branch) && self.ends_with_return(*else_branch),
            _ => false,
        }
    }

    fn composite_def(&mut self, id: NodeId, config: &[NodeId]) {
        let saved_values = std::mem::take(&mut self.submission_values);
        let scope = Scope {
            composite: Some(id),
            ..Scope::default()
        };
        self.with_scope(scope, |finder| finder.visit_children(id));

        for item in config {
            if let NodeKind::ConfigItem { name, exprs } = self.ctx.arena.kind(*item).clone() {
                for expr in exprs {
                    self.check_static_references(&name, expr);
                }
            }
        }
        self.submission_values = saved_values;
    }

    /// Static definitions are evaluated once per program, so they may only mention names that
    /// are the same for every composite instance.
    fn check_static_references(&mut self, definition: &str, root: NodeId) {
        let mut errors = Vec::new();
        for node in self.ctx.arena.descendants(root) {
            let location = self.location(node);
            match self.ctx.arena.kind(node) {
                NodeKind::Identifier {
                    name,
                    symbol: Some(symbol),
                } if !self
                    .ctx
                    .symbols
                    .symbol(*symbol)
                    .can_extend_static_definition() =>
                {
                    errors.push(TypeCheckError::NonstaticDefiningStatic {
                        definition: definition.to_string(),
                        name: name.clone(),
                        location,
                    });
                }
                NodeKind::Call { name, .. } if name == GET_THIS_COMPOSITE_INSTANCE_NAME => {
                    errors.push(TypeCheckError::ThisCompositeInstanceStatic { location });
                }
                _ => {}
            }
        }
        for error in errors {
            self.error(error);
        }
    }

    fn type_def(&mut self, id: NodeId, symbol: SymbolId, references: &[NodeId]) {
        self.visit_children(id);
        let symbol = self.ctx.symbols.symbol(symbol);
        if let SymbolKind::TypeDef {
            is_static: true, ..
        } = symbol.kind
        {
            let name = symbol.name.clone();
            for reference in references {
                self.check_static_references(&name, *reference);
            }
        }
    }

    fn composite_formal(&mut self, id: NodeId, symbol: SymbolId, defaults: &[NodeId]) {
        self.visit_children(id);
        if defaults.is_empty() {
            return;
        }
        let name = self.ctx.symbols.symbol(symbol).name.clone();
        let location = self.location(id);
        self.check_composite_actual(&name, symbol, defaults, location);

        let mut errors = Vec::new();
        for default in defaults {
            for node in self.ctx.arena.descendants(*default) {
                if let NodeKind::Identifier {
                    name: referenced,
                    symbol: Some(referenced_symbol),
                } = self.ctx.arena.kind(node)
                    && matches!(
                        self.ctx.symbols.symbol(*referenced_symbol).kind,
                        SymbolKind::CompositeFormal { .. }
                    )
                {
                    errors.push(TypeCheckError::CompositeFormalRef {
                        formal: name.clone(),
                        referenced: referenced.clone(),
                        location: self.location(node),
                    });
                }
            }
        }
        for error in errors {
            self.error(error);
        }
    }

    fn op_invoke(&mut self, id: NodeId, operator: OperatorId) {
        let scope = Scope {
            invocation: Some(id),
            ..self.scope
        };
        self.with_scope(scope, |finder| finder.visit_children(id));

        let NodeKind::OpInvoke {
            outputs,
            inputs,
            logic,
            window,
            output,
            ..
        } = self.ctx.arena.kind(id).clone()
        else {
            unreachable!("op_invoke called on a non-invocation node");
        };
        let Some(composite) = self.ctx.symbols.operator(operator).as_composite() else {
            return;
        };
        let name = composite.name.clone();
        let ports = [
            (PortDirection::Input, composite.input_ports, inputs.len()),
            (PortDirection::Output, composite.output_ports, outputs.len()),
        ];
        let location = self.location(id);
        for (direction, expected, found) in ports {
            if expected != found {
                self.error(TypeCheckError::IncorrectNumberOfPorts {
                    operator: name.clone(),
                    direction,
                    expected,
                    found,
                    location: location.clone(),
                });
            }
        }
        let clauses = [
            (InvocationClause::Logic, logic),
            (InvocationClause::Window, window),
            (InvocationClause::Output, output),
        ];
        for (clause, node) in clauses {
            if let Some(node) = node {
                let location = self.location(node);
                self.error(TypeCheckError::UnexpectedCompositeClause { clause, location });
            }
        }
    }

    fn port_inputs(&mut self, id: NodeId, streams: &[NodeId], declared: Option<&Type>) {
        self.visit_children(id);
        let Some((first, rest)) = streams.split_first() else {
            return;
        };
        let port = match self.ctx.arena.kind(*first) {
            NodeKind::Identifier { name, .. } => name.clone(),
            _ => String::new(),
        };
        let first_type = self.ty(*first);
        if let Some(declared) = declared
            && !unifies(&first_type, declared)
        {
            let location = self.location(*first);
            self.error(TypeCheckError::MismatchedTypesOnPort {
                port: port.clone(),
                found: first_type.clone(),
                expected: declared.clone(),
                location,
            });
        }
        for stream in rest {
            if !unifies(&self.ty(*stream), &first_type) {
                let location = self.location(*stream);
                self.error(TypeCheckError::HeterogeneousTypesOnPort {
                    port: port.clone(),
                    expected: first_type.clone(),
                    location,
                });
            }
        }
    }

    fn op_invoke_output(&mut self, stream: SymbolId, assignments: &[NodeId]) {
        let symbol = self.ctx.symbols.symbol(stream);
        let (stream_name, tuple) = (symbol.name.clone(), symbol.ty.clone());
        let allow_nesting = self
            .scope
            .invocation
            .and_then(|invocation| self.operator_of(invocation))
            .and_then(|operator| self.ctx.symbols.operator(operator).as_primitive())
            .is_none_or(|primitive| {
                primitive.allows_nested_output_functions(self.scope.output_port)
            });

        let mut assigned = FxHashSet::default();
        for &assignment in assignments {
            let NodeKind::Infix { lhs, rhs, .. } = *self.ctx.arena.kind(assignment) else {
                self.visit(assignment);
                continue;
            };
            if !self
                .ctx
                .arena
                .advance_stage(assignment, AnalysisStage::TypeFound)
            {
                continue;
            }
            self.visit(rhs);
            self.ctx.arena.advance_stage(lhs, AnalysisStage::TypeFound);

            let attribute = match self.ctx.arena.kind(lhs) {
                NodeKind::Identifier { name, .. } => name.clone(),
                _ => String::new(),
            };
            let attribute_type = if let Some(ty) = tuple.tuple_attribute(&attribute) {
                ty.clone()
            } else {
                let location = self.location(lhs);
                self.error(TypeCheckError::NotAnAttributeOf {
                    attribute: attribute.clone(),
                    owner: stream_name.clone(),
                    location,
                });
                self.ctx.types.unknown()
            };
            self.set_type(lhs, attribute_type.clone());
            if !assigned.insert(attribute.clone()) {
                let location = self.location(lhs);
                self.error(TypeCheckError::DuplicateOutputAssignment {
                    attribute,
                    location,
                });
            }

            let value_type = self.ty(rhs);
            if !unifies(&value_type, &attribute_type) {
                let location = self.location(rhs);
                self.error(TypeCheckError::InfixRelative {
                    operator: InfixOp::Assign.as_str().to_string(),
                    left: attribute_type,
                    relation: OperandRelation::SameType,
                    right: value_type,
                    location,
                });
            }
            let void = self.ctx.types.void();
            self.set_type(assignment, void);

            side_effects::check(self.ctx, rhs);
            if !allow_nesting {
                self.check_output_function_nesting(rhs, false);
            }
        }
    }

    /// Custom output functions aggregate a whole window, so they may only appear at the top of
    /// an output assignment or directly under a cast.
    fn check_output_function_nesting(&mut self, id: NodeId, nested: bool) {
        match self.ctx.arena.kind(id).clone() {
            NodeKind::Call {
                name,
                function,
                args,
            } => {
                let output_function =
                    function.is_some_and(|function| self.ctx.symbols.function(function).output_function);
                if nested && output_function {
                    let location = self.location(id);
                    self.error(TypeCheckError::CustomOutputFunctionNested {
                        function: name,
                        location,
                    });
                }
                for arg in args {
                    self.check_output_function_nesting(arg, true);
                }
            }
            NodeKind::Cast { expr, .. } => self.check_output_function_nesting(expr, false),
            kind => {
                for child in kind.children() {
                    self.check_output_function_nesting(child, nested);
                }
            }
        }
    }

    fn op_actual(&mut self, id: NodeId, name: &str, values: &[NodeId]) {
        self.visit_children(id);
        let Some(operator) = self
            .scope
            .invocation
            .and_then(|invocation| self.operator_of(invocation))
        else {
            return;
        };
        match self.ctx.symbols.operator(operator) {
            OperatorModel::Primitive(primitive) => {
                if let Some(parameter) = primitive.parameters.get(name).cloned() {
                    self.check_primitive_actual(id, name, &parameter, values);
                }
            }
            OperatorModel::Composite(composite) => {
                if let Some(formal) = composite.formals.get(name).copied() {
                    let location = self.location(id);
                    self.check_composite_actual(name, formal, values, location);
                }
            }
        }
    }

    fn check_primitive_actual(
        &mut self,
        id: NodeId,
        name: &str,
        parameter: &ParameterModel,
        values: &[NodeId],
    ) {
        let cardinality_ok = usize::try_from(parameter.cardinality)
            .map_or(true, |expected| expected == values.len());
        if !cardinality_ok {
            let location = self.location(id);
            self.error(TypeCheckError::OperatorParameterCardinality {
                parameter: name.to_string(),
                expected: parameter.cardinality,
                found: values.len(),
                location,
            });
        }
        for &value in values {
            let location = self.location(value);
            if self.names_non_value(value) {
                self.error(TypeCheckError::PrimitiveActualMustDenoteValue {
                    parameter: name.to_string(),
                    location,
                });
            } else {
                let found = self.ty(value);
                if !unifies(&found, &parameter.ty) {
                    self.error(TypeCheckError::TypeMismatchOperatorParameter {
                        parameter: name.to_string(),
                        expected: parameter.ty.clone(),
                        found,
                        location,
                    });
                }
            }
            side_effects::check(self.ctx, value);
        }
    }

    fn names_non_value(&self, id: NodeId) -> bool {
        match self.ctx.arena.kind(id) {
            NodeKind::Identifier {
                symbol: Some(symbol),
                ..
            } => !self.ctx.symbols.symbol(*symbol).is_value(),
            _ => false,
        }
    }

    fn check_composite_actual(
        &mut self,
        name: &str,
        formal: SymbolId,
        values: &[NodeId],
        location: Location,
    ) {
        let symbol = self.ctx.symbols.symbol(formal);
        let SymbolKind::CompositeFormal { mode } = symbol.kind else {
            return;
        };
        let expected = symbol.ty.clone();
        if values.len() != 1 {
            self.error(TypeCheckError::OperatorParameterCardinality {
                parameter: name.to_string(),
                expected: 1,
                found: values.len(),
                location,
            });
        }
        for &value in values {
            let location = self.location(value);
            if !self.denotes_mode(value, mode) {
                self.error(TypeCheckError::ExpressionModeViolation {
                    formal: name.to_string(),
                    mode,
                    location,
                });
                continue;
            }
            if mode == ExpressionMode::Expression {
                let found = self.ty(value);
                if !unifies(&found, &expected) {
                    self.error(TypeCheckError::TypeMismatchOperatorParameter {
                        parameter: name.to_string(),
                        expected: expected.clone(),
                        found,
                        location,
                    });
                }
            }
        }
    }

    /// Whether `value` is an acceptable actual for a composite formal of `mode`.
    fn denotes_mode(&self, value: NodeId, mode: ExpressionMode) -> bool {
        let kind = self.ctx.arena.kind(value);
        let referenced = match kind {
            NodeKind::Identifier { symbol, .. } => {
                Some(symbol.map(|symbol| self.ctx.symbols.symbol(symbol)))
            }
            _ => None,
        };
        if let Some(Some(symbol)) = referenced
            && let SymbolKind::CompositeFormal { mode: passed } = symbol.kind
        {
            return passed == mode;
        }
        match mode {
            ExpressionMode::Attribute => {
                matches!(kind, NodeKind::AttributeExpr { .. })
                    || matches!(referenced, Some(Some(symbol)) if symbol.kind == SymbolKind::Attribute)
            }
            ExpressionMode::Expression => match referenced {
                None => true,
                Some(None) => false,
                Some(Some(symbol)) => symbol.is_value(),
            },
            ExpressionMode::Function => matches!(referenced, Some(None)),
            ExpressionMode::Operator => matches!(
                referenced,
                Some(Some(symbol)) if matches!(symbol.kind, SymbolKind::Operator | SymbolKind::CompositeName)
            ),
            ExpressionMode::Type => matches!(
                referenced,
                Some(Some(symbol)) if matches!(symbol.kind, SymbolKind::TypeDef { .. })
            ),
        }
    }

    fn config_item(&mut self, id: NodeId, name: &str, exprs: &[NodeId]) {
        self.visit_children(id);
        let location = self.location(id);
        match name {
            "defaultPoolSize" => {
                if let [expr] = exprs {
                    let found = self.ty(*expr);
                    if !satisfies_constraint(&found, Constraint::Integral.as_str(), false) {
                        let location = self.location(*expr);
                        self.error(TypeCheckError::ConfigDefaultPoolSize { found, location });
                    }
                } else {
                    self.error(TypeCheckError::ConfigDefaultPoolArity {
                        found: exprs.len(),
                        location,
                    });
                }
            }
            "threadedPort" => self.threaded_port(exprs, location),
            _ => {}
        }
        for &expr in exprs {
            side_effects::check(self.ctx, expr);
        }
    }

    fn threaded_port(&mut self, exprs: &[NodeId], location: Location) {
        let invocation = self.scope.invocation.filter(|invocation| {
            self.operator_of(*invocation)
                .is_some_and(|operator| self.ctx.symbols.operator(operator).is_primitive())
        });
        let Some(invocation) = invocation else {
            self.error(TypeCheckError::ThreadedPortNotPrimitive { location });
            return;
        };

        let mut input_streams = FxHashSet::default();
        if let NodeKind::OpInvoke { inputs, .. } = self.ctx.arena.kind(invocation) {
            for port in inputs {
                if let NodeKind::PortInputs { streams, .. } = self.ctx.arena.kind(*port) {
                    for stream in streams {
                        if let NodeKind::Identifier {
                            symbol: Some(symbol),
                            ..
                        } = self.ctx.arena.kind(*stream)
                        {
                            input_streams.insert(*symbol);
                        }
                    }
                }
            }
        }

        let mut errors = Vec::new();
        for expr in exprs {
            let NodeKind::Call { name, args, .. } = self.ctx.arena.kind(*expr) else {
                continue;
            };
            if name != "queue" {
                continue;
            }
            if let Some(port) = args.first()
                && let NodeKind::Identifier { name, symbol } = self.ctx.arena.kind(*port)
                && !symbol.is_some_and(|symbol| input_streams.contains(&symbol))
            {
                errors.push(TypeCheckError::ThreadedPortBadQueue {
                    port: name.clone(),
                    location: self.location(*port),
                });
            }
        }
        for error in errors {
            self.error(error);
        }
    }

    fn annotation(&mut self, id: NodeId, name: &str, params: &[(String, NodeId)]) {
        self.visit_children(id);
        let tf = &self.ctx.types;
        let mut errors = Vec::new();
        for (key, value) in params {
            let found = self.ty(*value);
            let location = self.location(*value);
            let expected = match (name, key.as_str()) {
                ("parallel", "width") | ("threading", "threads") => Some(("int32", tf.int32())),
                ("parallel", "replicateHostTags") => {
                    Some(("list<rstring>", tf.list(tf.rstring())))
                }
                ("threading", "elastic") => Some(("boolean", tf.boolean())),
                _ => None,
            };
            if let Some((spelled, expected)) = expected
                && !found.is_unknown()
                && found != expected
            {
                errors.push(TypeCheckError::AnnotationIncorrectType {
                    parameter: key.clone(),
                    annotation: name.to_string(),
                    expected: spelled,
                    found: found.clone(),
                    location: location.clone(),
                });
            }
            let invalid_view_value = match (name, key.as_str()) {
                ("view", "attributes") => {
                    found.is_collection() && element_type(tf, &found).is_tuple()
                }
                ("view", "filter") => found.tuple_attribute("attr").is_some_and(Type::is_tuple),
                _ => false,
            };
            if invalid_view_value {
                errors.push(TypeCheckError::AnnotationInvalidParameterValue {
                    parameter: key.clone(),
                    annotation: name.to_string(),
                    location,
                });
            }
        }
        for error in errors {
            self.error(error);
        }
    }

    fn local_decl(&mut self, declared: &Type, items: &[NodeId]) {
        for &item in items {
            if !self.ctx.arena.advance_stage(item, AnalysisStage::TypeFound) {
                continue;
            }
            let NodeKind::LocalDeclItem {
                init: Some(init), ..
            } = *self.ctx.arena.kind(item)
            else {
                continue;
            };
            self.visit(init);
            let found = self.ty(init);
            if !implicit_init_allowed(&found, declared) {
                let location = self.location(item);
                self.error(TypeCheckError::TypeMismatchVarinit {
                    expected: declared.clone(),
                    found,
                    location,
                });
            }
            side_effects::check(self.ctx, init);
        }
    }

    /// Both sides of a top-level assignment are analysed on their own.
    fn check_statement_effects(&mut self, expr: NodeId) {
        match *self.ctx.arena.kind(expr) {
            NodeKind::Infix { op, lhs, rhs } if op.is_assignment() => {
                side_effects::check(self.ctx, lhs);
                side_effects::check(self.ctx, rhs);
            }
            _ => side_effects::check(self.ctx, expr),
        }
    }

    fn check_condition(&mut self, cond: NodeId) {
        let found = self.ty(cond);
        if !unifies(&found, &self.ctx.types.boolean()) {
            let location = self.location(cond);
            self.error(TypeCheckError::CondExpr { found, location });
        }
        side_effects::check(self.ctx, cond);
    }

    fn for_item(&mut self, item: SymbolId, collection: NodeId) {
        let item_type = self.ctx.symbols.symbol(item).ty.clone();
        let collection_type = self.ty(collection);
        let valid = match collection_type.kind() {
            TypeKind::Unknown => true,
            TypeKind::Map(..) | TypeKind::BMap(..) => unifies(&item_type, &key_type(&collection_type)),
            _ => {
                item_type.is_unknown()
                    || (collection_type.is_collection()
                        && element_type(&self.ctx.types, &collection_type) == item_type)
            }
        };
        if !valid {
            let location = self.location(collection);
            self.error(TypeCheckError::InfixRelative {
                operator: InfixOp::In.as_str().to_string(),
                left: item_type,
                relation: OperandRelation::ElementOf,
                right: collection_type,
                location,
            });
        }
        side_effects::check(self.ctx, collection);
    }

    fn return_stmt(&mut self, id: NodeId, expr: Option<NodeId>) {
        if let Some(expr) = expr {
            self.visit(expr);
            side_effects::check(self.ctx, expr);
        }
        let location = self.location(id);
        if self.scope.in_logic_clause {
            if expr.is_some() {
                self.error(TypeCheckError::VoidValueReturnLogicClause { location });
            }
            return;
        }
        let Some(function) = self.scope.function else {
            self.error(TypeCheckError::ReturnOutsideFunction { location });
            return;
        };
        let signature = self.ctx.symbols.function(function);
        let (name, expected) = (signature.name.clone(), signature.return_type.clone());
        if expected.is_void() {
            if expr.is_some() {
                self.error(TypeCheckError::VoidValueReturn {
                    function: name,
                    location,
                });
            }
            return;
        }
        let found = expr.map_or_else(|| self.ctx.types.void(), |expr| self.ty(expr));
        if !unifies(&found, &expected) {
            self.error(TypeCheckError::TypeMismatchReturn {
                function: name,
                expected,
                found,
                location,
            });
        }
    }

    fn attribute_type(&mut self, id: NodeId, base: NodeId, attribute: &str) -> Type {
        let location = self.location(id);
        if let NodeKind::Identifier {
            name,
            symbol: Some(symbol),
        } = self.ctx.arena.kind(base)
        {
            let name = name.clone();
            let symbol = self.ctx.symbols.symbol(*symbol);
            if matches!(symbol.kind, SymbolKind::TypeDef { .. })
                && let Some(values) = symbol.ty.enum_values()
            {
                if values.iter().any(|value| value == attribute) {
                    return symbol.ty.clone();
                }
                self.error(TypeCheckError::NotAnAttributeOf {
                    attribute: attribute.to_string(),
                    owner: name,
                    location,
                });
                return self.ctx.types.unknown();
            }
            if !symbol.is_value() {
                self.error(TypeCheckError::ValueNameExpected { name, location });
                return self.ctx.types.unknown();
            }
        }
        let base_type = self.ty(base);
        if base_type.is_unknown() {
            return base_type;
        }
        if let Some(ty) = base_type.tuple_attribute(attribute) {
            return ty.clone();
        }
        self.error(TypeCheckError::NotAnAttributeOf {
            attribute: attribute.to_string(),
            owner: base_type.to_string(),
            location,
        });
        self.ctx.types.unknown()
    }

    fn infix(&mut self, id: NodeId, op: InfixOp, lhs: NodeId, rhs: NodeId) {
        self.visit(lhs);
        self.visit(rhs);
        let (left, right) = (self.ty(lhs), self.ty(rhs));
        if left.is_unknown() || right.is_unknown() {
            let unknown = self.ctx.types.unknown();
            self.set_type(id, unknown);
            return;
        }
        if left.is_null() && right.is_null() {
            let location = self.location(id);
            self.error(TypeCheckError::InfixOperandsBothNull {
                operator: op.as_str().to_string(),
                location,
            });
            let unknown = self.ctx.types.unknown();
            self.set_type(id, unknown);
            return;
        }

        let ty = self.infix_type(id, op, rhs, &left, &right);
        self.set_type(id, ty);
        if op.is_assignment() && !self.is_mutable(lhs) {
            self.report_immutable_target(id, op, lhs);
        }
    }

    fn infix_type(&mut self, id: NodeId, op: InfixOp, rhs: NodeId, left: &Type, right: &Type) -> Type {
        use InfixOp as Op;
        let (constraint, use_underlying, table) = match op {
            Op::Plus => ("addable", false, ARITHMETIC),
            Op::Minus => ("subtractable", false, ARITHMETIC),
            Op::Star | Op::Slash => ("numeric", false, ARITHMETIC),
            Op::Mod | Op::Hat => ("integral", false, ARITHMETIC),
            Op::Amp | Op::Bar => ("andorable", false, ARITHMETIC),
            Op::AmpAmp | Op::BarBar => ("boolean", false, ARITHMETIC),
            Op::Less | Op::LessEq | Op::Greater | Op::GreaterEq => ("ordered", false, COMPARISON),
            Op::NotEq | Op::Eq => ("equatable", false, COMPARISON),
            Op::Assign => ("any", true, ASSIGNMENT),
            Op::PlusEq => ("addable", false, COMPOUND_ASSIGNMENT),
            Op::MinusEq => ("subtractable", false, COMPOUND_ASSIGNMENT),
            Op::StarEq | Op::SlashEq => ("numeric", false, COMPOUND_ASSIGNMENT),
            Op::ModEq | Op::HatEq => ("integral", false, COMPOUND_ASSIGNMENT),
            Op::AmpEq | Op::BarEq => ("andorable", false, COMPOUND_ASSIGNMENT),
            Op::DotPlus => ("addable", false, ELEMENTWISE),
            Op::DotMinus => ("subtractable", false, ELEMENTWISE),
            Op::DotStar | Op::DotSlash => ("numeric", false, ELEMENTWISE),
            Op::DotMod | Op::DotHat => ("integral", false, ELEMENTWISE),
            Op::DotAmp | Op::DotBar => ("andorable", false, ELEMENTWISE),
            Op::DotLess | Op::DotLessEq | Op::DotGreater | Op::DotGreaterEq => {
                ("ordered", false, ELEMENTWISE_COMPARISON)
            }
            Op::DotNotEq | Op::DotEq => ("equatable", false, ELEMENTWISE_COMPARISON),
            Op::LShift | Op::RShift | Op::LShiftEq | Op::RShiftEq => {
                return self.shift_type(op, rhs, left, right);
            }
            Op::DotLShift | Op::DotRShift => return self.shift_type(op, id, left, right),
            Op::In => return self.membership_type(rhs, left, right),
        };

        let tf = &self.ctx.types;
        let matched = table.iter().find_map(|(shape, outcome)| {
            let constrained = match shape {
                Shape::Same if same_type(left, right) => {
                    Some(if left.is_null() { right } else { left }.clone())
                }
                Shape::SameCollection if left == right && is_mappable_container(left) => {
                    Some(element_type(tf, left))
                }
                Shape::LeftElementOfRight if is_element_of(tf, left, right) => Some(left.clone()),
                Shape::RightElementOfLeft if is_element_of(tf, right, left) => Some(right.clone()),
                _ => None,
            };
            constrained.map(|constrained| (*outcome, constrained))
        });
        let requirement = describe_constraint(constraint);
        let location = self.location(rhs);

        let Some((outcome, constrained)) = matched else {
            self.error(TypeCheckError::InfixMismatch {
                operator: op.as_str().to_string(),
                left: left.clone(),
                right: right.clone(),
                relations: table.iter().map(|(shape, _)| shape.relation()).collect(),
                requirement,
                location,
            });
            return self.ctx.types.unknown();
        };
        if !satisfies_constraint(&constrained, constraint, use_underlying) {
            self.error(TypeCheckError::InfixAbsolute {
                operator: op.as_str().to_string(),
                left: left.clone(),
                right: right.clone(),
                requirement,
                location,
            });
            return self.ctx.types.unknown();
        }

        let tf = &self.ctx.types;
        match outcome {
            Outcome::Boolean => tf.boolean(),
            Outcome::Void => tf.void(),
            Outcome::Left => left.clone(),
            Outcome::Right => right.clone(),
            Outcome::BooleanLeft => collection_subst(tf, left, tf.boolean()),
            Outcome::BooleanRight => collection_subst(tf, right, tf.boolean()),
        }
    }

    /// Shifts take integral operands, or a collection of integrals on one side.
    fn shift_type(&mut self, op: InfixOp, at: NodeId, left: &Type, right: &Type) -> Type {
        let tf = &self.ctx.types;
        let integral = |ty: &Type| satisfies_constraint(ty, "integral", false);
        let result = match op {
            InfixOp::LShift | InfixOp::RShift => {
                if left.is_collection() {
                    (integral(&element_type(tf, left)) && integral(right)).then(|| left.clone())
                } else if right.is_collection() {
                    (integral(left) && integral(&element_type(tf, right)))
                        .then(|| collection_subst(tf, right, left.clone()))
                } else {
                    (integral(left) && integral(right)).then(|| left.clone())
                }
            }
            InfixOp::LShiftEq | InfixOp::RShiftEq => {
                let target = if left.is_collection() {
                    element_type(tf, left)
                } else {
                    left.clone()
                };
                (integral(&target) && integral(right)).then(|| tf.void())
            }
            _ => {
                let same_keys = match (left.kind(), right.kind()) {
                    (TypeKind::BMap(left_key, ..), TypeKind::BMap(right_key, ..)) => {
                        left_key == right_key || left_key.is_unknown() || right_key.is_unknown()
                    }
                    _ => true,
                };
                let valid = left.meta_type() == right.meta_type()
                    && left.is_collection()
                    && integral(&element_type(tf, left))
                    && integral(&element_type(tf, right))
                    && left.bound() == right.bound()
                    && same_keys;
                valid.then(|| left.clone())
            }
        };
        result.unwrap_or_else(|| {
            let location = self.location(at);
            self.error(TypeCheckError::InfixShift {
                operator: op.as_str().to_string(),
                left: left.clone(),
                right: right.clone(),
                location,
            });
            self.ctx.types.unknown()
        })
    }

    fn membership_type(&mut self, rhs: NodeId, left: &Type, right: &Type) -> Type {
        let valid = match right.kind() {
            TypeKind::Unknown => true,
            TypeKind::Map(..) | TypeKind::BMap(..) => unifies(left, &key_type(right)),
            _ => is_member_of(&self.ctx.types, left, right),
        };
        if !valid {
            let location = self.location(rhs);
            self.error(TypeCheckError::InfixRelative {
                operator: InfixOp::In.as_str().to_string(),
                left: left.clone(),
                relation: OperandRelation::ElementOf,
                right: right.clone(),
                location,
            });
        }
        self.ctx.types.boolean()
    }

    fn report_immutable_target(&mut self, id: NodeId, op: InfixOp, lhs: NodeId) {
        let location = self.location(id);
        if let NodeKind::Subscript { base, index } = *self.ctx.arena.kind(lhs) {
            let collection = self.ty(base);
            if matches!(self.ctx.arena.kind(index), NodeKind::Slice { .. }) {
                self.error(TypeCheckError::AssignToSlice {
                    collection,
                    location,
                });
                return;
            }
            if collection.is_string() {
                self.error(TypeCheckError::AssignToStringSubscript {
                    string: collection,
                    location,
                });
                return;
            }
        }
        self.error(TypeCheckError::ExpectedMutableOperand {
            operator: op.as_str().to_string(),
            location,
        });
    }

    /// Whether `id` denotes storage an assignment may write to.
    fn is_mutable(&self, id: NodeId) -> bool {
        match self.ctx.arena.kind(id) {
            NodeKind::Identifier {
                symbol: Some(symbol),
                ..
            } => self.ctx.symbols.symbol(*symbol).is_mutable(),
            NodeKind::AttributeExpr { base, .. } | NodeKind::Unwrap { operand: base } => {
                self.is_mutable(*base)
            }
            NodeKind::Subscript { base, index } => {
                !matches!(self.ctx.arena.kind(*index), NodeKind::Slice { .. })
                    && !self.ty(*base).is_string()
                    && self.is_mutable(*base)
            }
            _ => false,
        }
    }

    fn prefix(&mut self, id: NodeId, op: PrefixOp, operand: NodeId) {
        self.visit(operand);
        let requirement = match op {
            PrefixOp::Not => "boolean",
            PrefixOp::Complement => "integral",
            PrefixOp::Negate | PrefixOp::Increment | PrefixOp::Decrement => "numeric",
        };
        let ty = self.unary_type(id, op.as_str(), requirement, operand);
        self.set_type(id, ty);
        if matches!(op, PrefixOp::Increment | PrefixOp::Decrement) && !self.is_mutable(operand) {
            let location = self.location(id);
            self.error(TypeCheckError::ExpectedMutableOperand {
                operator: op.as_str().to_string(),
                location,
            });
        }
    }

    fn postfix(&mut self, id: NodeId, op: PostfixOp, operand: NodeId) {
        self.visit(operand);
        let ty = self.unary_type(id, op.as_str(), "numeric", operand);
        self.set_type(id, ty);
        if !self.is_mutable(operand) {
            let location = self.location(id);
            self.error(TypeCheckError::ExpectedMutableOperand {
                operator: op.as_str().to_string(),
                location,
            });
        }
    }

    fn unary_type(
        &mut self,
        id: NodeId,
        operator: &str,
        requirement: &'static str,
        operand: NodeId,
    ) -> Type {
        let found = self.ty(operand);
        if satisfies_constraint(&found, requirement, false) {
            return found;
        }
        let location = self.location(id);
        self.error(TypeCheckError::UnaryMismatch {
            operator: operator.to_string(),
            requirement,
            found,
            location,
        });
        self.ctx.types.unknown()
    }

    fn conditional(&mut self, id: NodeId, cond: NodeId, then_expr: NodeId, else_expr: NodeId) {
        self.visit(cond);
        self.visit(then_expr);
        self.visit(else_expr);
        let cond_type = self.ty(cond);
        if !unifies(&cond_type, &self.ctx.types.boolean()) {
            let location = self.location(cond);
            self.error(TypeCheckError::CondExpr {
                found: cond_type,
                location,
            });
        }

        let (then_type, else_type) = (self.ty(then_expr), self.ty(else_expr));
        let compatible = then_type.is_unknown()
            || else_type.is_unknown()
            || then_type.is_null()
            || else_type.is_null()
            || same_type(&then_type, &else_type);
        let ty = if !compatible {
            let location = self.location(id);
            self.error(TypeCheckError::CondExprArgs {
                then_type,
                else_type,
                location,
            });
            self.ctx.types.unknown()
        } else if then_type.is_unknown()
            || then_type.is_null()
            || else_type.is_optional_of_same(&then_type)
        {
            else_type
        } else {
            then_type
        };
        self.set_type(id, ty);
    }

    fn cast(&mut self, id: NodeId, target: &Type, expr: NodeId) {
        self.visit(expr);
        let from = self.ty(expr);
        if !explicit_cast_allowed(&self.ctx.types, &from, target) {
            let location = self.location(id);
            self.error(TypeCheckError::InvalidCast {
                from: from.clone(),
                to: target.clone(),
                location,
            });
        }
        self.set_type(id, target.clone());

        if matches!(target.kind(), TypeKind::Xml(_))
            && *target != from
            && !target.is_optional_of_same(&from)
            && let Some((literal, text)) = self.literal_under_casts(expr)
        {
            self.validate_xml(literal, &text, target);
        }
    }

    /// The string literal a cast chain bottoms out in. XML literals are checked where they are
    /// typed, so they are not returned here.
    fn literal_under_casts(&self, mut id: NodeId) -> Option<(NodeId, String)> {
        loop {
            match self.ctx.arena.kind(id) {
                NodeKind::Cast { expr, .. } => id = *expr,
                NodeKind::StringLiteral { text, .. } => return Some((id, text.clone())),
                _ => return None,
            }
        }
    }

    fn validate_xml(&mut self, literal: NodeId, text: &str, target: &Type) {
        if !self.ctx.options.validate_xml_literals {
            return;
        }
        if let Err(error) = xml::validate_literal(text) {
            let location = self.location(literal);
            self.error(TypeCheckError::InvalidXmlLiteral {
                value: error.value,
                target: target.clone(),
                message: error.message,
                location,
            });
        }
    }

    fn call(&mut self, id: NodeId, name: &str, function: Option<FunctionId>, args: &[NodeId]) {
        self.visit_children(id);
        let Some(function) = function else {
            let unknown = self.ctx.types.unknown();
            self.set_type(id, unknown);
            return;
        };
        let signature = self.ctx.symbols.function(function).clone();
        let actuals: Vec<Type> = args.iter().map(|arg| self.ty(*arg)).collect();
        let unifier = Unifier::unify_call(name, &actuals, &signature.formal_types());
        let result = unifier.substitute(&self.ctx.types, &signature.return_type);
        self.set_type(id, result);

        for (position, (arg, formal)) in args.iter().zip(&signature.formals).enumerate() {
            if formal.mutable && !self.is_mutable(*arg) {
                let location = self.location(*arg);
                self.error(TypeCheckError::ExpectedMutableActual {
                    function: name.to_string(),
                    position: formal
                        .name
                        .clone()
                        .unwrap_or_else(|| (position + 1).to_string()),
                    location,
                });
            }
        }

        if signature.stateful
            && let Some(caller) = self.scope.function
        {
            let caller = self.ctx.symbols.function_mut(caller);
            caller.makes_stateful_call = true;
            if !caller.stateful {
                let caller = caller.name.clone();
                let location = self.location(id);
                self.error(TypeCheckError::CallerMustBeStateful {
                    caller,
                    callee: name.to_string(),
                    location,
                });
            }
        }

        if name == "submit" {
            self.check_submit(args);
        }
        self.record_submission_value(id, name, args);
    }

    /// `submit(tuple, port)` must send a tuple of the port's type.
    fn check_submit(&mut self, args: &[NodeId]) {
        let [tuple, port] = args else {
            return;
        };
        let port_type = self.ty(*port);
        if port_type.meta_type() == MetaType::Uint32 {
            return;
        }
        let tuple_type = self.ty(*tuple);
        if tuple_type.is_tuple() && port_type.is_tuple() && tuple_type != port_type {
            let location = self.location(*tuple);
            self.error(TypeCheckError::PortNameTypeMismatch {
                tuple: tuple_type,
                port: port_type,
                location,
            });
        }
    }

    fn record_submission_value(&mut self, id: NodeId, name: &str, args: &[NodeId]) {
        if self.scope.composite.is_none()
            || !matches!(name, "getSubmissionTimeValue" | "getSubmissionTimeListValue")
        {
            return;
        }
        let [key, default, ..] = args else {
            return;
        };
        let NodeKind::StringLiteral { text: key, .. } = self.ctx.arena.kind(*key) else {
            return;
        };
        let key = key.trim_matches('"').to_string();
        let Some(value) = literal_text(&self.ctx.arena, *default) else {
            return;
        };
        let location = self.location(id);
        match self.submission_values.get(&key) {
            Some(previous) if previous.value != value => {
                let previous_location = previous.location.clone();
                self.ctx.diagnostics.error_with_detail(
                    TypeCheckError::SubmissionValueConflict {
                        name: key.clone(),
                        location,
                    },
                    TypeCheckError::SubmissionValueConflictDetail {
                        name: key,
                        location: previous_location,
                    },
                );
            }
            Some(_) => {}
            None => {
                self.submission_values
                    .insert(key, SubmissionDefault { value, location });
            }
        }
    }

    fn subscript_type(&mut self, id: NodeId, base: NodeId, index: NodeId) -> Type {
        let collection = self.ty(base);
        if collection.is_unknown() {
            return collection;
        }
        let location = self.location(id);
        let stream = match self.ctx.arena.kind(base) {
            NodeKind::Identifier {
                name,
                symbol: Some(symbol),
            } if self.ctx.symbols.symbol(*symbol).is_stream() => Some(name.clone()),
            _ => None,
        };
        let slice = match *self.ctx.arena.kind(index) {
            NodeKind::Slice { lower, upper } => Some((lower, upper)),
            _ => None,
        };
        let integral = |ty: &Type| satisfies_constraint(ty, "integral", false);

        if let Some(stream) = stream {
            if slice.is_some() {
                self.error(TypeCheckError::HistorySlice { stream, location });
                return self.ctx.types.unknown();
            }
            let index_type = self.ty(index);
            if !integral(&index_type) {
                let location = self.location(index);
                self.error(TypeCheckError::HistoryType {
                    stream,
                    index: index_type,
                    location,
                });
                return self.ctx.types.unknown();
            }
            return collection;
        }

        if let Some((lower, upper)) = slice {
            let bound_type = |bound: Option<NodeId>| {
                bound.map_or_else(|| self.ctx.types.unknown(), |bound| self.ty(bound))
            };
            let (lower, upper) = (bound_type(lower), bound_type(upper));
            let valid = is_subscriptable(&collection, true)
                && integral(&lower)
                && integral(&upper)
                && unifies(&lower, &upper);
            if !valid {
                self.error(TypeCheckError::SubscriptSlice {
                    collection,
                    lower,
                    upper,
                    location,
                });
                return self.ctx.types.unknown();
            }
            return collection;
        }

        let index_type = self.ty(index);
        let valid = is_subscriptable(&collection, false)
            && match collection.kind() {
                TypeKind::Map(..) | TypeKind::BMap(..) => {
                    unifies(&index_type, &key_type(&collection))
                }
                _ => integral(&index_type),
            };
        if !valid {
            self.error(TypeCheckError::SubscriptIndex {
                collection,
                index: index_type,
                location,
            });
            return self.ctx.types.unknown();
        }
        element_type(&self.ctx.types, &collection)
    }

    fn unwrap_or_else(&mut self, id: NodeId, operand: NodeId, fallback: NodeId) {
        self.visit(operand);
        self.visit(fallback);
        let found = self.ty(operand);
        if found.is_null() {
            let ty = self.optional_operand_null(id, "?:");
            self.set_type(id, ty);
            return;
        }
        let underlying = found.strip_optional().clone();
        let fallback_type = self.ty(fallback);
        if !underlying.is_unknown() && !fallback_type.is_unknown() && fallback_type != underlying {
            let location = self.location(fallback);
            self.error(TypeCheckError::InfixRelative {
                operator: "?:".to_string(),
                left: underlying.clone(),
                relation: OperandRelation::SameType,
                right: fallback_type,
                location,
            });
        }
        self.set_type(id, underlying);
    }

    fn optional_operand_null(&mut self, id: NodeId, operator: &str) -> Type {
        let location = self.location(id);
        self.error(TypeCheckError::OptionalOperandNull {
            operator: operator.to_string(),
            location,
        });
        self.ctx.types.unknown()
    }

    /// The common element type of a literal's entries; `null` entries are left to the promoter.
    fn unify_elements(&mut self, id: NodeId, elements: &[NodeId], kind: &'static str) -> Type {
        let mut unified: Option<Type> = None;
        let mut saw_null = false;
        for element in elements {
            let ty = self.ty(*element);
            if ty.is_null() {
                saw_null = true;
                continue;
            }
            let merged = match unified {
                None => Some(ty),
                Some(current) => merge_element_types(current, ty),
            };
            if merged.is_none() {
                let location = self.location(id);
                self.error(TypeCheckError::HeterogeneousLiteral { kind, location });
                return self.ctx.types.unknown();
            }
            unified = merged;
        }
        match unified {
            Some(ty) => ty,
            None if saw_null => self.ctx.types.null(),
            None => self.ctx.types.unknown(),
        }
    }

    fn tuple_literal_type(&self, attributes: &[NodeId]) -> Type {
        let attributes = attributes
            .iter()
            .filter_map(|attribute| match self.ctx.arena.kind(*attribute) {
                NodeKind::AttributeAssign { name, value } => Some((name.clone(), self.ty(*value))),
                _ => None,
            })
            .collect();
        self.ctx.types.tuple(attributes)
    }
}

/// Equal types, one the optional of the other, or `null` against an optional.
fn same_type(left: &Type, right: &Type) -> bool {
    left == right
        || left.is_optional_of_same(right)
        || right.is_optional_of_same(left)
        || (left.is_null() && right.is_optional())
        || (right.is_null() && left.is_optional())
}

fn merge_element_types(current: Type, next: Type) -> Option<Type> {
    if current == next || next.is_unknown() || current.is_optional_of_same(&next) {
        Some(current)
    } else if current.is_unknown() || next.is_optional_of_same(&current) {
        Some(next)
    } else {
        None
    }
}

fn describe_constraint(name: &'static str) -> &'static str {
    name.parse::<Constraint>()
        .map_or(name, |constraint| constraint.description())
}

/// Source text of a literal default, used to compare submission time value defaults.
fn literal_text(arena: &Arena, id: NodeId) -> Option<String> {
    match arena.kind(id) {
        NodeKind::StringLiteral { text, .. } | NodeKind::NumericLiteral { text, .. } => {
            Some(text.clone())
        }
        NodeKind::BooleanLiteral { value } => Some(value.to_string()),
        NodeKind::ListLiteral { elements } => {
            let elements = elements
                .iter()
                .map(|element| literal_text(arena, *element))
                .collect::<Option<Vec<_>>>()?;
            Some(format!("[{}]", elements.join(",")))
        }
        _ => None,
    }
}

/// Type of a numeric literal from its suffix, or `None` when the suffix names no type.
///
/// Decimal and float literals take a kind letter (`s`, `u`, `f`, `d`) and a width letter
/// (`b`, `h`, `w`, `l`, `q`); hexadecimal literals take an optional kind and are sized by their
/// digit count.
fn numeric_literal_type(tf: &TypeFactory, text: &str, form: NumericForm) -> Option<Type> {
    match form {
        NumericForm::Hex => {
            let unsigned = text.trim_start_matches('-');
            let digits = unsigned.trim_end_matches(['s', 'u']);
            let kind = unsigned[digits.len()..].chars().next().unwrap_or('s');
            let bits = match digits.len().saturating_sub(2) {
                0..=2 => 8,
                3..=4 => 16,
                5..=8 => 32,
                9..=16 => 64,
                _ => return None,
            };
            tf.number(kind, bits)
        }
        NumericForm::Integer | NumericForm::Float => {
            let suffix_start = text
                .rfind(|c: char| !"sufdbhwlq".contains(c))
                .map_or(0, |index| index + 1);
            let mut kind = if form == NumericForm::Integer { 's' } else { 'f' };
            let mut bits = -1;
            for c in text[suffix_start..].chars() {
                match c {
                    's' | 'u' | 'f' | 'd' => kind = c,
                    'b' => bits = 8,
                    'h' => bits = 16,
                    'w' => bits = 32,
                    'l' => bits = 64,
                    'q' => bits = 128,
                    _ => {}
                }
            }
            tf.number(kind, bits)
        }
    }
}
