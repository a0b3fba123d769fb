//! Programmatic AST construction.
//!
//! The parser is an external collaborator, so trees reach the checker through this builder. Every
//! node receives the builder's current [`Location`]; [`Builder::at`] moves it.
//!
//! # Example
//!
//! ```
//! use streamc_ast::builder::Builder;
//! use streamc_ast::nodes::InfixOp;
//!
//! let mut b = Builder::new("example.spl");
//! let one = b.at(1, 9).int("1");
//! let two = b.int("2");
//! let sum = b.infix(InfixOp::Plus, one, two);
//! let arena = b.finish();
//! assert_eq!(arena.children(sum), vec![one, two]);
//! ```

use streamc_types::Type;

use crate::{
    arena::Arena,
    nodes::{
        FunctionId, InfixOp, Location, NodeId, NodeKind, NumericForm, OnClauseKind, OperatorId,
        PostfixOp, PrefixOp, SymbolId,
    },
};

/// Optional parts of an operator invocation.
#[derive(Default, Clone, Debug)]
pub struct OpInvokeParts {
    pub outputs: Vec<SymbolId>,
    pub inputs: Vec<NodeId>,
    pub logic: Option<NodeId>,
    pub window: Option<NodeId>,
    pub actuals: Vec<NodeId>,
    pub output: Option<NodeId>,
    pub config: Vec<NodeId>,
    pub annotations: Vec<NodeId>,
}

#[derive(Default, Clone, Debug)]
pub struct CompositeParts {
    pub formals: Vec<NodeId>,
    pub types: Vec<NodeId>,
    pub graph: Vec<NodeId>,
    pub config: Vec<NodeId>,
}

pub struct Builder {
    arena: Arena,
    location: Location,
}

impl Builder {
    #[must_use]
    pub fn new(source: &str) -> Self {
        Self {
            arena: Arena::new(),
            location: Location::new(0, 0, 1, 1, 1, 1, source.to_string()),
        }
    }

    /// Continues building on top of an existing arena.
    #[must_use]
    pub fn with_arena(arena: Arena, source: &str) -> Self {
        Self {
            arena,
            location: Location::new(0, 0, 1, 1, 1, 1, source.to_string()),
        }
    }

    /// Sets the location for subsequently created nodes.
    pub fn at(&mut self, line: u32, column: u32) -> &mut Self {
        self.location.start_line = line;
        self.location.start_column = column;
        self.location.end_line = line;
        self.location.end_column = column;
        self
    }

    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    #[must_use]
    pub fn finish(self) -> Arena {
        self.arena
    }

    pub fn node(&mut self, kind: NodeKind) -> NodeId {
        self.arena.alloc(kind, self.location.clone())
    }

    // Literals

    pub fn null(&mut self) -> NodeId {
        self.node(NodeKind::NullLiteral)
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.node(NodeKind::BooleanLiteral { value })
    }

    pub fn int(&mut self, text: &str) -> NodeId {
        self.numeric(text, NumericForm::Integer)
    }

    pub fn float(&mut self, text: &str) -> NodeId {
        self.numeric(text, NumericForm::Float)
    }

    pub fn hex(&mut self, text: &str) -> NodeId {
        self.numeric(text, NumericForm::Hex)
    }

    pub fn numeric(&mut self, text: &str, form: NumericForm) -> NodeId {
        self.node(NodeKind::NumericLiteral {
            text: text.to_string(),
            form,
        })
    }

    /// A string literal; `value` is the unquoted content.
    pub fn string(&mut self, value: &str) -> NodeId {
        self.node(NodeKind::StringLiteral {
            text: format!("\"{value}\""),
            suffix: None,
        })
    }

    pub fn ustring(&mut self, value: &str) -> NodeId {
        self.node(NodeKind::StringLiteral {
            text: format!("\"{value}\""),
            suffix: Some('u'),
        })
    }

    /// An XML literal; `value` is the unquoted document.
    pub fn xml(&mut self, value: &str) -> NodeId {
        self.node(NodeKind::XmlLiteral {
            text: format!("\"{value}\""),
        })
    }

    pub fn empty_curly(&mut self) -> NodeId {
        self.node(NodeKind::EmptyCurly)
    }

    pub fn list(&mut self, elements: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::ListLiteral { elements })
    }

    pub fn set(&mut self, elements: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::SetLiteral { elements })
    }

    pub fn map(&mut self, entries: Vec<(NodeId, NodeId)>) -> NodeId {
        self.node(NodeKind::MapLiteral { entries })
    }

    pub fn tuple(&mut self, attributes: Vec<(&str, NodeId)>) -> NodeId {
        let attributes = attributes
            .into_iter()
            .map(|(name, value)| self.attribute_assign(name, value))
            .collect();
        self.node(NodeKind::TupleLiteral { attributes })
    }

    pub fn attribute_assign(&mut self, name: &str, value: NodeId) -> NodeId {
        self.node(NodeKind::AttributeAssign {
            name: name.to_string(),
            value,
        })
    }

    // Expressions

    pub fn identifier(&mut self, name: &str, symbol: SymbolId) -> NodeId {
        self.node(NodeKind::Identifier {
            name: name.to_string(),
            symbol: Some(symbol),
        })
    }

    /// An identifier the resolver could not bind.
    pub fn unresolved(&mut self, name: &str) -> NodeId {
        self.node(NodeKind::Identifier {
            name: name.to_string(),
            symbol: None,
        })
    }

    pub fn attribute(&mut self, base: NodeId, attribute: &str) -> NodeId {
        self.node(NodeKind::AttributeExpr {
            base,
            attribute: attribute.to_string(),
        })
    }

    pub fn infix(&mut self, op: InfixOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.node(NodeKind::Infix { op, lhs, rhs })
    }

    pub fn prefix(&mut self, op: PrefixOp, operand: NodeId) -> NodeId {
        self.node(NodeKind::Prefix { op, operand })
    }

    pub fn postfix(&mut self, op: PostfixOp, operand: NodeId) -> NodeId {
        self.node(NodeKind::Postfix { op, operand })
    }

    pub fn conditional(&mut self, cond: NodeId, then_expr: NodeId, else_expr: NodeId) -> NodeId {
        self.node(NodeKind::Conditional {
            cond,
            then_expr,
            else_expr,
        })
    }

    pub fn cast(&mut self, target: Type, expr: NodeId) -> NodeId {
        self.node(NodeKind::Cast { target, expr })
    }

    pub fn call(&mut self, name: &str, function: FunctionId, args: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::Call {
            name: name.to_string(),
            function: Some(function),
            args,
        })
    }

    pub fn subscript(&mut self, base: NodeId, index: NodeId) -> NodeId {
        self.node(NodeKind::Subscript { base, index })
    }

    pub fn slice(&mut self, lower: Option<NodeId>, upper: Option<NodeId>) -> NodeId {
        self.node(NodeKind::Slice { lower, upper })
    }

    pub fn unwrap(&mut self, operand: NodeId) -> NodeId {
        self.node(NodeKind::Unwrap { operand })
    }

    pub fn unwrap_or_else(&mut self, operand: NodeId, fallback: NodeId) -> NodeId {
        self.node(NodeKind::UnwrapOrElse { operand, fallback })
    }

    pub fn is_present(&mut self, operand: NodeId) -> NodeId {
        self.node(NodeKind::IsPresent { operand })
    }

    // Statements

    pub fn block(&mut self, stmts: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::Block { stmts })
    }

    /// `ty name = init, ...;` with one item per `(symbol, init)` pair.
    pub fn local_decl(
        &mut self,
        ty: Type,
        mutable: bool,
        items: Vec<(SymbolId, Option<NodeId>)>,
    ) -> NodeId {
        let items = items
            .into_iter()
            .map(|(symbol, init)| self.node(NodeKind::LocalDeclItem { symbol, init }))
            .collect();
        self.node(NodeKind::LocalDecl { ty, mutable, items })
    }

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.node(NodeKind::ExprStmt { expr })
    }

    pub fn if_stmt(
        &mut self,
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    ) -> NodeId {
        self.node(NodeKind::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    pub fn while_stmt(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.node(NodeKind::While { cond, body })
    }

    pub fn for_stmt(&mut self, item: SymbolId, collection: NodeId, body: NodeId) -> NodeId {
        self.node(NodeKind::For {
            item,
            collection,
            body,
        })
    }

    pub fn break_stmt(&mut self) -> NodeId {
        self.node(NodeKind::Break)
    }

    pub fn continue_stmt(&mut self) -> NodeId {
        self.node(NodeKind::Continue)
    }

    pub fn return_stmt(&mut self, expr: Option<NodeId>) -> NodeId {
        self.node(NodeKind::Return { expr })
    }

    // Definitions

    pub fn compilation_unit(&mut self, definitions: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::CompilationUnit { definitions })
    }

    pub fn function_def(&mut self, function: FunctionId, body: NodeId) -> NodeId {
        self.node(NodeKind::FunctionDef { function, body })
    }

    pub fn composite_def(&mut self, composite: OperatorId, parts: CompositeParts) -> NodeId {
        self.node(NodeKind::CompositeDef {
            composite,
            formals: parts.formals,
            types: parts.types,
            graph: parts.graph,
            config: parts.config,
        })
    }

    pub fn composite_formal(&mut self, symbol: SymbolId, defaults: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::CompositeFormal { symbol, defaults })
    }

    pub fn type_def(&mut self, symbol: SymbolId, references: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::TypeDef { symbol, references })
    }

    pub fn op_invoke(&mut self, operator: OperatorId, parts: OpInvokeParts) -> NodeId {
        self.node(NodeKind::OpInvoke {
            operator,
            outputs: parts.outputs,
            inputs: parts.inputs,
            logic: parts.logic,
            window: parts.window,
            actuals: parts.actuals,
            output: parts.output,
            config: parts.config,
            annotations: parts.annotations,
        })
    }

    pub fn port_inputs(&mut self, streams: Vec<NodeId>, declared: Option<Type>) -> NodeId {
        self.node(NodeKind::PortInputs { streams, declared })
    }

    pub fn logic(&mut self, state: Vec<NodeId>, clauses: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::Logic { state, clauses })
    }

    pub fn on_clause(&mut self, kind: OnClauseKind, body: NodeId) -> NodeId {
        self.node(NodeKind::OnClause { kind, body })
    }

    pub fn window(&mut self, exprs: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::Window { exprs })
    }

    pub fn output_clause(&mut self, ports: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::OutputClause { ports })
    }

    /// One output port: `stream : attr = expr, ...` with `(attribute, value)` pairs.
    pub fn op_invoke_output(&mut self, stream: SymbolId, assignments: Vec<(NodeId, NodeId)>) -> NodeId {
        let assignments = assignments
            .into_iter()
            .map(|(attribute, value)| self.infix(InfixOp::Assign, attribute, value))
            .collect();
        self.node(NodeKind::OpInvokeOutput {
            stream,
            assignments,
        })
    }

    pub fn op_actual(&mut self, name: &str, values: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::OpActual {
            name: name.to_string(),
            values,
        })
    }

    pub fn config_item(&mut self, name: &str, exprs: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::ConfigItem {
            name: name.to_string(),
            exprs,
        })
    }

    pub fn annotation(&mut self, name: &str, params: Vec<(&str, NodeId)>) -> NodeId {
        self.node(NodeKind::Annotation {
            name: name.to_string(),
            params: params
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        })
    }
}
