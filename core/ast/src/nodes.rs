use core::fmt;
use std::fmt::{Display, Formatter};

use streamc_types::Type;

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Location {
    pub offset_start: u32,
    pub offset_end: u32,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub source: String,
}

impl Location {
    #[must_use]
    pub fn new(
        offset_start: u32,
        offset_end: u32,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
        source: String,
    ) -> Self {
        Self {
            offset_start,
            offset_end,
            start_line,
            start_column,
            end_line,
            end_column,
            source,
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_column)
    }
}

macro_rules! index_type {
    ($(#[$outer:meta])* $name:ident) => {
        $(#[$outer])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        pub struct $name(pub u32);

        impl $name {
            #[must_use]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

index_type! {
    /// Index of a node in its [`Arena`](crate::arena::Arena).
    NodeId
}

index_type! {
    /// Declaration bound to an identifier by the (external) name resolver.
    SymbolId
}

index_type! {
    /// Function signature resolved for a call or definition.
    FunctionId
}

index_type! {
    /// Operator (primitive or composite) invoked by an operator invocation.
    OperatorId
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-node watermark. Each pass only visits nodes below its own stage.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub enum AnalysisStage {
    #[default]
    Unanalyzed,
    TypeFound,
    Promoted,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum NumericForm {
    Integer,
    Float,
    Hex,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum OnClauseKind {
    Process,
    Tuple,
    Punct,
}

impl Display for OnClauseKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match self {
            OnClauseKind::Process => "onProcess",
            OnClauseKind::Tuple => "onTuple",
            OnClauseKind::Punct => "onPunct",
        };
        write!(f, "{name}")
    }
}

macro_rules! operator_enum {
    ($(#[$outer:meta])* $name:ident { $($variant:ident => $text:literal),* $(,)? }) => {
        $(#[$outer])*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
        pub enum $name {
            $($variant),*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            #[must_use = "returns the string representation without modifying self"]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),*
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL.iter().find(|op| op.as_str() == s).copied().ok_or(())
            }
        }
    };
}

operator_enum! {
    /// Binary operators, including compound assignments and the element-wise dotted forms.
    InfixOp {
        Star => "*",
        Slash => "/",
        Mod => "%",
        Plus => "+",
        Minus => "-",
        LShift => "<<",
        RShift => ">>",
        Less => "<",
        LessEq => "<=",
        Greater => ">",
        GreaterEq => ">=",
        NotEq => "!=",
        Eq => "==",
        Amp => "&",
        Hat => "^",
        Bar => "|",
        AmpAmp => "&&",
        BarBar => "||",
        In => "in",
        Assign => "=",
        StarEq => "*=",
        SlashEq => "/=",
        ModEq => "%=",
        PlusEq => "+=",
        MinusEq => "-=",
        AmpEq => "&=",
        HatEq => "^=",
        BarEq => "|=",
        LShiftEq => "<<=",
        RShiftEq => ">>=",
        DotStar => ".*",
        DotSlash => "./",
        DotMod => ".%",
        DotPlus => ".+",
        DotMinus => ".-",
        DotLShift => ".<<",
        DotRShift => ".>>",
        DotLess => ".<",
        DotLessEq => ".<=",
        DotGreater => ".>",
        DotGreaterEq => ".>=",
        DotNotEq => ".!=",
        DotEq => ".==",
        DotAmp => ".&",
        DotHat => ".^",
        DotBar => ".|",
    }
}

impl InfixOp {
    /// `=` and the compound `op=` forms.
    #[must_use = "this is a pure check with no side effects"]
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            InfixOp::Assign
                | InfixOp::StarEq
                | InfixOp::SlashEq
                | InfixOp::ModEq
                | InfixOp::PlusEq
                | InfixOp::MinusEq
                | InfixOp::AmpEq
                | InfixOp::HatEq
                | InfixOp::BarEq
                | InfixOp::LShiftEq
                | InfixOp::RShiftEq
        )
    }

    #[must_use = "this is a pure check with no side effects"]
    pub fn is_dotted(self) -> bool {
        self.as_str().starts_with('.')
    }

    #[must_use = "this is a pure check with no side effects"]
    pub fn is_shift(self) -> bool {
        matches!(
            self,
            InfixOp::LShift
                | InfixOp::RShift
                | InfixOp::LShiftEq
                | InfixOp::RShiftEq
                | InfixOp::DotLShift
                | InfixOp::DotRShift
        )
    }
}

operator_enum! {
    PrefixOp {
        Not => "!",
        Complement => "~",
        Negate => "-",
        Increment => "++",
        Decrement => "--",
    }
}

operator_enum! {
    PostfixOp {
        Increment => "++",
        Decrement => "--",
    }
}

/// The syntactic shape of a node.
///
/// Child nodes are referenced by [`NodeId`]; symbols, functions and operators by the ids the
/// name resolver assigned.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum NodeKind {
    CompilationUnit {
        definitions: Vec<NodeId>,
    },
    FunctionDef {
        function: FunctionId,
        body: NodeId,
    },
    CompositeDef {
        composite: OperatorId,
        formals: Vec<NodeId>,
        types: Vec<NodeId>,
        graph: Vec<NodeId>,
        config: Vec<NodeId>,
    },
    CompositeFormal {
        symbol: SymbolId,
        defaults: Vec<NodeId>,
    },
    /// A `type` definition; `references` are the identifiers its type expression mentions.
    TypeDef {
        symbol: SymbolId,
        references: Vec<NodeId>,
    },
    OpInvoke {
        operator: OperatorId,
        outputs: Vec<SymbolId>,
        inputs: Vec<NodeId>,
        logic: Option<NodeId>,
        window: Option<NodeId>,
        actuals: Vec<NodeId>,
        output: Option<NodeId>,
        config: Vec<NodeId>,
        annotations: Vec<NodeId>,
    },
    /// One input port: the streams feeding it and the tuple type declared for it, if any.
    PortInputs {
        streams: Vec<NodeId>,
        declared: Option<Type>,
    },
    Logic {
        state: Vec<NodeId>,
        clauses: Vec<NodeId>,
    },
    OnClause {
        kind: OnClauseKind,
        body: NodeId,
    },
    Window {
        exprs: Vec<NodeId>,
    },
    OutputClause {
        ports: Vec<NodeId>,
    },
    OpInvokeOutput {
        stream: SymbolId,
        assignments: Vec<NodeId>,
    },
    OpActual {
        name: String,
        values: Vec<NodeId>,
    },
    ConfigItem {
        name: String,
        exprs: Vec<NodeId>,
    },
    Annotation {
        name: String,
        params: Vec<(String, NodeId)>,
    },

    Block {
        stmts: Vec<NodeId>,
    },
    LocalDecl {
        ty: Type,
        mutable: bool,
        items: Vec<NodeId>,
    },
    LocalDeclItem {
        symbol: SymbolId,
        init: Option<NodeId>,
    },
    ExprStmt {
        expr: NodeId,
    },
    If {
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    While {
        cond: NodeId,
        body: NodeId,
    },
    For {
        item: SymbolId,
        collection: NodeId,
        body: NodeId,
    },
    Break,
    Continue,
    Return {
        expr: Option<NodeId>,
    },

    Identifier {
        name: String,
        symbol: Option<SymbolId>,
    },
    AttributeExpr {
        base: NodeId,
        attribute: String,
    },
    Infix {
        op: InfixOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Prefix {
        op: PrefixOp,
        operand: NodeId,
    },
    Postfix {
        op: PostfixOp,
        operand: NodeId,
    },
    Conditional {
        cond: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
    },
    Cast {
        target: Type,
        expr: NodeId,
    },
    Call {
        name: String,
        function: Option<FunctionId>,
        args: Vec<NodeId>,
    },
    Subscript {
        base: NodeId,
        index: NodeId,
    },
    /// `[lower:upper]`; only valid as the index of a [`NodeKind::Subscript`].
    Slice {
        lower: Option<NodeId>,
        upper: Option<NodeId>,
    },
    Unwrap {
        operand: NodeId,
    },
    UnwrapOrElse {
        operand: NodeId,
        fallback: NodeId,
    },
    IsPresent {
        operand: NodeId,
    },

    NullLiteral,
    BooleanLiteral {
        value: bool,
    },
    /// Source text including any type suffix, e.g. `3`, `2.5f`, `0x1Fub`.
    NumericLiteral {
        text: String,
        form: NumericForm,
    },
    /// Source text including the quotes.
    StringLiteral {
        text: String,
        suffix: Option<char>,
    },
    XmlLiteral {
        text: String,
    },
    EmptyCurly,
    ListLiteral {
        elements: Vec<NodeId>,
    },
    SetLiteral {
        elements: Vec<NodeId>,
    },
    MapLiteral {
        entries: Vec<(NodeId, NodeId)>,
    },
    TupleLiteral {
        attributes: Vec<NodeId>,
    },
    AttributeAssign {
        name: String,
        value: NodeId,
    },
}

impl NodeKind {
    /// Child nodes in source order.
    #[must_use]
    pub fn children(&self) -> Vec<NodeId> {
        let mut result = Vec::new();
        match self {
            NodeKind::CompilationUnit { definitions } => result.extend(definitions),
            NodeKind::FunctionDef { body, .. } => result.push(*body),
            NodeKind::CompositeDef {
                formals,
                types,
                graph,
                config,
                ..
            } => {
                result.extend(formals);
                result.extend(types);
                result.extend(graph);
                result.extend(config);
            }
            NodeKind::CompositeFormal { defaults, .. } => result.extend(defaults),
            NodeKind::TypeDef { references, .. } => result.extend(references),
            NodeKind::OpInvoke {
                inputs,
                logic,
                window,
                actuals,
                output,
                config,
                annotations,
                ..
            } => {
                result.extend(annotations);
                result.extend(inputs);
                result.extend(logic);
                result.extend(window);
                result.extend(actuals);
                result.extend(output);
                result.extend(config);
            }
            NodeKind::PortInputs { streams, .. } => result.extend(streams),
            NodeKind::Logic { state, clauses } => {
                result.extend(state);
                result.extend(clauses);
            }
            NodeKind::OnClause { body, .. } => result.push(*body),
            NodeKind::Window { exprs }
            | NodeKind::ConfigItem { exprs, .. } => result.extend(exprs),
            NodeKind::OutputClause { ports } => result.extend(ports),
            NodeKind::OpInvokeOutput { assignments, .. } => result.extend(assignments),
            NodeKind::OpActual { values, .. } => result.extend(values),
            NodeKind::Annotation { params, .. } => result.extend(params.iter().map(|(_, v)| *v)),
            NodeKind::Block { stmts } => result.extend(stmts),
            NodeKind::LocalDecl { items, .. } => result.extend(items),
            NodeKind::LocalDeclItem { init, .. } => result.extend(init),
            NodeKind::ExprStmt { expr } => result.push(*expr),
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                result.push(*cond);
                result.push(*then_branch);
                result.extend(else_branch);
            }
            NodeKind::While { cond, body } => result.extend([*cond, *body]),
            NodeKind::For {
                collection, body, ..
            } => result.extend([*collection, *body]),
            NodeKind::Return { expr } => result.extend(expr),
            NodeKind::AttributeExpr { base, .. } => result.push(*base),
            NodeKind::Infix { lhs, rhs, .. } => result.extend([*lhs, *rhs]),
            NodeKind::Prefix { operand, .. }
            | NodeKind::Postfix { operand, .. }
            | NodeKind::Unwrap { operand }
            | NodeKind::IsPresent { operand } => result.push(*operand),
            NodeKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => result.extend([*cond, *then_expr, *else_expr]),
            NodeKind::Cast { expr, .. } => result.push(*expr),
            NodeKind::Call { args, .. } => result.extend(args),
            NodeKind::Subscript { base, index } => result.extend([*base, *index]),
            NodeKind::Slice { lower, upper } => {
                result.extend(lower);
                result.extend(upper);
            }
            NodeKind::UnwrapOrElse { operand, fallback } => result.extend([*operand, *fallback]),
            NodeKind::ListLiteral { elements } | NodeKind::SetLiteral { elements } => {
                result.extend(elements);
            }
            NodeKind::MapLiteral { entries } => {
                for (key, value) in entries {
                    result.push(*key);
                    result.push(*value);
                }
            }
            NodeKind::TupleLiteral { attributes } => result.extend(attributes),
            NodeKind::AttributeAssign { value, .. } => result.push(*value),
            NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Identifier { .. }
            | NodeKind::NullLiteral
            | NodeKind::BooleanLiteral { .. }
            | NodeKind::NumericLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::XmlLiteral { .. }
            | NodeKind::EmptyCurly => {}
        }
        result
    }

    /// Mutable references to every child slot, in the same order as [`NodeKind::children`].
    pub fn child_slots_mut(&mut self) -> Vec<&mut NodeId> {
        let mut result: Vec<&mut NodeId> = Vec::new();
        match self {
            NodeKind::CompilationUnit { definitions } => result.extend(definitions),
            NodeKind::FunctionDef { body, .. } | NodeKind::OnClause { body, .. } => {
                result.push(body);
            }
            NodeKind::CompositeDef {
                formals,
                types,
                graph,
                config,
                ..
            } => {
                result.extend(formals);
                result.extend(types);
                result.extend(graph);
                result.extend(config);
            }
            NodeKind::CompositeFormal { defaults, .. } => result.extend(defaults),
            NodeKind::TypeDef { references, .. } => result.extend(references),
            NodeKind::OpInvoke {
                inputs,
                logic,
                window,
                actuals,
                output,
                config,
                annotations,
                ..
            } => {
                result.extend(annotations);
                result.extend(inputs);
                result.extend(logic);
                result.extend(window);
                result.extend(actuals);
                result.extend(output);
                result.extend(config);
            }
            NodeKind::PortInputs { streams, .. } => result.extend(streams),
            NodeKind::Logic { state, clauses } => {
                result.extend(state);
                result.extend(clauses);
            }
            NodeKind::Window { exprs } | NodeKind::ConfigItem { exprs, .. } => {
                result.extend(exprs);
            }
            NodeKind::OutputClause { ports } => result.extend(ports),
            NodeKind::OpInvokeOutput { assignments, .. } => result.extend(assignments),
            NodeKind::OpActual { values, .. } => result.extend(values),
            NodeKind::Annotation { params, .. } => {
                result.extend(params.iter_mut().map(|(_, v)| v));
            }
            NodeKind::Block { stmts } => result.extend(stmts),
            NodeKind::LocalDecl { items, .. } => result.extend(items),
            NodeKind::LocalDeclItem { init, .. } => result.extend(init),
            NodeKind::ExprStmt { expr } => result.push(expr),
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                result.push(cond);
                result.push(then_branch);
                result.extend(else_branch);
            }
            NodeKind::While { cond, body } => {
                result.push(cond);
                result.push(body);
            }
            NodeKind::For {
                collection, body, ..
            } => {
                result.push(collection);
                result.push(body);
            }
            NodeKind::Return { expr } => result.extend(expr),
            NodeKind::AttributeExpr { base, .. } => result.push(base),
            NodeKind::Infix { lhs, rhs, .. } => {
                result.push(lhs);
                result.push(rhs);
            }
            NodeKind::Prefix { operand, .. }
            | NodeKind::Postfix { operand, .. }
            | NodeKind::Unwrap { operand }
            | NodeKind::IsPresent { operand } => result.push(operand),
            NodeKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                result.push(cond);
                result.push(then_expr);
                result.push(else_expr);
            }
            NodeKind::Cast { expr, .. } => result.push(expr),
            NodeKind::Call { args, .. } => result.extend(args),
            NodeKind::Subscript { base, index } => {
                result.push(base);
                result.push(index);
            }
            NodeKind::Slice { lower, upper } => {
                result.extend(lower);
                result.extend(upper);
            }
            NodeKind::UnwrapOrElse { operand, fallback } => {
                result.push(operand);
                result.push(fallback);
            }
            NodeKind::ListLiteral { elements } | NodeKind::SetLiteral { elements } => {
                result.extend(elements);
            }
            NodeKind::MapLiteral { entries } => {
                for (key, value) in entries {
                    result.push(key);
                    result.push(value);
                }
            }
            NodeKind::TupleLiteral { attributes } => result.extend(attributes),
            NodeKind::AttributeAssign { value, .. } => result.push(value),
            NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Identifier { .. }
            | NodeKind::NullLiteral
            | NodeKind::BooleanLiteral { .. }
            | NodeKind::NumericLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::XmlLiteral { .. }
            | NodeKind::EmptyCurly => {}
        }
        result
    }

    /// Nodes that produce a value and therefore carry a type after the finder ran.
    #[must_use = "this is a pure check with no side effects"]
    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::Identifier { .. }
                | NodeKind::AttributeExpr { .. }
                | NodeKind::Infix { .. }
                | NodeKind::Prefix { .. }
                | NodeKind::Postfix { .. }
                | NodeKind::Conditional { .. }
                | NodeKind::Cast { .. }
                | NodeKind::Call { .. }
                | NodeKind::Subscript { .. }
                | NodeKind::Unwrap { .. }
                | NodeKind::UnwrapOrElse { .. }
                | NodeKind::IsPresent { .. }
        ) || self.is_literal()
    }

    #[must_use = "this is a pure check with no side effects"]
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            NodeKind::NullLiteral
                | NodeKind::BooleanLiteral { .. }
                | NodeKind::NumericLiteral { .. }
                | NodeKind::StringLiteral { .. }
                | NodeKind::XmlLiteral { .. }
                | NodeKind::EmptyCurly
                | NodeKind::ListLiteral { .. }
                | NodeKind::SetLiteral { .. }
                | NodeKind::MapLiteral { .. }
                | NodeKind::TupleLiteral { .. }
        )
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Node {
    pub id: NodeId,
    pub location: Location,
    pub kind: NodeKind,
    /// Semantic type, written by the finder and refined by the promoter.
    pub ty: Option<Type>,
    pub stage: AnalysisStage,
}
