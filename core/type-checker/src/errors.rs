use std::fmt::{self, Display, Formatter};

use streamc_ast::nodes::Location;
use streamc_types::Type;
use thiserror::Error;

use crate::operator_model::ExpressionMode;

/// How the operand shapes of an infix expression were expected to relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandRelation {
    SameType,
    SameCollectionType,
    ElementOf,
    ContainerFor,
}

impl Display for OperandRelation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OperandRelation::SameType => write!(f, "the same type as"),
            OperandRelation::SameCollectionType => write!(f, "the same collection type as"),
            OperandRelation::ElementOf => write!(f, "an element of"),
            OperandRelation::ContainerFor => write!(f, "a container for"),
        }
    }
}

fn join_relations(relations: &[OperandRelation]) -> String {
    relations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Clause of an operator invocation that composite operators cannot take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationClause {
    Logic,
    Window,
    Output,
}

impl Display for InvocationClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InvocationClause::Logic => write!(f, "logic"),
            InvocationClause::Window => write!(f, "window"),
            InvocationClause::Output => write!(f, "output"),
        }
    }
}

/// Direction of an operator port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl Display for PortDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => write!(f, "input"),
            PortDirection::Output => write!(f, "output"),
        }
    }
}

/// A diagnostic produced by the expression type finder or the type promoter.
/// Every diagnostic is tied to the AST node it was found at.
#[derive(Debug, Clone, Error)]
pub enum TypeCheckError {
    #[error(
        "{location}: operator `{operator}` expects {requirement} operands where the left is {} the right, found `{left}` and `{right}`",
        join_relations(relations)
    )]
    InfixMismatch {
        operator: String,
        left: Type,
        right: Type,
        relations: Vec<OperandRelation>,
        requirement: &'static str,
        location: Location,
    },

    #[error("{location}: left operand `{left}` of `{operator}` must be {relation} right operand `{right}`")]
    InfixRelative {
        operator: String,
        left: Type,
        relation: OperandRelation,
        right: Type,
        location: Location,
    },

    #[error("{location}: operator `{operator}` expects {requirement} operands, found `{left}` and `{right}`")]
    InfixAbsolute {
        operator: String,
        left: Type,
        right: Type,
        requirement: &'static str,
        location: Location,
    },

    #[error("{location}: both operands of `{operator}` are `null`")]
    InfixOperandsBothNull { operator: String, location: Location },

    #[error("{location}: shift `{operator}` needs integral operands, found `{left}` and `{right}`")]
    InfixShift {
        operator: String,
        left: Type,
        right: Type,
        location: Location,
    },

    #[error("{location}: cannot assign to a slice of `{collection}`")]
    AssignToSlice { collection: Type, location: Location },

    #[error("{location}: cannot assign to a character of string `{string}`")]
    AssignToStringSubscript { string: Type, location: Location },

    #[error("{location}: operand of `{operator}` must be mutable")]
    ExpectedMutableOperand { operator: String, location: Location },

    #[error("{location}: unary operator `{operator}` expects an operand that is {requirement}, found `{found}`")]
    UnaryMismatch {
        operator: String,
        requirement: &'static str,
        found: Type,
        location: Location,
    },

    #[error("{location}: cannot index `{collection}` with `{index}`")]
    SubscriptIndex {
        collection: Type,
        index: Type,
        location: Location,
    },

    #[error("{location}: cannot slice `{collection}` with bounds `{lower}` and `{upper}`")]
    SubscriptSlice {
        collection: Type,
        lower: Type,
        upper: Type,
        location: Location,
    },

    #[error("{location}: history access on stream `{stream}` cannot use a slice")]
    HistorySlice { stream: String, location: Location },

    #[error("{location}: history index on stream `{stream}` must be integral, found `{index}`")]
    HistoryType {
        stream: String,
        index: Type,
        location: Location,
    },

    #[error("{location}: elements of {kind} literal have no common type")]
    HeterogeneousLiteral {
        kind: &'static str,
        location: Location,
    },

    #[error("{location}: invalid numeric literal `{text}`")]
    InvalidNumericLiteral { text: String, location: Location },

    #[error("{location}: cannot cast `{from}` to `{to}`")]
    InvalidCast {
        from: Type,
        to: Type,
        location: Location,
    },

    #[error("{location}: invalid XML literal `{value}` for `{target}`: {message}")]
    InvalidXmlLiteral {
        value: String,
        target: Type,
        message: String,
        location: Location,
    },

    #[error("{location}: cannot initialize a variable of type `{expected}` with a value of type `{found}`")]
    TypeMismatchVarinit {
        expected: Type,
        found: Type,
        location: Location,
    },

    #[error("{location}: condition must be `boolean`, found `{found}`")]
    CondExpr { found: Type, location: Location },

    #[error("{location}: conditional branches have different types `{then_type}` and `{else_type}`")]
    CondExprArgs {
        then_type: Type,
        else_type: Type,
        location: Location,
    },

    #[error("{location}: `break` outside of a loop")]
    BreakOutsideLoop { location: Location },

    #[error("{location}: `continue` outside of a loop")]
    ContinueOutsideLoop { location: Location },

    #[error("{location}: `return` outside of a function")]
    ReturnOutsideFunction { location: Location },

    #[error("{location}: function `{function}` returns `void` but a value is returned")]
    VoidValueReturn { function: String, location: Location },

    #[error("{location}: `return` in an operator logic clause cannot carry a value")]
    VoidValueReturnLogicClause { location: Location },

    #[error("{location}: returning `{found}` from function `{function}` declared to return `{expected}`")]
    TypeMismatchReturn {
        function: String,
        expected: Type,
        found: Type,
        location: Location,
    },

    #[error("{location}: function `{function}` does not end with a `return` on every path")]
    MissingReturn { function: String, location: Location },

    #[error("{location}: function `{function}` is declared stateful but makes no stateful call")]
    FunctionNeedNotBeStateful { function: String, location: Location },

    #[error("{location}: `{name}` does not name a value")]
    ValueNameExpected { name: String, location: Location },

    #[error("{location}: `{attribute}` is not an attribute of `{owner}`")]
    NotAnAttributeOf {
        attribute: String,
        owner: String,
        location: Location,
    },

    #[error("{location}: argument {position} of `{function}` must be mutable")]
    ExpectedMutableActual {
        function: String,
        position: String,
        location: Location,
    },

    #[error("{location}: `{caller}` must be stateful to call stateful function `{callee}`")]
    CallerMustBeStateful {
        caller: String,
        callee: String,
        location: Location,
    },

    #[error("{location}: submitted tuple `{tuple}` does not match the type `{port}` of the port")]
    PortNameTypeMismatch {
        tuple: Type,
        port: Type,
        location: Location,
    },

    #[error("{location}: operand of `{operator}` is `null`")]
    OptionalOperandNull { operator: String, location: Location },

    #[error("{location}: stream of type `{found}` on port `{port}` does not match the declared type `{expected}`")]
    MismatchedTypesOnPort {
        port: String,
        found: Type,
        expected: Type,
        location: Location,
    },

    #[error("{location}: streams on port `{port}` must all have type `{expected}`")]
    HeterogeneousTypesOnPort {
        port: String,
        expected: Type,
        location: Location,
    },

    #[error("{location}: operator `{operator}` declares {expected} {direction} ports, but {found} are used")]
    IncorrectNumberOfPorts {
        operator: String,
        direction: PortDirection,
        expected: usize,
        found: usize,
        location: Location,
    },

    #[error("{location}: composite operator invocations cannot have a `{clause}` clause")]
    UnexpectedCompositeClause {
        clause: InvocationClause,
        location: Location,
    },

    #[error("{location}: attribute `{attribute}` is assigned more than once")]
    DuplicateOutputAssignment { attribute: String, location: Location },

    #[error("{location}: custom output function `{function}` cannot be nested inside another expression")]
    CustomOutputFunctionNested { function: String, location: Location },

    #[error("{location}: parameter `{parameter}` expects {expected} value(s), found {found}")]
    OperatorParameterCardinality {
        parameter: String,
        expected: i32,
        found: usize,
        location: Location,
    },

    #[error("{location}: parameter `{parameter}` expects `{expected}`, found `{found}`")]
    TypeMismatchOperatorParameter {
        parameter: String,
        expected: Type,
        found: Type,
        location: Location,
    },

    #[error("{location}: actual of primitive operator parameter `{parameter}` must denote a value")]
    PrimitiveActualMustDenoteValue { parameter: String, location: Location },

    #[error("{location}: actual of composite parameter `{formal}` must be of {mode} mode")]
    ExpressionModeViolation {
        formal: String,
        mode: ExpressionMode,
        location: Location,
    },

    #[error("{location}: default of composite parameter `{formal}` cannot refer to composite parameter `{referenced}`")]
    CompositeFormalRef {
        formal: String,
        referenced: String,
        location: Location,
    },

    #[error("{location}: `defaultPoolSize` takes exactly one expression, found {found}")]
    ConfigDefaultPoolArity { found: usize, location: Location },

    #[error("{location}: `defaultPoolSize` must be integral, found `{found}`")]
    ConfigDefaultPoolSize { found: Type, location: Location },

    #[error("{location}: `threadedPort` is only valid on primitive operator invocations")]
    ThreadedPortNotPrimitive { location: Location },

    #[error("{location}: `{port}` in `threadedPort` is not an input stream of this invocation")]
    ThreadedPortBadQueue { port: String, location: Location },

    #[error("{location}: static definition `{definition}` refers to non-static `{name}`")]
    NonstaticDefiningStatic {
        definition: String,
        name: String,
        location: Location,
    },

    #[error("{location}: `getThisCompositeInstanceName` cannot be used in a static definition")]
    ThisCompositeInstanceStatic { location: Location },

    #[error("{location}: `{parameter}` of `@{annotation}` must have type `{expected}`, found `{found}`")]
    AnnotationIncorrectType {
        parameter: String,
        annotation: String,
        expected: &'static str,
        found: Type,
        location: Location,
    },

    #[error("{location}: invalid value for `{parameter}` of `@{annotation}`")]
    AnnotationInvalidParameterValue {
        parameter: String,
        annotation: String,
        location: Location,
    },

    #[error("{location}: `{name}` is modified here and used elsewhere in the same expression")]
    UseModConflict { name: String, location: Location },

    #[error("{location}: other use of `{name}`")]
    UseModConflictDetail { name: String, location: Location },

    #[error("{location}: stateful functions `{first}` and `{second}` are called in the same expression")]
    TwoStatefulCalls {
        first: String,
        second: String,
        location: Location,
    },

    #[error("{location}: submission time value `{name}` has conflicting default values")]
    SubmissionValueConflict { name: String, location: Location },

    #[error("{location}: previous definition of submission time value `{name}`")]
    SubmissionValueConflictDetail { name: String, location: Location },

    #[error("{location}: cannot promote `null` to non-optional type `{target}`")]
    CantPromoteNull { target: Type, location: Location },

    #[error("{location}: `null` without a type must be cast to an optional type")]
    CantHaveUncastedNull { location: Location },
}

impl TypeCheckError {
    #[must_use = "this is a pure lookup with no side effects"]
    pub fn location(&self) -> &Location {
        match self {
            TypeCheckError::InfixMismatch { location, .. }
            | TypeCheckError::InfixRelative { location, .. }
            | TypeCheckError::InfixAbsolute { location, .. }
            | TypeCheckError::InfixOperandsBothNull { location, .. }
            | TypeCheckError::InfixShift { location, .. }
            | TypeCheckError::AssignToSlice { location, .. }
            | TypeCheckError::AssignToStringSubscript { location, .. }
            | TypeCheckError::ExpectedMutableOperand { location, .. }
            | TypeCheckError::UnaryMismatch { location, .. }
            | TypeCheckError::SubscriptIndex { location, .. }
            | TypeCheckError::SubscriptSlice { location, .. }
            | TypeCheckError::HistorySlice { location, .. }
            | TypeCheckError::HistoryType { location, .. }
            | TypeCheckError::HeterogeneousLiteral { location, .. }
            | TypeCheckError::InvalidNumericLiteral { location, .. }
            | TypeCheckError::InvalidCast { location, .. }
            | TypeCheckError::InvalidXmlLiteral { location, .. }
            | TypeCheckError::TypeMismatchVarinit { location, .. }
            | TypeCheckError::CondExpr { location, .. }
            | TypeCheckError::CondExprArgs { location, .. }
            | TypeCheckError::BreakOutsideLoop { location }
            | TypeCheckError::ContinueOutsideLoop { location }
            | TypeCheckError::ReturnOutsideFunction { location }
            | TypeCheckError::VoidValueReturn { location, .. }
            | TypeCheckError::VoidValueReturnLogicClause { location }
            | TypeCheckError::TypeMismatchReturn { location, .. }
            | TypeCheckError::MissingReturn { location, .. }
            | TypeCheckError::FunctionNeedNotBeStateful { location, .. }
            | TypeCheckError::ValueNameExpected { location, .. }
            | TypeCheckError::NotAnAttributeOf { location, .. }
            | TypeCheckError::ExpectedMutableActual { location, .. }
            | TypeCheckError::CallerMustBeStateful { location, .. }
            | TypeCheckError::PortNameTypeMismatch { location, .. }
            | TypeCheckError::OptionalOperandNull { location, .. }
            | TypeCheckError::MismatchedTypesOnPort { location, .. }
            | TypeCheckError::HeterogeneousTypesOnPort { location, .. }
            | TypeCheckError::IncorrectNumberOfPorts { location, .. }
            | TypeCheckError::UnexpectedCompositeClause { location, .. }
            | TypeCheckError::DuplicateOutputAssignment { location, .. }
            | TypeCheckError::CustomOutputFunctionNested { location, .. }
            | TypeCheckError::OperatorParameterCardinality { location, .. }
            | TypeCheckError::TypeMismatchOperatorParameter { location, .. }
            | TypeCheckError::PrimitiveActualMustDenoteValue { location, .. }
            | TypeCheckError::ExpressionModeViolation { location, .. }
            | TypeCheckError::CompositeFormalRef { location, .. }
            | TypeCheckError::ConfigDefaultPoolArity { location, .. }
            | TypeCheckError::ConfigDefaultPoolSize { location, .. }
            | TypeCheckError::ThreadedPortNotPrimitive { location }
            | TypeCheckError::ThreadedPortBadQueue { location, .. }
            | TypeCheckError::NonstaticDefiningStatic { location, .. }
            | TypeCheckError::ThisCompositeInstanceStatic { location }
            | TypeCheckError::AnnotationIncorrectType { location, .. }
            | TypeCheckError::AnnotationInvalidParameterValue { location, .. }
            | TypeCheckError::UseModConflict { location, .. }
            | TypeCheckError::UseModConflictDetail { location, .. }
            | TypeCheckError::TwoStatefulCalls { location, .. }
            | TypeCheckError::SubmissionValueConflict { location, .. }
            | TypeCheckError::SubmissionValueConflictDetail { location, .. }
            | TypeCheckError::CantPromoteNull { location, .. }
            | TypeCheckError::CantHaveUncastedNull { location } => location,
        }
    }
}
