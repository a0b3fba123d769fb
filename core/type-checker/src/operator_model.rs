//! Read-only operator metadata consumed while checking operator invocations.
//!
//! Primitive operators describe their parameters and output ports; composite operators describe
//! their formals (by symbol) and port counts. Loading these models from toolkits happens outside
//! the checker.

use std::fmt::{self, Display, Formatter};

use rustc_hash::FxHashMap;
use streamc_ast::nodes::SymbolId;
use streamc_types::Type;

/// What kind of actual a composite formal accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionMode {
    Attribute,
    Expression,
    Function,
    Operator,
    Type,
}

impl Display for ExpressionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionMode::Attribute => write!(f, "attribute"),
            ExpressionMode::Expression => write!(f, "expression"),
            ExpressionMode::Function => write!(f, "function"),
            ExpressionMode::Operator => write!(f, "operator"),
            ExpressionMode::Type => write!(f, "type"),
        }
    }
}

/// One parameter of a primitive operator.
#[derive(Debug, Clone)]
pub struct ParameterModel {
    /// Declared type; `Unknown` when the model does not constrain it.
    pub ty: Type,
    /// Number of values expected, `-1` for any.
    pub cardinality: i32,
}

#[derive(Debug, Clone, Default)]
pub struct OutputPortModel {
    pub allow_nested_custom_output_functions: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PrimitiveOperator {
    pub name: String,
    pub parameters: FxHashMap<String, ParameterModel>,
    pub output_ports: Vec<OutputPortModel>,
}

impl PrimitiveOperator {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, name: &str, ty: Type, cardinality: i32) -> Self {
        self.parameters
            .insert(name.to_string(), ParameterModel { ty, cardinality });
        self
    }

    #[must_use]
    pub fn with_output_port(mut self, allow_nested_custom_output_functions: bool) -> Self {
        self.output_ports.push(OutputPortModel {
            allow_nested_custom_output_functions,
        });
        self
    }

    /// Ports the model does not list allow nesting.
    #[must_use = "this is a pure lookup with no side effects"]
    pub fn allows_nested_output_functions(&self, port: usize) -> bool {
        self.output_ports
            .get(port)
            .is_none_or(|model| model.allow_nested_custom_output_functions)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompositeOperator {
    pub name: String,
    /// Formal symbols by parameter name, without the leading `$`.
    pub formals: FxHashMap<String, SymbolId>,
    pub input_ports: usize,
    pub output_ports: usize,
}

#[derive(Debug, Clone)]
pub enum OperatorModel {
    Primitive(PrimitiveOperator),
    Composite(CompositeOperator),
}

impl OperatorModel {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            OperatorModel::Primitive(primitive) => &primitive.name,
            OperatorModel::Composite(composite) => &composite.name,
        }
    }

    #[must_use = "this is a pure check with no side effects"]
    pub fn is_primitive(&self) -> bool {
        matches!(self, OperatorModel::Primitive(_))
    }

    #[must_use]
    pub fn as_primitive(&self) -> Option<&PrimitiveOperator> {
        match self {
            OperatorModel::Primitive(primitive) => Some(primitive),
            OperatorModel::Composite(_) => None,
        }
    }

    #[must_use]
    pub fn as_composite(&self) -> Option<&CompositeOperator> {
        match self {
            OperatorModel::Composite(composite) => Some(composite),
            OperatorModel::Primitive(_) => None,
        }
    }
}
