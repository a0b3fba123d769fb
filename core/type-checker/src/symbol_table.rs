//! Symbol Table
//!
//! In-process rendition of the name-resolution service. The resolver binds identifiers, calls
//! and invocations to ids; this table answers what those ids denote:
//!
//! - symbols: variables, formals, streams and ports, attributes, enum values, type definitions,
//!   operators and composite formals
//! - function signatures, including the checker-owned "makes a stateful call" bit
//! - operator models for primitive and composite operators
//!
//! Ids are dense indices handed out in registration order.

use streamc_ast::nodes::{FunctionId, OperatorId, SymbolId};
use streamc_types::Type;

use crate::operator_model::{ExpressionMode, OperatorModel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Variable { mutable: bool, is_static: bool },
    FunctionFormal { mutable: bool },
    /// The item variable of a `for` loop.
    LoopItem,
    Stream,
    InputPort,
    PortAlias,
    Attribute,
    EnumValue,
    TypeDef { is_static: bool, top_level: bool },
    Operator,
    CompositeFormal { mode: ExpressionMode },
    CompositeName,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
}

impl Symbol {
    #[must_use = "this is a pure check with no side effects"]
    pub fn is_value(&self) -> bool {
        match &self.kind {
            SymbolKind::Variable { .. }
            | SymbolKind::FunctionFormal { .. }
            | SymbolKind::LoopItem
            | SymbolKind::InputPort
            | SymbolKind::PortAlias
            | SymbolKind::Attribute
            | SymbolKind::EnumValue => true,
            SymbolKind::CompositeFormal { mode } => {
                matches!(mode, ExpressionMode::Expression | ExpressionMode::Attribute)
            }
            SymbolKind::Stream
            | SymbolKind::TypeDef { .. }
            | SymbolKind::Operator
            | SymbolKind::CompositeName => false,
        }
    }

    /// Streams and the ports that alias them inside an invocation.
    #[must_use = "this is a pure check with no side effects"]
    pub fn is_stream(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Stream | SymbolKind::InputPort | SymbolKind::PortAlias
        )
    }

    #[must_use = "this is a pure check with no side effects"]
    pub fn is_mutable(&self) -> bool {
        match self.kind {
            SymbolKind::Variable { mutable, .. } | SymbolKind::FunctionFormal { mutable } => mutable,
            SymbolKind::Stream | SymbolKind::InputPort | SymbolKind::PortAlias => true,
            _ => false,
        }
    }

    /// Whether a `static` type definition or a composite config expression may mention this
    /// symbol.
    #[must_use = "this is a pure check with no side effects"]
    pub fn can_extend_static_definition(&self) -> bool {
        match self.kind {
            SymbolKind::InputPort | SymbolKind::Stream | SymbolKind::CompositeFormal { .. } => false,
            SymbolKind::TypeDef {
                is_static,
                top_level,
            } => is_static || top_level,
            SymbolKind::Variable { is_static, .. } => is_static,
            _ => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: Option<String>,
    pub ty: Type,
    pub mutable: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub name: String,
    pub formals: Vec<Parameter>,
    pub return_type: Type,
    pub stateful: bool,
    pub intrinsic: bool,
    /// Custom output functions such as `Sum` or `Max`.
    pub output_function: bool,
    /// Set by the finder when the body calls a stateful function.
    pub makes_stateful_call: bool,
}

impl FunctionSignature {
    #[must_use]
    pub fn new(name: &str, formals: Vec<Type>, return_type: Type) -> Self {
        Self {
            name: name.to_string(),
            formals: formals
                .into_iter()
                .map(|ty| Parameter {
                    name: None,
                    ty,
                    mutable: false,
                })
                .collect(),
            return_type,
            stateful: false,
            intrinsic: false,
            output_function: false,
            makes_stateful_call: false,
        }
    }

    #[must_use]
    pub fn stateful(mut self) -> Self {
        self.stateful = true;
        self
    }

    #[must_use]
    pub fn intrinsic(mut self) -> Self {
        self.intrinsic = true;
        self
    }

    #[must_use]
    pub fn output_function(mut self) -> Self {
        self.output_function = true;
        self
    }

    /// Marks formal `index` as `mutable`.
    ///
    /// # Panics
    ///
    /// Panics if the signature has no formal at `index`.
    #[must_use]
    pub fn mutable_formal(mut self, index: usize) -> Self {
        self.formals[index].mutable = true;
        self
    }

    #[must_use]
    pub fn formal_types(&self) -> Vec<Type> {
        self.formals.iter().map(|formal| formal.ty.clone()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    functions: Vec<FunctionSignature>,
    operators: Vec<OperatorModel>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_symbol(&mut self, name: &str, kind: SymbolKind, ty: Type) -> SymbolId {
        let id = SymbolId(dense_id(self.symbols.len()));
        self.symbols.push(Symbol {
            name: name.to_string(),
            kind,
            ty,
        });
        id
    }

    pub fn add_function(&mut self, signature: FunctionSignature) -> FunctionId {
        let id = FunctionId(dense_id(self.functions.len()));
        self.functions.push(signature);
        id
    }

    pub fn add_operator(&mut self, model: OperatorModel) -> OperatorId {
        let id = OperatorId(dense_id(self.operators.len()));
        self.operators.push(model);
        id
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this table.
    #[must_use = "this is a pure lookup with no side effects"]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this table.
    #[must_use = "this is a pure lookup with no side effects"]
    pub fn function(&self, id: FunctionId) -> &FunctionSignature {
        &self.functions[id.index()]
    }

    pub(crate) fn function_mut(&mut self, id: FunctionId) -> &mut FunctionSignature {
        &mut self.functions[id.index()]
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this table.
    #[must_use = "this is a pure lookup with no side effects"]
    pub fn operator(&self, id: OperatorId) -> &OperatorModel {
        &self.operators[id.index()]
    }
}

fn dense_id(len: usize) -> u32 {
    u32::try_from(len).expect("symbol table exceeds u32::MAX entries")
}
