//! Semantic Types
//!
//! This module defines the universe of semantic types seen by the checker and the
//! [`TypeFactory`] that canonicalizes them.
//!
//! ## Representation
//!
//! A [`Type`] is a cheap, clonable handle over an immutable [`TypeKind`]. Handles produced by
//! the same factory for structurally equal kinds share one allocation, so equality is usually a
//! pointer comparison; the structural comparison is kept as a fallback so that handles from
//! different factories still compare correctly.
//!
//! ## Invariants
//!
//! - `optional<optional<T>>` never exists: [`TypeFactory::optional`] collapses it to `optional<T>`.
//! - Types are never mutated after creation.

use core::fmt;
use std::{
    cell::RefCell,
    fmt::{Display, Formatter},
    hash::{Hash, Hasher},
    rc::Rc,
};

use rustc_hash::FxHashSet;

/// Coarse classification of a type, one entry per [`TypeKind`] variant.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum MetaType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Decimal32,
    Decimal64,
    Decimal128,
    Complex32,
    Complex64,
    Timestamp,
    Rstring,
    Ustring,
    BString,
    Blob,
    List,
    BList,
    Set,
    BSet,
    Map,
    BMap,
    Tuple,
    Enum,
    Xml,
    Optional,
    TypeFormal,
    Unknown,
    Null,
    Void,
    EmptyCurly,
}

impl MetaType {
    /// All meta-types for iteration.
    pub const ALL: &'static [MetaType] = &[
        MetaType::Boolean,
        MetaType::Int8,
        MetaType::Int16,
        MetaType::Int32,
        MetaType::Int64,
        MetaType::Uint8,
        MetaType::Uint16,
        MetaType::Uint32,
        MetaType::Uint64,
        MetaType::Float32,
        MetaType::Float64,
        MetaType::Decimal32,
        MetaType::Decimal64,
        MetaType::Decimal128,
        MetaType::Complex32,
        MetaType::Complex64,
        MetaType::Timestamp,
        MetaType::Rstring,
        MetaType::Ustring,
        MetaType::BString,
        MetaType::Blob,
        MetaType::List,
        MetaType::BList,
        MetaType::Set,
        MetaType::BSet,
        MetaType::Map,
        MetaType::BMap,
        MetaType::Tuple,
        MetaType::Enum,
        MetaType::Xml,
        MetaType::Optional,
        MetaType::TypeFormal,
        MetaType::Unknown,
        MetaType::Null,
        MetaType::Void,
        MetaType::EmptyCurly,
    ];

    /// Scalar meta-types that [`TypeFactory::primitive`] can build without further arguments.
    pub const PRIMITIVES: &'static [MetaType] = &[
        MetaType::Boolean,
        MetaType::Int8,
        MetaType::Int16,
        MetaType::Int32,
        MetaType::Int64,
        MetaType::Uint8,
        MetaType::Uint16,
        MetaType::Uint32,
        MetaType::Uint64,
        MetaType::Float32,
        MetaType::Float64,
        MetaType::Decimal32,
        MetaType::Decimal64,
        MetaType::Decimal128,
        MetaType::Complex32,
        MetaType::Complex64,
        MetaType::Timestamp,
        MetaType::Rstring,
        MetaType::Ustring,
        MetaType::Blob,
    ];

    /// The lowercase name used by constraint lookup and diagnostics.
    #[must_use = "returns the string representation without modifying self"]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetaType::Boolean => "boolean",
            MetaType::Int8 => "int8",
            MetaType::Int16 => "int16",
            MetaType::Int32 => "int32",
            MetaType::Int64 => "int64",
            MetaType::Uint8 => "uint8",
            MetaType::Uint16 => "uint16",
            MetaType::Uint32 => "uint32",
            MetaType::Uint64 => "uint64",
            MetaType::Float32 => "float32",
            MetaType::Float64 => "float64",
            MetaType::Decimal32 => "decimal32",
            MetaType::Decimal64 => "decimal64",
            MetaType::Decimal128 => "decimal128",
            MetaType::Complex32 => "complex32",
            MetaType::Complex64 => "complex64",
            MetaType::Timestamp => "timestamp",
            MetaType::Rstring => "rstring",
            MetaType::Ustring => "ustring",
            MetaType::BString => "bstring",
            MetaType::Blob => "blob",
            MetaType::List => "list",
            MetaType::BList => "blist",
            MetaType::Set => "set",
            MetaType::BSet => "bset",
            MetaType::Map => "map",
            MetaType::BMap => "bmap",
            MetaType::Tuple => "tuple",
            MetaType::Enum => "enum",
            MetaType::Xml => "xml",
            MetaType::Optional => "optional",
            MetaType::TypeFormal => "typeformal",
            MetaType::Unknown => "unknown",
            MetaType::Null => "nul",
            MetaType::Void => "void",
            MetaType::EmptyCurly => "emptycurly",
        }
    }

    #[must_use = "this is a pure check with no side effects"]
    pub const fn is_string(&self) -> bool {
        matches!(self, MetaType::Rstring | MetaType::Ustring | MetaType::BString)
    }
}

impl Display for MetaType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MetaType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|mt| mt.as_str() == s)
            .copied()
            .ok_or(())
    }
}

/// Capacity of a bounded string or collection.
///
/// Generic signatures may use a named bound (`list<T>[N]`) that is bound during unification.
#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub enum Bound {
    Fixed(u32),
    Formal(String),
}

impl Display for Bound {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Bound::Fixed(size) => write!(f, "{size}"),
            Bound::Formal(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub enum TypeKind {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Decimal32,
    Decimal64,
    Decimal128,
    Complex32,
    Complex64,
    Timestamp,
    Rstring,
    Ustring,
    BString(Bound),
    Blob,
    List(Type),
    BList(Type, Bound),
    Set(Type),
    BSet(Type, Bound),
    Map(Type, Type),
    BMap(Type, Type, Bound),
    /// Ordered `(name, type)` attributes.
    Tuple(Vec<(String, Type)>),
    /// Ordered enumerator names.
    Enum(Vec<String>),
    /// Optional compile-time schema.
    Xml(Option<String>),
    Optional(Type),
    /// Generic placeholder, optionally restricted by a named constraint.
    TypeFormal {
        identifier: String,
        constraint: Option<String>,
    },
    Unknown,
    Null,
    Void,
    EmptyCurly,
}

/// Canonical handle to an immutable type.
#[derive(Clone)]
pub struct Type(Rc<TypeKind>);

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Type({self})")
    }
}

impl Type {
    #[must_use]
    pub fn kind(&self) -> &TypeKind {
        &self.0
    }

    #[must_use]
    pub fn meta_type(&self) -> MetaType {
        match self.kind() {
            TypeKind::Boolean => MetaType::Boolean,
            TypeKind::Int8 => MetaType::Int8,
            TypeKind::Int16 => MetaType::Int16,
            TypeKind::Int32 => MetaType::Int32,
            TypeKind::Int64 => MetaType::Int64,
            TypeKind::Uint8 => MetaType::Uint8,
            TypeKind::Uint16 => MetaType::Uint16,
            TypeKind::Uint32 => MetaType::Uint32,
            TypeKind::Uint64 => MetaType::Uint64,
            TypeKind::Float32 => MetaType::Float32,
            TypeKind::Float64 => MetaType::Float64,
            TypeKind::Decimal32 => MetaType::Decimal32,
            TypeKind::Decimal64 => MetaType::Decimal64,
            TypeKind::Decimal128 => MetaType::Decimal128,
            TypeKind::Complex32 => MetaType::Complex32,
            TypeKind::Complex64 => MetaType::Complex64,
            TypeKind::Timestamp => MetaType::Timestamp,
            TypeKind::Rstring => MetaType::Rstring,
            TypeKind::Ustring => MetaType::Ustring,
            TypeKind::BString(_) => MetaType::BString,
            TypeKind::Blob => MetaType::Blob,
            TypeKind::List(_) => MetaType::List,
            TypeKind::BList(_, _) => MetaType::BList,
            TypeKind::Set(_) => MetaType::Set,
            TypeKind::BSet(_, _) => MetaType::BSet,
            TypeKind::Map(_, _) => MetaType::Map,
            TypeKind::BMap(_, _, _) => MetaType::BMap,
            TypeKind::Tuple(_) => MetaType::Tuple,
            TypeKind::Enum(_) => MetaType::Enum,
            TypeKind::Xml(_) => MetaType::Xml,
            TypeKind::Optional(_) => MetaType::Optional,
            TypeKind::TypeFormal { .. } => MetaType::TypeFormal,
            TypeKind::Unknown => MetaType::Unknown,
            TypeKind::Null => MetaType::Null,
            TypeKind::Void => MetaType::Void,
            TypeKind::EmptyCurly => MetaType::EmptyCurly,
        }
    }

    #[must_use = "this is a pure check with no side effects"]
    pub fn is_unknown(&self) -> bool {
        matches!(self.kind(), TypeKind::Unknown)
    }

    #[must_use = "this is a pure check with no side effects"]
    pub fn is_null(&self) -> bool {
        matches!(self.kind(), TypeKind::Null)
    }

    #[must_use = "this is a pure check with no side effects"]
    pub fn is_void(&self) -> bool {
        matches!(self.kind(), TypeKind::Void)
    }

    #[must_use = "this is a pure check with no side effects"]
    pub fn is_optional(&self) -> bool {
        matches!(self.kind(), TypeKind::Optional(_))
    }

    #[must_use = "this is a pure check with no side effects"]
    pub fn is_tuple(&self) -> bool {
        matches!(self.kind(), TypeKind::Tuple(_))
    }

    #[must_use = "this is a pure check with no side effects"]
    pub fn is_type_formal(&self) -> bool {
        matches!(self.kind(), TypeKind::TypeFormal { .. })
    }

    #[must_use = "this is a pure check with no side effects"]
    pub fn is_string(&self) -> bool {
        self.meta_type().is_string()
    }

    /// Lists, sets and maps, bounded or not.
    #[must_use = "this is a pure check with no side effects"]
    pub fn is_collection(&self) -> bool {
        matches!(
            self.kind(),
            TypeKind::List(_)
                | TypeKind::BList(_, _)
                | TypeKind::Set(_)
                | TypeKind::BSet(_, _)
                | TypeKind::Map(_, _)
                | TypeKind::BMap(_, _, _)
        )
    }

    /// The wrapped type of an optional.
    #[must_use]
    pub fn underlying(&self) -> Option<&Type> {
        match self.kind() {
            TypeKind::Optional(inner) => Some(inner),
            _ => None,
        }
    }

    /// This type with one level of optional removed.
    #[must_use]
    pub fn strip_optional(&self) -> &Type {
        self.underlying().unwrap_or(self)
    }

    /// True when `self` is `optional<other>`.
    #[must_use = "this is a pure check with no side effects"]
    pub fn is_optional_of_same(&self, other: &Type) -> bool {
        self.underlying().is_some_and(|inner| inner == other)
    }

    #[must_use]
    pub fn tuple_attributes(&self) -> Option<&[(String, Type)]> {
        match self.kind() {
            TypeKind::Tuple(attributes) => Some(attributes),
            _ => None,
        }
    }

    #[must_use]
    pub fn tuple_attribute(&self, name: &str) -> Option<&Type> {
        self.tuple_attributes()?
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, ty)| ty)
    }

    #[must_use]
    pub fn enum_values(&self) -> Option<&[String]> {
        match self.kind() {
            TypeKind::Enum(values) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub fn bound(&self) -> Option<&Bound> {
        match self.kind() {
            TypeKind::BString(bound)
            | TypeKind::BList(_, bound)
            | TypeKind::BSet(_, bound)
            | TypeKind::BMap(_, _, bound) => Some(bound),
            _ => None,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.kind() {
            TypeKind::BString(bound) => write!(f, "rstring[{bound}]"),
            TypeKind::List(elem) => write!(f, "list<{elem}>"),
            TypeKind::BList(elem, bound) => write!(f, "list<{elem}>[{bound}]"),
            TypeKind::Set(elem) => write!(f, "set<{elem}>"),
            TypeKind::BSet(elem, bound) => write!(f, "set<{elem}>[{bound}]"),
            TypeKind::Map(key, value) => write!(f, "map<{key},{value}>"),
            TypeKind::BMap(key, value, bound) => write!(f, "map<{key},{value}>[{bound}]"),
            TypeKind::Tuple(attributes) => {
                let body = attributes
                    .iter()
                    .map(|(name, ty)| format!("{ty} {name}"))
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "tuple<{body}>")
            }
            TypeKind::Enum(values) => write!(f, "enum{{{}}}", values.join(",")),
            TypeKind::Xml(None) => write!(f, "xml"),
            TypeKind::Xml(Some(schema)) => write!(f, "xml<\"{schema}\">"),
            TypeKind::Optional(inner) => write!(f, "optional<{inner}>"),
            TypeKind::TypeFormal { identifier, .. } => write!(f, "{identifier}"),
            TypeKind::Null => write!(f, "null"),
            TypeKind::EmptyCurly => write!(f, "{{}}"),
            _ => write!(f, "{}", self.meta_type()),
        }
    }
}

/// Canonicalizing constructor for [`Type`] handles.
///
/// A factory is owned by one compilation session; there is no process-wide instance.
#[derive(Debug, Default)]
pub struct TypeFactory {
    interned: RefCell<FxHashSet<Type>>,
}

impl TypeFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical handle for `kind`, creating it on first use.
    pub fn intern(&self, kind: TypeKind) -> Type {
        let candidate = Type(Rc::new(kind));
        let mut interned = self.interned.borrow_mut();
        if let Some(existing) = interned.get(&candidate) {
            return existing.clone();
        }
        interned.insert(candidate.clone());
        candidate
    }

    /// Number of distinct types created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interned.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interned.borrow().is_empty()
    }

    /// Builds a scalar type from its meta-type.
    ///
    /// # Panics
    ///
    /// Panics if `meta` is not listed in [`MetaType::PRIMITIVES`]; composite types need their
    /// dedicated constructors.
    pub fn primitive(&self, meta: MetaType) -> Type {
        let kind = match meta {
            MetaType::Boolean => TypeKind::Boolean,
            MetaType::Int8 => TypeKind::Int8,
            MetaType::Int16 => TypeKind::Int16,
            MetaType::Int32 => TypeKind::Int32,
            MetaType::Int64 => TypeKind::Int64,
            MetaType::Uint8 => TypeKind::Uint8,
            MetaType::Uint16 => TypeKind::Uint16,
            MetaType::Uint32 => TypeKind::Uint32,
            MetaType::Uint64 => TypeKind::Uint64,
            MetaType::Float32 => TypeKind::Float32,
            MetaType::Float64 => TypeKind::Float64,
            MetaType::Decimal32 => TypeKind::Decimal32,
            MetaType::Decimal64 => TypeKind::Decimal64,
            MetaType::Decimal128 => TypeKind::Decimal128,
            MetaType::Complex32 => TypeKind::Complex32,
            MetaType::Complex64 => TypeKind::Complex64,
            MetaType::Timestamp => TypeKind::Timestamp,
            MetaType::Rstring => TypeKind::Rstring,
            MetaType::Ustring => TypeKind::Ustring,
            MetaType::Blob => TypeKind::Blob,
            other => panic!("`{other}` is not a primitive meta-type"),
        };
        self.intern(kind)
    }

    pub fn boolean(&self) -> Type {
        self.intern(TypeKind::Boolean)
    }

    pub fn int32(&self) -> Type {
        self.intern(TypeKind::Int32)
    }

    pub fn uint8(&self) -> Type {
        self.intern(TypeKind::Uint8)
    }

    pub fn uint32(&self) -> Type {
        self.intern(TypeKind::Uint32)
    }

    pub fn float64(&self) -> Type {
        self.intern(TypeKind::Float64)
    }

    pub fn rstring(&self) -> Type {
        self.intern(TypeKind::Rstring)
    }

    pub fn unknown(&self) -> Type {
        self.intern(TypeKind::Unknown)
    }

    pub fn null(&self) -> Type {
        self.intern(TypeKind::Null)
    }

    pub fn void(&self) -> Type {
        self.intern(TypeKind::Void)
    }

    pub fn empty_curly(&self) -> Type {
        self.intern(TypeKind::EmptyCurly)
    }

    pub fn bstring(&self, bound: Bound) -> Type {
        self.intern(TypeKind::BString(bound))
    }

    pub fn list(&self, elem: Type) -> Type {
        self.intern(TypeKind::List(elem))
    }

    pub fn blist(&self, elem: Type, bound: Bound) -> Type {
        self.intern(TypeKind::BList(elem, bound))
    }

    pub fn set(&self, elem: Type) -> Type {
        self.intern(TypeKind::Set(elem))
    }

    pub fn bset(&self, elem: Type, bound: Bound) -> Type {
        self.intern(TypeKind::BSet(elem, bound))
    }

    pub fn map(&self, key: Type, value: Type) -> Type {
        self.intern(TypeKind::Map(key, value))
    }

    pub fn bmap(&self, key: Type, value: Type, bound: Bound) -> Type {
        self.intern(TypeKind::BMap(key, value, bound))
    }

    pub fn tuple(&self, attributes: Vec<(String, Type)>) -> Type {
        self.intern(TypeKind::Tuple(attributes))
    }

    pub fn enumeration(&self, values: Vec<String>) -> Type {
        self.intern(TypeKind::Enum(values))
    }

    pub fn xml(&self, schema: Option<String>) -> Type {
        self.intern(TypeKind::Xml(schema))
    }

    /// `optional<inner>`; an optional argument is returned unchanged.
    pub fn optional(&self, inner: Type) -> Type {
        if inner.is_optional() {
            return inner;
        }
        self.intern(TypeKind::Optional(inner))
    }

    pub fn type_formal(&self, identifier: &str, constraint: Option<&str>) -> Type {
        self.intern(TypeKind::TypeFormal {
            identifier: identifier.to_string(),
            constraint: constraint.map(str::to_string),
        })
    }

    /// Numeric type from a literal suffix: kind `'s'`, `'u'`, `'f'` or `'d'` and a bit width.
    ///
    /// A width of `-1` selects the language default for the kind (int32, uint32, float64,
    /// decimal64). Returns `None` for combinations that have no type.
    pub fn number(&self, kind: char, bits: i32) -> Option<Type> {
        let meta = match (kind, bits) {
            ('s', 8) => MetaType::Int8,
            ('s', 16) => MetaType::Int16,
            ('s', 32 | -1) => MetaType::Int32,
            ('s', 64) => MetaType::Int64,
            ('u', 8) => MetaType::Uint8,
            ('u', 16) => MetaType::Uint16,
            ('u', 32 | -1) => MetaType::Uint32,
            ('u', 64) => MetaType::Uint64,
            ('f', 32) => MetaType::Float32,
            ('f', 64 | -1) => MetaType::Float64,
            ('d', 32) => MetaType::Decimal32,
            ('d', 64 | -1) => MetaType::Decimal64,
            ('d', 128) => MetaType::Decimal128,
            _ => return None,
        };
        Some(self.primitive(meta))
    }
}
