//! Named type constraints.
//!
//! Operators and generic formals restrict their operand types by constraint name
//! (`T: numeric`, `+` requires `addable`, ...). Each [`Constraint`] is a fixed set of
//! meta-types; [`satisfies_constraint`] answers membership.
//!
//! `Unknown` satisfies every constraint so that one bad operand does not cascade into
//! further diagnostics. A constraint name that is not listed here is matched against the
//! meta-type name itself, which is how signatures spell "exactly `boolean`".

use crate::types::{MetaType, Type};

#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
pub enum Constraint {
    Integral,
    Float,
    Decimal,
    FloatingPoint,
    Complex,
    Numeric,
    String,
    Andorable,
    Subtractable,
    Addable,
    Ordered,
    Primitive,
    List,
    Map,
    Set,
    Collection,
    Composite,
    Equatable,
    Any,
}

impl Constraint {
    pub const ALL: &'static [Constraint] = &[
        Constraint::Integral,
        Constraint::Float,
        Constraint::Decimal,
        Constraint::FloatingPoint,
        Constraint::Complex,
        Constraint::Numeric,
        Constraint::String,
        Constraint::Andorable,
        Constraint::Subtractable,
        Constraint::Addable,
        Constraint::Ordered,
        Constraint::Primitive,
        Constraint::List,
        Constraint::Map,
        Constraint::Set,
        Constraint::Collection,
        Constraint::Composite,
        Constraint::Equatable,
        Constraint::Any,
    ];

    #[must_use = "returns the string representation without modifying self"]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Constraint::Integral => "integral",
            Constraint::Float => "float",
            Constraint::Decimal => "decimal",
            Constraint::FloatingPoint => "floatingpoint",
            Constraint::Complex => "complex",
            Constraint::Numeric => "numeric",
            Constraint::String => "string",
            Constraint::Andorable => "andorable",
            Constraint::Subtractable => "subtractable",
            Constraint::Addable => "addable",
            Constraint::Ordered => "ordered",
            Constraint::Primitive => "primitive",
            Constraint::List => "list",
            Constraint::Map => "map",
            Constraint::Set => "set",
            Constraint::Collection => "collection",
            Constraint::Composite => "composite",
            Constraint::Equatable => "equatable",
            Constraint::Any => "any",
        }
    }

    /// Human readable phrase used in operand diagnostics.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Constraint::Addable => "addable (numeric, string or timestamp)",
            Constraint::Andorable => "andorable (integral or boolean)",
            Constraint::Integral => "integral",
            Constraint::Numeric => "numeric",
            Constraint::Ordered => "ordered",
            Constraint::Subtractable => "subtractable (numeric or timestamp)",
            Constraint::Equatable => "equatable",
            other => other.as_str(),
        }
    }

    /// Whether a value of meta-type `meta` is in this constraint's set.
    #[must_use = "this is a pure check with no side effects"]
    pub fn admits(self, meta: MetaType) -> bool {
        use MetaType as M;
        match self {
            Constraint::Integral => matches!(
                meta,
                M::Int8 | M::Int16 | M::Int32 | M::Int64 | M::Uint8 | M::Uint16 | M::Uint32 | M::Uint64
            ),
            Constraint::Float => matches!(meta, M::Float32 | M::Float64),
            Constraint::Decimal => matches!(meta, M::Decimal32 | M::Decimal64 | M::Decimal128),
            Constraint::FloatingPoint => {
                Constraint::Float.admits(meta) || Constraint::Decimal.admits(meta)
            }
            Constraint::Complex => matches!(meta, M::Complex32 | M::Complex64),
            Constraint::Numeric => {
                Constraint::Integral.admits(meta)
                    || Constraint::FloatingPoint.admits(meta)
                    || Constraint::Complex.admits(meta)
            }
            Constraint::String => meta.is_string(),
            Constraint::Andorable => meta == M::Boolean || Constraint::Integral.admits(meta),
            Constraint::Subtractable => meta == M::Timestamp || Constraint::Numeric.admits(meta),
            Constraint::Addable => {
                Constraint::Subtractable.admits(meta) || Constraint::String.admits(meta)
            }
            Constraint::Ordered => {
                matches!(meta, M::Boolean | M::Enum | M::Timestamp | M::Blob)
                    || Constraint::Integral.admits(meta)
                    || Constraint::FloatingPoint.admits(meta)
                    || Constraint::String.admits(meta)
            }
            Constraint::Primitive => {
                matches!(meta, M::Xml)
                    || Constraint::Ordered.admits(meta)
                    || Constraint::Complex.admits(meta)
            }
            Constraint::List => matches!(meta, M::List | M::BList),
            Constraint::Map => matches!(meta, M::Map | M::BMap),
            Constraint::Set => matches!(meta, M::Set | M::BSet),
            Constraint::Collection => {
                Constraint::List.admits(meta)
                    || Constraint::Map.admits(meta)
                    || Constraint::Set.admits(meta)
            }
            Constraint::Composite => {
                matches!(meta, M::Tuple | M::Optional) || Constraint::Collection.admits(meta)
            }
            Constraint::Equatable => {
                Constraint::Primitive.admits(meta) || Constraint::Composite.admits(meta)
            }
            Constraint::Any => true,
        }
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Constraint {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or(())
    }
}

/// Checks `ty` (or its optional-unwrapped form when `use_underlying` is set) against `constraint`.
#[must_use = "this is a pure check with no side effects"]
pub fn satisfies(ty: &Type, constraint: Constraint, use_underlying: bool) -> bool {
    let ty = if use_underlying { ty.strip_optional() } else { ty };
    ty.is_unknown() || constraint.admits(ty.meta_type())
}

/// Name based variant of [`satisfies`] used for constraints spelled in signatures.
#[must_use = "this is a pure check with no side effects"]
pub fn satisfies_constraint(ty: &Type, name: &str, use_underlying: bool) -> bool {
    match name.parse::<Constraint>() {
        Ok(constraint) => satisfies(ty, constraint, use_underlying),
        Err(()) => {
            let ty = if use_underlying { ty.strip_optional() } else { ty };
            ty.is_unknown() || ty.meta_type().as_str() == name
        }
    }
}
