//! Conversion legality.
//!
//! [`explicit_cast_allowed`] is the relation behind `(T)expr` and behind every cast the promoter
//! inserts on its own. The checks run in a fixed order and the early ones short-circuit the
//! more specific dispatch at the end, so reordering them changes the language.
//!
//! [`implicit_init_allowed`] is the narrower relation used for initializers, where only
//! value-preserving conversions are accepted without a cast token in the source.

use crate::{
    constraints::{Constraint, satisfies},
    queries::element_type,
    types::{MetaType, Type, TypeFactory, TypeKind},
    unifier::{unifies, unifies_strictly},
};

#[must_use = "this is a pure check with no side effects"]
pub fn explicit_cast_allowed(tf: &TypeFactory, from: &Type, to: &Type) -> bool {
    if from.is_void() {
        return false;
    }
    if from == to || to.is_optional_of_same(from) {
        return true;
    }
    match (from.underlying(), to.underlying()) {
        (Some(from_inner), Some(to_inner)) => {
            return explicit_cast_allowed(tf, from_inner, to_inner);
        }
        (None, Some(to_inner)) if explicit_cast_allowed(tf, from, to_inner) => return true,
        _ => {}
    }
    if from.is_null() && to.is_optional() {
        return true;
    }
    if from.is_unknown() || from.is_string() || to.is_unknown() || to.is_string() {
        return true;
    }

    let numeric_non_complex =
        |ty: &Type| satisfies(ty, Constraint::Numeric, false) && !satisfies(ty, Constraint::Complex, false);

    match from.kind() {
        TypeKind::Blob => {
            matches!(to.kind(), TypeKind::List(_) | TypeKind::BList(_, _))
                && element_type(tf, to).meta_type() == MetaType::Uint8
        }
        TypeKind::EmptyCurly => matches!(
            to.kind(),
            TypeKind::Set(_)
                | TypeKind::BSet(_, _)
                | TypeKind::Map(_, _)
                | TypeKind::BMap(_, _, _)
                | TypeKind::Tuple(_)
        ),
        TypeKind::Enum(_) => satisfies(to, Constraint::Integral, false),
        _ if Constraint::Integral.admits(from.meta_type()) => {
            matches!(to.kind(), TypeKind::Enum(_)) || numeric_non_complex(to)
        }
        _ if Constraint::FloatingPoint.admits(from.meta_type()) => {
            numeric_non_complex(to)
                || (from.meta_type() == MetaType::Float64 && to.meta_type() == MetaType::Timestamp)
        }
        TypeKind::Complex32 | TypeKind::Complex64 => satisfies(to, Constraint::Complex, false),
        TypeKind::Timestamp => to.meta_type() == MetaType::Float64,
        TypeKind::List(_) | TypeKind::BList(_, _) => match to.kind() {
            TypeKind::List(_) | TypeKind::BList(_, _) => {
                elements_castable(tf, &element_type(tf, from), &element_type(tf, to))
            }
            TypeKind::Blob => matches!(
                element_type(tf, from).meta_type(),
                MetaType::Uint8 | MetaType::Unknown
            ),
            TypeKind::Complex32 | TypeKind::Complex64 => numeric_non_complex(&element_type(tf, from)),
            _ => false,
        },
        TypeKind::Set(_) | TypeKind::BSet(_, _) => {
            Constraint::Set.admits(to.meta_type())
                && elements_castable(tf, &element_type(tf, from), &element_type(tf, to))
        }
        TypeKind::Map(from_key, from_value) | TypeKind::BMap(from_key, from_value, _) => {
            match to.kind() {
                TypeKind::Map(to_key, to_value) | TypeKind::BMap(to_key, to_value, _) => {
                    if unifies_strictly(from_key, to_key) && unifies_strictly(from_value, to_value) {
                        return true;
                    }
                    let all_primitive = [from_key, to_key, from_value, to_value]
                        .iter()
                        .all(|ty| satisfies(ty, Constraint::Primitive, false));
                    all_primitive
                        && explicit_cast_allowed(tf, from_key, to_key)
                        && explicit_cast_allowed(tf, from_value, to_value)
                }
                _ => false,
            }
        }
        TypeKind::Tuple(_) => match to.kind() {
            TypeKind::Xml(_) => true,
            TypeKind::Tuple(target) => target.iter().all(|(name, to_attribute)| {
                from.tuple_attribute(name)
                    .is_some_and(|from_attribute| unifies_strictly(from_attribute, to_attribute))
            }),
            _ => false,
        },
        TypeKind::Xml(_) => matches!(to.kind(), TypeKind::Xml(_) | TypeKind::Tuple(_)),
        _ => false,
    }
}

fn elements_castable(tf: &TypeFactory, from: &Type, to: &Type) -> bool {
    if unifies_strictly(from, to) {
        return true;
    }
    satisfies(from, Constraint::Primitive, false)
        && satisfies(to, Constraint::Primitive, false)
        && explicit_cast_allowed(tf, from, to)
}

/// Whether a value of type `from` may initialize a variable of type `to` without a cast.
#[must_use = "this is a pure check with no side effects"]
pub fn implicit_init_allowed(from: &Type, to: &Type) -> bool {
    if from == to || from.is_unknown() || to.is_unknown() {
        return true;
    }
    if let Some(inner) = to.underlying() {
        if from.is_null() || from.strip_optional() == inner {
            return true;
        }
        return implicit_init_allowed(from.strip_optional(), inner);
    }
    let (from_meta, to_meta) = (from.meta_type(), to.meta_type());
    if let (Some(from_width), Some(to_width)) = (integral_width(from_meta), integral_width(to_meta)) {
        return from_width.0 == to_width.0 && from_width.1 <= to_width.1;
    }
    if Constraint::Integral.admits(from_meta) && Constraint::FloatingPoint.admits(to_meta) {
        return true;
    }
    match (from.kind(), to.kind()) {
        (TypeKind::Float32, TypeKind::Float64)
        | (TypeKind::Decimal32, TypeKind::Decimal64 | TypeKind::Decimal128)
        | (TypeKind::Decimal64, TypeKind::Decimal128) => true,
        (TypeKind::Ustring | TypeKind::BString(_), TypeKind::Rstring) => true,
        (TypeKind::EmptyCurly, TypeKind::Set(_) | TypeKind::BSet(_, _))
        | (TypeKind::EmptyCurly, TypeKind::Map(_, _) | TypeKind::BMap(_, _, _))
        | (TypeKind::EmptyCurly, TypeKind::Tuple(_)) => true,
        (TypeKind::List(from_elem), TypeKind::List(to_elem) | TypeKind::BList(to_elem, _))
        | (TypeKind::BList(from_elem, _), TypeKind::List(to_elem) | TypeKind::BList(to_elem, _))
        | (TypeKind::Set(from_elem), TypeKind::Set(to_elem) | TypeKind::BSet(to_elem, _))
        | (TypeKind::BSet(from_elem, _), TypeKind::Set(to_elem) | TypeKind::BSet(to_elem, _)) => {
            implicit_init_allowed(from_elem, to_elem)
        }
        (
            TypeKind::Map(from_key, from_value) | TypeKind::BMap(from_key, from_value, _),
            TypeKind::Map(to_key, to_value) | TypeKind::BMap(to_key, to_value, _),
        ) => implicit_init_allowed(from_key, to_key) && implicit_init_allowed(from_value, to_value),
        (TypeKind::Tuple(from_attributes), TypeKind::Tuple(to_attributes)) => {
            from_attributes.len() == to_attributes.len()
                && from_attributes.iter().zip(to_attributes).all(
                    |((from_name, from_ty), (to_name, to_ty))| {
                        from_name == to_name && implicit_init_allowed(from_ty, to_ty)
                    },
                )
        }
        _ => unifies(from, to),
    }
}

/// Signedness and width of an integral meta-type.
fn integral_width(meta: MetaType) -> Option<(bool, u8)> {
    match meta {
        MetaType::Int8 => Some((true, 8)),
        MetaType::Int16 => Some((true, 16)),
        MetaType::Int32 => Some((true, 32)),
        MetaType::Int64 => Some((true, 64)),
        MetaType::Uint8 => Some((false, 8)),
        MetaType::Uint16 => Some((false, 16)),
        MetaType::Uint32 => Some((false, 32)),
        MetaType::Uint64 => Some((false, 64)),
        _ => None,
    }
}
