//! Structural queries over [`Type`].
//!
//! All functions here are pure. Inapplicable inputs produce `Unknown` or `false`, except
//! [`key_type`] and [`value_type`], which treat a non-map argument as a checker bug.

use crate::types::{Type, TypeFactory, TypeKind};

/// The contained element type.
///
/// Strings are their own elements, blobs hold `uint8`, maps yield their value type and optionals
/// recurse into the underlying type. Anything else yields `Unknown`.
#[must_use]
pub fn element_type(tf: &TypeFactory, ty: &Type) -> Type {
    match ty.kind() {
        TypeKind::Rstring | TypeKind::Ustring | TypeKind::BString(_) | TypeKind::Xml(_) => {
            ty.clone()
        }
        TypeKind::Blob => tf.uint8(),
        TypeKind::List(elem)
        | TypeKind::BList(elem, _)
        | TypeKind::Set(elem)
        | TypeKind::BSet(elem, _) => elem.clone(),
        TypeKind::Map(_, value) | TypeKind::BMap(_, value, _) => value.clone(),
        TypeKind::Optional(inner) => element_type(tf, inner),
        _ => tf.unknown(),
    }
}

/// Key type of a map, after unwrapping one optional level.
///
/// # Panics
///
/// Panics when `ty` is not a map; callers check the kind first.
#[must_use]
pub fn key_type(ty: &Type) -> Type {
    match ty.strip_optional().kind() {
        TypeKind::Map(key, _) | TypeKind::BMap(key, _, _) => key.clone(),
        _ => panic!("key type requested for non-map type `{ty}`"),
    }
}

/// Value type of a map, after unwrapping one optional level.
///
/// # Panics
///
/// Panics when `ty` is not a map; callers check the kind first.
#[must_use]
pub fn value_type(ty: &Type) -> Type {
    match ty.strip_optional().kind() {
        TypeKind::Map(_, value) | TypeKind::BMap(_, value, _) => value.clone(),
        _ => panic!("value type requested for non-map type `{ty}`"),
    }
}

/// The type an index into `ty` must have.
#[must_use]
pub fn subscript_type(tf: &TypeFactory, ty: &Type) -> Type {
    match ty.kind() {
        TypeKind::List(_) | TypeKind::BList(_, _) => tf.uint32(),
        TypeKind::Map(key, _) | TypeKind::BMap(key, _, _) => key.clone(),
        TypeKind::Rstring | TypeKind::Ustring | TypeKind::BString(_) => ty.clone(),
        TypeKind::Blob => tf.uint8(),
        _ => tf.unknown(),
    }
}

/// Lists and maps, bounded or not: the containers whose elements are addressable by index.
#[must_use = "this is a pure check with no side effects"]
pub fn is_mappable_container(ty: &Type) -> bool {
    matches!(
        ty.kind(),
        TypeKind::List(_) | TypeKind::BList(_, _) | TypeKind::Map(_, _) | TypeKind::BMap(_, _, _)
    )
}

/// True when `coll` is a mappable container whose element type is exactly `elem`.
#[must_use = "this is a pure check with no side effects"]
pub fn is_element_of(tf: &TypeFactory, elem: &Type, coll: &Type) -> bool {
    is_mappable_container(coll) && element_type(tf, coll) == *elem
}

/// Whether `elem` can be searched for in `coll` with `in`.
///
/// Strings and blobs are searchable alongside lists, sets and maps. A plain value or `null` may
/// be looked up among optional elements of the same underlying type.
#[must_use = "this is a pure check with no side effects"]
pub fn is_member_of(tf: &TypeFactory, elem: &Type, coll: &Type) -> bool {
    let searchable =
        coll.is_collection() || coll.is_string() || matches!(coll.kind(), TypeKind::Blob);
    if !searchable {
        return false;
    }
    let member = element_type(tf, coll);
    member == *elem
        || member.is_optional_of_same(elem)
        || (elem.is_null() && member.is_optional())
}

/// Whether `ty` supports `[index]` (or `[lo:hi]` when `slice` is set).
#[must_use = "this is a pure check with no side effects"]
pub fn is_subscriptable(ty: &Type, slice: bool) -> bool {
    match ty.kind() {
        TypeKind::Rstring
        | TypeKind::Ustring
        | TypeKind::BString(_)
        | TypeKind::Blob
        | TypeKind::List(_)
        | TypeKind::BList(_, _) => true,
        TypeKind::Map(_, _) | TypeKind::BMap(_, _, _) => !slice,
        _ => false,
    }
}

/// Rebuilds collection `coll` with `elem` as its element (value for maps) type.
///
/// Comparison operators applied element-wise use this to produce `list<boolean>` from
/// `list<int32>`. Non-collections are returned unchanged.
#[must_use]
pub fn collection_subst(tf: &TypeFactory, coll: &Type, elem: Type) -> Type {
    match coll.kind() {
        TypeKind::List(_) => tf.list(elem),
        TypeKind::BList(_, bound) => tf.blist(elem, bound.clone()),
        TypeKind::Set(_) => tf.set(elem),
        TypeKind::BSet(_, bound) => tf.bset(elem, bound.clone()),
        TypeKind::Map(key, _) => tf.map(key.clone(), elem),
        TypeKind::BMap(key, _, bound) => tf.bmap(key.clone(), elem, bound.clone()),
        _ => coll.clone(),
    }
}

/// Rebuilds a list, set or map literal type around new element (key, value) types, keeping the
/// container kind and bound of `template`.
#[must_use]
pub fn rebuild_container(tf: &TypeFactory, template: &Type, key: Option<Type>, elem: Type) -> Type {
    match (template.kind(), key) {
        (TypeKind::BList(_, bound), _) => tf.blist(elem, bound.clone()),
        (TypeKind::Set(_), _) => tf.set(elem),
        (TypeKind::BSet(_, bound), _) => tf.bset(elem, bound.clone()),
        (TypeKind::Map(..), Some(key)) => tf.map(key, elem),
        (TypeKind::BMap(_, _, bound), Some(key)) => tf.bmap(key, elem, bound.clone()),
        _ => tf.list(elem),
    }
}

/// True when `ty` mentions `Null` anywhere in its structure.
#[must_use = "this is a pure check with no side effects"]
pub fn contains_null(ty: &Type) -> bool {
    match ty.kind() {
        TypeKind::Null => true,
        TypeKind::List(elem)
        | TypeKind::BList(elem, _)
        | TypeKind::Set(elem)
        | TypeKind::BSet(elem, _)
        | TypeKind::Optional(elem) => contains_null(elem),
        TypeKind::Map(key, value) | TypeKind::BMap(key, value, _) => {
            contains_null(key) || contains_null(value)
        }
        TypeKind::Tuple(attributes) => attributes.iter().any(|(_, ty)| contains_null(ty)),
        _ => false,
    }
}
