//! Generic unification.
//!
//! [`Unifier`] matches two types structurally while binding type-formals (`T`) and bounds-formals
//! (`N` in `list<T>[N]`). Once a mismatch is found the unifier stays failed; callers read the
//! outcome with [`Unifier::is_failure`] after all pairs have been fed in.

use rustc_hash::FxHashMap;

use crate::{
    constraints::satisfies_constraint,
    types::{Bound, Type, TypeFactory, TypeKind},
};

/// How a call site may match `T` against `optional<T>` when meta-types differ.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum OptionalTolerance {
    /// Meta-types must agree.
    Strict,
    /// An optional on the right-hand side is unwrapped.
    StripRight,
    /// An optional on the left-hand side is unwrapped.
    StripLeft,
}

#[derive(Debug, Default)]
pub struct Unifier {
    failed: bool,
    formals: FxHashMap<String, Type>,
    types: FxHashMap<String, Type>,
    bounds: FxHashMap<String, Bound>,
}

impl Unifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Unifies `x` with `y` strictly and checks every binding against its formal's constraint.
    #[must_use]
    pub fn unify(x: &Type, y: &Type) -> Self {
        let mut unifier = Self::new();
        unifier.unify_types(x, y, OptionalTolerance::Strict, false, false);
        unifier.check_all_constraints();
        unifier
    }

    /// Unifies actual argument types against a signature's formal types.
    ///
    /// Arguments may be optional-promoted into formals, so the right-hand optional is tolerated.
    /// `submit` is special: its port type must not be re-bound by a later actual.
    #[must_use]
    pub fn unify_call(name: &str, actuals: &[Type], formals: &[Type]) -> Self {
        let mut unifier = Self::new();
        if actuals.len() != formals.len() {
            unifier.failed = true;
            return unifier;
        }
        let is_submit = name == "submit";
        for (actual, formal) in actuals.iter().zip(formals) {
            unifier.unify_types(actual, formal, OptionalTolerance::StripRight, true, is_submit);
            if unifier.failed {
                return unifier;
            }
        }
        unifier.check_all_constraints();
        unifier
    }

    #[must_use = "this is a pure check with no side effects"]
    pub fn is_failure(&self) -> bool {
        self.failed
    }

    #[must_use]
    pub fn binding(&self, identifier: &str) -> Option<&Type> {
        self.types.get(identifier)
    }

    fn fail(&mut self) {
        self.failed = true;
    }

    fn check_all_constraints(&mut self) {
        if self.failed {
            return;
        }
        let satisfied = self.types.iter().all(|(identifier, bound)| {
            let Some(constraint) = self.constraint_of(identifier) else {
                return true;
            };
            match bound.kind() {
                TypeKind::TypeFormal {
                    constraint: other, ..
                } => other.as_deref().is_none_or(|other| other == constraint),
                _ => satisfies_constraint(bound, constraint, false),
            }
        });
        if !satisfied {
            self.fail();
        }
    }

    fn constraint_of(&self, identifier: &str) -> Option<&str> {
        self.formals
            .get(identifier)
            .and_then(|formal| match formal.kind() {
                TypeKind::TypeFormal { constraint, .. } => constraint.as_deref(),
                _ => None,
            })
    }

    pub fn unify_types(
        &mut self,
        x: &Type,
        y: &Type,
        tolerance: OptionalTolerance,
        is_call: bool,
        is_submit: bool,
    ) {
        if self.failed || x == y || x.is_unknown() || y.is_unknown() {
            return;
        }
        if x.is_type_formal() {
            self.unify_formal_left(x, y);
            return;
        }
        if y.is_type_formal() {
            self.unify_formal_right(x, y, is_call, is_submit);
            return;
        }
        if x.is_null() || y.is_null() {
            let other = if x.is_null() { y } else { x };
            if !other.is_optional() {
                self.fail();
            }
            return;
        }
        if x.meta_type() != y.meta_type() {
            match (tolerance, x.kind(), y.kind()) {
                (OptionalTolerance::StripRight, _, TypeKind::Optional(inner)) => {
                    self.unify_types(x, inner, tolerance, false, false);
                }
                (OptionalTolerance::StripLeft, TypeKind::Optional(inner), _) => {
                    self.unify_types(inner, y, tolerance, false, false);
                }
                _ => self.fail(),
            }
            return;
        }
        match (x.kind(), y.kind()) {
            (TypeKind::Xml(_), _) | (TypeKind::Enum(_), _) => self.fail(),
            (TypeKind::BString(bx), TypeKind::BString(by)) => self.unify_bounds(bx, by),
            (TypeKind::List(ex), TypeKind::List(ey))
            | (TypeKind::Set(ex), TypeKind::Set(ey))
            | (TypeKind::Optional(ex), TypeKind::Optional(ey)) => {
                self.unify_types(ex, ey, tolerance, false, false);
            }
            (TypeKind::BList(ex, bx), TypeKind::BList(ey, by))
            | (TypeKind::BSet(ex, bx), TypeKind::BSet(ey, by)) => {
                self.unify_types(ex, ey, tolerance, false, false);
                self.unify_bounds(bx, by);
            }
            (TypeKind::Map(kx, vx), TypeKind::Map(ky, vy)) => {
                self.unify_types(kx, ky, tolerance, false, false);
                self.unify_types(vx, vy, tolerance, false, false);
            }
            (TypeKind::BMap(kx, vx, bx), TypeKind::BMap(ky, vy, by)) => {
                self.unify_types(kx, ky, tolerance, false, false);
                self.unify_types(vx, vy, tolerance, false, false);
                self.unify_bounds(bx, by);
            }
            (TypeKind::Tuple(ax), TypeKind::Tuple(ay)) => {
                if ax.len() != ay.len() || ax.iter().zip(ay).any(|((nx, _), (ny, _))| nx != ny) {
                    self.fail();
                    return;
                }
                for ((_, tx), (_, ty)) in ax.iter().zip(ay) {
                    self.unify_types(tx, ty, tolerance, false, false);
                }
            }
            // Same scalar meta-type.
            _ => {}
        }
    }

    fn unify_formal_left(&mut self, var: &Type, x: &Type) {
        let name = formal_name(var);
        if let Some(bound) = self.types.get(name).cloned() {
            self.unify_types(x, &bound, OptionalTolerance::StripRight, false, false);
            return;
        }
        if x.is_type_formal()
            && let Some(bound) = self.types.get(formal_name(x)).cloned()
        {
            self.unify_types(&bound, var, OptionalTolerance::StripRight, false, false);
            return;
        }
        self.bind(var, x);
    }

    fn unify_formal_right(&mut self, x: &Type, var: &Type, is_call: bool, is_submit: bool) {
        let name = formal_name(var);
        if let Some(bound) = self.types.get(name).cloned() {
            let tolerance = if is_call && is_submit {
                OptionalTolerance::StripLeft
            } else {
                OptionalTolerance::StripRight
            };
            self.unify_types(x, &bound, tolerance, false, false);
            return;
        }
        if x.is_type_formal()
            && let Some(bound) = self.types.get(formal_name(x)).cloned()
        {
            self.unify_types(var, &bound, OptionalTolerance::StripRight, false, false);
            return;
        }
        self.bind(var, x);
    }

    fn bind(&mut self, var: &Type, x: &Type) {
        if occurs_in(var, x) {
            self.fail();
            return;
        }
        let name = formal_name(var).to_string();
        self.formals.insert(name.clone(), var.clone());
        self.types.insert(name, x.clone());
    }

    fn unify_bounds(&mut self, x: &Bound, y: &Bound) {
        if self.failed || x == y {
            return;
        }
        match (x, y) {
            (Bound::Formal(var), other) | (other, Bound::Formal(var)) => {
                if let Some(bound) = self.bounds.get(var).cloned() {
                    self.unify_bounds(&bound, other);
                } else if let Bound::Formal(other_var) = other
                    && let Some(bound) = self.bounds.get(other_var).cloned()
                {
                    self.unify_bounds(&Bound::Formal(var.clone()), &bound);
                } else {
                    self.bounds.insert(var.clone(), other.clone());
                }
            }
            (Bound::Fixed(_), Bound::Fixed(_)) => self.fail(),
        }
    }

    /// Replaces bound formals in `ty`; formals without a binding become `Unknown`.
    #[must_use]
    pub fn substitute(&self, tf: &TypeFactory, ty: &Type) -> Type {
        match ty.kind() {
            TypeKind::TypeFormal { identifier, .. } => self
                .types
                .get(identifier)
                .map_or_else(|| tf.unknown(), |bound| self.substitute(tf, bound)),
            TypeKind::Optional(inner) => tf.optional(self.substitute(tf, inner)),
            TypeKind::BString(bound) => tf.bstring(self.substitute_bound(bound)),
            TypeKind::List(elem) => tf.list(self.substitute(tf, elem)),
            TypeKind::BList(elem, bound) => {
                tf.blist(self.substitute(tf, elem), self.substitute_bound(bound))
            }
            TypeKind::Set(elem) => tf.set(self.substitute(tf, elem)),
            TypeKind::BSet(elem, bound) => {
                tf.bset(self.substitute(tf, elem), self.substitute_bound(bound))
            }
            TypeKind::Map(key, value) => {
                tf.map(self.substitute(tf, key), self.substitute(tf, value))
            }
            TypeKind::BMap(key, value, bound) => tf.bmap(
                self.substitute(tf, key),
                self.substitute(tf, value),
                self.substitute_bound(bound),
            ),
            TypeKind::Tuple(attributes) => tf.tuple(
                attributes
                    .iter()
                    .map(|(name, ty)| (name.clone(), self.substitute(tf, ty)))
                    .collect(),
            ),
            _ => ty.clone(),
        }
    }

    fn substitute_bound(&self, bound: &Bound) -> Bound {
        match bound {
            Bound::Formal(var) => self.bounds.get(var).cloned().unwrap_or_else(|| bound.clone()),
            Bound::Fixed(_) => bound.clone(),
        }
    }
}

fn formal_name(ty: &Type) -> &str {
    match ty.kind() {
        TypeKind::TypeFormal { identifier, .. } => identifier,
        _ => unreachable!("`{ty}` is not a type formal"),
    }
}

fn occurs_in(var: &Type, ty: &Type) -> bool {
    match ty.kind() {
        TypeKind::TypeFormal { .. } => var == ty,
        TypeKind::List(elem)
        | TypeKind::BList(elem, _)
        | TypeKind::Set(elem)
        | TypeKind::BSet(elem, _)
        | TypeKind::Optional(elem) => occurs_in(var, elem),
        TypeKind::Map(key, value) | TypeKind::BMap(key, value, _) => {
            occurs_in(var, key) || occurs_in(var, value)
        }
        TypeKind::Tuple(attributes) => attributes.iter().any(|(_, ty)| occurs_in(var, ty)),
        _ => false,
    }
}

/// Strict structural compatibility: no optional tolerance anywhere in the structure.
#[must_use = "this is a pure check with no side effects"]
pub fn unifies_strictly(a: &Type, b: &Type) -> bool {
    !Unifier::unify(a, b).is_failure()
}

/// Structural compatibility: strict unification, or one side being `optional` of the other.
#[must_use = "this is a pure check with no side effects"]
pub fn unifies(a: &Type, b: &Type) -> bool {
    a.is_optional_of_same(b) || b.is_optional_of_same(a) || unifies_strictly(a, b)
}
