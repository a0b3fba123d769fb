#![warn(clippy::pedantic)]
//! Type model of the stream-processing language checker.
//!
//! This crate defines the semantic types attached to AST nodes together with the pure rules that
//! relate them. It knows nothing about the tree; both checker passes depend on it.
//!
//! ## Modules
//!
//! - [`types`] - [`Type`] handles, [`TypeKind`], [`MetaType`] and the interning [`TypeFactory`]
//! - [`constraints`] - named constraints such as `numeric` or `addable`
//! - [`queries`] - element, key, value and subscript types of containers
//! - [`unifier`] - generic unification and [`unifier::unifies`]
//! - [`cast`] - explicit cast and implicit initializer legality
//!
//! ## Example
//!
//! ```
//! use streamc_types::{TypeFactory, cast::explicit_cast_allowed};
//!
//! let tf = TypeFactory::new();
//! assert!(explicit_cast_allowed(&tf, &tf.int32(), &tf.float64()));
//! assert!(!explicit_cast_allowed(&tf, &tf.void(), &tf.int32()));
//! ```

pub mod cast;
pub mod constraints;
pub mod queries;
pub mod types;
pub mod unifier;

pub use constraints::Constraint;
pub use types::{Bound, MetaType, Type, TypeFactory, TypeKind};
