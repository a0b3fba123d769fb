//! End-to-end tests of the checker: trees are built programmatically, checked with
//! `TypeCheckerBuilder`, and inspected through the returned `TypedContext`.

#[cfg(test)]
mod type_checker;
#[cfg(test)]
mod utils;
