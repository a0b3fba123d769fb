#[allow(clippy::module_inception)]
mod type_checker;

mod error_recovery;
mod operator_invocations;
mod promotion;
