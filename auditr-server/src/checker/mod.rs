//! Concrete rule engines.

pub mod axe;

pub use axe::AxeChecker;
