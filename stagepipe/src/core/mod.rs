//! Core domain types for stagepipe.
//!
//! This module contains the types shared by every other layer:
//! - The tagged [`Value`] carried through bindings and stages
//! - The per-stage [`ActionOnFail`] policy

mod policy;
mod value;

pub use policy::ActionOnFail;
pub use value::{CastError, CompareError, Value, ValueKind};
