//! Text normalization and input validation helpers.

pub mod normalize;
pub mod validation;
