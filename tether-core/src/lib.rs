//! Wire and data model shared by the hub and anything that talks to it.

pub mod model;

pub use model::*;
