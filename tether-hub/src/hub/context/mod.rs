mod hub_context;

pub use hub_context::*;
