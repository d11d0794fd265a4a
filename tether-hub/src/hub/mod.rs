mod context;
mod hub;
mod hub_command;
mod hub_event;
mod hub_handle;
mod hub_observer;

pub use context::*;
pub use hub::*;
pub use hub_command::*;
pub use hub_event::*;
pub use hub_handle::*;
pub use hub_observer::*;
