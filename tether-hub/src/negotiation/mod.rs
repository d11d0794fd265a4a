mod candidate_buffer;
mod connection_record;
mod lifecycle;
mod state;
mod step;

pub use candidate_buffer::*;
pub use connection_record::*;
pub use lifecycle::*;
pub use state::*;
pub(crate) use step::*;
