mod diagnostics_log;
mod router;

pub use diagnostics_log::*;
pub use router::*;
