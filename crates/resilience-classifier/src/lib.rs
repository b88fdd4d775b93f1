//! Pure failure classification: maps a failure's message and type-name to
//! one of nine [`ErrorKind`]s and decides retryability. No I/O, no shared
//! state — every other component treats this as a deterministic function.

mod classifiable;
mod kind;

pub use classifiable::Classifiable;
pub use kind::{classify, ErrorKind};
