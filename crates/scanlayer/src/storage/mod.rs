pub mod filesystem;
pub mod quarantine;

pub use filesystem::{move_file, write_atomic, write_bytes_atomic};
pub use quarantine::{Quarantine, QuarantineMode};
