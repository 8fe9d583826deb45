//! Task document handling: progress parsing, layout paths, status mutation.

pub mod descriptor;
pub mod document;
pub mod paths;
pub mod status;

pub use descriptor::{Dialect, TaskDescriptor};
pub use status::TaskStatus;
