//! Pure transcode logic: argument building and progress parsing

pub mod command;
pub mod progress;

pub use command::CommandBuilder;
pub use progress::{parse_elapsed, parse_elapsed_seconds, parse_progress, percent_complete};
