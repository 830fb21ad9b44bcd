//! Output formatting for finished (or paused) runs

pub mod console;
pub mod formatter;
