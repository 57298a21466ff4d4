//! Presentation side of a reload run.
//!
//! The worker only emits events; everything here consumes them:
//!
//! - [`RunView`] - run state rebuilt from events, cleared on close
//! - [`Console`] - prints progress and answers operator questions

mod console;
mod view;

pub use console::Console;
pub use view::{AccountRow, LogLine, RunView};
