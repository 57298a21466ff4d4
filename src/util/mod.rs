//! Text helpers for printing untrusted reloader output to a terminal.
//!
//! ```
//! use bulkreload::util::{display_width, strip_control_chars, truncate_to_width};
//!
//! assert_eq!(strip_control_chars("\x1b[31mFailed\x1b[0m"), "Failed");
//! assert_eq!(display_width("Portal"), 6);
//! assert_eq!(truncate_to_width("A very long account name", 10), "A very ...");
//! ```

mod text;

pub use text::{display_width, strip_control_chars, truncate_to_width};
