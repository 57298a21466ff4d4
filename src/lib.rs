//! Sequential bulk reload of cached IPTV channel listings.
//!
//! A run takes the selected accounts, reloads each one's cache in turn,
//! classifies the reloader's progress lines into GOOD / YELLOW / BAD
//! outcomes, and asks the operator before continuing an account whose
//! whole-source listing call failed.

pub mod account;
pub mod cache;
pub mod config;
pub mod reload;
pub mod ui;
pub mod util;
