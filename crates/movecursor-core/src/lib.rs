//! Core Move Cursor library (controller, platform backends, key listeners, config).

pub mod config;
pub mod controller;
pub mod input;
pub mod keys;
pub mod logging;
pub mod platform;
