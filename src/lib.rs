#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod app;
pub mod config;
pub mod data;
pub mod feed;
pub mod logging;
pub mod notify;
pub mod page;
pub mod profile;
pub mod render;
pub mod session;
pub mod timefmt;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, run_with, RunOptions};
