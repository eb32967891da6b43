#![forbid(unsafe_code)]

pub mod action;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod fragment;
pub mod logging;
pub mod sensors;
pub mod simulate;
pub mod state;
pub mod wall;
pub mod weather;
pub mod widgets;

pub use cli::{run, run_from_env};
