#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod commands;
pub mod render;

mod cli;
pub use cli::{Cli, Commands, FilterArgs, Target};

mod config;
pub use config::AppConfig;
