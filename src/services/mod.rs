pub mod command_parser;
pub mod command_runner;
pub mod config_loader;
pub mod scoreboard;
pub mod scroll_flow;
pub mod snapshot_export;
