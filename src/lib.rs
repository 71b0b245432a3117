pub mod commands;
pub mod config;
pub mod consts;
pub mod exceptions;
pub mod fs;
pub mod historystore;
pub mod models;
pub mod publisher;
pub mod source;
pub mod updater;
pub mod utils;
