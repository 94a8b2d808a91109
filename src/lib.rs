pub mod archive;
pub mod command;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod output;
pub mod prompt;
