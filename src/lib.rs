pub mod cli;
pub mod client;
pub mod config;
pub mod models;
pub mod store;
pub mod stream;
