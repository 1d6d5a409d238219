pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod document;
pub mod global;
pub mod link;
pub mod session;
pub mod transport;
