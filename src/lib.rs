pub mod access;
pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod jbrowse;
pub mod middleware;
pub mod session;
