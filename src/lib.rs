pub mod app;
pub mod bulk;
pub mod config;
pub mod domain;
pub mod ena;
pub mod error;
pub mod http;
pub mod jsonapi;
pub mod resolver;
pub mod search;
pub mod table;
