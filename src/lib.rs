pub mod config;
pub mod domain;
pub mod handlers;
pub mod infrastructure;
pub mod pipeline;
pub mod shared;
pub mod stream;
