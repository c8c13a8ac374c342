pub mod config;
pub mod openai;
pub mod quark;
pub mod scheduler;
pub mod server;
pub mod twitter;
