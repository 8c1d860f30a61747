pub mod config;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod records;
pub mod server;
pub mod states;
