pub mod analysis;
pub mod chat;
pub mod classifier;
pub mod config;
pub mod explain;
pub mod llm;
pub mod routes;
