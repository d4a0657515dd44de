//! Course authoring on top of an LLM: outline and chapter prompts, a
//! tolerant parser for whatever the model sends back, video lookup and
//! SQLite persistence.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod course;
pub mod errors;
pub mod log;
pub mod normalize;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod store;
pub mod ux;
pub mod video;
pub mod wire;
