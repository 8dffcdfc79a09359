pub mod analysis;
pub mod cancel;
pub mod cli;
pub mod diff;
pub mod git;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod store;
pub mod utils;
