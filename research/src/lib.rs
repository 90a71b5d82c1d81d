pub mod capabilities;
pub mod config;
pub mod console;
pub mod corpus;
pub mod error;
pub mod fetch;
pub mod layout;
pub mod render;
pub mod research;
pub mod server;
pub mod sources;
pub mod tools;

pub use capabilities::{Capabilities, Toolkit};
pub use error::PipelineError;
pub use research::{Orchestrator, PipelineOptions, ResearchReport, RunOptions, Stage};
