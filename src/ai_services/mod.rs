//! Driving the `ai-services` CLI and checking what it prints.

pub mod output;
pub mod runner;

pub use output::HelpTopic;
pub use runner::{AiServicesCli, CreateOptions, RagApp, RagEndpoints, RagPolling};
