//! Extraction agent: fetches raw cashtag observations from a browser agent
//! served over Gradio and turns its answer into candidates.

pub mod gradio;
pub mod payload;
pub mod settings;
pub mod source;

pub use gradio::GradioAgent;
pub use payload::{parse_agent_output, ParsedBatch};
pub use settings::AgentSettings;
pub use source::{FetchOutcome, RecordSource, StaticSource};
