mod error;
mod llm;
mod processor;
pub mod repair;
pub mod sources;
pub mod tee;
pub mod tracing;
pub mod yt;

pub use error::FetchError;
pub use llm::gemini;
pub use llm::generator::{FragmentStream, TextGenerator};
pub use processor::{builder::RecapProcessorBuilder, RecapProcessor, SummaryStream};
pub use tee::{StoreSink, StreamTee, TeeSink};
