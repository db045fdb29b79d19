use std::{fmt::Debug, future::Future};

use futures::stream::BoxStream;

/// Lazily produced text fragments from a generation backend. The backend does
/// no work beyond the fragment the consumer pulls next.
pub type FragmentStream = BoxStream<'static, anyhow::Result<String>>;

pub trait TextGenerator {
    const GENERATION_MODEL: &'static str;

    type Error: Debug;

    /// Streamed generation: the returned stream yields fragments in arrival
    /// order until the backend signals completion.
    fn generate_stream(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<FragmentStream, Self::Error>>;

    /// Single-shot generation for structured outputs that are repaired and
    /// parsed as a whole.
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, Self::Error>>;
}
