//! Question answering trait

use async_trait::async_trait;

use crate::Result;

/// Anything that can answer a natural-language question
///
/// The interactive loop depends on this trait rather than on a concrete
/// composer so it can be driven by a fake in tests.
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    /// Answer the question
    async fn answer(&self, question: &str) -> Result<String>;
}
