//! Prompt assembly and answer generation

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use cora_core::{Chunk, ModelProvider, QuestionAnswerer, Result};

use crate::retriever::Retriever;

/// Returned when nothing relevant is indexed; generation is skipped
pub const NO_INFORMATION_RESPONSE: &str =
    "I could not find any relevant information in the indexed documents to answer that question.";

const CONTEXT_SEPARATOR: &str = "\n\n";

/// A prompt with `{context}` and `{question}` placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    template: &'static str,
}

/// The answering prompt
pub const ANSWER_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "You are an expert on the Indian Constitution.\n\
     \n\
     Use the provided context to answer the question.\n\
     \n\
     Context:\n\
     {context}\n\
     \n\
     Question:\n\
     {question}\n\
     \n\
     Answer clearly:",
);

impl PromptTemplate {
    pub const fn new(template: &'static str) -> Self {
        Self { template }
    }

    pub fn as_str(&self) -> &'static str {
        self.template
    }

    /// Substitute both placeholders in one left-to-right pass
    ///
    /// Placeholder-like text inside the substituted values is copied
    /// verbatim, never expanded.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            if let Some(after) = tail.strip_prefix("{context}") {
                out.push_str(context);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{question}") {
                out.push_str(question);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

/// Join chunk texts in retrieval order
pub fn build_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Answers questions from retrieved context
pub struct AnswerComposer {
    retriever: Retriever,
    provider: Arc<dyn ModelProvider>,
}

impl AnswerComposer {
    pub fn new(retriever: Retriever, provider: Arc<dyn ModelProvider>) -> Self {
        Self { retriever, provider }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// The full prompt sent for `question` given `chunks`
    pub fn build_prompt(&self, question: &str, chunks: &[Chunk]) -> String {
        ANSWER_TEMPLATE.render(&build_context(chunks), question)
    }

    /// Retrieve, compose and generate
    pub async fn answer(&self, question: &str) -> Result<String> {
        let chunks = self.retriever.retrieve(question).await?;
        if chunks.is_empty() {
            info!("No relevant chunks retrieved, skipping generation");
            return Ok(NO_INFORMATION_RESPONSE.to_string());
        }

        let prompt = self.build_prompt(question, &chunks);
        debug!(
            chunks = chunks.len(),
            prompt_len = prompt.len(),
            model = %self.provider.model_id(),
            "Generating answer"
        );
        self.provider.generate(&prompt).await
    }
}

#[async_trait]
impl QuestionAnswerer for AnswerComposer {
    async fn answer(&self, question: &str) -> Result<String> {
        AnswerComposer::answer(self, question).await
    }
}
