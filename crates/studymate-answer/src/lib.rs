//! Question answering on top of a [`Retriever`].
//!
//! `Assistant::ask` retrieves the top-k chunks, formats them into a bounded
//! context, and asks the configured [`Generator`]. When no generator is set,
//! or the call fails, the answer is built from the raw excerpts instead and
//! marked [`AnswerOrigin::Fallback`].

pub mod context;
pub mod prompt;
pub mod watsonx;

use tracing::warn;

use studymate_core::config::RetrievalSettings;
use studymate_core::error::{Error, Result};
use studymate_core::traits::{Generator, Retriever};
use studymate_core::types::SearchHit;

pub use context::format_context;
pub use prompt::build_prompt;
pub use watsonx::WatsonxClient;

pub const FALLBACK_NOTICE: &str =
    "I couldn't reach the language model right now. Here are the most relevant excerpts from your documents:";
pub const OFFLINE_NOTICE: &str =
    "No language model is configured. Here are the most relevant excerpts from your documents:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOrigin {
    /// Text produced by the language model.
    Model,
    /// Raw excerpts shown because the model was missing or failed.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub question: String,
    pub text: String,
    pub origin: AnswerOrigin,
    /// Chunks the answer was grounded on, best first.
    pub hits: Vec<SearchHit>,
}

impl Answer {
    /// First `max_chars` characters of the answer, with `...` when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        if self.text.chars().count() <= max_chars {
            return self.text.clone();
        }
        let mut s: String = self.text.chars().take(max_chars).collect();
        s.push_str("...");
        s
    }
}

pub struct Assistant<R: Retriever> {
    retriever: R,
    generator: Option<Box<dyn Generator>>,
    top_k: usize,
    max_context_chars: usize,
}

impl<R: Retriever> Assistant<R> {
    pub fn new(retriever: R, settings: &RetrievalSettings) -> Self {
        Self {
            retriever,
            generator: None,
            top_k: settings.top_k,
            max_context_chars: settings.max_context_chars,
        }
    }

    pub fn with_generator(mut self, generator: Box<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn retriever(&self) -> &R { &self.retriever }

    pub fn is_ready(&self) -> bool { self.retriever.is_ready() }

    /// Answer `question` from the indexed documents.
    ///
    /// Retrieval errors (empty index, provider failure) are returned as-is;
    /// only generation failures fall back to excerpts.
    pub fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidArgument("question is empty".into()));
        }
        let hits = self.retriever.search(question, self.top_k)?;
        let context = format_context(&hits, self.max_context_chars);

        let (text, origin) = match &self.generator {
            Some(generator) => match generator.generate(&build_prompt(&context, question)) {
                Ok(text) if !text.trim().is_empty() => (text, AnswerOrigin::Model),
                Ok(_) => {
                    warn!("language model returned an empty answer; showing excerpts");
                    (format!("{FALLBACK_NOTICE}\n\n{context}"), AnswerOrigin::Fallback)
                }
                Err(e) => {
                    warn!(error = %e, "language model call failed; showing excerpts");
                    (format!("{FALLBACK_NOTICE}\n\n{context}"), AnswerOrigin::Fallback)
                }
            },
            None => (format!("{OFFLINE_NOTICE}\n\n{context}"), AnswerOrigin::Fallback),
        };

        Ok(Answer { question: question.to_string(), text, origin, hits })
    }
}
