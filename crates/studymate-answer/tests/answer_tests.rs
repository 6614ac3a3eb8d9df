use std::sync::{Arc, Mutex};

use studymate_answer::{
    build_prompt, format_context, AnswerOrigin, Assistant, WatsonxClient, FALLBACK_NOTICE, OFFLINE_NOTICE,
};
use studymate_core::config::{RetrievalSettings, WatsonxSettings};
use studymate_core::error::{Error, Result};
use studymate_core::traits::Generator;
use studymate_core::types::{Chunk, SearchHit};
use studymate_embed::HashEmbedder;
use studymate_index::SemanticIndex;

struct CannedGenerator {
    reply: Result<String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl CannedGenerator {
    fn ok(reply: &str) -> Self {
        Self { reply: Ok(reply.to_string()), prompts: Arc::default() }
    }

    fn failing() -> Self {
        Self { reply: Err(Error::Generation("connection refused".into())), prompts: Arc::default() }
    }
}

impl Generator for CannedGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(e) => Err(Error::Generation(e.to_string())),
        }
    }
}

fn hit(text: &str, source: &str, score: f32) -> SearchHit {
    SearchHit { text: text.to_string(), source: source.to_string(), score }
}

fn populated_index() -> SemanticIndex {
    let index = SemanticIndex::new(Arc::new(HashEmbedder::new(512).unwrap()));
    index
        .add(&[
            Chunk::new("Mitochondria are the powerhouse of the cell and produce ATP", "bio.pdf"),
            Chunk::new("The Treaty of Westphalia was signed in 1648", "history.pdf"),
        ])
        .expect("add");
    index
}

#[test]
fn format_context_labels_sources() {
    let hits = vec![hit("alpha", "a.pdf", 0.9), hit("beta", "b.pdf", 0.5)];
    assert_eq!(format_context(&hits, 3000), "[a.pdf] alpha\n\n[b.pdf] beta");
}

#[test]
fn format_context_respects_budget() {
    let hits = vec![hit(&"x".repeat(40), "a", 0.9), hit(&"y".repeat(40), "b", 0.8)];
    for budget in [1, 10, 44, 45, 50, 100] {
        let ctx = format_context(&hits, budget);
        assert!(ctx.chars().count() <= budget, "budget {budget} exceeded: {}", ctx.chars().count());
    }
    assert_eq!(format_context(&hits, 44), format!("[a] {}", "x".repeat(40)));
}

#[test]
fn format_context_counts_characters() {
    let hits = vec![hit("ééééé", "s", 1.0)];
    assert_eq!(format_context(&hits, 6), "[s] éé");
}

#[test]
fn prompt_contains_context_and_question() {
    let prompt = build_prompt("[a.pdf] some context", "  What is it?  ");
    assert!(prompt.contains("[a.pdf] some context"));
    assert!(prompt.contains("Question: What is it? [/INST]"));
    assert!(prompt.starts_with("<s>[INST]"));
}

#[test]
fn ask_uses_model_answer() {
    let generator = CannedGenerator::ok("ATP is made by mitochondria.");
    let prompts = Arc::clone(&generator.prompts);
    let assistant = Assistant::new(populated_index(), &RetrievalSettings::default())
        .with_generator(Box::new(generator));

    let answer = assistant.ask("mitochondria powerhouse ATP").expect("ask");
    assert_eq!(answer.origin, AnswerOrigin::Model);
    assert_eq!(answer.text, "ATP is made by mitochondria.");
    assert_eq!(answer.hits.len(), 2, "top_k 3 is clamped to the two stored chunks");
    assert_eq!(answer.hits[0].source, "bio.pdf");

    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("[bio.pdf] Mitochondria"));
}

#[test]
fn ask_falls_back_to_excerpts_when_model_fails() {
    let assistant = Assistant::new(populated_index(), &RetrievalSettings::default())
        .with_generator(Box::new(CannedGenerator::failing()));

    let answer = assistant.ask("When was the Treaty of Westphalia signed?").expect("ask");
    assert_eq!(answer.origin, AnswerOrigin::Fallback);
    assert!(answer.text.starts_with(FALLBACK_NOTICE));
    assert!(answer.text.contains("[history.pdf] The Treaty of Westphalia was signed in 1648"));
}

#[test]
fn ask_falls_back_on_blank_model_output() {
    let assistant = Assistant::new(populated_index(), &RetrievalSettings::default())
        .with_generator(Box::new(CannedGenerator::ok("   ")));
    let answer = assistant.ask("cell").expect("ask");
    assert_eq!(answer.origin, AnswerOrigin::Fallback);
}

#[test]
fn ask_without_generator_shows_excerpts() {
    let assistant = Assistant::new(populated_index(), &RetrievalSettings::default()).with_top_k(1);
    let answer = assistant.ask("mitochondria ATP").expect("ask");
    assert_eq!(answer.origin, AnswerOrigin::Fallback);
    assert!(answer.text.starts_with(OFFLINE_NOTICE));
    assert_eq!(answer.hits.len(), 1);
}

#[test]
fn ask_on_empty_index_is_an_error() {
    let index = SemanticIndex::new(Arc::new(HashEmbedder::new(64).unwrap()));
    let assistant = Assistant::new(index, &RetrievalSettings::default())
        .with_generator(Box::new(CannedGenerator::ok("unused")));
    assert!(!assistant.is_ready());
    assert!(matches!(assistant.ask("anything"), Err(Error::IndexEmpty)));
}

#[test]
fn ask_rejects_blank_question() {
    let assistant = Assistant::new(populated_index(), &RetrievalSettings::default());
    assert!(matches!(assistant.ask("  "), Err(Error::InvalidArgument(_))));
}

#[test]
fn chunks_added_through_assistant_become_searchable() {
    let index = SemanticIndex::new(Arc::new(HashEmbedder::new(64).unwrap()));
    let assistant = Assistant::new(index, &RetrievalSettings::default());
    assistant.retriever().add(&[Chunk::new("gradient descent", "ml.pdf")]).expect("add");
    assert!(assistant.is_ready());
}

#[test]
fn answer_preview_truncates_long_text() {
    let assistant = Assistant::new(populated_index(), &RetrievalSettings::default());
    let answer = assistant.ask("cell").expect("ask");
    let preview = answer.preview(10);
    assert_eq!(preview.chars().count(), 13);
    assert!(preview.ends_with("..."));
    assert_eq!(answer.preview(usize::MAX), answer.text);
}

#[test]
fn watsonx_requires_credentials() {
    let err = WatsonxClient::new(&WatsonxSettings::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));

    let settings = WatsonxSettings { api_key: Some("key".into()), project_id: Some("  ".into()), ..Default::default() };
    assert!(matches!(WatsonxClient::new(&settings), Err(Error::InvalidConfig(_))));
}

#[test]
fn watsonx_rejects_bad_url() {
    let settings = WatsonxSettings {
        url: "not a url".into(),
        api_key: Some("key".into()),
        project_id: Some("proj".into()),
        ..Default::default()
    };
    assert!(matches!(WatsonxClient::new(&settings), Err(Error::InvalidConfig(_))));
}

#[test]
fn watsonx_unreachable_service_is_generation_error() {
    let settings = WatsonxSettings {
        url: "http://127.0.0.1:9".into(),
        iam_url: "http://127.0.0.1:9".into(),
        api_key: Some("key".into()),
        project_id: Some("proj".into()),
        timeout_secs: 5,
        ..Default::default()
    };
    let client = WatsonxClient::new(&settings).expect("client").with_retry_attempts(1);
    assert_eq!(client.model_id(), "mistralai/mixtral-8x7b-instruct-v01");
    match client.generate("hello") {
        Err(Error::Generation(msg)) => assert!(msg.contains("/identity/token"), "token request fails first: {msg}"),
        other => panic!("expected a generation error, got {other:?}"),
    }
}
