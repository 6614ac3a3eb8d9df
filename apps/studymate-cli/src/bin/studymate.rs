use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use studymate_answer::{Answer, AnswerOrigin, Assistant, WatsonxClient};
use studymate_core::config::{Config, Settings};
use studymate_core::ingest::{collect_files, DocumentLoader};
use studymate_embed::get_default_embedder;
use studymate_index::SemanticIndex;

/// Ask questions about your PDFs.
#[derive(Debug, Parser)]
#[command(name = "studymate", version)]
struct Args {
    /// PDF or text files, or directories containing them.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Question to answer; repeat for several. Without it questions are read from stdin.
    #[arg(short, long = "question")]
    questions: Vec<String>,

    /// Number of chunks retrieved per question.
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Do not call the language model; always show the retrieved excerpts.
    #[arg(long)]
    offline: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

/// Index each file in its own `add` call so a failing document leaves no
/// partial chunks behind.
fn ingest(index: &SemanticIndex, paths: &[PathBuf], settings: &Settings) -> anyhow::Result<()> {
    let files = collect_files(paths)?;
    let loader = DocumentLoader::new(settings.chunking.clone());
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );

    let (mut indexed_files, mut indexed_chunks) = (0usize, 0usize);
    for file in &files {
        pb.set_message(file.display().to_string());
        match loader.load_file(file).and_then(|chunks| index.add(&chunks)) {
            Ok(0) => warn!(file = %file.display(), "no text found"),
            Ok(n) => {
                indexed_files += 1;
                indexed_chunks += n;
            }
            Err(e) => warn!(file = %file.display(), error = %e, "skipping document"),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    info!(embedder = index.embedder_id(), dim = index.dim(), records = index.len(), "index ready");
    println!("Indexed {} chunks from {} file(s).", indexed_chunks, indexed_files);
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("\nAnswer:");
    println!("{}", answer.text);
    if answer.origin == AnswerOrigin::Model {
        println!("\nReferenced paragraphs:");
        for (i, hit) in answer.hits.iter().enumerate() {
            println!("  [{}] {} (score {:.3})", i + 1, hit.source, hit.score);
            println!("      {}", hit.text.trim().replace('\n', " "));
        }
    } else {
        let scores: Vec<String> = answer.hits.iter().map(|h| format!("{} {:.3}", h.source, h.score)).collect();
        println!("\nScores: {}", scores.join(", "));
    }
    println!();
}

fn print_history(history: &[Answer]) {
    if history.is_empty() {
        println!("No questions asked yet.");
        return;
    }
    println!("Q&A history (this session)");
    for (i, h) in history.iter().rev().enumerate() {
        println!("Q{}: {}", i + 1, h.question);
        println!("A{}: {}", i + 1, h.preview(500));
    }
}

fn answer_one(assistant: &Assistant<SemanticIndex>, question: &str, history: &mut Vec<Answer>) {
    if !assistant.is_ready() {
        println!("Please add at least one PDF first.");
        return;
    }
    match assistant.ask(question) {
        Ok(answer) => {
            print_answer(&answer);
            history.push(answer);
        }
        Err(e) => println!("Could not answer the question: {e}"),
    }
}

fn repl(assistant: &Assistant<SemanticIndex>) -> anyhow::Result<()> {
    println!("Ask a question about your documents (:history, :quit).");
    let mut history = Vec::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        match line.trim() {
            "" => continue,
            ":quit" | ":q" => break,
            ":history" => print_history(&history),
            q => answer_one(assistant, q, &mut history),
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = Config::load()?.settings()?;

    let embedder = get_default_embedder(&settings.embedding)?;
    let index = SemanticIndex::new(embedder);
    ingest(&index, &args.paths, &settings)?;

    let mut assistant = Assistant::new(index, &settings.retrieval);
    if let Some(k) = args.top_k {
        assistant = assistant.with_top_k(k);
    }
    if args.offline {
        info!("offline mode: answers show retrieved excerpts");
    } else if settings.watsonx.is_configured() {
        let client = WatsonxClient::new(&settings.watsonx)?;
        info!(model = client.model_id(), "using watsonx.ai");
        assistant = assistant.with_generator(Box::new(client));
    } else {
        warn!("watsonx credentials not configured (APP_WATSONX__API_KEY, APP_WATSONX__PROJECT_ID); answers show retrieved excerpts");
    }

    if args.questions.is_empty() {
        repl(&assistant)
    } else {
        let mut history = Vec::new();
        for q in &args.questions {
            println!("Q: {q}");
            answer_one(&assistant, q, &mut history);
        }
        Ok(())
    }
}
