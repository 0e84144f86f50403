mod common;

use std::sync::Arc;

use common::{keyword_evaluator, settings, ScriptedExtractor, ScriptedLLM, ScriptedSearcher};
use delve_core::config::ResearchConfig;
use delve_core::llm::LLMError;
use delve_core::report::ReportError;
use delve_core::{Gatherer, ReportGenerator, ReportStore, ResearchError, ResearchProgress, ResearchRunner};
use tempfile::TempDir;
use tokio::sync::mpsc;

const RUST_URL: &str = "https://a.example/rust";
const COOKING_URL: &str = "https://b.example/kitchen";
const REPORT: &str = "# Rust\n\nRust is fast [1].\n\n## References\n\n1. [Article URL]\n2. [Blog post URL]";

fn extractor() -> ScriptedExtractor {
    ScriptedExtractor::default()
        .script(RUST_URL, vec![Some("rust ".repeat(40))])
        .script(COOKING_URL, vec![Some("cooking ".repeat(30))])
}

fn runner(
    searcher: ScriptedSearcher,
    llm: ScriptedLLM,
    dir: &TempDir,
) -> ResearchRunner<ScriptedLLM> {
    let evaluator = keyword_evaluator();
    let gatherer = Gatherer::new(Arc::new(searcher), Arc::new(extractor()), settings(1, 4));
    let config = ResearchConfig {
        report_quality_threshold: 0.7,
        max_report_attempts: 2,
        ..Default::default()
    };
    let generator = ReportGenerator::new(llm, Arc::clone(&evaluator), &config);
    ResearchRunner::new(gatherer, evaluator, generator, ReportStore::new(dir.path()), 0.5)
}

fn saved_files(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

#[tokio::test]
async fn test_run_saves_cited_report_from_relevant_sources() {
    let dir = TempDir::new().unwrap();
    let searcher = ScriptedSearcher::new(vec![vec![RUST_URL, COOKING_URL]]);
    let runner = runner(searcher, ScriptedLLM::new(vec![Ok(REPORT)]), &dir);

    let outcome = runner.run("rust", None).await.unwrap();

    assert_eq!(outcome.sources.len(), 1);
    assert_eq!(outcome.sources[0].url, RUST_URL);
    assert!(outcome.sources[0].similarity_score > 0.99);

    let saved = std::fs::read_to_string(&outcome.report_path).unwrap();
    assert_eq!(saved, outcome.report.text);
    assert!(saved.ends_with(&format!("## References\n\n1. [Title of {RUST_URL}]({RUST_URL})\n")));
    assert!(!saved.contains("URL]"));

    let name = outcome.report_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("rust_") && name.ends_with(".md"));
}

#[tokio::test]
async fn test_run_reports_progress_in_order() {
    let dir = TempDir::new().unwrap();
    let searcher = ScriptedSearcher::new(vec![vec![RUST_URL, COOKING_URL]]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let runner = runner(searcher, ScriptedLLM::new(vec![Ok(REPORT)]), &dir).with_progress(tx);

    let outcome = runner.run("rust", None).await.unwrap();
    drop(runner);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.len(), 5);
    assert!(matches!(events[0], ResearchProgress::Gathering));
    assert!(matches!(events[1], ResearchProgress::Evaluating { count: 2 }));
    assert!(matches!(&events[2], ResearchProgress::SourcesSelected { sources } if sources.len() == 1));
    assert!(matches!(events[3], ResearchProgress::Generating { count: 1 }));
    assert!(matches!(&events[4], ResearchProgress::Saved { path } if *path == outcome.report_path));
}

#[tokio::test]
async fn test_run_without_sources() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLLM::new(vec![Ok(REPORT)]);
    let prompts = llm.prompt_log();
    let runner = runner(ScriptedSearcher::new(vec![]), llm, &dir);

    let err = runner.run("rust", None).await.unwrap_err();

    assert!(matches!(err, ResearchError::NoSources));
    assert!(prompts.lock().unwrap().is_empty());
    assert_eq!(saved_files(&dir), 0);
}

#[tokio::test]
async fn test_run_without_relevant_sources() {
    let dir = TempDir::new().unwrap();
    let searcher = ScriptedSearcher::new(vec![vec![COOKING_URL]]);
    let runner = runner(searcher, ScriptedLLM::new(vec![Ok(REPORT)]), &dir);

    let err = runner.run("rust", None).await.unwrap_err();

    match err {
        ResearchError::NoRelevantSources { threshold } => assert_eq!(threshold, 0.5),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(saved_files(&dir), 0);
}

#[tokio::test]
async fn test_run_with_manual_urls_skips_search() {
    let dir = TempDir::new().unwrap();
    let runner = runner(ScriptedSearcher::new(vec![]), ScriptedLLM::new(vec![Ok(REPORT)]), &dir);

    let urls = vec![RUST_URL.to_string()];
    let outcome = runner.run("rust", Some(&urls)).await.unwrap();

    assert_eq!(outcome.sources[0].title, "Source 1");
    assert!(outcome.report.text.contains(&format!("1. [Source 1]({RUST_URL})")));
}

#[tokio::test]
async fn test_generation_failure_saves_nothing() {
    let dir = TempDir::new().unwrap();
    let searcher = ScriptedSearcher::new(vec![vec![RUST_URL]]);
    let llm = ScriptedLLM::new(vec![Err(LLMError::RateLimited), Err(LLMError::RateLimited)]);
    let runner = runner(searcher, llm, &dir);

    let err = runner.run("rust", None).await.unwrap_err();

    assert!(matches!(
        err,
        ResearchError::Report(ReportError::GenerationFailed { attempts: 2, .. })
    ));
    assert_eq!(saved_files(&dir), 0);
}
