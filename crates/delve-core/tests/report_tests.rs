mod common;

use common::{keyword_evaluator, ScriptedLLM};
use delve_core::config::ResearchConfig;
use delve_core::llm::LLMError;
use delve_core::report::prompts::MORE_COMPREHENSIVE_PROMPT;
use delve_core::report::{ReportError, ReportGenerator};
use delve_core::Source;

fn config() -> ResearchConfig {
    ResearchConfig {
        report_quality_threshold: 0.7,
        max_report_attempts: 3,
        ..Default::default()
    }
}

fn sources() -> Vec<Source> {
    vec![
        Source::new("https://a.example/rust", "Rust Book", "rust ownership"),
        Source::new("not-a-url", "Broken", "rust"),
        Source::new("https://b.example/async", "Async Rust", "rust futures"),
    ]
}

const GOOD: &str = "# Rust\n\nRust is memory safe [1].\n\n## References\n\n1. [Article URL]\n2. [Blog post URL]";
const OFF_TOPIC: &str = "# Cooking\n\nA cooking guide.";

#[tokio::test]
async fn test_first_good_draft_is_accepted_and_cited() {
    let llm = ScriptedLLM::new(vec![Ok(GOOD)]);
    let log = llm.prompt_log();
    let generator = ReportGenerator::new(llm, keyword_evaluator(), &config());

    let report = generator.generate("rust", &sources()).await.unwrap();

    assert_eq!(log.lock().unwrap().len(), 1);
    assert!((report.quality - 1.0).abs() < 1e-6);
    // the source with an invalid URL is not cited
    assert_eq!(report.citations.len(), 2);
    assert_eq!(report.citations[1].number, 2);
    assert_eq!(report.citations[1].url, "https://b.example/async");
    assert!(report
        .text
        .ends_with("## References\n\n1. [Rust Book](https://a.example/rust)\n2. [Async Rust](https://b.example/async)\n"));

    let prompt = &log.lock().unwrap()[0];
    assert!(prompt.contains("Source 2:\nTitle: Async Rust\nURL: https://b.example/async"));
    assert!(!prompt.contains("not-a-url"));
}

#[tokio::test]
async fn test_low_quality_draft_is_regenerated_with_stronger_prompt() {
    let llm = ScriptedLLM::new(vec![Ok(OFF_TOPIC), Ok(GOOD)]);
    let log = llm.prompt_log();
    let generator = ReportGenerator::new(llm, keyword_evaluator(), &config());

    let report = generator.generate("rust", &sources()).await.unwrap();

    let prompts = log.lock().unwrap().clone();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].ends_with(MORE_COMPREHENSIVE_PROMPT));
    assert!(prompts[1].ends_with(MORE_COMPREHENSIVE_PROMPT));
    assert!(report.text.starts_with("# Rust"));
}

#[tokio::test]
async fn test_final_attempt_is_kept_below_threshold() {
    let llm = ScriptedLLM::new(vec![Ok(OFF_TOPIC), Ok(OFF_TOPIC), Ok("# Cooking again")]);
    let log = llm.prompt_log();
    let generator = ReportGenerator::new(llm, keyword_evaluator(), &config());

    let report = generator.generate("rust", &sources()).await.unwrap();

    assert_eq!(log.lock().unwrap().len(), 3);
    assert_eq!(report.quality, 0.0);
    assert!(report.text.starts_with("# Cooking again"));
    // references are still enforced on a low-scoring report
    assert!(report.text.contains("1. [Rust Book](https://a.example/rust)"));
}

#[tokio::test]
async fn test_llm_errors_are_retried() {
    let llm = ScriptedLLM::new(vec![Err(LLMError::RateLimited), Ok(GOOD)]);
    let generator = ReportGenerator::new(llm, keyword_evaluator(), &config());

    let report = generator.generate("rust", &sources()).await.unwrap();
    assert!(report.text.starts_with("# Rust"));
}

#[tokio::test]
async fn test_last_llm_error_fails_generation() {
    let llm = ScriptedLLM::new(vec![
        Err(LLMError::RateLimited),
        Err(LLMError::Network("down".to_string())),
        Err(LLMError::Network("still down".to_string())),
    ]);
    let generator = ReportGenerator::new(llm, keyword_evaluator(), &config());

    let err = generator.generate("rust", &sources()).await.unwrap_err();
    match err {
        ReportError::GenerationFailed { attempts, source } => {
            assert_eq!(attempts, 3);
            assert!(matches!(source, LLMError::Network(ref m) if m == "still down"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_no_valid_sources() {
    let llm = ScriptedLLM::new(vec![Ok(GOOD)]);
    let log = llm.prompt_log();
    let generator = ReportGenerator::new(llm, keyword_evaluator(), &config());

    let bad = vec![Source::new("", "Empty", "rust"), Source::new("file:///etc/passwd", "File", "rust")];
    let err = generator.generate("rust", &bad).await.unwrap_err();

    assert!(matches!(err, ReportError::NoValidSources));
    assert!(log.lock().unwrap().is_empty());
}
