use delve_core::{ResearchOutcome, Source};

const PREVIEW_CHARS: usize = 1000;

pub fn banner(topic: &str) {
    println!("delve: researching \"{topic}\"");
    println!();
}

/// Numbered table of sources with their relevance scores.
pub fn sources_table(sources: &[Source]) -> String {
    let mut out = format!("{:>3}  {:<63}  {:<53}  {}\n", "#", "Title", "URL", "Similarity");
    for (i, source) in sources.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}  {:<63}  {:<53}  {:.2}\n",
            i + 1,
            truncate(&source.title, 60),
            truncate(&source.url, 50),
            source.similarity_score
        ));
    }
    out
}

pub fn outcome(outcome: &ResearchOutcome) {
    println!();
    println!("Report saved to: {}", outcome.report_path.display());
    println!("Report quality: {:.2}", outcome.report.quality);
    println!();
    println!("Report Preview:");
    println!("{}", truncate(&outcome.report.text, PREVIEW_CHARS));
}

pub fn no_sources_help() {
    eprintln!();
    eprintln!("Failed to gather any sources");
    eprintln!();
    eprintln!("Possible reasons:");
    eprintln!("  - Network connectivity issues");
    eprintln!("  - Search temporarily unavailable or rate limited");
    eprintln!("  - All sources failed to load");
    eprintln!();
    eprintln!("Solutions:");
    eprintln!("  1. Wait 10-15 minutes and try again (rate limiting)");
    eprintln!("  2. Use manual sources: --sources 'url1,url2,url3'");
    eprintln!("  3. Check your internet connection");
}

/// First `max` characters, with `...` when something was cut.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((i, _)) => format!("{}...", &text[..i]),
        None => text.to_string(),
    }
}
