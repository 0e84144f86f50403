use crate::citation::Citation;
use crate::config::PROMPT_CONTENT_CHARS;
use crate::gather::Source;
use crate::relevance::prefix_chars;

/// System prompt for report synthesis.
pub const REPORT_SYSTEM_PROMPT: &str = "You are a professional research analyst. Generate comprehensive, \
well-structured research reports based on provided sources.
Your reports should be factual, well-cited, and organized.";

/// Appended to the prompt after a report scores below the quality bar.
pub const MORE_COMPREHENSIVE_PROMPT: &str =
    "\n\nPlease provide a more comprehensive and detailed report that better addresses the research topic.";

/// Builds the user prompt for a report on `topic`.
///
/// `sources` and `citations` are parallel: citation `n` describes source `n - 1`.
pub fn build_report_prompt(topic: &str, sources: &[Source], citations: &[Citation]) -> String {
    let sources_content = sources
        .iter()
        .zip(citations)
        .map(|(source, citation)| {
            format!(
                "Source {}:\nTitle: {}\nURL: {}\nContent: {}\n",
                citation.number,
                citation.title,
                citation.url,
                prefix_chars(&source.content, PROMPT_CONTENT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"Research Topic: {topic}

Sources:
{sources_content}

Please generate a comprehensive research report in markdown format with the following structure:

# {topic}

## Executive Summary
[A concise summary of key findings and conclusions]

## Introduction
[Introduction to the topic and its significance]

## Findings
[Main body of the report with detailed findings, organized into subsections as appropriate. Include citations like [1], [2], etc. where you reference sources]

## Conclusion
[Summary of findings and conclusions]

## References
CRITICAL REQUIREMENTS FOR REFERENCES:
1. You MUST use the EXACT URLs provided in the sources above - do NOT make up URLs
2. Format each reference as a markdown link: [Title](URL)
3. Do NOT use placeholder text such as "[Article URL]" or any variation
4. Every reference MUST have a clickable link using the actual URL from the sources
5. Each source number corresponds to exactly one URL; use that URL for that number

Example format:
1. [Wikipedia: Rust (programming language)](https://en.wikipedia.org/wiki/Rust_(programming_language))
2. [The Rust Programming Language](https://doc.rust-lang.org/book/)"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_sources_with_truncated_content() {
        let sources = vec![Source::new("https://a.example", "A", "x".repeat(3000))];
        let citations = Citation::from_sources(&sources);

        let prompt = build_report_prompt("Rust async", &sources, &citations);

        assert!(prompt.starts_with("Research Topic: Rust async"));
        assert!(prompt.contains("Source 1:\nTitle: A\nURL: https://a.example\nContent: "));
        assert!(prompt.contains(&"x".repeat(2000)));
        assert!(!prompt.contains(&"x".repeat(2001)));
        assert!(prompt.contains("# Rust async"));
        assert!(prompt.contains("## References"));
    }
}
