//! Citation integrity for generated reports.
//!
//! Whatever the model wrote under `## References` is replaced by the citation
//! list the report was generated from, so every numbered entry links to the
//! exact source URL.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::gather::Source;

const REFERENCES_HEADER: &str = "## References\n\n";

/// How far back a placeholder looks for its citation number.
const LOOKBACK_CHARS: usize = 50;

/// A numbered reference to one accepted source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    /// 1-based position in the source list.
    pub number: usize,
    pub title: String,
    pub url: String,
}

impl Citation {
    pub fn new(number: usize, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            url: url.into(),
        }
    }

    /// One citation per source, in order, URLs copied verbatim.
    pub fn from_sources(sources: &[Source]) -> Vec<Citation> {
        sources
            .iter()
            .enumerate()
            .map(|(i, s)| Citation::new(i + 1, s.title.clone(), s.url.clone()))
            .collect()
    }

    /// `<number>. [<title>](<url>)`
    pub fn line(&self) -> String {
        format!("{}. [{}]({})", self.number, self.title, self.url)
    }
}

struct Patterns {
    header: Regex,
    placeholder: Regex,
    number: Regex,
}

fn compile_patterns() -> Option<Patterns> {
    Some(Patterns {
        header: Regex::new(r"(?im)^##[ \t]+References[ \t]*(?:\r?\n|\z)(?:[ \t]*\r?\n)?").ok()?,
        placeholder: Regex::new(r"(?i)\[[^\]\n]*URL[^\]\n]*\]").ok()?,
        number: Regex::new(r"(\d+)\.").ok()?,
    })
}

lazy_static! {
    static ref PATTERNS: Option<Patterns> = compile_patterns();
}

/// Rewrites the References section of `report` from `citations`.
///
/// On return the section holds exactly one `<n>. [<title>](<url>)` line per
/// citation, in order. Placeholder link texts such as `[Article URL]` that
/// follow a citation number are replaced by that citation's URL; any that
/// cannot be resolved are left alone. Applying this twice gives the same
/// text as applying it once.
pub fn enforce(report: &str, citations: &[Citation]) -> String {
    if citations.is_empty() {
        return report.to_string();
    }
    let Some(patterns) = (*PATTERNS).as_ref() else {
        warn!("citation patterns failed to compile, report left as generated");
        return report.to_string();
    };

    let text = rewrite_references(report, citations, patterns);
    let text = resolve_placeholders(&text, citations, patterns);
    revalidate(&text, citations, patterns)
}

fn render_lines(citations: &[Citation]) -> String {
    citations.iter().map(Citation::line).collect::<Vec<_>>().join("\n")
}

/// End of the section body starting at `body_start`: the next `##` header or
/// the end of text.
fn section_end(text: &str, body_start: usize) -> usize {
    let body = &text[body_start..];
    if body.starts_with("##") {
        return body_start;
    }
    body.find("\n##").map(|i| body_start + i + 1).unwrap_or(text.len())
}

fn rewrite_references(report: &str, citations: &[Citation], patterns: &Patterns) -> String {
    let block = render_lines(citations);

    let Some(header) = patterns.header.find(report) else {
        debug!("report has no References section, appending one");
        return format!("{}\n\n{REFERENCES_HEADER}{block}\n", report.trim_end());
    };

    let rest = &report[section_end(report, header.end())..];
    let mut out = String::with_capacity(report.len() + block.len());
    out.push_str(&report[..header.start()]);
    out.push_str(REFERENCES_HEADER);
    out.push_str(&block);
    out.push('\n');
    if !rest.is_empty() {
        out.push('\n');
        out.push_str(rest);
    }
    out
}

fn resolve_placeholders(text: &str, citations: &[Citation], patterns: &Patterns) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;

    for m in patterns.placeholder.find_iter(text) {
        // already the text of a real link
        if text[m.end()..].starts_with('(') {
            continue;
        }
        out.push_str(&text[copied..m.start()]);
        copied = m.start();

        // lookback reads the rewritten prefix, resolved URLs included
        let citation = preceding_number(&out, out.len(), patterns)
            .and_then(|n| citations.iter().find(|c| c.number == n));
        let Some(citation) = citation else {
            debug!(placeholder = m.as_str(), "unresolved citation placeholder");
            continue;
        };

        out.push_str(&citation.url);
        copied = m.end();
    }

    out.push_str(&text[copied..]);
    out
}

/// Nearest `<digits>.` within the `LOOKBACK_CHARS` characters before `pos`.
fn preceding_number(text: &str, pos: usize, patterns: &Patterns) -> Option<usize> {
    let start = text[..pos]
        .char_indices()
        .rev()
        .take(LOOKBACK_CHARS)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(pos);

    patterns
        .number
        .captures_iter(&text[start..pos])
        .last()
        .and_then(|c| c.get(1))
        .and_then(|n| n.as_str().parse().ok())
}

fn starts_with_number(line: &str, number: usize) -> bool {
    line.trim_start()
        .strip_prefix(&number.to_string())
        .is_some_and(|rest| rest.starts_with('.'))
}

/// Makes sure each citation's line in the References section is canonical.
fn revalidate(text: &str, citations: &[Citation], patterns: &Patterns) -> String {
    let Some(header) = patterns.header.find(text) else {
        return text.to_string();
    };
    let body_start = header.end();
    let body_end = section_end(text, body_start);
    let body = &text[body_start..body_end];
    let kept = body.trim_end();
    let tail = &body[kept.len()..];

    let mut lines: Vec<String> = kept.lines().map(str::to_string).collect();
    let mut changed = false;
    for citation in citations {
        let canonical = citation.line();
        match lines.iter().position(|l| starts_with_number(l, citation.number)) {
            Some(i) if lines[i] == canonical => {}
            Some(i) => {
                warn!(number = citation.number, "citation line lost its link, rewriting");
                lines[i] = canonical;
                changed = true;
            }
            None => {
                warn!(number = citation.number, "citation line missing, appending");
                lines.push(canonical);
                changed = true;
            }
        }
    }

    if !changed {
        return text.to_string();
    }
    let tail = if tail.is_empty() { "\n" } else { tail };
    format!("{}{}{}{}", &text[..body_start], lines.join("\n"), tail, &text[body_end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> &'static Patterns {
        (*PATTERNS).as_ref().unwrap()
    }

    #[test]
    fn test_line_format() {
        let c = Citation::new(3, "Title", "https://x.example/a?b=c");
        assert_eq!(c.line(), "3. [Title](https://x.example/a?b=c)");
    }

    #[test]
    fn test_from_sources_preserves_order_and_urls() {
        let sources = vec![
            Source::new("https://a.example/%7Euser", "A", "x"),
            Source::new("https://b.example", "B", "y"),
        ];
        let citations = Citation::from_sources(&sources);
        assert_eq!(citations[0], Citation::new(1, "A", "https://a.example/%7Euser"));
        assert_eq!(citations[1].number, 2);
    }

    #[test]
    fn test_section_end_stops_at_next_header() {
        let text = "## References\n\n1. a\n\n## Appendix\nmore";
        let body_start = "## References\n\n".len();
        assert_eq!(&text[section_end(text, body_start)..], "## Appendix\nmore");
    }

    #[test]
    fn test_section_end_with_empty_body() {
        let text = "## References\n## Next";
        assert_eq!(section_end(text, "## References\n".len()), "## References\n".len());
    }

    #[test]
    fn test_preceding_number_takes_nearest() {
        let text = "1. first\n2. [Article URL]";
        let pos = text.find('[').unwrap();
        assert_eq!(preceding_number(text, pos, patterns()), Some(2));
    }

    #[test]
    fn test_preceding_number_respects_window() {
        let text = format!("1. {}[Article URL]", "x".repeat(60));
        let pos = text.find('[').unwrap();
        assert_eq!(preceding_number(&text, pos, patterns()), None);
    }

    #[test]
    fn test_preceding_number_multibyte_window() {
        let text = format!("4. {}[Paper URL]", "é".repeat(40));
        let pos = text.find('[').unwrap();
        assert_eq!(preceding_number(&text, pos, patterns()), Some(4));
    }

    #[test]
    fn test_lookback_sees_resolved_urls() {
        let citations = vec![Citation::new(1, "A", "https://a.example")];
        let text = format!("1. [Link to the original article URL goes here] {}[Source URL]", "z".repeat(20));

        let once = resolve_placeholders(&text, &citations, patterns());

        assert_eq!(once, format!("1. https://a.example {}https://a.example", "z".repeat(20)));
        assert_eq!(resolve_placeholders(&once, &citations, patterns()), once);
    }

    #[test]
    fn test_starts_with_number() {
        assert!(starts_with_number("1. [A](u)", 1));
        assert!(!starts_with_number("10. [A](u)", 1));
        assert!(starts_with_number("  10. x", 10));
    }

    #[test]
    fn test_empty_citations_leave_report_untouched() {
        let report = "# Title\n\nBody";
        assert_eq!(enforce(report, &[]), report);
    }
}
