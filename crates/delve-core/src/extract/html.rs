//! HTML extraction strategies, tried in order of decreasing precision.

use scraper::node::Element;
use scraper::{ElementRef, Html, Node};
use tracing::debug;

use super::trimmed_len;
use crate::config::{HTML_LOW_BAR_CHARS, HTML_MIN_CHARS};

/// Tags that never carry readable text.
const NOISE_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "iframe"];

/// Page chrome removed by the DOM heuristic.
const CHROME_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "aside"];

/// Extra structure the article-tuned extractor refuses to read.
const BOILERPLATE_TAGS: &[&str] = &["form", "table", "button", "select", "figure"];

/// class/id fragments marking comment threads, sidebars and the like.
const BOILERPLATE_MARKERS: &[&str] = &[
    "comment", "sidebar", "footer", "navbar", "menu", "share", "social", "related", "advert",
    "promo", "cookie", "newsletter", "breadcrumb",
];

/// Block elements the article-tuned extractor keeps as units.
const BLOCK_TAGS: &[&str] = &["p", "pre", "blockquote", "li", "dd", "h1", "h2", "h3", "h4", "h5", "h6"];

/// class keywords of content-like containers.
const CONTENT_CLASS_KEYWORDS: &[&str] = &["content", "article", "main", "post", "entry"];

/// Paragraphs shorter than this are treated as captions or buttons.
const MIN_BLOCK_CHARS: usize = 25;

/// One way of turning a parsed page into text.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Text if this strategy clears its own bar, else `None`.
    fn attempt(&self, document: &Html) -> Option<String>;
}

/// Ordered strategy chain; the first acceptance wins.
pub struct HtmlPipeline {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl HtmlPipeline {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Parses `html` and returns the first accepted text with the strategy name.
    pub fn run(&self, html: &str) -> Option<(String, &'static str)> {
        let document = Html::parse_document(html);
        for strategy in &self.strategies {
            match strategy.attempt(&document) {
                Some(text) => return Some((text, strategy.name())),
                None => debug!(strategy = strategy.name(), "strategy produced no acceptable text"),
            }
        }
        None
    }
}

impl Default for HtmlPipeline {
    fn default() -> Self {
        Self::new(vec![
            Box::new(BoilerplateStrategy),
            Box::new(ArticleStrategy),
            Box::new(DomStrategy),
            Box::new(MetadataStrategy),
        ])
    }
}

/// Article-tuned boilerplate removal.
///
/// Keeps paragraph-level blocks with low link density and drops navigation,
/// comment threads, tables and forms entirely.
pub struct BoilerplateStrategy;

impl ExtractionStrategy for BoilerplateStrategy {
    fn name(&self) -> &'static str {
        "boilerplate"
    }

    fn attempt(&self, document: &Html) -> Option<String> {
        let body = find_first(document.root_element(), &is_noise, "body")?;
        let mut blocks = Vec::new();
        collect_blocks(body, &mut blocks);

        let text = blocks.join("\n");
        (trimmed_len(&text) > HTML_MIN_CHARS).then_some(text)
    }
}

fn collect_blocks(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children().filter_map(ElementRef::wrap) {
        let el = child.value();
        if is_boilerplate(el) {
            continue;
        }
        if !BLOCK_TAGS.contains(&el.name()) {
            collect_blocks(child, out);
            continue;
        }

        let text = inline_text(child);
        let total = text.chars().count();
        if total == 0 || link_chars(child) * 2 > total {
            continue;
        }
        let heading = el.name().len() == 2 && el.name().starts_with('h');
        if heading || total >= MIN_BLOCK_CHARS {
            out.push(text);
        }
    }
}

/// Title plus the densest paragraph cluster, in the manner of news extractors.
pub struct ArticleStrategy;

impl ExtractionStrategy for ArticleStrategy {
    fn name(&self) -> &'static str {
        "article"
    }

    fn attempt(&self, document: &Html) -> Option<String> {
        let root = document.root_element();
        let skip = |el: &Element| is_chrome(el) || is_noise(el);

        // (parent, paragraphs, chars) in document order
        let mut clusters: Vec<(ElementRef<'_>, Vec<String>, usize)> = Vec::new();
        for p in find_all(root, &skip, &|el| el.name() == "p") {
            let text = inline_text(p);
            let chars = text.chars().count();
            if chars < MIN_BLOCK_CHARS || link_chars(p) * 2 > chars {
                continue;
            }
            let Some(parent) = p.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            match clusters.iter_mut().find(|c| c.0 == parent) {
                Some(cluster) => {
                    cluster.1.push(text);
                    cluster.2 += chars;
                }
                None => clusters.push((parent, vec![text], chars)),
            }
        }

        let (_, paragraphs, _) = clusters.into_iter().max_by_key(|c| c.2)?;
        let body = paragraphs.join("\n\n");
        if trimmed_len(&body) <= HTML_MIN_CHARS {
            return None;
        }

        let title = meta_content(root, &["og:title"])
            .or_else(|| find_first(root, &skip, "h1").map(inline_text).filter(|t| !t.is_empty()))
            .or_else(|| page_title(root));

        Some(match title {
            Some(title) => format!("{title}\n\n{body}"),
            None => body,
        })
    }
}

/// Structural DOM heuristic: article, then main, then content-like containers,
/// then the whole body.
pub struct DomStrategy;

impl ExtractionStrategy for DomStrategy {
    fn name(&self) -> &'static str {
        "dom"
    }

    fn attempt(&self, document: &Html) -> Option<String> {
        let root = document.root_element();
        let skip = |el: &Element| is_chrome(el);

        let mut content = if let Some(article) = find_first(root, &skip, "article") {
            text_of(article, &skip)
        } else if let Some(main) = find_first(root, &skip, "main") {
            text_of(main, &skip)
        } else {
            find_all(root, &skip, &is_content_container)
                .into_iter()
                .map(|el| text_of(el, &skip))
                .max_by_key(|t| t.chars().count())
                .unwrap_or_default()
        };

        if trimmed_len(&content) < HTML_MIN_CHARS {
            if let Some(body) = find_first(root, &skip, "body") {
                content = text_of(body, &skip);
            }
        }

        let content = normalize_lines(&content);
        if content.is_empty() {
            return None;
        }

        let title = page_title(root)
            .or_else(|| find_first(root, &skip, "h1").map(inline_text).filter(|t| !t.is_empty()));
        let content = match title {
            Some(title) => format!("{title}\n\n{content}"),
            None => content,
        };

        let len = trimmed_len(&content);
        if len > HTML_MIN_CHARS {
            Some(content)
        } else if len > HTML_LOW_BAR_CHARS {
            debug!(chars = len, "accepting short page under the lowered bar");
            Some(content)
        } else {
            None
        }
    }
}

/// Last resort: title, description and author from page metadata.
pub struct MetadataStrategy;

impl ExtractionStrategy for MetadataStrategy {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn attempt(&self, document: &Html) -> Option<String> {
        let root = document.root_element();
        let title = meta_content(root, &["og:title", "twitter:title"]).or_else(|| page_title(root));
        let description = meta_content(root, &["description", "og:description", "twitter:description"]);
        let author = meta_content(root, &["author", "article:author"]);

        let mut content = String::new();
        if let Some(title) = title {
            content.push_str(&title);
            content.push_str("\n\n");
        }
        if let Some(description) = description {
            content.push_str(&description);
            content.push_str("\n\n");
        }
        if let Some(author) = author {
            content.push_str(&format!("Author: {author}\n\n"));
        }

        (trimmed_len(&content) > HTML_LOW_BAR_CHARS).then_some(content)
    }
}

fn is_noise(el: &Element) -> bool {
    NOISE_TAGS.contains(&el.name())
}

fn is_chrome(el: &Element) -> bool {
    CHROME_TAGS.contains(&el.name())
}

fn is_boilerplate(el: &Element) -> bool {
    if is_noise(el) || is_chrome(el) || BOILERPLATE_TAGS.contains(&el.name()) {
        return true;
    }
    let marked = |value: &str| {
        let value = value.to_lowercase();
        BOILERPLATE_MARKERS.iter().any(|m| value.contains(m))
    };
    el.attr("class").is_some_and(marked) || el.id().is_some_and(marked)
}

fn is_content_container(el: &Element) -> bool {
    matches!(el.name(), "div" | "section")
        && el.attr("class").is_some_and(|class| {
            let class = class.to_lowercase();
            CONTENT_CLASS_KEYWORDS.iter().any(|k| class.contains(k))
        })
}

/// First element named `tag`, not descending into skipped subtrees.
fn find_first<'a>(root: ElementRef<'a>, skip: &dyn Fn(&Element) -> bool, tag: &str) -> Option<ElementRef<'a>> {
    if root.value().name() == tag {
        return Some(root);
    }
    for child in root.children().filter_map(ElementRef::wrap) {
        if skip(child.value()) {
            continue;
        }
        if let Some(found) = find_first(child, skip, tag) {
            return Some(found);
        }
    }
    None
}

/// Every element matching `pred` in document order, skipping excluded subtrees.
fn find_all<'a>(
    root: ElementRef<'a>,
    skip: &dyn Fn(&Element) -> bool,
    pred: &dyn Fn(&Element) -> bool,
) -> Vec<ElementRef<'a>> {
    let mut found = Vec::new();
    walk(root, skip, pred, &mut found);
    found
}

fn walk<'a>(
    element: ElementRef<'a>,
    skip: &dyn Fn(&Element) -> bool,
    pred: &dyn Fn(&Element) -> bool,
    found: &mut Vec<ElementRef<'a>>,
) {
    for child in element.children().filter_map(ElementRef::wrap) {
        if skip(child.value()) {
            continue;
        }
        if pred(child.value()) {
            found.push(child);
        }
        walk(child, skip, pred, found);
    }
}

/// Text fragments of `element`, one per line, skipping excluded subtrees.
fn text_of(element: ElementRef<'_>, skip: &dyn Fn(&Element) -> bool) -> String {
    let mut fragments = Vec::new();
    collect_fragments(element, skip, &mut fragments);
    fragments.join("\n")
}

fn collect_fragments(element: ElementRef<'_>, skip: &dyn Fn(&Element) -> bool, out: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            }
            Node::Element(el) if !skip(el) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_fragments(child, skip, out);
                }
            }
            _ => {}
        }
    }
}

/// Whitespace-collapsed text of an inline run such as a paragraph.
fn inline_text(element: ElementRef<'_>) -> String {
    text_of(element, &is_noise).split_whitespace().collect::<Vec<_>>().join(" ")
}

fn link_chars(element: ElementRef<'_>) -> usize {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "a")
        .map(|a| inline_text(a).chars().count())
        .sum()
}

/// One trimmed, non-empty line per line.
fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn page_title(root: ElementRef<'_>) -> Option<String> {
    find_first(root, &is_noise, "title")
        .map(inline_text)
        .filter(|t| !t.is_empty())
}

/// `content` of the first `<meta>` whose `name` or `property` matches a key.
fn meta_content(root: ElementRef<'_>, keys: &[&str]) -> Option<String> {
    let metas = find_all(root, &is_noise, &|el| el.name() == "meta");
    keys.iter().find_map(|key| {
        metas.iter().find_map(|meta| {
            let el = meta.value();
            let matches = [el.attr("name"), el.attr("property")]
                .into_iter()
                .flatten()
                .any(|v| v.eq_ignore_ascii_case(key));
            if !matches {
                return None;
            }
            el.attr("content")
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(html: &str) -> Option<(String, &'static str)> {
        HtmlPipeline::default().run(html)
    }

    #[test]
    fn test_article_page_uses_boilerplate_strategy() {
        let html = r#"<html><head><title>Ownership in Rust</title></head><body>
            <nav><a href="/">Home</a><a href="/blog">Blog</a></nav>
            <article>
              <h1>Ownership in Rust</h1>
              <p>Ownership is a set of rules that govern how a Rust program manages memory while it runs.</p>
              <p>Each value in Rust has an owner, and there can only be one owner at a time for that value.</p>
            </article>
            <div class="comments"><p>Great post, I totally agree with everything written in this article!</p></div>
            <footer><p>Copyright notice for the whole site goes here, all rights reserved.</p></footer>
            </body></html>"#;

        let (text, strategy) = run(html).unwrap();
        assert_eq!(strategy, "boilerplate");
        assert!(text.starts_with("Ownership in Rust\nOwnership is a set of rules"));
        assert!(!text.contains("Great post"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("Home"));
    }

    #[test]
    fn test_link_heavy_blocks_are_dropped() {
        let html = r#"<html><body>
            <p><a href="/a">A very long link text that makes up the entire paragraph here</a></p>
            </body></html>"#;
        let doc = Html::parse_document(html);
        assert!(BoilerplateStrategy.attempt(&doc).is_none());
    }

    #[test]
    fn test_table_layout_falls_through_to_article_strategy() {
        let html = r#"<html><head><title>Old Site</title></head><body>
            <table><tr><td>
              <p>This page was built with a table layout long before anyone used CSS grids.</p>
              <p>Its real content lives in table cells, which stricter extractors skip over.</p>
            </td></tr></table>
            </body></html>"#;

        let (text, strategy) = run(html).unwrap();
        assert_eq!(strategy, "article");
        assert!(text.starts_with("Old Site\n\nThis page was built"));
        assert!(text.contains("\n\nIts real content"));
    }

    #[test]
    fn test_paragraphless_post_uses_dom_strategy() {
        let html = r#"<html><head><title>Forum</title></head><body>
            <header>Site header</header>
            <div class="post-body">First line of a forum post that has no paragraph tags at all.<br>
            Second line keeps going with enough words to pass the length bar.</div>
            </body></html>"#;

        let (text, strategy) = run(html).unwrap();
        assert_eq!(strategy, "dom");
        assert_eq!(
            text,
            "Forum\n\nFirst line of a forum post that has no paragraph tags at all.\n\
             Second line keeps going with enough words to pass the length bar."
        );
        assert!(!text.contains("Site header"));
    }

    #[test]
    fn test_dom_prefers_article_over_containers() {
        let html = r#"<html><body>
            <div class="content">Sidebar-ish container text that is long but should not be chosen at all, really.</div>
            <article>Article text wins because the article element is checked first by the heuristic, before any container.</article>
            </body></html>"#;
        let doc = Html::parse_document(html);
        let text = DomStrategy.attempt(&doc).unwrap();
        assert!(text.starts_with("Article text wins"));
        assert!(!text.contains("Sidebar-ish"));
    }

    #[test]
    fn test_short_page_accepted_under_lowered_bar() {
        let html = r#"<html><head><title>Short</title></head><body>
            <main>A brief note that is only somewhat long enough.</main></body></html>"#;

        let (text, strategy) = run(html).unwrap();
        assert_eq!(strategy, "dom");
        assert_eq!(text, "Short\n\nA brief note that is only somewhat long enough.");
    }

    #[test]
    fn test_script_only_page_uses_metadata() {
        let html = r#"<html><head><title>App</title>
            <meta name="description" content="A single page application that renders everything with JavaScript.">
            <meta name="author" content="Jane Doe">
            </head><body><div id="root"></div><script>boot()</script></body></html>"#;

        let (text, strategy) = run(html).unwrap();
        assert_eq!(strategy, "metadata");
        assert!(text.starts_with("App\n\nA single page application"));
        assert!(text.contains("Author: Jane Doe"));
    }

    #[test]
    fn test_nothing_extractable() {
        assert!(run("<html><body><p>tiny</p></body></html>").is_none());
        assert!(run("").is_none());
    }

    #[test]
    fn test_normalize_lines() {
        assert_eq!(normalize_lines("  a \n\n   \n b\n"), "a\nb");
    }
}
