//! HTML cleanup and link discovery for crawled pages.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

lazy_static! {
    static ref COMMENTS: Regex = Regex::new(r"(?s)<!--.*?-->").expect("valid regex");
    static ref BLOCKS: Vec<Regex> = ["head", "style", "script", "noscript", "svg"]
        .iter()
        .map(|name| Regex::new(&format!(r"(?is)<{name}\b[^>]*>.*?</{name}\s*>")).expect("valid regex"))
        .collect();
    static ref TAGS: Regex = Regex::new(r"(?s)<[^>]*>").expect("valid regex");
    static ref ENTITIES: Regex = Regex::new(r"&\S+?;").expect("valid regex");
    static ref ANCHORS: Selector = Selector::parse("a[href]").expect("valid selector");
}

/// Removes comments and the elements whose content is never visible text
/// (`head`, `style`, `script`, `noscript`, `svg`).
pub fn strip_block_elements(html: &str) -> String {
    let mut cleaned = COMMENTS.replace_all(html, " ").into_owned();
    for block in BLOCKS.iter() {
        cleaned = block.replace_all(&cleaned, " ").into_owned();
    }
    cleaned
}

/// Visible text of `html`: block elements, then tags, then entities removed.
pub fn strip_html(html: &str) -> String {
    let cleaned = strip_block_elements(html);
    let cleaned = TAGS.replace_all(&cleaned, " ");
    ENTITIES.replace_all(&cleaned, " ").into_owned()
}

/// Absolute `http(s)` targets of every anchor in `html`, resolved against
/// `base` with fragments removed, in document order.
pub fn valid_links(base: &Url, html: &str) -> Vec<Url> {
    let document = Html::parse_document(html);

    document
        .select(&ANCHORS)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_invisible_blocks() {
        let html = "<HEAD><title>t</title></HEAD><body>keep<SCRIPT type=x>drop()</script>\
                    <!-- gone -->\n<style>\np{}\n</style>me</body>";
        let cleaned = strip_block_elements(html);
        assert!(!cleaned.contains("drop"));
        assert!(!cleaned.contains("gone"));
        assert!(!cleaned.contains("title"));
        assert!(!cleaned.contains("p{}"));
        assert!(cleaned.contains("keep"));
    }

    #[test]
    fn strip_html_leaves_text() {
        let text = strip_html("<p>fish&amp;chips <b>now</b>&nbsp;served</p>");
        let words: Vec<_> = text.split_whitespace().collect();
        assert_eq!(words, vec!["fish", "chips", "now", "served"]);
    }

    #[test]
    fn links_are_resolved_and_filtered() {
        let base = Url::parse("https://example.com/docs/index.html").unwrap();
        let html = r##"
            <a href="page.html#top">one</a>
            <a href="/root">two</a>
            <a href="mailto:me@example.com">mail</a>
            <a href="https://other.org/x">three</a>
            <a name="no-href">four</a>
        "##;
        let links: Vec<String> = valid_links(&base, html).into_iter().map(String::from).collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/docs/page.html",
                "https://example.com/root",
                "https://other.org/x",
            ]
        );
    }

    #[test]
    fn anchor_selector_is_shared_across_threads() {
        let base = Url::parse("http://site.test/").unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let base = &base;
                    s.spawn(move || valid_links(base, &format!(r#"<a href="/p{i}">p</a><a href="/q">q</a>"#)))
                })
                .collect();
            for (i, handle) in handles.into_iter().enumerate() {
                let links: Vec<String> = handle.join().unwrap().into_iter().map(String::from).collect();
                assert_eq!(links, vec![format!("http://site.test/p{i}"), "http://site.test/q".to_string()]);
            }
        });
    }
}
