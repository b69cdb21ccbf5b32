use scraper::{Html, Selector};

use super::clean::clean_body;

const MAIN_SELECTORS: &[&str] = &["main", "[role=main]", ".content", ".article-content", ".post-content"];
const CONTAINER_SELECTORS: &[&str] = &[".article", ".story", ".entry", ".post"];

pub struct Parsed {
    pub title: String,
    pub description: Option<String>,
    pub body: String,
}

/// Probes the DOM per §4.2's ordered fallback chain: OG/Twitter/title/h1 for
/// the title, OG/meta/Twitter for the description, then an article/main/
/// container/body cascade for the text, finally handed to `readability` for
/// a whole-document pass when the selector cascade comes up short.
pub fn parse(html: &str, url: &str) -> Parsed {
    let document = Html::parse_document(html);

    let title = extract_title(&document).unwrap_or_default();
    let description = extract_description(&document);
    let body = extract_body(&document, html, url);

    Parsed {
        title,
        description,
        body,
    }
}

fn meta_content(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn text_of(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document.select(&selector).next().map(|el| {
        el.text()
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    })
}

fn extract_title(document: &Html) -> Option<String> {
    meta_content(document, r#"meta[property="og:title"]"#)
        .or_else(|| meta_content(document, r#"meta[name="twitter:title"]"#))
        .or_else(|| text_of(document, "title"))
        .or_else(|| text_of(document, "h1"))
        .filter(|s| !s.is_empty())
}

fn extract_description(document: &Html) -> Option<String> {
    meta_content(document, r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(document, r#"meta[name="description"]"#))
        .or_else(|| meta_content(document, r#"meta[name="twitter:description"]"#))
}

fn extract_body(document: &Html, raw_html: &str, url: &str) -> String {
    if let Some(text) = text_of(document, "article") {
        if text.len() >= 200 {
            return clean_body(&text);
        }
    }

    for selector in MAIN_SELECTORS.iter().chain(CONTAINER_SELECTORS.iter()) {
        if let Some(text) = text_of(document, selector) {
            if text.len() >= 200 {
                return clean_body(&text);
            }
        }
    }

    if let Ok(product) = readability::extractor::extract(&mut raw_html.as_bytes(), url_as_url(url).as_ref()) {
        let cleaned = clean_body(&product.text);
        if cleaned.len() >= 200 {
            return cleaned;
        }
    }

    let body_text = text_of(document, "body").unwrap_or_default();
    let cleaned = clean_body(&body_text);
    cleaned.chars().take(2000).collect()
}

fn url_as_url(url: &str) -> url::Url {
    url::Url::parse(url).unwrap_or_else(|_| url::Url::parse("https://example.invalid/").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_og_title_over_title_tag() {
        let html = r#"<html><head>
            <title>Fallback Title</title>
            <meta property="og:title" content="Primary Title">
        </head><body></body></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(extract_title(&document), Some("Primary Title".to_string()));
    }

    #[test]
    fn falls_back_to_h1_when_no_meta() {
        let html = "<html><head><title></title></head><body><h1>Headline Text</h1></body></html>";
        let document = Html::parse_document(html);
        assert_eq!(extract_title(&document), Some("Headline Text".to_string()));
    }

    #[test]
    fn extracts_description_from_meta() {
        let html = r#"<html><head><meta name="description" content="A short summary."></head></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(extract_description(&document), Some("A short summary.".to_string()));
    }
}
