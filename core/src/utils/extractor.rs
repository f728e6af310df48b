use std::collections::HashSet;
use std::sync::LazyLock;

use log::debug;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use super::scope::{is_http, is_internal, normalize};

static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href], link[href], area[href], base[href]")
        .expect("link selector is valid CSS")
});

static FORM_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form").expect("form selector is valid CSS"));

static INPUT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input").expect("input selector is valid CSS"));

/// One `<input>` of a discovered form. Missing attributes are empty strings;
/// a missing `type` reads as `text`, as browsers treat it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub id: String,
    pub class: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A `<form>` found on a crawled page, kept for later payload injection.
/// `id` is the form's position within its page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDescriptor {
    pub id: usize,
    pub url: String,
    pub fields: Vec<FormField>,
}

/// Collects outbound links from static markup.
///
/// `href`s are resolved against `base`, anything that is not http(s) is
/// dropped, and with `ignore_external` only links on the `origin` site are
/// kept. Order is first occurrence in the document; duplicates collapse.
pub fn extract_links(html: &str, base: &Url, origin: &Url, ignore_external: bool) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&LINK_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(url) = normalize(base, href) else {
            debug!("Skipping malformed href '{}' on {}", href, base);
            continue;
        };

        if !is_http(&url) {
            continue;
        }

        if ignore_external && !is_internal(&url, origin) {
            debug!("Ignoring external URL: {}", url);
            continue;
        }

        if seen.insert(url.as_str().to_string()) {
            links.push(url);
        }
    }

    links
}

/// Describes every form in `html` with the inputs nested inside it.
pub fn extract_forms(html: &str, page: &Url) -> Vec<FormDescriptor> {
    let document = Html::parse_document(html);

    let forms: Vec<FormDescriptor> = document
        .select(&FORM_SELECTOR)
        .enumerate()
        .map(|(id, form)| {
            let fields = form
                .select(&INPUT_SELECTOR)
                .map(|input| {
                    let attr = |name: &str| input.value().attr(name).unwrap_or_default().to_string();
                    FormField {
                        name: attr("name"),
                        id: attr("id"),
                        class: attr("class"),
                        kind: input
                            .value()
                            .attr("type")
                            .map(|t| t.to_ascii_lowercase())
                            .unwrap_or_else(|| "text".to_string()),
                    }
                })
                .collect();

            FormDescriptor {
                id,
                url: page.as_str().to_string(),
                fields,
            }
        })
        .collect();

    debug!("Extracted {} form(s) from {}", forms.len(), page);
    forms
}
