use scraper::{Html, Selector};
use supplier_core::{PostcodeRecord, NOT_FOUND};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScrapedFields {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub link: Option<String>,
}

impl ScrapedFields {
    /// Fill missing fields with the sentinel.
    pub fn into_record(self, postcode: impl Into<String>) -> PostcodeRecord {
        let or_sentinel = |value: Option<String>| value.unwrap_or_else(|| NOT_FOUND.to_string());
        PostcodeRecord {
            postcode: postcode.into(),
            supplier: or_sentinel(self.name),
            phone: or_sentinel(self.phone),
            link: or_sentinel(self.link),
        }
    }
}

/// Pulls the supplier card out of the HTML fragment returned by the lookup form:
/// - name from `<h2 class="supplier__name">`
/// - phone from the `<b>` inside `<p class="supplier__phone">`
/// - link from the `href` of an `<a>` whose class attribute starts with
///   `supplier__link` (so `supplier__link--external` counts too)
///
/// Each field is independent; a missing one is `None`.
pub fn scrape_supplier(html: &str) -> ScrapedFields {
    let doc = Html::parse_fragment(html);

    ScrapedFields {
        name: first_text(&doc, "h2.supplier__name"),
        phone: first_text(&doc, "p.supplier__phone b"),
        link: first_attr(&doc, r#"a[class^="supplier__link"]"#, "href"),
    }
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .map(|node| node.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty())
}

fn first_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .filter_map(|node| node.value().attr(attr))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
