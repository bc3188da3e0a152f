//! Per-site selector profile.
//!
//! Every selector list is an ordered cascade: most specific first, generic
//! fallbacks last. The defaults target daraz.com.np.

use serde::{Deserialize, Serialize};

/// Placeholder in [`SiteProfile::search_url_template`] replaced by the encoded query.
pub const QUERY_PLACEHOLDER: &str = "{query}";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Where to search and how to read the result pages of one catalog site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteProfile {
    /// Home page opened before the search is submitted.
    pub base_url: String,

    /// Direct catalog-search URL used when no search box can be found.
    pub search_url_template: String,

    /// Search input candidates.
    pub search_inputs: Vec<String>,

    /// Any of these present means the first result page has rendered.
    pub results_ready: Vec<String>,

    /// Any of these present means a paginated result page has rendered.
    pub next_page_ready: Vec<String>,

    /// Product item containers.
    pub containers: Vec<String>,

    /// A container selector is accepted only with strictly more matches than this.
    pub min_container_matches: usize,

    /// Primary product-name selectors inside an item.
    pub name_selectors: Vec<String>,

    /// Anchor text shorter than this (in chars) is not taken as a product name.
    pub min_name_chars: usize,

    pub price_selectors: Vec<String>,

    pub sold_selectors: Vec<String>,

    /// Conventional "next page" controls.
    pub next_selectors: Vec<String>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            base_url: "https://www.daraz.com.np".to_string(),
            search_url_template: "https://www.daraz.com.np/catalog/?q={query}".to_string(),
            search_inputs: strings(&[
                "input[placeholder*='Search']",
                "input[type='search']",
                "input[name='q']",
                "#q",
                "input.search-box__input",
            ]),
            results_ready: strings(&[
                "div[class*='grid']",
                "div[class*='product']",
                ".ant-row",
            ]),
            next_page_ready: strings(&[
                "div[class*='grid']",
                "div[class*='product']",
                ".ant-row",
                "div[class*='box--']",
            ]),
            containers: strings(&[
                "div[data-qa-locator='product-item']",
                "div.box--ujueT",
                ".ant-col-xs-24",
                "div[class*='box--']",
                ".ant-col",
            ]),
            min_container_matches: 5,
            name_selectors: strings(&["a[title]", ".c16H9d", ".c1Atzq"]),
            min_name_chars: 10,
            price_selectors: strings(&["[class*='price']", ".c3gUW0"]),
            sold_selectors: strings(&["[class*='sold']"]),
            next_selectors: strings(&[
                "li.ant-pagination-next:not(.ant-pagination-disabled) a",
                "a[aria-label='Next Page']",
                "a[aria-label='next']",
                ".ant-pagination-next:not(.ant-pagination-disabled) a",
                "li.ant-pagination-next a",
                "a[title='Next Page']",
                "a[title='next']",
                ".ant-pagination-next a",
                "li[class*='pagination-next']:not([class*='disabled']) a",
                "a[class*='next']",
            ]),
        }
    }
}

impl SiteProfile {
    /// Direct search URL for `query`, percent-encoded.
    pub fn search_url(&self, query: &str) -> String {
        self.search_url_template
            .replace(QUERY_PLACEHOLDER, &urlencoding::encode(query.trim()))
    }
}
