// src/fetch/urls.rs
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Page opened once before the batch starts; it establishes the session.
pub const LANDING_URL: &str = "http://sv-vw-ejap:5555/SupportCenter/main.aspx?area=nav_answers&etc=127&page=CS&pageType=EntityList&web=true";

const DETAIL_PREFIX: &str = "http://sv-vw-ejap:5555/SupportCenter/main.aspx?etc=127&extraqs=";
const DETAIL_SUFFIX: &str = "&newWindow=true&pagetype=entityrecord#635740545";

/// Everything except the RFC 3986 unreserved characters gets escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode_lower(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string().to_lowercase()
}

/// Detail-page URL for one article.
///
/// `extraqs` is itself a query string, so the braced id is encoded once to
/// build `?etc=127&id=…` and that whole string is encoded again.
pub fn build_detail_url(article_id: &str) -> String {
    let token = encode_lower(&format!("{{{}}}", article_id));
    let extraqs = encode_lower(&format!("?etc=127&id={}", token));
    format!("{}{}{}", DETAIL_PREFIX, extraqs, DETAIL_SUFFIX)
}
