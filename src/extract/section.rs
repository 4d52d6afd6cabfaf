// src/extract/section.rs
//
// Free-text sections are stored as an HTML-escaped table in a hidden field:
// a row holding a label cell ("質問", "回答", ...) followed by a row whose
// first cell is the section body.

use ego_tree::NodeRef;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

pub const QUESTION_LABEL: &str = "質問";
pub const ANSWER_LABEL: &str = "回答";
pub const COMMENTS_LABEL: &str = "追加コメント";

static TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid selector"));

/// The three free-text sections of an article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    pub question: String,
    pub answer: String,
    pub comments: String,
}

impl Sections {
    /// Parses the hidden field's value, which is the section table HTML-escaped once more.
    pub fn from_escaped(value: &str) -> Self {
        let markup = html_escape::decode_html_entities(value);
        Self::from_markup(&markup)
    }

    pub fn from_markup(markup: &str) -> Self {
        let doc = Html::parse_document(markup);
        let get = |label| section_text(&doc, label).unwrap_or_default();
        Self {
            question: get(QUESTION_LABEL),
            answer: get(ANSWER_LABEL),
            comments: get(COMMENTS_LABEL),
        }
    }
}

/// The sole text of `node`, following single-child elements down; `None`
/// when the node has several (or no) children.
fn sole_string(node: NodeRef<'_, Node>) -> Option<&str> {
    let mut children = node.children();
    let only = children.next()?;
    if children.next().is_some() {
        return None;
    }
    match only.value() {
        Node::Text(text) => Some(&**text),
        Node::Element(_) => sole_string(only),
        _ => None,
    }
}

/// First `<td>` in document order whose sole text contains `label`.
fn label_cell<'a>(doc: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    doc.select(&TD).find(|td| {
        sole_string(**td)
            .map(|s| s.trim().contains(label))
            .unwrap_or(false)
    })
}

fn is_element(node: &NodeRef<'_, Node>, name: &str) -> bool {
    node.value()
        .as_element()
        .map(|el| el.name() == name)
        .unwrap_or(false)
}

/// Body of the section labelled `label`: the first cell of the row after the
/// label's row, as its text nodes trimmed and joined by newlines.
pub fn section_text(doc: &Html, label: &str) -> Option<String> {
    let cell = label_cell(doc, label)?;
    let row = cell.ancestors().find(|n| is_element(n, "tr"))?;
    let next_row = row.next_siblings().find(|n| is_element(n, "tr"))?;
    let body = ElementRef::wrap(next_row)?.select(&TD).next()?;
    Some(visible_text(body))
}

/// Text nodes of `el`, each trimmed, blanks dropped, one per line.
pub fn visible_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
        <table>
          <tr><td><b>質問</b></td></tr>
          <tr><td><p>プリンタが</p><p>動かない</p></td><td>ignored</td></tr>
          <tr><td> 回答 </td></tr>
          <tr><td>電源を確認<br>してください</td></tr>
          <tr><td>追加コメント</td></tr>
        </table>"#;

    #[test]
    fn reads_the_row_after_the_label() {
        let s = Sections::from_markup(TABLE);
        assert_eq!(s.question, "プリンタが\n動かない");
        assert_eq!(s.answer, "電源を確認\nしてください");
    }

    #[test]
    fn label_without_following_row_is_empty() {
        let s = Sections::from_markup(TABLE);
        assert_eq!(s.comments, "");
    }

    #[test]
    fn missing_label_is_empty() {
        let s = Sections::from_markup("<table><tr><td>質問</td></tr><tr><td>q</td></tr></table>");
        assert_eq!(s.question, "q");
        assert_eq!(s.answer, "");
        assert_eq!(s.comments, "");
    }

    #[test]
    fn cell_with_mixed_content_is_not_a_label() {
        let markup = r#"<table>
            <tr><td>回答<span>(必須)</span></td></tr><tr><td>wrong</td></tr>
            <tr><td>回答欄</td></tr><tr><td>right</td></tr>
        </table>"#;
        let doc = Html::parse_document(markup);
        assert_eq!(section_text(&doc, ANSWER_LABEL).as_deref(), Some("right"));
    }

    #[test]
    fn first_matching_label_wins() {
        let markup = r#"<table>
            <tr><td>質問</td></tr><tr><td>first</td></tr>
            <tr><td>質問</td></tr><tr><td>second</td></tr>
        </table>"#;
        let doc = Html::parse_document(markup);
        assert_eq!(section_text(&doc, QUESTION_LABEL).as_deref(), Some("first"));
    }

    #[test]
    fn decodes_the_escaped_field_value() {
        let escaped = html_escape::encode_text(TABLE);
        let s = Sections::from_escaped(&escaped);
        assert_eq!(s, Sections::from_markup(TABLE));
        assert_eq!(s.answer, "電源を確認\nしてください");
    }

    #[test]
    fn empty_value_gives_empty_sections() {
        assert_eq!(Sections::from_escaped(""), Sections::default());
    }
}
