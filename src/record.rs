// src/record.rs

use serde::Serialize;

/// Title written in place of the article title when a row's pipeline fails.
pub const ERROR_MARKER: &str = "エラー発生";

/// Output column headers, in sheet order.
pub const COLUMNS: [&str; 12] = [
    "番号",
    "記事",
    "記事番号",
    "タイトル",
    "キーワード",
    "公開開始",
    "公開終了",
    "質問",
    "回答",
    "追加コメント",
    "情報カテゴリ",
    "対象",
];

/// One row of the input worklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorklistRow {
    /// Value of the `番号` column, `""` when the column or cell is absent.
    pub number: String,
    /// Knowledge-base article identifier (the bare GUID, without braces).
    pub article_id: String,
}

/// Everything read off an article's detail page. Unextractable values are `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArticleFields {
    pub article_number: String,
    pub title: String,
    pub keywords: String,
    pub publish_start: String,
    pub publish_end: String,
    pub question: String,
    pub answer: String,
    pub comments: String,
    pub category: String,
    pub audience: String,
}

/// One row of the output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
    pub number: String,
    pub article_id: String,
    #[serde(flatten)]
    pub fields: ArticleFields,
}

impl ArticleRecord {
    pub fn extracted(row: &WorklistRow, fields: ArticleFields) -> Self {
        Self {
            number: row.number.clone(),
            article_id: row.article_id.clone(),
            fields,
        }
    }

    /// The placeholder row emitted when fetching or reading the article failed.
    pub fn failed(row: &WorklistRow) -> Self {
        Self::extracted(
            row,
            ArticleFields {
                title: ERROR_MARKER.to_string(),
                ..ArticleFields::default()
            },
        )
    }

    /// Cell values in [`COLUMNS`] order.
    pub fn to_cells(&self) -> [&str; 12] {
        let f = &self.fields;
        [
            &self.number,
            &self.article_id,
            &f.article_number,
            &f.title,
            &f.keywords,
            &f.publish_start,
            &f.publish_end,
            &f.question,
            &f.answer,
            &f.comments,
            &f.category,
            &f.audience,
        ]
    }
}
