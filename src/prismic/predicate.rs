//! Query predicates, orderings and options in Prismic's query syntax

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path of the first publication date, the listing order key
pub const FIRST_PUBLICATION_DATE: &str = "document.first_publication_date";

/// A query predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Predicate {
    /// Field equals value
    At { path: String, value: String },
    /// Field equals one of the values
    Any { path: String, values: Vec<String> },
    /// Field differs from value
    Not { path: String, value: String },
    /// Date field strictly later than value
    #[serde(rename = "date.after")]
    DateAfter { path: String, value: String },
    /// Date field strictly earlier than value
    #[serde(rename = "date.before")]
    DateBefore { path: String, value: String },
}

impl Predicate {
    pub fn at(path: &str, value: &str) -> Self {
        Self::At {
            path: path.to_string(),
            value: value.to_string(),
        }
    }

    pub fn any(path: &str, values: &[&str]) -> Self {
        Self::Any {
            path: path.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn not(path: &str, value: &str) -> Self {
        Self::Not {
            path: path.to_string(),
            value: value.to_string(),
        }
    }

    pub fn date_after(path: &str, date: &DateTime<Utc>) -> Self {
        Self::DateAfter {
            path: path.to_string(),
            value: format_date_value(date),
        }
    }

    pub fn date_before(path: &str, date: &DateTime<Utc>) -> Self {
        Self::DateBefore {
            path: path.to_string(),
            value: format_date_value(date),
        }
    }

    /// `at(document.type, "<type>")`
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    /// `at(my.<type>.uid, "<uid>")`
    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Self::at(&format!("my.{}.uid", doc_type), uid)
    }

    /// Field path this predicate tests
    pub fn path(&self) -> &str {
        match self {
            Self::At { path, .. }
            | Self::Any { path, .. }
            | Self::Not { path, .. }
            | Self::DateAfter { path, .. }
            | Self::DateBefore { path, .. } => path,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At { path, value } => write!(f, "[at({},{})]", path, quote(value)),
            Self::Not { path, value } => write!(f, "[not({},{})]", path, quote(value)),
            Self::DateAfter { path, value } => {
                write!(f, "[date.after({},{})]", path, quote(value))
            }
            Self::DateBefore { path, value } => {
                write!(f, "[date.before({},{})]", path, quote(value))
            }
            Self::Any { path, values } => {
                let values: Vec<String> = values.iter().map(|v| quote(v)).collect();
                write!(f, "[any({},[{}])]", path, values.join(","))
            }
        }
    }
}

/// Dates are sent in the same form the API returns them
fn format_date_value(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%z").to_string()
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Render predicates as the value of the `q` query parameter
pub fn render_query(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(|p| p.to_string()).collect();
    format!("[{}]", inner)
}

/// Sort key of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}

/// Render orderings as the value of the `orderings` query parameter
pub fn render_orderings(orderings: &[Ordering]) -> Option<String> {
    if orderings.is_empty() {
        return None;
    }
    let fields: Vec<String> = orderings
        .iter()
        .map(|o| {
            if o.descending {
                format!("{} desc", o.field)
            } else {
                o.field.clone()
            }
        })
        .collect();
    Some(format!("[{}]", fields.join(",")))
}

/// Options of a listing query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Restrict returned data fields (`posts.title`, ...)
    pub fetch: Vec<String>,
    pub orderings: Vec<Ordering>,
    pub page_size: Option<usize>,
    pub page: Option<usize>,
    /// Only return documents after this document id in the requested order
    pub after: Option<String>,
}

impl QueryOptions {
    pub fn fetch(mut self, fields: &[&str]) -> Self {
        self.fetch = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn after(mut self, id: &str) -> Self {
        self.after = Some(id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_query() {
        let q = render_query(&[
            Predicate::document_type("posts"),
            Predicate::uid("posts", "como-utilizar-hooks"),
        ]);
        assert_eq!(
            q,
            r#"[[at(document.type,"posts")][at(my.posts.uid,"como-utilizar-hooks")]]"#
        );
    }

    #[test]
    fn test_render_any_and_not() {
        assert_eq!(
            Predicate::any("document.id", &["a", "b"]).to_string(),
            r#"[any(document.id,["a","b"])]"#
        );
        assert_eq!(
            Predicate::not("document.uid", "say \"hi\"").to_string(),
            r#"[not(document.uid,"say \"hi\"")]"#
        );
    }

    #[test]
    fn test_render_date_predicates() {
        let date = crate::prismic::document::parse_timestamp("2021-03-05T12:00:00+0000").unwrap();
        assert_eq!(
            Predicate::date_after(FIRST_PUBLICATION_DATE, &date).to_string(),
            r#"[date.after(document.first_publication_date,"2021-03-05T12:00:00+0000")]"#
        );
        assert_eq!(
            Predicate::date_before(FIRST_PUBLICATION_DATE, &date).to_string(),
            r#"[date.before(document.first_publication_date,"2021-03-05T12:00:00+0000")]"#
        );
    }

    #[test]
    fn test_render_orderings() {
        assert_eq!(render_orderings(&[]), None);
        assert_eq!(
            render_orderings(&[Ordering::desc(FIRST_PUBLICATION_DATE)]).as_deref(),
            Some("[document.first_publication_date desc]")
        );
        assert_eq!(
            render_orderings(&[
                Ordering::asc(FIRST_PUBLICATION_DATE),
                Ordering::asc("my.posts.title")
            ])
            .as_deref(),
            Some("[document.first_publication_date,my.posts.title]")
        );
    }

    #[test]
    fn test_options_builder() {
        let options = QueryOptions::default()
            .fetch(&["posts.title"])
            .order_by(Ordering::asc(FIRST_PUBLICATION_DATE))
            .page_size(1)
            .after("abc");
        assert_eq!(options.fetch, vec!["posts.title".to_string()]);
        assert_eq!(options.page_size, Some(1));
        assert_eq!(options.page, None);
        assert_eq!(options.after.as_deref(), Some("abc"));
    }
}
