//! Post models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::normalize::{normalize, NormalizedBlock};
use super::reading_time::{minutes_for, total_words};
use crate::prismic::ContentDocument;

/// A blog post ready for rendering
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// URL identifier
    pub uid: String,

    /// Post title
    pub title: String,

    pub subtitle: Option<String>,

    pub author: String,

    /// Banner image URL
    pub banner_url: Option<String>,

    /// Publication date
    pub first_publication_date: Option<DateTime<Utc>>,

    /// Last edit date
    pub last_publication_date: Option<DateTime<Utc>>,

    /// Normalized content blocks
    pub blocks: Vec<NormalizedBlock>,

    pub word_count: usize,

    /// Estimated reading time in minutes
    pub reading_time: usize,
}

impl Post {
    /// Build a post from a fetched document
    pub fn from_document(doc: &ContentDocument) -> Self {
        let content = normalize(doc);
        let word_count = total_words(&content.plain_text_blocks);

        Self {
            uid: doc.uid.clone(),
            title: doc.data.title.clone(),
            subtitle: doc.data.subtitle.clone(),
            author: doc.data.author.clone(),
            banner_url: doc.data.banner_url().map(str::to_string),
            first_publication_date: doc.first_publication_date,
            last_publication_date: doc.last_publication_date,
            blocks: content.display_blocks,
            word_count,
            reading_time: minutes_for(word_count),
        }
    }

    /// Whether the post was republished after its first publication
    pub fn was_edited(&self) -> bool {
        match (self.first_publication_date, self.last_publication_date) {
            (Some(first), Some(last)) => last > first,
            _ => false,
        }
    }

    /// URL path (without root)
    pub fn path(&self) -> String {
        post_path(&self.uid)
    }
}

/// Listing projection of a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub author: String,
    pub first_publication_date: Option<DateTime<Utc>>,
}

impl PostSummary {
    pub fn from_document(doc: &ContentDocument) -> Self {
        Self {
            uid: doc.uid.clone(),
            title: doc.data.title.clone(),
            subtitle: doc.data.subtitle.clone(),
            author: doc.data.author.clone(),
            first_publication_date: doc.first_publication_date,
        }
    }

    /// URL path (without root)
    pub fn path(&self) -> String {
        post_path(&self.uid)
    }
}

/// Path of a post page relative to the site root
pub fn post_path(uid: &str) -> String {
    format!("post/{}/", uid)
}

/// Whether a uid can name a single directory under `post/`
pub fn is_safe_uid(uid: &str) -> bool {
    !uid.is_empty()
        && !uid.contains('/')
        && !uid.contains('\\')
        && !uid.contains("..")
        && !uid.chars().any(char::is_control)
}
