//! Content module - normalization, reading time and post models

mod normalize;
mod post;
pub mod reading_time;
mod richtext;

pub use normalize::{normalize, NormalizedBlock, NormalizedContent, PlainTextBlock};
pub use post::{is_safe_uid, post_path, Post, PostSummary};
pub use reading_time::{count_words, estimate_minutes, WORDS_PER_MINUTE};
pub use richtext::{as_html, as_text};
