//! Reading-time estimation

use super::normalize::PlainTextBlock;

/// Fixed reading speed
pub const WORDS_PER_MINUTE: usize = 200;

/// Count whitespace-delimited tokens
///
/// Any run of Unicode whitespace (space, tab, newline, no-break space, ...)
/// is one delimiter; empty tokens are never counted.
pub fn count_words(text: &str) -> usize {
    text.split(char::is_whitespace)
        .filter(|token| !token.is_empty())
        .count()
}

/// Total words over every block heading and every body entry
///
/// The document's top-level title is not part of the count.
pub fn total_words(blocks: &[PlainTextBlock]) -> usize {
    blocks
        .iter()
        .map(|block| {
            count_words(&block.heading) + block.body.iter().map(|b| count_words(b)).sum::<usize>()
        })
        .sum()
}

/// Minutes needed to read `words` words, rounded up
pub fn minutes_for(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE)
}

/// Estimate the reading time of normalized content, in minutes
pub fn estimate_minutes(blocks: &[PlainTextBlock]) -> usize {
    minutes_for(total_words(blocks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(heading: &str, body: &[&str]) -> PlainTextBlock {
        PlainTextBlock {
            heading: heading.to_string(),
            body: body.iter().map(|b| b.to_string()).collect(),
        }
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_whitespace_runs_are_one_delimiter() {
        assert_eq!(count_words("a  b\tc"), 3);
        assert_eq!(count_words("  leading and trailing  "), 3);
        assert_eq!(count_words("line\nbreak\r\nand\u{00A0}nbsp"), 4);
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words(" \t\n"), 0);
    }

    #[test]
    fn test_minutes_boundaries() {
        assert_eq!(minutes_for(0), 0);
        assert_eq!(minutes_for(1), 1);
        assert_eq!(minutes_for(200), 1);
        assert_eq!(minutes_for(201), 2);
        assert_eq!(minutes_for(400), 2);
    }

    #[test]
    fn test_minutes_monotonic() {
        let mut previous = 0;
        for n in 0..1000 {
            let minutes = minutes_for(n);
            assert!(minutes >= previous);
            previous = minutes;
        }
    }

    #[test]
    fn test_counts_headings_and_bodies() {
        let blocks = vec![
            block("Two words", &["three more words", "and  four   more here"]),
            block("", &[""]),
            block("one", &[]),
        ];
        assert_eq!(total_words(&blocks), 2 + 3 + 4 + 1);
    }

    #[test]
    fn test_estimate() {
        assert_eq!(estimate_minutes(&[]), 0);
        assert_eq!(estimate_minutes(&[block("", &[&words(200)])]), 1);
        assert_eq!(estimate_minutes(&[block("heading", &[&words(200)])]), 2);
        assert_eq!(
            estimate_minutes(&[block(&words(150), &[]), block("", &[&words(250)])]),
            2
        );
    }
}
