//! HTML helper functions

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Generate meta generator tag
pub fn meta_generator() -> String {
    format!(
        r#"<meta name="generator" content="spacetraveling {}">"#,
        env!("CARGO_PKG_VERSION")
    )
}

/// Insert `snippet` right before `</body>`, or append it
pub fn inject_before_body_end(html: &str, snippet: &str) -> String {
    match html.rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], snippet, &html[pos..]),
        None => format!("{}{}", html, snippet),
    }
}
