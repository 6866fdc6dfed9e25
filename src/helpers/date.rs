//! Date helper functions

use chrono::{DateTime, Locale, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt::Write;

/// Format a date using a date-fns style pattern
///
/// The date is shifted into `timezone` (an IANA name; empty or unknown
/// means UTC) and month/day names follow `language`.
///
/// # Examples
/// ```ignore
/// format_date(&date, "d MMM yyyy", "America/Sao_Paulo", "pt-BR") // -> "19 mar 2021"
/// ```
pub fn format_date(date: &DateTime<Utc>, pattern: &str, timezone: &str, language: &str) -> String {
    let format = date_fns_to_chrono(pattern);
    let locale = locale_for(language);

    match parse_timezone(timezone) {
        Some(tz) => render(&date.with_timezone(&tz), &format, locale),
        None => render(date, &format, locale),
    }
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}

fn render<Tz2: TimeZone>(date: &DateTime<Tz2>, format: &str, locale: Locale) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    let mut out = String::new();
    if write!(out, "{}", date.format_localized(format, locale)).is_err() {
        tracing::warn!("Invalid date format {:?}", format);
        return date.to_rfc3339();
    }
    out
}

/// Resolve an IANA timezone name
pub fn parse_timezone(name: &str) -> Option<Tz> {
    if name.is_empty() {
        return None;
    }
    match name.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(_) => {
            tracing::warn!("Unknown timezone {:?}, using UTC", name);
            None
        }
    }
}

/// Map a site language such as `pt-BR` to a chrono locale
pub fn locale_for(language: &str) -> Locale {
    Locale::try_from(language.replace('-', "_").as_str()).unwrap_or(Locale::POSIX)
}

/// Convert a date-fns pattern to a chrono format string
///
/// Text inside single quotes is literal and `''` is a quote.
fn date_fns_to_chrono(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut result = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                result.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        result.push('\'');
                        i += 2;
                        continue;
                    }
                    break;
                }
                push_literal(&mut result, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut result, c);
            i += 1;
            continue;
        }

        let mut run = 1;
        while chars.get(i + run) == Some(&c) {
            run += 1;
        }
        i += run;

        let token = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('a', _) => "%p",
            _ => {
                for _ in 0..run {
                    push_literal(&mut result, c);
                }
                continue;
            }
        };
        result.push_str(token);
    }

    result
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}
