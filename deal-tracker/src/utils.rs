/// Lowercase and collapse whitespace so that names compare regardless of spacing.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whole-word keyword test against already lowercased text.
///
/// A hit must not be glued to letters or digits on either side, so `uk`
/// does not fire inside `ukraine` and `it services` does not fire inside
/// `credit services`.
pub fn contains_word(haystack: &str, keyword: &str) -> bool {
    if keyword.is_empty() {
        return false;
    }

    let mut search_from = 0;
    while let Some(offset) = haystack[search_from..].find(keyword) {
        let start = search_from + offset;
        let end = start + keyword.len();

        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());

        if before_ok && after_ok {
            return true;
        }

        // Step past the first char of this hit, staying on a char boundary
        search_from = start + haystack[start..].chars().next().map_or(1, |c| c.len_utf8());
    }

    false
}

/// Text processing utilities
pub mod text {
    /// Truncate text to a maximum number of characters, trying to break at a word boundary
    pub fn smart_truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }

        let truncated: String = text.chars().take(max_chars).collect();
        if let Some(last_space) = truncated.rfind(' ') {
            format!("{}...", truncated[..last_space].trim_end())
        } else {
            format!("{}...", truncated)
        }
    }

    /// Extract clean text content from HTML
    pub fn extract_text_from_html(html: &str) -> String {
        html.chars()
            .fold((String::new(), false), |(mut text, in_tag), c| match c {
                '<' => {
                    text.push(' ');
                    (text, true)
                }
                '>' => (text, false),
                _ if !in_tag => {
                    text.push(c);
                    (text, in_tag)
                }
                _ => (text, in_tag),
            })
            .0
            .replace("&amp;", "&")
            .replace("&nbsp;", " ")
            .replace("&#39;", "'")
            .replace("&quot;", "\"")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// URL utilities
pub mod url {
    use url::Url;

    /// Extract domain from URL
    pub fn extract_domain(url_str: &str) -> Option<String> {
        if let Ok(url) = Url::parse(url_str) {
            url.domain().map(|d| d.trim_start_matches("www.").to_string())
        } else {
            None
        }
    }

    pub fn is_http_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            url.scheme() == "http" || url.scheme() == "https"
        } else {
            false
        }
    }
}

/// Calendar helpers for the monthly series
pub mod time {
    use chrono::{DateTime, Datelike, NaiveDate, Utc};

    pub fn month_key(date: NaiveDate) -> String {
        format!("{:04}-{:02}", date.year(), date.month())
    }

    /// Every month key from `start` to `end` inclusive.
    pub fn months_between(start: NaiveDate, end: NaiveDate) -> Vec<String> {
        let mut months = Vec::new();
        let (mut year, mut month) = (start.year(), start.month());
        let (end_year, end_month) = (end.year(), end.month());

        while (year, month) <= (end_year, end_month) {
            months.push(format!("{:04}-{:02}", year, month));
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }

        months
    }

    pub fn cache_stamp(at: DateTime<Utc>) -> String {
        at.format("%Y%m%d_%H%M%S").to_string()
    }
}
