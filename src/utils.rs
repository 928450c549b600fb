use unicode_width::UnicodeWidthChar;

use url::Url;

/// Safely truncate a string to a display width, appending an ellipsis.
///
/// Never splits a multi-byte character, and counts wide characters
/// (CJK, emoji) by their terminal width.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthStr;

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(1);

        if current_width + char_width + 3 > max_width {
            break;
        }

        result.push(c);
        current_width += char_width;
    }

    result.push_str("...");
    result
}

/// Resolve a possibly relative or protocol-relative reference against the page it came from.
/// Unresolvable input is returned unchanged.
pub fn resolve_against(page_url: &str, reference: &str) -> String {
    if Url::parse(reference).is_ok() {
        return reference.to_string();
    }

    Url::parse(page_url)
        .and_then(|base| base.join(reference))
        .map(String::from)
        .unwrap_or_else(|_| reference.to_string())
}
