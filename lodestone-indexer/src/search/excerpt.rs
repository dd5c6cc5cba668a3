//! Bounded excerpt extraction around a search match.

/// Take a symmetric window of `radius` bytes on each side of `offset`,
/// clipped to the content bounds and trimmed toward line boundaries.
///
/// The result never exceeds `2 * radius` bytes and never reads outside
/// `content`, including matches at the very start or end. Trimming drops
/// the partial first and last lines of the window when doing so would not
/// cut away the match itself.
pub fn excerpt_around(content: &str, offset: usize, radius: usize) -> String {
    if content.is_empty() || radius == 0 {
        return String::new();
    }

    let offset = offset.min(content.len());
    let mut start = offset.saturating_sub(radius);
    let mut end = (offset + radius).min(content.len());
    // Clamp inward to char boundaries so the window only ever shrinks
    while start < end && !content.is_char_boundary(start) {
        start += 1;
    }
    while end > start && !content.is_char_boundary(end) {
        end -= 1;
    }

    let window = &content[start..end];
    let match_at = offset.saturating_sub(start).min(window.len());

    let mut from = 0;
    if start > 0 {
        if let Some(newline) = window.find('\n') {
            if newline + 1 <= match_at {
                from = newline + 1;
            }
        }
    }
    let mut to = window.len();
    if end < content.len() {
        if let Some(newline) = window.rfind('\n') {
            if newline >= match_at {
                to = newline;
            }
        }
    }
    if from >= to {
        return window.trim().to_string();
    }
    window[from..to].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_symmetric_and_bounded() {
        let content = "x".repeat(1000);
        let excerpt = excerpt_around(&content, 500, 100);
        assert!(excerpt.len() <= 200);
        assert!(!excerpt.is_empty());
    }

    #[test]
    fn match_at_content_start() {
        let content = "needle in the very first bytes of the file";
        let excerpt = excerpt_around(content, 0, 200);
        assert!(excerpt.starts_with("needle"));
        assert!(excerpt.len() <= 400);
    }

    #[test]
    fn match_at_content_end() {
        let content = "the match sits at the very end: needle";
        let offset = content.len() - "needle".len();
        let excerpt = excerpt_around(content, offset, 200);
        assert!(excerpt.ends_with("needle"));
    }

    #[test]
    fn partial_edge_lines_are_trimmed() {
        let content = "first line tail\nsecond line with needle here\nthird line head";
        let offset = content.find("needle").unwrap();
        // A tight radius cuts into the first and third lines; both partial
        // lines get trimmed away, leaving the matched line.
        let excerpt = excerpt_around(content, offset, 30);
        assert!(excerpt.contains("needle"));
        assert!(!excerpt.contains("first line"));
        assert!(!excerpt.contains("line head"));
    }

    #[test]
    fn multibyte_content_never_panics() {
        let content = "héllo wörld ünïcode cöntent".repeat(10);
        for offset in 0..content.len() {
            let excerpt = excerpt_around(&content, offset, 15);
            assert!(excerpt.len() <= 30);
        }
    }

    #[test]
    fn offset_past_end_is_clamped() {
        let content = "short";
        let excerpt = excerpt_around(content, 9999, 10);
        assert_eq!(excerpt, "short");
    }
}
