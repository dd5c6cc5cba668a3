//! Repository description extraction from README content.

/// Pull the first qualifying paragraph out of README markdown.
///
/// Headings, badges, raw HTML, rules, and fenced code blocks are skipped;
/// the first run of ordinary text lines is joined and truncated to
/// `max_len` characters. Returns `None` when nothing qualifies; absence is
/// represented as absence, not as an empty string.
pub fn extract_description(markdown: &str, max_len: usize) -> Option<String> {
    let mut in_fence = false;
    let mut paragraph: Vec<&str> = Vec::new();

    for line in markdown.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        if trimmed.is_empty() {
            if !paragraph.is_empty() {
                break;
            }
            continue;
        }
        if is_noise(trimmed) {
            if !paragraph.is_empty() {
                break;
            }
            continue;
        }
        paragraph.push(trimmed);
    }

    if paragraph.is_empty() {
        return None;
    }
    let text = paragraph.join(" ").trim().to_string();
    if text.is_empty() {
        return None;
    }
    Some(truncate_chars(&text, max_len))
}

/// Lines that are markdown furniture rather than prose.
fn is_noise(line: &str) -> bool {
    line.starts_with('#')
        || line.starts_with('>')
        || line.starts_with("![")
        || line.starts_with("[!")
        || line.starts_with('<')
        || line.chars().all(|c| c == '-' || c == '=' || c == '*')
}

fn truncate_chars(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    text.chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_paragraph_after_heading_and_badges() {
        let readme = "# Widgets\n\n[![CI](https://ci.example/badge.svg)](https://ci.example)\n\nA toolkit for building widgets.\nFast and small.\n\nSecond paragraph.";
        assert_eq!(
            extract_description(readme, 200).as_deref(),
            Some("A toolkit for building widgets. Fast and small.")
        );
    }

    #[test]
    fn fenced_code_is_skipped() {
        let readme = "# Tool\n\n```sh\ncargo install tool\n```\n\nDoes the thing.";
        assert_eq!(
            extract_description(readme, 200).as_deref(),
            Some("Does the thing.")
        );
    }

    #[test]
    fn truncates_to_limit_on_char_boundary() {
        let readme = "aaaa ".repeat(100);
        let description = extract_description(&readme, 200).expect("description");
        assert_eq!(description.chars().count(), 200);
    }

    #[test]
    fn all_noise_yields_none() {
        let readme = "# Title\n\n[![badge](x)](y)\n\n<p align=\"center\">hi</p>\n";
        assert_eq!(extract_description(readme, 200), None);
    }

    #[test]
    fn empty_input_yields_none_not_empty_string() {
        assert_eq!(extract_description("", 200), None);
        assert_eq!(extract_description("   \n\n", 200), None);
    }
}
