//! Plain-text helpers shared by the renderers.

const TAB_WIDTH: usize = 4;

/// File-name component for a target: scheme dropped, `/` and `:` replaced by `_`.
pub fn sanitize_target(target: &str) -> String {
    target
        .trim()
        .replace("https://", "")
        .replace("http://", "")
        .replace(['/', ':'], "_")
}

/// Make tool output safe to lay out: line endings normalised, tabs expanded,
/// other control characters dropped.
pub fn escape_for_embedding(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.replace("\r\n", "\n").split('\n') {
        let mut column = 0;
        for ch in line.chars() {
            match ch {
                '\t' => {
                    let pad = TAB_WIDTH - column % TAB_WIDTH;
                    out.extend(std::iter::repeat(' ').take(pad));
                    column += pad;
                }
                c if c.is_control() => {}
                c => {
                    out.push(c);
                    column += 1;
                }
            }
        }
        out.push('\n');
    }
    out.pop();
    out
}

/// Break preformatted text so that no run of non-whitespace characters is
/// longer than `max_run`. Existing line breaks and spacing are kept; lines
/// with shorter words are left for the layout engine to wrap.
pub fn split_long_runs(text: &str, max_run: usize) -> Vec<String> {
    let max_run = max_run.max(1);
    let mut lines = Vec::new();
    for line in text.lines() {
        let mut current = String::new();
        let mut run = 0;
        for ch in line.trim_end().chars() {
            if ch.is_whitespace() {
                run = 0;
            } else {
                if run == max_run {
                    lines.push(std::mem::take(&mut current));
                    run = 0;
                }
                run += 1;
            }
            current.push(ch);
        }
        lines.push(current);
    }
    lines
}

/// Word-wrap prose into lines of at most `width` characters. Blank lines
/// separate paragraphs; words longer than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut pending_gap = false;

    for raw_line in text.lines() {
        if raw_line.trim().is_empty() {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            pending_gap = !lines.is_empty();
            continue;
        }
        if pending_gap {
            lines.push(String::new());
            pending_gap = false;
        }
        for word in raw_line.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            if word.is_empty() {
                continue;
            }
            let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
            if needed > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word.iter());
            current_len += word.len();
        }
    }
    if current_len > 0 {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_url_targets() {
        assert_eq!(
            sanitize_target("http://example.com:8080/path"),
            "example.com_8080_path"
        );
        assert_eq!(sanitize_target("https://example.com/"), "example.com_");
        assert_eq!(sanitize_target("10.0.0.1"), "10.0.0.1");
    }

    #[test]
    fn escape_expands_tabs_and_drops_controls() {
        let escaped = escape_for_embedding("PORT\tSTATE\r\n22/tcp\topen\x1b[0m\x07");
        assert_eq!(escaped, "PORT    STATE\n22/tcp  open[0m");
    }

    #[test]
    fn escape_keeps_markup_characters_verbatim() {
        assert_eq!(escape_for_embedding("<script>&</script>"), "<script>&</script>");
    }

    #[test]
    fn splits_runs_longer_than_limit() {
        let lines = split_long_runs("abcdefgh\n\nxy", 3);
        assert_eq!(lines, vec!["abc", "def", "gh", "", "xy"]);
    }

    #[test]
    fn short_words_stay_on_one_line() {
        let lines = split_long_runs("PORT    STATE SERVICE\nab cdefghij", 7);
        assert_eq!(lines, vec!["PORT    STATE SERVICE", "ab cdefghi", "j"]);
    }

    #[test]
    fn long_token_keeps_every_character() {
        let raw = format!("{} TRAILING words after token", "0".repeat(100));
        let lines = split_long_runs(&raw, 55);
        assert!(lines.len() >= 2);
        assert_eq!(lines.concat(), raw);
        for line in &lines {
            let longest = line.split_whitespace().map(|w| w.chars().count()).max().unwrap_or(0);
            assert!(longest <= 55, "run too long in {line:?}");
        }
    }

    #[test]
    fn wraps_words_within_width() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
        assert!(lines.iter().all(|line| line.chars().count() <= 10));
    }

    #[test]
    fn keeps_paragraph_breaks() {
        let lines = wrap_text("first para\n\n\nsecond", 40);
        assert_eq!(lines, vec!["first para", "", "second"]);
    }

    #[test]
    fn splits_words_longer_than_width() {
        let lines = wrap_text("go abcdefghij", 4);
        assert_eq!(lines, vec!["go", "abcd", "efgh", "ij"]);
    }

    #[test]
    fn empty_input_has_no_lines() {
        assert!(wrap_text("  \n ", 10).is_empty());
    }
}
