// src/text.rs
//! Text handling for posts: chunking, emptiness checks and the normalization
//! used to recognise our own posts on the page.

/// Splits `text` into consecutive slices of at most `limit` characters.
///
/// Slicing is fixed-width over Unicode scalar values. Word boundaries and
/// grapheme clusters are not respected, so a chunk may end mid-word.
/// An empty input yields no chunks. A `limit` of zero is treated as one.
pub fn split_text(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    log::debug!("Splitting {} characters into chunks of {}", text.chars().count(), limit);

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for c in text.chars() {
        current.push(c);
        count += 1;
        if count == limit {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Format characters that render as nothing (zero-width space, joiners,
/// direction marks, soft hyphen, byte order mark).
fn is_invisible_format(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{034F}'
            | '\u{061C}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
    )
}

/// True when `text` holds only separators, control or invisible format characters.
///
/// A compose box that shows a lone zero-width space or newline is, for the
/// purposes of "did the submission clear the input", empty.
pub fn is_effectively_empty(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_whitespace() || c.is_control() || is_invisible_format(c))
}

/// Pictographic blocks inside the Basic Multilingual Plane that sites render
/// as emoji.
fn is_bmp_pictograph(c: char) -> bool {
    matches!(
        c,
        '\u{2190}'..='\u{21FF}'
            | '\u{2300}'..='\u{23FF}'
            | '\u{2460}'..='\u{24FF}'
            | '\u{25A0}'..='\u{27BF}'
            | '\u{2900}'..='\u{297F}'
            | '\u{2B00}'..='\u{2BFF}'
            | '\u{3030}'
            | '\u{303D}'
            | '\u{3297}'
            | '\u{3299}'
            | '\u{FE00}'..='\u{FE0F}'
    )
}

/// Normalizes text for comparison against what the site renders.
///
/// Drops emoji, control and invisible characters, and anything outside the
/// Basic Multilingual Plane. Then collapses whitespace runs to single spaces
/// and trims.
pub fn normalize_for_match(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|&c| (c as u32) <= 0xFFFF)
        .filter(|&c| !is_bmp_pictograph(c) && !is_invisible_format(c))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The normalized prefix of a chunk that identifies it among visible posts.
pub fn match_prefix(chunk: &str, chars: usize) -> String {
    normalize_for_match(chunk).chars().take(chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn split_reassembles_input() {
        let text = "Rust makes systems programming approachable. ".repeat(9);
        for limit in [1, 7, 140, 1000] {
            let chunks = split_text(&text, limit);
            assert_eq!(chunks.concat(), text);
            assert!(chunks.iter().all(|c| c.chars().count() <= limit));
        }
    }

    #[test]
    fn split_320_by_140() {
        let text = "a".repeat(320);
        let lengths: Vec<usize> = split_text(&text, 140)
            .iter()
            .map(|c| c.chars().count())
            .collect();
        assert_eq!(lengths, vec![140, 140, 40]);
    }

    #[test]
    fn split_counts_characters_not_bytes() {
        let text = "質問".repeat(5);
        let chunks = split_text(&text, 3);
        assert_eq!(chunks, vec!["質問質", "問質問", "質問質", "問"]);
    }

    #[test]
    fn split_edge_cases() {
        assert!(split_text("", 140).is_empty());
        assert_eq!(split_text("abc", 0), vec!["a", "b", "c"]);
        assert_eq!(split_text("abc", 3), vec!["abc"]);
    }

    #[test]
    fn effectively_empty_detection() {
        assert!(is_effectively_empty(""));
        assert!(is_effectively_empty(" \n\t\u{3000}"));
        assert!(is_effectively_empty("\u{200B}\u{FEFF}\u{200D}"));
        assert!(!is_effectively_empty("\u{200B}a"));
        assert!(!is_effectively_empty("。"));
    }

    #[test]
    fn normalization_strips_emoji_and_collapses_space() {
        assert_eq!(
            normalize_for_match("🚀 Launch  day!\n\n✅ done\u{200B}"),
            "Launch day! done"
        );
        assert_eq!(normalize_for_match("転職の質問 👍"), "転職の質問");
    }

    #[test]
    fn prefix_is_taken_after_normalization() {
        assert_eq!(match_prefix("🔥🔥 hello world", 5), "hello");
        assert_eq!(match_prefix("🔥", 5), "");
    }
}
