use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalize text for literal-token matching: decompose, strip combining
/// marks, recompose, lowercase, drop quote variants, turn dashes and
/// underscores into spaces, and collapse whitespace.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .nfc()
        .collect();

    let mut cleaned = String::with_capacity(stripped.len());
    for c in stripped.to_lowercase().chars() {
        match c {
            // straight and curly quotes, Hebrew gershayim/geresh
            '"' | '\'' | '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}' | '\u{05F4}'
            | '\u{05F3}' => {}
            // dashes and underscores separate words
            '-' | '_' | '\u{2013}' | '\u{2014}' => cleaned.push(' '),
            _ => cleaned.push(c),
        }
    }

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn tokens(query: &str) -> Vec<String> {
    normalize(query)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// AND across tokens; per token OR across the two normalized fields.
pub fn matches_all_tokens(tokens: &[String], text: &str, author: &str) -> bool {
    let text = normalize(text);
    let author = normalize(author);
    tokens
        .iter()
        .all(|token| text.contains(token.as_str()) || author.contains(token.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_match_requires_every_token() {
        let hello_world = |query: &str| {
            matches_all_tokens(&tokens(query), "Hello World", "someone")
        };
        assert!(hello_world("hello world"));
        assert!(hello_world("world hello"));
        assert!(!hello_world("hello xyz"));
    }

    #[test]
    fn tokens_may_match_across_text_and_author() {
        let t = tokens("report dana");
        assert!(matches_all_tokens(&t, "quarterly report", "Dana"));
        assert!(!matches_all_tokens(&t, "quarterly report", "Eve"));
    }

    #[test]
    fn diacritics_are_stripped() {
        assert_eq!(normalize("Café Crème"), "cafe creme");
        assert!(matches_all_tokens(&tokens("cafe"), "Un café noir", ""));
    }

    #[test]
    fn quotes_vanish_and_dashes_split() {
        assert_eq!(normalize("\u{201C}well-known\u{201D} fact"), "well known fact");
        assert_eq!(normalize("snake_case_name"), "snake case name");
        assert_eq!(normalize("it\u{2019}s"), "its");
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(normalize("  a \t b \n  c  "), "a b c");
        assert!(tokens("   ").is_empty());
    }
}
