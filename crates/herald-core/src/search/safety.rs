/// Known catastrophic-backtracking shapes, rejected as substrings of the
/// pattern (whitespace- and case-insensitively) before compilation is even
/// attempted.
const DANGEROUS_PATTERNS: &[&str] = &[
    r"(\w+)+",
    r"(\d+)+",
    r"(.*)+",
    r"(.+)+",
    r"(\w*)*",
    r"(\d*)*",
    r"(.*)*",
    r"(.+)*",
    r"(\w+)*",
    r"(a+)+",
    r"(a*)*",
];

const MAX_PATTERN_LEN: usize = 500;
const MAX_QUANTIFIERS: usize = 5;
const MAX_ESCAPES: usize = 20;

/// Up-front validation of an advanced-mode pattern. A rejection here aborts
/// the whole search with the returned explanation.
pub fn validate_pattern(pattern: &str) -> Result<(), String> {
    if pattern.len() > MAX_PATTERN_LEN {
        return Err(format!(
            "pattern too long (max {MAX_PATTERN_LEN} characters)"
        ));
    }

    let squashed: String = pattern
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    for dangerous in DANGEROUS_PATTERNS {
        if squashed.contains(*dangerous) {
            return Err("pattern contains nested quantifiers that can backtrack catastrophically"
                .to_string());
        }
    }

    if pattern.matches('+').count() > MAX_QUANTIFIERS
        || pattern.matches('*').count() > MAX_QUANTIFIERS
    {
        return Err("too many quantifiers in pattern".to_string());
    }

    if pattern.matches('\\').count() > MAX_ESCAPES {
        return Err("too many escape characters in pattern".to_string());
    }

    Ok(())
}
