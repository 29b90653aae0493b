//! Text helpers: query escaping, normalisation and tokenizing

/// Characters with operator meaning in the backend's query syntax
pub const SPECIAL_CHARS: &[char] = &[
    '+', '-', '=', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':',
    '\\', '/',
];

/// Backslash-escape every special character so the term is taken literally
/// by pattern-based clauses.
pub fn escape_query_term(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() * 2);
    for c in term.chars() {
        if SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Whether the term contains any query-syntax character
pub fn has_special_chars(term: &str) -> bool {
    term.contains(SPECIAL_CHARS)
}

/// Lowercase and keep only alphanumerics, so `ORD-1009` and `ord1009` compare equal.
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split on anything that is not alphanumeric and lowercase the pieces.
pub fn tokenize(value: &str) -> Vec<String> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Edit distance allowed by `AUTO` fuzziness for a token of the given length.
pub fn auto_fuzziness(len: usize) -> usize {
    match len {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Match `value` against a wildcard pattern where `*` is any run, `?` is any
/// single char and `\x` is a literal `x`.
pub fn wildcard_matches(pattern: &str, value: &str, case_insensitive: bool) -> bool {
    let fold = |c: char| {
        if case_insensitive {
            c.to_lowercase().next().unwrap_or(c)
        } else {
            c
        }
    };

    let tokens = parse_pattern(pattern, &fold);
    let value: Vec<char> = value.chars().map(fold).collect();

    // dp[j]: pattern prefix matches value prefix of length j
    let mut dp = vec![false; value.len() + 1];
    dp[0] = true;

    for token in &tokens {
        let mut next = vec![false; value.len() + 1];
        match token {
            PatternToken::AnyRun => {
                let mut reachable = false;
                for j in 0..=value.len() {
                    reachable |= dp[j];
                    next[j] = reachable;
                }
            }
            PatternToken::AnyOne => {
                for j in 0..value.len() {
                    next[j + 1] = dp[j];
                }
            }
            PatternToken::Literal(c) => {
                for j in 0..value.len() {
                    next[j + 1] = dp[j] && value[j] == *c;
                }
            }
        }
        dp = next;
    }

    dp[value.len()]
}

enum PatternToken {
    AnyRun,
    AnyOne,
    Literal(char),
}

fn parse_pattern(pattern: &str, fold: impl Fn(char) -> char) -> Vec<PatternToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => tokens.push(PatternToken::Literal(fold(escaped))),
                None => tokens.push(PatternToken::Literal('\\')),
            },
            '*' => tokens.push(PatternToken::AnyRun),
            '?' => tokens.push(PatternToken::AnyOne),
            other => tokens.push(PatternToken::Literal(fold(other))),
        }
    }
    tokens
}

/// Split a sensitivity level list as upstream callers send it (`1,6,8`,
/// `1|6`, `1^8`). Entries are trimmed, blanks dropped.
pub fn split_levels(raw: &str) -> Vec<String> {
    raw.split([',', '|', '^'])
        .map(str::trim)
        .filter(|level| !level.is_empty())
        .map(String::from)
        .collect()
}
