//! Fuzzy string scorers on a 0–100 scale
//!
//! `ratio` is the normalized indel similarity, `partial_ratio` the best `ratio` of the
//! shorter string against any equally long window of the longer one, and
//! `token_set_ratio` compares word sets so order and repeated words do not matter.

use std::collections::BTreeSet;

/// Normalized indel similarity: `200 * LCS / (len_a + len_b)`
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    let lcs = lcs_len(a, b);
    200.0 * lcs as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Best `ratio` of the shorter string against windows of the longer one
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let m = short.len();
    let n = long.len();

    let mut best = 0.0f64;
    for start in 0..=(n - m) {
        best = best.max(ratio_chars(short, &long[start..start + m]));
        if best >= 100.0 {
            return 100.0;
        }
    }
    // Windows hanging off either end of the longer string
    for len in 1..m {
        best = best.max(ratio_chars(short, &long[..len]));
        best = best.max(ratio_chars(short, &long[n - len..]));
    }
    best
}

/// Word-set similarity, insensitive to word order and duplicates
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !intersection.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let sect = intersection.join(" ");
    let combined_a = join_nonempty(&sect, &only_a.join(" "));
    let combined_b = join_nonempty(&sect, &only_b.join(" "));

    let mut best = ratio(&combined_a, &combined_b);
    if !sect.is_empty() {
        best = best.max(ratio(&sect, &combined_a));
        best = best.max(ratio(&sect, &combined_b));
    }
    best
}

fn join_nonempty(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

/// Blended text similarity between two normalized strings.
///
/// Short targets weight the partial score dominantly so "ok" still scores well inside
/// "ok button"; a pure partial hit is allowed to win outright.
pub fn text_similarity(target: &str, candidate: &str, short_target: bool) -> f64 {
    let tok = token_set_ratio(target, candidate);
    let part = partial_ratio(target, candidate);
    let rat = ratio(target, candidate);

    let score = if short_target {
        (tok * 0.4 + part * 0.5 + rat * 0.1).max(part)
    } else {
        tok * 0.6 + part * 0.3 + rat * 0.1
    };
    (score * 100.0).round() / 100.0
}
