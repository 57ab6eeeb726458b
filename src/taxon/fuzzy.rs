//! Scoring of search candidates against an incomplete or misspelled name.
use crate::authority::{MatchType, NameMatch, Source};

pub const PREFIX_SCORE: f64 = 0.9;
pub const EPITHET_PREFIX_SCORE: f64 = 0.8;
pub const MIN_ACCEPTED_SCORE: f64 = 0.7;

/// 0.9 when `candidate` starts with `input`, 0.8 when both are multi-word
/// with the same genus and the candidate epithet starts with the input one,
/// 0.0 otherwise. Case-insensitive.
pub fn similarity(input: &str, candidate: &str) -> f64 {
    let input = input.trim().to_lowercase();
    let candidate = candidate.trim().to_lowercase();
    if input.is_empty() {
        return 0.0;
    }

    if candidate.starts_with(&input) {
        return PREFIX_SCORE;
    }

    let input_tokens: Vec<&str> = input.split_whitespace().collect();
    let candidate_tokens: Vec<&str> = candidate.split_whitespace().collect();
    if input_tokens.len() >= 2
        && candidate_tokens.len() >= 2
        && input_tokens[0] == candidate_tokens[0]
        && candidate_tokens[1].starts_with(input_tokens[1])
    {
        return EPITHET_PREFIX_SCORE;
    }

    0.0
}

/// Keeps the best-scoring candidate (first one on ties) if it reaches the
/// acceptance threshold.
pub fn best_candidate<S: AsRef<str>>(
    input: &str,
    candidates: &[S],
    source: Source,
) -> Option<NameMatch> {
    let mut best: Option<(&str, f64)> = None;
    for candidate in candidates {
        let candidate = candidate.as_ref();
        let score = similarity(input, candidate);
        if best.map(|(_, top)| score > top).unwrap_or(true) {
            best = Some((candidate, score));
        }
    }

    let (name, score) = best?;
    if score < MIN_ACCEPTED_SCORE {
        return None;
    }

    Some(NameMatch {
        original_name: input.to_string(),
        matched_name: name.to_string(),
        accepted_name: name.to_string(),
        match_type: MatchType::Partial,
        confidence: score,
        source,
        is_valid: true,
        synonyms: Vec::new(),
    })
}
