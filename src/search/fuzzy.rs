//! Fuzzy name suggestions
//!
//! Scoring sits behind [`SimilarityRanker`]; call sites only use
//! [`rank_similar`].

use serde::Serialize;

/// 0-100 similarity score between two strings
pub trait SimilarityRanker {
    fn score(&self, a: &str, b: &str) -> u8;
}

/// Normalized Levenshtein similarity scaled to 0-100 and rounded
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenshteinRatio;

impl SimilarityRanker for LevenshteinRatio {
    fn score(&self, a: &str, b: &str) -> u8 {
        (strsim::normalized_levenshtein(a, b) * 100.0).round() as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub name: String,
    pub score: u8,
}

/// Up to `limit` candidates scoring at least `threshold`, best first.
/// Ties keep candidate order.
pub fn rank_similar<'a, I>(target: &str, candidates: I, threshold: u8, limit: usize) -> Vec<Suggestion>
where
    I: IntoIterator<Item = &'a str>,
{
    rank_with(&LevenshteinRatio, target, candidates, threshold, limit)
}

pub fn rank_with<'a, R, I>(
    ranker: &R,
    target: &str,
    candidates: I,
    threshold: u8,
    limit: usize,
) -> Vec<Suggestion>
where
    R: SimilarityRanker + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let mut scored: Vec<Suggestion> = candidates
        .into_iter()
        .map(|name| Suggestion {
            name: name.to_string(),
            score: ranker.score(target, name),
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(limit);
    scored.retain(|s| s.score >= threshold);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_ratio() {
        let r = LevenshteinRatio;
        assert_eq!(r.score("abc", "abc"), 100);
        assert_eq!(r.score("abc", "xyz"), 0);
        assert_eq!(r.score("", ""), 100);
        // 3 edits over 7 chars
        assert_eq!(r.score("kitten", "sitting"), 57);
    }

    #[test]
    fn test_rank_similar_filters_and_orders() {
        let candidates = [
            "pkg.mod.totally_missing",
            "pkg.mod.Cls.method",
            "pkg.mod.totallyMissed",
            "other.thing",
            "pkg.mod.totallyMissing2",
        ];
        let ranked = rank_similar("pkg.mod.totallyMissing", candidates, 70, 5);

        assert!(!ranked.is_empty());
        assert!(ranked.len() <= 5);
        assert!(ranked.iter().all(|s| s.score >= 70));
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(ranked[0].name, "pkg.mod.totallyMissing2");
        assert!(!ranked.iter().any(|s| s.name == "other.thing"));
    }

    #[test]
    fn test_rank_similar_respects_limit() {
        let names: Vec<String> = (0..10).map(|i| format!("helper{}", i)).collect();
        let ranked = rank_similar("helper", names.iter().map(String::as_str), 70, 5);
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].name, "helper0");
    }
}
