use crate::config::Thresholds;
use std::cmp::Ordering;
use strsim::{jaro_winkler, normalized_levenshtein};

/// Ranked candidates shown at the resolver prompt are capped at this many.
const MAX_RANKED: usize = 5;

/// Similarity between two normalized strings, in [0, 1]. Kept behind a trait
/// so the metric can be swapped or scripted in tests independently of the
/// matching policy.
pub trait Scorer {
    fn score(&self, query: &str, candidate: &str) -> f64;
}

/// Word-order-insensitive blend of Jaro-Winkler and normalized Levenshtein,
/// so "Smith, Jane" and "Jane Smith" compare well.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenSortScorer;

impl Scorer for TokenSortScorer {
    fn score(&self, query: &str, candidate: &str) -> f64 {
        let a = sort_tokens(query);
        let b = sort_tokens(candidate);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        jaro_winkler(&a, &b) * 0.6 + normalized_levenshtein(&a, &b) * 0.4
    }
}

fn sort_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    AutoMatched,
    Ambiguous,
    Unmatched,
    ManuallyResolved,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedCandidate {
    /// Index into the candidate set handed to `best_match`.
    pub index: usize,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub query: String,
    pub status: MatchStatus,
    pub best: Option<RankedCandidate>,
    /// Descending by score, capped at `MAX_RANKED`; only candidates at or
    /// above the minimum score.
    pub ranked: Vec<RankedCandidate>,
}

impl MatchResult {
    fn unmatched(query: &str) -> MatchResult {
        MatchResult {
            query: query.to_string(),
            status: MatchStatus::Unmatched,
            best: None,
            ranked: Vec::new(),
        }
    }
}

/// Matching policy over a pluggable scorer: classifies the best candidate as
/// auto-matched, ambiguous, or unmatched based on the configured thresholds.
pub struct Matcher<S = TokenSortScorer> {
    thresholds: Thresholds,
    scorer: S,
}

impl Matcher<TokenSortScorer> {
    pub fn new(thresholds: Thresholds) -> Self {
        Matcher::with_scorer(thresholds, TokenSortScorer)
    }
}

impl<S: Scorer> Matcher<S> {
    pub fn with_scorer(thresholds: Thresholds, scorer: S) -> Self {
        Matcher { thresholds, scorer }
    }

    /// `query` and `candidates` must already be normalized.
    pub fn best_match(&self, query: &str, candidates: &[String]) -> MatchResult {
        if query.is_empty() || candidates.is_empty() {
            return MatchResult::unmatched(query);
        }
        // Exact equality short-circuits the fuzzy metric.
        if let Some(index) = candidates.iter().position(|c| c == query) {
            let best = RankedCandidate { index, score: 1.0 };
            return MatchResult {
                query: query.to_string(),
                status: MatchStatus::AutoMatched,
                best: Some(best),
                ranked: vec![best],
            };
        }
        let mut ranked: Vec<RankedCandidate> = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| RankedCandidate {
                index,
                score: self.scorer.score(query, candidate),
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.index.cmp(&b.index))
        });
        let best = ranked[0];
        let t = self.thresholds;
        let tied_runner_up = ranked.len() > 1
            && ranked[1].score >= t.min_score
            && best.score - ranked[1].score < t.ambiguity_margin;
        let status = if best.score < t.min_score {
            MatchStatus::Unmatched
        } else if tied_runner_up {
            MatchStatus::Ambiguous
        } else if best.score >= t.high_confidence {
            MatchStatus::AutoMatched
        } else {
            // Uniquely best but below high confidence: never auto-resolve.
            MatchStatus::Ambiguous
        };
        ranked.truncate(MAX_RANKED);
        // Below-minimum candidates are not worth offering at the prompt; an
        // unmatched query therefore ranks nothing at all.
        ranked.retain(|c| c.score >= t.min_score);
        MatchResult {
            query: query.to_string(),
            status,
            best: Some(best),
            ranked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use std::collections::HashMap;

    /// Pins scores per candidate so policy tests are independent of the metric.
    struct FixedScorer(HashMap<&'static str, f64>);

    impl Scorer for FixedScorer {
        fn score(&self, _query: &str, candidate: &str) -> f64 {
            *self.0.get(candidate).unwrap_or(&0.0)
        }
    }

    fn thresholds() -> Thresholds {
        Thresholds::default()
    }

    fn candidates(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| normalize(n)).collect()
    }

    #[test]
    fn exact_normalized_match_short_circuits_at_score_one() {
        let matcher = Matcher::new(thresholds());
        let result = matcher.best_match("jane smith", &candidates(&["Jane Smith", "John Smith"]));
        assert_eq!(result.status, MatchStatus::AutoMatched);
        let best = result.best.unwrap();
        assert_eq!(best.index, 0);
        assert_eq!(best.score, 1.0);
    }

    #[test]
    fn empty_query_is_unmatched_without_comparison() {
        let matcher = Matcher::new(thresholds());
        let result = matcher.best_match("", &candidates(&["Jane Smith"]));
        assert_eq!(result.status, MatchStatus::Unmatched);
        assert!(result.best.is_none());
    }

    #[test]
    fn empty_candidate_set_is_unmatched() {
        let matcher = Matcher::new(thresholds());
        let result = matcher.best_match("jane smith", &[]);
        assert_eq!(result.status, MatchStatus::Unmatched);
    }

    #[test]
    fn unique_high_score_auto_matches() {
        // The "Univ. of Toront" example: 0.92 >= 0.85 and uniquely best.
        let scorer = FixedScorer(HashMap::from([("university of toronto", 0.92)]));
        let matcher = Matcher::with_scorer(thresholds(), scorer);
        let result = matcher.best_match("univ of toront", &candidates(&["University of Toronto"]));
        assert_eq!(result.status, MatchStatus::AutoMatched);
        assert_eq!(result.best.unwrap().index, 0);
    }

    #[test]
    fn near_tie_above_minimum_is_ambiguous() {
        // 0.93 vs 0.90: margin below 0.05, both above minimum.
        let scorer = FixedScorer(HashMap::from([("alice lee", 0.93), ("alicia lee", 0.90)]));
        let matcher = Matcher::with_scorer(thresholds(), scorer);
        let result = matcher.best_match("alyce lee", &candidates(&["Alice Lee", "Alicia Lee"]));
        assert_eq!(result.status, MatchStatus::Ambiguous);
        assert_eq!(result.ranked.len(), 2);
        assert_eq!(result.best.unwrap().index, 0);
    }

    #[test]
    fn below_minimum_is_never_forced() {
        let scorer = FixedScorer(HashMap::from([("jane smith", 0.4), ("john doe", 0.3)]));
        let matcher = Matcher::with_scorer(thresholds(), scorer);
        let result = matcher.best_match("someone else", &candidates(&["Jane Smith", "John Doe"]));
        assert_eq!(result.status, MatchStatus::Unmatched);
        // Nothing below the minimum is offered as a ranked candidate either.
        assert!(result.ranked.is_empty());
    }

    #[test]
    fn unique_mid_score_requires_confirmation() {
        let scorer = FixedScorer(HashMap::from([("jane smith", 0.75)]));
        let matcher = Matcher::with_scorer(thresholds(), scorer);
        let result = matcher.best_match("jane smth", &candidates(&["Jane Smith"]));
        assert_eq!(result.status, MatchStatus::Ambiguous);
    }

    #[test]
    fn token_sort_scorer_ignores_word_order() {
        let scorer = TokenSortScorer;
        let forward = scorer.score("jane smith", "jane smith");
        let reversed = scorer.score("smith jane", "jane smith");
        assert!(forward > 0.99);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn token_sort_scorer_ranks_typo_above_stranger() {
        let scorer = TokenSortScorer;
        let typo = scorer.score("universty of toronto", "university of toronto");
        let stranger = scorer.score("harvard medical school", "university of toronto");
        assert!(typo > 0.9, "typo score was {}", typo);
        assert!(typo > stranger);
    }

    #[test]
    fn real_metric_matches_distinct_first_names_unambiguously() {
        let matcher = Matcher::new(thresholds());
        let result = matcher.best_match("jane smith", &candidates(&["John Smith", "Jane Smith"]));
        assert_eq!(result.status, MatchStatus::AutoMatched);
        assert_eq!(result.best.unwrap().index, 1);
    }
}
