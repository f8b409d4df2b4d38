//! Turn classification.
//!
//! Decides whether an utterance opens a new topic, continues the current
//! one, or corrects the previous answer. The decision is an ordered rule
//! table built from [`MarkerConfig`]; the first matching rule wins, so the
//! order below is part of the behaviour.

use serde::{Deserialize, Serialize};

use deckrag_core::config::MarkerConfig;

/// How an utterance relates to the conversation so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    NewTopic,
    Continuation,
    Feedback,
}

impl TurnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnKind::NewTopic => "new_topic",
            TurnKind::Continuation => "continuation",
            TurnKind::Feedback => "feedback",
        }
    }
}

/// Condition half of a classification rule.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Predicate {
    NoPriorAnswer,
    StartsWithAny(Vec<String>),
    ContainsAny(Vec<String>),
    /// Ends with `?` and has more than this many tokens.
    QuestionLongerThan(usize),
    MoreTokensThan(usize),
    Always,
}

/// Input of one classification, computed once.
struct Utterance<'a> {
    raw: &'a str,
    lowered: String,
    tokens: usize,
}

impl Predicate {
    fn matches(&self, u: &Utterance<'_>, has_prior_answer: bool) -> bool {
        match self {
            Predicate::NoPriorAnswer => !has_prior_answer,
            Predicate::StartsWithAny(markers) => {
                markers.iter().any(|m| u.lowered.starts_with(m.as_str()))
            }
            Predicate::ContainsAny(markers) => {
                markers.iter().any(|m| u.lowered.contains(m.as_str()))
            }
            Predicate::QuestionLongerThan(n) => u.raw.ends_with('?') && u.tokens > *n,
            Predicate::MoreTokensThan(n) => u.tokens > *n,
            Predicate::Always => true,
        }
    }
}

/// Pure, rule-driven utterance classifier.
#[derive(Clone, Debug)]
pub struct TurnClassifier {
    rules: Vec<(Predicate, TurnKind)>,
}

impl TurnClassifier {
    /// Build the rule table from marker lists.
    ///
    /// Markers are lowercased here so configuration may use any case.
    pub fn new(markers: &MarkerConfig) -> Self {
        let lower = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|m| m.to_lowercase())
                .filter(|m| !m.is_empty())
                .collect()
        };

        let rules = vec![
            (Predicate::NoPriorAnswer, TurnKind::NewTopic),
            (
                Predicate::StartsWithAny(lower(&markers.feedback)),
                TurnKind::Feedback,
            ),
            (
                Predicate::ContainsAny(lower(&markers.new_topic)),
                TurnKind::NewTopic,
            ),
            (
                Predicate::ContainsAny(lower(&markers.continuation)),
                TurnKind::Continuation,
            ),
            (Predicate::QuestionLongerThan(3), TurnKind::Continuation),
            // Short keyword-free input reads as a correction, longer as elaboration.
            (Predicate::MoreTokensThan(5), TurnKind::Continuation),
            (Predicate::Always, TurnKind::Feedback),
        ];

        Self { rules }
    }

    /// Classify `utterance` given whether the session already has an answer.
    ///
    /// Never fails; the last rule always matches. Blank input must be
    /// filtered out by the caller.
    pub fn classify(&self, utterance: &str, has_prior_answer: bool) -> TurnKind {
        let raw = utterance.trim();
        let u = Utterance {
            raw,
            lowered: raw.to_lowercase(),
            tokens: raw.split_whitespace().count(),
        };

        self.rules
            .iter()
            .find(|(predicate, _)| predicate.matches(&u, has_prior_answer))
            .map(|(_, kind)| *kind)
            .unwrap_or(TurnKind::Feedback)
    }
}

impl Default for TurnClassifier {
    fn default() -> Self {
        Self::new(&MarkerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> TurnClassifier {
        TurnClassifier::default()
    }

    // ---- No prior answer ----

    #[test]
    fn test_no_prior_answer_is_always_new_topic() {
        let c = classifier();
        for u in [
            "What is zero-trust architecture?",
            "non",
            "comment faire ?",
            "ok",
            "maintenant parlons de cloud",
            "x",
        ] {
            assert_eq!(c.classify(u, false), TurnKind::NewTopic, "utterance: {}", u);
        }
    }

    // ---- Feedback prefix has top priority ----

    #[test]
    fn test_feedback_prefix_wins_over_other_markers() {
        let c = classifier();
        assert_eq!(
            c.classify("non, maintenant parlons de cloud", true),
            TurnKind::Feedback
        );
        assert_eq!(
            c.classify("faux, comment tu expliques ça concrètement ?", true),
            TurnKind::Feedback
        );
        assert_eq!(
            c.classify("Plutôt sur la partie réseau et donc le pare-feu en détail", true),
            TurnKind::Feedback
        );
    }

    #[test]
    fn test_feedback_prefix_is_case_insensitive() {
        let c = classifier();
        assert_eq!(c.classify("NON c'est faux", true), TurnKind::Feedback);
        assert_eq!(c.classify("Incorrect", true), TurnKind::Feedback);
    }

    #[test]
    fn test_feedback_marker_must_be_prefix() {
        // "faux" appears but not at the start; five tokens, no other markers.
        let c = classifier();
        assert_eq!(
            c.classify("ce point semble faux ici", true),
            TurnKind::Feedback // via the short-input fallback, not the prefix rule
        );
        assert_eq!(
            c.classify("je crois que ce point semble faux ici", true),
            TurnKind::Continuation
        );
    }

    #[test]
    fn test_feedback_prefix_matches_raw_prefix() {
        // Prefix matching is character-based: "nonobstant" starts with "non".
        let c = classifier();
        assert_eq!(
            c.classify("nonobstant cela, quelle est la suite logique du plan", true),
            TurnKind::Feedback
        );
    }

    // ---- New topic markers ----

    #[test]
    fn test_new_topic_marker_beats_continuation_marker() {
        let c = classifier();
        assert_eq!(
            c.classify("Maintenant, comment sécuriser un cluster Kubernetes ?", true),
            TurnKind::NewTopic
        );
        assert_eq!(c.classify("parlons de RAG", true), TurnKind::NewTopic);
        assert_eq!(c.classify("autre question", true), TurnKind::NewTopic);
    }

    // ---- Continuation markers ----

    #[test]
    fn test_continuation_markers() {
        let c = classifier();
        assert_eq!(
            c.classify("comment l'implémenter concrètement?", true),
            TurnKind::Continuation
        );
        assert_eq!(c.classify("pourquoi", true), TurnKind::Continuation);
        assert_eq!(c.classify("un exemple", true), TurnKind::Continuation);
        assert_eq!(c.classify("Du coup ?", true), TurnKind::Continuation);
    }

    #[test]
    fn test_continuation_marker_is_substring_match() {
        // "commentaire" contains "comment".
        let c = classifier();
        assert_eq!(c.classify("un commentaire", true), TurnKind::Continuation);
    }

    // ---- Question heuristic ----

    #[test]
    fn test_question_with_more_than_three_tokens() {
        let c = classifier();
        assert_eq!(
            c.classify("quel est le coût réel ?", true),
            TurnKind::Continuation
        );
        assert_eq!(
            c.classify("What about the costs?", true),
            TurnKind::Continuation
        );
    }

    #[test]
    fn test_short_question_falls_through() {
        // Three tokens ending with '?' is not enough for the question rule.
        let c = classifier();
        assert_eq!(c.classify("le coût réel?", true), TurnKind::Feedback);
    }

    #[test]
    fn test_question_mark_must_be_last() {
        let c = classifier();
        assert_eq!(c.classify("le ? coût est réel", true), TurnKind::Feedback);
    }

    // ---- Length fallback ----

    #[test]
    fn test_fallback_thresholds() {
        let c = classifier();
        // 5 tokens, no markers, no question mark.
        assert_eq!(c.classify("focus sur la partie IAM", true), TurnKind::Feedback);
        // 6 tokens.
        assert_eq!(
            c.classify("focus sur la partie IAM stp", true),
            TurnKind::Continuation
        );
        assert_eq!(c.classify("plus court", true), TurnKind::Feedback);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let c = classifier();
        assert_eq!(c.classify("   non merci   ", true), TurnKind::Feedback);
        assert_eq!(
            c.classify("quel est le coût réel ?   ", true),
            TurnKind::Continuation
        );
    }

    // ---- Configurable markers ----

    #[test]
    fn test_custom_markers_replace_defaults() {
        let markers = MarkerConfig {
            new_topic: vec!["Switching to".to_string()],
            continuation: vec!["tell me more".to_string()],
            feedback: vec!["wrong".to_string()],
        };
        let c = TurnClassifier::new(&markers);
        assert_eq!(c.classify("wrong, try again", true), TurnKind::Feedback);
        assert_eq!(c.classify("switching to networking", true), TurnKind::NewTopic);
        assert_eq!(c.classify("tell me more", true), TurnKind::Continuation);
        // French defaults are gone.
        assert_eq!(c.classify("non", true), TurnKind::Feedback); // short fallback
        assert_eq!(
            c.classify("maintenant on change totalement de domaine", true),
            TurnKind::Continuation // long fallback, "maintenant" no longer a marker
        );
    }

    #[test]
    fn test_empty_marker_entries_are_ignored() {
        let markers = MarkerConfig {
            new_topic: vec![String::new()],
            continuation: vec![],
            feedback: vec![String::new()],
        };
        let c = TurnClassifier::new(&markers);
        // An empty prefix would otherwise match everything.
        assert_eq!(
            c.classify("une phrase assez longue sans marqueur ici", true),
            TurnKind::Continuation
        );
    }

    #[test]
    fn test_turn_kind_str() {
        assert_eq!(TurnKind::NewTopic.as_str(), "new_topic");
        assert_eq!(TurnKind::Continuation.as_str(), "continuation");
        assert_eq!(TurnKind::Feedback.as_str(), "feedback");
    }
}
