use crate::common::Int;
use crate::error::Error;
use crate::roll::TaggedDieResult;
use std::collections::HashMap;

/// The decision an outcome rule reaches over a tagged group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub rule_name: String,
    pub winning_tag: Option<String>,
    pub result_label: String,
}

impl Outcome {
    pub fn winner(rule_name: &str, tag: &str) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            winning_tag: Some(tag.to_string()),
            result_label: format!("{} wins", tag),
        }
    }

    pub fn tie(rule_name: &str, tags: &[&str]) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            winning_tag: None,
            result_label: format!("tie between {}", tags.join(" and ")),
        }
    }

    pub fn none(rule_name: &str) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            winning_tag: None,
            result_label: "no winner".to_string(),
        }
    }
}

/// Decides a winner among tagged results. Rules never see the random
/// source; all rolling has already happened by the time one runs.
pub trait OutcomeRule {
    fn name(&self) -> &str;

    fn decide(&self, results: &[TaggedDieResult]) -> Outcome;
}

fn decide_by_score<F>(name: &str, results: &[TaggedDieResult], score: F) -> Outcome
where
    F: Fn(&TaggedDieResult) -> Int,
{
    let best = match results.iter().map(&score).max() {
        Some(best) => best,
        None => return Outcome::none(name),
    };
    let leaders: Vec<&str> = results
        .iter()
        .filter(|r| score(r) == best)
        .map(|r| r.tag.as_str())
        .collect();
    match leaders.as_slice() {
        [tag] => Outcome::winner(name, tag),
        tags => Outcome::tie(name, tags),
    }
}

/// The strictly highest total wins; equal highest totals are a tie.
pub struct HigherTagWins;

impl OutcomeRule for HigherTagWins {
    fn name(&self) -> &str {
        "higher_tag"
    }

    fn decide(&self, results: &[TaggedDieResult]) -> Outcome {
        decide_by_score(self.name(), results, TaggedDieResult::total)
    }
}

/// Compares totals scaled by a per-tag weight. Tags without a configured
/// weight count at weight 1.
#[derive(Debug)]
pub struct WeightedTags {
    weights: HashMap<String, Int>,
}

impl WeightedTags {
    /// A weight below 1 would invert or erase comparisons, so such
    /// configurations are rejected up front.
    pub fn new(weights: HashMap<String, Int>) -> crate::Result<Self> {
        if let Some(&value) = weights.values().find(|&&w| w < 1) {
            return Err(Error::OutOfRange {
                value,
                min: 1,
                max: Int::MAX,
            });
        }
        Ok(Self { weights })
    }
}

impl OutcomeRule for WeightedTags {
    fn name(&self) -> &str {
        "weighted_tags"
    }

    fn decide(&self, results: &[TaggedDieResult]) -> Outcome {
        decide_by_score(self.name(), results, |r| {
            r.total() * self.weights.get(&r.tag).copied().unwrap_or(1)
        })
    }
}

/// Only totals at or above the threshold qualify; the highest qualifying
/// total wins. With no qualifiers there is no winner.
pub struct ThresholdQualified {
    pub threshold: Int,
}

impl OutcomeRule for ThresholdQualified {
    fn name(&self) -> &str {
        "threshold_qualified"
    }

    fn decide(&self, results: &[TaggedDieResult]) -> Outcome {
        let qualified: Vec<TaggedDieResult> = results
            .iter()
            .filter(|r| r.total() >= self.threshold)
            .cloned()
            .collect();
        if qualified.is_empty() {
            return Outcome::none(self.name());
        }
        decide_by_score(self.name(), &qualified, TaggedDieResult::total)
    }
}

/// An arbitrary caller-supplied decision function.
pub struct CustomRule {
    name: String,
    func: Box<dyn Fn(&[TaggedDieResult]) -> Outcome + Send + Sync>,
}

impl CustomRule {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[TaggedDieResult]) -> Outcome + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            func: Box::new(func),
        }
    }
}

impl OutcomeRule for CustomRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&self, results: &[TaggedDieResult]) -> Outcome {
        (self.func)(results)
    }
}

/// Folds the outcomes of several rules into one verdict.
pub trait OutcomeCombiner {
    fn combine(&self, outcomes: &[Outcome]) -> Outcome;
}

/// The first outcome that names a winner; with none, the first outcome as
/// given, and with no outcomes at all, no winner.
pub struct FirstNonTie;

impl OutcomeCombiner for FirstNonTie {
    fn combine(&self, outcomes: &[Outcome]) -> Outcome {
        outcomes
            .iter()
            .find(|o| o.winning_tag.is_some())
            .or_else(|| outcomes.first())
            .cloned()
            .unwrap_or_else(|| Outcome::none("first_non_tie"))
    }
}

/// The tag named winner by the most rules; a tied plurality is a tie.
pub struct MajorityVote;

impl OutcomeCombiner for MajorityVote {
    fn combine(&self, outcomes: &[Outcome]) -> Outcome {
        let mut votes: HashMap<&str, usize> = HashMap::new();
        for outcome in outcomes {
            if let Some(tag) = &outcome.winning_tag {
                *votes.entry(tag).or_default() += 1;
            }
        }
        let best = match votes.values().copied().max() {
            Some(best) => best,
            None => return Outcome::none("majority_vote"),
        };
        let mut leaders: Vec<&str> = votes
            .iter()
            .filter(|(_, &count)| count == best)
            .map(|(&tag, _)| tag)
            .collect();
        leaders.sort_unstable();
        match leaders.as_slice() {
            [tag] => Outcome::winner("majority_vote", tag),
            tags => Outcome::tie("majority_vote", tags),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roll::DiceResult;

    fn tagged(tag: &str, total: Int) -> TaggedDieResult {
        TaggedDieResult {
            tag: tag.to_string(),
            result: DiceResult::literal(total),
        }
    }

    #[test]
    fn test_higher_tag_wins() {
        let outcome = HigherTagWins.decide(&[tagged("atk", 15), tagged("def", 9)]);
        assert_eq!(outcome.winning_tag.as_deref(), Some("atk"));
        assert_eq!(outcome.result_label, "atk wins");
    }

    #[test]
    fn test_higher_tag_tie() {
        let outcome = HigherTagWins.decide(&[tagged("a", 12), tagged("b", 12), tagged("c", 3)]);
        assert_eq!(outcome.winning_tag, None);
        assert_eq!(outcome.result_label, "tie between a and b");
    }

    #[test]
    fn test_weighted_tags() {
        let weights = HashMap::from([("def".to_string(), 3)]);
        let rule = WeightedTags::new(weights).unwrap();
        // 5 * 3 beats 12 * 1.
        let outcome = rule.decide(&[tagged("atk", 12), tagged("def", 5)]);
        assert_eq!(outcome.winning_tag.as_deref(), Some("def"));
    }

    #[test]
    fn test_weighted_tags_rejects_nonpositive_weights() {
        let weights = HashMap::from([("def".to_string(), 0)]);
        let err = WeightedTags::new(weights).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { value: 0, min: 1, .. }));
    }

    #[test]
    fn test_threshold_qualified() {
        let rule = ThresholdQualified { threshold: 10 };
        let outcome = rule.decide(&[tagged("a", 14), tagged("b", 11), tagged("c", 20)]);
        assert_eq!(outcome.winning_tag.as_deref(), Some("c"));

        let outcome = rule.decide(&[tagged("a", 4), tagged("b", 9)]);
        assert_eq!(outcome.winning_tag, None);
        assert_eq!(outcome.result_label, "no winner");
    }

    #[test]
    fn test_custom_rule() {
        let rule = CustomRule::new("always_first", |results| match results.first() {
            Some(first) => Outcome::winner("always_first", &first.tag),
            None => Outcome::none("always_first"),
        });
        let outcome = rule.decide(&[tagged("x", 1), tagged("y", 100)]);
        assert_eq!(outcome.winning_tag.as_deref(), Some("x"));
    }

    #[test]
    fn test_first_non_tie() {
        let outcomes = [
            Outcome::tie("r1", &["a", "b"]),
            Outcome::winner("r2", "b"),
            Outcome::winner("r3", "a"),
        ];
        let combined = FirstNonTie.combine(&outcomes);
        assert_eq!(combined.winning_tag.as_deref(), Some("b"));

        let all_ties = [Outcome::tie("r1", &["a", "b"])];
        assert_eq!(FirstNonTie.combine(&all_ties).winning_tag, None);
    }

    #[test]
    fn test_majority_vote() {
        let outcomes = [
            Outcome::winner("r1", "a"),
            Outcome::winner("r2", "b"),
            Outcome::winner("r3", "a"),
        ];
        let combined = MajorityVote.combine(&outcomes);
        assert_eq!(combined.winning_tag.as_deref(), Some("a"));

        let split = [Outcome::winner("r1", "a"), Outcome::winner("r2", "b")];
        assert_eq!(MajorityVote.combine(&split).winning_tag, None);
    }
}
