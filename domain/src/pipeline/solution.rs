//! Candidate solutions and the archetypes used to pick agent templates.

use crate::core::ids::{ProblemId, SolutionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }

    /// Lenient parse for model output; unknown labels map to `Medium`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" | "simple" | "easy" => Complexity::Low,
            "high" | "complex" | "hard" => Complexity::High,
            _ => Complexity::Medium,
        }
    }

    /// Ranking bonus: simpler solutions are preferred.
    pub fn bonus(&self) -> i32 {
        match self {
            Complexity::Low => 3,
            Complexity::Medium => 2,
            Complexity::High => 1,
        }
    }
}

/// Closed-but-extensible category of a solution.
///
/// The three named archetypes have built-in agent templates; anything else is
/// carried as [`SolutionArchetype::Other`] and resolved by the template
/// registry (falling back to the generic template).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SolutionArchetype {
    Classification,
    Prioritization,
    Reminder,
    Other(String),
}

const PRIORITIZATION_HINTS: &[&str] = &["priorit", "rank", "score", "triage", "urgen", "importan"];
const CLASSIFICATION_HINTS: &[&str] = &["classif", "categor", "label", "tag", "folder", "filter"];
const REMINDER_HINTS: &[&str] = &["remind", "notif", "digest", "alert", "follow-up", "follow up"];

impl SolutionArchetype {
    pub fn as_str(&self) -> &str {
        match self {
            SolutionArchetype::Classification => "classification",
            SolutionArchetype::Prioritization => "prioritization",
            SolutionArchetype::Reminder => "reminder",
            SolutionArchetype::Other(name) => name,
        }
    }

    fn from_hints(text: &str) -> Option<Self> {
        let text = text.to_lowercase();
        let hit = |hints: &[&str]| hints.iter().any(|h| text.contains(h));
        if hit(PRIORITIZATION_HINTS) {
            Some(SolutionArchetype::Prioritization)
        } else if hit(CLASSIFICATION_HINTS) {
            Some(SolutionArchetype::Classification)
        } else if hit(REMINDER_HINTS) {
            Some(SolutionArchetype::Reminder)
        } else {
            None
        }
    }

    /// Infers the archetype of `solution`.
    ///
    /// An explicit category wins when it names a known archetype (or any
    /// non-empty custom one). Otherwise keywords are matched against the name,
    /// then the description, then the required tools.
    pub fn infer(solution: &Solution) -> Self {
        if let Some(category) = solution.category.as_deref()
            && !category.trim().is_empty()
        {
            return SolutionArchetype::from(category.to_string());
        }
        Self::from_hints(&solution.name)
            .or_else(|| Self::from_hints(&solution.description))
            .or_else(|| Self::from_hints(&solution.required_tools.join(" ")))
            .unwrap_or_else(|| SolutionArchetype::Other("generic".to_string()))
    }
}

impl From<String> for SolutionArchetype {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "classification" | "classify" => SolutionArchetype::Classification,
            "prioritization" | "prioritisation" | "priority" => SolutionArchetype::Prioritization,
            "reminder" | "remind" | "notification" => SolutionArchetype::Reminder,
            other => SolutionArchetype::Other(other.to_string()),
        }
    }
}

impl From<SolutionArchetype> for String {
    fn from(value: SolutionArchetype) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for SolutionArchetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub id: SolutionId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub required_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Solution {
    pub fn new(
        id: impl Into<SolutionId>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            pros: Vec::new(),
            cons: Vec::new(),
            complexity: Complexity::Medium,
            required_tools: Vec::new(),
            category: None,
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn archetype(&self) -> SolutionArchetype {
        SolutionArchetype::infer(self)
    }

    /// Recommendation score: `pros - cons + complexity bonus`.
    pub fn score(&self) -> i32 {
        self.pros.len() as i32 - self.cons.len() as i32 + self.complexity.bonus()
    }
}

/// The current set of candidate solutions for one problem.
///
/// Re-exploration replaces the whole set and bumps `round`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionSet {
    pub problem_id: ProblemId,
    pub round: u32,
    pub solutions: Vec<Solution>,
}

impl SolutionSet {
    pub fn new(problem_id: ProblemId, round: u32, solutions: Vec<Solution>) -> Self {
        Self {
            problem_id,
            round,
            solutions,
        }
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn get(&self, id: &SolutionId) -> Option<&Solution> {
        self.solutions.iter().find(|s| &s.id == id)
    }

    pub fn names(&self) -> Vec<String> {
        self.solutions.iter().map(|s| s.name.clone()).collect()
    }

    /// Highest-scoring solution; earlier entries win ties.
    pub fn recommended(&self) -> Option<&Solution> {
        self.solutions
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.score().cmp(&b.score()).then(ib.cmp(ia)))
            .map(|(_, s)| s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_category_wins() {
        let s = Solution::new("s1", "Label everything", "apply labels").with_category("reminder");
        assert_eq!(s.archetype(), SolutionArchetype::Reminder);
    }

    #[test]
    fn test_keyword_inference_order() {
        let p = Solution::new("s1", "Priority triage", "Score and label important mail");
        assert_eq!(p.archetype(), SolutionArchetype::Prioritization);

        let c = Solution::new("s2", "Auto folders", "Classify mail into categories");
        assert_eq!(c.archetype(), SolutionArchetype::Classification);

        let r = Solution::new("s3", "Evening digest", "Send a digest");
        assert_eq!(r.archetype(), SolutionArchetype::Reminder);

        let t = Solution::new("s4", "Something", "Do things").with_tools(["score_priority"]);
        assert_eq!(t.archetype(), SolutionArchetype::Prioritization);
    }

    #[test]
    fn test_unknown_category_is_other() {
        let s = Solution::new("s1", "Unsubscribe bot", "Unsubscribe from newsletters");
        assert_eq!(s.archetype(), SolutionArchetype::Other("generic".into()));

        let custom = Solution::new("s2", "x", "y").with_category("Cleanup");
        assert_eq!(custom.archetype(), SolutionArchetype::Other("cleanup".into()));
    }

    #[test]
    fn test_archetype_serializes_as_string() {
        let json = serde_json::to_string(&SolutionArchetype::Prioritization).unwrap();
        assert_eq!(json, "\"prioritization\"");
        let back: SolutionArchetype = serde_json::from_str("\"cleanup\"").unwrap();
        assert_eq!(back, SolutionArchetype::Other("cleanup".into()));
    }

    #[test]
    fn test_recommended_prefers_score_then_order() {
        let mut a = Solution::new("a", "A", "a").with_complexity(Complexity::High);
        a.pros = vec!["fast".into()];
        let b = Solution::new("b", "B", "b").with_complexity(Complexity::Low);
        let c = Solution::new("c", "C", "c").with_complexity(Complexity::Low);
        let set = SolutionSet::new(ProblemId::new("p"), 1, vec![a, b, c]);
        // a: 1 - 0 + 1 = 2, b: 3, c: 3 -> b wins on order
        assert_eq!(set.recommended().unwrap().id.as_str(), "b");
    }
}
