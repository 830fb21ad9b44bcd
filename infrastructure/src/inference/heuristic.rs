//! Offline inference: deterministic answers computed from the request payload.
//!
//! Lets the whole pipeline run without network access. Expectations come
//! from the declared ideal states, gaps from the pre-computed observations,
//! and solutions from a fixed playbook per archetype.

use async_trait::async_trait;
use gapwise_application::ports::inference_gateway::{GatewayError, InferenceGateway};
use gapwise_domain::{InferenceRequest, OutputSchema};
use regex::Regex;
use serde_json::{Map, Value, json};
use std::sync::LazyLock;

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%").expect("valid regex"));
static FRACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:above|over|threshold(?: of)?|at least)\s+(0?\.\d+|1\.0|1)\b")
        .expect("valid regex")
});
static LABEL_AS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:label|tag|mark)\w*\b(?:[^.;]|\.\d)*?\bas\s+["']?([a-z][\w-]*)"#)
        .expect("valid regex")
});
static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:label|tag|mark)\w*\s+(?:them\s+|it\s+)?["']?([a-z][\w-]*)"#)
        .expect("valid regex")
});
static FALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:otherwise|else|falls?\s+back\s+to)\s+(?:the\s+)?["']?([a-z][\w-]*)"#)
        .expect("valid regex")
});
static CHANNEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:via|through|on|to)\s+(?:a\s+|the\s+)?(digest|email|slack|sms|push|desktop)\b")
        .expect("valid regex")
});

/// Words that follow "label" or "mark" without naming a label
const LABEL_STOPWORDS: [&str; 8] = ["them", "it", "those", "each", "the", "a", "by", "otherwise"];

struct Play {
    name: &'static str,
    description: &'static str,
    category: &'static str,
    tools: &'static [&'static str],
    complexity: &'static str,
    pros: &'static [&'static str],
    cons: &'static [&'static str],
}

const PLAYBOOK: [Play; 6] = [
    Play {
        name: "Priority triage",
        description: "Score each {subject} item and label those scoring above 0.5 as important",
        category: "prioritization",
        tools: &["email_reader", "priority_scorer", "label_applier"],
        complexity: "low",
        pros: &["important items surface first", "runs without supervision"],
        cons: &["scores can misjudge new senders"],
    },
    Play {
        name: "Topic folders",
        description: "Classify every {subject} item by topic; items without a topic fall back to normal",
        category: "classification",
        tools: &["email_reader", "classifier", "label_applier"],
        complexity: "medium",
        pros: &["related items stay together", "easier batch processing"],
        cons: &["topics need occasional tuning"],
    },
    Play {
        name: "Daily digest",
        description: "Collect high-priority {subject} items and send a reminder via digest",
        category: "reminder",
        tools: &["email_reader", "priority_scorer", "notifier"],
        complexity: "low",
        pros: &["one interruption per day"],
        cons: &["urgent items can wait until the digest"],
    },
    Play {
        name: "Sender rules",
        description: "Rank {subject} items by sender importance and mark them as urgent above 70%",
        category: "prioritization",
        tools: &["email_reader", "priority_scorer", "label_applier"],
        complexity: "medium",
        pros: &["predictable outcome", "easy to audit"],
        cons: &["rules go stale", "new senders are ignored"],
    },
    Play {
        name: "Focus reminders",
        description: "Remind me through slack when {subject} items pile up",
        category: "reminder",
        tools: &["email_reader", "notifier"],
        complexity: "low",
        pros: &["keeps the backlog visible"],
        cons: &["adds notifications"],
    },
    Play {
        name: "Weekly sweep",
        description: "Process stale {subject} items once a week and tag them archived",
        category: "cleanup",
        tools: &["email_reader", "label_applier"],
        complexity: "high",
        pros: &["clears the long tail"],
        cons: &["slow feedback", "may hide items the user still needs"],
    },
];

/// Deterministic gateway used with `provider = "offline"`
#[derive(Debug, Default, Clone)]
pub struct HeuristicGateway;

impl HeuristicGateway {
    pub fn new() -> Self {
        Self
    }

    fn answer(&self, request: &InferenceRequest) -> Value {
        let payload = &request.payload;
        match request.schema {
            OutputSchema::Expectation => expectation(payload),
            OutputSchema::Gaps => gaps(payload),
            OutputSchema::ProblemAnalysis => problem(payload),
            OutputSchema::Solutions => solutions(payload),
            OutputSchema::AgentParameters => parameters(payload),
        }
    }
}

#[async_trait]
impl InferenceGateway for HeuristicGateway {
    async fn complete(&self, request: &InferenceRequest) -> Result<String, GatewayError> {
        serde_json::to_string(&self.answer(request))
            .map_err(|e| GatewayError::Other(e.to_string()))
    }

    fn name(&self) -> &str {
        "offline"
    }
}

// ==================== Stages ====================

fn expectation(payload: &Value) -> Value {
    let states = payload
        .pointer("/world_model/ideal_states")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut clauses = Vec::new();
    let criteria: Vec<Value> = states
        .iter()
        .filter_map(|state| {
            let domain = state.get("domain")?.as_str()?;
            let condition = state.get("condition")?.as_str()?;
            let threshold = state.get("threshold")?.as_f64()?;
            let comparison = state
                .get("comparison")
                .and_then(Value::as_str)
                .unwrap_or("at_most");
            clauses.push(format!(
                "{} {} {} {}",
                domain,
                words(condition),
                comparison.replace('_', " "),
                number(threshold)
            ));
            Some(json!({
                "domain": domain,
                "condition": condition,
                "target_value": threshold,
                "comparison": comparison,
            }))
        })
        .collect();

    json!({
        "ideal_description": if clauses.is_empty() {
            "no ideal states declared".to_string()
        } else {
            format!("Keep {}", clauses.join("; "))
        },
        "criteria": criteria,
    })
}

fn gaps(payload: &Value) -> Value {
    let observations = payload
        .get("observations")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let gaps: Vec<Value> = observations
        .iter()
        .filter_map(|obs| {
            let excess = obs.get("excess")?.as_f64()?;
            if excess <= 0.0 {
                return None;
            }
            let target = obs.get("target").and_then(Value::as_f64).unwrap_or(0.0);
            let condition = obs.get("condition")?.as_str()?;
            let verb = match obs.get("comparison").and_then(Value::as_str) {
                Some("at_least") => "falls short of",
                _ => "exceeds",
            };
            Some(json!({
                "description": format!("{} {} ideal by {}", words(condition), verb, number(excess)),
                "severity": severity(excess, target),
                "related_items": obs.get("related_items").cloned().unwrap_or(json!([])),
                "domain": obs.get("domain"),
                "condition": condition,
            }))
        })
        .collect();
    Value::Array(gaps)
}

fn problem(payload: &Value) -> Value {
    let gap = payload.get("gap").cloned().unwrap_or(Value::Null);
    let description = gap
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("unexplained gap");
    let domain = gap.get("domain").and_then(Value::as_str).unwrap_or("world");
    let related = payload
        .get("related_items")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);

    let shortfall = description.contains("falls short");
    let name = if shortfall {
        format!("{} shortfall", domain)
    } else {
        format!("{} overload", domain)
    };
    let cause = if related == 0 {
        String::new()
    } else if shortfall {
        format!("{} items are not being completed", domain)
    } else {
        format!("{} items arrive faster than they are handled", domain)
    };

    json!({
        "name": name,
        "detail": description,
        "cause": cause,
        "impact": format!("important {} items may be missed", domain),
    })
}

fn solutions(payload: &Value) -> Value {
    let count = payload.get("count").and_then(Value::as_u64).unwrap_or(3) as usize;
    let subject = payload
        .pointer("/problem/name")
        .and_then(Value::as_str)
        .and_then(|name| name.split_whitespace().next())
        .unwrap_or("incoming")
        .to_string();
    let excluded: Vec<String> = payload
        .get("exclude")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_lowercase)
                .collect()
        })
        .unwrap_or_default();

    let proposals: Vec<Value> = PLAYBOOK
        .iter()
        .filter(|play| !excluded.contains(&play.name.to_lowercase()))
        .take(count)
        .map(|play| {
            json!({
                "name": play.name,
                "description": play.description.replace("{subject}", &subject),
                "category": play.category,
                "required_tools": play.tools,
                "complexity": play.complexity,
                "pros": play.pros,
                "cons": play.cons,
            })
        })
        .collect();
    Value::Array(proposals)
}

fn parameters(payload: &Value) -> Value {
    let solution = payload.get("solution").cloned().unwrap_or(Value::Null);
    let text = ["name", "description"]
        .iter()
        .filter_map(|key| solution.get(*key).and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(". ");

    let mut params = Map::new();
    if let Some(threshold) = extract_threshold(&text) {
        params.insert("threshold".to_string(), json!(threshold));
    }
    if let Some(label) = capture(&LABEL_AS, &text).or_else(|| capture(&LABEL, &text)) {
        params.insert("label".to_string(), json!(label));
    }
    if let Some(fallback) = capture(&FALLBACK, &text) {
        params.insert("fallback_label".to_string(), json!(fallback));
    }
    if let Some(channel) = capture(&CHANNEL, &text) {
        params.insert("notify_channel".to_string(), json!(channel));
    }
    Value::Object(params)
}

// ==================== Helpers ====================

fn extract_threshold(text: &str) -> Option<f64> {
    if let Some(value) = PERCENT
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        && value <= 100.0
    {
        return Some(value / 100.0);
    }
    FRACTION
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// First capture that is not a stopword.
fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
        .find(|word| !LABEL_STOPWORDS.contains(&word.as_str()))
}

fn severity(excess: f64, target: f64) -> &'static str {
    let ratio = excess / target.abs().max(1.0);
    if ratio >= 0.5 {
        "high"
    } else if ratio >= 0.2 {
        "medium"
    } else {
        "low"
    }
}

/// `unread_count` → `unread`, `flagged_count` → `flagged`
fn words(condition: &str) -> String {
    condition
        .strip_suffix("_count")
        .unwrap_or(condition)
        .replace('_', " ")
}

fn number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}
