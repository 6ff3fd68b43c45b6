//! Result-field formatting and ordering.
//!
//! Turns a [`ResultRecord`] into the ordered `(label, value)` rows shown on
//! feed and profile cards. Every function here is total: malformed input
//! degrades to the placeholder or to the raw text, never to an error.

use crate::domain::model::{DisplayField, ResultRecord};
use icu_collator::{Collator, CollatorOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::OnceLock;

const DEFAULT_LABELS: &[(&str, &str)] = &[
    ("place_rank", "Place"),
    ("rank", "Place"),
    ("pos", "Place"),
    ("mark", "Mark"),
    ("discipline_clean", "Event"),
    ("event", "Event"),
    ("wind", "Wind"),
    ("venue", "Location"),
    ("date", "Date"),
];

const DEFAULT_PRIORITIES: &[(&[&str], u8)] = &[
    (&["place", "rank", "pos"], 1),
    (&["mark", "result", "time"], 2),
    (&["discipline", "event"], 3),
];

pub const DEFAULT_FALLBACK_PRIORITY: u8 = 4;
pub const DEFAULT_PLACEHOLDER: &str = "-";
pub const HIDDEN_ID_KEY: &str = "hidden_id";

/// Keys containing any of `keywords` (case-insensitive) sort with `priority`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRule {
    pub keywords: Vec<String>,
    pub priority: u8,
}

impl PriorityRule {
    pub fn new(keywords: &[&str], priority: u8) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            priority,
        }
    }

    fn matches(&self, lowered_key: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| lowered_key.contains(&keyword.to_lowercase()))
    }
}

/// The label table and ordering heuristics, kept as data so new result keys
/// can be handled from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatterRules {
    pub labels: HashMap<String, String>,
    /// Evaluated in order, first match wins.
    pub priorities: Vec<PriorityRule>,
    pub fallback_priority: u8,
    /// Keys containing one of these get their value rendered as an ordinal.
    pub ordinal_keywords: Vec<String>,
    pub hidden_keys: Vec<String>,
    pub placeholder: String,
}

impl Default for FormatterRules {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            priorities: DEFAULT_PRIORITIES
                .iter()
                .map(|(keywords, priority)| PriorityRule::new(keywords, *priority))
                .collect(),
            fallback_priority: DEFAULT_FALLBACK_PRIORITY,
            ordinal_keywords: vec!["rank".to_string(), "place".to_string()],
            hidden_keys: vec![HIDDEN_ID_KEY.to_string()],
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultFormatter {
    rules: FormatterRules,
}

impl ResultFormatter {
    pub fn new(rules: FormatterRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &FormatterRules {
        &self.rules
    }

    pub fn format_label(&self, key: &str) -> String {
        if let Some(label) = self.rules.labels.get(key) {
            return label.clone();
        }
        capitalize_words(&key.replace('_', " "))
    }

    pub fn format_value(&self, key: &str, value: Option<&Value>) -> String {
        let value = match value {
            Some(v) if !is_falsy(v) => v,
            _ => return self.rules.placeholder.clone(),
        };

        let text = stringify(value);
        let lowered = key.to_lowercase();
        let is_ordinal = self
            .rules
            .ordinal_keywords
            .iter()
            .any(|keyword| lowered.contains(&keyword.to_lowercase()));

        if is_ordinal {
            let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
            if let Ok(n) = digits.parse::<u64>() {
                return ordinal(n);
            }
        }

        text
    }

    pub fn sort_priority(&self, key: &str) -> u8 {
        let lowered = key.to_lowercase();
        self.rules
            .priorities
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.priority)
            .unwrap_or(self.rules.fallback_priority)
    }

    pub fn is_hidden(&self, key: &str) -> bool {
        self.rules.hidden_keys.iter().any(|hidden| hidden == key)
    }

    pub fn order_fields(&self, record: Option<&ResultRecord>) -> Vec<DisplayField> {
        let Some(record) = record else {
            return Vec::new();
        };

        let mut keys: Vec<&String> = record
            .data
            .keys()
            .filter(|key| !self.is_hidden(key))
            .collect();

        keys.sort_by(|a, b| {
            self.sort_priority(a)
                .cmp(&self.sort_priority(b))
                .then_with(|| collate(a, b))
        });

        keys.into_iter()
            .map(|key| {
                DisplayField::new(
                    self.format_label(key),
                    self.format_value(key, record.data.get(key)),
                )
            })
            .collect()
    }

    /// Same as [`order_fields`](Self::order_fields) for a raw JSON value;
    /// anything other than an object has no fields.
    pub fn order_value(&self, value: &Value) -> Vec<DisplayField> {
        self.order_fields(ResultRecord::from_value(value).as_ref())
    }
}

fn default_formatter() -> &'static ResultFormatter {
    static FORMATTER: OnceLock<ResultFormatter> = OnceLock::new();
    FORMATTER.get_or_init(ResultFormatter::default)
}

pub fn format_label(key: &str) -> String {
    default_formatter().format_label(key)
}

pub fn format_value(key: &str, value: Option<&Value>) -> String {
    default_formatter().format_value(key, value)
}

pub fn sort_priority(key: &str) -> u8 {
    default_formatter().sort_priority(key)
}

pub fn order_fields(record: Option<&ResultRecord>) -> Vec<DisplayField> {
    default_formatter().order_fields(record)
}

/// English ordinal: 1st, 2nd, 3rd, 4th, 11th, 21st, 102nd.
pub fn ordinal(n: u64) -> String {
    let suffix = match n % 100 {
        11..=13 => "th",
        _ => match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{}{}", n, suffix)
}

// null、false、空字串、數值 0 都當作沒有值
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 => format!("{:.0}", f),
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Uppercases the first character of every run of ASCII word characters.
fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        let is_word = c.is_ascii_alphanumeric() || c == '_';
        if is_word && !in_word {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        in_word = is_word;
    }
    out
}

thread_local! {
    // ICU root 排序，與瀏覽器 localeCompare 的預設行為相同
    static COLLATOR: Option<Collator> =
        Collator::try_new(&Default::default(), CollatorOptions::new()).ok();
}

/// Locale-aware key comparison using the ICU root collation: accents and
/// case are secondary to the base letters, punctuation sorts before digits
/// and digits before letters. Raw code points settle keys ICU considers equal.
pub fn collate(a: &str, b: &str) -> Ordering {
    COLLATOR
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => Ordering::Equal,
        })
        .then_with(|| a.cmp(b))
}
