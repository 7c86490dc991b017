//! Rule-based fact extraction from a conversational exchange.
//!
//! Each pattern family is an independent, named [`ExtractionRule`]. Rules are
//! evaluated unconditionally over the combined exchange text and their results
//! concatenated — a single exchange may yield facts of several kinds, and no
//! deduplication happens across families. Extraction is pure string matching:
//! no I/O, deterministic for a given input.
//!
//! Preference polarity is decided once per exchange: if the exchange contains
//! any negative trigger ("don't like", "dislike", "hate"), every preference
//! match in that exchange is recorded as a dislike. Polarity is intentionally
//! not resolved per match.

use std::sync::LazyLock;

use regex::Regex;

use crate::memory::types::{ExtractedFact, FactKind};

/// Captured text shorter than this (after trimming) is rejected as noise.
const MIN_CAPTURE_LEN: usize = 3;

/// Per-exchange state shared by all rules.
pub struct ExchangeContext {
    /// True when any negative preference trigger appears in the exchange.
    pub negated: bool,
}

/// One pattern family. Implementations hold their compiled regexes and
/// produce zero or more facts per exchange.
pub trait ExtractionRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, text: &str, ctx: &ExchangeContext) -> Vec<ExtractedFact>;
}

/// The default rule set, applied in a fixed order.
pub struct FactExtractor {
    rules: Vec<Box<dyn ExtractionRule>>,
    negative_trigger: Regex,
}

impl FactExtractor {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(PersonalInfoRule::new()),
                Box::new(LocationRule::new()),
                Box::new(WorkRule::new()),
                Box::new(PreferenceRule::new()),
            ],
            negative_trigger: Regex::new(r"(?i)i\s+(?:don['’]t\s+like|dislike|hate)")
                .expect("negative trigger pattern compiles"),
        }
    }

    /// Extract facts from one exchange.
    ///
    /// Operates on `"User: {msg}\nAssistant: {reply}"` (assistant line omitted
    /// when absent), so assistant turns can contribute matches too.
    pub fn extract(
        &self,
        user_message: &str,
        assistant_response: Option<&str>,
    ) -> Vec<ExtractedFact> {
        let text = match assistant_response {
            Some(reply) => format!("User: {user_message}\nAssistant: {reply}"),
            None => format!("User: {user_message}"),
        };

        let ctx = ExchangeContext {
            negated: self.negative_trigger.is_match(&text),
        };

        self.rules
            .iter()
            .flat_map(|rule| rule.apply(&text, &ctx))
            .collect()
    }
}

impl Default for FactExtractor {
    fn default() -> Self {
        Self::new()
    }
}

static EXTRACTOR: LazyLock<FactExtractor> = LazyLock::new(FactExtractor::new);

/// Extract facts using the shared default rule set.
pub fn extract_facts(
    user_message: &str,
    assistant_response: Option<&str>,
) -> Vec<ExtractedFact> {
    EXTRACTOR.extract(user_message, assistant_response)
}

/// Trim a capture and reject short noise. Returns `None` below
/// [`MIN_CAPTURE_LEN`].
fn clean_capture(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.len() < MIN_CAPTURE_LEN {
        None
    } else {
        Some(trimmed)
    }
}

// ── personal_info ─────────────────────────────────────────────────────────────

/// "my name is / I'm / I am / call me NAME" and "this is NAME speaking/here".
/// The trigger is case-insensitive but the name must be capitalized token(s).
struct PersonalInfoRule {
    patterns: Vec<Regex>,
}

impl PersonalInfoRule {
    const IMPORTANCE: u8 = 9;

    fn new() -> Self {
        let name = r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2})";
        Self {
            patterns: vec![
                Regex::new(&format!(r"\b(?i:my name is|i['’]m|i am|call me)\s+{name}"))
                    .expect("name pattern compiles"),
                Regex::new(&format!(r"\b(?i:this is)\s+{name}\s+(?i:speaking|here)"))
                    .expect("speaking pattern compiles"),
            ],
        }
    }
}

impl ExtractionRule for PersonalInfoRule {
    fn name(&self) -> &'static str {
        "personal_info"
    }

    fn apply(&self, text: &str, _ctx: &ExchangeContext) -> Vec<ExtractedFact> {
        let mut facts = Vec::new();
        for pattern in &self.patterns {
            for caps in pattern.captures_iter(text) {
                if let Some(name) = caps.get(1).and_then(|m| clean_capture(m.as_str())) {
                    facts.push(ExtractedFact {
                        fact: format!("User's name is {name}"),
                        kind: FactKind::PersonalInfo,
                        importance: Self::IMPORTANCE,
                    });
                }
            }
        }
        facts
    }
}

// ── location ──────────────────────────────────────────────────────────────────

/// "I live in / I'm from / based in / located in {place}", plus the
/// two-token "from {City}, {Region}" form joined with a comma.
struct LocationRule {
    lives_in: Regex,
    is_from: Regex,
    city_region: Regex,
}

impl LocationRule {
    const IMPORTANCE: u8 = 8;

    fn new() -> Self {
        Self {
            lives_in: Regex::new(r"\b(?i:i live in|based in|located in)\s+([^,.!?\n]{1,60})")
                .expect("lives-in pattern compiles"),
            is_from: Regex::new(r"\b(?i:i['’]m from|i am from)\s+([^,.!?\n]{1,60})")
                .expect("is-from pattern compiles"),
            city_region: Regex::new(r"\b(?i:from)\s+([A-Z][a-z]+),\s*([A-Z][a-z]+)")
                .expect("city-region pattern compiles"),
        }
    }
}

impl ExtractionRule for LocationRule {
    fn name(&self) -> &'static str {
        "location"
    }

    fn apply(&self, text: &str, _ctx: &ExchangeContext) -> Vec<ExtractedFact> {
        let mut facts = Vec::new();
        for caps in self.lives_in.captures_iter(text) {
            if let Some(place) = caps.get(1).and_then(|m| clean_capture(m.as_str())) {
                facts.push(ExtractedFact {
                    fact: format!("User lives in {place}"),
                    kind: FactKind::Location,
                    importance: Self::IMPORTANCE,
                });
            }
        }
        for caps in self.is_from.captures_iter(text) {
            if let Some(place) = caps.get(1).and_then(|m| clean_capture(m.as_str())) {
                facts.push(ExtractedFact {
                    fact: format!("User is from {place}"),
                    kind: FactKind::Location,
                    importance: Self::IMPORTANCE,
                });
            }
        }
        for caps in self.city_region.captures_iter(text) {
            if let (Some(city), Some(region)) = (caps.get(1), caps.get(2)) {
                facts.push(ExtractedFact {
                    fact: format!("User is from {}, {}", city.as_str(), region.as_str()),
                    kind: FactKind::Location,
                    importance: Self::IMPORTANCE,
                });
            }
        }
        facts
    }
}

// ── work ──────────────────────────────────────────────────────────────────────

/// "I work as / I am a / my job is / I do {role}" and
/// "work at / employed by / job at {org}".
struct WorkRule {
    role: Regex,
    org: Regex,
}

impl WorkRule {
    const IMPORTANCE: u8 = 7;

    fn new() -> Self {
        Self {
            role: Regex::new(
                r"\b(?i:i work as|i am a|i['’]m a|my job is|i do)\s+([^,.!?\n]{1,60})",
            )
            .expect("role pattern compiles"),
            org: Regex::new(r"\b(?i:work at|employed by|job at)\s+([^,.!?\n]{1,60})")
                .expect("org pattern compiles"),
        }
    }
}

impl ExtractionRule for WorkRule {
    fn name(&self) -> &'static str {
        "work"
    }

    fn apply(&self, text: &str, _ctx: &ExchangeContext) -> Vec<ExtractedFact> {
        let mut facts = Vec::new();
        for caps in self.role.captures_iter(text) {
            if let Some(role) = caps.get(1).and_then(|m| clean_capture(m.as_str())) {
                facts.push(ExtractedFact {
                    fact: format!("User works as {role}"),
                    kind: FactKind::Work,
                    importance: Self::IMPORTANCE,
                });
            }
        }
        for caps in self.org.captures_iter(text) {
            if let Some(org) = caps.get(1).and_then(|m| clean_capture(m.as_str())) {
                facts.push(ExtractedFact {
                    fact: format!("User works at {org}"),
                    kind: FactKind::Work,
                    importance: Self::IMPORTANCE,
                });
            }
        }
        facts
    }
}

// ── preference ────────────────────────────────────────────────────────────────

/// "I prefer / like / love / enjoy {thing}", "I don't like / dislike / hate
/// {thing}", and "favorite ... is/are {thing}". Polarity comes from the
/// exchange-level negation flag, not from which pattern matched.
struct PreferenceRule {
    positive: Regex,
    negative: Regex,
    favorite: Regex,
}

impl PreferenceRule {
    const IMPORTANCE: u8 = 5;

    fn new() -> Self {
        Self {
            positive: Regex::new(r"\b(?i:i prefer|i like|i love|i enjoy)\s+([^,.!?\n]{1,80})")
                .expect("positive pattern compiles"),
            negative: Regex::new(
                r"\b(?i:i don['’]t like|i dislike|i hate)\s+([^,.!?\n]{1,80})",
            )
            .expect("negative pattern compiles"),
            favorite: Regex::new(
                r"\b(?i:favou?rite)(?:\s+\w+)?\s+(?i:is|are)\s+([^,.!?\n]{1,80})",
            )
            .expect("favorite pattern compiles"),
        }
    }

    fn push_matches(
        &self,
        pattern: &Regex,
        text: &str,
        ctx: &ExchangeContext,
        facts: &mut Vec<ExtractedFact>,
    ) {
        for caps in pattern.captures_iter(text) {
            if let Some(thing) = caps.get(1).and_then(|m| clean_capture(m.as_str())) {
                let verb = if ctx.negated { "dislikes" } else { "likes" };
                facts.push(ExtractedFact {
                    fact: format!("User {verb} {thing}"),
                    kind: FactKind::Preference,
                    importance: Self::IMPORTANCE,
                });
            }
        }
    }
}

impl ExtractionRule for PreferenceRule {
    fn name(&self) -> &'static str {
        "preference"
    }

    fn apply(&self, text: &str, ctx: &ExchangeContext) -> Vec<ExtractedFact> {
        let mut facts = Vec::new();
        self.push_matches(&self.positive, text, ctx, &mut facts);
        self.push_matches(&self.negative, text, ctx, &mut facts);
        self.push_matches(&self.favorite, text, ctx, &mut facts);
        facts
    }
}
