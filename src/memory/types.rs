//! Core memory type definitions.
//!
//! Defines [`FactKind`] (the categories the extractor assigns), transient
//! [`ExtractedFact`] values, and [`Memory`] (a persisted record).

use serde::{Deserialize, Serialize};

/// Category of an extracted fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    /// Name and identity — the highest-salience category.
    PersonalInfo,
    /// Likes, dislikes, favorites.
    Preference,
    /// Where the user lives or comes from.
    Location,
    /// Occupation or employer.
    Work,
    /// People the user mentions in relation to themselves.
    Relationship,
    /// Anything else worth keeping.
    General,
}

impl FactKind {
    /// SQL- and JSON-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PersonalInfo => "personal_info",
            Self::Preference => "preference",
            Self::Location => "location",
            Self::Work => "work",
            Self::Relationship => "relationship",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for FactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal_info" => Ok(Self::PersonalInfo),
            "preference" => Ok(Self::Preference),
            "location" => Ok(Self::Location),
            "work" => Ok(Self::Work),
            "relationship" => Ok(Self::Relationship),
            "general" => Ok(Self::General),
            _ => Err(format!("unknown fact kind: {s}")),
        }
    }
}

/// A single factual statement extracted from one exchange.
///
/// Facts are transient: they feed the importance score and the summary, then
/// are discarded — only the resulting [`Memory`] is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFact {
    /// Human-readable statement, e.g. `"User's name is Alice"`.
    pub fact: String,
    /// Category assigned by the matching rule.
    pub kind: FactKind,
    /// Intrinsic salience of this single fact, 1–10.
    pub importance: u8,
}

/// A persisted, user-scoped memory record, matching the `memories` table.
///
/// Records are immutable once created; the only mutation is owner-scoped
/// deletion. The embedding lives in the `memories_vec` table keyed by `id`
/// and may be absent when embedding generation was skipped or failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Owning user. Memories are never visible across users.
    pub user_id: String,
    /// Originating conversation, if the caller supplied one.
    pub conversation_id: Option<String>,
    /// Full text capturing the exchange or fact detail.
    pub content: String,
    /// Short human-readable condensation used for display and augmentation.
    pub summary: String,
    /// Exchange-level salience score, 1–10.
    pub importance: u8,
    /// Arbitrary JSON metadata supplied by the caller.
    pub metadata: Option<serde_json::Value>,
    /// ISO 8601 creation timestamp. Immutable.
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn fact_kind_round_trips_through_str() {
        for kind in [
            FactKind::PersonalInfo,
            FactKind::Preference,
            FactKind::Location,
            FactKind::Work,
            FactKind::Relationship,
            FactKind::General,
        ] {
            assert_eq!(FactKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn fact_kind_rejects_unknown() {
        assert!(FactKind::from_str("episodic").is_err());
    }

    #[test]
    fn fact_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FactKind::PersonalInfo).unwrap();
        assert_eq!(json, "\"personal_info\"");
    }
}
