use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One portfolio category and its target weight.
///
/// `percentage` is an integer in 0..=100; a complete set must sum to
/// exactly 100 before it may be submitted on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: String,
    pub name: String,
    pub percentage: u32,
}

impl Allocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, percentage: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            percentage,
        }
    }
}

/// An ordered collection of allocations, keyed by unique category id.
///
/// Order is preserved for display only; equality of two sets is decided
/// per-id by [`crate::diff::has_changes`], which ignores display names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSet {
    pub entries: Vec<Allocation>,
}

impl AllocationSet {
    pub fn new(entries: Vec<Allocation>) -> Self {
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&Allocation> {
        self.entries.iter().find(|a| a.id == id)
    }

    pub fn total(&self) -> u32 {
        self.entries.iter().map(|a| a.percentage).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Allocation> {
        self.entries.iter()
    }

    /// Set one category's percentage. Returns false if the id is unknown.
    pub fn set_percentage(&mut self, id: &str, percentage: u32) -> bool {
        match self.entries.iter_mut().find(|a| a.id == id) {
            Some(a) => {
                a.percentage = percentage;
                true
            }
            None => false,
        }
    }

    /// Split into the positionally-paired (categories, percentages) columns
    /// the portfolio contract expects.
    pub fn to_columns(&self) -> (Vec<String>, Vec<u32>) {
        (
            self.entries.iter().map(|a| a.id.clone()).collect(),
            self.entries.iter().map(|a| a.percentage).collect(),
        )
    }

    /// Rebuild a set from contract columns, filling display names from the
    /// default category table (unknown categories keep their raw id).
    pub fn from_columns(columns: Vec<(String, u32)>) -> Self {
        let entries = columns
            .into_iter()
            .map(|(id, percentage)| {
                let name = category_display_name(&id)
                    .map(str::to_string)
                    .unwrap_or_else(|| id.clone());
                Allocation {
                    id,
                    name,
                    percentage,
                }
            })
            .collect();
        Self { entries }
    }
}

/// Default category table: (id, display name, default percentage).
pub const DEFAULT_CATEGORIES: &[(&str, &str, u32)] = &[
    ("ai", "AI & DeFi", 15),
    ("meme", "Meme & NFT", 10),
    ("rwa", "RWA", 15),
    ("bigcap", "Big Cap", 25),
    ("defi", "DeFi", 15),
    ("l1", "Layer 1", 15),
    ("stablecoin", "Stablecoins", 5),
];

/// The allocation set used before the first successful on-chain read.
pub fn default_allocations() -> AllocationSet {
    AllocationSet::new(
        DEFAULT_CATEGORIES
            .iter()
            .map(|(id, name, pct)| Allocation::new(*id, *name, *pct))
            .collect(),
    )
}

pub fn category_display_name(id: &str) -> Option<&'static str> {
    DEFAULT_CATEGORIES
        .iter()
        .find(|(cid, _, _)| *cid == id)
        .map(|(_, name, _)| *name)
}

/// Representative tokens per category, used for market-data context.
pub fn category_tokens(id: &str) -> &'static [&'static str] {
    match id {
        "l1" => &["MON", "WSOL"],
        "stablecoin" => &["USDC", "USDT"],
        "bigcap" => &["WBTC", "WETH"],
        "defi" => &["sMON", "aprMON", "DAK", "shMON"],
        "meme" => &["PINGU", "YAKI", "CHOG"],
        _ => &[],
    }
}

/// One advisor-suggested change to a single category.
///
/// `from` is informational only — it is re-derived from the live store when
/// the suggestion is turned into a draft, never trusted from the advisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedChange {
    pub category: String,
    pub name: String,
    pub from: u32,
    pub to: u32,
}

/// A parsed advisor recommendation: a partial set of category changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceAction {
    pub description: String,
    pub changes: Vec<SuggestedChange>,
}

/// Lifecycle of one on-chain write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Confirmed,
    Failed,
}

impl SubmissionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionStatus::Confirmed | SubmissionStatus::Failed)
    }
}

/// One in-flight or completed on-chain write attempt.
///
/// Records are append-only; once `status` reaches a terminal state the
/// record is never mutated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub status: SubmissionStatus,
    /// The allocation set submitted.
    pub requested_set: AllocationSet,
    /// The set believed authoritative at submission time; restored on failure.
    pub prior_set: AllocationSet,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// A spot quote for one token symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPrice {
    pub symbol: String,
    pub price_usd: Decimal,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}
