//! Hourly rate lookup by rate card and role name.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

const BUILTIN_RATES: &str = include_str!("../../../assets/rate_cards.yaml");

/// Errors produced while loading a rate table.
#[derive(Debug, Error, PartialEq)]
pub enum RateTableError {
    #[error("invalid rate table: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("negative rate for {card}/{role}")]
    NegativeRate { card: String, role: String },
}

impl From<std::io::Error> for RateTableError {
    fn from(e: std::io::Error) -> Self {
        RateTableError::Io(e.to_string())
    }
}

/// Rates keyed by card, then role.
pub type Sheet = BTreeMap<String, BTreeMap<String, Decimal>>;

/// Current and legacy rate sheets plus display-name aliases.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    #[serde(default)]
    aliases: BTreeMap<String, String>,
    #[serde(default)]
    cards: Sheet,
    #[serde(default)]
    legacy: Sheet,
}

/// Where a rate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLookup {
    Primary(Decimal),
    Legacy(Decimal),
    /// Neither sheet has a non-zero rate.
    Unresolved,
}

impl RateLookup {
    /// The rate, zero when unresolved.
    pub fn rate(self) -> Decimal {
        match self {
            RateLookup::Primary(r) | RateLookup::Legacy(r) => r,
            RateLookup::Unresolved => Decimal::ZERO,
        }
    }

    pub fn is_resolved(self) -> bool {
        !matches!(self, RateLookup::Unresolved)
    }
}

fn sheet_rate(sheet: &Sheet, card: &str, role: &str) -> Option<Decimal> {
    sheet
        .get(card)
        .and_then(|rates| rates.get(role))
        .copied()
        .filter(|r| !r.is_zero())
}

impl RateTable {
    pub fn new(
        aliases: BTreeMap<String, String>,
        cards: Sheet,
        legacy: Sheet,
    ) -> Result<Self, RateTableError> {
        let table = Self {
            aliases,
            cards,
            legacy,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn from_yaml(text: &str) -> Result<Self, RateTableError> {
        let table: RateTable =
            serde_yaml::from_str(text).map_err(|e| RateTableError::Parse(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RateTableError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// The rate sheet shipped with the crate.
    pub fn builtin() -> Result<Self, RateTableError> {
        Self::from_yaml(BUILTIN_RATES)
    }

    fn validate(&self) -> Result<(), RateTableError> {
        for (card, rates) in self.cards.iter().chain(self.legacy.iter()) {
            if let Some((role, _)) = rates.iter().find(|(_, r)| **r < Decimal::ZERO) {
                return Err(RateTableError::NegativeRate {
                    card: card.clone(),
                    role: role.clone(),
                });
            }
        }
        Ok(())
    }

    /// Name a role is priced under after alias redirection.
    pub fn lookup_name<'a>(&'a self, role: &'a str) -> &'a str {
        self.aliases.get(role).map(String::as_str).unwrap_or(role)
    }

    /// Resolve a rate: alias first, then the current sheet, then legacy.
    pub fn lookup(&self, card: &str, role: &str) -> RateLookup {
        let role = role.trim();
        if role.is_empty() {
            return RateLookup::Unresolved;
        }
        let name = self.lookup_name(role);
        if let Some(rate) = sheet_rate(&self.cards, card, name) {
            return RateLookup::Primary(rate);
        }
        if let Some(rate) = sheet_rate(&self.legacy, card, name) {
            return RateLookup::Legacy(rate);
        }
        RateLookup::Unresolved
    }

    /// Hourly rate, or zero when nothing matches.
    pub fn resolve_rate(&self, card: &str, role: &str) -> Decimal {
        self.lookup(card, role).rate()
    }

    pub fn card_names(&self) -> impl Iterator<Item = &str> {
        self.cards.keys().map(String::as_str)
    }

    pub fn has_card(&self, card: &str) -> bool {
        self.cards.contains_key(card)
    }
}
