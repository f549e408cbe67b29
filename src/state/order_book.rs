use crate::types::OrderEntry;
use anyhow::{Context, Result};

pub const NO_ORDERS_TEXT: &str = "주문 내역이 없습니다.";

/// One order as shown to the customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub kind: String,
    pub burger: String,
    pub side: String,
    pub drink: String,
    pub quantity: u32,
}

impl OrderLine {
    fn from_entry(entry: &OrderEntry) -> Self {
        Self {
            kind: entry.order_type.clone().unwrap_or_default(),
            burger: entry
                .burger
                .as_ref()
                .map(|b| b.name.trim().to_string())
                .unwrap_or_default(),
            side: entry.side.as_ref().map(|s| s.label()).unwrap_or_default(),
            drink: entry.drink.as_ref().map(|d| d.label()).unwrap_or_default(),
            quantity: entry.quantity.filter(|q| *q > 0).unwrap_or(1),
        }
    }

    // Orders are deduplicated on contents, not on kind.
    fn dedup_key(&self) -> (&str, &str, &str, u32) {
        (&self.burger[..], &self.side[..], &self.drink[..], self.quantity)
    }
}

/// Client-side mirror of the session's orders.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    lines: Vec<OrderLine>,
    summary: String,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn summary(&self) -> &str {
        if self.summary.trim().is_empty() {
            NO_ORDERS_TEXT
        } else {
            &self.summary
        }
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
    }

    /// Merge the backend's JSON-encoded order list, skipping orders already present.
    /// Returns how many lines were added.
    pub fn merge_orders_json(&mut self, orders_json: &str) -> Result<usize> {
        let trimmed = orders_json.trim();
        if trimmed.is_empty() || trimmed == "[]" {
            return Ok(0);
        }

        let entries: Vec<OrderEntry> =
            serde_json::from_str(trimmed).context("orders payload is not a list of orders")?;

        let mut added = 0;
        for line in entries.iter().map(OrderLine::from_entry) {
            let duplicate = self
                .lines
                .iter()
                .any(|existing| existing.dedup_key() == line.dedup_key());
            if !duplicate {
                self.lines.push(line);
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.summary.clear();
    }
}
