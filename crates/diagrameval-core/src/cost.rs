//! Token cost estimation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

const TOKENS_PER_PRICE_UNIT: f64 = 1_000_000.0;

/// Price per 1,000,000 tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input: f64,
    pub output: f64,
}

/// Model name → price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    prices: BTreeMap<String, ModelPrice>,
}

impl Default for PriceTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert("gpt-4o-2024-08-06", ModelPrice { input: 1.25, output: 5.0 });
        table.insert("o4-mini-2025-04-16", ModelPrice { input: 0.55, output: 2.2 });
        table.insert("gpt-5", ModelPrice { input: 0.625, output: 5.0 });
        table.insert("gpt-5-mini", ModelPrice { input: 0.125, output: 1.0 });
        table
    }
}

impl PriceTable {
    pub fn empty() -> Self {
        Self {
            prices: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, model: impl Into<String>, price: ModelPrice) {
        self.prices.insert(model.into(), price);
    }

    pub fn get(&self, model: &str) -> Option<&ModelPrice> {
        self.prices.get(model)
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }

    /// Cost of a token count for `model`.
    pub fn estimate(
        &self,
        input_tokens: u64,
        output_tokens: u64,
        model: &str,
    ) -> Result<CostEstimate, ScoringError> {
        let price = self
            .get(model)
            .ok_or_else(|| ScoringError::UnknownModel(model.to_string()))?;
        let input_cost = input_tokens as f64 / TOKENS_PER_PRICE_UNIT * price.input;
        let output_cost = output_tokens as f64 / TOKENS_PER_PRICE_UNIT * price.output;
        Ok(CostEstimate {
            input_cost,
            output_cost,
            total_cost: input_cost + output_cost,
        })
    }
}

/// Monetary cost of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

impl CostEstimate {
    /// Total cost divided over `n_diagrams`.
    pub fn per_diagram(&self, n_diagrams: usize) -> Result<f64, ScoringError> {
        if n_diagrams == 0 {
            return Err(ScoringError::EmptyBatch);
        }
        Ok(self.total_cost / n_diagrams as f64)
    }
}

/// Token totals and their cost, as recorded in a scoring report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub per_diagram: f64,
}

impl CostBreakdown {
    pub fn new(
        input_tokens: u64,
        output_tokens: u64,
        estimate: CostEstimate,
        n_diagrams: usize,
    ) -> Result<Self, ScoringError> {
        Ok(Self {
            input_tokens,
            output_tokens,
            input_cost: estimate.input_cost,
            output_cost: estimate.output_cost,
            total_cost: estimate.total_cost,
            per_diagram: estimate.per_diagram(n_diagrams)?,
        })
    }
}
