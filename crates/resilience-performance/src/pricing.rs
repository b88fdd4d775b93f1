/// Per-million-token USD pricing for one model.
#[derive(Debug, Clone, Copy)]
pub struct ModelPrice {
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub cache_hit_per_million: Option<f64>,
}

/// Known model prices plus the default fallback rate for unrecognized
/// names. Mirrors `model_performance_tracker.py`'s `self.pricing` table.
#[derive(Debug, Clone)]
pub struct PricingTable {
    entries: Vec<(&'static str, ModelPrice)>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            entries: vec![
                (
                    "deepseek-chat",
                    ModelPrice {
                        input_per_million: 0.14,
                        output_per_million: 0.28,
                        cache_hit_per_million: Some(0.014),
                    },
                ),
                (
                    "deepseek-reasoner",
                    ModelPrice {
                        input_per_million: 0.55,
                        output_per_million: 2.19,
                        cache_hit_per_million: None,
                    },
                ),
                (
                    "deepseek-coder",
                    ModelPrice {
                        input_per_million: 0.14,
                        output_per_million: 0.28,
                        cache_hit_per_million: None,
                    },
                ),
                (
                    "gpt-4",
                    ModelPrice {
                        input_per_million: 30.0,
                        output_per_million: 60.0,
                        cache_hit_per_million: None,
                    },
                ),
                (
                    "gpt-3.5-turbo",
                    ModelPrice {
                        input_per_million: 0.5,
                        output_per_million: 1.5,
                        cache_hit_per_million: None,
                    },
                ),
                (
                    "claude-3-opus",
                    ModelPrice {
                        input_per_million: 15.0,
                        output_per_million: 75.0,
                        cache_hit_per_million: None,
                    },
                ),
                (
                    "claude-3-sonnet",
                    ModelPrice {
                        input_per_million: 3.0,
                        output_per_million: 15.0,
                        cache_hit_per_million: None,
                    },
                ),
                (
                    "claude-3-haiku",
                    ModelPrice {
                        input_per_million: 0.25,
                        output_per_million: 1.25,
                        cache_hit_per_million: None,
                    },
                ),
            ],
        }
    }
}

impl PricingTable {
    pub fn price_for(&self, model: &str) -> Option<ModelPrice> {
        self.entries.iter().find(|(name, _)| *name == model).map(|(_, p)| *p)
    }

    pub fn insert(&mut self, model: &'static str, price: ModelPrice) {
        self.entries.retain(|(name, _)| *name != model);
        self.entries.push((model, price));
    }

    /// Cost imputation for the model flavor:
    /// looks up `model` in the table, falling back to
    /// `(input*0.5 + output*1.5) / 1e6` when unrecognized. Applies a
    /// cache-hit discount on the input side when the model's pricing
    /// defines one and `cache_hit_tokens > 0`.
    pub fn calculate_cost(&self, model: &str, input_tokens: u64, output_tokens: u64, cache_hit_tokens: u64) -> f64 {
        let Some(price) = self.price_for(model) else {
            return (input_tokens as f64 * 0.5 + output_tokens as f64 * 1.5) / 1_000_000.0;
        };

        let mut cost =
            (input_tokens as f64 * price.input_per_million + output_tokens as f64 * price.output_per_million)
                / 1_000_000.0;

        if cache_hit_tokens > 0 {
            if let Some(cache_price) = price.cache_hit_per_million {
                let discount = (cache_hit_tokens as f64 * (price.input_per_million - cache_price)) / 1_000_000.0;
                cost -= discount;
            }
        }

        cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_uses_its_own_rates() {
        let table = PricingTable::default();
        let cost = table.calculate_cost("gpt-3.5-turbo", 1_000_000, 1_000_000, 0);
        assert!((cost - 2.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_uses_default_fallback() {
        let table = PricingTable::default();
        let cost = table.calculate_cost("some-new-model", 1_000_000, 1_000_000, 0);
        assert!((cost - 2.0).abs() < 1e-9);
    }

    #[test]
    fn cache_hit_tokens_discount_input_cost() {
        let table = PricingTable::default();
        let without_cache = table.calculate_cost("deepseek-chat", 1_000_000, 0, 0);
        let with_cache = table.calculate_cost("deepseek-chat", 1_000_000, 0, 1_000_000);
        assert!(with_cache < without_cache);
    }
}
