use crate::utils::grain::quantize;
use eda_common::db::tech::Technology;
use std::collections::HashMap;

/// Length assumed when a spacing query has no run length of its own.
pub const DEFAULT_RULE_LENGTH: f64 = 50.0;

/// Memoized spacing-rule lookups for one search.
pub struct SpacingCache<'a> {
    tech: &'a Technology,
    cache: HashMap<(usize, i64, i64), f64>,
}

impl<'a> SpacingCache<'a> {
    pub fn new(tech: &'a Technology) -> Self {
        Self {
            tech,
            cache: HashMap::new(),
        }
    }

    pub fn spacing(&mut self, layer: usize, width: f64, length: f64) -> f64 {
        let tech = self.tech;
        *self
            .cache
            .entry((layer, quantize(width), quantize(length)))
            .or_insert_with(|| tech.spacing(layer, width, length))
    }

    pub fn default_spacing(&mut self, layer: usize, width: f64) -> f64 {
        self.spacing(layer, width, DEFAULT_RULE_LENGTH)
    }
}
