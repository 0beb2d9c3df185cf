//! Placement strategies
//!
//! A strategy looks at the free spaces and names the one a request of a
//! given size goes into. Ties always go to the earliest space.

use crate::error::MemoryError;
use crate::trace::Space;
use std::collections::BTreeMap;

pub trait FitStrategy: Send {
    /// Registry name
    fn name(&self) -> &'static str;

    /// Index of the chosen space, or `None` when nothing fits
    fn select(&self, spaces: &[Space], size: u64) -> Option<usize>;
}

fn fitting(spaces: &[Space], size: u64) -> impl Iterator<Item = (usize, &Space)> {
    spaces
        .iter()
        .enumerate()
        .filter(move |(_, space)| space.fits(size))
}

/// First space big enough
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstFit;

impl FitStrategy for FirstFit {
    fn name(&self) -> &'static str {
        "first_fit"
    }

    fn select(&self, spaces: &[Space], size: u64) -> Option<usize> {
        fitting(spaces, size).map(|(index, _)| index).next()
    }
}

/// Smallest space big enough
#[derive(Debug, Default, Clone, Copy)]
pub struct BestFit;

impl FitStrategy for BestFit {
    fn name(&self) -> &'static str {
        "best_fit"
    }

    fn select(&self, spaces: &[Space], size: u64) -> Option<usize> {
        // min_by_key keeps the first of equal keys.
        fitting(spaces, size)
            .min_by_key(|(_, space)| space.size)
            .map(|(index, _)| index)
    }
}

/// Largest space big enough
#[derive(Debug, Default, Clone, Copy)]
pub struct WorstFit;

impl FitStrategy for WorstFit {
    fn name(&self) -> &'static str {
        "worst_fit"
    }

    fn select(&self, spaces: &[Space], size: u64) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (index, space) in fitting(spaces, size) {
            if best.map_or(true, |(_, largest)| space.size > largest) {
                best = Some((index, space.size));
            }
        }
        best.map(|(index, _)| index)
    }
}

type StrategyFactory = fn() -> Box<dyn FitStrategy>;

fn first_fit() -> Box<dyn FitStrategy> {
    Box::new(FirstFit)
}

fn best_fit() -> Box<dyn FitStrategy> {
    Box::new(BestFit)
}

fn worst_fit() -> Box<dyn FitStrategy> {
    Box::new(WorstFit)
}

/// Name -> constructor table for placement strategies
pub struct StrategyRegistry {
    factories: BTreeMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        let mut factories: BTreeMap<String, StrategyFactory> = BTreeMap::new();
        for factory in [first_fit as StrategyFactory, best_fit, worst_fit] {
            factories.insert(factory().name().to_string(), factory);
        }
        Self { factories }
    }

    fn normalize(name: &str) -> String {
        let name = name.trim().to_lowercase().replace('-', "_");
        // FirstFitStrategy, first_fit_strategy
        let name = name.strip_suffix("strategy").unwrap_or(name.as_str());
        let name = name.trim_end_matches('_');
        match name {
            "firstfit" => "first_fit".to_string(),
            "bestfit" => "best_fit".to_string(),
            "worstfit" => "worst_fit".to_string(),
            other => other.to_string(),
        }
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn FitStrategy>, MemoryError> {
        self.factories
            .get(&Self::normalize(name))
            .map(|factory| factory())
            .ok_or_else(|| MemoryError::UnknownStrategy(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
