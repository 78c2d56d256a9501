// src/core/assembler.rs
//
// Maps classifier output onto the species catalog and ranks it.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::catalog::SpeciesCatalog;
use super::model::Probabilities;

/// One species with its predicted probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPrediction {
    pub index: usize,
    pub common_name: String,
    pub scientific_name: String,
    pub probability: f64,
}

impl RankedPrediction {
    pub fn confidence_percent(&self) -> f64 {
        self.probability * 100.0
    }
}

/// Ranked per-species probabilities for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub catalog_version: String,
    /// Highest-ranked entry of `ranked`
    pub top: RankedPrediction,
    /// All species, descending by probability, ties by ascending index
    pub ranked: Vec<RankedPrediction>,
}

impl ClassificationResult {
    /// Probability for a catalog index
    pub fn probability_of(&self, index: usize) -> Option<f64> {
        self.ranked.iter().find(|p| p.index == index).map(|p| p.probability)
    }

    pub fn top_n(&self, n: usize) -> &[RankedPrediction] {
        &self.ranked[..n.min(self.ranked.len())]
    }
}

/// Zip probabilities with the catalog by index and rank them
pub fn assemble_result(probabilities: &Probabilities, catalog: &SpeciesCatalog) -> ClassificationResult {
    let mut ranked: Vec<RankedPrediction> = catalog
        .entries()
        .iter()
        .zip(probabilities.iter())
        .map(|(label, &probability)| RankedPrediction {
            index: label.index,
            common_name: label.common_name.clone(),
            scientific_name: label.scientific_name.clone(),
            probability,
        })
        .collect();

    ranked.sort_by(rank_order);

    ClassificationResult {
        catalog_version: catalog.version().to_string(),
        top: ranked[0].clone(),
        ranked,
    }
}

fn rank_order(a: &RankedPrediction, b: &RankedPrediction) -> Ordering {
    b.probability
        .total_cmp(&a.probability)
        .then(a.index.cmp(&b.index))
}
