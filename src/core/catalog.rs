// src/core/catalog.rs
//
// Versioned species table shared by the classifier output and catalog display.
// The index of each entry is the classifier's output position; reordering the
// table requires a new version and retrained weights.

use serde::{Deserialize, Serialize};

/// Number of species the classifier distinguishes
pub const NUM_SPECIES: usize = 8;

/// Version tag of the built-in table
pub const CATALOG_VERSION: &str = "species-v1";

/// One immutable catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesLabel {
    pub index: usize,
    pub common_name: String,
    pub scientific_name: String,
    pub description: String,
    pub habitat: String,
    pub call_descriptor: String,
}

/// Index-aligned table of species labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCatalog {
    version: String,
    entries: Vec<SpeciesLabel>,
}

impl SpeciesCatalog {
    /// Build a catalog, checking that it has [`NUM_SPECIES`] entries indexed `0..8` in order
    pub fn new(version: impl Into<String>, entries: Vec<SpeciesLabel>) -> Result<Self, String> {
        if entries.len() != NUM_SPECIES {
            return Err(format!(
                "catalog must have {} entries, got {}",
                NUM_SPECIES,
                entries.len()
            ));
        }
        if let Some(bad) = entries.iter().enumerate().find(|(i, e)| e.index != *i) {
            return Err(format!(
                "catalog entry at position {} has index {}",
                bad.0, bad.1.index
            ));
        }
        Ok(Self {
            version: version.into(),
            entries,
        })
    }

    /// The built-in `species-v1` table
    pub fn builtin() -> Self {
        let rows: [(&str, &str, &str, &str, &str); NUM_SPECIES] = [
            (
                "American Robin",
                "Turdus migratorius",
                "A common North American songbird known for its distinctive red breast and melodic song.",
                "Gardens, parks, woodlands",
                "Clear, liquid notes in phrases of 2-3 syllables",
            ),
            (
                "House Sparrow",
                "Passer domesticus",
                "Small, social birds commonly found in urban and suburban areas worldwide.",
                "Cities, towns, farmlands",
                "Simple chirps and cheeps, often in rapid succession",
            ),
            (
                "Blue Jay",
                "Cyanocitta cristata",
                "Intelligent corvids known for their bright blue coloration and complex vocalizations.",
                "Deciduous and mixed forests, parks",
                "Harsh 'jay-jay' calls, also mimics other birds",
            ),
            (
                "Northern Cardinal",
                "Cardinalis cardinalis",
                "Vibrant red songbirds (males) with distinctive crests and strong, thick bills.",
                "Woodlands, gardens, shrublands",
                "Clear whistles: 'birdy-birdy-birdy' or 'cheer-cheer-cheer'",
            ),
            (
                "Common Crow",
                "Corvus brachyrhynchos",
                "Large, intelligent black birds known for their problem-solving abilities.",
                "Various habitats from forests to cities",
                "Harsh 'caw-caw' calls, various croaks and rattles",
            ),
            (
                "Mourning Dove",
                "Zenaida macroura",
                "Gentle, gray-brown doves with distinctive mournful cooing sounds.",
                "Open woodlands, fields, suburban areas",
                "Soft, mournful 'coo-OO-oo-oo' calls",
            ),
            (
                "Red-winged Blackbird",
                "Agelaius phoeniceus",
                "Males display bright red and yellow shoulder patches during breeding season.",
                "Wetlands, marshes, fields",
                "Distinctive 'conk-la-ree' song, various chatters",
            ),
            (
                "European Starling",
                "Sturnus vulgaris",
                "Introduced species known for their iridescent plumage and vocal mimicry.",
                "Cities, farms, open woodlands",
                "Complex songs with whistles, clicks, and mimicked sounds",
            ),
        ];

        let entries = rows
            .iter()
            .enumerate()
            .map(|(index, (common, scientific, description, habitat, call))| SpeciesLabel {
                index,
                common_name: common.to_string(),
                scientific_name: scientific.to_string(),
                description: description.to_string(),
                habitat: habitat.to_string(),
                call_descriptor: call.to_string(),
            })
            .collect();

        Self {
            version: CATALOG_VERSION.to_string(),
            entries,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn entries(&self) -> &[SpeciesLabel] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&SpeciesLabel> {
        self.entries.get(index)
    }

    pub fn common_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.common_name.as_str()).collect()
    }

    /// Check a model's label list against this table.
    ///
    /// Both the version tag and every name must match position for position.
    pub fn check_alignment(&self, version: &str, labels: &[String]) -> Result<(), String> {
        if version != self.version {
            return Err(format!(
                "weights target catalog '{}' but catalog is '{}'",
                version, self.version
            ));
        }
        if labels.len() != self.entries.len() {
            return Err(format!(
                "weights carry {} labels, catalog has {}",
                labels.len(),
                self.entries.len()
            ));
        }
        for (entry, label) in self.entries.iter().zip(labels) {
            if &entry.common_name != label {
                return Err(format!(
                    "label mismatch at index {}: weights say '{}', catalog says '{}'",
                    entry.index, label, entry.common_name
                ));
            }
        }
        Ok(())
    }
}

impl Default for SpeciesCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order() {
        let catalog = SpeciesCatalog::builtin();
        assert_eq!(catalog.version(), CATALOG_VERSION);
        assert_eq!(
            catalog.common_names(),
            vec![
                "American Robin",
                "House Sparrow",
                "Blue Jay",
                "Northern Cardinal",
                "Common Crow",
                "Mourning Dove",
                "Red-winged Blackbird",
                "European Starling",
            ]
        );
        for (i, entry) in catalog.entries().iter().enumerate() {
            assert_eq!(entry.index, i);
        }
    }

    #[test]
    fn test_new_rejects_misindexed_entries() {
        let mut entries = SpeciesCatalog::builtin().entries().to_vec();
        entries.swap(0, 1);
        assert!(SpeciesCatalog::new("custom", entries).is_err());

        let short = SpeciesCatalog::builtin().entries()[..7].to_vec();
        assert!(SpeciesCatalog::new("custom", short).is_err());
    }

    #[test]
    fn test_alignment_check() {
        let catalog = SpeciesCatalog::builtin();
        let labels: Vec<String> = catalog.common_names().iter().map(|s| s.to_string()).collect();
        assert!(catalog.check_alignment(CATALOG_VERSION, &labels).is_ok());

        let mut swapped = labels.clone();
        swapped.swap(2, 3);
        let err = catalog.check_alignment(CATALOG_VERSION, &swapped).unwrap_err();
        assert!(err.contains("index 2"));

        assert!(catalog.check_alignment("species-v2", &labels).is_err());
    }
}
