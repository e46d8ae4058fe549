//! # Category Mapping
//!
//! Static many-to-many table from wire topic titles (source categories) to
//! output category names.
//!
//! - Rules are kept in declaration order; a topic maps to every rule whose
//!   source list contains it.
//! - Matching is exact string equality (no prefix or case folding).
//! - An unmatched topic maps to an empty list and is logged as a warning.

use serde::Deserialize;
use tracing::warn;

/// One output category and the wire topics that feed it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRule {
    pub target: String,
    pub sources: Vec<String>,
}

impl CategoryRule {
    fn new(target: &str, sources: &[&str]) -> Self {
        Self {
            target: target.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMapping {
    rules: Vec<CategoryRule>,
}

impl Default for CategoryMapping {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl CategoryMapping {
    pub fn from_rules(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    /// Built-in table for the BNS wire (https://sc.bns.lt/rss).
    pub fn default_seed() -> Self {
        let rules = vec![
            CategoryRule::new(
                "Aktualijos",
                &[
                    "Europos Sąjunga",
                    "Krašto apsauga",
                    "Politika",
                    "Savivalda, regionai",
                    "Švietimas",
                    "Tarptautiniai santykiai",
                    "Teisėsauga",
                ],
            ),
            CategoryRule::new(
                "Verslas",
                &[
                    "Energetika",
                    "IT&T",
                    "Maisto pramonė",
                    "NT, statyba",
                    "Pramonė, gamyba",
                    "Prekyba",
                    "Socialinė sauga",
                    "Transportas",
                    "Turizmas",
                    "Žiniasklaida",
                    "Žemės ūkis",
                    "Finansai",
                ],
            ),
            CategoryRule::new("Margumynai", &["Ekologija", "Gamta", "Kiti pranešimai"]),
            CategoryRule::new("Pramogos", &["Kultūra", "Laisvalaikis"]),
            CategoryRule::new("Sportas", &["Sportas"]),
            CategoryRule::new("Sveikata", &["Medicina, farmacija", "Sveikata"]),
            CategoryRule::new("Technologijos", &["IT&T"]),
            CategoryRule::new(
                "Ekonomika",
                &[
                    "Energetika",
                    "Maisto pramonė",
                    "NT, statyba",
                    "Pramonė, gamyba",
                    "Prekyba",
                    "Socialinė sauga",
                    "Turizmas",
                    "Žemės ūkis",
                    "Žiniasklaida",
                    "Ekonomika",
                    "Finansai",
                ],
            ),
            CategoryRule::new("Transportas", &["Transportas"]),
        ];
        Self { rules }
    }

    /// Every output category, first declaration wins, duplicates removed.
    pub fn all_categories(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            if !out.contains(&rule.target) {
                out.push(rule.target.clone());
            }
        }
        out
    }

    /// Resolve a lowercased route segment back to its category name.
    pub fn find_by_slug(&self, slug: &str) -> Option<String> {
        self.all_categories()
            .into_iter()
            .find(|c| c.to_lowercase() == slug)
    }

    /// Output categories for a wire topic title. Empty if unmapped.
    pub fn map_topic(&self, topic: &str) -> Vec<String> {
        let mut mapped: Vec<String> = Vec::new();
        for rule in &self.rules {
            if rule.sources.iter().any(|s| s == topic) && !mapped.contains(&rule.target) {
                mapped.push(rule.target.clone());
            }
        }

        if mapped.is_empty() {
            warn!(target: "ingest", topic, "topic not mapped to any category");
        }
        mapped
    }
}
