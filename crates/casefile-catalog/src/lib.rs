//! Casefile case catalog
//!
//! A case is one self-contained investigation:
//! - a brief and a list of objectives (narrative, shown to the player)
//! - an ordered list of seed statements (the case database)
//! - an expected answer and an XP reward
//!
//! Cases are grouped into categories that unlock as the player earns XP.
//! The built-in cases are embedded JSON; a directory of `*.json` files can be
//! loaded instead (one case per file).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[cfg(test)]
mod tests;

// ============================================================================
// Core Types
// ============================================================================

/// Difficulty bucket a case belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryId {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl CategoryId {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryId::Beginner => "beginner",
            CategoryId::Intermediate => "intermediate",
            CategoryId::Advanced => "advanced",
            CategoryId::Expert => "expert",
        }
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: &'static str,
    /// XP a player needs before cases in this category can be opened.
    pub required_xp: u64,
    pub description: &'static str,
}

impl Category {
    pub fn is_unlocked(&self, xp: u64) -> bool {
        xp >= self.required_xp
    }
}

/// Category table, ordered by required XP.
pub const CATEGORIES: &[Category] = &[
    Category {
        id: CategoryId::Beginner,
        title: "Beginner Cases",
        required_xp: 0,
        description: "Perfect for SQL newcomers. Learn the basics of querying and data analysis.",
    },
    Category {
        id: CategoryId::Intermediate,
        title: "Intermediate Cases",
        required_xp: 100,
        description: "For investigators with basic SQL knowledge. Tackle joins and aggregates.",
    },
    Category {
        id: CategoryId::Advanced,
        title: "Advanced Cases",
        required_xp: 300,
        description: "Expert-level cases requiring deep SQL knowledge and problem-solving skills.",
    },
];

pub fn category(id: CategoryId) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub answer: String,
    pub success_message: String,
    pub explanation: String,
}

/// One investigation: narrative, seed statements and expected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub title: String,
    /// 1 (easy) through 5 (hard).
    pub difficulty: u8,
    pub description: String,
    pub xp_reward: u32,
    pub category: CategoryId,
    pub brief: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    pub solution: Solution,
    /// Ordered DDL/DML statements that seed the case database.
    pub schema: Vec<String>,
}

impl Case {
    /// Trimmed, case-insensitive comparison against the expected answer.
    pub fn check_answer(&self, answer: &str) -> bool {
        answer.trim().to_lowercase() == self.solution.answer.trim().to_lowercase()
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.id.trim().is_empty() {
            return Err(CatalogError::Invalid {
                case_id: self.id.clone(),
                message: "case id must not be empty".to_string(),
            });
        }
        if !(1..=5).contains(&self.difficulty) {
            return Err(CatalogError::Invalid {
                case_id: self.id.clone(),
                message: format!("difficulty {} is outside 1..=5", self.difficulty),
            });
        }
        if self.solution.answer.trim().is_empty() {
            return Err(CatalogError::Invalid {
                case_id: self.id.clone(),
                message: "solution answer must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse case file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid case `{case_id}`: {message}")]
    Invalid { case_id: String, message: String },
    #[error("duplicate case id `{0}`")]
    DuplicateCase(String),
}

// ============================================================================
// Catalog
// ============================================================================

const BUILTIN_CASES: &[(&str, &str)] = &[
    ("case-001.json", include_str!("cases/case-001.json")),
    ("case-002.json", include_str!("cases/case-002.json")),
    ("case-003.json", include_str!("cases/case-003.json")),
];

/// Immutable set of cases, in load order.
#[derive(Debug, Clone, Default)]
pub struct CaseCatalog {
    cases: Vec<Case>,
}

impl CaseCatalog {
    /// Build a catalog from already-parsed cases, rejecting duplicates.
    pub fn from_cases(cases: Vec<Case>) -> Result<Self, CatalogError> {
        let mut seen = BTreeSet::new();
        for case in &cases {
            case.validate()?;
            if !seen.insert(case.id.clone()) {
                return Err(CatalogError::DuplicateCase(case.id.clone()));
            }
        }
        Ok(Self { cases })
    }

    /// The cases shipped with the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        let mut cases = Vec::with_capacity(BUILTIN_CASES.len());
        for (name, text) in BUILTIN_CASES {
            cases.push(parse_case(name, text)?);
        }
        Self::from_cases(cases)
    }

    /// Load every `*.json` file in `dir` as one case, sorted by file name.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let io_err = |source: std::io::Error| CatalogError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().is_some_and(|e| e == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut cases = Vec::with_capacity(paths.len());
        for path in &paths {
            let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;
            cases.push(parse_case(&path.display().to_string(), &text)?);
        }
        tracing::debug!(dir = %dir.display(), count = cases.len(), "loaded case catalog");
        Self::from_cases(cases)
    }

    pub fn get(&self, id: &str) -> Option<&Case> {
        self.cases.iter().find(|c| c.id == id)
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn in_category(&self, id: CategoryId) -> impl Iterator<Item = &Case> {
        self.cases.iter().filter(move |c| c.category == id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.cases.iter().map(|c| c.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

fn parse_case(path: &str, text: &str) -> Result<Case, CatalogError> {
    serde_json::from_str(text).map_err(|source| CatalogError::Parse {
        path: path.to_string(),
        source,
    })
}
