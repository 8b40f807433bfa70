//! Factor and portfolio input files. `.toml` files are read as TOML, anything
//! else as JSON.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use ptrs_core::FactorScore;

/// One entity of a `compare` input.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub factors: Vec<FactorScore>,
}

#[derive(Deserialize)]
struct FactorFile {
    factors: Vec<FactorScore>,
}

#[derive(Deserialize)]
struct PortfolioFile {
    entities: Vec<EntityRecord>,
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

fn read<J: DeserializeOwned, T: DeserializeOwned>(path: &Path) -> Result<Parsed<J, T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if is_toml(path) {
        let t = toml::from_str(&content)
            .with_context(|| format!("failed to parse TOML {}", path.display()))?;
        Ok(Parsed::Toml(t))
    } else {
        let j = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON {}", path.display()))?;
        Ok(Parsed::Json(j))
    }
}

enum Parsed<J, T> {
    Json(J),
    Toml(T),
}

pub fn read_factors(path: &Path) -> Result<Vec<FactorScore>> {
    let factors = match read::<Vec<FactorScore>, FactorFile>(path)? {
        Parsed::Json(f) => f,
        Parsed::Toml(f) => f.factors,
    };
    if factors.is_empty() {
        bail!("{} contains no factor records", path.display());
    }
    Ok(factors)
}

pub fn read_portfolio(path: &Path) -> Result<Vec<EntityRecord>> {
    let entities = match read::<Vec<EntityRecord>, PortfolioFile>(path)? {
        Parsed::Json(e) => e,
        Parsed::Toml(e) => e.entities,
    };
    if entities.is_empty() {
        bail!("{} contains no entities", path.display());
    }
    Ok(entities)
}
