//! Static Crop Tables
//!
//! Per-crop nutrient uptake, seasonal water need and rotation partners,
//! loaded once from CSV with Polars and kept as immutable lookup maps.
//!
//! Files under the data directory:
//! - `crop_requirements.csv`: `crop,n,p,k,water_mm`
//! - `crop_rotation.csv`: `crop,successors,reason,benefit` (successors
//!   pipe-separated; several rows per crop allowed)

use anyhow::{Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::Path;

pub const REQUIREMENTS_FILE: &str = "crop_requirements.csv";
pub const ROTATION_FILE: &str = "crop_rotation.csv";

/// Nutrient uptake (kg/ha per season) and water need (mm per season)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRequirement {
    pub n: f64,
    pub p: f64,
    pub k: f64,
    pub water_mm: f64,
}

/// Successor crops with the agronomic reason for planting them next
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotationSuggestion {
    pub reason: String,
    pub crops: Vec<String>,
    pub benefit: String,
}

/// Requirement and rotation lookups keyed by lowercase crop name
#[derive(Debug, Clone, Default)]
pub struct CropTables {
    requirements: FxHashMap<String, CropRequirement>,
    rotations: FxHashMap<String, Vec<RotationSuggestion>>,
}

impl CropTables {
    /// Load both tables from `data_dir`
    pub fn load(data_dir: &Path) -> Result<Self> {
        let requirements = read_csv(&data_dir.join(REQUIREMENTS_FILE))?;
        let rotations = read_csv(&data_dir.join(ROTATION_FILE))?;
        let tables = Self::from_frames(&requirements, &rotations)?;

        tracing::info!(
            "Loaded crop tables: {} requirement rows, {} crops with rotation partners",
            tables.requirements.len(),
            tables.rotations.len()
        );
        Ok(tables)
    }

    pub fn from_frames(requirements: &DataFrame, rotations: &DataFrame) -> Result<Self> {
        Ok(Self {
            requirements: Self::requirement_map(requirements)?,
            rotations: Self::rotation_map(rotations)?,
        })
    }

    /// Crops with a requirement entry
    pub fn crops(&self) -> impl Iterator<Item = &str> {
        self.requirements.keys().map(String::as_str)
    }

    pub fn requirement(&self, crop: &str) -> Option<&CropRequirement> {
        self.requirements.get(&normalize(crop))
    }

    /// Rotation suggestions for `crop`; empty when it has no documented partners
    pub fn rotations(&self, crop: &str) -> &[RotationSuggestion] {
        self.rotations
            .get(&normalize(crop))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn requirement_map(df: &DataFrame) -> Result<FxHashMap<String, CropRequirement>> {
        let crops = string_column(df, "crop")?;
        let n = float_column(df, "n")?;
        let p = float_column(df, "p")?;
        let k = float_column(df, "k")?;
        let water = float_column(df, "water_mm")?;

        let mut map = FxHashMap::default();
        for idx in 0..df.height() {
            let row = (crops.get(idx), n.get(idx), p.get(idx), k.get(idx), water.get(idx));
            match row {
                (Some(crop), Some(n), Some(p), Some(k), Some(water_mm)) => {
                    map.insert(normalize(crop), CropRequirement { n, p, k, water_mm });
                }
                _ => anyhow::bail!("Incomplete crop requirement row {}", idx + 1),
            }
        }
        Ok(map)
    }

    fn rotation_map(df: &DataFrame) -> Result<FxHashMap<String, Vec<RotationSuggestion>>> {
        let crops = string_column(df, "crop")?;
        let successors = string_column(df, "successors")?;
        let reasons = string_column(df, "reason")?;
        let benefits = string_column(df, "benefit")?;

        let mut map: FxHashMap<String, Vec<RotationSuggestion>> = FxHashMap::default();
        for idx in 0..df.height() {
            if let (Some(crop), Some(successor_str)) = (crops.get(idx), successors.get(idx)) {
                let crops: Vec<String> = successor_str
                    .split('|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect();

                if !crops.is_empty() {
                    map.entry(normalize(crop)).or_default().push(RotationSuggestion {
                        reason: reasons.get(idx).unwrap_or_default().to_string(),
                        crops,
                        benefit: benefits.get(idx).unwrap_or_default().to_string(),
                    });
                }
            }
        }
        Ok(map)
    }
}

fn normalize(crop: &str) -> String {
    crop.trim().to_lowercase()
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.into()))
        .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
        .finish()
        .with_context(|| format!("Failed to load crop table: {:?}", path))
}

fn string_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    df.column(name)
        .with_context(|| format!("Column '{}' not found", name))?
        .str()
        .with_context(|| format!("Column '{}' is not string type", name))
}

fn float_column(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let column = df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", name))?;
    Ok(column
        .f64()
        .with_context(|| format!("Column '{}' is not numeric", name))?
        .clone())
}
