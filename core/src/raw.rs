//! Permissive ingestion of the five CRM record collections.
//!
//! Raw records keep every field as `serde_json::Value` so that junk
//! (wrong types, missing keys, numeric strings) survives to the
//! cleaning pipeline, which is the single place that judges it.
//!
//! RULES:
//!   - A missing or unreadable file, or a file that is not a JSON
//!     array, fails the whole load.
//!   - An array element that is not an object is dropped and counted,
//!     never fatal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAccount {
    #[serde(default)]
    pub account_id: Value,
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub industry: Value,
    #[serde(default)]
    pub segment: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRep {
    #[serde(default)]
    pub rep_id: Value,
    #[serde(default)]
    pub name: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTarget {
    #[serde(default)]
    pub month: Value,
    #[serde(default)]
    pub target: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDeal {
    #[serde(default)]
    pub deal_id: Value,
    #[serde(default)]
    pub account_id: Value,
    #[serde(default)]
    pub rep_id: Value,
    #[serde(default)]
    pub stage: Value,
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub created_at: Value,
    #[serde(default)]
    pub closed_at: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawActivity {
    #[serde(default)]
    pub activity_id: Value,
    #[serde(default)]
    pub deal_id: Value,
    #[serde(rename = "type", default)]
    pub kind: Value,
    #[serde(default)]
    pub timestamp: Value,
}

/// The five collections exactly as ingested, pre-cleaning.
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    pub accounts: Vec<RawAccount>,
    pub reps: Vec<RawRep>,
    pub targets: Vec<RawTarget>,
    pub deals: Vec<RawDeal>,
    pub activities: Vec<RawActivity>,
}

impl RawDataset {
    /// Load all five collections from a dataset directory.
    pub fn load(data_dir: &str) -> anyhow::Result<RawDataset> {
        let dataset = RawDataset {
            accounts: load_collection(data_dir, "accounts.json")?,
            reps: load_collection(data_dir, "reps.json")?,
            targets: load_collection(data_dir, "targets.json")?,
            deals: load_collection(data_dir, "deals.json")?,
            activities: load_collection(data_dir, "activities.json")?,
        };
        log::info!(
            "loaded raw dataset from {data_dir}: accounts={} reps={} targets={} deals={} activities={}",
            dataset.accounts.len(),
            dataset.reps.len(),
            dataset.targets.len(),
            dataset.deals.len(),
            dataset.activities.len()
        );
        Ok(dataset)
    }

    /// Write all five collections into a dataset directory, one JSON
    /// array per file. Used by the runner to materialize synthetic
    /// datasets.
    pub fn write(&self, data_dir: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| anyhow::anyhow!("Cannot create {data_dir}: {e}"))?;
        write_collection(data_dir, "accounts.json", &self.accounts)?;
        write_collection(data_dir, "reps.json", &self.reps)?;
        write_collection(data_dir, "targets.json", &self.targets)?;
        write_collection(data_dir, "deals.json", &self.deals)?;
        write_collection(data_dir, "activities.json", &self.activities)?;
        Ok(())
    }
}

fn load_collection<T: serde::de::DeserializeOwned>(
    dir: &str,
    file: &str,
) -> anyhow::Result<Vec<T>> {
    let path = format!("{dir}/{file}");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    let parsed: Value = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
    let Value::Array(items) = parsed else {
        return Err(anyhow::anyhow!("{path} is not a JSON array"));
    };
    let mut records = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for item in items {
        match serde_json::from_value::<T>(item) {
            Ok(record) => records.push(record),
            Err(_) => dropped += 1,
        }
    }
    if dropped > 0 {
        log::debug!("{file}: dropped {dropped} non-object entries");
    }
    Ok(records)
}

fn write_collection<T: Serialize>(dir: &str, file: &str, records: &[T]) -> anyhow::Result<()> {
    let path = format!("{dir}/{file}");
    let content = serde_json::to_string_pretty(records)?;
    std::fs::write(&path, content).map_err(|e| anyhow::anyhow!("Cannot write {path}: {e}"))?;
    Ok(())
}
