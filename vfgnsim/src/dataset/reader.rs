//! Dataset access: metadata and per-split example files.
//!
//! Layout under `data_path`:
//! - `metadata.json` – dataset-level statistics, passed through verbatim into every record
//! - `<split>/<n>.json` – one example per file, yielded in numeric order

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::dataset::example::{Example, ExampleFile};
use crate::error::{RolloutError, RolloutResult};
use crate::simulation::params::{NormalizationStats, Stats};

/// Typed view of the statistics the engine needs
#[derive(Deserialize, Debug, Clone)]
struct MetadataFields {
    dim: usize,
    acc_mean: Vec<f64>,
    acc_std: Vec<f64>,
    vel_mean: Vec<f64>,
    vel_std: Vec<f64>,
    #[serde(default)]
    context_mean: Option<Vec<f64>>,
    #[serde(default)]
    context_std: Option<Vec<f64>>,
}

/// Dataset metadata: the raw JSON plus the fields used to build stats
#[derive(Debug, Clone)]
pub struct DatasetMetadata {
    pub raw: Value,
    fields: MetadataFields,
}

impl DatasetMetadata {
    pub fn from_value(raw: Value) -> RolloutResult<Self> {
        let fields: MetadataFields =
            serde_json::from_value(raw.clone()).map_err(|e| RolloutError::Configuration(format!("metadata: {e}")))?;
        Ok(Self { raw, fields })
    }

    /// Spatial dimension of particle positions
    pub fn dim(&self) -> usize {
        self.fields.dim
    }

    /// Build normalization stats, folding `noise_std` into every scale
    pub fn normalization_stats(&self, noise_std: f64) -> RolloutResult<NormalizationStats> {
        let f = &self.fields;
        let acceleration = Stats::new(f.acc_mean.clone(), &f.acc_std, noise_std)?;
        let velocity = Stats::new(f.vel_mean.clone(), &f.vel_std, noise_std)?;
        let context = match (&f.context_mean, &f.context_std) {
            (Some(mean), Some(std)) => Some(Stats::new(mean.clone(), std, noise_std)?),
            (None, None) => None,
            _ => {
                return Err(RolloutError::Configuration(
                    "metadata has only one of context_mean / context_std".to_string(),
                ))
            }
        };
        if acceleration.len() != f.dim {
            return Err(RolloutError::Configuration(format!(
                "acc_mean has {} components for dim {}",
                acceleration.len(),
                f.dim
            )));
        }
        Ok(NormalizationStats {
            acceleration,
            velocity,
            context,
        })
    }
}

/// Read `<data_path>/metadata.json`
pub fn read_metadata(data_path: &Path) -> RolloutResult<DatasetMetadata> {
    let path = data_path.join("metadata.json");
    let file = File::open(&path).map_err(|e| RolloutError::io(&path, e))?;
    let raw: Value = serde_json::from_reader(BufReader::new(file))?;
    DatasetMetadata::from_value(raw)
}

/// Yields the examples of one split, one file at a time
pub struct JsonExampleReader {
    files: Vec<PathBuf>,
    next: usize,
}

impl JsonExampleReader {
    pub fn open(data_path: &Path, split: &str) -> RolloutResult<Self> {
        let dir = data_path.join(split);
        let entries = fs::read_dir(&dir).map_err(|e| RolloutError::io(&dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| RolloutError::io(&dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        // numeric stems first, in numeric order, then the rest by name
        files.sort_by_key(|p| {
            let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
            (stem.parse::<u64>().map_err(|_| ()), stem)
        });

        Ok(Self { files, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Parse one example file
pub fn read_example(path: &Path) -> RolloutResult<Example> {
    let file = File::open(path).map_err(|e| RolloutError::io(path, e))?;
    let raw: ExampleFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| RolloutError::Dataset(format!("{}: {e}", path.display())))?;
    Example::try_from(raw)
}

impl Iterator for JsonExampleReader {
    type Item = RolloutResult<Example>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.files.get(self.next)?;
        self.next += 1;
        Some(read_example(path))
    }
}
