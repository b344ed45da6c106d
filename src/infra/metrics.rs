// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends scalar records to a CSV file and mirrors them to the
// log, for an external plotting tool to pick up.
//
// One row per scalar: (kind, split, step, value)
//   kind   "loss" or "bleu"
//   split  "train", "test" or "eval"
//   step   global optimizer step for train loss, epoch otherwise
//
// Output file: {output_dir}/metrics.csv
//
// Example CSV output:
//   kind,split,step,value
//   loss,train,1,5.123400
//   loss,train,2,5.010200
//   ...
//   loss,test,1,3.982100
//   bleu,test,1,0.041200

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

/// One scalar metric record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub kind:  String,
    pub split: String,
    pub step:  usize,
    pub value: f64,
}

impl ScalarRecord {
    pub fn new(kind: &str, split: &str, step: usize, value: f64) -> Self {
        Self { kind: kind.to_string(), split: split.to_string(), step, value }
    }

    /// Tag in `kind/split` form, e.g. `loss/test`.
    pub fn tag(&self) -> String {
        format!("{}/{}", self.kind, self.split)
    }
}

/// Logs scalar records to a CSV file.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "kind,split,step,value")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one record as a new CSV row.
    pub fn log(&self, record: &ScalarRecord) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{},{},{:.6}",
            record.kind,
            record.split,
            record.step,
            record.value,
        )?;

        tracing::trace!("{} @ {} = {:.6}", record.tag(), record.step, record.value);
        Ok(())
    }

    /// Per-epoch scalar: appended to the CSV and printed.
    pub fn report_epoch(&self, kind: &str, split: &str, epoch: usize, value: f64) -> Result<()> {
        self.log(&ScalarRecord::new(kind, split, epoch, value))?;
        tracing::info!("Epoch {} {} {}: {:.6}", epoch, split, kind, value);
        Ok(())
    }

    /// Read every record back, in write order.
    pub fn read_all(&self) -> Result<Vec<ScalarRecord>> {
        let text = fs::read_to_string(&self.csv_path)?;
        text.lines()
            .skip(1)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let fields: Vec<&str> = line.split(',').collect();
                let [kind, split, step, value] = fields.as_slice() else {
                    anyhow::bail!("malformed metrics row: {line}");
                };
                Ok(ScalarRecord::new(kind, split, step.parse()?, value.parse()?))
            })
            .collect()
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
