use std::collections::HashMap;

use fastrand::Rng;
use num_traits::Float;

use crate::random::shuffle;

/// Labeled examples for a search: one named-value mapping per row plus the
/// target value each row should reproduce.
#[derive(Clone, Debug)]
pub struct Dataset<T: Float> {
    pub parameters: Vec<String>,
    pub rows: Vec<HashMap<String, T>>,
    pub targets: Vec<T>,
}

impl<T: Float> Dataset<T> {
    pub fn new(
        parameters: Vec<String>,
        rows: Vec<HashMap<String, T>>,
        targets: Vec<T>,
    ) -> Self {
        assert_eq!(rows.len(), targets.len(), "rows and targets must pair up");
        Self {
            parameters,
            rows,
            targets,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Shuffle the rows and split off `test_fraction` of them (rounded) as a
    /// held-out set. Returns `(train, test)`.
    pub fn train_test_split(&self, test_fraction: f64, rng: &mut Rng) -> (Self, Self) {
        assert!(
            (0.0..1.0).contains(&test_fraction),
            "test fraction must be in [0, 1)"
        );
        let mut order: Vec<usize> = (0..self.len()).collect();
        shuffle(rng, &mut order);

        let n_test = ((self.len() as f64) * test_fraction).round() as usize;
        let (test_idx, train_idx) = order.split_at(n_test);

        let pick = |idx: &[usize]| {
            let rows = idx.iter().map(|&i| self.rows[i].clone()).collect();
            let targets = idx.iter().map(|&i| self.targets[i]).collect();
            Dataset {
                parameters: self.parameters.clone(),
                rows,
                targets,
            }
        };
        (pick(train_idx), pick(test_idx))
    }
}

#[cfg(feature = "cli")]
mod csv_io {
    use std::collections::HashMap;
    use std::path::Path;

    use anyhow::{bail, Context};

    use super::Dataset;

    impl Dataset<f64> {
        /// Load a headered CSV. `target` selects the target column by name;
        /// when absent the last column is the target and every other column
        /// is an input parameter.
        pub fn from_csv(path: &Path, target: Option<&str>) -> anyhow::Result<Self> {
            let mut rdr = csv::ReaderBuilder::new()
                .has_headers(true)
                .from_path(path)
                .with_context(|| format!("failed to open CSV {}", path.display()))?;

            let headers: Vec<String> = rdr
                .headers()
                .with_context(|| format!("failed to read CSV headers from {}", path.display()))?
                .iter()
                .map(|s| s.to_string())
                .collect();
            if headers.len() < 2 {
                bail!("need at least one input column and one target column");
            }

            let target_idx = match target {
                Some(name) => headers
                    .iter()
                    .position(|h| h == name)
                    .with_context(|| format!("target column {name:?} not found"))?,
                None => headers.len() - 1,
            };
            let parameters: Vec<String> = headers
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != target_idx)
                .map(|(_, h)| h.clone())
                .collect();

            let mut rows = Vec::new();
            let mut targets = Vec::new();
            for (row_idx, rec) in rdr.records().enumerate() {
                let row_num = row_idx + 1;
                let rec =
                    rec.with_context(|| format!("failed to read CSV record at row {row_num}"))?;
                if rec.len() != headers.len() {
                    bail!(
                        "ragged CSV at row {row_num}: expected {} fields but got {}",
                        headers.len(),
                        rec.len()
                    );
                }

                let mut row = HashMap::with_capacity(parameters.len());
                for (col_idx, raw) in rec.iter().enumerate() {
                    let parsed: f64 = raw.parse().with_context(|| {
                        format!("failed to parse float at row {row_num}, column {col_idx}: raw={raw:?}")
                    })?;
                    if col_idx == target_idx {
                        targets.push(parsed);
                    } else {
                        row.insert(headers[col_idx].clone(), parsed);
                    }
                }
                rows.push(row);
            }

            Ok(Dataset::new(parameters, rows, targets))
        }
    }
}
