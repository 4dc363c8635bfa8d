//! Outcome regressors.
//!
//! Each target (finishing position, win/podium/points probability) gets its own
//! gradient-boosted ensemble of shallow regression trees fitted on standardized
//! features. Split search works on per-feature quantile bins so a few thousand
//! synthetic races train in well under a second.

use linfa::prelude::*;
use ndarray::{Array1, Array2, ArrayView1, Axis, Ix1};
use tracing::debug;

use crate::config::TrainingConfig;
use crate::error::PredictorError;
use crate::features::FEATURE_COUNT;
use crate::noise::clip;
use crate::synthetic::TrainingSet;

pub type TargetDataset = Dataset<f64, f64, Ix1>;

/// Zero-mean, unit-variance scaling fitted on the training matrix.
/// Columns with no variance are mapped to zero.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Result<Self, PredictorError> {
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| PredictorError::Model("cannot fit scaler on empty matrix".into()))?;
        let std = x.std_axis(Axis(0), 0.0);
        Ok(Self { mean, std })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, PredictorError> {
        if x.ncols() != self.n_features() {
            return Err(PredictorError::Shape {
                expected: self.n_features(),
                actual: x.ncols(),
            });
        }
        let mut out = x.clone();
        for (col, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (m, s) = (self.mean[col], self.std[col]);
            column.mapv_inplace(|v| if s > f64::EPSILON { (v - m) / s } else { 0.0 });
        }
        Ok(out)
    }
}

/// Hyper-parameters of one boosted ensemble
#[derive(Debug, Clone, Copy)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub min_samples_leaf: usize,
    pub n_bins: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for BoostingParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_depth: config.max_depth,
            learning_rate: config.learning_rate,
            min_samples_leaf: config.min_samples_leaf.max(1),
            n_bins: config.n_bins.clamp(2, 255),
        }
    }
}

/// Quantile split candidates and the bin index of every cell, column-major.
struct BinnedFeatures {
    thresholds: Vec<Vec<f64>>,
    bins: Vec<Vec<u8>>,
}

impl BinnedFeatures {
    fn new(x: &Array2<f64>, n_bins: usize) -> Self {
        let n = x.nrows();
        let mut thresholds = Vec::with_capacity(x.ncols());
        let mut bins = Vec::with_capacity(x.ncols());

        for column in x.axis_iter(Axis(1)) {
            let mut sorted = column.to_vec();
            sorted.sort_by(f64::total_cmp);

            let mut cuts: Vec<f64> = (1..n_bins)
                .filter_map(|k| sorted.get((k * n / n_bins).saturating_sub(1)).copied())
                .collect();
            cuts.dedup();

            let col_bins = column
                .iter()
                .map(|v| cuts.partition_point(|t| t < v) as u8)
                .collect();
            thresholds.push(cuts);
            bins.push(col_bins);
        }

        Self { thresholds, bins }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Depth-limited least-squares regression tree; node 0 is the root.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    bin: usize,
    gain: f64,
}

impl RegressionTree {
    fn fit(binned: &BinnedFeatures, residuals: &[f64], params: &BoostingParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let rows: Vec<usize> = (0..residuals.len()).collect();
        tree.grow(binned, residuals, &rows, 0, params);
        tree
    }

    fn grow(
        &mut self,
        binned: &BinnedFeatures,
        residuals: &[f64],
        rows: &[usize],
        depth: usize,
        params: &BoostingParams,
    ) -> usize {
        let sum: f64 = rows.iter().map(|&r| residuals[r]).sum();
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf(sum / rows.len().max(1) as f64));

        if depth >= params.max_depth || rows.len() < 2 * params.min_samples_leaf {
            return idx;
        }
        let Some(split) = best_split(binned, residuals, rows, sum, params.min_samples_leaf) else {
            return idx;
        };

        let column = &binned.bins[split.feature];
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| (column[r] as usize) <= split.bin);

        let left = self.grow(binned, residuals, &left_rows, depth + 1, params);
        let right = self.grow(binned, residuals, &right_rows, depth + 1, params);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: binned.thresholds[split.feature][split.bin],
            left,
            right,
        };
        idx
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

fn best_split(
    binned: &BinnedFeatures,
    residuals: &[f64],
    rows: &[usize],
    total: f64,
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let n = rows.len();
    let parent = total * total / n as f64;
    let mut best: Option<SplitCandidate> = None;

    for (feature, cuts) in binned.thresholds.iter().enumerate() {
        if cuts.is_empty() {
            continue;
        }
        let column = &binned.bins[feature];
        let mut sums = vec![0.0; cuts.len() + 1];
        let mut counts = vec![0usize; cuts.len() + 1];
        for &r in rows {
            let b = column[r] as usize;
            sums[b] += residuals[r];
            counts[b] += 1;
        }

        let (mut left_sum, mut left_n) = (0.0, 0usize);
        for bin in 0..cuts.len() {
            left_sum += sums[bin];
            left_n += counts[bin];
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }
            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64
                - parent;
            // strict comparison keeps the first best split
            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate { feature, bin, gain });
            }
        }
    }
    best
}

/// Squared-loss gradient boosting over regression trees
#[derive(Debug, Clone)]
pub struct GradientBoostedRegressor {
    base: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    pub fn fit(dataset: &TargetDataset, params: &BoostingParams) -> Result<Self, PredictorError> {
        let x = &dataset.records;
        let y = &dataset.targets;
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(PredictorError::Model(format!(
                "cannot fit on {} rows with {} targets",
                x.nrows(),
                y.len()
            )));
        }

        let base = y.mean().unwrap_or(0.0);
        let binned = BinnedFeatures::new(x, params.n_bins);
        let mut current = vec![base; y.len()];
        let mut residuals = vec![0.0; y.len()];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            for (i, r) in residuals.iter_mut().enumerate() {
                *r = y[i] - current[i];
            }
            let tree = RegressionTree::fit(&binned, &residuals, params);
            for (i, row) in x.rows().into_iter().enumerate() {
                current[i] += params.learning_rate * tree.predict_row(row);
            }
            trees.push(tree);
        }

        Ok(Self {
            base,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                self.base
                    + self.learning_rate
                        * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
            })
            .collect()
    }
}

/// Raw model output for one competitor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOutput {
    pub position: f64,
    pub win: f64,
    pub podium: f64,
    pub points: f64,
}

/// The fitted scaler and the four target regressors
#[derive(Debug, Clone)]
pub struct OutcomeModels {
    scaler: StandardScaler,
    position: GradientBoostedRegressor,
    win: GradientBoostedRegressor,
    podium: GradientBoostedRegressor,
    points: GradientBoostedRegressor,
    samples: usize,
}

impl OutcomeModels {
    pub fn fit(set: &TrainingSet, params: &BoostingParams) -> Result<Self, PredictorError> {
        let scaler = StandardScaler::fit(&set.features)?;
        let scaled = scaler.transform(&set.features)?;

        let fit_target = |targets: &Array1<f64>| {
            let ds = Dataset::new(scaled.clone(), targets.clone());
            GradientBoostedRegressor::fit(&ds, params)
        };
        let position = fit_target(&set.position)?;
        let win = fit_target(&set.win)?;
        let podium = fit_target(&set.podium)?;
        let points = fit_target(&set.points)?;
        debug!(
            "fitted 4 ensembles of {} trees on {} samples",
            params.n_estimators,
            set.len()
        );

        Ok(Self {
            scaler,
            position,
            win,
            podium,
            points,
            samples: set.len(),
        })
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Scale, score and clip probabilities to [0, 1].
    pub fn predict(&self, features: &Array2<f64>) -> Result<Vec<ModelOutput>, PredictorError> {
        if features.ncols() != FEATURE_COUNT {
            return Err(PredictorError::Shape {
                expected: FEATURE_COUNT,
                actual: features.ncols(),
            });
        }
        let scaled = self.scaler.transform(features)?;
        let position = self.position.predict(&scaled);
        let win = self.win.predict(&scaled);
        let podium = self.podium.predict(&scaled);
        let points = self.points.predict(&scaled);

        let outputs: Vec<ModelOutput> = (0..features.nrows())
            .map(|i| ModelOutput {
                position: position[i],
                win: clip(win[i], 0.0, 1.0),
                podium: clip(podium[i], 0.0, 1.0),
                points: clip(points[i], 0.0, 1.0),
            })
            .collect();

        if outputs
            .iter()
            .any(|o| !(o.position.is_finite() && o.win.is_finite() && o.podium.is_finite() && o.points.is_finite()))
        {
            return Err(PredictorError::Model("non-finite model output".into()));
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn params(n_estimators: usize) -> BoostingParams {
        BoostingParams {
            n_estimators,
            max_depth: 3,
            learning_rate: 0.3,
            min_samples_leaf: 2,
            n_bins: 16,
        }
    }

    fn tree_depth(nodes: &[Node], idx: usize) -> usize {
        match &nodes[idx] {
            Node::Leaf(_) => 0,
            Node::Split { left, right, .. } => 1 + tree_depth(nodes, *left).max(tree_depth(nodes, *right)),
        }
    }

    #[test]
    fn test_scaler_standardizes_and_zeroes_constant_columns() {
        let x = array![[1.0, 5.0], [3.0, 5.0], [5.0, 5.0]];
        let scaler = StandardScaler::fit(&x).unwrap();
        let z = scaler.transform(&x).unwrap();
        assert!(z.column(0).sum().abs() < 1e-12);
        assert!(z.column(1).iter().all(|v| *v == 0.0));
        let var = z.column(0).mapv(|v| v * v).mean().unwrap();
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scaler_rejects_wrong_width() {
        let scaler = StandardScaler::fit(&array![[1.0, 2.0], [2.0, 3.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&array![[1.0, 2.0, 3.0]]),
            Err(PredictorError::Shape { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_boosting_learns_step_function() {
        let n = 200;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { i as f64 / n as f64 } else { 0.5 });
        let y: Array1<f64> = (0..n).map(|i| if i < n / 2 { 1.0 } else { 5.0 }).collect();
        let model = GradientBoostedRegressor::fit(&Dataset::new(x.clone(), y.clone()), &params(30)).unwrap();

        let pred = model.predict(&x);
        let mse = (&pred - &y).mapv(|e| e * e).mean().unwrap();
        assert!(mse < 0.05, "mse {}", mse);
        assert_eq!(model.trees.len(), 30);
    }

    #[test]
    fn test_constant_target_predicts_mean() {
        let x = Array2::from_shape_fn((50, 3), |(i, j)| (i * (j + 1)) as f64);
        let y = Array1::from_elem(50, 2.5);
        let model = GradientBoostedRegressor::fit(&Dataset::new(x.clone(), y), &params(5)).unwrap();
        for p in model.predict(&x) {
            assert!((p - 2.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tree_respects_max_depth() {
        let x = Array2::from_shape_fn((100, 1), |(i, _)| i as f64);
        let residuals: Vec<f64> = (0..100).map(|i| (i % 7) as f64).collect();
        let binned = BinnedFeatures::new(&x, 16);
        let tree = RegressionTree::fit(&binned, &residuals, &params(1));
        let depth = tree_depth(&tree.nodes, 0);
        assert!((1..=3).contains(&depth));
    }

    #[test]
    fn test_fit_rejects_empty() {
        let ds = Dataset::new(Array2::<f64>::zeros((0, 3)), Array1::<f64>::zeros(0));
        assert!(GradientBoostedRegressor::fit(&ds, &params(3)).is_err());
    }
}
