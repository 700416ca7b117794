//! Bagged ensemble of CART decision trees (random forest).
//!
//! Each tree is grown on a bootstrap sample until its leaves are pure, trying
//! `sqrt(n_features)` randomly ordered features per split and carrying on past
//! that budget while every visited feature was constant. Class probabilities
//! are the mean of the per-tree leaf class fractions.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::utils::error::{ClassifierError, Result};

/// 差距小於此值的特徵值視為相同
const FEATURE_THRESHOLD: f64 = 1e-7;

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// `None` → floor(sqrt(n_features))
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_features: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// NaN 走訓練時權重較大的一側
        missing_goes_left: bool,
    },
}

#[derive(Debug, Clone)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn leaf_distribution(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    missing_goes_left,
                } => {
                    let value = features[*feature];
                    let go_left = if value.is_nan() {
                        *missing_goes_left
                    } else {
                        value <= *threshold
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    classes: Vec<String>,
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn fit(samples: &[Vec<f64>], labels: &[String], params: &ForestParams) -> Result<Self> {
        if samples.is_empty() {
            return Err(ClassifierError::processing("cannot train on an empty sample set"));
        }
        if samples.len() != labels.len() {
            return Err(ClassifierError::processing(format!(
                "{} samples but {} labels",
                samples.len(),
                labels.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(ClassifierError::processing("forest needs at least one tree"));
        }
        let n_features = samples[0].len();
        if n_features == 0 || samples.iter().any(|s| s.len() != n_features) {
            return Err(ClassifierError::processing(
                "training samples must share a non-empty feature length",
            ));
        }
        if samples.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ClassifierError::processing(
                "training features contain NaN; the resampling grid must lie inside the template range",
            ));
        }

        let mut classes: Vec<String> = labels.to_vec();
        classes.sort();
        classes.dedup();
        let targets: Vec<usize> = labels
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or(0))
            .collect();

        let max_features = params
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt() as usize)
            .clamp(1, n_features);

        let mut master = StdRng::seed_from_u64(params.seed);
        let n = samples.len();
        let trees = (0..params.n_estimators)
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(master.gen());
                let mut weights = vec![0.0; n];
                for _ in 0..n {
                    weights[rng.gen_range(0..n)] += 1.0;
                }
                let mut builder = TreeBuilder {
                    x: samples,
                    y: &targets,
                    weights: &weights,
                    n_classes: classes.len(),
                    max_features,
                    rng,
                    nodes: Vec::new(),
                };
                let in_bag: Vec<usize> = (0..n).filter(|&i| weights[i] > 0.0).collect();
                builder.build(in_bag);
                DecisionTree {
                    nodes: builder.nodes,
                }
            })
            .collect();

        Ok(Self {
            classes,
            trees,
            n_features,
        })
    }

    /// Sorted class labels; probability vectors follow this order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features {
            return Err(ClassifierError::processing(format!(
                "expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (p, d) in proba.iter_mut().zip(tree.leaf_distribution(features)) {
                *p += d;
            }
        }
        let n_trees = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        Ok(proba)
    }

    /// 回傳 (標籤, 該標籤機率)；平手時取字母序較前者
    pub fn predict(&self, features: &[f64]) -> Result<(String, f64)> {
        let proba = self.predict_proba(features)?;
        let (best, p) = proba
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bp), (i, &p)| {
                if p > bp {
                    (i, p)
                } else {
                    (bi, bp)
                }
            });
        Ok((self.classes[best].clone(), p))
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    weights: &'a [f64],
    n_classes: usize,
    max_features: usize,
    rng: StdRng,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, samples: Vec<usize>) -> usize {
        let distribution = self.class_weights(&samples);
        let occupied = distribution.iter().filter(|&&w| w > 0.0).count();

        if occupied > 1 {
            if let Some((feature, threshold)) = self.best_split(&samples, &distribution) {
                let idx = self.nodes.len();
                self.nodes.push(Node::Leaf {
                    distribution: Vec::new(),
                });

                let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
                    .iter()
                    .copied()
                    .partition(|&s| self.x[s][feature] <= threshold);
                let left_weight = self.total_weight(&left_samples);
                let right_weight = self.total_weight(&right_samples);

                let left = self.build(left_samples);
                let right = self.build(right_samples);
                self.nodes[idx] = Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    missing_goes_left: left_weight >= right_weight,
                };
                return idx;
            }
        }

        let total: f64 = distribution.iter().sum();
        let distribution = distribution.iter().map(|w| w / total).collect();
        self.nodes.push(Node::Leaf { distribution });
        self.nodes.len() - 1
    }

    fn class_weights(&self, samples: &[usize]) -> Vec<f64> {
        let mut weights = vec![0.0; self.n_classes];
        for &s in samples {
            weights[self.y[s]] += self.weights[s];
        }
        weights
    }

    fn total_weight(&self, samples: &[usize]) -> f64 {
        samples.iter().map(|&s| self.weights[s]).sum()
    }

    fn best_split(&mut self, samples: &[usize], parent: &[f64]) -> Option<(usize, f64)> {
        let n_features = self.x[0].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(&mut self.rng);

        let parent_total: f64 = parent.iter().sum();
        let mut best: Option<(f64, usize, f64)> = None;
        let mut visited = 0;

        for feature in features {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            visited += 1;

            let mut values: Vec<(f64, usize)> =
                samples.iter().map(|&s| (self.x[s][feature], s)).collect();
            values.sort_by(|a, b| a.0.total_cmp(&b.0));

            let (lowest, highest) = (values[0].0, values[values.len() - 1].0);
            if highest <= lowest + FEATURE_THRESHOLD {
                continue;
            }

            let mut left = vec![0.0; self.n_classes];
            let mut left_total = 0.0;
            for k in 0..values.len() - 1 {
                let (value, s) = values[k];
                left[self.y[s]] += self.weights[s];
                left_total += self.weights[s];

                let next = values[k + 1].0;
                if next <= value + FEATURE_THRESHOLD {
                    continue;
                }

                let right_total = parent_total - left_total;
                let right: Vec<f64> = parent.iter().zip(&left).map(|(p, l)| p - l).collect();
                let impurity = (left_total * gini(&left, left_total)
                    + right_total * gini(&right, right_total))
                    / parent_total;

                if best.map_or(true, |(b, _, _)| impurity < b) {
                    let mut threshold = value / 2.0 + next / 2.0;
                    if threshold == next || !threshold.is_finite() {
                        threshold = value;
                    }
                    best = Some((impurity, feature, threshold));
                }
            }
        }

        best.map(|(_, feature, threshold)| (feature, threshold))
    }
}

fn gini(weights: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - weights.iter().map(|w| (w / total).powi(2)).sum::<f64>()
}
