//! CART regression tree
//!
//! Greedy binary splits chosen by squared-error reduction, thresholds at the
//! midpoint between adjacent distinct feature values. Nodes live in a flat
//! vector; children are addressed by index.

use super::FeatureVector;
use crate::analysis::METRIC_COUNT;

/// Growth limits for one tree
#[derive(Debug, Clone, Copy)]
pub(super) struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Fitted regression tree
#[derive(Debug, Clone, PartialEq)]
pub(super) struct RegressionTree {
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl RegressionTree {
    /// Grow a tree on the rows of `features`/`labels` selected by `rows`.
    ///
    /// `rows` may repeat indices (bootstrap resample). Must not be empty.
    pub fn fit(
        features: &[FeatureVector],
        labels: &[f64],
        rows: Vec<usize>,
        params: TreeParams,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(features, labels, rows, 0, params);
        tree
    }

    /// Evaluate the tree at one feature vector
    pub fn predict(&self, x: &FeatureVector) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    /// Number of leaves
    #[cfg(test)]
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    fn grow(
        &mut self,
        features: &[FeatureVector],
        labels: &[f64],
        rows: Vec<usize>,
        depth: usize,
        params: TreeParams,
    ) -> usize {
        let id = self.nodes.len();
        let value = mean_label(labels, &rows);
        self.nodes.push(Node::Leaf { value });

        let depth_reached = params.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || rows.len() < params.min_samples_split || is_pure(labels, &rows) {
            return id;
        }

        let Some(split) = best_split(features, labels, &rows, params.min_samples_leaf) else {
            return id;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| features[r][split.feature] <= split.threshold);

        let left = self.grow(features, labels, left_rows, depth + 1, params);
        let right = self.grow(features, labels, right_rows, depth + 1, params);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_label(labels: &[f64], rows: &[usize]) -> f64 {
    rows.iter().map(|&r| labels[r]).sum::<f64>() / rows.len() as f64
}

fn is_pure(labels: &[f64], rows: &[usize]) -> bool {
    let first = labels[rows[0]];
    rows.iter().all(|&r| (labels[r] - first).abs() <= f64::EPSILON * first.abs().max(1.0))
}

/// Find the split maximizing `S_l²/n_l + S_r²/n_r`, which is equivalent to
/// minimizing the children's summed squared error.
#[allow(clippy::cast_precision_loss)]
fn best_split(
    features: &[FeatureVector],
    labels: &[f64],
    rows: &[usize],
    min_leaf: usize,
) -> Option<BestSplit> {
    let n = rows.len();
    let total: f64 = rows.iter().map(|&r| labels[r]).sum();
    let parent_score = total * total / n as f64;

    let mut best: Option<BestSplit> = None;
    let mut order = rows.to_vec();

    for feature in 0..METRIC_COUNT {
        order.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

        let mut left_sum = 0.0;
        for i in 0..n - 1 {
            left_sum += labels[order[i]];
            let here = features[order[i]][feature];
            let next = features[order[i + 1]][feature];
            let left_n = i + 1;
            let right_n = n - left_n;
            if here >= next || left_n < min_leaf || right_n < min_leaf {
                continue;
            }

            let right_sum = total - left_sum;
            let score =
                left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64;
            if best.as_ref().map_or(true, |b| score > b.score) {
                let mut threshold = here + (next - here) / 2.0;
                // Midpoint can round up to `next` for adjacent floats
                if threshold >= next {
                    threshold = here;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    score,
                });
            }
        }
    }

    best.filter(|b| b.score > parent_score + parent_score.abs() * 1e-12)
}
