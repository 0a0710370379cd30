//! Depth-limited least-squares regression trees, the weak learners of the
//! boosted demand model.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

pub(crate) const N_FEATURES: usize = 2;

pub(crate) type Features = [f64; N_FEATURES];

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone)]
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

/// Binary regression tree stored as a flat node arena; index 0 is the root.
#[derive(Debug, Clone)]
pub(crate) struct RegressionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fits a tree to `targets` using only the samples listed in `rows`.
    ///
    /// `rng` permutes the candidate features at each node, so the order in
    /// which equally good splits are found is fixed by the seed.
    pub fn fit(
        samples: &[Features],
        targets: &[f64],
        rows: Vec<usize>,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(samples, targets, rows, 0, params, rng);
        tree
    }

    fn grow(
        &mut self,
        samples: &[Features],
        targets: &[f64],
        rows: Vec<usize>,
        depth: usize,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> usize {
        let idx = self.nodes.len();
        let value = if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|&r| targets[r]).sum::<f64>() / rows.len() as f64
        };
        self.nodes.push(Node::Leaf { value });

        let min_leaf = params.min_samples_leaf.max(1);
        if depth >= params.max_depth || rows.len() < 2 * min_leaf {
            return idx;
        }
        let Some(split) = best_split(samples, targets, &rows, min_leaf, rng) else {
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| samples[r][split.feature] <= split.threshold);
        let left = self.grow(samples, targets, left_rows, depth + 1, params, rng);
        let right = self.grow(samples, targets, right_rows, depth + 1, params, rng);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    pub fn predict(&self, features: &Features) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                None => return 0.0,
            }
        }
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Finds the split with the largest squared-error reduction.
///
/// Reduction for a candidate is `n_l * n_r / n * (mean_l - mean_r)^2`.
/// Thresholds sit halfway between adjacent distinct feature values.
fn best_split(
    samples: &[Features],
    targets: &[f64],
    rows: &[usize],
    min_leaf: usize,
    rng: &mut StdRng,
) -> Option<Split> {
    let mut features: [usize; N_FEATURES] = std::array::from_fn(|i| i);
    features.shuffle(rng);

    let n = rows.len();
    let total: f64 = rows.iter().map(|&r| targets[r]).sum();
    let mut order = rows.to_vec();
    let mut best: Option<Split> = None;

    for feature in features {
        order.sort_by(|&a, &b| samples[a][feature].total_cmp(&samples[b][feature]));

        let mut left_sum = 0.0;
        for i in 0..n - 1 {
            left_sum += targets[order[i]];
            let current = samples[order[i]][feature];
            let next = samples[order[i + 1]][feature];
            if next <= current {
                continue;
            }

            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let mean_left = left_sum / n_left as f64;
            let mean_right = (total - left_sum) / n_right as f64;
            let gain = (n_left * n_right) as f64 / n as f64 * (mean_left - mean_right).powi(2);
            if gain > 0.0 && best.is_none_or(|b| gain > b.gain) {
                best = Some(Split {
                    feature,
                    threshold: (current + next) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}
