//! CART decision trees, inference only.
//!
//! Trees are trained elsewhere and arrive fully built inside a model
//! artifact. Internal nodes send a sample left when
//! `x[feature_idx] <= threshold`.

use serde::{Deserialize, Serialize};

use crate::error::{FormcastError, Result};

/// Internal node in a classification tree.
///
/// Contains a split condition (feature and threshold) and pointers to
/// left and right subtrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Index of the feature to split on
    pub feature_idx: usize,
    /// Threshold value for the split
    pub threshold: f64,
    /// Left subtree (samples where feature <= threshold)
    pub left: Box<TreeNode>,
    /// Right subtree (samples where feature > threshold)
    pub right: Box<TreeNode>,
}

/// Leaf node in a classification tree.
///
/// Holds the (possibly weighted) number of training samples of each class
/// that reached this leaf, aligned with the tree's class list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    /// Per-class sample weight
    pub class_counts: Vec<f64>,
}

impl Leaf {
    /// Index of the majority class (first one on ties).
    #[must_use]
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &count) in self.class_counts.iter().enumerate() {
            if count > self.class_counts[best] {
                best = i;
            }
        }
        best
    }

    /// Class distribution at this leaf.
    #[must_use]
    pub fn probabilities(&self) -> Vec<f64> {
        let total: f64 = self.class_counts.iter().sum();
        if total <= 0.0 {
            let n = self.class_counts.len().max(1) as f64;
            return vec![1.0 / n; self.class_counts.len()];
        }
        self.class_counts.iter().map(|c| c / total).collect()
    }
}

/// A node in a classification tree (either internal node or leaf).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal decision node with split condition
    Node(Node),
    /// Leaf node with class counts
    Leaf(Leaf),
}

impl TreeNode {
    /// Returns the depth of the tree rooted at this node.
    ///
    /// Leaf nodes have depth 0, internal nodes have depth 1 + max(left, right).
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf(_) => 0,
            TreeNode::Node(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }

    fn leaf_for(&self, x: &[f64]) -> &Leaf {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf(leaf) => return leaf,
                TreeNode::Node(internal) => {
                    node = if x[internal.feature_idx] <= internal.threshold {
                        &internal.left
                    } else {
                        &internal.right
                    };
                }
            }
        }
    }

    fn check(&self, n_features: usize, n_classes: usize) -> Result<()> {
        match self {
            TreeNode::Leaf(leaf) => {
                if leaf.class_counts.len() != n_classes {
                    return Err(FormcastError::Format(format!(
                        "leaf has {} class counts, expected {n_classes}",
                        leaf.class_counts.len()
                    )));
                }
                if leaf.class_counts.iter().any(|c| !c.is_finite() || *c < 0.0) {
                    return Err(FormcastError::Format(
                        "leaf class counts must be finite and non-negative".to_string(),
                    ));
                }
                Ok(())
            }
            TreeNode::Node(node) => {
                check_split(node.feature_idx, node.threshold, n_features)?;
                node.left.check(n_features, n_classes)?;
                node.right.check(n_features, n_classes)
            }
        }
    }
}

/// Decision tree classifier with a fixed class list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    /// Class labels, indexed by leaf count position
    pub classes: Vec<String>,
    /// Root node
    pub tree: TreeNode,
}

impl DecisionTreeClassifier {
    /// Predicted class label for one sample.
    #[must_use]
    pub fn predict_one(&self, x: &[f64]) -> &str {
        let leaf = self.tree.leaf_for(x);
        &self.classes[leaf.argmax()]
    }

    /// Class distribution for one sample, aligned with `classes`.
    #[must_use]
    pub fn predict_proba_one(&self, x: &[f64]) -> Vec<f64> {
        self.tree.leaf_for(x).probabilities()
    }

    /// Depth of the tree.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.tree.depth()
    }

    pub(crate) fn check(&self, n_features: usize) -> Result<()> {
        if self.classes.is_empty() {
            return Err(FormcastError::Format(
                "classifier has no classes".to_string(),
            ));
        }
        self.tree.check(n_features, self.classes.len())
    }
}

/// Leaf node in a regression tree.
///
/// Contains the predicted value (mean of training targets) and number of
/// training samples that reached this leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionLeaf {
    /// Predicted value for this leaf
    pub value: f64,
    /// Number of training samples in this leaf
    #[serde(default)]
    pub n_samples: usize,
}

/// Internal node in a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionNode {
    /// Index of the feature to split on
    pub feature_idx: usize,
    /// Threshold value for the split
    pub threshold: f64,
    /// Left subtree (samples where feature <= threshold)
    pub left: Box<RegressionTreeNode>,
    /// Right subtree (samples where feature > threshold)
    pub right: Box<RegressionTreeNode>,
}

/// A node in a regression tree (either internal node or leaf).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegressionTreeNode {
    /// Internal decision node with split condition
    Node(RegressionNode),
    /// Leaf node with value prediction
    Leaf(RegressionLeaf),
}

impl RegressionTreeNode {
    /// Returns the depth of the tree rooted at this node.
    pub fn depth(&self) -> usize {
        match self {
            RegressionTreeNode::Leaf(_) => 0,
            RegressionTreeNode::Node(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }

    /// Predicted value for one sample.
    #[must_use]
    pub fn predict_one(&self, x: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                RegressionTreeNode::Leaf(leaf) => return leaf.value,
                RegressionTreeNode::Node(internal) => {
                    node = if x[internal.feature_idx] <= internal.threshold {
                        &internal.left
                    } else {
                        &internal.right
                    };
                }
            }
        }
    }

    pub(crate) fn check(&self, n_features: usize) -> Result<()> {
        match self {
            RegressionTreeNode::Leaf(leaf) if leaf.value.is_finite() => Ok(()),
            RegressionTreeNode::Leaf(_) => Err(FormcastError::Format(
                "regression leaf value must be finite".to_string(),
            )),
            RegressionTreeNode::Node(node) => {
                check_split(node.feature_idx, node.threshold, n_features)?;
                node.left.check(n_features)?;
                node.right.check(n_features)
            }
        }
    }
}

fn check_split(feature_idx: usize, threshold: f64, n_features: usize) -> Result<()> {
    if feature_idx >= n_features {
        return Err(FormcastError::Format(format!(
            "split on feature {feature_idx} but model declares {n_features} features"
        )));
    }
    if threshold.is_nan() {
        return Err(FormcastError::Format("split threshold is NaN".to_string()));
    }
    Ok(())
}
