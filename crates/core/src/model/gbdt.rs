//! Gradient-boosted tree ensemble loaded from a LightGBM `dump_model()` JSON file.

use crate::engine::features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use crate::error::ForecastError;
use crate::model::{ModelAdapter, ModelSummary};
use serde::Deserialize;
use std::path::Path;

const ZERO_THRESHOLD: f64 = 1e-35;

const UNSUPPORTED_OBJECTIVES: [&str; 7] = [
    "binary",
    "multiclass",
    "multiclassova",
    "cross_entropy",
    "cross_entropy_lambda",
    "lambdarank",
    "rank_xendcg",
];

#[derive(Debug, Deserialize)]
struct DumpedModel {
    #[serde(default)]
    objective: Option<String>,
    max_feature_idx: usize,
    #[serde(default)]
    num_class: Option<usize>,
    #[serde(default)]
    average_output: bool,
    #[serde(default)]
    feature_names: Vec<String>,
    tree_info: Vec<DumpedTree>,
}

#[derive(Debug, Deserialize)]
struct DumpedTree {
    tree_structure: DumpedNode,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DumpedNode {
    Split {
        split_feature: usize,
        threshold: DumpedThreshold,
        decision_type: String,
        #[serde(default)]
        default_left: bool,
        #[serde(default)]
        missing_type: Option<String>,
        left_child: Box<DumpedNode>,
        right_child: Box<DumpedNode>,
    },
    Leaf {
        leaf_value: f64,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DumpedThreshold {
    Numeric(f64),
    Categories(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingType {
    None,
    Zero,
    NaN,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputTransform {
    Identity,
    Exp,
    /// `reg_sqrt` models are trained on sqrt(label); output is `sign(x) * x^2`.
    SignedSquare,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Numerical {
        feature: usize,
        threshold: f64,
        default_left: bool,
        missing: MissingType,
        left: Box<Node>,
        right: Box<Node>,
    },
    Categorical {
        feature: usize,
        categories: Vec<i64>,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone)]
pub struct GbdtModel {
    objective: String,
    transform: OutputTransform,
    average_output: bool,
    feature_names: Vec<String>,
    trees: Vec<Node>,
}

impl GbdtModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForecastError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::ModelUnavailable(format!("failed to read {}: {e}", path.display()))
        })?;
        let model = Self::from_json_str(&text)?;

        tracing::debug!(
            path = %path.display(),
            objective = %model.objective,
            num_trees = model.trees.len(),
            "loaded tree ensemble"
        );
        Ok(model)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ForecastError> {
        let dumped = serde_json::from_str::<DumpedModel>(text).map_err(|e| {
            ForecastError::ModelUnavailable(format!("model dump is not valid JSON: {e}"))
        })?;
        Self::from_dump(dumped)
    }

    fn from_dump(dumped: DumpedModel) -> Result<Self, ForecastError> {
        let num_features = dumped.max_feature_idx + 1;
        if num_features != FEATURE_COUNT {
            return Err(unavailable(format!(
                "model expects {num_features} features, forecasting uses {FEATURE_COUNT}"
            )));
        }

        if let Some(num_class) = dumped.num_class {
            if num_class != 1 {
                return Err(unavailable(format!(
                    "model must be a single-output regressor (num_class={num_class})"
                )));
            }
        }

        check_feature_names(&dumped.feature_names)?;

        let objective = dumped
            .objective
            .unwrap_or_else(|| "regression".to_string());
        let transform = output_transform(&objective)?;

        if dumped.tree_info.is_empty() {
            return Err(unavailable("model has no trees".to_string()));
        }

        let trees = dumped
            .tree_info
            .into_iter()
            .enumerate()
            .map(|(idx, t)| {
                compile_node(t.tree_structure)
                    .map_err(|e| unavailable(format!("tree {idx}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let feature_names = if dumped.feature_names.is_empty() {
            FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
        } else {
            dumped.feature_names
        };

        Ok(Self {
            objective,
            transform,
            average_output: dumped.average_output,
            feature_names,
            trees,
        })
    }

    fn raw_score(&self, values: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| walk(t, values)).sum();
        if self.average_output {
            sum / self.trees.len() as f64
        } else {
            sum
        }
    }
}

impl ModelAdapter for GbdtModel {
    fn summary(&self) -> ModelSummary {
        ModelSummary {
            objective: self.objective.clone(),
            num_trees: self.trees.len(),
            num_features: FEATURE_COUNT,
            feature_names: self.feature_names.clone(),
        }
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, ForecastError> {
        let score = self.raw_score(features.as_slice());
        let out = match self.transform {
            OutputTransform::Identity => score,
            OutputTransform::Exp => score.exp(),
            OutputTransform::SignedSquare => score.signum() * score * score,
        };
        if !out.is_finite() {
            return Err(ForecastError::PredictionFailure(format!(
                "tree ensemble produced {out}"
            )));
        }
        Ok(out)
    }
}

fn unavailable(detail: String) -> ForecastError {
    ForecastError::ModelUnavailable(detail)
}

// Auto-generated `Column_<i>` names carry no order information, anything else must match.
fn check_feature_names(names: &[String]) -> Result<(), ForecastError> {
    if names.is_empty() {
        return Ok(());
    }
    let auto_generated = names
        .iter()
        .enumerate()
        .all(|(i, n)| *n == format!("Column_{i}"));
    if auto_generated || names.iter().map(String::as_str).eq(FEATURE_NAMES) {
        return Ok(());
    }
    Err(unavailable(format!(
        "feature names {names:?} do not match expected order {FEATURE_NAMES:?}"
    )))
}

fn output_transform(objective: &str) -> Result<OutputTransform, ForecastError> {
    let name = objective.split_whitespace().next().unwrap_or("regression");
    if UNSUPPORTED_OBJECTIVES.contains(&name) {
        return Err(unavailable(format!(
            "objective {name:?} is not a regression objective"
        )));
    }
    let reg_sqrt = objective.split_whitespace().skip(1).any(|t| t == "sqrt");
    Ok(match name {
        "poisson" | "tweedie" | "gamma" if reg_sqrt => {
            return Err(unavailable(format!(
                "objective {objective:?} combines a log link with sqrt"
            )))
        }
        "poisson" | "tweedie" | "gamma" => OutputTransform::Exp,
        _ if reg_sqrt => OutputTransform::SignedSquare,
        _ => OutputTransform::Identity,
    })
}

fn compile_node(node: DumpedNode) -> Result<Node, String> {
    let (split_feature, threshold, decision_type, default_left, missing_type, left, right) =
        match node {
            DumpedNode::Leaf { leaf_value } => return Ok(Node::Leaf(leaf_value)),
            DumpedNode::Split {
                split_feature,
                threshold,
                decision_type,
                default_left,
                missing_type,
                left_child,
                right_child,
            } => (
                split_feature,
                threshold,
                decision_type,
                default_left,
                missing_type,
                left_child,
                right_child,
            ),
        };

    if split_feature >= FEATURE_COUNT {
        return Err(format!("split on unknown feature index {split_feature}"));
    }

    let left = Box::new(compile_node(*left)?);
    let right = Box::new(compile_node(*right)?);

    match decision_type.as_str() {
        "<=" => {
            let threshold = match threshold {
                DumpedThreshold::Numeric(t) => t,
                DumpedThreshold::Categories(s) => s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| format!("numerical split with threshold {s:?}"))?,
            };
            let missing = match missing_type.as_deref().unwrap_or("None") {
                "None" => MissingType::None,
                "Zero" => MissingType::Zero,
                "NaN" => MissingType::NaN,
                other => return Err(format!("unknown missing_type {other:?}")),
            };
            Ok(Node::Numerical {
                feature: split_feature,
                threshold,
                default_left,
                missing,
                left,
                right,
            })
        }
        "==" => {
            let categories = match threshold {
                DumpedThreshold::Numeric(t) if t.fract() == 0.0 => vec![t as i64],
                DumpedThreshold::Numeric(t) => {
                    return Err(format!("categorical split with threshold {t}"))
                }
                DumpedThreshold::Categories(s) => s
                    .split("||")
                    .map(|c| c.trim().parse::<i64>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| format!("bad category list {s:?}"))?,
            };
            Ok(Node::Categorical {
                feature: split_feature,
                categories,
                left,
                right,
            })
        }
        other => Err(format!("unknown decision_type {other:?}")),
    }
}

fn walk(root: &Node, values: &[f64]) -> f64 {
    let mut node = root;
    loop {
        node = match node {
            Node::Leaf(v) => return *v,
            Node::Numerical {
                feature,
                threshold,
                default_left,
                missing,
                left,
                right,
            } => {
                let mut x = values[*feature];
                if x.is_nan() && *missing != MissingType::NaN {
                    x = 0.0;
                }
                let take_default = (*missing == MissingType::Zero && x.abs() <= ZERO_THRESHOLD)
                    || (*missing == MissingType::NaN && x.is_nan());
                let go_left = if take_default {
                    *default_left
                } else {
                    x <= *threshold
                };
                if go_left {
                    left
                } else {
                    right
                }
            }
            Node::Categorical {
                feature,
                categories,
                left,
                right,
            } => {
                let x = values[*feature];
                let in_set = !x.is_nan() && x >= 0.0 && categories.contains(&(x as i64));
                if in_set {
                    left
                } else {
                    right
                }
            }
        };
    }
}
