//! Heading labels and the classifier capability.
//!
//! The classifier is a black box from a [`FeatureMatrix`] to one [`Label`]
//! per row. [`TreeEnsemble`] is the bundled implementation: a decision tree
//! or random forest exported from a training run as plain JSON arrays.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::features::FeatureRow;
use crate::normalize::{FeatureMatrix, NormalizedDocument, FEATURE_COLUMNS};
use crate::Error;

/// Structural role assigned to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Title,
    /// Heading level, 1 is the outermost.
    Heading(u8),
    /// Body text. Rendered as `None`, the name the classifier uses.
    Body,
}

impl Label {
    pub const H1: Self = Label::Heading(1);
    pub const H2: Self = Label::Heading(2);

    /// Labels that open a new section block.
    pub fn starts_section(&self) -> bool {
        matches!(self, Label::Title | Label::Heading(1) | Label::Heading(2))
    }

    pub fn is_body(&self) -> bool {
        matches!(self, Label::Body)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Title => write!(f, "Title"),
            Label::Heading(level) => write!(f, "H{}", level),
            Label::Body => write!(f, "None"),
        }
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Title" | "title" => Ok(Label::Title),
            "None" | "none" => Ok(Label::Body),
            other => other
                .strip_prefix(['H', 'h'])
                .and_then(|level| level.parse::<u8>().ok())
                .filter(|level| (1..=6).contains(level))
                .map(Label::Heading)
                .ok_or_else(|| Error::UnknownLabel(other.to_string())),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A feature row together with the label the classifier gave it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledRow {
    pub row: FeatureRow,
    pub label: Label,
}

/// Anything that can label the rows of a feature matrix.
pub trait HeadingClassifier: Send + Sync {
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>, Error>;
}

/// Run `classifier` over one normalized document.
///
/// The number of labels must match the number of rows; anything else is a
/// shape mismatch and the document should be skipped.
pub fn label_document(
    document: NormalizedDocument,
    classifier: &dyn HeadingClassifier,
) -> Result<Vec<LabeledRow>, Error> {
    let matrix = document.matrix();
    let labels = classifier.predict(&matrix)?;

    if labels.len() != document.rows.len() {
        return Err(Error::ShapeMismatch(format!(
            "{}: classifier returned {} labels for {} rows",
            document.document,
            labels.len(),
            document.rows.len()
        )));
    }

    Ok(document
        .rows
        .into_iter()
        .zip(labels)
        .map(|(normalized, label)| LabeledRow {
            row: normalized.row,
            label,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Tree ensemble
// ---------------------------------------------------------------------------

/// One decision tree in the flat array layout used by scikit-learn's
/// `tree_` attribute. A node is a leaf when its left child is negative.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights, one entry per class.
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), Error> {
        let n = self.children_left.len();
        if n == 0 {
            return Err(Error::InvalidModel("tree has no nodes".into()));
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(Error::InvalidModel("tree node arrays differ in length".into()));
        }

        for node in 0..n {
            let left = self.children_left[node];
            let right = self.children_right[node];
            if left < 0 {
                if self.value[node].len() != n_classes {
                    return Err(Error::InvalidModel(format!(
                        "leaf {} has {} class weights, expected {}",
                        node,
                        self.value[node].len(),
                        n_classes
                    )));
                }
                continue;
            }
            let in_range = |child: i64| child > node as i64 && (child as usize) < n;
            if !in_range(left) || !in_range(right) {
                return Err(Error::InvalidModel(format!(
                    "node {} has out-of-range children",
                    node
                )));
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(Error::InvalidModel(format!(
                    "node {} splits on unknown feature {}",
                    node, feature
                )));
            }
        }
        Ok(())
    }

    /// Class probabilities at the leaf reached by `x`.
    fn leaf_distribution(&self, x: &[f64]) -> Vec<f64> {
        let mut node = 0usize;
        while self.children_left[node] >= 0 {
            let feature = self.feature[node] as usize;
            node = if x[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }

        let weights = &self.value[node];
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            weights.iter().map(|w| w / total).collect()
        } else {
            vec![0.0; weights.len()]
        }
    }
}

/// Decision tree ensemble deserialized from JSON.
///
/// ```json
/// {
///   "feature_names": ["Font Ratio", "Font Size Rank", ...],
///   "classes": ["H1", "H2", "None", "Title"],
///   "trees": [{ "children_left": [...], "children_right": [...],
///               "feature": [...], "threshold": [...], "value": [[...]] }]
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct TreeEnsemble {
    pub feature_names: Vec<String>,
    pub classes: Vec<Label>,
    pub trees: Vec<DecisionTree>,
}

#[derive(Deserialize)]
struct RawEnsemble {
    feature_names: Vec<String>,
    classes: Vec<String>,
    trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    /// Parse and validate a model exported as JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let raw: RawEnsemble =
            serde_json::from_str(json).map_err(|e| Error::InvalidModel(e.to_string()))?;

        if raw.feature_names != FEATURE_COLUMNS {
            return Err(Error::InvalidModel(format!(
                "model expects features {:?}, pipeline produces {:?}",
                raw.feature_names, FEATURE_COLUMNS
            )));
        }
        if raw.classes.is_empty() {
            return Err(Error::InvalidModel("model has no classes".into()));
        }
        if raw.trees.is_empty() {
            return Err(Error::InvalidModel("model has no trees".into()));
        }

        let classes = raw
            .classes
            .iter()
            .map(|c| c.parse::<Label>())
            .collect::<Result<Vec<_>, _>>()?;

        for tree in &raw.trees {
            tree.validate(raw.feature_names.len(), classes.len())?;
        }

        Ok(Self {
            feature_names: raw.feature_names,
            classes,
            trees: raw.trees,
        })
    }

    /// Average the trees' leaf distributions and take the most likely class.
    /// Ties go to the class listed first.
    fn predict_row(&self, x: &[f64]) -> Label {
        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.leaf_distribution(x)) {
                *acc += p;
            }
        }

        let mut best = 0;
        for (i, p) in proba.iter().enumerate().skip(1) {
            if *p > proba[best] {
                best = i;
            }
        }
        self.classes[best]
    }
}

impl HeadingClassifier for TreeEnsemble {
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>, Error> {
        if matrix.width() != self.feature_names.len() {
            return Err(Error::ShapeMismatch(format!(
                "model expects {} features, matrix has {}",
                self.feature_names.len(),
                matrix.width()
            )));
        }
        if let Some(bad) = matrix.rows.iter().find(|r| r.len() != matrix.width()) {
            return Err(Error::ShapeMismatch(format!(
                "matrix row has {} values, expected {}",
                bad.len(),
                matrix.width()
            )));
        }

        Ok(matrix.rows.iter().map(|x| self.predict_row(x)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::FEATURE_COUNT;

    /// One split on Font Ratio (column 0): > 1.5 is a heading.
    fn stump_json(threshold: f64) -> String {
        serde_json::json!({
            "feature_names": FEATURE_COLUMNS,
            "classes": ["H1", "None"],
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [0, -2, -2],
                "threshold": [threshold, -2.0, -2.0],
                "value": [[5.0, 5.0], [0.0, 10.0], [8.0, 2.0]]
            }]
        })
        .to_string()
    }

    fn matrix(font_ratios: &[f64]) -> FeatureMatrix {
        FeatureMatrix {
            columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: font_ratios
                .iter()
                .map(|&r| {
                    let mut row = vec![0.0; FEATURE_COUNT];
                    row[0] = r;
                    row
                })
                .collect(),
        }
    }

    #[test]
    fn test_label_parse_and_display() {
        assert_eq!("Title".parse::<Label>().unwrap(), Label::Title);
        assert_eq!("H1".parse::<Label>().unwrap(), Label::H1);
        assert_eq!("h3".parse::<Label>().unwrap(), Label::Heading(3));
        assert_eq!("none".parse::<Label>().unwrap(), Label::Body);
        assert_eq!(Label::Body.to_string(), "None");
        assert_eq!(Label::Heading(2).to_string(), "H2");
        assert!("H0".parse::<Label>().is_err());
        assert!("Footer".parse::<Label>().is_err());
    }

    #[test]
    fn test_section_labels() {
        assert!(Label::Title.starts_section());
        assert!(Label::H1.starts_section());
        assert!(Label::H2.starts_section());
        assert!(!Label::Heading(3).starts_section());
        assert!(!Label::Body.starts_section());
    }

    #[test]
    fn test_label_serializes_as_string() {
        let json = serde_json::to_string(&vec![Label::Title, Label::Body]).unwrap();
        assert_eq!(json, r#"["Title","None"]"#);
    }

    #[test]
    fn test_stump_prediction() {
        let model = TreeEnsemble::from_json(&stump_json(1.5)).unwrap();
        let labels = model.predict(&matrix(&[1.0, 2.2, 1.5])).unwrap();
        assert_eq!(labels, vec![Label::Body, Label::H1, Label::Body]);
    }

    #[test]
    fn test_forest_averages_and_ties_go_first() {
        let mut json: serde_json::Value = serde_json::from_str(&stump_json(1.5)).unwrap();
        // Second tree always votes fully for "None", so a 0.8/0.2 leaf from
        // the first tree averages to 0.4/0.6.
        json["trees"].as_array_mut().unwrap().push(serde_json::json!({
            "children_left": [-1],
            "children_right": [-1],
            "feature": [-2],
            "threshold": [-2.0],
            "value": [[0.0, 1.0]]
        }));
        let model = TreeEnsemble::from_json(&json.to_string()).unwrap();
        assert_eq!(model.predict(&matrix(&[3.0])).unwrap(), vec![Label::Body]);

        // Equal averaged weights pick the first class.
        json["trees"][1]["value"] = serde_json::json!([[2.0, 8.0]]);
        let model = TreeEnsemble::from_json(&json.to_string()).unwrap();
        assert_eq!(model.predict(&matrix(&[3.0])).unwrap(), vec![Label::H1]);
    }

    #[test]
    fn test_feature_names_must_match_pipeline() {
        let mut json: serde_json::Value = serde_json::from_str(&stump_json(1.5)).unwrap();
        json["feature_names"][0] = serde_json::json!("Font Size");
        let err = TreeEnsemble::from_json(&json.to_string()).unwrap_err();
        assert!(matches!(err, Error::InvalidModel(_)));
    }

    #[test]
    fn test_unknown_class_rejected() {
        let json = stump_json(1.5).replace("\"H1\"", "\"Caption\"");
        let err = TreeEnsemble::from_json(&json).unwrap_err();
        assert!(matches!(err, Error::UnknownLabel(_)));
    }

    #[test]
    fn test_malformed_tree_rejected() {
        let json = stump_json(1.5).replace("[1,-1,-1]", "[7,-1,-1]");
        assert!(TreeEnsemble::from_json(&json).is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let model = TreeEnsemble::from_json(&stump_json(1.5)).unwrap();
        let narrow = FeatureMatrix {
            columns: vec!["Font Ratio".to_string()],
            rows: vec![vec![2.0]],
        };
        assert!(matches!(
            model.predict(&narrow),
            Err(Error::ShapeMismatch(_))
        ));
    }

    struct ShortClassifier;

    impl HeadingClassifier for ShortClassifier {
        fn predict(&self, _matrix: &FeatureMatrix) -> Result<Vec<Label>, Error> {
            Ok(vec![Label::Title])
        }
    }

    #[test]
    fn test_label_document_rejects_wrong_label_count() {
        let rows = vec![
            crate::features::FeatureRow {
                document: "doc.pdf".into(),
                page: 1,
                text: "First row".into(),
                font_size: 12.0,
                is_bold: false,
                is_italic: false,
                text_length: 9,
                capitalization_ratio: 0.1,
                starts_with_numbering: false,
                numbering_depth: 0,
                y: 10.0,
                gap: None,
            };
            2
        ];
        let doc = crate::normalize::normalize_document("doc.pdf", rows).unwrap();
        let err = label_document(doc, &ShortClassifier).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }
}
