use std::path::{Path, PathBuf};
use std::sync::Arc;

use docsift_core::classify::{HeadingClassifier, TreeEnsemble};

use crate::prelude::*;

/// Pick the model path from the CLI flag, falling back to settings.
pub fn model_path(flag: Option<PathBuf>, configured: Option<&PathBuf>) -> Result<PathBuf> {
    flag.or_else(|| configured.cloned()).ok_or_else(|| {
        eyre!("No classifier model given. Pass --model or set classifier.model in the config file")
    })
}

/// Load a tree-ensemble model exported as JSON.
pub fn load_classifier(path: &Path) -> Result<Arc<dyn HeadingClassifier>> {
    let classifier_error = |reason: String| Error::Classifier {
        path: path.display().to_string(),
        reason,
    };

    let json = std::fs::read_to_string(path).map_err(|e| classifier_error(e.to_string()))?;
    let model = TreeEnsemble::from_json(&json).map_err(|e| classifier_error(e.to_string()))?;
    log::debug!(
        "Loaded {} trees over {} classes from {}",
        model.trees.len(),
        model.classes.len(),
        path.display()
    );

    Ok(Arc::new(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsift_core::normalize::FEATURE_COLUMNS;

    #[test]
    fn test_flag_wins_over_config() {
        let configured = PathBuf::from("/etc/model.json");
        let path = model_path(Some("cli.json".into()), Some(&configured)).unwrap();
        assert_eq!(path, PathBuf::from("cli.json"));
        assert_eq!(model_path(None, Some(&configured)).unwrap(), configured);
        assert!(model_path(None, None).is_err());
    }

    #[test]
    fn test_load_stump_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = serde_json::json!({
            "feature_names": FEATURE_COLUMNS,
            "classes": ["None", "H1"],
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [5, -2, -2],
                "threshold": [0.5, -2.0, -2.0],
                "value": [[5.0, 5.0], [5.0, 0.0], [0.0, 5.0]]
            }]
        });
        std::fs::write(&path, model.to_string()).unwrap();

        assert!(load_classifier(&path).is_ok());
    }

    #[test]
    fn test_bad_model_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{}").unwrap();

        let err = load_classifier(&path).err().unwrap();
        assert!(err.to_string().contains("broken.json"));
    }
}
