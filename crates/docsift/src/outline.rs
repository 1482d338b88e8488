use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use docsift_core::classify::HeadingClassifier;
use docsift_core::sections::{build_outline, Outline};
use futures::future::join_all;

use crate::classifier::{load_classifier, model_path};
use crate::output::write_json;
use crate::pipeline::{process_document, DocumentInput};
use crate::prelude::{eprintln, *};

#[derive(Debug, clap::Args)]
pub struct OutlineOptions {
    /// Heading classifier model (JSON tree ensemble)
    #[arg(long, env = "DOCSIFT_MODEL")]
    pub model: Option<PathBuf>,

    /// Directory the `<stem>.json` outlines are written to
    #[arg(long, short, env = "DOCSIFT_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// PDF files to outline
    #[arg(required = true)]
    pub pdfs: Vec<PathBuf>,
}

/// `report.pdf` -> `<dir>/report.json`
pub fn outline_path(output_dir: &Path, pdf: &Path) -> PathBuf {
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "outline".to_string());
    output_dir.join(f!("{stem}.json"))
}

pub fn outline_document(
    input: &DocumentInput,
    classifier: &dyn HeadingClassifier,
) -> Result<Outline> {
    let rows = process_document(input, classifier)?;
    Ok(build_outline(&rows))
}

pub async fn run(options: OutlineOptions, global: crate::Global) -> Result<()> {
    let settings = crate::config::load_settings(global.config.as_deref())?;
    let model = model_path(options.model, settings.classifier.model.as_ref())?;
    let classifier = load_classifier(&model)?;

    let tasks = options.pdfs.into_iter().map(|pdf| {
        let classifier: Arc<dyn HeadingClassifier> = Arc::clone(&classifier);
        let target = outline_path(&options.output_dir, &pdf);
        tokio::task::spawn_blocking(move || {
            let input = DocumentInput::from_path(&pdf);
            let result = outline_document(&input, classifier.as_ref())
                .and_then(|outline| write_json(&target, &outline).map(|_| outline));
            (input.name, target, result)
        })
    });

    let mut written = 0;
    for joined in join_all(tasks).await {
        match joined {
            Ok((_, target, Ok(outline))) => {
                written += 1;
                if global.verbose {
                    eprintln!(
                        "{} {} ({} headings)",
                        target.display(),
                        outline.title.cyan(),
                        outline.outline.len()
                    );
                }
            }
            Ok((name, _, Err(err))) => log::warn!("Skipping {}: {:#}", name, err),
            Err(err) => log::warn!("Outline worker failed: {}", err),
        }
    }

    eprintln!(
        "{} {} outlines to {}",
        "Wrote".green().bold(),
        written,
        options.output_dir.display()
    );

    Ok(())
}
