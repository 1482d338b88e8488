use std::path::PathBuf;

use colored::Colorize;
use docsift_core::config::{EmbedderKind, Settings};
use docsift_core::mmr::{MmrSelector, Selection};
use docsift_core::report::build_report;
use docsift_core::request::Request;
use docsift_core::sections::SectionBlock;
use indicatif::{ProgressBar, ProgressStyle};

use crate::classifier::{load_classifier, model_path};
use crate::embedder::Embedder;
use crate::output::write_json;
use crate::pipeline::{label_documents, request_inputs, select_sections};
use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Args)]
pub struct SelectOptions {
    /// Request JSON with persona, job_to_be_done and documents
    #[arg(long, short, env = "DOCSIFT_INPUT")]
    pub input: PathBuf,

    /// Directory the request's filenames are resolved against
    #[arg(long, env = "DOCSIFT_INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Heading classifier model (JSON tree ensemble)
    #[arg(long, env = "DOCSIFT_MODEL")]
    pub model: Option<PathBuf>,

    /// Where to write the report
    #[arg(long, short, env = "DOCSIFT_OUTPUT")]
    pub output: PathBuf,

    /// Number of sections to select
    #[arg(long, env = "DOCSIFT_TOP_K")]
    pub top_k: Option<usize>,

    /// Relevance/diversity trade-off in [0, 1]; higher favours relevance
    #[arg(long, env = "DOCSIFT_LAMBDA")]
    pub lambda: Option<f64>,

    /// Embedding backend (ollama, hashing)
    #[arg(long, env = "DOCSIFT_EMBEDDER")]
    pub embedder: Option<EmbedderKind>,

    /// Ollama base URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Embedding model served by Ollama
    #[arg(long, env = "DOCSIFT_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Print the selected sections as a table
    #[arg(long)]
    pub table: bool,
}

/// Layer CLI flags over file settings.
pub fn apply_overrides(mut settings: Settings, options: &SelectOptions) -> Result<Settings> {
    if let Some(top_k) = options.top_k {
        settings.selection.top_k = top_k;
    }
    if let Some(lambda) = options.lambda {
        settings.selection.lambda = lambda;
    }
    if let Some(kind) = options.embedder {
        settings.embedder.kind = kind;
    }
    if let Some(url) = &options.ollama_url {
        settings.embedder.url = url.clone();
    }
    if let Some(model) = &options.embedding_model {
        settings.embedder.model = model.clone();
    }
    settings.validate()?;
    Ok(settings)
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

pub async fn run(options: SelectOptions, global: crate::Global) -> Result<()> {
    let settings = crate::config::load_settings(global.config.as_deref())?;
    let settings = apply_overrides(settings, &options)?;

    // Every fatal input problem surfaces before any work starts.
    let request_json = std::fs::read_to_string(&options.input)
        .wrap_err_with(|| format!("Failed to read request {}", options.input.display()))?;
    let request = Request::from_json(&request_json)?;
    let model = model_path(options.model.clone(), settings.classifier.model.as_ref())?;
    let classifier = load_classifier(&model)?;
    let embedder = Embedder::from_settings(&settings.embedder)?;
    let selector = MmrSelector::new()
        .top_k(settings.selection.top_k)
        .lambda(settings.selection.lambda);

    if global.verbose {
        eprintln!("Persona: {}", request.persona.role);
        eprintln!("Task: {}", request.job_to_be_done.task);
        eprintln!("Embedder: {}", embedder.describe());
        eprintln!(
            "top_k={} lambda={}",
            settings.selection.top_k, settings.selection.lambda
        );
    }

    let spinner = spinner();
    spinner.set_message(format!("Labeling {} documents", request.documents.len()));
    let documents = label_documents(request_inputs(&request, &options.input_dir), classifier).await;

    spinner.set_message("Embedding sections");
    let selected = select_sections(&documents, &request.query(), &embedder, &selector).await;
    spinner.finish_and_clear();
    let (sections, selection) = selected?;

    let timestamp = chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string();
    let report = build_report(&request, &sections, &selection, timestamp);
    write_json(&options.output, &report)?;

    if options.table {
        print_table(&sections, &selection);
    }
    eprintln!(
        "{} {} sections from {} of {} documents to {}",
        "Wrote".green().bold(),
        report.extracted_sections.len(),
        documents.len(),
        request.documents.len(),
        options.output.display()
    );

    Ok(())
}

fn print_table(sections: &[SectionBlock], selection: &Selection) {
    let mut table = new_table();
    table.add_row(prettytable::row![
        "Rank".bold(),
        "Relevance".bold(),
        "Document".bold(),
        "Page".bold(),
        "Section".bold()
    ]);

    for candidate in selection.iter() {
        let section = &sections[candidate.index];
        table.add_row(prettytable::row![
            candidate.rank.to_string().cyan(),
            format!("{:.3}", candidate.relevance),
            section.document,
            section.page,
            section.heading
        ]);
    }

    println!("{}", table);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, clap::Parser)]
    struct Harness {
        #[command(flatten)]
        options: SelectOptions,
    }

    fn parse(args: &[&str]) -> SelectOptions {
        let mut argv = vec!["docsift", "--input", "req.json", "--input-dir", "pdfs", "-o", "out.json"];
        argv.extend_from_slice(args);
        Harness::parse_from(argv).options
    }

    #[test]
    fn test_flags_override_file_settings() {
        let mut file = Settings::default();
        file.selection.top_k = 8;
        file.embedder.model = "from-file".into();

        let options = parse(&["--top-k", "3", "--embedder", "hashing", "--lambda", "0.5"]);
        let settings = apply_overrides(file, &options).unwrap();

        assert_eq!(settings.selection.top_k, 3);
        assert_eq!(settings.selection.lambda, 0.5);
        assert_eq!(settings.embedder.kind, EmbedderKind::Hashing);
        assert_eq!(settings.embedder.model, "from-file");
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let options = parse(&["--lambda", "2"]);
        assert!(apply_overrides(Settings::default(), &options).is_err());
    }

    #[test]
    fn test_unknown_embedder_flag() {
        let argv = [
            "docsift", "--input", "r.json", "--input-dir", ".", "-o", "o.json", "--embedder", "bert",
        ];
        assert!(Harness::try_parse_from(argv).is_err());
    }
}
