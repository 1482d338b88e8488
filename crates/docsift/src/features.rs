use std::path::PathBuf;

use colored::Colorize;
use docsift_core::features::extract_features;
use docsift_core::normalize::{normalize_document, NormalizedDocument, FEATURE_COLUMNS};

use crate::pipeline::{load_runs, DocumentInput};
use crate::prelude::{println, *};

#[derive(Debug, clap::Args)]
pub struct FeaturesOptions {
    /// PDF file to inspect
    pub pdf: PathBuf,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn normalized_features(input: &DocumentInput) -> Result<NormalizedDocument> {
    let runs = load_runs(input)?;
    Ok(normalize_document(&input.name, extract_features(&runs))?)
}

pub async fn run(options: FeaturesOptions, _global: crate::Global) -> Result<()> {
    let input = DocumentInput::from_path(&options.pdf);
    let document = tokio::task::spawn_blocking(move || normalized_features(&input)).await??;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    let mut table = new_table();
    let mut header = vec![
        prettytable::Cell::new("Page").style_spec("b"),
        prettytable::Cell::new("Text").style_spec("b"),
    ];
    header.extend(
        FEATURE_COLUMNS
            .iter()
            .map(|c| prettytable::Cell::new(c).style_spec("b")),
    );
    table.add_row(prettytable::Row::new(header));

    for row in &document.rows {
        let mut cells = vec![
            prettytable::Cell::new(&row.row.page.to_string()),
            prettytable::Cell::new(&truncate(&row.row.text, 48)),
        ];
        cells.extend(
            row.features()
                .iter()
                .map(|v| prettytable::Cell::new(&f!("{v:.3}"))),
        );
        table.add_row(prettytable::Row::new(cells));
    }

    println!("{}", table);
    println!(
        "{} rows from {}",
        document.rows.len().to_string().cyan(),
        document.document
    );

    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer line of text", 10), "a longe...");
        assert_eq!(truncate("åäöåäöåäö", 6), "åäö...");
    }
}
