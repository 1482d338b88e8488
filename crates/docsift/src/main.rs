use crate::prelude::*;
use clap::Parser;

mod classifier;
mod config;
mod embedder;
mod error;
mod features;
mod outline;
mod output;
mod pipeline;
mod prelude;
mod select;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Rank the sections of a PDF collection for a persona and a task"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Settings file (TOML)
    #[clap(long, env = "DOCSIFT_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "DOCSIFT_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Select the most relevant, diverse sections for a request
    Select(crate::select::SelectOptions),

    /// Write the title and heading outline of each PDF
    Outline(crate::outline::OutlineOptions),

    /// Print the normalized layout features of a PDF
    Features(crate::features::FeaturesOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();

    let level = if app.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    color_eyre::install()?;

    match app.command {
        SubCommands::Select(options) => crate::select::run(options, app.global).await,
        SubCommands::Outline(options) => crate::outline::run(options, app.global).await,
        SubCommands::Features(options) => crate::features::run(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
