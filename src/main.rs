use anyhow::Result;
use case_map::{config, data, normalize, render, server, types};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the choropleth figure and open it in the default browser
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Render the figure and serve it with hover lookup
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config } => {
            let app_config = config::AppConfig::load_or_default(config)?;
            let (_, _, figure) = build_figure(&app_config)?;
            let path = write_figure(&app_config, &figure)?;

            let url = format!("file://{}", path.canonicalize()?.display());
            if let Err(e) = webbrowser::open(&url) {
                eprintln!("Could not open browser ({}); figure is at {:?}", e, path);
            }
        }
        Commands::Serve { config } => {
            let app_config = config::AppConfig::load_or_default(config)?;
            let (boundaries, records, figure) = build_figure(&app_config)?;
            write_figure(&app_config, &figure)?;

            let regions = server::matched_regions(&boundaries, &records);
            server::start_server(&app_config, &figure, regions).await?;
        }
    }

    Ok(())
}

/// The whole one-shot pipeline: load both files, normalize the join
/// keys, render the figure.
fn build_figure(
    config: &config::AppConfig,
) -> Result<(
    Vec<types::BoundaryFeature>,
    Vec<types::CaseRecord>,
    render::Figure,
)> {
    let boundaries = normalize::normalize_boundaries(data::load_boundaries(&config.input.boundaries)?);
    let records = normalize::normalize_cases(data::load_cases(&config.input.cases)?);

    let options = render::RenderOptions::default();
    let figure = render::render(&boundaries, &records, &options)?;

    Ok((boundaries, records, figure))
}

fn write_figure(config: &config::AppConfig, figure: &render::Figure) -> Result<PathBuf> {
    let path = config.output.figure_dir.join("map.png");
    figure.save_png(&path)?;
    println!("Figure written to {:?}", path);
    Ok(path)
}
