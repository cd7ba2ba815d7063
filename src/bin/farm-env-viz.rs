//! Command line front end: pick years, regions and crops, fetch the crop-season
//! environment readings and write the monthly figure pages as HTML files.
//!
//! ```text
//! FARM_DATA_SERVICE_KEY=... cargo run --features cli -- --year 2021 --region 전남 --output-dir plots
//! ```

use clap::Parser;
use farm_env_viz::{
    distinct_crops, distinct_regions, Attribute, ClientConfig, FarmEnv, GridLayout,
    MonthlyFigure, Overflow, SeasonSelection,
};
use log::{info, warn};
use std::error::Error;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "farm-env-viz")]
#[command(about = "Plot monthly distributions of Smart Farm crop-season environment readings", long_about = None)]
struct Cli {
    /// Cropping years to include (repeatable)
    #[arg(short, long = "year", default_values_t = [2020, 2021])]
    years: Vec<i32>,

    /// Farm regions (repeatable); defaults to the first listed region
    #[arg(short, long = "region")]
    regions: Vec<String>,

    /// Crop varieties (repeatable); defaults to the first listed crop
    #[arg(short, long = "crop")]
    crops: Vec<String>,

    /// Attribute description to plot
    #[arg(short, long, default_value = Attribute::InternalCo2.description())]
    attribute: String,

    /// Config file (JSON); defaults to the user config dir
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where the HTML pages are written
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Only plot the first page of months
    #[arg(long)]
    truncate: bool,

    /// Print the matching seasons and exit
    #[arg(long)]
    list: bool,

    /// Print per-month, per-hour medians
    #[arg(long)]
    summary: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let config = ClientConfig::load(cli.config.as_deref())?;
    let farm_env = FarmEnv::from_config(&config)?;

    let all_seasons = match farm_env.list_seasons(&cli.years).await {
        Ok(seasons) => seasons,
        Err(e) => {
            warn!("Could not list seasons: {}", e);
            println!("no data");
            return Ok(());
        }
    };
    let selection = SeasonSelection::new()
        .regions(cli.regions.clone())
        .crops(cli.crops.clone());
    let Some(seasons) = selection.apply(&all_seasons) else {
        println!("no data");
        println!("regions: {}", distinct_regions(&all_seasons).join(", "));
        println!("crops:   {}", distinct_crops(&all_seasons).join(", "));
        return Ok(());
    };

    if cli.list {
        for season in &seasons {
            println!("{}\t{}\t{}", season.season_id, season.region, season.crop);
        }
        return Ok(());
    }

    let season_ids = SeasonSelection::season_ids(&seasons);
    let table = farm_env.fetch_env_for_seasons(&season_ids).await?;

    let overflow = if cli.truncate {
        Overflow::Truncate
    } else {
        Overflow::Paginate
    };
    let figure = farm_env
        .render_monthly()
        .table(&table)
        .column(&cli.attribute)
        .layout(GridLayout::default().with_overflow(overflow))
        .call()?;

    if cli.summary {
        print_summary(&figure);
    }

    fs::create_dir_all(&cli.output_dir)?;
    for (page, html) in figure.to_html_pages().into_iter().enumerate() {
        let path = cli.output_dir.join(format!("monthly-{}.html", page + 1));
        fs::write(&path, html)?;
        info!("Wrote {}", path.display());
        println!("{}", path.display());
    }

    Ok(())
}

fn print_summary(figure: &MonthlyFigure) {
    println!("{} (range {:.1} .. {:.1})", figure.title, figure.y_range.0, figure.y_range.1);
    for panel in figure.panels() {
        let medians: Vec<String> = panel
            .boxes
            .iter()
            .map(|b| format!("{:02}h={:.1}", b.hour, b.stats.median))
            .collect();
        if medians.is_empty() {
            println!("{}: -", panel.label());
        } else {
            println!("{}: {}", panel.label(), medians.join(" "));
        }
    }
    for month in &figure.dropped_months {
        println!("{}: not plotted", month);
    }
}
