use carrier_scraper_lib::{
    logger, AppConfig, BatchOutcome, BatchRun, ContactScraper, HeadlessChrome, McRange, OutputLayout,
    SaferApiClient,
};

use clap::Parser;
use log::{error, info};
use std::error::Error;
use std::process::ExitCode;

/// Writes qualifying carriers in an MC range to a timestamped CSV.
#[derive(Parser, Debug)]
#[command(name = "carrier-scraper", version)]
struct Cli {
    /// First MC number (inclusive)
    #[arg(long, default_value_t = 1_560_000)]
    start: u64,

    /// Last MC number (inclusive)
    #[arg(long, default_value_t = 1_560_100)]
    end: u64,

    /// Skip the FMCSA email scrape and write the 16 record columns only
    #[arg(long)]
    no_email: bool,
}

fn main() -> ExitCode {
    logger::init();
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let config = AppConfig::load()?;
    info!("Starting carrier scrape for MC {}..={}", cli.start, cli.end);

    let range = McRange::new(cli.start, cli.end)?;
    let layout = if cli.no_email {
        OutputLayout::RecordOnly
    } else {
        OutputLayout::WithScrapedEmail
    };

    let records = SaferApiClient::new(&config)?;
    let emails = ContactScraper::new(HeadlessChrome::new(&config), config.debug_dir.clone());

    let run = BatchRun::new(range, layout, &config.output_dir);
    match run.execute(&records, &emails, config.item_delay)? {
        BatchOutcome::Rows(artifact) => {
            println!("{} rows written to {}", artifact.rows(), artifact.path().display());
            Ok(ExitCode::SUCCESS)
        }
        BatchOutcome::NoData => {
            println!("No valid data found matching the criteria.");
            Ok(ExitCode::from(2))
        }
    }
}
