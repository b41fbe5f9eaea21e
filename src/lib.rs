pub mod batch;
pub mod browser;
pub mod config;
pub mod contact_scraper;
pub mod delay_manager;
pub mod delivery;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod filter;
pub mod logger;
pub mod normalizer;
pub mod output;
pub mod pipeline;
pub mod record;

// Exporting types for convenience
pub use batch::{BatchOutcome, BatchRun, CsvArtifact};
pub use browser::HeadlessChrome;
pub use config::AppConfig;
pub use contact_scraper::{ContactScraper, EmailSource};
pub use fetcher::{RecordSource, SaferApiClient};
pub use output::OutputLayout;
pub use pipeline::{EnrichmentPipeline, McRange};
pub use record::{CarrierRecord, Lookup};
