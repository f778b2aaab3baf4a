//! graduate-map: where residency graduates ended up working.
//!
//! Loads the graduate roster (a spreadsheet CSV export or a local CSV file),
//! geocodes employer addresses, and writes a clustered marker map, a
//! dashboard page, a text summary and CSV exports.
//!
//! ```no_run
//! use graduate_map::{run_dashboard, ApiKey, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let report = run_dashboard(&config, ApiKey::from_env()).await?;
//! println!("{} graduates, {} unlocatable",
//!          report.statistics.total_graduates,
//!          report.statistics.unlocatable_names.len());
//! # Ok(())
//! # }
//! ```

pub mod dashboard;
pub mod errors;
pub mod geocoder;
pub mod loader;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod output;
pub mod render;
pub mod report;

pub use errors::{DashboardError, FetchError, GeocodeError};
pub use models::{ApiKey, Config, Coordinates, GraduateRecord, RosterSnapshot, WorkSetting};
pub use run::{run_dashboard, DashboardReport};

mod run {
    use log::info;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use crate::dashboard::{render_dashboard, DashboardHeader};
    use crate::errors::DashboardError;
    use crate::geocoder::{CachingGeocoder, GoogleGeocoder};
    use crate::loader::{RosterLoader, SourceCache};
    use crate::models::{ApiKey, Config, API_KEY_VAR};
    use crate::normalizer::normalize;
    use crate::output::{
        clean_output_directory, write_dashboard, write_graduates_csv, write_summary_report,
        write_unlocatable_csv,
    };
    use crate::render::MapRenderer;
    use crate::report::RosterStatistics;

    /// Outcome of a dashboard run.
    #[derive(Debug, Clone)]
    pub struct DashboardReport {
        pub statistics: RosterStatistics,
        /// Path of the exported `geo_graduates.html`.
        pub map_path: PathBuf,
        /// Every file written, map first.
        pub outputs: Vec<PathBuf>,
        /// Geocoding requests actually sent (one per distinct address).
        pub geocode_requests: usize,
    }

    /// Run the whole pipeline: load, geocode, aggregate, render, export.
    ///
    /// The credential is checked before anything is fetched. Fetch failures
    /// abort the run; addresses that fail to geocode only move their record
    /// to the unlocatable list.
    pub async fn run_dashboard(
        config: &Config,
        api_key: Option<ApiKey>,
    ) -> Result<DashboardReport, DashboardError> {
        let api_key = api_key.ok_or(DashboardError::MissingCredential(API_KEY_VAR))?;
        let timeout = Duration::from_secs(config.request_timeout_secs);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DashboardError::HttpClient)?;

        let mut loader = RosterLoader::new(client.clone(), SourceCache::new(), config.sheet_name.as_str())
            .with_timeout(timeout);
        let snapshot = loader.load(&config.sheet_url).await?;

        let geocoder = CachingGeocoder::new(
            GoogleGeocoder::new(client, config.geocode_endpoint.as_str(), api_key).with_timeout(timeout),
        );
        let roster = normalize(&snapshot, &geocoder, config.effective_concurrency()).await;
        info!(
            "Sent {} geocoding requests for {} cached addresses",
            geocoder.external_calls(),
            geocoder.cached_addresses()
        );

        let statistics = RosterStatistics::compute(&roster);

        let output_dir = Path::new(&config.output_directory);
        std::fs::create_dir_all(output_dir)?;
        clean_output_directory(output_dir)?;

        let map = MapRenderer::default().render(&roster.geocoded);
        let map_path = map.export(output_dir)?;

        let header = DashboardHeader {
            title: &config.title,
            description: &config.description,
        };
        let dashboard_path = write_dashboard(&render_dashboard(&header, &statistics), output_dir)?;
        let summary_path = write_summary_report(&statistics, &config.title, output_dir)?;
        let graduates_path = write_graduates_csv(&roster, output_dir)?;
        let unlocatable_path = write_unlocatable_csv(&roster, output_dir)?;

        Ok(DashboardReport {
            statistics,
            map_path: map_path.clone(),
            outputs: vec![
                map_path,
                dashboard_path,
                summary_path,
                graduates_path,
                unlocatable_path,
            ],
            geocode_requests: geocoder.external_calls(),
        })
    }
}
