#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the ghost net report map.
//!
//! ```text
//! ghost_net_cli list [--filter scheduled]
//! ghost_net_cli render [--fit-bounds] [--geojson]
//! ghost_net_cli report --lat 54,3 --lng 10.1 [--size 12] [--phone ...] [--user 7]
//! ghost_net_cli status 5 recovered [--user 3]
//! ghost_net_cli watch [--interval-secs 30]
//! ```
//!
//! Settings come from `--config`, else `GHOST_NET_CONFIG`, else the
//! built-in defaults; `GHOST_NET_API_URL` and `--api-url` override the
//! backend URL in that order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use ghost_net_client::{HttpBackend, ReportBackend};
use ghost_net_events::ChangeNotifier;
use ghost_net_map::picker::read_fields;
use ghost_net_map::{
    MarkerRenderer, RefreshOutcome, ReportActions, ReportList, Settings, summary_line,
};
use ghost_net_report_models::{NewReport, ReportId, ReportStatus};

#[derive(Parser)]
#[command(name = "ghost_net_cli", about = "Ghost net report map")]
struct Cli {
    /// Backend API root (overrides config file and `GHOST_NET_API_URL`)
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Settings file (overrides `GHOST_NET_CONFIG`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List reports sorted by id
    List {
        /// Only show reports whose id or status contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Render the marker layer once and print it
    Render {
        /// Fit the viewport to the markers
        #[arg(long)]
        fit_bounds: bool,
        /// Print the layer as a `GeoJSON` feature collection
        #[arg(long)]
        geojson: bool,
    },
    /// Submit a new report
    Report {
        /// Latitude (`,` or `.` as decimal separator)
        #[arg(long, allow_hyphen_values = true)]
        lat: String,
        /// Longitude (`,` or `.` as decimal separator)
        #[arg(long, allow_hyphen_values = true)]
        lng: String,
        /// Estimated net area in m²
        #[arg(long)]
        size: Option<f64>,
        /// Contact phone number
        #[arg(long)]
        phone: Option<String>,
        /// Reporting user id
        #[arg(long)]
        user: Option<i64>,
    },
    /// Change the status of a report
    Status {
        /// Report id
        id: String,
        /// New status (reported, scheduled, recovered, cancelled)
        #[arg(value_parser = parse_status)]
        status: ReportStatus,
        /// Acting user id
        #[arg(long)]
        user: Option<i64>,
    },
    /// Re-render periodically and log the marker count
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value = "30")]
        interval_secs: u64,
    },
}

fn parse_status(s: &str) -> Result<ReportStatus, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("unknown status '{s}'"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        settings.client.base_url = url;
    }

    let backend: Arc<dyn ReportBackend> = Arc::new(HttpBackend::new(&settings.client)?);
    log::debug!("Using backend at {}", settings.client.base_url);

    match cli.command {
        Commands::List { filter } => {
            let list = ReportList::new(backend);
            if let RefreshOutcome::Failed(e) = list.refresh().await {
                return Err(e.into());
            }

            let reports = list.filter(filter.as_deref().unwrap_or_default());
            if reports.is_empty() {
                println!("No reports found.");
                return Ok(());
            }
            for report in &reports {
                println!("{}", summary_line(report));
            }
            println!("\n{} report(s)", reports.len());
        }
        Commands::Render {
            fit_bounds,
            geojson,
        } => {
            let mut map = settings.map.clone();
            map.fit_bounds |= fit_bounds;
            let renderer = MarkerRenderer::from_config(backend, "main", &map);

            match renderer.refresh().await {
                RefreshOutcome::Failed(e) => return Err(e.into()),
                RefreshOutcome::Rendered { dropped, .. } if dropped > 0 => {
                    eprintln!("{dropped} report(s) could not be shown");
                }
                _ => {}
            }

            let view = renderer.snapshot();
            if geojson {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&view.layer().to_geojson())?
                );
                return Ok(());
            }

            let center = view.center();
            println!(
                "View '{}': center {:.5}, {:.5} zoom {}",
                view.name(),
                center.y(),
                center.x(),
                view.zoom()
            );
            for marker in view.layer().markers() {
                let title = marker.popup.as_ref().map_or("", |p| p.title.as_str());
                println!(
                    "{:<5} {:>10.5} {:>11.5}  {title}",
                    marker.style.color,
                    marker.latitude(),
                    marker.longitude()
                );
            }
            println!("\n{} marker(s)", view.layer().len());
        }
        Commands::Report {
            lat,
            lng,
            size,
            phone,
            user,
        } => {
            let Some((latitude, longitude)) = read_fields(&lat, &lng) else {
                eprintln!("Invalid position: {lat}, {lng}");
                std::process::exit(2);
            };

            let mut report = NewReport::new(latitude, longitude);
            report.size = size;
            report.phone = phone;

            let actions = ReportActions::new(backend, Arc::new(user), ChangeNotifier::new());
            match actions.create(report).await {
                Ok(created) => println!("Created report #{}", created.id),
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    std::process::exit(1);
                }
            }
        }
        Commands::Status { id, status, user } => {
            let id = ReportId::from(id.as_str());
            let actions = ReportActions::new(backend, Arc::new(user), ChangeNotifier::new());
            match actions.update_status(&id, status).await {
                Ok(updated) => println!("Report #{} is now {}", updated.id, updated.status),
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    std::process::exit(1);
                }
            }
        }
        Commands::Watch { interval_secs } => {
            let renderer = MarkerRenderer::from_config(backend, "main", &settings.map);
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let outcome = renderer.refresh().await;
                        if let RefreshOutcome::Rendered { markers, dropped } = outcome {
                            log::info!("{markers} marker(s) on the map, {dropped} skipped");
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        log::info!("Stopping watch");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_command_parses_status_case_insensitively() {
        let cli = Cli::try_parse_from(["ghost_net_cli", "status", "5", "recovered"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Status {
                ref id,
                status: ReportStatus::Recovered,
                user: None,
            } if id == "5"
        ));

        let cli = Cli::try_parse_from([
            "ghost_net_cli",
            "status",
            "net-7",
            "SCHEDULED",
            "--user",
            "3",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Status {
                status: ReportStatus::Scheduled,
                user: Some(3),
                ..
            }
        ));
    }

    #[test]
    fn unknown_status_is_a_usage_error() {
        let err = Cli::try_parse_from(["ghost_net_cli", "status", "5", "lost"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("unknown status 'lost'"));
    }

    #[test]
    fn report_command_accepts_negative_comma_coordinates() {
        let cli = Cli::try_parse_from([
            "ghost_net_cli",
            "report",
            "--lat",
            "-54,3",
            "--lng",
            "10.1",
            "--api-url",
            "http://nets.test/api",
        ])
        .unwrap();

        assert_eq!(cli.api_url.as_deref(), Some("http://nets.test/api"));
        let Commands::Report { lat, lng, user, .. } = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(read_fields(&lat, &lng), Some((-54.3, 10.1)));
        assert_eq!(user, None);
    }
}
