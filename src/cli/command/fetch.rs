//! Download data for every station in a list file.

use std::{fs, sync::Arc};

use anyhow::{Context, Result};
use indicatif::ProgressBar;

use crate::{
    batch::spawn_job,
    cli::{create_progress_bar, FetchArgs},
    config::Settings,
    job::parse_station_list,
    progress::{Outcome, ProgressSnapshot, StationReport},
};

use super::build_driver;

pub async fn fetch(settings: &Settings, args: &FetchArgs) -> Result<ProgressSnapshot> {
    let bytes = fs::read(&args.stations)
        .with_context(|| format!("Could not read `{}`", args.stations.display()))?;
    let stations = parse_station_list(&bytes)?;
    let job = args.request().into_job(stations)?;

    let driver = Arc::new(build_driver(settings, args.concurrency as usize)?);
    let bar = create_progress_bar(job.stations.len() as u64, "Starting download...".to_string());
    bar.println(format!(
        "Downloading {} for {} stations to `{}`",
        describe(&job.data_types),
        job.stations.len(),
        settings.output_root()?.display()
    ));

    let mut handle = spawn_job(driver, job);
    let mut printed = 0;

    loop {
        tokio::select! {
            update = handle.reporter.changed() => match update {
                Some(snapshot) => render(&bar, &snapshot, &mut printed),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                bar.println("Cancelling after the current station...");
                handle.cancel.cancel();
            }
        }
    }

    let snapshot = handle.task.await?;
    render(&bar, &snapshot, &mut printed);
    bar.finish_with_message(snapshot.summary());

    Ok(snapshot)
}

fn render(bar: &ProgressBar, snapshot: &ProgressSnapshot, printed: &mut usize) {
    for report in snapshot.reports.iter().skip(*printed) {
        bar.println(report_line(report));
    }
    *printed = snapshot.reports.len();

    bar.set_position(snapshot.completed as u64);
    match &snapshot.current {
        Some(station) => bar.set_message(format!("Station {station}")),
        None => bar.set_message(format!("{:?} ({:.0}%)", snapshot.status, snapshot.percent())),
    }
}

fn describe(data_types: &[crate::job::DataType]) -> String {
    data_types
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(" and ")
}

/// One line per finished station, e.g. `SUCCESS 01646500: streamflow saved to ...`.
pub fn report_line(report: &StationReport) -> String {
    let label = if report.is_success() { "SUCCESS" } else { "FAILED" };
    let details: Vec<String> = report
        .outcomes
        .iter()
        .map(|o| match &o.outcome {
            Outcome::Saved { path } => format!("{} saved to {}", o.data_type, path.display()),
            Outcome::Failed { kind, reason } => {
                format!("{} failed ({:?}): {}", o.data_type, kind, reason)
            }
        })
        .collect();

    format!("{} {}: {}", label, report.station, details.join("; "))
}

// -- Tests -------------------------------------------------------------------
