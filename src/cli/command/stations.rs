//! Download the list of stream gages in a state and save it to disk.

use std::{
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{anyhow, Result};

use crate::{
    cli::create_spinner,
    config::Settings,
    download::build_client,
    nwis::{NwisClient, Site},
    output::write_atomic,
    parquet,
};

pub const STATES: [(&str, &str); 50] = [
    ("AL", "Alabama"), ("AK", "Alaska"), ("AZ", "Arizona"), ("AR", "Arkansas"),
    ("CA", "California"), ("CO", "Colorado"), ("CT", "Connecticut"), ("DE", "Delaware"),
    ("FL", "Florida"), ("GA", "Georgia"), ("HI", "Hawaii"), ("ID", "Idaho"),
    ("IL", "Illinois"), ("IN", "Indiana"), ("IA", "Iowa"), ("KS", "Kansas"),
    ("KY", "Kentucky"), ("LA", "Louisiana"), ("ME", "Maine"), ("MD", "Maryland"),
    ("MA", "Massachusetts"), ("MI", "Michigan"), ("MN", "Minnesota"), ("MS", "Mississippi"),
    ("MO", "Missouri"), ("MT", "Montana"), ("NE", "Nebraska"), ("NV", "Nevada"),
    ("NH", "New Hampshire"), ("NJ", "New Jersey"), ("NM", "New Mexico"), ("NY", "New York"),
    ("NC", "North Carolina"), ("ND", "North Dakota"), ("OH", "Ohio"), ("OK", "Oklahoma"),
    ("OR", "Oregon"), ("PA", "Pennsylvania"), ("RI", "Rhode Island"), ("SC", "South Carolina"),
    ("SD", "South Dakota"), ("TN", "Tennessee"), ("TX", "Texas"), ("UT", "Utah"),
    ("VT", "Vermont"), ("VA", "Virginia"), ("WA", "Washington"), ("WV", "West Virginia"),
    ("WI", "Wisconsin"), ("WY", "Wyoming"),
];

pub async fn stations(settings: &Settings, state_cd: &str) -> Result<String> {
    let (code, name) = lookup_state(state_cd)?;

    let client = build_client(settings.timeout())?;
    let nwis = NwisClient::new(client, &settings.nwis_url, settings.retry_policy());

    let bar = create_spinner(format!("Searching for stations in {name}..."));
    let sites = nwis.sites(code).await?;
    bar.finish_with_message(format!("Found {} stations in {}", sites.len(), name));

    if sites.is_empty() {
        return Err(anyhow!("No stations found for {}", name));
    }

    let layout = settings.layout()?;
    write_station_ids(&sites, &layout.station_ids_path())?;
    let table_path = layout.station_table_path(code);
    parquet::save_stations(&sites, &table_path)?;

    println!(
        "Saved {} station IDs to `{}`",
        sites.len(),
        layout.station_ids_path().display()
    );

    Ok(table_path.to_string_lossy().to_string())
}

fn lookup_state(state_cd: &str) -> Result<(&'static str, &'static str)> {
    let wanted = state_cd.trim().to_uppercase();
    STATES
        .iter()
        .find(|(code, _)| *code == wanted)
        .copied()
        .ok_or_else(|| anyhow!("Unknown state code `{}`", state_cd))
}

/// Writes one site number per line, ready to feed back into `fetch`.
pub fn write_station_ids(sites: &[Site], path: &Path) -> Result<()> {
    write_atomic(path, |file| {
        let mut writer = BufWriter::new(file);
        for site in sites {
            writeln!(writer, "{}", site.site_no)?;
        }
        writer.flush()?;
        Ok(())
    })
}

// -- Tests -------------------------------------------------------------------
