use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{error, info};

use crate::models::StandingRow;
use crate::services::scoreboard::Scoreboard;

#[derive(Debug, Clone, Serialize)]
pub struct ExportedStandings {
    pub generated_at: DateTime<Local>,
    pub frozen: bool,
    pub duration: Option<u32>,
    pub problem_count: usize,
    pub standings: Vec<StandingRow>,
}

impl ExportedStandings {
    pub fn capture(board: &Scoreboard) -> Self {
        Self {
            generated_at: Local::now(),
            frozen: board.is_frozen(),
            duration: board.context().config.map(|config| config.duration),
            problem_count: board.context().problem_count(),
            standings: board.snapshot().to_vec(),
        }
    }
}

/// Write the last published standings as pretty JSON. Does not flush.
pub fn export_standings(board: &Scoreboard, output_path: &Path) -> Result<()> {
    if output_path.is_dir() {
        error!("Export path is a directory: {}", output_path.display());
        bail!("Export path {} is a directory", output_path.display());
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create export dir {}", parent.display()))?;
    }

    let exported = ExportedStandings::capture(board);
    let serialized =
        serde_json::to_string_pretty(&exported).context("Failed to serialize standings")?;
    fs::write(output_path, serialized)
        .with_context(|| format!("Failed to write standings to {}", output_path.display()))?;

    info!(
        "Exported {} standings rows to {}",
        exported.standings.len(),
        output_path.display()
    );
    Ok(())
}
