use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::export::default_db_path;
use crate::model::{ParseRunManifest, VoterField};
use crate::util::read_json;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&args.cache_root));

    info!(cache_root = %args.cache_root.display(), "status requested");

    match load_latest_manifest(&manifest_dir)? {
        Some((path, manifest)) => {
            info!(
                path = %path.display(),
                run_id = %manifest.run_id,
                generated_at = %manifest.generated_at,
                updated_at = %manifest.updated_at.unwrap_or_default(),
                pages = manifest.counts.page_count,
                voters = manifest.counts.voter_count,
                empty_pages = manifest.counts.empty_page_count,
                missing_voter_ids = manifest.counts.missing_voter_id_count,
                missing_house_numbers = manifest.counts.missing_house_number_count,
                merges = manifest.merges.len(),
                "loaded latest parse manifest"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no parse manifest found"),
    }

    if db_path.exists() {
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        let pages = query_count(&conn, "SELECT COUNT(*) FROM pages").unwrap_or(0);
        let voters = query_count(&conn, "SELECT COUNT(*) FROM voters").unwrap_or(0);

        info!(
            path = %db_path.display(),
            pages,
            voters,
            "database status"
        );

        for field in VoterField::ALL {
            let column = field.column_name();
            let filled = query_count(
                &conn,
                &format!("SELECT COUNT(*) FROM voters WHERE {column} <> ''"),
            )
            .unwrap_or(0);
            info!(field = column, filled, missing = voters - filled, "field coverage");
        }
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}

fn load_latest_manifest(manifest_dir: &Path) -> Result<Option<(PathBuf, ParseRunManifest)>> {
    let Some(path) = latest_manifest(manifest_dir)? else {
        return Ok(None);
    };
    let manifest = read_json(&path)?;
    Ok(Some((path, manifest)))
}

/// Newest `parse_run_*.json` by file name; the names embed a compact UTC
/// timestamp so lexical order is chronological.
fn latest_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let mut newest: Option<PathBuf> = None;
    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?
            .path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !(name.starts_with("parse_run_") && name.ends_with(".json")) {
            continue;
        }
        if newest
            .as_ref()
            .and_then(|current| current.file_name())
            .is_none_or(|current| current.to_string_lossy().as_ref() < name)
        {
            newest = Some(path);
        }
    }

    Ok(newest)
}

fn query_count(conn: &Connection, sql: &str) -> Result<i64> {
    let count = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
