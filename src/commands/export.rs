use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use tracing::info;

use crate::cli::ExportArgs;
use crate::model::ParseRunManifest;
use crate::util::{ensure_directory, now_utc_string, read_json};

const DB_SCHEMA_VERSION: &str = "0.1.0";

pub(crate) fn default_db_path(cache_root: &Path) -> PathBuf {
    cache_root.join("voterroll.sqlite")
}

pub fn run(args: ExportArgs) -> Result<()> {
    let manifest: ParseRunManifest = read_json(&args.parsed)?;
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&args.cache_root));
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }

    info!(
        parsed = %args.parsed.display(),
        db_path = %db_path.display(),
        run_id = %manifest.run_id,
        "starting export"
    );

    let mut connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;

    let stats = export_manifest(&mut connection, &manifest, &now_utc_string())?;
    info!(
        pages = stats.pages,
        voters = stats.voters,
        db_path = %db_path.display(),
        "export complete"
    );

    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ExportStats {
    pub pages: usize,
    pub voters: usize,
}

pub(crate) fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub(crate) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS pages (
              source TEXT PRIMARY KEY,
              run_id TEXT NOT NULL,
              sha256 TEXT NOT NULL,
              ward_part_no TEXT NOT NULL,
              ward_part_name TEXT NOT NULL,
              ac_part_info TEXT NOT NULL,
              age_as_on TEXT NOT NULL,
              publication_date TEXT NOT NULL,
              voter_count INTEGER NOT NULL,
              warnings TEXT,
              exported_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS voters (
              source TEXT NOT NULL,
              ordinal INTEGER NOT NULL,
              serial_id TEXT NOT NULL,
              voter_id TEXT NOT NULL,
              name TEXT NOT NULL,
              father_or_husband_name TEXT NOT NULL,
              age TEXT NOT NULL,
              gender TEXT NOT NULL,
              house_number TEXT NOT NULL,
              ac_part_info TEXT NOT NULL,
              ward_part_no TEXT NOT NULL,
              ward_part_name TEXT NOT NULL,
              PRIMARY KEY(source, ordinal),
              FOREIGN KEY(source) REFERENCES pages(source)
            );

            CREATE INDEX IF NOT EXISTS idx_voters_voter_id ON voters(voter_id);
            ",
        )
        .context("failed to create export schema")?;

    connection
        .execute(
            "
            INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
            ON CONFLICT(key) DO UPDATE SET value=excluded.value
            ",
            [DB_SCHEMA_VERSION],
        )
        .context("failed to record schema version")?;

    Ok(())
}

/// Replaces every page of `manifest` in the store. Voters of a page are
/// rewritten as a whole so a re-export after a merge leaves no stale rows.
pub(crate) fn export_manifest(
    connection: &mut Connection,
    manifest: &ParseRunManifest,
    exported_at: &str,
) -> Result<ExportStats> {
    let tx = connection.transaction()?;
    let mut stats = ExportStats::default();

    {
        let mut page_statement = tx.prepare(
            "
            INSERT INTO pages(
              source, run_id, sha256, ward_part_no, ward_part_name, ac_part_info,
              age_as_on, publication_date, voter_count, warnings, exported_at
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(source) DO UPDATE SET
              run_id=excluded.run_id,
              sha256=excluded.sha256,
              ward_part_no=excluded.ward_part_no,
              ward_part_name=excluded.ward_part_name,
              ac_part_info=excluded.ac_part_info,
              age_as_on=excluded.age_as_on,
              publication_date=excluded.publication_date,
              voter_count=excluded.voter_count,
              warnings=excluded.warnings,
              exported_at=excluded.exported_at
            ",
        )?;

        let mut voter_statement = tx.prepare(
            "
            INSERT INTO voters(
              source, ordinal, serial_id, voter_id, name, father_or_husband_name,
              age, gender, house_number, ac_part_info, ward_part_no, ward_part_name
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ",
        )?;

        for page in &manifest.pages {
            let warnings = serde_json::to_string(&page.warnings)
                .context("failed to serialize page warnings")?;

            page_statement
                .execute(params![
                    page.source,
                    manifest.run_id,
                    page.sha256,
                    page.metadata.ward_part_no,
                    page.metadata.ward_part_name,
                    page.metadata.ac_part_info,
                    page.metadata.age_as_on,
                    page.metadata.publication_date,
                    page.voters.len() as i64,
                    warnings,
                    exported_at,
                ])
                .with_context(|| format!("failed to upsert page {}", page.source))?;

            tx.execute("DELETE FROM voters WHERE source = ?1", [&page.source])
                .with_context(|| format!("failed to clear voters of {}", page.source))?;

            for (ordinal, voter) in page.voters.iter().enumerate() {
                voter_statement
                    .execute(params![
                        page.source,
                        ordinal as i64,
                        voter.id,
                        voter.voter_id,
                        voter.name,
                        voter.father_or_husband_name,
                        voter.age,
                        voter.gender,
                        voter.house_number,
                        voter.ac_part_info,
                        voter.ward_part_no,
                        voter.ward_part_name,
                    ])
                    .with_context(|| {
                        format!("failed to insert voter {} of {}", voter.id, page.source)
                    })?;
                stats.voters += 1;
            }

            stats.pages += 1;
        }
    }

    tx.commit()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PageMetadata, ParseCounts, ParsedPage, Voter};

    fn manifest(voters: Vec<Voter>) -> ParseRunManifest {
        ParseRunManifest {
            manifest_version: 1,
            run_id: "parse-test".to_string(),
            generated_at: "2024-05-15T00:00:00Z".to_string(),
            updated_at: None,
            command: "voterroll parse".to_string(),
            house_number_mode: "full".to_string(),
            counts: ParseCounts::default(),
            pages: vec![ParsedPage {
                source: "ward5.txt".to_string(),
                sha256: "abc".to_string(),
                metadata: PageMetadata {
                    ward_part_no: "5 : 12".to_string(),
                    ..PageMetadata::default()
                },
                voters,
                warnings: vec!["1 of 2 voters in ward5.txt have no EPIC number".to_string()],
            }],
            merges: Vec::new(),
        }
    }

    fn voter(id: &str, voter_id: &str) -> Voter {
        Voter {
            id: id.to_string(),
            voter_id: voter_id.to_string(),
            ..Voter::default()
        }
    }

    #[test]
    fn export_manifest_replaces_page_voters_on_reexport() {
        let mut connection = Connection::open_in_memory().expect("in-memory db opens");
        ensure_schema(&connection).expect("schema created");

        let first = manifest(vec![voter("1", ""), voter("2", "XYZ9876543")]);
        let stats = export_manifest(&mut connection, &first, "t1").expect("first export");
        assert_eq!(stats, ExportStats { pages: 1, voters: 2 });

        let merged = manifest(vec![voter("1", "ABC1234567"), voter("2", "XYZ9876543")]);
        export_manifest(&mut connection, &merged, "t2").expect("second export");

        let voter_rows: i64 = connection
            .query_row("SELECT COUNT(*) FROM voters", [], |row| row.get(0))
            .expect("voter count");
        assert_eq!(voter_rows, 2);

        let filled: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM voters WHERE voter_id <> ''",
                [],
                |row| row.get(0),
            )
            .expect("filled count");
        assert_eq!(filled, 2);

        let (ward, exported_at): (String, String) = connection
            .query_row(
                "SELECT ward_part_no, exported_at FROM pages WHERE source = 'ward5.txt'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("page row");
        assert_eq!(ward, "5 : 12");
        assert_eq!(exported_at, "t2");
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let connection = Connection::open_in_memory().expect("in-memory db opens");
        ensure_schema(&connection).expect("first run");
        ensure_schema(&connection).expect("second run");

        let version: String = connection
            .query_row(
                "SELECT value FROM metadata WHERE key = 'db_schema_version'",
                [],
                |row| row.get(0),
            )
            .expect("schema version");
        assert_eq!(version, DB_SCHEMA_VERSION);
    }
}
