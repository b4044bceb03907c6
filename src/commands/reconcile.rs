use anyhow::Result;
use tracing::{info, warn};

use crate::cli::ReconcileArgs;
use crate::commands::parse::count_pages;
use crate::extract::merge_recovered_voters;
use crate::model::{PageMetadata, ParseRunManifest, ParsedPage, Voter, VoterField};
use crate::util::{now_utc_string, read_json, write_json_pretty};

/// Fills gaps in one parse manifest from a second parse of the same pages,
/// such as a run against another OCR engine's text. Pages pair up by source,
/// falling back to identical text hashes.
pub fn run(args: ReconcileArgs) -> Result<()> {
    let mut primary: ParseRunManifest = read_json(&args.parsed)?;
    let secondary: ParseRunManifest = read_json(&args.with)?;

    info!(
        primary = %args.parsed.display(),
        secondary = %args.with.display(),
        pages = primary.pages.len(),
        "reconciling parse manifests"
    );

    let mut reconciled_pages = 0usize;
    let mut filled_total = 0usize;
    for page in &mut primary.pages {
        let Some(other) = matching_page(page, &secondary.pages) else {
            warn!(page = %page.source, "no counterpart page in secondary manifest");
            continue;
        };

        let filled = reconcile_page(page, other);
        reconciled_pages += 1;
        filled_total += filled;
        info!(page = %page.source, filled, "reconciled page");
    }

    primary.counts = count_pages(primary.counts.input_file_count, &primary.pages);
    primary.updated_at = Some(now_utc_string());

    let output_path = args.output.clone().unwrap_or_else(|| args.parsed.clone());
    write_json_pretty(&output_path, &primary)?;
    info!(
        path = %output_path.display(),
        reconciled_pages,
        filled = filled_total,
        "wrote parse manifest"
    );

    Ok(())
}

fn matching_page<'a>(page: &ParsedPage, candidates: &'a [ParsedPage]) -> Option<&'a ParsedPage> {
    candidates
        .iter()
        .find(|other| other.source == page.source)
        .or_else(|| {
            if page.sha256.is_empty() {
                return None;
            }
            candidates.iter().find(|other| other.sha256 == page.sha256)
        })
}

/// Empty-only fill of the page header and of every voter; returns the number
/// of fields that changed from empty to a value.
fn reconcile_page(page: &mut ParsedPage, other: &ParsedPage) -> usize {
    let before = empty_field_count(&page.voters) + empty_metadata_count(&page.metadata);

    fill_metadata(&mut page.metadata, &other.metadata);
    page.voters = merge_recovered_voters(&page.voters, &other.voters);

    let after = empty_field_count(&page.voters) + empty_metadata_count(&page.metadata);
    before.saturating_sub(after)
}

fn fill_metadata(target: &mut PageMetadata, source: &PageMetadata) {
    let slots = [
        (&mut target.ward_part_no, &source.ward_part_no),
        (&mut target.ward_part_name, &source.ward_part_name),
        (&mut target.ac_part_info, &source.ac_part_info),
        (&mut target.age_as_on, &source.age_as_on),
        (&mut target.publication_date, &source.publication_date),
    ];

    for (slot, value) in slots {
        if slot.is_empty() && !value.is_empty() {
            *slot = value.clone();
        }
    }
}

fn empty_metadata_count(metadata: &PageMetadata) -> usize {
    [
        &metadata.ward_part_no,
        &metadata.ward_part_name,
        &metadata.ac_part_info,
        &metadata.age_as_on,
        &metadata.publication_date,
    ]
    .iter()
    .filter(|value| value.is_empty())
    .count()
}

fn empty_field_count(voters: &[Voter]) -> usize {
    voters
        .iter()
        .map(|voter| {
            VoterField::ALL
                .iter()
                .filter(|field| voter.is_missing(**field))
                .count()
        })
        .sum()
}
