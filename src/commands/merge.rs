use anyhow::Result;
use tracing::{info, warn};

use crate::cli::MergeArgs;
use crate::commands::parse::{count_pages, find_page};
use crate::extract::{RollParser, merge_with_report};
use crate::model::{MergeRecord, PageMetadata, ParseRunManifest, Voter};
use crate::util::{now_utc_string, read_json, read_text, sha256_bytes, write_json_pretty};

pub fn run(args: MergeArgs) -> Result<()> {
    let mut manifest: ParseRunManifest = read_json(&args.parsed)?;
    let page_index = find_page(&manifest.pages, &args.page)?;
    let parser = RollParser::new()?;

    let raw = read_text(&args.response)?;
    let page = &manifest.pages[page_index];
    let candidate_ids = if args.all_serials {
        Vec::new()
    } else {
        args.category.candidate_ids(&page.voters)
    };

    info!(
        page = %page.source,
        category = args.category.as_str(),
        candidates = candidate_ids.len(),
        "merging recovery response"
    );

    let mut warnings = Vec::<String>::new();
    if !args.all_serials && candidate_ids.is_empty() {
        warnings.push(format!(
            "no voters on {} are missing {} fields",
            page.source,
            args.category.as_str()
        ));
    }

    let page_serials = page
        .voters
        .iter()
        .map(|voter| voter.id.clone())
        .collect::<Vec<String>>();
    let decoded =
        parser.decode_recovery_response(args.category, &raw, &candidate_ids, &page_serials);
    // A bad response only costs this category; the page keeps what it had.
    let pairs = match decoded {
        Ok(pairs) => pairs,
        Err(error) => {
            warn!(
                response = %args.response.display(),
                error = %format!("{error:#}"),
                "recovery response unusable, nothing merged"
            );
            warnings.push(format!("{error:#}"));
            Vec::new()
        }
    };

    if pairs.is_empty() && !raw.trim().is_empty() && warnings.is_empty() {
        warn!(
            response = %args.response.display(),
            category = args.category.as_str(),
            "recovery response held no usable pairs"
        );
        warnings.push(format!(
            "{} response for {} held no usable pairs",
            args.category.as_str(),
            page.source
        ));
    }

    let (voters, report) = merge_with_report(&page.voters, &pairs);
    info!(
        pairs = pairs.len(),
        filled = report.filled,
        kept_existing = report.kept_existing,
        unmatched = report.unmatched,
        ignored_empty = report.ignored_empty,
        "merge complete"
    );

    let page = &mut manifest.pages[page_index];
    page.voters = voters;
    backfill_page_metadata(&mut page.metadata, &page.voters);

    manifest.merges.push(MergeRecord {
        merged_at: now_utc_string(),
        page_source: page.source.clone(),
        category: args.category.as_str().to_string(),
        response_path: args.response.display().to_string(),
        response_sha256: sha256_bytes(raw.as_bytes()),
        pairs_decoded: pairs.len(),
        filled: report.filled,
        kept_existing: report.kept_existing,
        unmatched: report.unmatched,
        warnings,
    });
    manifest.counts = count_pages(manifest.counts.input_file_count, &manifest.pages);
    manifest.updated_at = Some(now_utc_string());

    let output_path = args.output.clone().unwrap_or_else(|| args.parsed.clone());
    write_json_pretty(&output_path, &manifest)?;
    info!(path = %output_path.display(), "wrote parse manifest");

    Ok(())
}

/// Page header fields that the parser missed but a recovery pass supplied on
/// the voters are copied back onto the page.
fn backfill_page_metadata(metadata: &mut PageMetadata, voters: &[Voter]) {
    fn first_non_empty<'a>(voters: &'a [Voter], get: fn(&Voter) -> &str) -> Option<&'a str> {
        voters
            .iter()
            .map(get)
            .find(|value| !value.is_empty())
    }

    if metadata.ward_part_no.is_empty() {
        if let Some(value) = first_non_empty(voters, |voter| voter.ward_part_no.as_str()) {
            metadata.ward_part_no = value.to_string();
        }
    }
    if metadata.ward_part_name.is_empty() {
        if let Some(value) = first_non_empty(voters, |voter| voter.ward_part_name.as_str()) {
            metadata.ward_part_name = value.to_string();
        }
    }
}
