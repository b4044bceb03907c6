use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::ParseArgs;
use crate::extract::{HouseNumberMode, ParseOptions, RollParser};
use crate::model::{ParseCounts, ParseRunManifest, ParsedPage};
use crate::util::{now_utc_string, read_text, sha256_bytes, utc_compact_string, write_json_pretty};

pub fn run(args: ParseArgs) -> Result<()> {
    let started_ts = Utc::now();
    let run_id = format!("parse-{}", utc_compact_string(started_ts));

    let inputs = collect_inputs(&args.inputs, args.input_dir.as_deref())?;
    if inputs.is_empty() {
        bail!("no page text given; pass --input <FILE> or --input-dir <DIR>");
    }

    let output_path = args.output.clone().unwrap_or_else(|| {
        args.cache_root
            .join("manifests")
            .join(format!("parse_run_{}.json", utc_compact_string(started_ts)))
    });

    info!(
        run_id = %run_id,
        inputs = inputs.len(),
        house_number_mode = args.house_number_mode.as_str(),
        "starting parse"
    );

    let parser = RollParser::new()?;
    let options = ParseOptions {
        house_number_mode: args.house_number_mode,
    };

    let mut pages = Vec::<ParsedPage>::new();
    for path in &inputs {
        let text = read_text(path)?;
        let page_texts = split_pages(&text);
        let multi_page = page_texts.len() > 1;

        for (index, page_text) in page_texts.iter().enumerate() {
            let source = page_source(path, index, multi_page);
            let mut page = parser.parse_page(&source, page_text, &options);
            page.sha256 = sha256_bytes(page_text.as_bytes());

            for warning in &page.warnings {
                warn!(source = %source, "{warning}");
            }
            info!(source = %source, voters = page.voters.len(), "parsed page");
            pages.push(page);
        }
    }

    let counts = count_pages(inputs.len(), &pages);
    let manifest = ParseRunManifest {
        manifest_version: 1,
        run_id,
        generated_at: now_utc_string(),
        updated_at: None,
        command: render_parse_command(&args),
        house_number_mode: args.house_number_mode.as_str().to_string(),
        counts,
        pages,
        merges: Vec::new(),
    };

    write_json_pretty(&output_path, &manifest)?;
    info!(
        path = %output_path.display(),
        pages = manifest.counts.page_count,
        voters = manifest.counts.voter_count,
        missing_voter_ids = manifest.counts.missing_voter_id_count,
        "wrote parse manifest"
    );

    Ok(())
}

fn collect_inputs(inputs: &[PathBuf], input_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut collected = inputs.to_vec();

    if let Some(dir) = input_dir {
        let mut discovered = Vec::<PathBuf>::new();
        let entries =
            fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

        for entry in entries {
            let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
            let path = entry.path();

            if !entry
                .file_type()
                .with_context(|| format!("failed to inspect file type: {}", path.display()))?
                .is_file()
            {
                continue;
            }

            let is_text = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("txt"))
                .unwrap_or(false);
            if is_text {
                discovered.push(path);
            }
        }

        discovered.sort();
        collected.extend(discovered);
    }

    Ok(collected)
}

/// Page texts of one input file. Pages are separated by form feeds, the way
/// `pdftotext` writes them; trailing blank pages are dropped.
fn split_pages(text: &str) -> Vec<&str> {
    let mut pages = text.split('\u{000C}').collect::<Vec<&str>>();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() && pages.len() > 1 {
            pages.pop();
            continue;
        }
        break;
    }

    pages
}

fn page_source(path: &Path, index: usize, multi_page: bool) -> String {
    if multi_page {
        format!("{}#{}", path.display(), index + 1)
    } else {
        path.display().to_string()
    }
}

pub(crate) fn count_pages(input_file_count: usize, pages: &[ParsedPage]) -> ParseCounts {
    let voters = pages.iter().flat_map(|page| page.voters.iter());

    let mut counts = ParseCounts {
        input_file_count,
        page_count: pages.len(),
        empty_page_count: pages.iter().filter(|page| page.voters.is_empty()).count(),
        ..ParseCounts::default()
    };
    for voter in voters {
        counts.voter_count += 1;
        if voter.voter_id.is_empty() {
            counts.missing_voter_id_count += 1;
        }
        if voter.house_number.is_empty() {
            counts.missing_house_number_count += 1;
        }
    }

    counts
}

/// Index of the page whose source equals `page`, or failing that the single
/// page whose source ends with it.
pub(crate) fn find_page(pages: &[ParsedPage], page: &str) -> Result<usize> {
    if let Some(index) = pages.iter().position(|entry| entry.source == page) {
        return Ok(index);
    }

    let suffix_matches = pages
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.source.ends_with(page))
        .map(|(index, _)| index)
        .collect::<Vec<usize>>();

    match suffix_matches.as_slice() {
        [index] => Ok(*index),
        [] => bail!("no page with source '{page}' in parse manifest"),
        _ => bail!(
            "page '{page}' is ambiguous; {} sources end with it",
            suffix_matches.len()
        ),
    }
}

fn render_parse_command(args: &ParseArgs) -> String {
    let mut command = vec![
        "voterroll".to_string(),
        "parse".to_string(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
    ];

    for input in &args.inputs {
        command.push("--input".to_string());
        command.push(input.display().to_string());
    }
    if let Some(dir) = &args.input_dir {
        command.push("--input-dir".to_string());
        command.push(dir.display().to_string());
    }
    if let Some(path) = &args.output {
        command.push("--output".to_string());
        command.push(path.display().to_string());
    }
    if args.house_number_mode != HouseNumberMode::Full {
        command.push("--house-number-mode".to_string());
        command.push(args.house_number_mode.as_str().to_string());
    }

    command.join(" ")
}
