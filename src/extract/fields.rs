use clap::ValueEnum;
use tracing::debug;

use super::RollParser;
use super::digits::{ascii_digits_only, normalize_digits};
use super::labels::{LabelKey, ScannedLines, clean_value};
use super::segment::RawRecordChunk;
use crate::model::{PageMetadata, ParsedPage, Voter, VoterField};

/// How house numbers are reduced once captured.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum HouseNumberMode {
    /// Alphanumerics, `/` and `-` as printed, digits in either script.
    #[default]
    Full,
    /// ASCII digits only.
    DigitsOnly,
}

impl HouseNumberMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::DigitsOnly => "digits-only",
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct ParseOptions {
    pub house_number_mode: HouseNumberMode,
}

impl RollParser {
    pub fn parse_voter_chunk(
        &self,
        chunk: &RawRecordChunk,
        page_meta: &PageMetadata,
        options: &ParseOptions,
    ) -> Voter {
        let scanned = ScannedLines::new(&self.labels, chunk.lines.iter().map(String::as_str));
        let mode = options.house_number_mode;

        let voter = Voter {
            id: chunk.serial.clone(),
            voter_id: scanned.first_value(LabelKey::VoterId, normalize_voter_id),
            name: scanned.first_value(LabelKey::Name, str::to_string),
            father_or_husband_name: scanned
                .first_value(LabelKey::FatherOrHusbandName, str::to_string),
            age: scanned.first_value(LabelKey::Age, ascii_digits_only),
            gender: scanned.first_value(LabelKey::Gender, str::to_string),
            house_number: scanned
                .first_value(LabelKey::HouseNumber, |raw| normalize_house_number(raw, mode)),
            ac_part_info: page_meta.ac_part_info.clone(),
            ward_part_no: page_meta.ward_part_no.clone(),
            ward_part_name: page_meta.ward_part_name.clone(),
        };

        if voter.voter_id.is_empty() {
            debug!(
                serial = %chunk.serial,
                line = chunk.line_start + 1,
                "no EPIC number parsed for voter box"
            );
        }

        voter
    }

    /// Voters of a single page, metadata stamped on each.
    pub fn parse_voters_from_text(&self, page_text: &str, options: &ParseOptions) -> Vec<Voter> {
        let page_meta = self.extract_page_metadata(page_text);
        self.segment_records(page_text)
            .iter()
            .map(|chunk| self.parse_voter_chunk(chunk, &page_meta, options))
            .collect()
    }

    pub fn parse_page(&self, source: &str, page_text: &str, options: &ParseOptions) -> ParsedPage {
        let metadata = self.extract_page_metadata(page_text);
        let chunks = self.segment_records(page_text);

        let mut warnings = Vec::<String>::new();
        if chunks.is_empty() {
            warnings.push(format!("no serial anchors detected in {source}"));
        }

        let voters = chunks
            .iter()
            .map(|chunk| self.parse_voter_chunk(chunk, &metadata, options))
            .collect::<Vec<Voter>>();

        let missing_ids = voters
            .iter()
            .filter(|voter| voter.voter_id.is_empty())
            .count();
        if missing_ids > 0 {
            warnings.push(format!(
                "{missing_ids} of {} voters in {source} have no EPIC number",
                voters.len()
            ));
        }

        ParsedPage {
            source: source.to_string(),
            sha256: String::new(),
            metadata,
            voters,
            warnings,
        }
    }

    /// Applies the per-field reduction used by the primary parser to a value
    /// that came from somewhere else, such as a recovery response.
    pub(crate) fn normalize_field_value(
        &self,
        field: VoterField,
        raw: &str,
        mode: HouseNumberMode,
    ) -> String {
        let cleaned = clean_value(raw);
        match field {
            VoterField::VoterId => normalize_voter_id(&cleaned),
            VoterField::Age => ascii_digits_only(&cleaned),
            VoterField::HouseNumber => normalize_house_number(&cleaned, mode),
            VoterField::AcPartInfo => self.normalize_ac_part_info(&cleaned),
            VoterField::WardPartNo => self.normalize_ward_part_no(&cleaned),
            VoterField::Name
            | VoterField::FatherOrHusbandName
            | VoterField::Gender
            | VoterField::WardPartName => cleaned,
        }
    }
}

/// Uppercase EPIC number without spaces or hyphens. A bare 12-digit number is
/// an Aadhaar-style identifier, not an EPIC, and yields `""`.
///
/// The first whitespace-separated piece is the id. Following pieces are joined
/// onto it only while the result keeps the letters-then-digits EPIC shape, so
/// an OCR split like `ABC 1234567` is rejoined but a neighbouring AC/Part/SNo
/// triple is not.
pub fn normalize_voter_id(raw: &str) -> String {
    let normalized = normalize_digits(raw).to_uppercase();
    let mut pieces = normalized.split_whitespace().map(id_piece);

    let Some(first) = pieces.next().filter(|piece| !piece.is_empty()) else {
        return String::new();
    };

    let mut joined = first.clone();
    let mut longest_complete = epic_shape(&first).complete.then(|| first.clone());
    for piece in pieces {
        let candidate = format!("{joined}{piece}");
        if piece.is_empty() || !epic_shape(&candidate).prefix {
            break;
        }
        if epic_shape(&candidate).complete {
            longest_complete = Some(candidate.clone());
        }
        joined = candidate;
    }

    let token = longest_complete.unwrap_or(first);
    if token.len() == 12 && token.chars().all(|character| character.is_ascii_digit()) {
        return String::new();
    }

    token
}

// Leading run of id characters in one piece, hyphens dropped.
fn id_piece(piece: &str) -> String {
    piece
        .chars()
        .filter(|character| *character != '-')
        .take_while(|character| character.is_ascii_alphanumeric() || *character == '/')
        .collect::<String>()
        .trim_matches('/')
        .to_string()
}

#[derive(Debug, Clone, Copy)]
struct EpicShape {
    prefix: bool,
    complete: bool,
}

// Two to four letters then six to eight digits; a prefix may stop early.
fn epic_shape(token: &str) -> EpicShape {
    let letters = token
        .chars()
        .take_while(|character| character.is_ascii_alphabetic())
        .count();
    let digits = &token[letters..];
    if letters == 0 || letters > 4 || !digits.chars().all(|character| character.is_ascii_digit())
    {
        return EpicShape {
            prefix: false,
            complete: false,
        };
    }

    EpicShape {
        prefix: digits.len() <= 8,
        complete: letters >= 2 && (6..=8).contains(&digits.len()),
    }
}

/// In `Full` mode the number runs to the first `,` or `;`. Words keep one
/// space between them and spaces around `/` and `-` are dropped.
pub fn normalize_house_number(raw: &str, mode: HouseNumberMode) -> String {
    match mode {
        HouseNumberMode::DigitsOnly => ascii_digits_only(raw),
        HouseNumberMode::Full => {
            let printed = raw.split([',', ';']).next().unwrap_or_default();
            let kept = printed
                .chars()
                .map(|character| {
                    if character.is_alphanumeric()
                        || is_devanagari_sign(character)
                        || character == '/'
                        || character == '-'
                    {
                        character
                    } else {
                        ' '
                    }
                })
                .collect::<String>();

            let mut house_number = String::new();
            for word in kept.split_whitespace() {
                let glued = house_number.ends_with(['/', '-']) || word.starts_with(['/', '-']);
                if !house_number.is_empty() && !glued {
                    house_number.push(' ');
                }
                house_number.push_str(word);
            }

            house_number
                .trim_matches(|character: char| character == '/' || character == '-')
                .to_string()
        }
    }
}

// Viramas and nuktas are not alphabetic but are part of Devanagari letters.
fn is_devanagari_sign(character: char) -> bool {
    ('\u{0900}'..='\u{0903}').contains(&character)
        || ('\u{093C}'..='\u{094F}').contains(&character)
}
