use anyhow::{Context, Result};
use regex::Regex;

/// Every label the roll parser recognises, page-level and per-record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKey {
    Serial,
    VoterId,
    Name,
    FatherOrHusbandName,
    Age,
    Gender,
    HouseNumber,
    WardPartNo,
    WardPartName,
    AcPartInfo,
    AgeAsOn,
    PublicationDate,
}

impl LabelKey {
    pub fn as_str(self) -> &'static str {
        match self {
            LabelKey::Serial => "serial",
            LabelKey::VoterId => "voter_id",
            LabelKey::Name => "name",
            LabelKey::FatherOrHusbandName => "father_or_husband_name",
            LabelKey::Age => "age",
            LabelKey::Gender => "gender",
            LabelKey::HouseNumber => "house_number",
            LabelKey::WardPartNo => "ward_part_no",
            LabelKey::WardPartName => "ward_part_name",
            LabelKey::AcPartInfo => "ac_part_info",
            LabelKey::AgeAsOn => "age_as_on",
            LabelKey::PublicationDate => "publication_date",
        }
    }
}

// Spaces match any run of whitespace, a '.' is optional, an apostrophe may be
// straight, curly or missing. Add synonyms here, not in the parsers.
const LABEL_SYNONYMS: &[(LabelKey, &[&str])] = &[
    (
        LabelKey::Serial,
        &[
            "Sr. No.",
            "S. No.",
            "Serial No.",
            "Serial Number",
            "क्रमांक",
            "अनुक्रमांक",
            "अ. क्र.",
            "क्र. सं.",
        ],
    ),
    (
        LabelKey::VoterId,
        &[
            "EPIC No.",
            "EPIC Number",
            "EPIC",
            "Voter ID",
            "Elector ID",
            "मतदाता पहचान पत्र संख्या",
            "मतदार ओळखपत्र क्रमांक",
            "ओळखपत्र क्रमांक",
        ],
    ),
    (
        LabelKey::Name,
        &[
            "Name",
            "Elector's Name",
            "Voter's Name",
            "नाव",
            "नाम",
            "मतदाराचे पूर्ण नाव",
            "मतदाराचे नाव",
            "मतदाता का नाम",
            "निर्वाचक का नाम",
        ],
    ),
    (
        LabelKey::FatherOrHusbandName,
        &[
            "Father's Name",
            "Husband's Name",
            "Mother's Name",
            "Relative's Name",
            "Father / Husband Name",
            "वडिलांचे नाव",
            "पतीचे नाव",
            "आईचे नाव",
            "पिता का नाम",
            "पति का नाम",
            "पिता/पति का नाम",
        ],
    ),
    (LabelKey::Age, &["Age", "वय", "आयु", "उम्र"]),
    (LabelKey::Gender, &["Gender", "Sex", "लिंग"]),
    (
        LabelKey::HouseNumber,
        &[
            "House No.",
            "House Number",
            "घर क्रमांक",
            "घर क्र.",
            "मकान संख्या",
            "मकान नं.",
            "घर नंबर",
        ],
    ),
    (
        LabelKey::WardPartNo,
        &[
            "Ward Part No.",
            "Ward/Part No.",
            "Ward No.",
            "भाग क्रमांक",
            "भाग क्र.",
            "प्रभाग क्रमांक",
            "भाग संख्या",
        ],
    ),
    (
        LabelKey::WardPartName,
        &[
            "Ward Part Name",
            "Ward/Part Name",
            "Section Name",
            "भाग नाव",
            "भागाचे नाव",
            "भाग का नाम",
        ],
    ),
    (
        LabelKey::AcPartInfo,
        &[
            "AC/Part/Sr No.",
            "AC/Part/S No.",
            "AC No./Part No./Sr No.",
            "विधानसभा/भाग/अनुक्रमांक",
            "वि.स./भाग/अ.क्र.",
        ],
    ),
    (
        LabelKey::AgeAsOn,
        &[
            "Age as on",
            "Age As On Date",
            "Qualifying Date",
            "वय दिनांक",
            "अर्हता दिनांक",
            "आयु दिनांक",
        ],
    ),
    (
        LabelKey::PublicationDate,
        &[
            "Publication Date",
            "Date of Publication",
            "प्रसिद्धी दिनांक",
            "प्रसिद्धीचा दिनांक",
            "प्रकाशन तिथि",
            "प्रकाशन दिनांक",
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelHit {
    pub key: LabelKey,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug)]
pub struct LabelTable {
    matchers: Vec<(LabelKey, Regex)>,
    serial_anchor: Regex,
}

impl LabelTable {
    pub fn new() -> Result<Self> {
        let mut matchers = Vec::with_capacity(LABEL_SYNONYMS.len());
        let mut serial_alternation = String::new();

        for (key, synonyms) in LABEL_SYNONYMS {
            let alternation = build_alternation(synonyms);
            let regex = Regex::new(&format!("(?i)(?:{alternation})"))
                .with_context(|| format!("failed to compile {} label regex", key.as_str()))?;
            if *key == LabelKey::Serial {
                serial_alternation = alternation;
            }
            matchers.push((*key, regex));
        }

        let serial_anchor = Regex::new(&format!(
            r"(?i)^\s*(?:{serial_alternation})\s*[:：.\-)]?\s*([0-9०-९]+)"
        ))
        .context("failed to compile serial anchor regex")?;

        Ok(Self {
            matchers,
            serial_anchor,
        })
    }

    /// Returns the non-overlapping label occurrences on `line`, left to right.
    /// Where two labels overlap the one starting first wins, and at the same
    /// start the longer one wins, so "Father's Name" is never read as "Name".
    pub fn scan_line(&self, line: &str) -> Vec<LabelHit> {
        let mut candidates = Vec::<LabelHit>::new();
        for (key, regex) in &self.matchers {
            for found in regex.find_iter(line) {
                if found.start() == found.end() {
                    continue;
                }
                candidates.push(LabelHit {
                    key: *key,
                    start: found.start(),
                    end: found.end(),
                });
            }
        }

        candidates.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then((b.end - b.start).cmp(&(a.end - a.start)))
        });

        let mut accepted = Vec::<LabelHit>::with_capacity(candidates.len());
        let mut covered_until = 0usize;
        for hit in candidates {
            if hit.start < covered_until {
                continue;
            }
            covered_until = hit.end;
            accepted.push(hit);
        }

        accepted
    }

    /// Serial number printed on an anchor line, as printed.
    pub fn serial_anchor<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.serial_anchor
            .captures(line)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str())
    }
}

fn build_alternation(synonyms: &[&str]) -> String {
    let mut ordered = synonyms.to_vec();
    ordered.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

    ordered
        .iter()
        .map(|synonym| synonym_pattern(synonym))
        .collect::<Vec<String>>()
        .join("|")
}

fn synonym_pattern(synonym: &str) -> String {
    let characters = synonym.trim().chars().collect::<Vec<char>>();
    let mut pattern = String::new();

    if characters
        .first()
        .map(|character| character.is_alphanumeric())
        .unwrap_or(false)
    {
        pattern.push_str(r"\b");
    }

    for (index, character) in characters.iter().enumerate() {
        let is_last = index + 1 == characters.len();
        match character {
            ' ' => pattern.push_str(r"\s*"),
            '/' => pattern.push_str(r"\s*/\s*"),
            '.' if is_last => pattern.push_str(r"(?:\.|\b)"),
            '.' => pattern.push_str(r"\.?"),
            '\'' => pattern.push_str("['’]?"),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }

    if characters
        .last()
        .map(|character| character.is_alphanumeric())
        .unwrap_or(false)
    {
        pattern.push_str(r"\b");
    }

    pattern
}

const VALUE_EDGE_PUNCTUATION: &[char] = &[
    ':', '：', '-', '–', '—', '/', '.', ',', ';', '|', '"', '\'', '‘', '’', '“', '”', '=', '।',
];

/// Trims whitespace and separator punctuation from both ends and collapses
/// internal whitespace runs to one space.
pub fn clean_value(raw: &str) -> String {
    raw.trim_matches(|character: char| {
        character.is_whitespace() || VALUE_EDGE_PUNCTUATION.contains(&character)
    })
    .split_whitespace()
    .collect::<Vec<&str>>()
    .join(" ")
}

/// Lines of text with their label hits computed once.
#[derive(Debug)]
pub struct ScannedLines<'a> {
    lines: Vec<&'a str>,
    hits: Vec<Vec<LabelHit>>,
}

impl<'a> ScannedLines<'a> {
    pub fn new<I>(table: &LabelTable, lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let lines = lines.into_iter().collect::<Vec<&str>>();
        let hits = lines.iter().map(|line| table.scan_line(line)).collect();
        Self { lines, hits }
    }

    /// First non-empty value printed after a `key` label, passed through
    /// `normalize`. The raw value runs to the next label on the same line or to
    /// end of line; a label left dangling at the end of a line takes the
    /// following line when that line has no labels. Returns `""` when nothing
    /// normalizes to a non-empty value.
    pub fn first_value<F>(&self, key: LabelKey, normalize: F) -> String
    where
        F: Fn(&str) -> String,
    {
        for (line_index, line) in self.lines.iter().enumerate() {
            let hits = &self.hits[line_index];
            for (hit_index, hit) in hits.iter().enumerate() {
                if hit.key != key {
                    continue;
                }

                let value_end = hits
                    .get(hit_index + 1)
                    .map(|next| next.start)
                    .unwrap_or(line.len());
                let value = normalize(&clean_value(&line[hit.end..value_end]));
                if !value.is_empty() {
                    return value;
                }

                if hit_index + 1 != hits.len() {
                    continue;
                }

                let next_line = self
                    .lines
                    .get(line_index + 1)
                    .filter(|_| self.hits[line_index + 1].is_empty());
                if let Some(next_line) = next_line {
                    let value = normalize(&clean_value(next_line));
                    if !value.is_empty() {
                        return value;
                    }
                }
            }
        }

        String::new()
    }
}
