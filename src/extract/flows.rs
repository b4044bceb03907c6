use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde_json::{Map, Value};

use super::RollParser;
use super::fields::HouseNumberMode;
use super::recovery::serial_key;
use crate::model::{RecoveryPair, Voter, VoterField};

/// The secondary extraction passes. Each one asks the external model for a
/// narrow set of fields and feeds the same empty-only merge.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum)]
pub enum RecoveryCategory {
    VoterIds,
    HouseNumbers,
    AcTriples,
    WardPart,
    VoterDetails,
}

impl RecoveryCategory {
    #[cfg(test)]
    pub const ALL: [RecoveryCategory; 5] = [
        RecoveryCategory::VoterIds,
        RecoveryCategory::HouseNumbers,
        RecoveryCategory::AcTriples,
        RecoveryCategory::WardPart,
        RecoveryCategory::VoterDetails,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::VoterIds => "voter-ids",
            Self::HouseNumbers => "house-numbers",
            Self::AcTriples => "ac-triples",
            Self::WardPart => "ward-part",
            Self::VoterDetails => "voter-details",
        }
    }

    pub fn fields(self) -> &'static [VoterField] {
        match self {
            Self::VoterIds => &[VoterField::VoterId],
            Self::HouseNumbers => &[VoterField::HouseNumber],
            Self::AcTriples => &[VoterField::AcPartInfo],
            Self::WardPart => &[VoterField::WardPartNo, VoterField::WardPartName],
            Self::VoterDetails => &[
                VoterField::VoterId,
                VoterField::Name,
                VoterField::FatherOrHusbandName,
                VoterField::Age,
                VoterField::Gender,
                VoterField::HouseNumber,
            ],
        }
    }

    /// The dedicated house-number pass asks for digits only; the full-detail
    /// pass keeps the number as printed.
    pub fn house_number_mode(self) -> HouseNumberMode {
        match self {
            Self::HouseNumbers => HouseNumberMode::DigitsOnly,
            _ => HouseNumberMode::Full,
        }
    }

    fn response_key(self) -> &'static str {
        match self {
            Self::VoterDetails => "voters",
            _ => "pairs",
        }
    }

    /// Serial ids of voters still missing at least one field of this category.
    pub fn candidate_ids(self, voters: &[Voter]) -> Vec<String> {
        voters
            .iter()
            .filter(|voter| {
                self.fields()
                    .iter()
                    .any(|field| voter.is_missing(*field))
            })
            .map(|voter| voter.id.clone())
            .collect()
    }

    pub fn build_prompt(self, page_text: &str, candidate_ids: &[String]) -> String {
        let mut prompt = String::new();

        prompt.push_str(
            "You are reading one page of an Indian electoral roll. The text below was \
             produced by OCR and may mix English and Devanagari (Marathi/Hindi) script. \
             Each voter box starts with a serial number.\n\n",
        );
        prompt.push_str(self.instructions());
        prompt.push_str("\n\n");

        if candidate_ids.is_empty() {
            prompt.push_str("Consider every voter box on the page.\n");
        } else {
            prompt.push_str(&format!(
                "Only report these serial numbers (candidateIds): {}. Ignore every other box.\n",
                candidate_ids.join(", ")
            ));
        }

        prompt.push_str(
            "If a value is not printed or cannot be read with confidence, leave that entry \
             out. Never guess or invent a value.\n",
        );
        prompt.push_str("Respond with JSON only, no commentary, in this shape:\n");
        prompt.push_str(self.response_example());
        prompt.push_str("\n\nPage text:\n");
        prompt.push_str(page_text.trim());
        prompt.push('\n');

        prompt
    }

    fn instructions(self) -> &'static str {
        match self {
            Self::VoterIds => {
                "For each voter box, report the EPIC number (voter ID card number), usually \
                 three letters followed by seven digits, printed near the top right of the box. \
                 Remove spaces and hyphens. A 12-digit number without letters is an Aadhaar \
                 number, not an EPIC number: never report it."
            }
            Self::HouseNumbers => {
                "For each voter box, report the house number (House No. / घर क्रमांक). Report \
                 digits only, converting Devanagari digits to 0-9."
            }
            Self::AcTriples => {
                "For each voter box, report the assembly constituency / part / serial triple \
                 printed next to the EPIC number, formatted as AC/Part/SerialNo, for example \
                 172/25/001."
            }
            Self::WardPart => {
                "Report the ward part number and ward part name from the page header \
                 (Ward Part No. / भाग क्र, Ward Part Name / भाग नाव). Format the number as \
                 \"<ward> : <part>\" and repeat both values for each voter box."
            }
            Self::VoterDetails => {
                "For each voter box, report the full details: EPIC number, name, father's or \
                 husband's name, age, gender and house number. Keep names in the script they \
                 are printed in. Keep the house number exactly as printed, including letters, \
                 slashes and hyphens. A 12-digit number without letters is an Aadhaar number, \
                 not an EPIC number: never report it."
            }
        }
    }

    fn response_example(self) -> &'static str {
        match self {
            Self::VoterIds => r#"{ "pairs": [ { "id": "1", "voterId": "ABC1234567" } ] }"#,
            Self::HouseNumbers => r#"{ "pairs": [ { "id": "1", "houseNumber": "123" } ] }"#,
            Self::AcTriples => r#"{ "pairs": [ { "id": "1", "acPartInfo": "172/25/001" } ] }"#,
            Self::WardPart => {
                r#"{ "pairs": [ { "id": "1", "wardPartNo": "5 : 12", "wardPartName": "SHIVAJI NAGAR" } ] }"#
            }
            Self::VoterDetails => {
                r#"{ "voters": [ { "id": "1", "voterId": "ABC1234567", "name": "", "fatherOrHusbandName": "", "age": "45", "gender": "", "houseNumber": "123-B" } ] }"#
            }
        }
    }
}

impl RollParser {
    /// Turns a saved model response into normalized pairs for `category`.
    ///
    /// An empty response is an empty result. When `candidate_ids` is non-empty,
    /// entries for other serials are dropped. Values are reduced with the same
    /// rules as the primary parser and dropped when nothing remains.
    ///
    /// A page-wide ward/part header is spread over `candidate_ids`, or over
    /// `page_serials` when there are no candidates.
    pub fn decode_recovery_response(
        &self,
        category: RecoveryCategory,
        raw: &str,
        candidate_ids: &[String],
        page_serials: &[String],
    ) -> Result<Vec<RecoveryPair>> {
        let body = strip_code_fence(raw);
        if body.is_empty() {
            return Ok(Vec::new());
        }

        let value: Value = serde_json::from_str(body)
            .with_context(|| format!("{} response is not valid JSON", category.as_str()))?;

        let entries = match value {
            Value::Array(items) => items,
            Value::Object(mut object) => match object.remove(category.response_key()) {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => {
                    let targets = if candidate_ids.is_empty() {
                        page_serials
                    } else {
                        candidate_ids
                    };
                    page_wide_entries(category, &object, targets)
                }
                Some(_) => bail!(
                    "{} response field '{}' is not an array",
                    category.as_str(),
                    category.response_key()
                ),
            },
            Value::Null => Vec::new(),
            _ => bail!("{} response is not a JSON object", category.as_str()),
        };

        let allowed = candidate_ids
            .iter()
            .map(|id| serial_key(id))
            .collect::<HashSet<String>>();
        let mode = category.house_number_mode();

        let mut pairs = Vec::<RecoveryPair>::new();
        for entry in entries {
            let Value::Object(entry) = entry else {
                continue;
            };
            let Some(id) = entry.get("id").and_then(scalar_to_string) else {
                continue;
            };
            if !allowed.is_empty() && !allowed.contains(&serial_key(&id)) {
                continue;
            }

            for (field, raw_value) in entry_values(category, &entry) {
                let value = self.normalize_field_value(field, &raw_value, mode);
                if value.is_empty() {
                    continue;
                }
                pairs.push(RecoveryPair {
                    id: id.clone(),
                    field,
                    value,
                });
            }
        }

        Ok(pairs)
    }
}

/// Field values of one response entry. Accepts both `{id, voterId: ..}` and
/// the generic `{id, field: "voterId", value: ..}` form.
fn entry_values(category: RecoveryCategory, entry: &Map<String, Value>) -> Vec<(VoterField, String)> {
    let mut values = Vec::new();

    if let (Some(field), Some(value)) = (
        entry
            .get("field")
            .and_then(|field| serde_json::from_value::<VoterField>(field.clone()).ok()),
        entry.get("value").and_then(scalar_to_string),
    ) {
        if category.fields().contains(&field) {
            values.push((field, value));
        }
        return values;
    }

    for field in category.fields() {
        if let Some(value) = entry.get(field.as_str()).and_then(scalar_to_string) {
            values.push((*field, value));
        }
    }

    values
}

// A ward/part answer may come back as one header object instead of per-box
// pairs; it then applies to every target serial.
fn page_wide_entries(
    category: RecoveryCategory,
    object: &Map<String, Value>,
    targets: &[String],
) -> Vec<Value> {
    if category != RecoveryCategory::WardPart {
        return Vec::new();
    }

    let header = category
        .fields()
        .iter()
        .filter_map(|field| {
            object
                .get(field.as_str())
                .map(|value| (field.as_str().to_string(), value.clone()))
        })
        .collect::<Map<String, Value>>();
    if header.is_empty() {
        return Vec::new();
    }

    targets
        .iter()
        .map(|id| {
            let mut entry = header.clone();
            entry.insert("id".to_string(), Value::String(id.clone()));
            Value::Object(entry)
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = rest.trim_start_matches(|character: char| character.is_ascii_alphabetic());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
