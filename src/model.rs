use serde::{Deserialize, Serialize};

/// Page-level header fields. A field that was not found is `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageMetadata {
    pub ward_part_no: String,
    pub ward_part_name: String,
    pub ac_part_info: String,
    pub age_as_on: String,
    pub publication_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Voter {
    pub id: String,
    pub voter_id: String,
    pub name: String,
    pub father_or_husband_name: String,
    pub age: String,
    pub gender: String,
    pub house_number: String,
    pub ac_part_info: String,
    pub ward_part_no: String,
    pub ward_part_name: String,
}

impl Voter {
    pub fn field(&self, field: VoterField) -> &str {
        match field {
            VoterField::VoterId => &self.voter_id,
            VoterField::Name => &self.name,
            VoterField::FatherOrHusbandName => &self.father_or_husband_name,
            VoterField::Age => &self.age,
            VoterField::Gender => &self.gender,
            VoterField::HouseNumber => &self.house_number,
            VoterField::AcPartInfo => &self.ac_part_info,
            VoterField::WardPartNo => &self.ward_part_no,
            VoterField::WardPartName => &self.ward_part_name,
        }
    }

    /// Empty or whitespace only.
    pub fn is_missing(&self, field: VoterField) -> bool {
        self.field(field).trim().is_empty()
    }

    pub fn field_mut(&mut self, field: VoterField) -> &mut String {
        match field {
            VoterField::VoterId => &mut self.voter_id,
            VoterField::Name => &mut self.name,
            VoterField::FatherOrHusbandName => &mut self.father_or_husband_name,
            VoterField::Age => &mut self.age,
            VoterField::Gender => &mut self.gender,
            VoterField::HouseNumber => &mut self.house_number,
            VoterField::AcPartInfo => &mut self.ac_part_info,
            VoterField::WardPartNo => &mut self.ward_part_no,
            VoterField::WardPartName => &mut self.ward_part_name,
        }
    }
}

/// Every recoverable field of a [`Voter`]. The serial `id` is the merge key and
/// is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoterField {
    VoterId,
    Name,
    FatherOrHusbandName,
    Age,
    Gender,
    HouseNumber,
    AcPartInfo,
    WardPartNo,
    WardPartName,
}

impl VoterField {
    pub const ALL: [VoterField; 9] = [
        VoterField::VoterId,
        VoterField::Name,
        VoterField::FatherOrHusbandName,
        VoterField::Age,
        VoterField::Gender,
        VoterField::HouseNumber,
        VoterField::AcPartInfo,
        VoterField::WardPartNo,
        VoterField::WardPartName,
    ];

    /// JSON key used in recovery responses and manifests.
    pub fn as_str(self) -> &'static str {
        match self {
            VoterField::VoterId => "voterId",
            VoterField::Name => "name",
            VoterField::FatherOrHusbandName => "fatherOrHusbandName",
            VoterField::Age => "age",
            VoterField::Gender => "gender",
            VoterField::HouseNumber => "houseNumber",
            VoterField::AcPartInfo => "acPartInfo",
            VoterField::WardPartNo => "wardPartNo",
            VoterField::WardPartName => "wardPartName",
        }
    }

    /// Column name in the exported `voters` table.
    pub fn column_name(self) -> &'static str {
        match self {
            VoterField::VoterId => "voter_id",
            VoterField::Name => "name",
            VoterField::FatherOrHusbandName => "father_or_husband_name",
            VoterField::Age => "age",
            VoterField::Gender => "gender",
            VoterField::HouseNumber => "house_number",
            VoterField::AcPartInfo => "ac_part_info",
            VoterField::WardPartNo => "ward_part_no",
            VoterField::WardPartName => "ward_part_name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryPair {
    pub id: String,
    pub field: VoterField,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedPage {
    pub source: String,
    #[serde(default)]
    pub sha256: String,
    pub metadata: PageMetadata,
    pub voters: Vec<Voter>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseCounts {
    pub input_file_count: usize,
    pub page_count: usize,
    pub voter_count: usize,
    pub empty_page_count: usize,
    pub missing_voter_id_count: usize,
    pub missing_house_number_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    pub command: String,
    pub house_number_mode: String,
    pub counts: ParseCounts,
    pub pages: Vec<ParsedPage>,
    #[serde(default)]
    pub merges: Vec<MergeRecord>,
}

/// One applied recovery response, kept in the manifest for provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRecord {
    pub merged_at: String,
    pub page_source: String,
    pub category: String,
    pub response_path: String,
    pub response_sha256: String,
    pub pairs_decoded: usize,
    pub filled: usize,
    pub kept_existing: usize,
    pub unmatched: usize,
    pub warnings: Vec<String>,
}
