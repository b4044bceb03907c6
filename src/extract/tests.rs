use super::digits::{ascii_digits_only, normalize_digits};
use super::fields::{normalize_house_number, normalize_voter_id};
use super::labels::{LabelKey, clean_value};
use super::recovery::{merge_recovered_fields, serial_key};
use super::*;
use crate::model::{PageMetadata, RecoveryPair, Voter, VoterField};

const SAMPLE_PAGE: &str = "\
ELECTORAL ROLL 2024
Ward Part No. / भाग क्र : 5 : 12
Ward Part Name / भाग नाव : SHIVAJI NAGAR
AC/Part/Sr No: 172/25/001
Age as on / वय दिनांक : 01-01-2024
Publication Date / प्रसिद्धी दिनांक : 15/05/2024

Sr No: 1
EPIC No: ABC 1234567
Name: RAM SHARMA
Father's Name: MOHAN SHARMA
House No: 123-B
Age: 45 Gender: Male

क्रमांक: २
मतदाता पहचान पत्र संख्या: XYZ-9876543
नाव: सीता देवी
पतीचे नाव: राम देवी
घर क्रमांक: 45/2
वय: ३९
लिंग: महिला
";

fn parser() -> RollParser {
    RollParser::new().expect("roll parser regexes compile")
}

fn voter(id: &str) -> Voter {
    Voter {
        id: id.to_string(),
        ..Voter::default()
    }
}

fn pair(id: &str, field: VoterField, value: &str) -> RecoveryPair {
    RecoveryPair {
        id: id.to_string(),
        field,
        value: value.to_string(),
    }
}

#[test]
fn normalize_digits_converts_devanagari_only() {
    assert_eq!(normalize_digits("वय ३९ / 45"), "वय 39 / 45");
    assert_eq!(ascii_digits_only("४५ yrs"), "45");
}

#[test]
fn scan_line_prefers_longer_overlapping_label() {
    let parser = parser();
    let hits = parser.labels.scan_line("Father's Name: MOHAN SHARMA");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].key, LabelKey::FatherOrHusbandName);

    let hits = parser.labels.scan_line("घर क्रमांक: 45/2");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].key, LabelKey::HouseNumber);
}

#[test]
fn scan_line_does_not_match_labels_inside_words() {
    let parser = parser();
    assert!(parser.labels.scan_line("VILLAGE ROAD").is_empty());
}

#[test]
fn clean_value_strips_separators_and_collapses_whitespace() {
    assert_eq!(clean_value(" :  RAM   SHARMA ; "), "RAM SHARMA");
    assert_eq!(clean_value(" / "), "");
}

#[test]
fn extract_page_metadata_reads_bilingual_header() {
    let metadata = parser().extract_page_metadata(SAMPLE_PAGE);
    assert_eq!(metadata.ward_part_no, "5 : 12");
    assert_eq!(metadata.ward_part_name, "SHIVAJI NAGAR");
    assert_eq!(metadata.ac_part_info, "172/25/001");
    assert_eq!(metadata.age_as_on, "01-01-2024");
    assert_eq!(metadata.publication_date, "15-05-2024");
}

#[test]
fn extract_page_metadata_normalizes_ward_part_spacing_and_colon() {
    let parser = parser();
    let metadata = parser.extract_page_metadata("Ward Part No.：7：3");
    assert_eq!(metadata.ward_part_no, "7 : 3");

    let metadata = parser.extract_page_metadata("भाग क्र : ५:१२");
    assert_eq!(metadata.ward_part_no, "५ : १२");
}

#[test]
fn extract_page_metadata_leaves_missing_fields_empty() {
    let metadata = parser().extract_page_metadata("Some unrelated heading\nSr No: 1\nName: A");
    assert_eq!(metadata, PageMetadata::default());
}

#[test]
fn extract_page_metadata_reads_value_from_following_line() {
    let metadata = parser().extract_page_metadata("Ward Part Name :\nGANDHI CHOWK\nSr No: 1");
    assert_eq!(metadata.ward_part_name, "GANDHI CHOWK");
}

#[test]
fn extract_page_metadata_rejects_impossible_dates() {
    let metadata = parser().extract_page_metadata("Publication Date : 31-02-2024");
    assert_eq!(metadata.publication_date, "");

    let metadata = parser().extract_page_metadata("Publication Date : १५.०५.२०२४");
    assert_eq!(metadata.publication_date, "15-05-2024");
}

#[test]
fn segment_records_discards_preamble_and_splits_on_anchors() {
    let chunks = parser().segment_records(SAMPLE_PAGE);
    assert_eq!(chunks.len(), 2);

    assert_eq!(chunks[0].serial, "1");
    assert!(chunks[0].lines[0].starts_with("Sr No"));
    assert!(chunks[0].lines.iter().all(|line| !line.contains("Ward Part")));

    assert_eq!(chunks[1].serial, "२");
    assert!(chunks[1].lines[0].starts_with("क्रमांक"));
    assert!(chunks[1].lines.iter().any(|line| line.contains("महिला")));
}

#[test]
fn segment_records_returns_nothing_without_anchors() {
    let parser = parser();
    assert!(parser.segment_records("").is_empty());
    assert!(
        parser
            .segment_records("Ward Part No. : 1 : 2\nName: NOBODY\nघर क्रमांक: 4")
            .is_empty()
    );
    assert!(
        parser
            .parse_voters_from_text("Ward Part No. : 1 : 2", &ParseOptions::default())
            .is_empty()
    );
}

#[test]
fn parse_voters_from_text_reads_sample_page() {
    let voters = parser().parse_voters_from_text(SAMPLE_PAGE, &ParseOptions::default());
    assert_eq!(voters.len(), 2);

    let ram = voters
        .iter()
        .find(|voter| voter.voter_id == "ABC1234567")
        .expect("latin voter parsed");
    assert!(ram.name.contains("RAM SHARMA"));
    assert_eq!(ram.father_or_husband_name, "MOHAN SHARMA");
    assert_eq!(ram.age, "45");
    assert_eq!(ram.gender, "Male");
    assert_eq!(ram.house_number, "123-B");
    assert_eq!(ram.ac_part_info, "172/25/001");
    assert_eq!(ram.ward_part_no, "5 : 12");
    assert_eq!(ram.ward_part_name, "SHIVAJI NAGAR");

    let sita = voters
        .iter()
        .find(|voter| voter.voter_id == "XYZ9876543")
        .expect("devanagari voter parsed");
    assert!(sita.name.contains("सीता देवी"));
    assert_eq!(sita.father_or_husband_name, "राम देवी");
    assert_eq!(sita.age, "39");
    assert_eq!(sita.house_number, "45/2");
    assert!(["महिला", "Female", "F"].contains(&sita.gender.as_str()));
    assert_eq!(sita.ward_part_name, "SHIVAJI NAGAR");
}

#[test]
fn parse_voter_chunk_digits_only_house_number_mode() {
    let options = ParseOptions {
        house_number_mode: HouseNumberMode::DigitsOnly,
    };
    let voters = parser().parse_voters_from_text(SAMPLE_PAGE, &options);
    assert_eq!(voters[0].house_number, "123");
    assert_eq!(voters[1].house_number, "452");
}

#[test]
fn parse_voter_chunk_leaves_twelve_digit_numbers_out_of_voter_id() {
    let voters = parser().parse_voters_from_text(
        "Sr No: 3\nEPIC No: 1234 5678 9012\nName: X",
        &ParseOptions::default(),
    );
    assert_eq!(voters.len(), 1);
    assert_eq!(voters[0].voter_id, "");
    assert_eq!(voters[0].name, "X");
}

#[test]
fn parse_page_warns_when_no_anchor_is_found() {
    let page = parser().parse_page("p1.txt", "just a header", &ParseOptions::default());
    assert!(page.voters.is_empty());
    assert_eq!(page.warnings.len(), 1);
    assert!(page.warnings[0].contains("no serial anchors"));
}

#[test]
fn normalize_voter_id_uppercases_and_strips_separators() {
    assert_eq!(normalize_voter_id("abc-123 4567"), "ABC1234567");
    assert_eq!(normalize_voter_id("123456789012"), "");
    assert_eq!(normalize_voter_id("MT/09/052/123456"), "MT/09/052/123456");
}

#[test]
fn normalize_voter_id_does_not_absorb_neighbouring_tokens() {
    assert_eq!(normalize_voter_id("ABC1234567 172/25/001"), "ABC1234567");
    assert_eq!(normalize_voter_id("ABC 1234567 172/25/001"), "ABC1234567");
    assert_eq!(normalize_voter_id("ABC1234567 4521"), "ABC1234567");
    assert_eq!(normalize_voter_id("XYZ 98 76543"), "XYZ9876543");
}

#[test]
fn parse_voters_keeps_epic_apart_from_printed_triple() {
    let page = "Sr No: 1\nEPIC No: ABC1234567 172/25/001\nName: RAM SHARMA\nHouse No: 12, Gandhi Road";
    let voters = parser().parse_voters_from_text(page, &ParseOptions::default());
    assert_eq!(voters.len(), 1);
    assert_eq!(voters[0].voter_id, "ABC1234567");
    assert_eq!(voters[0].house_number, "12");
}

#[test]
fn normalize_house_number_keeps_printed_shape_in_full_mode() {
    assert_eq!(normalize_house_number("12 - A", HouseNumberMode::Full), "12-A");
    assert_eq!(normalize_house_number("४५/२", HouseNumberMode::Full), "४५/२");
    assert_eq!(normalize_house_number("४५/२", HouseNumberMode::DigitsOnly), "452");
    assert_eq!(normalize_house_number("12, Gandhi Road", HouseNumberMode::Full), "12");
    assert_eq!(normalize_house_number("45 B / 2", HouseNumberMode::Full), "45 B/2");
}

#[test]
fn serial_key_ignores_padding_and_digit_script() {
    assert_eq!(serial_key("001"), serial_key("1"));
    assert_eq!(serial_key("१"), "1");
    assert_eq!(serial_key("000"), "0");
}

#[test]
fn merge_fills_only_empty_fields() {
    let mut existing = voter("1");
    existing.voter_id = "ABC1234567".to_string();
    let base = vec![existing, voter("2")];

    let pairs = vec![
        pair("001", VoterField::VoterId, "DEF7654321"),
        pair("2", VoterField::VoterId, "XYZ9876543"),
    ];
    let merged = merge_recovered_fields(&base, &pairs);

    assert_eq!(merged[0].voter_id, "ABC1234567");
    assert_eq!(merged[1].voter_id, "XYZ9876543");
}

#[test]
fn merge_is_idempotent() {
    let base = vec![voter("1"), voter("2")];
    let pairs = vec![
        pair("1", VoterField::HouseNumber, "12"),
        pair("2", VoterField::Age, "40"),
        pair("2", VoterField::Age, "41"),
    ];

    let once = merge_recovered_fields(&base, &pairs);
    let twice = merge_recovered_fields(&once, &pairs);
    assert_eq!(once, twice);
    assert_eq!(once[1].age, "40");
}

#[test]
fn merge_drops_pairs_for_unknown_serials() {
    let base = vec![voter("1")];
    let pairs = vec![pair("1", VoterField::Name, "A")];
    let with_dead = vec![
        pair("1", VoterField::Name, "A"),
        pair("99", VoterField::Name, "GHOST"),
    ];

    let (merged, report) = merge_with_report(&base, &with_dead);
    assert_eq!(merged, merge_recovered_fields(&base, &pairs));
    assert_eq!(report.unmatched, 1);
    assert_eq!(report.filled, 1);
}

#[test]
fn merge_reports_kept_and_empty_values() {
    let mut existing = voter("1");
    existing.age = "30".to_string();
    let pairs = vec![
        pair("1", VoterField::Age, "31"),
        pair("1", VoterField::Gender, "   "),
    ];

    let (merged, report) = merge_with_report(&[existing], &pairs);
    assert_eq!(merged[0].age, "30");
    assert_eq!(merged[0].gender, "");
    assert_eq!(report.kept_existing, 1);
    assert_eq!(report.ignored_empty, 1);
}

#[test]
fn whitespace_only_field_is_a_candidate_and_gets_filled() {
    let mut blank = voter("3");
    blank.voter_id = "  ".to_string();
    let base = vec![blank];

    assert_eq!(RecoveryCategory::VoterIds.candidate_ids(&base), vec!["3"]);

    let (merged, report) =
        merge_with_report(&base, &[pair("3", VoterField::VoterId, "ABC1234567")]);
    assert_eq!(merged[0].voter_id, "ABC1234567");
    assert_eq!(report.filled, 1);
}

#[test]
fn merge_with_empty_pairs_is_a_no_op() {
    let base = vec![voter("1"), voter("2")];
    assert_eq!(merge_recovered_fields(&base, &[]), base);
}

#[test]
fn merge_recovered_voters_fills_record_by_record() {
    let mut first = voter("1");
    first.name = "RAM SHARMA".to_string();
    let base = vec![first, voter("2")];

    let mut recovered_first = voter("1");
    recovered_first.name = "R SHARMA".to_string();
    recovered_first.age = "45".to_string();
    let mut recovered_second = voter("2");
    recovered_second.house_number = "45/2".to_string();

    let merged = merge_recovered_voters(&base, &[recovered_first, recovered_second]);
    assert_eq!(merged[0].name, "RAM SHARMA");
    assert_eq!(merged[0].age, "45");
    assert_eq!(merged[1].house_number, "45/2");
}

#[test]
fn candidate_ids_lists_voters_missing_category_fields() {
    let mut complete = voter("1");
    complete.voter_id = "ABC1234567".to_string();
    let voters = vec![complete, voter("2")];

    assert_eq!(RecoveryCategory::VoterIds.candidate_ids(&voters), vec!["2"]);
    assert_eq!(
        RecoveryCategory::HouseNumbers.candidate_ids(&voters),
        vec!["1", "2"]
    );
}

#[test]
fn build_prompt_restricts_to_candidates_and_embeds_page() {
    let prompt =
        RecoveryCategory::VoterIds.build_prompt("Sr No: 2\nName: X", &["2".to_string()]);
    assert!(prompt.contains("candidateIds): 2."));
    assert!(prompt.contains("Aadhaar"));
    assert!(prompt.contains("\"pairs\""));
    assert!(prompt.ends_with("Sr No: 2\nName: X\n"));

    let prompt = RecoveryCategory::VoterDetails.build_prompt("text", &[]);
    assert!(prompt.contains("\"voters\""));
    assert!(prompt.contains("every voter box"));
}

#[test]
fn decode_recovery_response_treats_empty_output_as_no_pairs() {
    let parser = parser();
    for category in RecoveryCategory::ALL {
        let pairs = parser
            .decode_recovery_response(category, "  \n", &[], &[])
            .expect("empty response decodes");
        assert!(pairs.is_empty());
    }
}

#[test]
fn decode_recovery_response_normalizes_and_filters_candidates() {
    let raw = r#"```json
{ "pairs": [
  { "id": "1", "voterId": "abc-123 4567" },
  { "id": 2, "voterId": "123456789012" },
  { "id": "3", "voterId": "DEF7654321" }
] }
```"#;
    let candidates = vec!["01".to_string(), "2".to_string()];
    let pairs = parser()
        .decode_recovery_response(RecoveryCategory::VoterIds, raw, &candidates, &[])
        .expect("fenced response decodes");

    assert_eq!(pairs, vec![pair("1", VoterField::VoterId, "ABC1234567")]);
}

#[test]
fn decode_recovery_response_uses_digits_only_for_house_number_pass() {
    let raw = r#"{ "pairs": [ { "id": "1", "houseNumber": "12-B" }, { "id": "2", "name": "X" } ] }"#;
    let pairs = parser()
        .decode_recovery_response(RecoveryCategory::HouseNumbers, raw, &[], &[])
        .expect("house number response decodes");

    assert_eq!(pairs, vec![pair("1", VoterField::HouseNumber, "12")]);
}

#[test]
fn decode_recovery_response_accepts_generic_field_value_entries() {
    let raw = r#"{ "pairs": [
        { "id": "4", "field": "acPartInfo", "value": "172 / 25 / ००४" },
        { "id": "5", "field": "voterId", "value": "ABC1234567" }
    ] }"#;
    let pairs = parser()
        .decode_recovery_response(RecoveryCategory::AcTriples, raw, &[], &[])
        .expect("generic response decodes");

    assert_eq!(pairs, vec![pair("4", VoterField::AcPartInfo, "172/25/004")]);
}

#[test]
fn decode_recovery_response_expands_page_wide_ward_part_header() {
    let raw = r#"{ "wardPartNo": "5:12", "wardPartName": "SHIVAJI NAGAR" }"#;
    let candidates = vec!["1".to_string(), "2".to_string()];
    let pairs = parser()
        .decode_recovery_response(RecoveryCategory::WardPart, raw, &candidates, &[])
        .expect("header response decodes");

    assert_eq!(pairs.len(), 4);
    assert!(pairs.contains(&pair("2", VoterField::WardPartNo, "5 : 12")));
    assert!(pairs.contains(&pair("1", VoterField::WardPartName, "SHIVAJI NAGAR")));
}

#[test]
fn decode_recovery_response_spreads_ward_part_header_over_page_without_candidates() {
    let raw = r#"{ "wardPartNo": "5:12", "wardPartName": "SHIVAJI NAGAR" }"#;
    let serials = vec!["1".to_string(), "2".to_string(), "3".to_string()];
    let parser = parser();

    let pairs = parser
        .decode_recovery_response(RecoveryCategory::WardPart, raw, &[], &serials)
        .expect("header response decodes");
    assert_eq!(pairs.len(), 6);
    assert!(pairs.contains(&pair("3", VoterField::WardPartNo, "5 : 12")));

    let pairs = parser
        .decode_recovery_response(RecoveryCategory::WardPart, raw, &serials[..1], &serials)
        .expect("header response decodes");
    assert_eq!(pairs.len(), 2);
}

#[test]
fn decode_recovery_response_reads_voter_details_shape() {
    let raw = r#"{ "voters": [ { "id": "2", "voterId": "xyz9876543", "age": 39, "houseNumber": "45/2", "gender": "" } ] }"#;
    let pairs = parser()
        .decode_recovery_response(RecoveryCategory::VoterDetails, raw, &[], &[])
        .expect("voter details response decodes");

    assert_eq!(
        pairs,
        vec![
            pair("2", VoterField::VoterId, "XYZ9876543"),
            pair("2", VoterField::Age, "39"),
            pair("2", VoterField::HouseNumber, "45/2"),
        ]
    );
}

#[test]
fn decode_recovery_response_rejects_malformed_json() {
    let error = parser()
        .decode_recovery_response(RecoveryCategory::VoterIds, "{ pairs: ", &[], &[])
        .expect_err("malformed response should fail");
    assert!(error.to_string().contains("voter-ids"));
}

#[test]
fn recovered_pairs_merge_into_parsed_page() {
    let parser = parser();
    let page = "Sr No: 1\nName: RAM SHARMA\nSr No: 2\nEPIC No: XYZ9876543\nName: SITA";
    let base = parser.parse_voters_from_text(page, &ParseOptions::default());
    let candidates = RecoveryCategory::VoterIds.candidate_ids(&base);
    assert_eq!(candidates, vec!["1"]);

    let raw = r#"{ "pairs": [ { "id": "1", "voterId": "ABC1234567" }, { "id": "2", "voterId": "QQQ0000000" } ] }"#;
    let pairs = parser
        .decode_recovery_response(RecoveryCategory::VoterIds, raw, &candidates, &[])
        .expect("response decodes");
    let merged = merge_recovered_fields(&base, &pairs);

    assert_eq!(merged[0].voter_id, "ABC1234567");
    assert_eq!(merged[1].voter_id, "XYZ9876543");
}
