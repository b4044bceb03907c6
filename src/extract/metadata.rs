use chrono::NaiveDate;

use super::RollParser;
use super::digits::normalize_digits;
use super::labels::{LabelKey, ScannedLines};
use crate::model::PageMetadata;

impl RollParser {
    /// Page header fields. Every field that is missing or cannot be read in its
    /// expected shape comes back as `""`.
    pub fn extract_page_metadata(&self, page_text: &str) -> PageMetadata {
        let scanned = ScannedLines::new(&self.labels, page_text.lines());

        PageMetadata {
            ward_part_no: scanned.first_value(LabelKey::WardPartNo, |raw| {
                self.normalize_ward_part_no(raw)
            }),
            ward_part_name: scanned.first_value(LabelKey::WardPartName, str::to_string),
            ac_part_info: scanned.first_value(LabelKey::AcPartInfo, |raw| {
                self.normalize_ac_part_info(raw)
            }),
            age_as_on: scanned.first_value(LabelKey::AgeAsOn, |raw| self.normalize_date(raw)),
            publication_date: scanned
                .first_value(LabelKey::PublicationDate, |raw| self.normalize_date(raw)),
        }
    }

    /// `"5:12"`, `"5 ： 12"` and `"५ : १२"` all become `"<a> : <b>"`. Digits keep
    /// the script they were printed in.
    pub(crate) fn normalize_ward_part_no(&self, raw: &str) -> String {
        self.ward_part_no
            .captures(raw)
            .and_then(|captures| Some((captures.get(1)?, captures.get(2)?)))
            .map(|(ward, part)| format!("{} : {}", ward.as_str(), part.as_str()))
            .unwrap_or_default()
    }

    /// `AC/Part/SerialNo` with ASCII digits and the printed zero padding.
    pub(crate) fn normalize_ac_part_info(&self, raw: &str) -> String {
        let ascii = normalize_digits(raw);
        self.ac_triple
            .captures(&ascii)
            .and_then(|captures| Some((captures.get(1)?, captures.get(2)?, captures.get(3)?)))
            .map(|(ac, part, serial)| {
                format!("{}/{}/{}", ac.as_str(), part.as_str(), serial.as_str())
            })
            .unwrap_or_default()
    }

    /// `DD-MM-YYYY` in ASCII digits, or `""` when the text holds no real date.
    pub(crate) fn normalize_date(&self, raw: &str) -> String {
        let ascii = normalize_digits(raw);
        let Some(captures) = self.date.captures(&ascii) else {
            return String::new();
        };

        let parse = |index: usize| {
            captures
                .get(index)
                .and_then(|value| value.as_str().parse::<u32>().ok())
        };
        let (Some(day), Some(month), Some(year)) = (parse(1), parse(2), parse(3)) else {
            return String::new();
        };

        NaiveDate::from_ymd_opt(year as i32, month, day)
            .map(|date| date.format("%d-%m-%Y").to_string())
            .unwrap_or_default()
    }
}
