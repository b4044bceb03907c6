use super::RollParser;

/// Lines belonging to one voter box, starting at its serial anchor line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecordChunk {
    /// Serial number as printed on the anchor line.
    pub serial: String,
    /// Zero-based index of the anchor line within the page.
    pub line_start: usize,
    pub lines: Vec<String>,
}

impl RollParser {
    /// Splits a page into voter chunks. Text before the first serial anchor is
    /// page preamble and belongs to no chunk; a page without anchors yields an
    /// empty list.
    pub fn segment_records(&self, page_text: &str) -> Vec<RawRecordChunk> {
        let mut chunks = Vec::<RawRecordChunk>::new();
        let mut current: Option<RawRecordChunk> = None;

        for (line_index, line) in page_text.lines().enumerate() {
            if let Some(serial) = self.labels.serial_anchor(line) {
                if let Some(active) = current.take() {
                    chunks.push(active);
                }

                current = Some(RawRecordChunk {
                    serial: serial.to_string(),
                    line_start: line_index,
                    lines: vec![line.to_string()],
                });
                continue;
            }

            if let Some(active) = current.as_mut() {
                active.lines.push(line.to_string());
            }
        }

        if let Some(active) = current.take() {
            chunks.push(active);
        }

        chunks
    }
}
