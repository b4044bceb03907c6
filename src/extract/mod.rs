//! Electoral-roll page parsing and recovery reconciliation.
//!
//! Everything here is pure text processing: no I/O and no shared mutable
//! state, so pages can be parsed independently and in any order.

use anyhow::{Context, Result};
use regex::Regex;

mod digits;
mod fields;
mod flows;
mod labels;
mod metadata;
mod recovery;
mod segment;
#[cfg(test)]
mod tests;

pub use fields::{HouseNumberMode, ParseOptions};
pub use flows::RecoveryCategory;
pub use recovery::{merge_recovered_voters, merge_with_report};

use labels::LabelTable;

#[derive(Debug)]
pub struct RollParser {
    labels: LabelTable,
    ward_part_no: Regex,
    ac_triple: Regex,
    date: Regex,
}

impl RollParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            labels: LabelTable::new()?,
            ward_part_no: Regex::new(r"([0-9०-९]+)\s*[:：]\s*([0-9०-९]+)")
                .context("failed to compile ward part number regex")?,
            ac_triple: Regex::new(r"(\d+)\s*/\s*(\d+)\s*/\s*(\d+)")
                .context("failed to compile AC/Part/Serial regex")?,
            date: Regex::new(r"(\d{1,2})\s*[-./]\s*(\d{1,2})\s*[-./]\s*(\d{4})")
                .context("failed to compile date regex")?,
        })
    }
}
