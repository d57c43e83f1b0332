use serde::{Deserialize, Serialize};
use tracing::debug;

use super::case_number::{self, NormalizedCase};
use super::header::{self, SectionHeader};

/// Masthead repeated at the top of every court's block in a cause list.
pub const DEFAULT_MASTHEAD: &str = "SUPREME COURT OF INDIA";

/// Marker a section must contain to be worth scanning for case numbers.
const CASE_MARKER: &str = "No.";

/// One case-number entry extracted from a cause list section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub serial_no: String,
    pub case_no: String,
    pub diary_no: String,
    pub case_no_display: String,
    pub judge_names: String,
    pub court_no: String,
}

impl CaseRecord {
    fn new(case: NormalizedCase, header: &SectionHeader) -> Self {
        CaseRecord {
            serial_no: case.serial_no,
            case_no: case.case_no,
            diary_no: case.diary_no,
            case_no_display: case.case_no_display,
            judge_names: header.judge_names.clone(),
            court_no: header.court_no.clone(),
        }
    }
}

/// Splits document text into masthead sections and turns each into records.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    masthead: String,
}

impl Default for RecordExtractor {
    fn default() -> Self {
        RecordExtractor::new(DEFAULT_MASTHEAD)
    }
}

impl RecordExtractor {
    pub fn new(masthead: impl Into<String>) -> Self {
        RecordExtractor {
            masthead: masthead.into(),
        }
    }

    /// Records in section order, then match order within each section.
    /// Text without the masthead produces nothing.
    pub fn extract(&self, text: &str) -> Vec<CaseRecord> {
        if self.masthead.is_empty() || !text.contains(&self.masthead) {
            return Vec::new();
        }

        let mut records = Vec::new();
        for (idx, section) in text.split(self.masthead.as_str()).enumerate() {
            if !section.contains(CASE_MARKER) {
                continue;
            }
            let before = records.len();
            extract_section(section, &mut records);
            debug!(section = idx, records = records.len() - before, "section extracted");
        }
        records
    }
}

fn extract_section(section: &str, out: &mut Vec<CaseRecord>) {
    let header = header::parse_header(section);
    out.extend(
        case_number::find_case_numbers(section)
            .into_iter()
            .filter_map(case_number::normalize)
            .map(|case| CaseRecord::new(case, &header)),
    );
}

/// Extract with the default masthead.
pub fn extract_records(text: &str) -> Vec<CaseRecord> {
    RecordExtractor::default().extract(text)
}
