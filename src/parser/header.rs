/// Which masthead label opens the court/judge block of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLabel {
    CourtNo,
    Dated,
    RegistrarCourtNo,
}

impl HeaderLabel {
    /// Later entries win when present.
    const PRECEDENCE: &'static [HeaderLabel] = &[
        HeaderLabel::Dated,
        HeaderLabel::CourtNo,
        HeaderLabel::RegistrarCourtNo,
    ];

    pub fn marker(self) -> &'static str {
        match self {
            HeaderLabel::CourtNo => "court no. :",
            HeaderLabel::Dated => "dated :",
            HeaderLabel::RegistrarCourtNo => "registrar court no.",
        }
    }

    /// Pick the label for a lowercased section. "dated :" is the fallback
    /// even when absent; a registrar block overrides everything.
    pub fn detect(section_lower: &str) -> HeaderLabel {
        HeaderLabel::PRECEDENCE
            .iter()
            .copied()
            .filter(|label| section_lower.contains(label.marker()))
            .last()
            .unwrap_or(HeaderLabel::Dated)
    }
}

const TERMINATORS: &[&str] = &["(time :", "note:", "this bench"];

/// Labels that carry a court number after them, checked in order.
const COURT_NO_LABELS: &[HeaderLabel] = &[HeaderLabel::CourtNo, HeaderLabel::RegistrarCourtNo];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    Seeking,
    Capturing,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionHeader {
    pub court_no: String,
    pub judge_names: String,
}

fn is_terminator(line_lower: &str) -> bool {
    TERMINATORS.iter().any(|t| line_lower.contains(t))
}

fn court_no_from(line_lower: &str) -> Option<String> {
    COURT_NO_LABELS.iter().find_map(|label| {
        line_lower
            .split(label.marker())
            .nth(1)
            .map(|rest| rest.trim().to_string())
    })
}

/// Walk a section line by line and pull out the court number and the judge
/// lines that follow the header label.
pub fn parse_header(section: &str) -> SectionHeader {
    let label = HeaderLabel::detect(&section.to_lowercase());
    let mut state = WalkState::Seeking;
    let mut court_no = String::new();
    let mut judges: Vec<&str> = Vec::new();

    for line in section.split('\n') {
        let lower = line.to_lowercase();
        if is_terminator(&lower) {
            state = WalkState::Done;
            break;
        }
        if state == WalkState::Capturing {
            judges.push(line.trim());
        }
        if lower.contains(label.marker()) {
            if let Some(no) = court_no_from(&lower) {
                court_no = no;
            }
            state = WalkState::Capturing;
        }
    }

    tracing::trace!(?label, ?state, judges = judges.len(), "section header parsed");

    SectionHeader {
        court_no,
        judge_names: judges.join(", "),
    }
}
