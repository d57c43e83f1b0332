use std::collections::BTreeMap;

use chrono::Datelike;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::category::{self, Category};
use super::dates;

const DOCUMENT_EXT: &str = ".pdf";

/// One linked cause list document from the listing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub hearing_date: String,
    pub category: Option<Category>,
    pub document_link: String,
}

impl ListingEntry {
    pub fn from_link(link: &str) -> Self {
        ListingEntry {
            hearing_date: dates::hearing_date(link).to_string(),
            category: category::classify(link),
            document_link: link.to_string(),
        }
    }

    pub fn category_label(&self) -> &'static str {
        category::label_or_empty(self.category)
    }
}

/// Listing entries keyed by `link_id`, ordered by key.
pub type Listing = BTreeMap<String, ListingEntry>;

/// `.../2024-10-16/M_R_2.pdf` -> `2024-10-16/M_R_2`.
pub fn link_id(link: &str) -> String {
    let mut parts = link.rsplit('/');
    let file = strip_document_ext(parts.next().unwrap_or_default());
    match parts.next() {
        Some(dir) if !dir.is_empty() => format!("{}/{}", dir, file),
        _ => file.to_string(),
    }
}

fn strip_document_ext(file: &str) -> &str {
    let cut = file.len().saturating_sub(DOCUMENT_EXT.len());
    match file.get(cut..) {
        Some(ext) if ext.eq_ignore_ascii_case(DOCUMENT_EXT) => &file[..cut],
        _ => file,
    }
}

fn is_document_link(href: &str) -> bool {
    href.to_ascii_lowercase().ends_with(DOCUMENT_EXT)
}

/// Per-row accumulators, reset on every `<tr>`.
#[derive(Debug, Default)]
struct RowState {
    links: Vec<String>,
    description: String,
    date_text: String,
}

/// Token-level scan of the cause list table.
#[derive(Debug, Clone)]
pub struct ListingScanner {
    /// Cell text containing this marker is read as the row's hearing date.
    year_marker: String,
}

impl Default for ListingScanner {
    fn default() -> Self {
        ListingScanner::for_year(chrono::Local::now().year())
    }
}

impl ListingScanner {
    pub fn for_year(year: i32) -> Self {
        ListingScanner {
            year_marker: format!("/{}", year),
        }
    }

    /// Best-effort: malformed markup just yields fewer entries.
    pub fn scan(&self, html: &str) -> Listing {
        let mut reader = Reader::from_str(html);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.trim_text(true);

        let mut listing = Listing::new();
        let mut row: Option<RowState> = None;
        let mut awaiting_cell_text = false;
        let mut buf = Vec::new();

        loop {
            let before = reader.buffer_position();
            let event = reader.read_event_into(&mut buf);
            let cell_text_expected = std::mem::take(&mut awaiting_cell_text);

            match event {
                Ok(Event::Start(e)) => {
                    if is_tag(&e, b"tr") {
                        row = Some(RowState::default());
                    } else if let Some(state) = row.as_mut() {
                        awaiting_cell_text = self.on_tag_in_row(&e, state);
                    }
                }
                Ok(Event::Empty(e)) => {
                    if let Some(state) = row.as_mut() {
                        self.on_tag_in_row(&e, state);
                    }
                }
                Ok(Event::Text(e)) if cell_text_expected => {
                    if let Some(state) = row.as_mut() {
                        let text = e
                            .unescape()
                            .map(|t| t.into_owned())
                            .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                        self.on_cell_text(text.trim(), state);
                    }
                }
                Ok(Event::End(e)) if e.name().as_ref().eq_ignore_ascii_case(b"tr") => {
                    if let Some(state) = row.take().filter(|s| !s.links.is_empty()) {
                        trace!(
                            description = %state.description,
                            date = %state.date_text,
                            links = state.links.len(),
                            "listing row"
                        );
                        for link in state.links {
                            listing.insert(link_id(&link), ListingEntry::from_link(&link));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    debug!(error = %e, position = before, "markup error in listing page");
                    if reader.buffer_position() <= before {
                        break;
                    }
                }
                _ => {}
            }
            buf.clear();
        }

        debug!(entries = listing.len(), "listing scanned");
        listing
    }

    /// Returns true when the next text token belongs to a freshly opened cell.
    fn on_tag_in_row(&self, e: &BytesStart<'_>, state: &mut RowState) -> bool {
        if is_tag(e, b"a") {
            if let Some(href) = href_of(e) {
                if is_document_link(&href) {
                    state.links.push(href);
                }
            }
            false
        } else {
            is_tag(e, b"td")
        }
    }

    fn on_cell_text(&self, text: &str, state: &mut RowState) {
        if text.contains(&self.year_marker) {
            state.date_text = text.to_string();
        } else if state.description.is_empty() {
            state.description = text.to_string();
        }
    }
}

fn is_tag(e: &BytesStart<'_>, name: &[u8]) -> bool {
    e.name().as_ref().eq_ignore_ascii_case(name)
}

fn href_of(e: &BytesStart<'_>) -> Option<String> {
    e.html_attributes()
        .filter_map(Result::ok)
        .find(|attr| attr.key.as_ref().eq_ignore_ascii_case(b"href"))
        .map(|attr| match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
}

/// Scan with the current year's date convention.
pub fn scan_listing(html: &str) -> Listing {
    ListingScanner::default().scan(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/listing.html").unwrap()
    }

    #[test]
    fn link_id_from_last_two_segments() {
        assert_eq!(
            link_id("https://cdn.example.in/causelist/2024-10-16/M_R_2.pdf"),
            "2024-10-16/M_R_2"
        );
        assert_eq!(link_id("M_R_2.PDF"), "M_R_2");
    }

    #[test]
    fn scans_fixture_rows() {
        let listing = ListingScanner::for_year(2024).scan(&fixture());
        let keys: Vec<&str> = listing.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "2024-10-16/Advance_List",
                "2024-10-16/M_J_1",
                "2024-10-16/M_J_2",
                "2024-10-16/M_R_2",
            ]
        );

        let main = &listing["2024-10-16/M_J_1"];
        assert_eq!(main.hearing_date, "2024-10-16");
        assert_eq!(main.category, Some(Category::JudgeMiscMain));
        assert!(main.document_link.ends_with("/2024-10-16/M_J_1.pdf"));

        let suppl = &listing["2024-10-16/M_J_2"];
        assert_eq!(suppl.category_label(), "JUDGE MISCELLANEOUS SUPPL");
    }

    #[test]
    fn one_entry_per_row_with_single_anchor() {
        let rows: String = (1..=5)
            .map(|i| {
                format!(
                    "<tr><td>{i}</td><td>Item {i}</td><td><a href=\"/cl/2024-10-{i:02}/M_S_{i}.pdf\">PDF</a></td></tr>"
                )
            })
            .collect();
        let html = format!("<table><tbody>{}</tbody></table>", rows);
        assert_eq!(ListingScanner::for_year(2024).scan(&html).len(), 5);
    }

    #[test]
    fn links_outside_rows_and_non_documents_ignored() {
        let html = r#"<div><a href="/x/2024-10-16/M_J_1.pdf">stray</a></div>
            <table><tr><td><a href="/about.html">About</a></td></tr></table>"#;
        assert!(ListingScanner::for_year(2024).scan(html).is_empty());
    }

    #[test]
    fn duplicate_ids_last_writer_wins() {
        let html = r#"<table>
            <tr><td><a href="https://a.example/2024-10-16/M_J_1.pdf">A</a></td></tr>
            <tr><td><a href="https://b.example/2024-10-16/M_J_1.pdf">B</a></td></tr>
            </table>"#;
        let listing = ListingScanner::for_year(2024).scan(html);
        assert_eq!(listing.len(), 1);
        assert!(listing["2024-10-16/M_J_1"].document_link.starts_with("https://b."));
    }

    #[test]
    fn malformed_markup_is_not_fatal() {
        assert!(scan_listing("").is_empty());
        assert!(scan_listing("<table><tr><td>unterminated").is_empty());
        let html = r#"<table><tr><td><a href="/c/2024-10-16/M_C_1.pdf">x</a></td></tr><tr><td <<<"#;
        let listing = ListingScanner::for_year(2024).scan(html);
        assert_eq!(listing.len(), 1);
    }
}
