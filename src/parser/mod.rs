pub mod case_number;
pub mod category;
pub mod dates;
pub mod header;
pub mod listing;
pub mod records;

pub use category::Category;
pub use listing::{link_id, scan_listing, Listing, ListingEntry, ListingScanner};
pub use records::{extract_records, CaseRecord, RecordExtractor};

/// A downloaded document's text together with its listing identifier.
pub struct DocumentText {
    pub id: String,
    pub text: String,
}

/// Records of one document, tagged with the document they came from.
pub struct DocumentRecords {
    pub id: String,
    pub records: Vec<CaseRecord>,
}

/// Two-stage pipeline per document: masthead sections -> case records.
pub fn process_document(extractor: &RecordExtractor, doc: &DocumentText) -> DocumentRecords {
    DocumentRecords {
        id: doc.id.clone(),
        records: extractor.extract(&doc.text),
    }
}
