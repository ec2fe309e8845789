//! Column resolution for training sheets
//!
//! Bank exports differ in column naming and order, so the layout is resolved
//! from the header row against prioritized candidate names. Matching is
//! case-insensitive on trimmed header text.

use serde::Serialize;

use crate::source::Cell;

/// Header names that hold the tag label, in priority order
pub const TAG_HEADERS: &[&str] = &["tag", "tags", "categorie", "category"];

/// Header names that hold descriptive text, in priority order
pub const TEXT_HEADERS: &[&str] = &[
    "naam / omschrijving",
    "naam/omschrijving",
    "mededeling",
    "mededelingen",
    "omschrijving",
    "rekening",
    "tegenrekening",
    "mutatiesoort",
    "memo",
    "code",
    "description",
];

/// Header names that hold the transaction amount
pub const AMOUNT_HEADERS: &[&str] = &["bedrag (eur)", "bedrag", "amount"];

/// Header names that hold the counterparty account
pub const COUNTERPARTY_HEADERS: &[&str] = &["tegenrekening", "counterparty"];

/// Resolved column indices for one sheet
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ColumnLayout {
    /// Absent means the sheet cannot be used for training
    pub tag: Option<usize>,
    pub text: Vec<usize>,
    pub amount: Option<usize>,
    pub counterparty: Option<usize>,
}

impl ColumnLayout {
    pub fn is_usable(&self) -> bool {
        self.tag.is_some()
    }
}

/// Normalize a header cell: stringify, trim, lowercase
pub fn normalize_header(cell: &Cell) -> String {
    cell.as_text()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default()
}

/// Resolve the column layout of a header row
pub fn resolve_columns(header: &[Cell]) -> ColumnLayout {
    let normalized: Vec<String> = header.iter().map(normalize_header).collect();
    let position = |name: &str| normalized.iter().position(|h| h == name);
    let first_match = |candidates: &[&str]| candidates.iter().find_map(|c| position(*c));

    let tag = first_match(TAG_HEADERS);
    let amount = first_match(AMOUNT_HEADERS);
    let counterparty = first_match(COUNTERPARTY_HEADERS);

    let mut text: Vec<usize> = normalized
        .iter()
        .enumerate()
        .filter(|(_, h)| TEXT_HEADERS.contains(&h.as_str()))
        .map(|(idx, _)| idx)
        .collect();

    if text.is_empty() {
        // No recognizable text columns: use everything except tag and amount
        text = (0..header.len())
            .filter(|idx| Some(*idx) != tag && Some(*idx) != amount)
            .collect();
    }

    ColumnLayout {
        tag,
        text,
        amount,
        counterparty,
    }
}
