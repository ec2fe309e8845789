//! Corpus loading: sheets → training examples and aggregate statistics
//!
//! Every usable row contributes one document to the heuristic scorer, one
//! `(text, tag)` example to the classifier training set and, when the sheet
//! has a counterparty column, one observation to the counterparty index.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::amount::{amount_token, parse_amount};
use crate::counterparty::CounterpartyIndex;
use crate::error::Result;
use crate::heuristic::HeuristicScorer;
use crate::schema::{normalize_header, resolve_columns, ColumnLayout};
use crate::source::{Cell, Sheet, TableSource};
use crate::tokenize::Tokenizer;

/// One labeled row as seen by the classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingExample {
    pub text: String,
    pub tag: String,
}

/// Why a data row was not used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSkip {
    MissingTag,
    NotAllowed,
    NoTokens,
}

/// Outcome of scanning one sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetSummary {
    pub source: String,
    pub sheet: String,
    pub tag_column: Option<String>,
    pub text_columns: Vec<String>,
    pub amount_column: Option<String>,
    pub counterparty_column: Option<String>,
    pub rows: usize,
    pub used: usize,
    pub skipped_untagged: usize,
    pub skipped_not_allowed: usize,
    pub skipped_empty: usize,
}

/// Everything produced by one load pass
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub scorer: HeuristicScorer,
    pub examples: Vec<TrainingExample>,
    pub counterparties: CounterpartyIndex,
}

impl Corpus {
    pub fn total_docs(&self) -> u64 {
        self.scorer.total_docs()
    }

    /// Distinct tags in the classifier training set
    pub fn distinct_tags(&self) -> usize {
        self.examples
            .iter()
            .map(|e| e.tag.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Accumulates a [`Corpus`] from any number of sheets
pub struct CorpusBuilder<'a> {
    tokenizer: &'a Tokenizer,
    allowed: &'a HashSet<String>,
    corpus: Corpus,
}

impl<'a> CorpusBuilder<'a> {
    /// `allowed` empty means every tag is accepted
    pub fn new(tokenizer: &'a Tokenizer, allowed: &'a HashSet<String>) -> Self {
        Self {
            tokenizer,
            allowed,
            corpus: Corpus::default(),
        }
    }

    /// Read every sheet of a source
    pub fn add_source(&mut self, source: &dyn TableSource) -> Result<Vec<SheetSummary>> {
        let name = source.describe();
        let sheets = source.sheets()?;
        Ok(sheets
            .iter()
            .map(|sheet| self.add_sheet(&name, sheet))
            .collect())
    }

    pub fn add_sheet(&mut self, source: &str, sheet: &Sheet) -> SheetSummary {
        let layout = resolve_columns(sheet.header());
        let mut summary = describe_layout(source, sheet, &layout);

        let Some(tag_col) = layout.tag else {
            warn!(
                "No tag column in sheet '{}' of {}; skipping",
                sheet.name, source
            );
            return summary;
        };

        for row in sheet.data_rows() {
            match self.add_row(row, tag_col, &layout) {
                Ok(()) => summary.used += 1,
                Err(RowSkip::MissingTag) => summary.skipped_untagged += 1,
                Err(RowSkip::NotAllowed) => summary.skipped_not_allowed += 1,
                Err(RowSkip::NoTokens) => summary.skipped_empty += 1,
            }
        }

        debug!(
            "Sheet '{}' of {}: {} of {} rows used",
            sheet.name, source, summary.used, summary.rows
        );
        summary
    }

    fn add_row(
        &mut self,
        row: &[Cell],
        tag_col: usize,
        layout: &ColumnLayout,
    ) -> std::result::Result<(), RowSkip> {
        let tag = row
            .get(tag_col)
            .and_then(Cell::as_text)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if tag.is_empty() {
            return Err(RowSkip::MissingTag);
        }
        if !self.allowed.is_empty() && !self.allowed.contains(&tag) {
            return Err(RowSkip::NotAllowed);
        }

        let text = row_text(row, layout);
        let tokens = self.tokenizer.tokenize(&text);
        if tokens.is_empty() {
            return Err(RowSkip::NoTokens);
        }

        self.corpus.scorer.add_document(&tag, &tokens);
        if let Some(counterparty) = layout
            .counterparty
            .and_then(|idx| row.get(idx))
            .and_then(Cell::as_text)
        {
            self.corpus.counterparties.record(&counterparty, &tag);
        }
        self.corpus.examples.push(TrainingExample { text, tag });
        Ok(())
    }

    pub fn total_docs(&self) -> u64 {
        self.corpus.total_docs()
    }

    pub fn finish(self) -> Corpus {
        self.corpus
    }
}

/// Combined text of a row: text columns, then the amount token
pub fn row_text(row: &[Cell], layout: &ColumnLayout) -> String {
    let mut parts: Vec<String> = layout
        .text
        .iter()
        .filter_map(|idx| row.get(*idx))
        .filter_map(Cell::as_text)
        .collect();

    let amount = layout.amount.and_then(|idx| row.get(idx)).and_then(|cell| match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => parse_amount(s),
        Cell::Empty => None,
    });
    if let Some(token) = amount.and_then(amount_token) {
        parts.push(token);
    }

    parts.join(" ")
}

fn describe_layout(source: &str, sheet: &Sheet, layout: &ColumnLayout) -> SheetSummary {
    let header = sheet.header();
    let name_of = |idx: usize| header.get(idx).map(normalize_header).unwrap_or_default();

    SheetSummary {
        source: source.to_string(),
        sheet: sheet.name.clone(),
        tag_column: layout.tag.map(name_of),
        text_columns: layout.text.iter().map(|idx| name_of(*idx)).collect(),
        amount_column: layout.amount.map(name_of),
        counterparty_column: layout.counterparty.map(name_of),
        rows: sheet.data_rows().len(),
        ..Default::default()
    }
}

/// Scan a source without keeping any state, for layout diagnostics
pub fn inspect_source(
    source: &dyn TableSource,
    tokenizer: &Tokenizer,
    allowed: &HashSet<String>,
) -> Result<Vec<SheetSummary>> {
    CorpusBuilder::new(tokenizer, allowed).add_source(source)
}
