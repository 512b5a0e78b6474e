//! Pluggable layout-hint and legend-classification providers.
//!
//! Both capabilities are optional priors. Every call is bounded by a timeout
//! and any failure falls back to the default hint or the local keyword
//! classifier; nothing here can make a resolution fail.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cellsense_common::GridSnapshot;
use futures::future::BoxFuture;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::Instrument;

use crate::classify::classify;
use crate::config::ScanLimits;
use crate::error::ProviderError;
use crate::hint::{LayoutHint, LayoutPattern, extract_json_array};
use crate::legend::{
    LegendCategory, LegendCell, LegendEntry, classify_locally, find_legend_cells, sanitize_entries,
};
use crate::scanner::{clean_candidate_text, is_numeric_text};

#[async_trait]
pub trait LayoutHintProvider: Send + Sync {
    /// `sample_rows` are aligned to column A: `sample_rows[r][0]` is column A.
    async fn analyze_layout(
        &self,
        sample_rows: &[Vec<String>],
        sheet_name: &str,
    ) -> Result<LayoutHint, ProviderError>;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait LegendClassifier: Send + Sync {
    async fn classify_legend(&self, cells: &[LegendCell]) -> Result<Vec<LegendEntry>, ProviderError>;

    fn name(&self) -> &'static str;
}

/// First `max_rows` rows of the snapshot as display text, left-padded so
/// index 0 is column A.
pub fn sample_rows(grid: &GridSnapshot, max_rows: usize) -> Vec<Vec<String>> {
    let pad = grid.origin().column.saturating_sub(1) as usize;
    grid.rows()
        .iter()
        .take(max_rows)
        .map(|row| {
            std::iter::repeat_n(String::new(), pad)
                .chain(row.iter().map(|cell| cell.value.to_string()))
                .collect()
        })
        .collect()
}

/// Run the provider under `timeout`; on failure log and use [`LayoutHint::default`].
pub async fn fetch_layout_hint(
    provider: &dyn LayoutHintProvider,
    grid: &GridSnapshot,
    sheet_name: &str,
    limits: &ScanLimits,
    timeout: Duration,
) -> LayoutHint {
    let sample = sample_rows(grid, limits.hint_sample_rows);
    let span = tracing::info_span!("layout_hint", provider = provider.name(), sheet = sheet_name);
    let outcome = tokio::time::timeout(timeout, provider.analyze_layout(&sample, sheet_name))
        .instrument(span)
        .await;
    match outcome {
        Ok(Ok(hint)) => hint,
        Ok(Err(err)) => {
            tracing::warn!(provider = provider.name(), %err, "layout hint failed; using default");
            LayoutHint::default()
        }
        Err(_) => {
            tracing::warn!(
                provider = provider.name(),
                error = %ProviderError::Timeout(timeout),
                "layout hint timed out; using default"
            );
            LayoutHint::default()
        }
    }
}

/// Classify legend cells through `classifier` when given, else (or on
/// failure, timeout or an empty answer) with local keyword heuristics.
pub async fn classify_legend_with_fallback(
    classifier: Option<&dyn LegendClassifier>,
    cells: &[LegendCell],
    timeout: Duration,
) -> Vec<LegendEntry> {
    if cells.is_empty() {
        return Vec::new();
    }
    let Some(classifier) = classifier else {
        return classify_locally(cells);
    };
    let span = tracing::info_span!("legend_classify", provider = classifier.name(), cells = cells.len());
    let outcome = tokio::time::timeout(timeout, classifier.classify_legend(cells))
        .instrument(span)
        .await;
    match outcome {
        Ok(Ok(entries)) => {
            let entries = sanitize_entries(entries);
            if entries.is_empty() {
                tracing::warn!(provider = classifier.name(), "legend classifier returned nothing; using keywords");
                classify_locally(cells)
            } else {
                entries
            }
        }
        Ok(Err(err)) => {
            tracing::warn!(provider = classifier.name(), %err, "legend classifier failed; using keywords");
            classify_locally(cells)
        }
        Err(_) => {
            tracing::warn!(
                provider = classifier.name(),
                error = %ProviderError::Timeout(timeout),
                "legend classifier timed out; using keywords"
            );
            classify_locally(cells)
        }
    }
}

/// Find legend cells and classify them, delegating to `classifier` if present.
pub async fn detect_legend_with(
    grid: &GridSnapshot,
    classifier: Option<&dyn LegendClassifier>,
    limits: &ScanLimits,
    timeout: Duration,
) -> Vec<LegendEntry> {
    let cells = find_legend_cells(grid, limits);
    classify_legend_with_fallback(classifier, &cells, timeout).await
}

/// Local layout inference by voting over sample rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedLayoutProvider;

#[derive(Default)]
struct ColumnVotes(FxHashMap<u32, usize>);

impl ColumnVotes {
    fn add(&mut self, column: u32) {
        *self.0.entry(column).or_default() += 1;
    }

    /// Most frequent column; ties go to the leftmost.
    fn winner(&self) -> Option<u32> {
        self.0
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(col, _)| *col)
    }
}

enum SampleCell<'a> {
    Blank,
    Number,
    Text(&'a str),
}

fn sample_cell(raw: &str) -> SampleCell<'_> {
    let text = clean_candidate_text(raw);
    if text.is_empty() {
        SampleCell::Blank
    } else if is_numeric_text(text) {
        SampleCell::Number
    } else {
        SampleCell::Text(text)
    }
}

impl RuleBasedLayoutProvider {
    pub fn infer(&self, sample_rows: &[Vec<String>]) -> LayoutHint {
        let rows: Vec<Vec<SampleCell<'_>>> = sample_rows
            .iter()
            .map(|row| row.iter().map(|c| sample_cell(c)).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|c| !matches!(c, SampleCell::Blank)))
            .collect();

        let mut labels = ColumnVotes::default();
        let mut symbols = ColumnVotes::default();
        let mut values = ColumnVotes::default();
        let mut same_row = 0usize;
        let mut above_row = 0usize;

        for (i, row) in rows.iter().enumerate() {
            let first_number = row.iter().position(|c| matches!(c, SampleCell::Number));
            if let Some(value_idx) = first_number {
                let texts_left = texts(&row[..value_idx]);
                if !texts_left.is_empty() {
                    same_row += 1;
                    values.add(value_idx as u32 + 1);
                    vote_label_symbol(&texts_left, &mut labels, &mut symbols);
                }
            }
            let next_is_numeric_only = rows
                .get(i + 1)
                .is_some_and(|next| has_number(next) && !has_text(next));
            if has_text(row) && !has_number(row) && next_is_numeric_only {
                above_row += 1;
                vote_label_symbol(&texts(row), &mut labels, &mut symbols);
                if let Some(j) = rows[i + 1].iter().position(|c| matches!(c, SampleCell::Number)) {
                    values.add(j as u32 + 1);
                }
            }
        }

        let header = rows.first().is_some_and(|r| has_text(r) && !has_number(r))
            && rows.len() >= 3
            && rows[1..].iter().all(|r| has_number(r) && !has_text(r));
        let pattern = if header {
            LayoutPattern::HeaderRow
        } else if above_row > same_row {
            LayoutPattern::AboveRow
        } else {
            LayoutPattern::SameRow
        };
        LayoutHint::new(pattern).with_columns(labels.winner(), symbols.winner(), values.winner())
    }
}

/// `(index, text)` of every text cell in `row`.
fn texts<'a>(row: &[SampleCell<'a>]) -> Vec<(usize, &'a str)> {
    row.iter()
        .enumerate()
        .filter_map(|(j, c)| match c {
            SampleCell::Text(t) => Some((j, *t)),
            _ => None,
        })
        .collect()
}

fn has_text(row: &[SampleCell<'_>]) -> bool {
    row.iter().any(|c| matches!(c, SampleCell::Text(_)))
}

fn has_number(row: &[SampleCell<'_>]) -> bool {
    row.iter().any(|c| matches!(c, SampleCell::Number))
}

fn vote_label_symbol(texts: &[(usize, &str)], labels: &mut ColumnVotes, symbols: &mut ColumnVotes) {
    if let Some((j, _)) = texts.iter().find(|(_, t)| classify(t).looks_like_label()) {
        labels.add(*j as u32 + 1);
    }
    if let Some((j, _)) = texts
        .iter()
        .rev()
        .find(|(_, t)| classify(t).looks_like_symbol())
    {
        symbols.add(*j as u32 + 1);
    }
}

#[async_trait]
impl LayoutHintProvider for RuleBasedLayoutProvider {
    async fn analyze_layout(
        &self,
        sample_rows: &[Vec<String>],
        _sheet_name: &str,
    ) -> Result<LayoutHint, ProviderError> {
        Ok(self.infer(sample_rows))
    }

    fn name(&self) -> &'static str {
        "rule-based"
    }
}

/// Local keyword classifier exposed through the provider seam.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordLegendClassifier;

#[async_trait]
impl LegendClassifier for KeywordLegendClassifier {
    async fn classify_legend(&self, cells: &[LegendCell]) -> Result<Vec<LegendEntry>, ProviderError> {
        Ok(classify_locally(cells))
    }

    fn name(&self) -> &'static str {
        "keywords"
    }
}

/// Transport that takes a prompt and returns the model's raw text answer.
pub type Transport = Arc<dyn Fn(String) -> BoxFuture<'static, Result<String, ProviderError>> + Send + Sync>;

/// Layout provider backed by a remote model speaking the JSON contract.
/// The transport (HTTP client, SDK, test double) is supplied by the host.
#[derive(Clone)]
pub struct JsonContractProvider {
    transport: Transport,
}

impl JsonContractProvider {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn prompt(sample_rows: &[Vec<String>], sheet_name: &str) -> String {
        let mut prompt = format!(
            "Sheet \"{sheet_name}\". Rows are tab-separated, starting at column A.\n\
             Answer with JSON only: {{\"layout_pattern\": \"same-row\" | \"above-row\" | \"header-row\", \
             \"label_column\": \"<letter>\", \"symbol_column\": \"<letter>\", \"value_column\": \"<letter>\"}}\n\n"
        );
        for (i, row) in sample_rows.iter().enumerate() {
            prompt.push_str(&format!("{}\t{}\n", i + 1, row.join("\t")));
        }
        prompt
    }
}

#[async_trait]
impl LayoutHintProvider for JsonContractProvider {
    async fn analyze_layout(
        &self,
        sample_rows: &[Vec<String>],
        sheet_name: &str,
    ) -> Result<LayoutHint, ProviderError> {
        let answer = (self.transport)(Self::prompt(sample_rows, sheet_name)).await?;
        LayoutHint::from_json_contract(&answer)
    }

    fn name(&self) -> &'static str {
        "json-contract"
    }
}

#[derive(Debug, Deserialize)]
struct LegendContractEntry {
    color: String,
    category: LegendCategory,
    #[serde(default)]
    description: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

/// Legend classifier backed by a remote model answering with a JSON array of
/// `{color, category, description, confidence}` objects.
#[derive(Clone)]
pub struct JsonLegendProvider {
    transport: Transport,
}

impl JsonLegendProvider {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn prompt(cells: &[LegendCell]) -> String {
        let mut prompt = String::from(
            "Classify each legend color as user_input, calculated_output, calculation, override or unknown.\n\
             Answer with a JSON array of {\"color\", \"category\", \"description\", \"confidence\"}.\n\n",
        );
        for cell in cells {
            prompt.push_str(&format!("{}\t{}\t{}\n", cell.address, cell.color, cell.text));
        }
        prompt
    }
}

#[async_trait]
impl LegendClassifier for JsonLegendProvider {
    async fn classify_legend(&self, cells: &[LegendCell]) -> Result<Vec<LegendEntry>, ProviderError> {
        let answer = (self.transport)(Self::prompt(cells)).await?;
        let body = extract_json_array(&answer)
            .ok_or_else(|| ProviderError::InvalidResponse("no JSON array found".to_string()))?;
        let parsed: Vec<LegendContractEntry> = serde_json::from_str(body)?;
        Ok(parsed
            .into_iter()
            .map(|e| LegendEntry {
                color: e.color,
                category: e.category,
                description: e.description,
                confidence: e.confidence,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "json-legend"
    }
}
