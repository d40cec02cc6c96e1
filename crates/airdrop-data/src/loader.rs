//! CSV loaders for the exclusion list and the airdrop transfer table.
//!
//! Both sources are comma-separated files with a header row; fields may be
//! double-quoted to carry commas. Column
//! names are matched case-insensitively, so `AIRDROP_RECIPIENT` and
//! `airdrop_recipient` resolve to the same column. Extra columns (such as a
//! leading index column written by a dataframe export) are ignored.
//!
//! Row-level problems never fail a load: a row with a missing or unparseable
//! address or amount is skipped and counted in the returned [`LoadReport`].
//! A missing file or a header without the required columns is fatal.

use std::path::Path;

use eyre::{eyre, Context, Result};
use tracing::{debug, info};

use crate::types::{Address, ExclusionList, LoadReport, TransferRecord};

/// Column holding centralized addresses in the exclusion list.
pub const EXCLUSION_ADDRESS_COLUMN: &str = "address";

/// Column names of the transfer table (lowercase).
pub const RECIPIENT_COLUMN: &str = "airdrop_recipient";
pub const SENT_TO_COLUMN: &str = "sent_to";
pub const AMOUNT_COLUMN: &str = "amount";
pub const BLOCK_NUMBER_COLUMN: &str = "block_number";

/// Older query exports pluralize the recipient column.
const RECIPIENT_COLUMN_ALIAS: &str = "airdrop_recipients";

/// Positions of the transfer columns within a header row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TransferColumns {
    pub recipient: usize,
    pub sent_to: usize,
    pub amount: usize,
    pub block_number: Option<usize>,
}

impl TransferColumns {
    /// Locate the transfer columns in `headers`.
    ///
    /// # Errors
    /// Returns error naming the first required column that is absent.
    pub(crate) fn locate<S: AsRef<str>>(headers: &[S], source: &str) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| normalize_header(h.as_ref()) == name)
        };
        let require = |name: &str, found: Option<usize>| {
            found.ok_or_else(|| eyre!("{source}: missing required column `{name}`"))
        };

        let recipient = require(
            RECIPIENT_COLUMN,
            find(RECIPIENT_COLUMN).or_else(|| find(RECIPIENT_COLUMN_ALIAS)),
        )?;
        let sent_to = require(SENT_TO_COLUMN, find(SENT_TO_COLUMN))?;
        let amount = require(AMOUNT_COLUMN, find(AMOUNT_COLUMN))?;

        Ok(Self {
            recipient,
            sent_to,
            amount,
            block_number: find(BLOCK_NUMBER_COLUMN),
        })
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\u{feff}')
        .trim_matches('"')
        .trim()
        .to_ascii_lowercase()
}

/// Split one CSV line into trimmed cells.
///
/// Commas inside a double-quoted field do not split it, and `""` inside a
/// quoted field is a literal quote. Enclosing quotes are dropped.
fn split_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

/// Parse a transfer amount.
///
/// Accepts integer, decimal and scientific notation. Non-finite values
/// (`NaN`, `inf`) are treated as unparseable.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let value = raw.trim().trim_matches('"').trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Parse a block number, tolerating float renderings such as `17000000.0`.
pub fn parse_block_number(raw: &str) -> Option<u64> {
    let trimmed = raw.trim().trim_matches('"').trim();
    if let Ok(value) = trimmed.parse::<u64>() {
        return Some(value);
    }
    let value = trimmed.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64)
        .then_some(value as u64)
}

/// Build a [`TransferRecord`] from raw cell text.
///
/// Returns `None` when either address or the amount is missing or unparseable.
/// An unparseable block number leaves `block_number` empty instead.
pub(crate) fn parse_transfer_fields(
    recipient: Option<&str>,
    sent_to: Option<&str>,
    amount: Option<&str>,
    block_number: Option<&str>,
) -> Option<TransferRecord> {
    Some(TransferRecord {
        airdrop_recipient: Address::parse(recipient?)?,
        sent_to: Address::parse(sent_to?)?,
        amount: parse_amount(amount?)?,
        block_number: block_number.and_then(parse_block_number),
    })
}

/// Load the centralized-address exclusion list from a CSV file.
///
/// # Errors
/// Returns error if the file cannot be read or has no `address` column.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_exclusions(path: &Path) -> Result<ExclusionList> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read exclusion list {}", path.display()))?;
    let (list, report) = parse_exclusions_csv(&content, &path.display().to_string())?;
    info!(
        addresses = list.len(),
        rows = report.rows_read,
        skipped = report.rows_skipped,
        "loaded exclusion list"
    );
    Ok(list)
}

/// Parse exclusion-list CSV text.
///
/// Rows whose address cell is missing or blank are skipped and counted.
///
/// # Errors
/// Returns error if the header is missing or lacks an `address` column.
pub fn parse_exclusions_csv(content: &str, source: &str) -> Result<(ExclusionList, LoadReport)> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());
    let (_, header) = lines
        .next()
        .ok_or_else(|| eyre!("{source}: exclusion list is empty (no header row)"))?;
    let column = split_row(header)
        .iter()
        .position(|h| normalize_header(h) == EXCLUSION_ADDRESS_COLUMN)
        .ok_or_else(|| {
            eyre!("{source}: missing required column `{EXCLUSION_ADDRESS_COLUMN}`")
        })?;

    let mut addresses = Vec::new();
    let mut report = LoadReport::default();

    for (line_index, line) in lines {
        report.rows_read += 1;
        match split_row(line).get(column).and_then(|c| Address::parse(c)) {
            Some(address) => addresses.push(address),
            None => {
                report.rows_skipped += 1;
                debug!(
                    file = source,
                    line_number = line_index + 1,
                    "skipping exclusion row without address"
                );
            }
        }
    }

    Ok((addresses.into_iter().collect(), report))
}

/// Load transfer records from a CSV or Parquet file.
///
/// Files ending in `.parquet` go through the Arrow reader; anything else is
/// read as CSV.
///
/// # Errors
/// Returns error if the file cannot be read or lacks a required column.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_transfers(path: &Path) -> Result<(Vec<TransferRecord>, LoadReport)> {
    let is_parquet = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));

    let (records, report) = if is_parquet {
        crate::parquet_reader::read_transfers_parquet(path)?
    } else {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read transfer file {}", path.display()))?;
        parse_transfers_csv(&content, &path.display().to_string())?
    };

    info!(
        rows = report.rows_read,
        skipped = report.rows_skipped,
        "loaded transfer records"
    );
    Ok((records, report))
}

/// Parse transfer-table CSV text.
///
/// # Errors
/// Returns error if the header is missing or lacks a required column.
pub fn parse_transfers_csv(content: &str, source: &str) -> Result<(Vec<TransferRecord>, LoadReport)> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| eyre!("{source}: transfer file is empty (no header row)"))?;
    let columns = TransferColumns::locate(&split_row(header), source)?;

    let mut records = Vec::new();
    let mut report = LoadReport::default();

    for (line_index, line) in lines {
        report.rows_read += 1;
        let cells = split_row(line);
        let cell = |ix: usize| cells.get(ix).map(String::as_str);

        match parse_transfer_fields(
            cell(columns.recipient),
            cell(columns.sent_to),
            cell(columns.amount),
            columns.block_number.and_then(cell),
        ) {
            Some(record) => records.push(record),
            None => {
                report.rows_skipped += 1;
                debug!(
                    file = source,
                    line_number = line_index + 1,
                    "skipping malformed transfer row"
                );
            }
        }
    }

    Ok((records, report))
}
