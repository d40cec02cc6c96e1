//! Integration tests for loading inputs from disk and writing results.

mod common;

use std::path::Path;

use airdrop_analysis::{cluster_transfers, ExclusionPolicy};
use airdrop_data::loader::{load_exclusions, load_transfers};
use airdrop_data::writer::write_assignments_csv;
use common::*;

/// Full file-to-file run over the sample export.
///
/// The CEX transfers are cut, so {aaa*} and {bbb*} stay separate; the burn,
/// zero-value and malformed rows contribute nothing.
#[test]
fn sample_export_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exclusions_path = write_fixture(dir.path(), "centralized_addresses.csv", SAMPLE_EXCLUSIONS_CSV);
    let transfers_path = write_fixture(dir.path(), "data.csv", SAMPLE_TRANSFERS_CSV);

    let exclusions = load_exclusions(&exclusions_path).expect("exclusions should load");
    assert_eq!(exclusions.len(), 2);

    let (records, report) = load_transfers(&transfers_path).expect("transfers should load");
    assert_eq!(report.rows_read, 9);
    assert_eq!(report.rows_skipped, 1);
    assert_eq!(records.len(), 8);

    let outcome = cluster_transfers(&records, &ExclusionPolicy::new(exclusions), &label("sample_eth"));
    assert_eq!(outcome.filter.accepted, 4);
    assert_eq!(outcome.filter.excluded_sink, 3);
    assert_eq!(outcome.filter.non_positive_amount, 1);

    let out = dir.path().join("out/results.csv");
    let written = write_assignments_csv(&out, &outcome.assignments).expect("write");
    assert_eq!(written, 5);

    let text = std::fs::read_to_string(&out).expect("read back");
    assert_eq!(
        text,
        "address,cluster_id\n\
         0xaaa1,sample_eth_1\n\
         0xaaa2,sample_eth_1\n\
         0xaaa3,sample_eth_1\n\
         0xbbb1,sample_eth_2\n\
         0xbbb2,sample_eth_2\n"
    );
}

#[test]
fn missing_exclusion_list_is_fatal() {
    assert!(load_exclusions(Path::new("/nonexistent/centralized_addresses.csv")).is_err());
}

#[test]
fn missing_transfer_file_is_fatal() {
    let err = load_transfers(Path::new("/nonexistent/data.csv")).unwrap_err();
    assert!(format!("{err:#}").contains("data.csv"));
}

#[test]
fn transfer_file_without_required_column_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(dir.path(), "data.csv", "AIRDROP_RECIPIENT,AMOUNT\n0xa,1\n");
    assert!(load_transfers(&path).is_err());
}

#[test]
fn header_only_transfer_file_yields_empty_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(
        dir.path(),
        "data.csv",
        "AIRDROP_RECIPIENT,SENT_TO,AMOUNT,BLOCK_NUMBER\n",
    );
    let (records, report) = load_transfers(&path).expect("header-only file is valid");
    assert!(records.is_empty());
    assert_eq!(report.rows_read, 0);

    let outcome = cluster_transfers(&records, &policy(&[]), &label("x"));
    assert!(outcome.assignments.is_empty());
}
