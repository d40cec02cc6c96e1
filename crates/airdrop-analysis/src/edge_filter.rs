//! Edge filter: decides which transfer records become graph edges.
//!
//! A transfer links two addresses only if it moved real value between
//! addresses that could plausibly belong to the same actor. Centralized
//! addresses (bridges, exchange hot wallets) collect funds from unrelated
//! users and would merge everyone into one giant cluster, so they are cut
//! out. Burns are one-way sinks and never imply common ownership.
//!
//! A record is accepted iff all of:
//! 1. `amount > 0`
//! 2. `airdrop_recipient` is not in the exclusion list
//! 3. `sent_to` is not in the exclusion list, the burn address or the zero address

use std::collections::HashSet;

use airdrop_data::types::{Address, ExclusionList, TransferRecord, BURN_ADDRESS, ZERO_ADDRESS};

/// Why a record did not become an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Amount was zero or negative.
    NonPositiveAmount,
    /// The airdrop recipient is a centralized address.
    ExcludedRecipient,
    /// The destination is a centralized address, the burn address or the zero address.
    ExcludedSink,
}

/// Immutable exclusion configuration passed into the filter.
#[derive(Clone, Debug)]
pub struct ExclusionPolicy {
    centralized: ExclusionList,
    sinks: HashSet<Address>,
}

impl ExclusionPolicy {
    /// Build a policy from the centralized-address list.
    ///
    /// The burn and zero addresses are always added as excluded sinks.
    pub fn new(centralized: ExclusionList) -> Self {
        let sinks = [BURN_ADDRESS, ZERO_ADDRESS]
            .iter()
            .filter_map(|raw| Address::parse(raw))
            .collect();
        Self { centralized, sinks }
    }

    /// Number of centralized addresses (burn/zero sinks not included).
    pub fn centralized_count(&self) -> usize {
        self.centralized.len()
    }

    /// Check a record against the policy.
    ///
    /// Rules are evaluated in order; the first failing rule is reported.
    pub fn rejection(&self, record: &TransferRecord) -> Option<RejectReason> {
        if record.amount.is_nan() || record.amount <= 0.0 {
            return Some(RejectReason::NonPositiveAmount);
        }
        if self.centralized.contains(&record.airdrop_recipient) {
            return Some(RejectReason::ExcludedRecipient);
        }
        if self.centralized.contains(&record.sent_to) || self.sinks.contains(&record.sent_to) {
            return Some(RejectReason::ExcludedSink);
        }
        None
    }

    pub fn accepts(&self, record: &TransferRecord) -> bool {
        self.rejection(record).is_none()
    }
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::new(ExclusionList::default())
    }
}

/// Unordered address pair. `a <= b` always holds, so `{u, v}` and `{v, u}`
/// compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub a: Address,
    pub b: Address,
}

impl Edge {
    pub fn new(u: Address, v: Address) -> Self {
        if u <= v {
            Self { a: u, b: v }
        } else {
            Self { a: v, b: u }
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.a == self.b
    }
}

/// Per-reason counts from one filtering pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub accepted: usize,
    pub non_positive_amount: usize,
    pub excluded_recipient: usize,
    pub excluded_sink: usize,
}

impl FilterStats {
    pub fn rejected(&self) -> usize {
        self.non_positive_amount + self.excluded_recipient + self.excluded_sink
    }

    pub fn total(&self) -> usize {
        self.accepted + self.rejected()
    }

    fn record(&mut self, outcome: Option<RejectReason>) {
        match outcome {
            None => self.accepted += 1,
            Some(RejectReason::NonPositiveAmount) => self.non_positive_amount += 1,
            Some(RejectReason::ExcludedRecipient) => self.excluded_recipient += 1,
            Some(RejectReason::ExcludedSink) => self.excluded_sink += 1,
        }
    }
}

/// Reduce records to accepted edges. Block numbers and amounts are dropped.
///
/// Duplicate pairs are kept here; the graph builder collapses them.
pub fn filter_edges<'a, I>(records: I, policy: &ExclusionPolicy) -> (Vec<Edge>, FilterStats)
where
    I: IntoIterator<Item = &'a TransferRecord>,
{
    let mut stats = FilterStats::default();
    let mut edges = Vec::new();

    for record in records {
        let outcome = policy.rejection(record);
        stats.record(outcome);
        if outcome.is_none() {
            edges.push(Edge::new(
                record.airdrop_recipient.clone(),
                record.sent_to.clone(),
            ));
        }
    }

    (edges, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    fn rec(from: &str, to: &str, amount: f64) -> TransferRecord {
        TransferRecord {
            airdrop_recipient: addr(from),
            sent_to: addr(to),
            amount,
            block_number: Some(1),
        }
    }

    fn policy(centralized: &[&str]) -> ExclusionPolicy {
        ExclusionPolicy::new(centralized.iter().map(|s| addr(s)).collect())
    }

    #[test]
    fn positive_transfer_accepted() {
        assert!(policy(&[]).accepts(&rec("0xa", "0xb", 10.0)));
    }

    #[test]
    fn zero_and_negative_amounts_rejected() {
        let p = policy(&[]);
        assert_eq!(
            p.rejection(&rec("0xa", "0xb", 0.0)),
            Some(RejectReason::NonPositiveAmount)
        );
        assert_eq!(
            p.rejection(&rec("0xa", "0xb", -1.0)),
            Some(RejectReason::NonPositiveAmount)
        );
        assert_eq!(
            p.rejection(&rec("0xa", "0xb", f64::NAN)),
            Some(RejectReason::NonPositiveAmount)
        );
    }

    #[test]
    fn burn_and_zero_sinks_rejected_with_empty_list() {
        let p = policy(&[]);
        assert_eq!(
            p.rejection(&rec("0xa", BURN_ADDRESS, 100.0)),
            Some(RejectReason::ExcludedSink)
        );
        assert_eq!(
            p.rejection(&rec("0xa", ZERO_ADDRESS, 100.0)),
            Some(RejectReason::ExcludedSink)
        );
    }

    #[test]
    fn burn_sink_matched_case_insensitively() {
        let p = policy(&[]);
        let upper = "0x000000000000000000000000000000000000DEAD";
        assert!(!p.accepts(&rec("0xa", upper, 1.0)));
    }

    #[test]
    fn centralized_recipient_and_sink_rejected() {
        let p = policy(&["0xcex"]);
        assert_eq!(
            p.rejection(&rec("0xcex", "0xb", 1.0)),
            Some(RejectReason::ExcludedRecipient)
        );
        assert_eq!(
            p.rejection(&rec("0xa", "0xCEX", 1.0)),
            Some(RejectReason::ExcludedSink)
        );
    }

    #[test]
    fn burn_as_recipient_is_not_a_rule() {
        // Only the destination side is checked against burn/zero.
        assert!(policy(&[]).accepts(&rec(ZERO_ADDRESS, "0xb", 1.0)));
    }

    #[test]
    fn first_failing_rule_wins() {
        let p = policy(&["0xcex"]);
        assert_eq!(
            p.rejection(&rec("0xcex", BURN_ADDRESS, 0.0)),
            Some(RejectReason::NonPositiveAmount)
        );
    }

    #[test]
    fn edge_is_unordered() {
        assert_eq!(
            Edge::new(addr("0xb"), addr("0xa")),
            Edge::new(addr("0xa"), addr("0xb"))
        );
        assert!(Edge::new(addr("0xa"), addr("0xa")).is_self_loop());
    }

    #[test]
    fn filter_edges_counts_reasons() {
        let records = vec![
            rec("0xa", "0xb", 10.0),
            rec("0xb", "0xa", 3.0),
            rec("0xa", "0xc", 0.0),
            rec("0xcex", "0xd", 1.0),
            rec("0xe", BURN_ADDRESS, 1.0),
        ];
        let (edges, stats) = filter_edges(&records, &policy(&["0xcex"]));

        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0], edges[1]);
        assert_eq!(
            stats,
            FilterStats {
                accepted: 2,
                non_positive_amount: 1,
                excluded_recipient: 1,
                excluded_sink: 1,
            }
        );
        assert_eq!(stats.total(), records.len());
    }
}
