//! Run-wide invalid-record budget

use crate::handler::InvalidRow;

/// Additive counter of invalid records with a configured ceiling.
///
/// One budget spans a whole orchestrator run, across every chunk and
/// collection in it. The count never decreases. The budget is exceeded when
/// the total goes strictly above the limit, so a limit of 100 tolerates
/// exactly 100 invalid records and a limit of 0 aborts on the first one.
#[derive(Debug)]
pub struct ErrorBudget {
    limit: u64,
    seen: u64,
}

impl ErrorBudget {
    pub fn new(limit: u64) -> Self {
        Self { limit, seen: 0 }
    }

    /// Count a chunk's invalid-row reports; returns the new running total
    pub fn record(&mut self, reports: &[InvalidRow]) -> u64 {
        self.seen += reports.len() as u64;
        self.seen
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn exceeded(&self) -> bool {
        self.seen > self.limit
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn reports(count: usize) -> Vec<InvalidRow> {
        (0..count)
            .map(|i| InvalidRow {
                index: i as u64,
                id: None,
                raw_json: String::new(),
                reason: "invalid".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_limit_is_inclusive() {
        let mut budget = ErrorBudget::new(100);
        assert_eq!(budget.record(&reports(100)), 100);
        assert!(!budget.exceeded());

        budget.record(&reports(1));
        assert!(budget.exceeded());
        assert_eq!(budget.seen(), 101);
    }

    #[test]
    fn test_accumulates_across_chunks() {
        let mut budget = ErrorBudget::new(100);
        budget.record(&reports(60));
        assert!(!budget.exceeded());
        budget.record(&reports(60));
        assert!(budget.exceeded());
    }

    #[test]
    fn test_zero_limit_aborts_on_first_invalid() {
        let mut budget = ErrorBudget::new(0);
        budget.record(&reports(0));
        assert!(!budget.exceeded());
        budget.record(&reports(1));
        assert!(budget.exceeded());
    }
}
