//! Best-effort batch bookkeeping: each item succeeds or fails on its own
//! and the caller gets aggregate counts back.

use serde::Serialize;

/// One failed item of a batch, keyed by whatever identifies it to the user
/// (episode number, user id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkItemError {
    pub item: i64,
    pub error: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<BulkItemError>,
}

impl BulkReport {
    pub fn record<T, E: std::fmt::Display>(&mut self, item: i64, outcome: &Result<T, E>) {
        match outcome {
            Ok(_) => self.succeeded += 1,
            Err(e) => {
                self.failed += 1;
                self.errors.push(BulkItemError {
                    item,
                    error: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_mixed_outcomes() {
        let mut report = BulkReport::default();
        report.record(1, &Ok::<(), String>(()));
        report.record(2, &Err::<(), _>("Episode 2 already exists"));
        report.record(3, &Ok::<(), String>(()));

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].item, 2);
        assert_eq!(report.errors[0].error, "Episode 2 already exists");
    }
}
