use verdict_core::Record;

use crate::model::Violation;

/// Append-only violation list, optionally capped.
///
/// Entries arrive in row order, so a cap keeps the earliest failures.
#[derive(Debug, Clone, Default)]
pub struct ViolationLog {
    entries: Vec<Violation>,
    cap: Option<usize>,
    omitted: u64,
}

impl ViolationLog {
    pub fn new(cap: Option<usize>) -> Self {
        Self {
            entries: Vec::new(),
            cap,
            omitted: 0,
        }
    }

    pub fn push(&mut self, row_index: u64, row_data: Record, message: String) {
        if self.cap.is_some_and(|cap| self.entries.len() >= cap) {
            self.omitted += 1;
            return;
        }
        self.entries.push(Violation {
            row_index,
            row_data,
            message,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn omitted(&self) -> u64 {
        self.omitted
    }

    pub fn into_parts(self) -> (Vec<Violation>, u64) {
        (self.entries, self.omitted)
    }
}

/// Front-biased truncation for persistence boundaries.
pub fn take_first(violations: &[Violation], limit: usize) -> Vec<Violation> {
    violations.iter().take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_n(log: &mut ViolationLog, n: u64) {
        for idx in 0..n {
            log.push(idx, Record::new(), format!("row {idx}"));
        }
    }

    #[test]
    fn uncapped_log_keeps_everything() {
        let mut log = ViolationLog::new(None);
        push_n(&mut log, 25);
        assert_eq!(log.len(), 25);
        assert_eq!(log.omitted(), 0);
    }

    #[test]
    fn cap_keeps_earliest_rows() {
        let mut log = ViolationLog::new(Some(3));
        push_n(&mut log, 10);
        let (entries, omitted) = log.into_parts();
        assert_eq!(
            entries.iter().map(|v| v.row_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(omitted, 7);
    }

    #[test]
    fn take_first_truncates_front_biased() {
        let mut log = ViolationLog::new(None);
        push_n(&mut log, 12);
        let (entries, _) = log.into_parts();
        let kept = take_first(&entries, 10);
        assert_eq!(kept.len(), 10);
        assert_eq!(kept[0].row_index, 0);
        assert_eq!(kept[9].row_index, 9);
        assert_eq!(take_first(&entries[..2], 10).len(), 2);
    }
}
