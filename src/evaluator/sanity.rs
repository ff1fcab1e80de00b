use dashmap::DashMap;
use tracing::warn;

/// Flags heartbeats whose timestamp does not move forward
///
/// Purely advisory: a flagged heartbeat is still processed. The highest timestamp seen per
/// evaluator is kept, so a single late heartbeat flags everything until the sender catches up.
#[derive(Debug, Default)]
pub struct HeartbeatSanityChecker {
    high_water_marks: DashMap<String, i64>,
}

impl HeartbeatSanityChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when `timestamp` is not newer than anything seen for `evaluator_id`
    pub fn check(&self, evaluator_id: &str, timestamp: i64) -> bool {
        let mut entry = self
            .high_water_marks
            .entry(evaluator_id.to_string())
            .or_insert(i64::MIN);
        let previous = *entry;
        if timestamp > previous {
            *entry = timestamp;
            true
        } else {
            warn!(
                evaluator_id = %evaluator_id,
                timestamp = timestamp,
                previous = previous,
                "⚠️ Heartbeat timestamp did not advance"
            );
            false
        }
    }

    /// Stop tracking an evaluator
    pub fn forget(&self, evaluator_id: &str) {
        self.high_water_marks.remove(evaluator_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_timestamps_are_flagged() {
        let checker = HeartbeatSanityChecker::new();
        assert!(checker.check("eval-1", 100));
        assert!(!checker.check("eval-1", 90));
        assert!(!checker.check("eval-1", 95));
        assert!(!checker.check("eval-1", 100));
        assert!(checker.check("eval-1", 101));
    }

    #[test]
    fn test_evaluators_are_independent() {
        let checker = HeartbeatSanityChecker::new();
        assert!(checker.check("eval-1", 100));
        assert!(checker.check("eval-2", 50));

        checker.forget("eval-1");
        assert!(checker.check("eval-1", 10));
    }
}
