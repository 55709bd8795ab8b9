use std::sync::RwLock;

use super::error::ProcessError;
use crate::combat_log::{ActionGroup, HealRecord};

/// Session-wide healing blocks ordered by time. Sources feeding the log may
/// interleave, so records are placed by timestamp rather than appended.
#[derive(Debug, Default)]
pub struct HealLog {
    blocks: RwLock<Vec<ActionGroup<HealRecord>>>,
}

impl HealLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, record: HealRecord, time: f64) -> Result<(), ProcessError> {
        let mut blocks = self.blocks.write().map_err(|_| ProcessError::HealLogPoisoned)?;
        let at = blocks.partition_point(|b| b.begin_time <= time);
        match at.checked_sub(1).and_then(|i| blocks.get_mut(i)) {
            Some(prev) if prev.begin_time == time => prev.actions.push(record),
            _ => blocks.insert(
                at,
                ActionGroup {
                    begin_time: time,
                    actions: vec![record],
                },
            ),
        }
        Ok(())
    }

    /// Copy of the blocks with `begin <= time <= end`.
    pub fn during(&self, begin: f64, end: f64) -> Result<Vec<ActionGroup<HealRecord>>, ProcessError> {
        let blocks = self.blocks.read().map_err(|_| ProcessError::HealLogPoisoned)?;
        let start = blocks.partition_point(|b| b.begin_time < begin);
        Ok(blocks[start..]
            .iter()
            .take_while(|b| b.begin_time <= end)
            .cloned()
            .collect())
    }

    pub fn len(&self) -> usize {
        self.blocks.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut blocks) = self.blocks.write() {
            blocks.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::intern;

    fn heal(total: i64) -> HealRecord {
        HealRecord {
            healer: intern("Cleric"),
            healed: intern("Warrior"),
            total,
            ..Default::default()
        }
    }

    #[test]
    fn during_returns_inclusive_window() {
        let log = HealLog::new();
        for t in [1.0, 2.0, 2.0, 5.0, 9.0] {
            log.add(heal(10), t).unwrap();
        }
        assert_eq!(log.len(), 4);

        let blocks = log.during(2.0, 5.0).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].actions.len(), 2);
        assert_eq!(blocks[1].begin_time, 5.0);

        assert!(log.during(10.0, 20.0).unwrap().is_empty());
    }

    #[test]
    fn interleaved_sources_stay_ordered() {
        let log = HealLog::new();
        log.add(heal(10), 10.0).unwrap();
        log.add(heal(20), 5.0).unwrap();
        log.add(heal(30), 10.0).unwrap();
        log.add(heal(40), 7.0).unwrap();
        assert_eq!(log.len(), 3);

        let blocks = log.during(4.0, 6.0).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].actions[0].total, 20);

        let all = log.during(0.0, 20.0).unwrap();
        let times: Vec<f64> = all.iter().map(|b| b.begin_time).collect();
        assert_eq!(times, vec![5.0, 7.0, 10.0]);
        assert_eq!(all[2].actions.len(), 2);
    }
}
