/// Records sharing one timestamp, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionGroup<R> {
    pub begin_time: f64,
    pub actions: Vec<R>,
}

impl<R> ActionGroup<R> {
    pub fn new(begin_time: f64) -> Self {
        Self {
            begin_time,
            actions: Vec::new(),
        }
    }
}

/// Append a record, coalescing into the last block when its time matches.
pub fn add_action<R>(blocks: &mut Vec<ActionGroup<R>>, record: R, time: f64) {
    match blocks.last_mut() {
        Some(last) if last.begin_time == time => last.actions.push(record),
        _ => blocks.push(ActionGroup {
            begin_time: time,
            actions: vec![record],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_time_coalesces() {
        let mut blocks = Vec::new();
        add_action(&mut blocks, 1, 10.0);
        add_action(&mut blocks, 2, 10.0);
        add_action(&mut blocks, 3, 11.0);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].actions, vec![1, 2]);
        assert_eq!(blocks[1].begin_time, 11.0);
    }

    #[test]
    fn only_last_block_coalesces() {
        let mut blocks = Vec::new();
        add_action(&mut blocks, 'a', 10.0);
        add_action(&mut blocks, 'b', 11.0);
        add_action(&mut blocks, 'c', 10.0);

        assert_eq!(blocks.len(), 3);
    }
}
