use super::*;
use proptest::prelude::*;

fn seg(begin: f64, end: f64) -> TimeSegment {
    TimeSegment::new(begin, end)
}

#[test]
fn single_tick_is_one_second() {
    assert_eq!(TimeRange::from(seg(5.0, 5.0)).total(), 1.0);
}

#[test]
fn reversed_segment_is_ignored() {
    let mut range = TimeRange::new();
    range.add(seg(10.0, 5.0));
    assert!(range.is_empty());
    assert_eq!(range.total(), 0.0);
}

#[test]
fn overlapping_segments_merge() {
    let range: TimeRange = [seg(0.0, 10.0), seg(5.0, 15.0)].into_iter().collect();
    assert_eq!(range.segments(), &[seg(0.0, 15.0)]);
    assert_eq!(range.total(), 16.0);
}

#[test]
fn touching_segments_merge() {
    let range: TimeRange = [seg(0.0, 10.0), seg(10.0, 12.0)].into_iter().collect();
    assert_eq!(range.segments(), &[seg(0.0, 12.0)]);
}

#[test]
fn surrounding_segment_collapses_covered() {
    let range: TimeRange = [seg(2.0, 3.0), seg(6.0, 7.0), seg(0.0, 10.0)]
        .into_iter()
        .collect();
    assert_eq!(range.segments(), &[seg(0.0, 10.0)]);
}

#[test]
fn contained_and_duplicate_segments_are_noops() {
    let mut range = TimeRange::from(seg(0.0, 10.0));
    range.add(seg(3.0, 4.0));
    range.add(seg(0.0, 10.0));
    assert_eq!(range.segments(), &[seg(0.0, 10.0)]);
}

#[test]
fn small_gap_is_bridged() {
    let range: TimeRange = [seg(0.0, 10.0), seg(16.0, 20.0)].into_iter().collect();
    assert_eq!(range.segments().len(), 2);
    assert_eq!(range.total(), 21.0);
    assert_eq!(range.bridged().segments(), &[seg(0.0, 20.0)]);
}

#[test]
fn large_gap_is_not_bridged() {
    let range: TimeRange = [seg(0.0, 10.0), seg(20.0, 30.0)].into_iter().collect();
    assert_eq!(range.total(), 22.0);
    assert_eq!(range.bridged().segments().len(), 2);
}

#[test]
fn total_does_not_mutate() {
    let range: TimeRange = [seg(0.0, 10.0), seg(12.0, 14.0)].into_iter().collect();
    let before = range.clone();
    let _ = range.total();
    assert_eq!(range, before);
}

#[test]
fn filter_clips_to_window() {
    let range: TimeRange = [seg(0.0, 10.0), seg(20.0, 30.0)].into_iter().collect();

    let clipped = range.filter(Some(5.0), Some(25.0));
    assert_eq!(clipped.segments(), &[seg(5.0, 10.0), seg(20.0, 25.0)]);

    let tail = range.filter(Some(12.0), None);
    assert_eq!(tail.segments(), &[seg(20.0, 30.0)]);

    assert_eq!(range.filter(None, None), range);
    assert!(range.filter(Some(11.0), Some(19.0)).is_empty());
}

#[test]
fn contains_checks_every_segment() {
    let range: TimeRange = [seg(0.0, 10.0), seg(20.0, 30.0)].into_iter().collect();
    assert!(range.contains(0.0));
    assert!(range.contains(25.0));
    assert!(!range.contains(15.0));
    assert!(!range.contains(31.0));
}

fn arb_segment() -> impl Strategy<Value = TimeSegment> {
    (0u32..500, 0u32..40).prop_map(|(begin, len)| seg(begin as f64, (begin + len) as f64))
}

proptest! {
    #[test]
    fn segments_stay_sorted_and_disjoint(segments in prop::collection::vec(arb_segment(), 0..40)) {
        let range: TimeRange = segments.into_iter().collect();
        for pair in range.segments().windows(2) {
            prop_assert!(pair[0].begin <= pair[0].end);
            prop_assert!(pair[0].end < pair[1].begin);
        }
    }

    #[test]
    fn insertion_order_does_not_matter(segments in prop::collection::vec(arb_segment(), 0..30)) {
        let forward: TimeRange = segments.iter().copied().collect();
        let backward: TimeRange = segments.iter().rev().copied().collect();
        prop_assert_eq!(forward.segments(), backward.segments());
        prop_assert_eq!(forward.total(), backward.total());
    }

    #[test]
    fn every_inserted_time_is_covered(segments in prop::collection::vec(arb_segment(), 1..30)) {
        let range: TimeRange = segments.iter().copied().collect();
        for s in &segments {
            prop_assert!(range.contains(s.begin));
            prop_assert!(range.contains(s.end));
        }
    }

    #[test]
    fn bridged_total_never_less_than_raw(segments in prop::collection::vec(arb_segment(), 0..30)) {
        let range: TimeRange = segments.into_iter().collect();
        let raw: f64 = range.segments().iter().map(TimeSegment::total).sum();
        prop_assert!(range.total() >= raw);
    }

    #[test]
    fn reinserting_existing_segment_is_noop(segments in prop::collection::vec(arb_segment(), 1..30)) {
        let range: TimeRange = segments.iter().copied().collect();
        let mut again = range.clone();
        again.add(segments[0]);
        prop_assert_eq!(again, range);
    }
}
