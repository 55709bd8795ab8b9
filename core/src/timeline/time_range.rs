/// Gaps up to this many seconds between segments still count as active time.
pub const GAP_BRIDGE_SECONDS: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSegment {
    pub begin: f64,
    pub end: f64,
}

impl TimeSegment {
    pub const fn new(begin: f64, end: f64) -> Self {
        Self { begin, end }
    }

    /// Inclusive length: `[5, 5]` is one second.
    pub fn total(&self) -> f64 {
        self.end - self.begin + 1.0
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.begin && time <= self.end
    }

    fn is_valid(&self) -> bool {
        self.begin <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeRange {
    segments: Vec<TimeSegment>,
}

impl TimeRange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segment(segment: TimeSegment) -> Self {
        let mut range = Self::new();
        range.add(segment);
        range
    }

    pub fn segments(&self) -> &[TimeSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first_begin(&self) -> Option<f64> {
        self.segments.first().map(|s| s.begin)
    }

    pub fn last_end(&self) -> Option<f64> {
        self.segments.last().map(|s| s.end)
    }

    /// Insert a segment, merging it with every segment it overlaps, touches or
    /// surrounds. Segments with `begin > end` are ignored.
    pub fn add(&mut self, segment: TimeSegment) {
        if !segment.is_valid() {
            return;
        }

        let at = self.segments.partition_point(|s| s.begin <= segment.begin);
        self.segments.insert(at, segment);

        let mut merged: Vec<TimeSegment> = Vec::with_capacity(self.segments.len());
        for seg in self.segments.drain(..) {
            match merged.last_mut() {
                Some(current) if current.end >= seg.begin => {
                    current.end = current.end.max(seg.end);
                }
                _ => merged.push(seg),
            }
        }
        self.segments = merged;
    }

    pub fn extend<I: IntoIterator<Item = TimeSegment>>(&mut self, segments: I) {
        for segment in segments {
            self.add(segment);
        }
    }

    /// Copy of this range with neighbours closer than [`GAP_BRIDGE_SECONDS`]
    /// joined into one segment.
    pub fn bridged(&self) -> TimeRange {
        let mut result = self.clone();
        for pair in self.segments.windows(2) {
            if pair[0].end + GAP_BRIDGE_SECONDS >= pair[1].begin {
                result.add(TimeSegment::new(pair[0].end, pair[1].begin));
            }
        }
        result
    }

    /// Active seconds after gap bridging.
    pub fn total(&self) -> f64 {
        self.bridged().segments.iter().map(TimeSegment::total).sum()
    }

    pub fn contains(&self, time: f64) -> bool {
        let at = self.segments.partition_point(|s| s.end < time);
        self.segments.get(at).is_some_and(|s| s.contains(time))
    }

    /// Clip every segment to the optional absolute `[min, max]` window.
    pub fn filter(&self, min: Option<f64>, max: Option<f64>) -> TimeRange {
        if min.is_none() && max.is_none() {
            return self.clone();
        }

        let mut result = TimeRange::new();
        for seg in &self.segments {
            let begin = min.map_or(seg.begin, |m| seg.begin.max(m));
            let end = max.map_or(seg.end, |m| seg.end.min(m));
            result.add(TimeSegment::new(begin, end));
        }
        result
    }
}

impl From<TimeSegment> for TimeRange {
    fn from(segment: TimeSegment) -> Self {
        TimeRange::from_segment(segment)
    }
}

impl FromIterator<TimeSegment> for TimeRange {
    fn from_iter<I: IntoIterator<Item = TimeSegment>>(iter: I) -> Self {
        let mut range = TimeRange::new();
        range.extend(iter);
        range
    }
}
