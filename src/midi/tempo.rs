//! Tempo map: piecewise conversion from ticks to seconds.

/// Default tempo when a file declares none (120 BPM).
pub const DEFAULT_MICROS_PER_QUARTER: u32 = 500_000;

/// A Set-Tempo event at an absolute tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoChange {
    pub tick: u64,
    /// Microseconds per quarter note. Always non-zero.
    pub micros_per_quarter: u32,
}

/// One tempo segment plus the accumulated time before it.
#[derive(Debug, Clone, Copy)]
struct Segment {
    tick: u64,
    micros_per_quarter: u32,
    /// Sum of `ticks * micros_per_quarter` over all earlier segments.
    units_before: u128,
}

/// Sorted tempo changes for a whole file.
///
/// Conversion is exact up to the final division: elapsed time is accumulated
/// as an integer number of tick-microseconds and divided by
/// `1_000_000 * ticks_per_quarter` once. Prefix sums over the segments make
/// each lookup a binary search instead of a walk from tick zero, with the
/// same result the walk would give.
#[derive(Debug, Clone)]
pub struct TempoMap {
    ticks_per_quarter: u16,
    segments: Vec<Segment>,
}

impl TempoMap {
    /// Builds the map from every tempo change found in the file.
    ///
    /// A 120 BPM entry at tick 0 always comes first; a file tempo at tick 0
    /// follows it and therefore wins. Changes sharing a tick keep the order
    /// they were encountered in.
    ///
    /// # Arguments
    ///
    /// * `ticks_per_quarter` - Division from the file header (non-zero)
    /// * `changes` - Tempo changes in encounter order
    pub fn new(ticks_per_quarter: u16, changes: impl IntoIterator<Item = TempoChange>) -> Self {
        let mut sorted = vec![TempoChange {
            tick: 0,
            micros_per_quarter: DEFAULT_MICROS_PER_QUARTER,
        }];
        sorted.extend(changes);
        // Stable sort: ties stay in first-seen order
        sorted.sort_by_key(|change| change.tick);

        let mut segments = Vec::with_capacity(sorted.len());
        let mut units: u128 = 0;
        let mut previous: Option<TempoChange> = None;
        for change in sorted {
            if let Some(prev) = previous {
                units += (change.tick - prev.tick) as u128 * prev.micros_per_quarter as u128;
            }
            segments.push(Segment {
                tick: change.tick,
                micros_per_quarter: change.micros_per_quarter,
                units_before: units,
            });
            previous = Some(change);
        }

        Self {
            ticks_per_quarter,
            segments,
        }
    }

    pub fn ticks_per_quarter(&self) -> u16 {
        self.ticks_per_quarter
    }

    /// Number of entries, including the implicit default at tick 0.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segment governing `tick`: the last one starting strictly before
    /// it, or the first segment for tick 0.
    fn segment_for(&self, tick: u64) -> &Segment {
        let after = self.segments.partition_point(|s| s.tick < tick);
        &self.segments[after.saturating_sub(1)]
    }

    /// Converts an absolute tick to elapsed seconds.
    pub fn ticks_to_seconds(&self, tick: u64) -> f64 {
        let segment = self.segment_for(tick);
        let units = segment.units_before
            + (tick - segment.tick) as u128 * segment.micros_per_quarter as u128;
        units as f64 / (1_000_000.0 * self.ticks_per_quarter as f64)
    }

    /// Tempo in effect at `tick`, in beats per minute.
    pub fn bpm_at(&self, tick: u64) -> f64 {
        let after = self.segments.partition_point(|s| s.tick <= tick);
        let segment = &self.segments[after.saturating_sub(1)];
        60_000_000.0 / segment.micros_per_quarter as f64
    }
}
