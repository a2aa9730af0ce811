//! Cadence planning: which directory and file a sample index belongs to.
//!
//! Output is partitioned by two independent time cadences: a coarse
//! directory period in seconds and a fine file period in milliseconds. The
//! planner derives, purely from the rational sample rate, both the bucket a
//! sample falls in and the half-open span of sample indexes belonging to
//! that bucket's file, so writers can split vectors at file boundaries
//! without looking at what is already on disk.

use crate::clock::SampleRate;
use crate::error::{Error, Result};

/// The directory and file buckets a sample index falls in.
///
/// Both values are instants since the epoch, floored to the respective
/// cadence boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSlot {
    pub dir_epoch_secs: u64,
    pub file_epoch_millis: u64,
}

/// Half-open range `[start, end)` of global sample indexes in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSpan {
    pub start: u64,
    pub end: u64,
}

impl SampleSpan {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: u64) -> bool {
        index >= self.start && index < self.end
    }
}

/// Validated cadence parameters plus the rate needed to apply them.
#[derive(Debug, Clone, Copy)]
pub struct CadencePlan {
    subdir_cadence_secs: u64,
    file_cadence_millis: u64,
    rate: SampleRate,
}

impl CadencePlan {
    /// Validate cadence parameters against each other.
    ///
    /// The file cadence must evenly partition the directory cadence so
    /// file boundaries never straddle a directory boundary.
    ///
    /// # Errors
    ///
    /// - `Error::Configuration` for zero cadences or uneven partitioning.
    pub fn new(
        subdir_cadence_secs: u64,
        file_cadence_millis: u64,
        rate: SampleRate,
    ) -> Result<Self> {
        if subdir_cadence_secs == 0 {
            return Err(Error::Configuration("subdir cadence must be positive"));
        }
        if file_cadence_millis == 0 {
            return Err(Error::Configuration("file cadence must be positive"));
        }
        let subdir_millis = subdir_cadence_secs
            .checked_mul(1000)
            .ok_or(Error::Configuration("subdir cadence overflows"))?;
        if subdir_millis % file_cadence_millis != 0 {
            return Err(Error::Configuration(
                "file cadence must evenly divide the subdir cadence",
            ));
        }
        Ok(Self {
            subdir_cadence_secs,
            file_cadence_millis,
            rate,
        })
    }

    pub fn subdir_cadence_secs(&self) -> u64 {
        self.subdir_cadence_secs
    }

    pub fn file_cadence_millis(&self) -> u64 {
        self.file_cadence_millis
    }

    /// Directory and file buckets for a sample index.
    ///
    /// # Errors
    ///
    /// - `Error::ClockRange` if the sample's wall-clock time cannot be
    ///   represented.
    pub fn slot_for(&self, index: u64) -> Result<FileSlot> {
        let millis = self.rate.millis_at(index);
        let file_bucket = millis / self.file_cadence_millis as u128 * self.file_cadence_millis as u128;
        let secs = millis / 1000;
        let dir_bucket = secs / self.subdir_cadence_secs as u128 * self.subdir_cadence_secs as u128;
        if file_bucket > u64::MAX as u128 {
            return Err(Error::ClockRange("sample time overflows epoch milliseconds"));
        }
        Ok(FileSlot {
            dir_epoch_secs: dir_bucket as u64,
            file_epoch_millis: file_bucket as u64,
        })
    }

    /// The span of sample indexes belonging to the file containing `index`.
    ///
    /// Spans are half-open: a sample exactly on a file boundary belongs to
    /// the file beginning there. Consecutive spans tile the index space
    /// without gaps or overlaps.
    pub fn file_span(&self, index: u64) -> Result<SampleSpan> {
        let slot = self.slot_for(index)?;
        let start = self.rate.index_at_millis(slot.file_epoch_millis as u128);
        let end = self
            .rate
            .index_at_millis(slot.file_epoch_millis as u128 + self.file_cadence_millis as u128);
        Ok(SampleSpan { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(subdir_secs: u64, file_millis: u64, num: u64, den: u64) -> CadencePlan {
        CadencePlan::new(subdir_secs, file_millis, SampleRate::new(num, den).unwrap()).unwrap()
    }

    #[test]
    fn rejects_uneven_partitioning() {
        let rate = SampleRate::new(1000, 1).unwrap();
        assert!(matches!(
            CadencePlan::new(3600, 7, rate),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            CadencePlan::new(0, 1000, rate),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            CadencePlan::new(3600, 0, rate),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn accepts_even_partitioning() {
        plan(3600, 1000, 1000, 1);
        plan(1, 500, 1000, 1);
    }

    #[test]
    fn spans_tile_without_gaps_or_overlaps() {
        let plan = plan(3600, 1000, 1000, 1);
        let mut index = 0u64;
        for _ in 0..5000 {
            let span = plan.file_span(index).unwrap();
            assert!(span.contains(index));
            assert_eq!(span.start, index);
            // next span starts exactly where this one ends
            let next = plan.file_span(span.end).unwrap();
            assert_eq!(next.start, span.end);
            index = span.end;
        }
    }

    #[test]
    fn spans_tile_at_fractional_rates() {
        // 2500 Hz with 1 ms files: 2.5 samples per file, spans alternate 2/3
        let plan = plan(1, 1, 2500, 1);
        let mut index = 0u64;
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            let span = plan.file_span(index).unwrap();
            assert!(span.contains(index));
            seen.insert(span.len());
            index = span.end;
        }
        assert_eq!(index, 250); // 100 ms at 2500 Hz
        assert!(seen.contains(&2) && seen.contains(&3));
    }

    #[test]
    fn boundary_sample_belongs_to_next_file() {
        let plan = plan(3600, 1000, 1000, 1);
        let span = plan.file_span(999).unwrap();
        assert_eq!(span, SampleSpan { start: 0, end: 1000 });
        let span = plan.file_span(1000).unwrap();
        assert_eq!(span, SampleSpan { start: 1000, end: 2000 });
    }

    #[test]
    fn slot_buckets_floor_to_cadence() {
        let plan = plan(3600, 1000, 1000, 1);
        // sample 3_700_000 at 1 kHz = 3700 s into the epoch
        let slot = plan.slot_for(3_700_000).unwrap();
        assert_eq!(slot.dir_epoch_secs, 3600);
        assert_eq!(slot.file_epoch_millis, 3_700_000);
    }

    #[test]
    fn span_boundaries_are_cadence_multiples() {
        let plan = plan(3600, 1000, 48_000, 1);
        let span = plan.file_span(123_456).unwrap();
        // span edges convert back to whole file-cadence boundaries
        assert_eq!(span.start % 48_000, 0);
        assert_eq!(span.end - span.start, 48_000);
    }
}
