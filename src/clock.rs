//! Exact sample-index / calendar-time conversion.
//!
//! A global sample index counts samples since UT midnight 1970-01-01 at an
//! exact rational sample rate. All conversions here run on 128-bit integer
//! arithmetic so no error accumulates, no matter how large the index gets.
//! Sub-second precision is carried as picoseconds.

use crate::error::{Error, Result};

/// Last representable instant: 9999-12-31T23:59:59 UTC.
const MAX_EPOCH_SECS: u128 = 253_402_300_799;

const PICOS_PER_SEC: u128 = 1_000_000_000_000;

/// Exact sample rate in Hz, expressed as numerator / denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRate {
    numerator: u64,
    denominator: u64,
}

impl SampleRate {
    /// Create a sample rate. Both terms must be non-zero.
    ///
    /// # Errors
    ///
    /// - `Error::Configuration` if either term is zero.
    pub fn new(numerator: u64, denominator: u64) -> Result<Self> {
        if numerator == 0 {
            return Err(Error::Configuration("sample rate numerator is zero"));
        }
        if denominator == 0 {
            return Err(Error::Configuration("sample rate denominator is zero"));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    pub fn numerator(self) -> u64 {
        self.numerator
    }

    pub fn denominator(self) -> u64 {
        self.denominator
    }

    /// Whole seconds and leftover picoseconds elapsed at `index`.
    ///
    /// `t = index * denominator / numerator`, computed exactly.
    pub fn elapsed_at(self, index: u64) -> (u128, u64) {
        let ticks = index as u128 * self.denominator as u128;
        let secs = ticks / self.numerator as u128;
        let rem = ticks % self.numerator as u128;
        let picos = rem * PICOS_PER_SEC / self.numerator as u128;
        (secs, picos as u64)
    }

    /// Whole milliseconds elapsed at `index` (floored).
    pub fn millis_at(self, index: u64) -> u128 {
        let ticks = index as u128 * self.denominator as u128;
        let secs = ticks / self.numerator as u128;
        let rem = ticks % self.numerator as u128;
        secs * 1000 + rem * 1000 / self.numerator as u128
    }

    /// Smallest sample index at or after the instant `millis` after epoch.
    ///
    /// Ceiling counterpart of [`millis_at`](Self::millis_at); the two
    /// together make half-open file spans tile the index space exactly.
    pub fn index_at_millis(self, millis: u128) -> u64 {
        let num = self.numerator as u128;
        let den = self.denominator as u128 * 1000;
        // ceil(millis * num / den), split to keep products inside u128
        let q = millis / den;
        let r = millis % den;
        (q * num + (r * num).div_ceil(den)) as u64
    }
}

/// Calendar timestamp with picosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub picosecond: u64,
}

impl CalendarTime {
    /// Calendar time for a count of seconds since the epoch.
    ///
    /// # Errors
    ///
    /// - `Error::ClockRange` past 9999-12-31T23:59:59.
    pub fn from_epoch(secs: u64, picosecond: u64) -> Result<Self> {
        from_epoch_parts(secs as u128, picosecond)
    }

    /// Seconds since the epoch, discarding the picosecond part.
    ///
    /// # Errors
    ///
    /// - `Error::ClockRange` if any field is outside its calendar range.
    pub fn to_epoch_secs(&self) -> Result<u64> {
        if self.year < 1970 || self.year > 9999 {
            return Err(Error::ClockRange("year outside 1970..=9999"));
        }
        if self.month < 1 || self.month > 12 {
            return Err(Error::ClockRange("month outside 1..=12"));
        }
        let mut days: u64 = 0;
        for year in 1970..self.year {
            days += if is_leap_year(year) { 366 } else { 365 };
        }
        let months = days_in_months(self.year);
        let month_days = months[self.month as usize - 1];
        if self.day < 1 || self.day > month_days {
            return Err(Error::ClockRange("day outside month"));
        }
        for &d in &months[..self.month as usize - 1] {
            days += d as u64;
        }
        days += self.day as u64 - 1;
        if self.hour > 23 || self.minute > 59 || self.second > 59 {
            return Err(Error::ClockRange("time of day out of range"));
        }
        Ok(days * 86_400
            + self.hour as u64 * 3600
            + self.minute as u64 * 60
            + self.second as u64)
    }
}

impl std::fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:012}",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.picosecond
        )
    }
}

/// Convert a global sample index to calendar time at the given rate.
///
/// This is the standalone form of the conversion, independent of any
/// session; the rate terms are validated here.
///
/// # Errors
///
/// - `Error::ClockRange` if the rate denominator (or numerator) is zero,
///   or the resulting date falls past the representable calendar range.
pub fn sample_index_to_calendar(
    index: u64,
    rate_numerator: u64,
    rate_denominator: u64,
) -> Result<CalendarTime> {
    if rate_numerator == 0 || rate_denominator == 0 {
        return Err(Error::ClockRange("zero sample rate term"));
    }
    let rate = SampleRate::new(rate_numerator, rate_denominator)?;
    index_to_calendar(index, rate)
}

/// Convert a global sample index to calendar time at the given rate.
pub fn index_to_calendar(index: u64, rate: SampleRate) -> Result<CalendarTime> {
    let (secs, picos) = rate.elapsed_at(index);
    from_epoch_parts(secs, picos)
}

/// Convert a calendar time back to the sample index at the given rate.
///
/// Inverse of [`index_to_calendar`]: returns the smallest index whose
/// timestamp is at or after the given instant, computed exactly. Because
/// picoseconds are floored on the forward conversion, the ceiling here
/// round-trips every index whose sample period exceeds one picosecond.
pub fn calendar_to_index(time: &CalendarTime, rate: SampleRate) -> Result<u64> {
    if time.picosecond >= PICOS_PER_SEC as u64 {
        return Err(Error::ClockRange("picosecond outside one second"));
    }
    let secs = time.to_epoch_secs()? as u128;
    let num = rate.numerator as u128;
    let den = rate.denominator as u128;
    // ceil((secs * 1e12 + ps) * num / (den * 1e12)), staged so every
    // intermediate product stays inside u128
    let ticks = secs * num + time.picosecond as u128 * num / PICOS_PER_SEC;
    let carry = time.picosecond as u128 * num % PICOS_PER_SEC;
    let q = ticks / den;
    let r = ticks % den;
    Ok((q + (r * PICOS_PER_SEC + carry).div_ceil(den * PICOS_PER_SEC)) as u64)
}

fn from_epoch_parts(secs: u128, picosecond: u64) -> Result<CalendarTime> {
    if secs > MAX_EPOCH_SECS {
        return Err(Error::ClockRange("timestamp past year 9999"));
    }
    let secs = secs as u64;
    let mut days = (secs / 86_400) as i64;
    let time_of_day = secs % 86_400;

    let mut year = 1970;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if days < days_in_year {
            break;
        }
        days -= days_in_year;
        year += 1;
    }

    let mut month = 1u8;
    for &days_in_month in &days_in_months(year) {
        if days < days_in_month as i64 {
            break;
        }
        days -= days_in_month as i64;
        month += 1;
    }

    Ok(CalendarTime {
        year,
        month,
        day: (days + 1) as u8,
        hour: (time_of_day / 3600) as u8,
        minute: (time_of_day % 3600 / 60) as u8,
        second: (time_of_day % 60) as u8,
        picosecond,
    })
}

fn days_in_months(year: i32) -> [u8; 12] {
    if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_zero_is_epoch() {
        let t = sample_index_to_calendar(0, 1, 1).unwrap();
        assert_eq!((t.year, t.month, t.day), (1970, 1, 1));
        assert_eq!((t.hour, t.minute, t.second, t.picosecond), (0, 0, 0, 0));
    }

    #[test]
    fn three_samples_at_three_hertz_is_one_second() {
        let t = sample_index_to_calendar(3, 3, 1).unwrap();
        assert_eq!(t.second, 1);
        assert_eq!(t.picosecond, 0);
    }

    #[test]
    fn third_hertz_sample_period_is_three_seconds() {
        let t = sample_index_to_calendar(3, 1, 3).unwrap();
        assert_eq!(t.second, 9);
        assert_eq!(t.picosecond, 0);
    }

    #[test]
    fn fractional_sample_keeps_exact_picoseconds() {
        // one sample at 3 Hz: exactly 1/3 s = 333333333333.(3) ps, floored
        let t = sample_index_to_calendar(1, 3, 1).unwrap();
        assert_eq!(t.second, 0);
        assert_eq!(t.picosecond, 333_333_333_333);
    }

    #[test]
    fn no_drift_at_huge_indexes() {
        // 2^63 samples at 1 GHz: 9223372036 s + 854775808 ns exactly
        let t = sample_index_to_calendar(1u64 << 63, 1_000_000_000, 1).unwrap();
        let rate = SampleRate::new(1_000_000_000, 1).unwrap();
        let (secs, picos) = rate.elapsed_at(1u64 << 63);
        assert_eq!(secs, 9_223_372_036);
        assert_eq!(picos, 854_775_808_000);
        assert_eq!(t.year, 2262);
    }

    #[test]
    fn round_trips_through_calendar() {
        let rate = SampleRate::new(48_000, 1).unwrap();
        for index in [0u64, 1, 47_999, 48_000, 1_234_567_890_123] {
            let t = index_to_calendar(index, rate).unwrap();
            assert_eq!(calendar_to_index(&t, rate).unwrap(), index);
        }
        // non-terminating picosecond fraction still round-trips
        let rate = SampleRate::new(3, 1).unwrap();
        for index in [0u64, 1, 2, 3, 1_000_000_007] {
            let t = index_to_calendar(index, rate).unwrap();
            assert_eq!(calendar_to_index(&t, rate).unwrap(), index);
        }
    }

    #[test]
    fn rejects_zero_rate_terms() {
        assert!(matches!(
            sample_index_to_calendar(0, 1, 0),
            Err(Error::ClockRange(_))
        ));
        assert!(matches!(
            sample_index_to_calendar(0, 0, 1),
            Err(Error::ClockRange(_))
        ));
    }

    #[test]
    fn rejects_dates_past_calendar_range() {
        // 2^62 samples at 1 Hz lands far beyond year 9999
        assert!(matches!(
            sample_index_to_calendar(1u64 << 62, 1, 1),
            Err(Error::ClockRange(_))
        ));
    }

    #[test]
    fn leap_year_handling() {
        // 2020-02-29 00:00:00 = 1582934400 s
        let t = CalendarTime::from_epoch(1_582_934_400, 0).unwrap();
        assert_eq!((t.year, t.month, t.day), (2020, 2, 29));
        assert_eq!(t.to_epoch_secs().unwrap(), 1_582_934_400);
    }

    #[test]
    fn millis_and_index_conversions_tile() {
        let rate = SampleRate::new(1000, 1).unwrap();
        assert_eq!(rate.millis_at(500), 500);
        assert_eq!(rate.index_at_millis(500), 500);
        // non-integer samples per millisecond
        let rate = SampleRate::new(2500, 1).unwrap();
        assert_eq!(rate.index_at_millis(1), 3); // ceil(2.5)
        assert_eq!(rate.millis_at(3), 1);
        assert_eq!(rate.millis_at(2), 0);
    }
}
