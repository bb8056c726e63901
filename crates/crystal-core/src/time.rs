//! Wall-clock sampling and continuous elapsed-second fractions.
//!
//! A [`WallClockSample`] is captured once per tick from the local clock. The
//! [`ElapsedFractions`] derived from it are continuous (milliseconds included),
//! so animations driven by them never step on whole-second boundaries.

use chrono::{DateTime, Datelike, Duration, Local, Timelike};

/// One reading of the local wall clock, broken into calendar fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WallClockSample {
    /// The instant this sample was taken from.
    pub time_point: DateTime<Local>,
    pub year: i32,
    /// Month of year, 1-based.
    pub month: u32,
    /// Day of month, 1-based.
    pub day: u32,
    /// Hour of day, 0-23.
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Milliseconds into the current second, 0-999.
    pub millisecond: u32,
}

/// Seconds elapsed into the current minute, hour and day.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ElapsedFractions {
    pub seconds_into_minute: f32,
    pub seconds_into_hour: f32,
    pub seconds_into_day: f32,
}

/// Read the local wall clock.
pub fn sample() -> WallClockSample {
    sample_at(Local::now())
}

/// Build a sample for an explicit instant.
pub fn sample_at(time_point: DateTime<Local>) -> WallClockSample {
    // Leap seconds report >= 1000 ms; fold them into the last millisecond.
    let millisecond = time_point.timestamp_subsec_millis().min(999);
    WallClockSample {
        time_point,
        year: time_point.year(),
        month: time_point.month(),
        day: time_point.day(),
        hour: time_point.hour(),
        minute: time_point.minute(),
        second: time_point.second().min(59),
        millisecond,
    }
}

/// Derive continuous elapsed fractions from a sample.
pub fn elapsed(sample: &WallClockSample) -> ElapsedFractions {
    let seconds_into_minute = sample.second as f32 + sample.millisecond as f32 / 1000.0;
    let seconds_into_hour = sample.minute as f32 * 60.0 + seconds_into_minute;
    let seconds_into_day = sample.hour as f32 * 3600.0 + seconds_into_hour;
    ElapsedFractions {
        seconds_into_minute,
        seconds_into_hour,
        seconds_into_day,
    }
}

impl WallClockSample {
    /// A sample taken `millis` milliseconds before this one.
    pub fn rewind(&self, millis: i64) -> WallClockSample {
        sample_at(self.time_point - Duration::milliseconds(millis))
    }

    /// Locale-style date, e.g. `01/15/24`.
    pub fn format_date(&self) -> String {
        self.time_point.format("%x").to_string()
    }

    /// Locale-style time, e.g. `15:30:05`.
    pub fn format_time(&self) -> String {
        self.time_point.format("%X").to_string()
    }
}
