//! Calendar-aligned rainfall totals.
//!
//! Rain arrives as "mm since the previous sky report". The accumulator
//! folds each amount into five calendar windows (minute, hour, day, month,
//! year) and two rolling totals (last 60 minutes, last 24 hours), then
//! saves the whole state so a restart keeps the current-period totals.
//!
//! The rolling totals are built from slots addressed by minute-of-hour and
//! hour-of-day. Each slot remembers the minute/hour it was written in, and
//! only slots written inside the rolling span are summed.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const MINUTE_SLOTS: usize = 60;
const HOUR_SLOTS: usize = 24;

#[derive(Debug, Error)]
pub enum RainfallError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid saved time: {0}")]
    InvalidTime(String),
}

pub type Result<T> = std::result::Result<T, RainfallError>;

/// Calendar period a window sums over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl Period {
    /// True when `a` and `b` fall in the same period of this kind.
    pub fn same(self, a: &NaiveDateTime, b: &NaiveDateTime) -> bool {
        let year = a.year() == b.year();
        let month = year && a.month() == b.month();
        let day = month && a.day() == b.day();
        let hour = day && a.hour() == b.hour();
        match self {
            Period::Year => year,
            Period::Month => month,
            Period::Day => day,
            Period::Hour => hour,
            Period::Minute => hour && a.minute() == b.minute(),
        }
    }
}

/// A calendar window: its running sum and when it was last added to.
#[derive(Debug, Clone)]
struct Window {
    period: Period,
    sum: f64,
    last: Option<NaiveDateTime>,
}

impl Window {
    fn new(period: Period) -> Self {
        Self {
            period,
            sum: 0.0,
            last: None,
        }
    }

    /// Add `amount`, replacing the sum instead when a period boundary has
    /// been crossed since the last addition.
    fn add(&mut self, amount: f64, now: NaiveDateTime) {
        match self.last {
            Some(last) if self.period.same(&last, &now) => self.sum += amount,
            _ => self.sum = amount,
        }
        self.last = Some(now);
    }

    fn restore(&mut self, sum: f64, saved: NaiveDateTime, now: NaiveDateTime) {
        if self.period.same(&saved, &now) {
            self.sum = sum;
            self.last = Some(saved);
        } else {
            if sum > 0.0 {
                log::info!(
                    "[Rainfall] discarding saved {:?} total {:.2} mm, period has ended",
                    self.period,
                    sum
                );
            }
            self.sum = 0.0;
            self.last = None;
        }
    }

    /// Sum as seen at `now`: zero once the window's period is over.
    fn current(&self, now: NaiveDateTime) -> f64 {
        match self.last {
            Some(last) if self.period.same(&last, &now) => self.sum,
            _ => 0.0,
        }
    }
}

/// Rain recorded during one minute-of-hour or hour-of-day.
///
/// `stamp` is the absolute minute (or hour) index the slot was written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub amount: f64,
    pub stamp: Option<i64>,
}

impl Slot {
    fn add(&mut self, amount: f64, stamp: i64) {
        if self.stamp == Some(stamp) {
            self.amount += amount;
        } else {
            self.amount = amount;
            self.stamp = Some(stamp);
        }
    }
}

/// Wall-clock moment a record was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAt {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
}

impl SavedAt {
    fn from_datetime(dt: &NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
        }
    }

    fn to_datetime(self) -> Result<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|d| d.and_hms_opt(self.hour, self.minute, 0))
            .ok_or_else(|| RainfallError::InvalidTime(format!("{:?}", self)))
    }
}

/// On-disk form of the accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallRecord {
    pub time: SavedAt,
    pub rain_current_minute: f64,
    pub rain_current_hour: f64,
    pub rain_current_day: f64,
    pub rain_current_month: f64,
    pub rain_current_year: f64,
    pub rain_60: f64,
    pub rain_24: f64,
    #[serde(default)]
    pub minute_slots: Vec<Slot>,
    #[serde(default)]
    pub hour_slots: Vec<Slot>,
}

/// Snapshot of every total, in mm.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RainTotals {
    pub minute: f64,
    pub hour: f64,
    pub day: f64,
    pub month: f64,
    pub year: f64,
    pub last_60min: f64,
    pub last_24hr: f64,
}

/// Rainfall accumulator, optionally backed by a JSON file.
#[derive(Debug, Clone)]
pub struct RainfallAccumulator {
    minute: Window,
    hour: Window,
    day: Window,
    month: Window,
    year: Window,
    minute_slots: [Slot; MINUTE_SLOTS],
    hour_slots: [Slot; HOUR_SLOTS],
    last_60min: f64,
    last_24hr: f64,
    path: Option<PathBuf>,
}

impl Default for RainfallAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

fn minute_index(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp().div_euclid(60)
}

fn hour_index(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp().div_euclid(3600)
}

impl RainfallAccumulator {
    /// In-memory accumulator with nothing persisted.
    pub fn new() -> Self {
        Self {
            minute: Window::new(Period::Minute),
            hour: Window::new(Period::Hour),
            day: Window::new(Period::Day),
            month: Window::new(Period::Month),
            year: Window::new(Period::Year),
            minute_slots: [Slot::default(); MINUTE_SLOTS],
            hour_slots: [Slot::default(); HOUR_SLOTS],
            last_60min: 0.0,
            last_24hr: 0.0,
            path: None,
        }
    }

    /// Accumulator persisted at `path`, seeded from it when possible.
    ///
    /// A missing file starts empty. An unreadable or corrupt file is logged
    /// and also starts empty; saving will overwrite it.
    pub fn open(path: impl Into<PathBuf>, now: NaiveDateTime) -> Self {
        let path = path.into();
        let mut acc = Self::new();

        if path.exists() {
            match Self::read_record(&path) {
                Ok(record) => {
                    if let Err(e) = acc.restore(&record, now) {
                        log::warn!("[Rainfall] ignoring {}: {}", path.display(), e);
                        acc = Self::new();
                    } else {
                        log::info!(
                            "[Rainfall] restored totals from {} (day {:.2} mm, year {:.2} mm)",
                            path.display(),
                            acc.day.sum,
                            acc.year.sum
                        );
                    }
                }
                Err(e) => log::warn!("[Rainfall] failed to read {}: {}", path.display(), e),
            }
        } else {
            log::info!(
                "[Rainfall] no saved state at {}, starting empty",
                path.display()
            );
        }

        acc.path = Some(path);
        acc
    }

    fn read_record(path: &Path) -> Result<RainfallRecord> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Seed windows from a saved record, keeping only those whose period is
    /// still current at `now`.
    pub fn restore(&mut self, record: &RainfallRecord, now: NaiveDateTime) -> Result<()> {
        let saved = record.time.to_datetime()?;

        self.minute.restore(record.rain_current_minute, saved, now);
        self.hour.restore(record.rain_current_hour, saved, now);
        self.day.restore(record.rain_current_day, saved, now);
        self.month.restore(record.rain_current_month, saved, now);
        self.year.restore(record.rain_current_year, saved, now);

        if record.minute_slots.len() == MINUTE_SLOTS {
            self.minute_slots.copy_from_slice(&record.minute_slots);
        }
        if record.hour_slots.len() == HOUR_SLOTS {
            self.hour_slots.copy_from_slice(&record.hour_slots);
        }
        self.recompute_rolling(now);

        Ok(())
    }

    /// Add rain measured at the current local time.
    pub fn accumulate(&mut self, amount: f64) -> RainTotals {
        self.accumulate_at(amount, Local::now().naive_local())
    }

    /// Add `amount` mm of rain measured at local time `now`.
    pub fn accumulate_at(&mut self, amount: f64, now: NaiveDateTime) -> RainTotals {
        self.minute_slots[now.minute() as usize].add(amount, minute_index(&now));
        self.hour_slots[now.hour() as usize].add(amount, hour_index(&now));
        self.recompute_rolling(now);

        self.minute.add(amount, now);
        self.hour.add(amount, now);
        self.day.add(amount, now);
        self.month.add(amount, now);
        self.year.add(amount, now);

        if let Err(e) = self.save(now) {
            log::error!("[Rainfall] failed to save state: {}", e);
        }

        self.totals_at(now)
    }

    fn recompute_rolling(&mut self, now: NaiveDateTime) {
        let this_minute = minute_index(&now);
        let this_hour = hour_index(&now);

        self.last_60min = self
            .minute_slots
            .iter()
            .filter(|s| matches!(s.stamp, Some(m) if m <= this_minute && this_minute - m < 60))
            .map(|s| s.amount)
            .sum();
        self.last_24hr = self
            .hour_slots
            .iter()
            .filter(|s| matches!(s.stamp, Some(h) if h <= this_hour && this_hour - h < 24))
            .map(|s| s.amount)
            .sum();
    }

    /// Totals as of the last accumulation.
    pub fn totals(&self) -> RainTotals {
        RainTotals {
            minute: self.minute.sum,
            hour: self.hour.sum,
            day: self.day.sum,
            month: self.month.sum,
            year: self.year.sum,
            last_60min: self.last_60min,
            last_24hr: self.last_24hr,
        }
    }

    /// Totals as seen at `now`; windows whose period has ended read zero.
    pub fn totals_at(&self, now: NaiveDateTime) -> RainTotals {
        RainTotals {
            minute: self.minute.current(now),
            hour: self.hour.current(now),
            day: self.day.current(now),
            month: self.month.current(now),
            year: self.year.current(now),
            last_60min: self.last_60min,
            last_24hr: self.last_24hr,
        }
    }

    pub fn record(&self, now: NaiveDateTime) -> RainfallRecord {
        RainfallRecord {
            time: SavedAt::from_datetime(&now),
            rain_current_minute: self.minute.sum,
            rain_current_hour: self.hour.sum,
            rain_current_day: self.day.sum,
            rain_current_month: self.month.sum,
            rain_current_year: self.year.sum,
            rain_60: self.last_60min,
            rain_24: self.last_24hr,
            minute_slots: self.minute_slots.to_vec(),
            hour_slots: self.hour_slots.to_vec(),
        }
    }

    fn save(&self, now: NaiveDateTime) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(&self.record(now))?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
