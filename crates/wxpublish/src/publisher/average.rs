//! Interval averaging for services that accept one report every few minutes.

use std::sync::Mutex;

use crate::observation::Observation;

/// Bearing in [0, 360) of the summed unit vectors. Opposing samples that
/// cancel out give 0.
fn mean_direction(east: f64, north: f64) -> f64 {
    if east.abs() < 1e-9 && north.abs() < 1e-9 {
        return 0.0;
    }
    let degrees = east.atan2(north).to_degrees().rem_euclid(360.0);
    if degrees >= 359.9999999 {
        0.0
    } else {
        degrees
    }
}

#[derive(Debug, Default)]
struct Accum {
    count: u32,
    pressure: f64,
    pressure_sealevel: f64,
    wind_speed: f64,
    /// Unit-vector components of wind direction.
    wind_east: f64,
    wind_north: f64,
    temperature: f64,
    humidity: f64,
    dewpoint: f64,
    solar: f64,
    gust_speed: f64,
    latest: Option<Observation>,
}

/// Averages snapshots between reporting boundaries.
///
/// Services that accept one report every `every` minutes keep one of
/// these. Snapshots offered off a boundary minute are folded in and
/// nothing is sent. The first snapshot offered on a boundary minute
/// releases the average and starts a new interval. Further snapshots in
/// that same minute find nothing accumulated and are skipped.
///
/// Means: station and sea-level pressure, wind speed, temperature,
/// humidity, dew point, solar. Wind direction is the circular mean of the
/// samples. Maximum: gust speed. Everything else comes from the
/// latest accumulated snapshot.
#[derive(Debug)]
pub struct Averager {
    every: u32,
    acc: Mutex<Accum>,
}

impl Averager {
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            acc: Mutex::new(Accum::default()),
        }
    }

    pub fn is_boundary(&self, minute: u32) -> bool {
        minute % self.every == 0
    }

    /// Offer a snapshot taken during `minute` (0-59 of the hour).
    ///
    /// Returns the averaged snapshot to send, if this is a reporting instant.
    pub fn offer(&self, observation: &Observation, minute: u32) -> Option<Observation> {
        let mut acc = self.acc.lock().unwrap_or_else(|e| e.into_inner());

        if !self.is_boundary(minute) {
            acc.count += 1;
            acc.pressure += observation.pressure;
            acc.pressure_sealevel += observation.pressure_sealevel;
            acc.wind_speed += observation.wind_speed;
            let radians = observation.wind_direction.to_radians();
            acc.wind_east += radians.sin();
            acc.wind_north += radians.cos();
            acc.temperature += observation.temperature;
            acc.humidity += observation.humidity;
            acc.dewpoint += observation.dewpoint;
            acc.solar += observation.solar;
            acc.gust_speed = acc.gust_speed.max(observation.gust_speed);
            acc.latest = Some(observation.clone());
            return None;
        }

        let done = std::mem::take(&mut *acc);
        let mut out = done.latest?;
        let n = f64::from(done.count);
        out.pressure = done.pressure / n;
        out.pressure_sealevel = done.pressure_sealevel / n;
        out.wind_speed = done.wind_speed / n;
        out.wind_direction = mean_direction(done.wind_east, done.wind_north);
        out.temperature = done.temperature / n;
        out.humidity = done.humidity / n;
        out.dewpoint = done.dewpoint / n;
        out.solar = done.solar / n;
        out.gust_speed = done.gust_speed;
        Some(out)
    }

    /// Snapshots accumulated in the current interval.
    pub fn pending(&self) -> u32 {
        self.acc.lock().map(|a| a.count).unwrap_or(0)
    }
}
