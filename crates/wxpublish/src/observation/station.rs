//! The live station state. One writer applies decoded packets and hands out snapshot copies.

use std::collections::HashMap;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use super::{AuxSensor, Observation, PressureHistory, TIMESTAMP_FORMAT};
use crate::aggregate::{GustTracker, RainfallAccumulator};
use crate::dispatch::DispatchTrigger;
use crate::packet::{AirObservation, Packet, SkyObservation, TowerObservation, WindSample};
use crate::units;

/// Identity of the physical station, copied into every destination.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StationInfo {
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level.
    pub elevation_m: f64,
}

/// Owner of the live [`Observation`] and every tracker feeding it.
///
/// There is exactly one `Station` per process and it lives on the ingest
/// task. Other tasks only ever see clones of the observation.
#[derive(Debug)]
pub struct Station {
    info: StationInfo,
    live: Observation,
    gust: GustTracker,
    rainfall: RainfallAccumulator,
    pressure: PressureHistory,
    trigger: DispatchTrigger,
    /// Auxiliary serial number to display location.
    mapping: HashMap<String, String>,
    day: Option<NaiveDate>,
}

fn local_timestamp(epoch: i64) -> Option<String> {
    DateTime::from_timestamp(epoch, 0).map(|utc| {
        utc.with_timezone(&Local)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    })
}

fn widen(high: &mut Option<f64>, low: &mut Option<f64>, value: f64) {
    *high = Some(high.map_or(value, |h| h.max(value)));
    *low = Some(low.map_or(value, |l| l.min(value)));
}

impl Station {
    pub fn new(
        info: StationInfo,
        rainfall: RainfallAccumulator,
        mapping: HashMap<String, String>,
    ) -> Self {
        Self {
            info,
            live: Observation::default(),
            gust: GustTracker::new(),
            rainfall,
            pressure: PressureHistory::new(),
            trigger: DispatchTrigger::new(),
            mapping,
            day: None,
        }
    }

    pub fn info(&self) -> &StationInfo {
        &self.info
    }

    /// The live snapshot.
    pub fn observation(&self) -> &Observation {
        &self.live
    }

    /// Independent copy of the live snapshot.
    pub fn snapshot(&self) -> Observation {
        self.live.clone()
    }

    /// Apply one decoded packet received at local time `now`.
    ///
    /// Returns a snapshot copy when this packet completes a publish cycle.
    pub fn ingest(&mut self, packet: &Packet, now: NaiveDateTime) -> Option<Observation> {
        self.roll_day(now.date());

        let applied = match packet {
            Packet::Air {
                serial_number,
                observations,
            } => {
                for ob in observations {
                    self.apply_primary(ob);
                }
                log::debug!(
                    "[Station] {} air row(s) from {}",
                    observations.len(),
                    serial_number
                );
                !observations.is_empty()
            }
            Packet::Sky {
                serial_number,
                observations,
            } => {
                for ob in observations {
                    self.apply_secondary(ob, now);
                }
                log::debug!(
                    "[Station] {} sky row(s) from {}",
                    observations.len(),
                    serial_number
                );
                !observations.is_empty()
            }
            Packet::RapidWind(sample) => {
                self.apply_wind(sample);
                false
            }
            Packet::Tower {
                serial_number,
                observations,
            } => {
                for ob in observations {
                    self.apply_auxiliary(serial_number, ob);
                }
                false
            }
            Packet::Strike {
                distance, energy, ..
            } => {
                log::debug!(
                    "[Station] lightning strike at {:.0} km, energy {:.0}",
                    distance,
                    energy
                );
                false
            }
            Packet::RainStart { epoch } => {
                log::debug!("[Station] rain started at {}", epoch);
                false
            }
            Packet::DeviceStatus { serial_number } => {
                log::debug!("[Station] device status from {}", serial_number);
                false
            }
            Packet::HubStatus { serial_number } => {
                log::debug!("[Station] hub status from {}", serial_number);
                false
            }
            Packet::Unknown(kind) => {
                log::debug!("[Station] ignoring packet type {}", kind);
                false
            }
        };

        if applied && self.trigger.mark(packet.kind()) {
            Some(self.snapshot())
        } else {
            None
        }
    }

    /// Apply a primary-environment reading: pressure, temperature,
    /// humidity and lightning.
    pub fn apply_primary(&mut self, ob: &AirObservation) {
        let live = &mut self.live;
        live.timestamp = local_timestamp(ob.epoch);
        live.pressure = ob.pressure;
        live.pressure_sealevel = units::sea_level_pressure(ob.pressure, self.info.elevation_m);
        live.temperature = ob.temperature;
        live.humidity = ob.humidity;
        live.strikes = ob.strikes;
        live.strike_distance = ob.strike_distance;
        widen(
            &mut live.temperature_high,
            &mut live.temperature_low,
            ob.temperature,
        );

        live.trend = self.pressure.record(ob.epoch, ob.pressure);
        self.recompute_derived();
    }

    /// Apply a wind/rain summary reading received at local time `now`.
    pub fn apply_secondary(&mut self, ob: &SkyObservation, now: NaiveDateTime) {
        let live = &mut self.live;
        live.illumination = ob.illumination;
        live.uv = ob.uv;
        live.solar = ob.solar;
        live.wind_speed = ob.wind_speed;
        live.wind_direction = ob.wind_direction;
        live.wind_cardinal = units::cardinal(ob.wind_direction);
        live.rain = ob.rain;

        self.gust.observe(ob.gust_speed, ob.wind_direction);
        self.sync_gust();

        let totals = self.rainfall.accumulate_at(ob.rain, now);
        let live = &mut self.live;
        live.rainfall_minute = totals.minute;
        live.rainfall_hour = totals.hour;
        live.rainfall_day = totals.day;
        live.rainfall_month = totals.month;
        live.rainfall_year = totals.year;
        live.rainfall_60min = totals.last_60min;
        live.rainfall_24hr = totals.last_24hr;

        self.recompute_derived();
    }

    /// Feed an instant wind sample to the gust tracker. Only sky summaries
    /// advance the gust interval.
    pub fn apply_wind(&mut self, sample: &WindSample) {
        self.gust.hold(sample.speed, sample.direction);
        self.sync_gust();
    }

    /// Apply a reading from an auxiliary sensor, creating its record on
    /// first sighting.
    pub fn apply_auxiliary(&mut self, sensor_id: &str, ob: &TowerObservation) {
        let index = match self
            .live
            .aux_sensors
            .iter()
            .position(|s| s.sensor_id == sensor_id)
        {
            Some(i) => i,
            None => {
                let location = self
                    .mapping
                    .get(sensor_id)
                    .cloned()
                    .unwrap_or_else(|| sensor_id.to_string());
                log::info!("[Station] new auxiliary sensor {} ({})", sensor_id, location);
                self.live
                    .aux_sensors
                    .push(AuxSensor::new(sensor_id, location));
                self.live.aux_sensors.len() - 1
            }
        };

        let sensor = &mut self.live.aux_sensors[index];
        sensor.temperature = ob.temperature;
        sensor.humidity = ob.humidity;
        sensor.timestamp = local_timestamp(ob.epoch);
        widen(
            &mut sensor.temperature_high,
            &mut sensor.temperature_low,
            ob.temperature,
        );
    }

    fn sync_gust(&mut self) {
        let gust = self.gust.current();
        self.live.gust_speed = gust.speed;
        self.live.gust_direction = gust.direction;
    }

    fn recompute_derived(&mut self) {
        let live = &mut self.live;
        live.dewpoint = units::dew_point(live.temperature, live.humidity);
        live.heatindex = units::heat_index(live.temperature, live.humidity);
        live.windchill = units::wind_chill(live.temperature, live.wind_speed);
        live.feelslike = units::feels_like(live.temperature, live.wind_speed, live.humidity);
    }

    /// Clear running highs and lows when the local day changes.
    fn roll_day(&mut self, today: NaiveDate) {
        match self.day {
            Some(day) if day == today => {}
            Some(_) => {
                log::info!("[Station] new day {}, resetting highs and lows", today);
                self.live.temperature_high = None;
                self.live.temperature_low = None;
                for sensor in &mut self.live.aux_sensors {
                    sensor.temperature_high = None;
                    sensor.temperature_low = None;
                }
                self.day = Some(today);
            }
            None => self.day = Some(today),
        }
    }
}
