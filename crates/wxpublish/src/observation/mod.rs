//! Consolidated weather snapshot.
//!
//! [`Observation`] is the value that publishers receive. It is plain data:
//! cloning it is a full deep copy, auxiliary sensors included, so a copy
//! handed to a publisher shares nothing with the live snapshot owned by
//! [`Station`].

mod station;
mod trend;

pub use station::{Station, StationInfo};
pub use trend::{PressureHistory, PressureTrend};

use crate::units;

/// Format used for every timestamp string in a snapshot.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A remote temperature/humidity unit reported alongside the main station.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxSensor {
    /// Serial number of the unit; the lookup key.
    pub sensor_id: String,
    /// Human readable location from the sensor mapping, or the serial number.
    pub location: String,
    pub temperature: f64,
    pub humidity: f64,
    pub temperature_high: Option<f64>,
    pub temperature_low: Option<f64>,
    pub timestamp: Option<String>,
}

impl AuxSensor {
    pub fn new(sensor_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            location: location.into(),
            temperature: 0.0,
            humidity: 0.0,
            temperature_high: None,
            temperature_low: None,
            timestamp: None,
        }
    }
}

/// Current state of every observed and derived value.
///
/// Units are metric: °C, %, mb, m/s, degrees, lux, W/m², mm, km.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    /// Local time of the last primary-environment reading.
    pub timestamp: Option<String>,

    pub pressure: f64,
    pub pressure_sealevel: f64,
    pub temperature: f64,
    pub temperature_high: Option<f64>,
    pub temperature_low: Option<f64>,
    pub humidity: f64,

    pub wind_speed: f64,
    pub wind_direction: f64,
    pub wind_cardinal: &'static str,
    pub gust_speed: f64,
    pub gust_direction: f64,

    pub illumination: f64,
    pub uv: f64,
    pub solar: f64,

    pub strikes: u32,
    pub strike_distance: f64,

    /// Rain over the last reporting interval of the sky sensor.
    pub rain: f64,
    pub rainfall_minute: f64,
    pub rainfall_hour: f64,
    pub rainfall_day: f64,
    pub rainfall_month: f64,
    pub rainfall_year: f64,
    pub rainfall_60min: f64,
    pub rainfall_24hr: f64,

    pub dewpoint: f64,
    pub heatindex: f64,
    pub windchill: f64,
    pub feelslike: f64,
    pub trend: PressureTrend,

    /// Auxiliary sensors in order of first sighting.
    pub aux_sensors: Vec<AuxSensor>,
}

/// Selects which quantities [`Observation::to_imperial`] converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    All,
    /// Everything except pressure, which stays in millibars.
    KeepPressure,
}

impl Observation {
    /// Convert this snapshot in place from metric to imperial units.
    ///
    /// Meant for a publisher's own copy; the live snapshot stays metric.
    pub fn to_imperial(&mut self, conversion: Conversion) {
        let f = units::temp_f;
        self.temperature = f(self.temperature);
        self.temperature_high = self.temperature_high.map(f);
        self.temperature_low = self.temperature_low.map(f);
        self.dewpoint = f(self.dewpoint);
        self.heatindex = f(self.heatindex);
        self.windchill = f(self.windchill);
        self.feelslike = f(self.feelslike);

        self.wind_speed = units::ms_to_mph(self.wind_speed);
        self.gust_speed = units::ms_to_mph(self.gust_speed);

        if conversion == Conversion::All {
            self.pressure = units::mb_to_inhg(self.pressure);
            self.pressure_sealevel = units::mb_to_inhg(self.pressure_sealevel);
        }

        self.strike_distance = units::km_to_miles(self.strike_distance);

        let inch = units::mm_to_inches;
        self.rain = inch(self.rain);
        self.rainfall_minute = inch(self.rainfall_minute);
        self.rainfall_hour = inch(self.rainfall_hour);
        self.rainfall_day = inch(self.rainfall_day);
        self.rainfall_month = inch(self.rainfall_month);
        self.rainfall_year = inch(self.rainfall_year);
        self.rainfall_60min = inch(self.rainfall_60min);
        self.rainfall_24hr = inch(self.rainfall_24hr);

        for sensor in &mut self.aux_sensors {
            sensor.temperature = f(sensor.temperature);
            sensor.temperature_high = sensor.temperature_high.map(f);
            sensor.temperature_low = sensor.temperature_low.map(f);
        }
    }

    /// Look up an auxiliary sensor by serial number.
    pub fn aux_sensor(&self, sensor_id: &str) -> Option<&AuxSensor> {
        self.aux_sensors.iter().find(|s| s.sensor_id == sensor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_is_independent_of_the_original() {
        let mut live = Observation {
            temperature: 20.0,
            aux_sensors: vec![AuxSensor::new("ST-1", "Garage")],
            ..Default::default()
        };
        let copy = live.clone();

        live.temperature = 30.0;
        live.aux_sensors[0].temperature = 5.0;
        live.aux_sensors.push(AuxSensor::new("ST-2", "Attic"));

        assert_eq!(copy.temperature, 20.0);
        assert_eq!(copy.aux_sensors.len(), 1);
        assert_eq!(copy.aux_sensors[0].temperature, 0.0);
    }

    #[test]
    fn imperial_conversion_keeps_pressure_when_asked() {
        let mut obs = Observation {
            temperature: 0.0,
            temperature_high: Some(100.0),
            pressure: 1000.0,
            wind_speed: 0.44704,
            rainfall_day: 25.4,
            ..Default::default()
        };
        obs.to_imperial(Conversion::KeepPressure);

        assert_eq!(obs.temperature, 32.0);
        assert_eq!(obs.temperature_high, Some(212.0));
        assert_eq!(obs.temperature_low, None);
        assert_eq!(obs.pressure, 1000.0);
        assert!((obs.wind_speed - 1.0).abs() < 1e-9);
        assert!((obs.rainfall_day - 0.999_998).abs() < 1e-3);
    }

    #[test]
    fn imperial_conversion_converts_pressure_and_aux() {
        let mut obs = Observation {
            pressure: 1013.25,
            aux_sensors: vec![AuxSensor {
                temperature: 10.0,
                ..AuxSensor::new("ST-1", "Garage")
            }],
            ..Default::default()
        };
        obs.to_imperial(Conversion::All);

        assert!((obs.pressure - 29.92).abs() < 0.01);
        assert_eq!(obs.aux_sensors[0].temperature, 50.0);
    }
}
