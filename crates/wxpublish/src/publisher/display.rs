//! Terminal dashboard redrawn every cycle.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::io::Write as _;

use super::{Publisher, Result};
use crate::config::DestinationConfig;
use crate::observation::{Conversion, Observation, StationInfo};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Console dashboard redrawn every cycle.
pub struct Display;

impl Display {
    pub fn new() -> Self {
        Self
    }
}

struct Units {
    temp: &'static str,
    speed: &'static str,
    rain: &'static str,
    pressure: &'static str,
    distance: &'static str,
}

const METRIC: Units = Units {
    temp: "°C",
    speed: " m/s",
    rain: " mm",
    pressure: " mb",
    distance: " km",
};

const IMPERIAL: Units = Units {
    temp: "°F",
    speed: " mph",
    rain: " in",
    pressure: " inHg",
    distance: " miles",
};

fn opt(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

/// Render a snapshot already converted to the requested units.
pub fn render(station: &StationInfo, obs: &Observation, metric: bool) -> String {
    let u = if metric { &METRIC } else { &IMPERIAL };
    let mut s = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(
        s,
        "{}  -- Last Update: {}\n",
        station.name,
        obs.timestamp.as_deref().unwrap_or("-")
    );
    let _ = writeln!(
        s,
        "Temperature:    {:5.1}{t}       High:        {:5.1}{t}       Low:        {:5.1}{t}",
        obs.temperature,
        opt(obs.temperature_high),
        opt(obs.temperature_low),
        t = u.temp
    );
    let _ = writeln!(
        s,
        "Dew point:      {:5.1}{t}       Windchill:   {:5.1}{t}       Heat index: {:5.1}{t}\n",
        obs.dewpoint,
        obs.windchill,
        obs.heatindex,
        t = u.temp
    );
    let _ = writeln!(
        s,
        "Pressure:      {:7.2}{:<6}  Humidity:    {:5.1}%        Feels like: {:5.1}{}\n",
        obs.pressure_sealevel, u.pressure, obs.humidity, obs.feelslike, u.temp
    );
    let _ = writeln!(
        s,
        "Wind speed:     {:5.1}{}     Wind dir:    {:5.0}° ({})",
        obs.wind_speed, u.speed, obs.wind_direction, obs.wind_cardinal
    );
    let _ = writeln!(
        s,
        "Gust speed:     {:5.1}{}     Gust dir:    {:5.0}°\n",
        obs.gust_speed, u.speed, obs.gust_direction
    );
    let _ = writeln!(
        s,
        "Illumination:   {:5.0} Lux     Solar Rad:   {:5.0} W/m^2   UV index:   {:5.1}\n",
        obs.illumination, obs.solar, obs.uv
    );
    let _ = writeln!(
        s,
        "Rain:          {:6.2}{r}      Rain 1hr:   {:6.2}{r}      Rain 24hrs:{:6.2}{r}",
        obs.rain,
        obs.rainfall_60min,
        obs.rainfall_24hr,
        r = u.rain
    );
    let _ = writeln!(
        s,
        "Daily rain:    {:6.2}{r}      Monthly:    {:6.2}{r}      Yearly:    {:6.2}{r}\n",
        obs.rainfall_day,
        obs.rainfall_month,
        obs.rainfall_year,
        r = u.rain
    );
    let _ = writeln!(
        s,
        "Pressure trend: {:>7}       Lightning:   {:5}         Distance:  {:5.1}{}\n",
        obs.trend.as_str(),
        obs.strikes,
        obs.strike_distance,
        u.distance
    );

    for sensor in &obs.aux_sensors {
        let _ = writeln!(
            s,
            "Sensor:       {:>9.9}       Humidity:    {:5.1}%",
            sensor.location, sensor.humidity
        );
        let _ = writeln!(
            s,
            "Temperature:    {:5.1}{t}       High:        {:5.1}{t}       Low:        {:5.1}{t}\n",
            sensor.temperature,
            opt(sensor.temperature_high),
            opt(sensor.temperature_low),
            t = u.temp
        );
    }

    s.push_str(&"-".repeat(79));
    s.push('\n');
    s
}

#[async_trait]
impl Publisher for Display {
    async fn update(
        &self,
        config: &DestinationConfig,
        station: &StationInfo,
        mut observation: Observation,
    ) -> Result<()> {
        if !config.metric {
            observation.to_imperial(Conversion::All);
        }
        let screen = render(station, &observation, config.metric);

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(CLEAR_SCREEN.as_bytes())?;
        stdout.write_all(screen.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}
