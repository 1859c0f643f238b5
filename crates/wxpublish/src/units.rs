//! Unit conversions and derived weather values.
//!
//! Everything here is a pure function of its inputs. Observations are kept
//! in metric (°C, m/s, mb, mm, km) and converted at the publisher edge.

/// Celsius to Fahrenheit.
pub fn temp_f(c: f64) -> f64 {
    (c * 1.8) + 32.0
}

/// Fahrenheit to Celsius.
pub fn temp_c(f: f64) -> f64 {
    (f - 32.0) / 1.8
}

/// Meters per second to miles per hour.
pub fn ms_to_mph(ms: f64) -> f64 {
    ms / 0.44704
}

/// Millibars to inches of mercury.
pub fn mb_to_inhg(mb: f64) -> f64 {
    mb * 0.029_529_987_51
}

/// Kilometers to statute miles.
pub fn km_to_miles(km: f64) -> f64 {
    km / 1.609_344
}

/// Millimeters to inches.
pub fn mm_to_inches(mm: f64) -> f64 {
    mm * 0.03937
}

/// Dew point in °C from air temperature (°C) and relative humidity (%).
///
/// Magnus approximation with the Alduchov/Eskridge coefficients.
pub fn dew_point(temp_c: f64, humidity: f64) -> f64 {
    let b = (17.625 * temp_c) / (243.04 + temp_c);
    let h = (humidity / 100.0).ln();
    (243.04 * (h + b)) / (17.625 - h - b)
}

/// Heat index in °C.
///
/// Rothfusz regression; below 80 °F or 40 % humidity the air temperature
/// is returned unchanged.
pub fn heat_index(temp_c_in: f64, humidity: f64) -> f64 {
    const C1: f64 = -42.379;
    const C2: f64 = 2.049_015_23;
    const C3: f64 = 10.143_331_27;
    const C4: f64 = -0.224_755_41;
    const C5: f64 = -6.837_83e-3;
    const C6: f64 = -5.481_717e-2;
    const C7: f64 = 1.228_74e-3;
    const C8: f64 = 8.5282e-4;
    const C9: f64 = -1.99e-6;

    let t = temp_f(temp_c_in);
    let h = humidity;
    if t < 80.0 || h < 40.0 {
        return temp_c_in;
    }

    temp_c(
        C1 + (C2 * t)
            + (C3 * h)
            + (C4 * t * h)
            + (C5 * t * t)
            + (C6 * h * h)
            + (C7 * t * t * h)
            + (C8 * t * h * h)
            + (C9 * t * t * h * h),
    )
}

/// Wind chill in °C (NWS 2001 formula).
///
/// Only defined below 50 °F with wind above 5 mph; otherwise the air
/// temperature is returned.
pub fn wind_chill(temp_c_in: f64, speed_ms: f64) -> f64 {
    let t = temp_f(temp_c_in);
    let v = ms_to_mph(speed_ms);

    if t < 50.0 && v > 5.0 {
        let vp = v.powf(0.16);
        temp_c(35.74 + (0.6215 * t) - (35.75 * vp) + (0.4275 * t * vp))
    } else {
        temp_c_in
    }
}

/// Apparent ("feels like") temperature in °C.
pub fn feels_like(temp_c_in: f64, speed_ms: f64, humidity: f64) -> f64 {
    let t = temp_f(temp_c_in);
    if t >= 80.0 {
        heat_index(temp_c_in, humidity)
    } else if t < 50.0 {
        wind_chill(temp_c_in, speed_ms)
    } else {
        temp_c_in
    }
}

/// Reduce station pressure (mb) to sea level for an elevation in meters.
pub fn sea_level_pressure(station_mb: f64, elevation_m: f64) -> f64 {
    station_mb / (1.0 - elevation_m / 44_330.0).powf(5.255)
}

const CARDINALS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass name for a direction in degrees.
pub fn cardinal(degrees: f64) -> &'static str {
    let normalized = degrees.rem_euclid(360.0);
    let index = ((normalized / 22.5) + 0.5) as usize % CARDINALS.len();
    CARDINALS[index]
}
