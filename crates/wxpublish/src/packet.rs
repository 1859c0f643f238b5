//! WeatherFlow hub UDP packets.
//!
//! The hub broadcasts one JSON object per datagram. Observation packets
//! carry positional arrays; only the fields the station uses are decoded.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("packet has no type")]
    MissingType,

    #[error("{kind}: missing field {field}")]
    MissingField { kind: &'static str, field: String },

    #[error("{kind}: field {field} is not a number")]
    NotNumber { kind: &'static str, field: String },
}

pub type Result<T> = std::result::Result<T, PacketError>;

/// Category of an inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Pressure, temperature, humidity and lightning (`obs_air`).
    PrimaryEnvironment,
    /// Illumination, UV, rain, wind and solar (`obs_sky`).
    WindRainSummary,
    /// Three-second wind sample (`rapid_wind`).
    InstantWind,
    LightningStrike,
    RainStart,
    DeviceStatus,
    HubStatus,
    /// Remote temperature/humidity unit (`obs_tower`).
    Auxiliary,
    Unknown,
}

/// One row of an `obs_air` packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirObservation {
    pub epoch: i64,
    /// Station pressure, mb.
    pub pressure: f64,
    /// °C
    pub temperature: f64,
    /// %
    pub humidity: f64,
    pub strikes: u32,
    /// km
    pub strike_distance: f64,
}

/// One row of an `obs_sky` packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyObservation {
    pub epoch: i64,
    /// lux
    pub illumination: f64,
    pub uv: f64,
    /// mm over the reporting interval
    pub rain: f64,
    /// m/s
    pub wind_speed: f64,
    /// m/s
    pub gust_speed: f64,
    /// degrees
    pub wind_direction: f64,
    /// W/m²
    pub solar: f64,
}

/// A `rapid_wind` sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindSample {
    pub epoch: i64,
    pub speed: f64,
    pub direction: f64,
}

/// One row of an `obs_tower` packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TowerObservation {
    pub epoch: i64,
    pub temperature: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Air {
        serial_number: String,
        observations: Vec<AirObservation>,
    },
    Sky {
        serial_number: String,
        observations: Vec<SkyObservation>,
    },
    RapidWind(WindSample),
    Strike {
        epoch: i64,
        distance: f64,
        energy: f64,
    },
    RainStart {
        epoch: i64,
    },
    DeviceStatus {
        serial_number: String,
    },
    HubStatus {
        serial_number: String,
    },
    Tower {
        serial_number: String,
        observations: Vec<TowerObservation>,
    },
    Unknown(String),
}

fn number(kind: &'static str, row: &[Value], index: usize) -> Result<f64> {
    let value = row.get(index).ok_or_else(|| PacketError::MissingField {
        kind,
        field: format!("[{}]", index),
    })?;
    value.as_f64().ok_or_else(|| PacketError::NotNumber {
        kind,
        field: format!("[{}]", index),
    })
}

fn array<'a>(kind: &'static str, packet: &'a Value, key: &str) -> Result<&'a Vec<Value>> {
    packet
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| PacketError::MissingField {
            kind,
            field: key.to_string(),
        })
}

/// Each element of `obs` must itself be an array of fields.
fn rows<'a>(kind: &'static str, packet: &'a Value) -> Result<Vec<&'a [Value]>> {
    array(kind, packet, "obs")?
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.as_array()
                .map(Vec::as_slice)
                .ok_or_else(|| PacketError::MissingField {
                    kind,
                    field: format!("obs[{}]", i),
                })
        })
        .collect()
}

fn serial(packet: &Value) -> String {
    packet
        .get("serial_number")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl Packet {
    /// Decode one datagram.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(&value)
    }

    pub fn from_value(packet: &Value) -> Result<Self> {
        let kind = packet
            .get("type")
            .and_then(Value::as_str)
            .ok_or(PacketError::MissingType)?;

        match kind {
            "obs_air" => {
                const K: &str = "obs_air";
                let observations = rows(K, packet)?
                    .into_iter()
                    .map(|row| {
                        Ok(AirObservation {
                            epoch: number(K, row, 0)? as i64,
                            pressure: number(K, row, 1)?,
                            temperature: number(K, row, 2)?,
                            humidity: number(K, row, 3)?,
                            strikes: number(K, row, 4)?.max(0.0) as u32,
                            strike_distance: number(K, row, 5)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Packet::Air {
                    serial_number: serial(packet),
                    observations,
                })
            }
            "obs_sky" => {
                const K: &str = "obs_sky";
                let observations = rows(K, packet)?
                    .into_iter()
                    .map(|row| {
                        Ok(SkyObservation {
                            epoch: number(K, row, 0)? as i64,
                            illumination: number(K, row, 1)?,
                            uv: number(K, row, 2)?,
                            rain: number(K, row, 3)?,
                            wind_speed: number(K, row, 5)?,
                            gust_speed: number(K, row, 6)?,
                            wind_direction: number(K, row, 7)?,
                            solar: number(K, row, 10)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Packet::Sky {
                    serial_number: serial(packet),
                    observations,
                })
            }
            "rapid_wind" => {
                const K: &str = "rapid_wind";
                let ob = array(K, packet, "ob")?;
                Ok(Packet::RapidWind(WindSample {
                    epoch: number(K, ob, 0)? as i64,
                    speed: number(K, ob, 1)?,
                    direction: number(K, ob, 2)?,
                }))
            }
            "evt_strike" => {
                const K: &str = "evt_strike";
                let evt = array(K, packet, "evt")?;
                Ok(Packet::Strike {
                    epoch: number(K, evt, 0)? as i64,
                    distance: number(K, evt, 1)?,
                    energy: number(K, evt, 2)?,
                })
            }
            "evt_precip" => {
                const K: &str = "evt_precip";
                let evt = array(K, packet, "evt")?;
                Ok(Packet::RainStart {
                    epoch: number(K, evt, 0)? as i64,
                })
            }
            "device_status" => Ok(Packet::DeviceStatus {
                serial_number: serial(packet),
            }),
            "hub_status" => Ok(Packet::HubStatus {
                serial_number: serial(packet),
            }),
            "obs_tower" => {
                const K: &str = "obs_tower";
                let observations = rows(K, packet)?
                    .into_iter()
                    .map(|row| {
                        Ok(TowerObservation {
                            epoch: number(K, row, 0)? as i64,
                            temperature: number(K, row, 2)?,
                            humidity: number(K, row, 3)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Packet::Tower {
                    serial_number: serial(packet),
                    observations,
                })
            }
            other => Ok(Packet::Unknown(other.to_string())),
        }
    }

    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Air { .. } => PacketKind::PrimaryEnvironment,
            Packet::Sky { .. } => PacketKind::WindRainSummary,
            Packet::RapidWind(_) => PacketKind::InstantWind,
            Packet::Strike { .. } => PacketKind::LightningStrike,
            Packet::RainStart { .. } => PacketKind::RainStart,
            Packet::DeviceStatus { .. } => PacketKind::DeviceStatus,
            Packet::HubStatus { .. } => PacketKind::HubStatus,
            Packet::Tower { .. } => PacketKind::Auxiliary,
            Packet::Unknown(_) => PacketKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_air() {
        let json = br#"{"serial_number":"AR-00004049","type":"obs_air","hub_sn":"HB-00000001",
            "obs":[[1493164835,835.0,10.0,45,0,0,3.46,1]],"firmware_revision":17}"#;
        let packet = Packet::decode(json).unwrap();
        assert_eq!(packet.kind(), PacketKind::PrimaryEnvironment);
        match packet {
            Packet::Air {
                serial_number,
                observations,
            } => {
                assert_eq!(serial_number, "AR-00004049");
                assert_eq!(observations.len(), 1);
                assert_eq!(observations[0].epoch, 1493164835);
                assert_eq!(observations[0].pressure, 835.0);
                assert_eq!(observations[0].humidity, 45.0);
            }
            other => panic!("expected Air, got {:?}", other),
        }
    }

    #[test]
    fn decode_sky() {
        let json = br#"{"serial_number":"SK-00008453","type":"obs_sky","hub_sn":"HB-00000001",
            "obs":[[1493321340,9000,10,0.2,2.6,4.6,7.4,187,3.12,1,130,null,0,3]],
            "firmware_revision":29}"#;
        match Packet::decode(json).unwrap() {
            Packet::Sky { observations, .. } => {
                let ob = observations[0];
                assert_eq!(ob.illumination, 9000.0);
                assert_eq!(ob.uv, 10.0);
                assert_eq!(ob.rain, 0.2);
                assert_eq!(ob.wind_speed, 4.6);
                assert_eq!(ob.gust_speed, 7.4);
                assert_eq!(ob.wind_direction, 187.0);
                assert_eq!(ob.solar, 130.0);
            }
            other => panic!("expected Sky, got {:?}", other),
        }
    }

    #[test]
    fn decode_rapid_wind() {
        let json = br#"{"serial_number":"SK-00008453","type":"rapid_wind",
            "hub_sn":"HB-00000001","ob":[1493322445,2.3,128]}"#;
        assert_eq!(
            Packet::decode(json).unwrap(),
            Packet::RapidWind(WindSample {
                epoch: 1493322445,
                speed: 2.3,
                direction: 128.0
            })
        );
    }

    #[test]
    fn decode_tower_and_events() {
        let tower = br#"{"serial_number":"ST-00000512","type":"obs_tower",
            "obs":[[1588948614,1000.5,22.5,61,0,0,0,0]]}"#;
        assert_eq!(
            Packet::decode(tower).unwrap().kind(),
            PacketKind::Auxiliary
        );

        let strike = br#"{"serial_number":"AR-00004049","type":"evt_strike",
            "evt":[1493322445,27,3848]}"#;
        assert_eq!(
            Packet::decode(strike).unwrap(),
            Packet::Strike {
                epoch: 1493322445,
                distance: 27.0,
                energy: 3848.0
            }
        );

        let hub = br#"{"serial_number":"HB-00000001","type":"hub_status","uptime":1670133}"#;
        assert_eq!(Packet::decode(hub).unwrap().kind(), PacketKind::HubStatus);
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let json = br#"{"type":"light_debug","serial_number":"X"}"#;
        assert_eq!(
            Packet::decode(json).unwrap(),
            Packet::Unknown("light_debug".to_string())
        );
    }

    #[test]
    fn malformed_packets_are_errors() {
        assert!(matches!(
            Packet::decode(b"{not json"),
            Err(PacketError::Json(_))
        ));
        assert!(matches!(
            Packet::decode(br#"{"obs":[]}"#),
            Err(PacketError::MissingType)
        ));
        assert!(matches!(
            Packet::decode(br#"{"type":"obs_air","obs":[[1493164835,835.0]]}"#),
            Err(PacketError::MissingField { .. })
        ));
        assert!(matches!(
            Packet::decode(br#"{"type":"obs_air","obs":[[1,"x",10,45,0,0]]}"#),
            Err(PacketError::NotNumber { .. })
        ));
        assert!(matches!(
            Packet::decode(br#"{"type":"rapid_wind"}"#),
            Err(PacketError::MissingField { .. })
        ));
    }
}
