use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::Address;

/// Status codes the contract understands for a flight query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightStatus {
    Unknown,
    OnTime,
    LateAirline,
    LateWeather,
    LateTechnical,
    LateOther,
}

impl FlightStatus {
    pub const fn code(self) -> u8 {
        match self {
            FlightStatus::Unknown => 0,
            FlightStatus::OnTime => 10,
            FlightStatus::LateAirline => 20,
            FlightStatus::LateWeather => 30,
            FlightStatus::LateTechnical => 40,
            FlightStatus::LateOther => 50,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(FlightStatus::Unknown),
            10 => Some(FlightStatus::OnTime),
            20 => Some(FlightStatus::LateAirline),
            30 => Some(FlightStatus::LateWeather),
            40 => Some(FlightStatus::LateTechnical),
            50 => Some(FlightStatus::LateOther),
            _ => None,
        }
    }

    /// Human-readable label for logs; unrecognised codes are reported as such.
    pub fn label(code: u8) -> &'static str {
        match Self::from_code(code) {
            Some(FlightStatus::Unknown) => "unknown",
            Some(FlightStatus::OnTime) => "on_time",
            Some(FlightStatus::LateAirline) => "late_airline",
            Some(FlightStatus::LateWeather) => "late_weather",
            Some(FlightStatus::LateTechnical) => "late_technical",
            Some(FlightStatus::LateOther) => "late_other",
            None => "unrecognised",
        }
    }
}

/// Static flight record served to dapp clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceFlight {
    pub airline: Address,
    pub flight: String,
    pub departure: DateTime<Utc>,
    pub timestamp: u64,
}

impl ReferenceFlight {
    fn new(airline: [u8; 20], flight: &str, departure_secs: i64) -> Self {
        let departure = Utc
            .timestamp_opt(departure_secs, 0)
            .single()
            .unwrap_or_default();
        Self {
            airline: Address::from_bytes(airline),
            flight: flight.to_string(),
            departure,
            timestamp: departure_secs.max(0) as u64,
        }
    }
}

const fn airline(tag: u8) -> [u8; 20] {
    let mut bytes = [0u8; 20];
    bytes[19] = tag;
    bytes
}

/// The reference flight table exposed by `GET /flights`.
pub fn reference_flights() -> Vec<ReferenceFlight> {
    vec![
        ReferenceFlight::new(airline(0x01), "ND1309", 1_704_103_200),
        ReferenceFlight::new(airline(0x01), "ND1310", 1_704_124_800),
        ReferenceFlight::new(airline(0x02), "XY123", 1_704_189_600),
        ReferenceFlight::new(airline(0x02), "XY456", 1_704_211_200),
        ReferenceFlight::new(airline(0x03), "LH400", 1_704_276_000),
    ]
}
