//! Static fallback candle series.
//!
//! Served when history is in mock mode, or when the live candle endpoint
//! answers with a non-`ok` status. Twenty-two daily sessions from
//! 2023-11-13 to 2023-12-12 (UTC midnight timestamps, weekdays only).

use crate::models::RawSeries;

const TIMESTAMPS: [i64; 22] = [
    1699833600, 1699920000, 1700006400, 1700092800, 1700179200, 1700438400, 1700524800,
    1700611200, 1700697600, 1700784000, 1701043200, 1701129600, 1701216000, 1701302400,
    1701388800, 1701648000, 1701734400, 1701820800, 1701907200, 1701993600, 1702252800,
    1702339200,
];

const CLOSE: [f64; 22] = [
    186.4, 187.77, 190.09, 192.68, 194.82, 196.02, 196.17, 195.6, 194.95, 194.95, 196.16, 198.79,
    202.62, 207.06, 211.37, 214.94, 217.45, 219.04, 220.22, 221.71, 224.18, 228.03,
];

const OPEN: [f64; 22] = [
    186.4, 187.29, 187.54, 189.26, 193.12, 195.54, 195.39, 195.61, 196.37, 195.31, 194.08, 196.03,
    199.69, 202.52, 206.19, 211.69, 215.73, 216.92, 218.38, 220.92, 222.19, 223.36,
];

const HIGH: [f64; 22] = [
    187.8, 188.8, 191.02, 194.07, 195.94, 196.85, 197.54, 196.81, 197.09, 196.64, 197.43, 199.39,
    203.9, 208.39, 212.08, 216.15, 218.82, 219.86, 221.35, 223.1, 225.11, 229.07,
];

const LOW: [f64; 22] = [
    185.9, 186.12, 186.68, 188.28, 192.0, 194.89, 194.19, 194.88, 193.87, 193.92, 193.29, 194.84,
    199.11, 201.37, 205.27, 210.77, 214.58, 216.34, 217.19, 220.13, 221.16, 222.28,
];

const VOLUME: [f64; 22] = [
    41000000.0, 55168000.0, 59880000.0, 51990000.0, 45234000.0, 57633000.0, 58930000.0,
    48259000.0, 49256000.0, 59261000.0, 57078000.0, 44163000.0, 52863000.0, 59971000.0,
    54417000.0, 42092000.0, 55872000.0, 59726000.0, 51081000.0, 46292000.0, 58133000.0,
    58539000.0,
];

/// The fixed fallback series, in the provider's candle shape.
pub fn fallback_series() -> RawSeries {
    RawSeries {
        status: Some(RawSeries::STATUS_OK.to_string()),
        close: Some(CLOSE.to_vec()),
        timestamps: Some(TIMESTAMPS.to_vec()),
        open: Some(OPEN.to_vec()),
        high: Some(HIGH.to_vec()),
        low: Some(LOW.to_vec()),
        volume: Some(VOLUME.to_vec()),
    }
}
