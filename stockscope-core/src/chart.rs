//! Reshaping a candle series into chart-ready points.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::dates::DateFormat;
use crate::error::ApiError;
use crate::models::RawSeries;

/// One chart sample: formatted date and a fixed two-decimal price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: String,
    pub value: String,
}

/// Round a price half-up (away from zero) to two decimals.
///
/// Rounding works on the shortest decimal text of the float, so `100.005`
/// rounds to `"100.01"` even though its binary value is slightly below the
/// midpoint. Returns `None` for non-finite input and for magnitudes that
/// cannot carry two decimals in a `Decimal` (roughly 7.9e26 and above).
pub fn format_value(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    let decimal = Decimal::from_str(&value.to_string()).ok()?;
    let mut rounded = decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    // rescale leaves the scale unchanged when the result would overflow.
    if rounded.scale() != 2 {
        return None;
    }
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    Some(rounded.to_string())
}

/// Map a candle series to chart points, index by index.
///
/// Order is preserved as received. The close and timestamp arrays must both
/// be present and of equal length; anything else is a shape error.
pub fn to_chart_points(series: &RawSeries, format: &DateFormat) -> Result<Vec<ChartPoint>, ApiError> {
    let close = series
        .close
        .as_ref()
        .ok_or_else(|| ApiError::Shape("series has no close prices".into()))?;
    let timestamps = series
        .timestamps
        .as_ref()
        .ok_or_else(|| ApiError::Shape("series has no timestamps".into()))?;

    if close.len() != timestamps.len() {
        return Err(ApiError::Shape(format!(
            "series arrays differ in length: {} closes, {} timestamps",
            close.len(),
            timestamps.len()
        )));
    }

    close
        .iter()
        .zip(timestamps)
        .enumerate()
        .map(|(i, (&price, &ts))| {
            if !price.is_finite() {
                return Err(ApiError::Shape(format!(
                    "close price at index {i} is not a finite number"
                )));
            }
            let value = format_value(price).ok_or_else(|| {
                ApiError::Shape(format!("close price {price} at index {i} is out of range"))
            })?;
            let date = format.format_timestamp(ts).ok_or_else(|| {
                ApiError::Shape(format!("timestamp {ts} at index {i} is out of range"))
            })?;
            Ok(ChartPoint { date, value })
        })
        .collect()
}
