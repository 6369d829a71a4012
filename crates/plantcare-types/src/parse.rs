//! Decoding of controller response bodies.
//!
//! The controller answers with tiny plain-text bodies (`/sensor`, `/dht`,
//! `/ldr`) or a small JSON object (`/setthresholds`). Bodies are trimmed
//! before parsing since the firmware appends line endings.

use crate::error::{ParseError, ParseResult};
use crate::types::{Climate, LightLevel};
#[cfg(feature = "serde")]
use crate::types::ThresholdSet;

/// Parse the `/sensor` body into a soil moisture percentage.
///
/// Values outside `0..=100` are clamped; the capacitive sensor drifts slightly
/// past its calibration points.
pub fn parse_soil(body: &str) -> ParseResult<u8> {
    let value = parse_integer(body, "soil")?;
    Ok(value.clamp(0, 100) as u8)
}

/// Parse the `/dht` body, formatted as `"<humidity>,<temperature>"`.
pub fn parse_climate(body: &str) -> ParseResult<Climate> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parts = trimmed.split(',');
    let (Some(hum), Some(temp)) = (parts.next(), parts.next()) else {
        return Err(ParseError::UnexpectedFormat {
            expected: "<humidity>,<temperature>",
            value: trimmed.to_string(),
        });
    };

    Ok(Climate {
        humidity: parse_float(hum, "humidity")?,
        temperature: parse_float(temp, "temperature")?,
    })
}

/// Parse the `/ldr` body.
pub fn parse_light(body: &str) -> ParseResult<LightLevel> {
    parse_integer(body, "light").map(LightLevel::from_raw)
}

/// Parse the JSON body of `GET /setthresholds`.
///
/// Numbers may arrive as integers or floats; the result is clamped into the
/// slider ranges.
#[cfg(feature = "serde")]
pub fn parse_thresholds(body: &str) -> ParseResult<ThresholdSet> {
    #[derive(serde::Deserialize)]
    struct Raw {
        soil: f64,
        temp: f64,
        hum: f64,
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    let raw: Raw = serde_json::from_str(trimmed).map_err(|e| ParseError::Json(e.to_string()))?;
    Ok(ThresholdSet::clamped(raw.soil, raw.temp, raw.hum))
}

fn parse_integer(body: &str, field: &'static str) -> ParseResult<i64> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    trimmed.parse::<i64>().map_err(|_| ParseError::InvalidNumber {
        field,
        value: trimmed.to_string(),
    })
}

fn parse_float(raw: &str, field: &'static str) -> ParseResult<f32> {
    let trimmed = raw.trim();
    match trimmed.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::InvalidNumber {
            field,
            value: trimmed.to_string(),
        }),
    }
}
