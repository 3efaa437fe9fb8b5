//! Buffer radius validation.

use serde_json::Value;

use crate::AreaError;

/// Largest accepted buffer radius, in miles.
pub const MAX_BUFFER_MILES: f64 = 15.0;

/// Radius used when a request does not give one, in miles.
pub const DEFAULT_BUFFER_MILES: f64 = 3.0;

/// A validated buffer radius in miles, `0..=15`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct BufferRadius(f64);

impl BufferRadius {
    /// Validates a radius in miles.
    ///
    /// # Errors
    ///
    /// Returns [`AreaError::InvalidBuffer`] if the value is not finite,
    /// negative, or above [`MAX_BUFFER_MILES`].
    pub fn new(miles: f64) -> Result<Self, AreaError> {
        if miles.is_finite() && (0.0..=MAX_BUFFER_MILES).contains(&miles) {
            Ok(Self(miles))
        } else {
            Err(AreaError::InvalidBuffer)
        }
    }

    /// Validates a radius taken from request input.
    ///
    /// Numbers and numeric strings are accepted. A missing value, `null`,
    /// or blank string falls back to [`DEFAULT_BUFFER_MILES`].
    ///
    /// # Errors
    ///
    /// Returns [`AreaError::InvalidBuffer`] if the value is non-numeric or
    /// out of range.
    pub fn parse(value: Option<&Value>) -> Result<Self, AreaError> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or(AreaError::InvalidBuffer)
                .and_then(Self::new),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(Self::default()),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| AreaError::InvalidBuffer)
                .and_then(Self::new),
            Some(_) => Err(AreaError::InvalidBuffer),
        }
    }

    /// The radius in miles.
    #[must_use]
    pub const fn miles(self) -> f64 {
        self.0
    }
}

impl Default for BufferRadius {
    fn default() -> Self {
        Self(DEFAULT_BUFFER_MILES)
    }
}
