//! Timecode conversions between `HH:MM:SS.mmm` text, seconds and frame indices
//!
//! A [`Timecode`] stores whole milliseconds, so text → seconds → text round
//! trips are lossless at millisecond precision. Frame conversions go through
//! an exact [`FrameRate`] ratio and never through floating point.

use std::fmt;
use std::ops::Sub;

use num_rational::Ratio;
use serde::{Deserialize, Serialize};

use crate::error::{CutterError, CutterResult};

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;

/// Highest frame rate accepted for frame conversions
pub const MAX_FRAME_RATE: u64 = 1_000;

/// Non-negative time position with millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Timecode {
    millis: u64,
}

impl Timecode {
    /// Zero position
    pub const ZERO: Timecode = Timecode { millis: 0 };

    /// Create from total milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    /// Create from hours, minutes, seconds, milliseconds
    ///
    /// Fails with `TimecodeRange` when the total does not fit in a `u64` of
    /// milliseconds.
    pub fn from_components(hours: u64, minutes: u64, seconds: u64, millis: u64) -> CutterResult<Self> {
        checked_total(hours, minutes, seconds, millis)
            .map(Self::from_millis)
            .ok_or_else(|| CutterError::TimecodeRange {
                message: format!("{}h {}m {}s {}ms is too large", hours, minutes, seconds, millis),
            })
    }

    /// Total milliseconds
    pub const fn as_millis(&self) -> u64 {
        self.millis
    }

    /// Parse strict `HH:MM:SS[.mmm]` text
    ///
    /// Hours may have any number of digits. Minutes and seconds must be below
    /// 60. The fractional part takes one to three digits (`.5` is 500 ms).
    pub fn parse(text: &str) -> CutterResult<Self> {
        let trimmed = text.trim();
        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() != 3 {
            return Err(format_error(text, "expected three ':'-separated fields"));
        }

        let hours = parse_digits(text, parts[0], "hours")?;
        let minutes = parse_digits(text, parts[1], "minutes")?;
        let (seconds, millis) = parse_seconds_field(text, parts[2])?;

        if minutes >= 60 {
            return Err(format_error(text, "minutes must be less than 60"));
        }
        if seconds >= 60 {
            return Err(format_error(text, "seconds must be less than 60"));
        }

        from_text(text, hours, minutes, seconds, millis)
    }

    /// Parse user input in `HH:MM:SS[.mmm]`, `MM:SS[.mmm]` or plain seconds
    pub fn parse_lenient(text: &str) -> CutterResult<Self> {
        let trimmed = text.trim();
        match trimmed.matches(':').count() {
            0 => {
                let (seconds, millis) = parse_seconds_field(text, trimmed)?;
                from_text(text, 0, 0, seconds, millis)
            }
            1 => {
                let (minutes, rest) = trimmed
                    .split_once(':')
                    .ok_or_else(|| format_error(text, "expected MM:SS"))?;
                let minutes = parse_digits(text, minutes, "minutes")?;
                let (seconds, millis) = parse_seconds_field(text, rest)?;
                if seconds >= 60 {
                    return Err(format_error(text, "seconds must be less than 60"));
                }
                from_text(text, 0, minutes, seconds, millis)
            }
            _ => Self::parse(trimmed),
        }
    }

    /// Seconds as floating point
    pub fn to_seconds(&self) -> f64 {
        self.millis as f64 / MILLIS_PER_SECOND as f64
    }

    /// Create from seconds, rounding to the nearest millisecond
    pub fn from_seconds(seconds: f64) -> CutterResult<Self> {
        if !seconds.is_finite() {
            return Err(CutterError::TimecodeRange {
                message: format!("{} is not a finite number of seconds", seconds),
            });
        }
        if seconds < 0.0 {
            return Err(CutterError::TimecodeRange {
                message: format!("time cannot be negative: {}", seconds),
            });
        }
        let millis = (seconds * MILLIS_PER_SECOND as f64).round();
        if millis >= u64::MAX as f64 {
            return Err(CutterError::TimecodeRange {
                message: format!("{} seconds is too large", seconds),
            });
        }
        Ok(Self {
            millis: millis as u64,
        })
    }

    /// Nearest frame index at the given rate, ties rounding down
    pub fn to_frame(&self, rate: FrameRate) -> u64 {
        // frames = millis * num / (1000 * den)
        let numerator = self.millis as u128 * *rate.ratio().numer() as u128;
        let denominator = MILLIS_PER_SECOND as u128 * *rate.ratio().denom() as u128;
        let quotient = numerator / denominator;
        let remainder = numerator % denominator;
        let frame = if remainder * 2 > denominator {
            quotient + 1
        } else {
            quotient
        };
        frame as u64
    }

    /// Position of a frame, rounded to the nearest millisecond (ties up)
    ///
    /// Saturates at the largest representable timecode.
    pub fn from_frame(frame: u64, rate: FrameRate) -> Self {
        // millis = frame * den * 1000 / num
        let numerator = frame as u128 * *rate.ratio().denom() as u128 * MILLIS_PER_SECOND as u128;
        let denominator = *rate.ratio().numer() as u128;
        let quotient = numerator / denominator;
        let remainder = numerator % denominator;
        let millis = if remainder * 2 >= denominator {
            quotient + 1
        } else {
            quotient
        };
        Self {
            millis: u64::try_from(millis).unwrap_or(u64::MAX),
        }
    }

    /// Difference clamped at zero
    pub fn saturating_sub(self, other: Timecode) -> Timecode {
        Timecode {
            millis: self.millis.saturating_sub(other.millis),
        }
    }

    /// Format as `HH:MM:SS.mmm`
    pub fn format_hms(&self) -> String {
        let (hours, minutes, seconds, millis) = self.components();
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }

    /// Format as `MM:SS.mmm`, falling back to `HH:MM:SS.mmm` past one hour
    pub fn format_short(&self) -> String {
        let (hours, minutes, seconds, millis) = self.components();
        if hours > 0 {
            self.format_hms()
        } else {
            format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
        }
    }

    fn components(&self) -> (u64, u64, u64, u64) {
        let hours = self.millis / MILLIS_PER_HOUR;
        let minutes = (self.millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
        let seconds = (self.millis % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
        let millis = self.millis % MILLIS_PER_SECOND;
        (hours, minutes, seconds, millis)
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

impl std::str::FromStr for Timecode {
    type Err = CutterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Timecode> for String {
    fn from(value: Timecode) -> Self {
        value.format_hms()
    }
}

impl TryFrom<String> for Timecode {
    type Error = CutterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl Sub for Timecode {
    type Output = Timecode;

    fn sub(self, rhs: Timecode) -> Timecode {
        self.saturating_sub(rhs)
    }
}

/// Parse `text` as a strict timecode
pub fn parse_timecode(text: &str) -> CutterResult<Timecode> {
    Timecode::parse(text)
}

/// Seconds represented by a timecode
pub fn to_seconds(timecode: Timecode) -> f64 {
    timecode.to_seconds()
}

/// Timecode for a non-negative number of seconds
pub fn from_seconds(seconds: f64) -> CutterResult<Timecode> {
    Timecode::from_seconds(seconds)
}

/// Frame index for a timecode
pub fn to_frame(timecode: Timecode, rate: FrameRate) -> u64 {
    timecode.to_frame(rate)
}

/// Timecode of a frame index
pub fn from_frame(frame: u64, rate: FrameRate) -> Timecode {
    Timecode::from_frame(frame, rate)
}

fn format_error(input: &str, reason: &str) -> CutterError {
    CutterError::TimecodeFormat {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

fn checked_total(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Option<u64> {
    hours
        .checked_mul(MILLIS_PER_HOUR)?
        .checked_add(minutes.checked_mul(MILLIS_PER_MINUTE)?)?
        .checked_add(seconds.checked_mul(MILLIS_PER_SECOND)?)?
        .checked_add(millis)
}

fn from_text(input: &str, hours: u64, minutes: u64, seconds: u64, millis: u64) -> CutterResult<Timecode> {
    checked_total(hours, minutes, seconds, millis)
        .map(Timecode::from_millis)
        .ok_or_else(|| format_error(input, "value is too large"))
}

fn parse_digits(input: &str, field: &str, name: &str) -> CutterResult<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format_error(input, &format!("{} must be digits", name)));
    }
    field
        .parse::<u64>()
        .map_err(|_| format_error(input, &format!("{} field is too large", name)))
}

/// Parse `SS[.f|.ff|.fff]` into whole seconds and milliseconds
fn parse_seconds_field(input: &str, field: &str) -> CutterResult<(u64, u64)> {
    let (whole, fraction) = match field.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (field, None),
    };
    let seconds = parse_digits(input, whole, "seconds")?;
    let millis = match fraction {
        None => 0,
        Some(fraction) => {
            if fraction.is_empty() || fraction.len() > 3 {
                return Err(format_error(input, "fraction must have 1 to 3 digits"));
            }
            let value = parse_digits(input, fraction, "milliseconds")?;
            value * 10u64.pow(3 - fraction.len() as u32)
        }
    };
    Ok((seconds, millis))
}

/// Frame rate as a reduced, strictly positive fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate(Ratio<u64>);

impl FrameRate {
    /// Create from numerator/denominator; the fraction is reduced
    pub fn new(numerator: u64, denominator: u64) -> CutterResult<Self> {
        if numerator == 0 || denominator == 0 {
            return Err(CutterError::TimecodeRange {
                message: format!("frame rate {}/{} is not positive", numerator, denominator),
            });
        }
        let ratio = Ratio::new(numerator, denominator);
        if ratio > Ratio::from_integer(MAX_FRAME_RATE) {
            return Err(CutterError::TimecodeRange {
                message: format!(
                    "frame rate {}/{} exceeds {} fps",
                    numerator, denominator, MAX_FRAME_RATE
                ),
            });
        }
        Ok(Self(ratio))
    }

    /// Parse `num/den` or a plain integer
    pub fn parse(text: &str) -> CutterResult<Self> {
        let text = text.trim();
        let invalid = || CutterError::TimecodeRange {
            message: format!("'{}' is not a frame rate", text),
        };
        let (numerator, denominator) = match text.split_once('/') {
            Some((num, den)) => (
                num.trim().parse::<u64>().map_err(|_| invalid())?,
                den.trim().parse::<u64>().map_err(|_| invalid())?,
            ),
            None => (text.parse::<u64>().map_err(|_| invalid())?, 1),
        };
        Self::new(numerator, denominator)
    }

    /// Underlying reduced ratio
    pub fn ratio(&self) -> Ratio<u64> {
        self.0
    }

    pub fn numerator(&self) -> u64 {
        *self.0.numer()
    }

    pub fn denominator(&self) -> u64 {
        *self.0.denom()
    }

    /// Approximate frames per second
    pub fn as_f64(&self) -> f64 {
        *self.0.numer() as f64 / *self.0.denom() as f64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0.numer(), self.0.denom())
    }
}
