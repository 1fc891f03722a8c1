//! Private utility module
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{FlowError, Result};

/// A single header value, typed by the first successful interpretation:
/// integer, then floating point, then plain text.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Anything else, trimmed of surrounding whitespace
    Str(String),
}

impl HeaderValue {
    /// Interpret the value as an integer. Floats are accepted when they
    /// carry no fractional part.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            HeaderValue::Int(v) => Some(v),
            HeaderValue::Float(v) if v.fract() == 0. && v.is_finite() => Some(v as i64),
            _ => None,
        }
    }

    /// Interpret the value as text. Numbers are not converted.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HeaderValue::Int(v) => write!(f, "{}", v),
            HeaderValue::Float(v) => write!(f, "{}", v),
            HeaderValue::Str(s) => f.write_str(s),
        }
    }
}

/// Parse a header value into its semantic type. No locale handling is done,
/// only `.` is accepted as the decimal point.
pub fn parse_scalar(text: &str) -> HeaderValue {
    let text = text.trim();
    if let Ok(v) = text.parse::<i64>() {
        HeaderValue::Int(v)
    } else if let Ok(v) = text.parse::<f64>() {
        HeaderValue::Float(v)
    } else {
        HeaderValue::Str(text.to_string())
    }
}

/// Parse a whitespace separated triple, as used for `DimSize`,
/// `ElementSpacing`, `min_ext` and friends.
pub fn parse_triple<T: FromStr + Copy>(key: &'static str, text: &str) -> Result<[T; 3]> {
    let err = || FlowError::ParseValue {
        key,
        value: text.to_string(),
    };
    let mut parts = text.split_whitespace().map(|p| p.parse::<T>().map_err(|_| err()));
    let a = parts.next().ok_or_else(err)??;
    let b = parts.next().ok_or_else(err)??;
    let c = parts.next().ok_or_else(err)??;
    Ok([a, b, c])
}

/// Write a triple the way it appears in the text headers.
pub fn format_triple<T: fmt::Display>(v: &[T; 3]) -> String {
    format!("{} {} {}", v[0], v[1], v[2])
}

/// Round to six decimals past the first significant digit.
pub fn round_auto(value: f64) -> f64 {
    if value == 0. || !value.is_finite() {
        return value;
    }
    let digits = (-value.abs().log10()).ceil() as i32 + 6;
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Build an output path next to `input`, replacing its extension with
/// `suffix` (which includes the extension, e.g. `"_X.nii.gz"` or `".fld"`).
pub fn sibling_path<P: AsRef<Path>>(input: P, suffix: &str) -> PathBuf {
    let input = input.as_ref();
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", stem, suffix))
}

/// Base name of a file without directory and extension.
pub fn base_name<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
