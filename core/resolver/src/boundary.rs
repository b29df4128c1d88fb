//! Exact arithmetic for `range` and `length` restrictions.

use core::fmt;
use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
};

use yangkit_schema::statement::StatementId;

use crate::errors::ResolveError;

/// A decimal number held as `mantissa * 10^-scale`.
#[derive(Debug, Clone, Copy)]
pub struct Number {
    mantissa: i128,
    scale: u32,
}

impl Number {
    #[must_use]
    pub fn new(mantissa: i128, scale: u32) -> Self {
        Self { mantissa, scale }
    }

    #[must_use]
    pub fn integer(value: i128) -> Self {
        Self::new(value, 0)
    }

    /// Parses an optionally signed integer or decimal literal.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty()
            || !whole.bytes().all(|byte| byte.is_ascii_digit())
            || !fraction.bytes().all(|byte| byte.is_ascii_digit())
            || (digits.contains('.') && fraction.is_empty())
        {
            return None;
        }
        let scale = u32::try_from(fraction.len()).ok()?;
        let mantissa: i128 = format!("{whole}{fraction}").parse().ok()?;
        Some(Self::new(if negative { -mantissa } else { mantissa }, scale))
    }

    fn rescaled(self, scale: u32) -> Option<i128> {
        10_i128
            .checked_pow(scale - self.scale)
            .and_then(|factor| self.mantissa.checked_mul(factor))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        match (self.rescaled(scale), other.rescaled(scale)) {
            (Some(a), Some(b)) => a.cmp(&b),
            // Only reachable for magnitudes far outside any YANG type.
            _ => self.mantissa.signum().cmp(&other.mantissa.signum()),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let digits = self.mantissa.unsigned_abs().to_string();
        let scale = self.scale as usize;
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (whole, fraction) = padded.split_at(padded.len() - scale);
        let sign = if self.mantissa < 0 { "-" } else { "" };
        write!(f, "{sign}{whole}.{fraction}")
    }
}

/// One `lower..upper` pair of a restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub lower: Number,
    pub upper: Number,
}

impl Boundary {
    #[must_use]
    pub fn contains(&self, other: &Boundary) -> bool {
        self.lower <= other.lower && self.upper >= other.upper
    }
}

impl Display for Boundary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.lower == self.upper {
            write!(f, "{}", self.lower)
        } else {
            write!(f, "{}..{}", self.lower, self.upper)
        }
    }
}

/// The lowest and highest value the keywords `min` and `max` stand for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: Number,
    pub max: Number,
}

impl Limits {
    /// Limits of a `length` restriction.
    #[must_use]
    pub fn length() -> Self {
        Self {
            min: Number::integer(0),
            max: Number::integer(i128::from(u64::MAX)),
        }
    }
}

/// Parses `"a..b | c"` into boundary pairs.
///
/// # Errors
///
/// Returns [`ResolveError::MalformedBoundary`] on empty parts, dangling `|`
/// or `..`, and values that are neither numbers nor `min`/`max`.
pub fn parse_boundaries(
    expression: &str,
    limits: Limits,
    statement: StatementId,
) -> Result<Vec<Boundary>, ResolveError> {
    let malformed = || ResolveError::MalformedBoundary {
        expression: expression.to_string(),
        statement,
    };
    let value = |text: &str| match text.trim() {
        "min" => Some(limits.min),
        "max" => Some(limits.max),
        other => Number::parse(other),
    };

    let mut boundaries = Vec::new();
    for part in expression.split('|') {
        let part = part.trim();
        if part.is_empty() {
            return Err(malformed());
        }
        let boundary = match part.split_once("..") {
            Some((lower, upper)) => {
                if lower.trim().is_empty() || upper.trim().is_empty() || upper.contains("..") {
                    return Err(malformed());
                }
                Boundary {
                    lower: value(lower).ok_or_else(malformed)?,
                    upper: value(upper).ok_or_else(malformed)?,
                }
            }
            None => {
                let single = value(part).ok_or_else(malformed)?;
                Boundary {
                    lower: single,
                    upper: single,
                }
            }
        };
        boundaries.push(boundary);
    }
    Ok(boundaries)
}

/// Whether `restriction` lies entirely inside a single pair of `base`.
#[must_use]
pub fn fits(restriction: &Boundary, base: &[Boundary]) -> bool {
    base.iter().any(|allowed| allowed.contains(restriction))
}
