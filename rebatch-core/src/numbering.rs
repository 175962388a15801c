//! Sequential numbering tokens.
//!
//! A token looks like `[start]%[width]d[system][step]`:
//!
//! | token      | meaning                                   |
//! |------------|-------------------------------------------|
//! | `%d`       | 1, 2, 3 ... (from the configured start)   |
//! | `%03d`     | 001, 002, 003 ...                         |
//! | `10%d`     | 10, 11, 12 ...                            |
//! | `%d2`      | 1, 3, 5 ...                               |
//! | `%dr`      | I, II, III ... (Roman)                    |
//! | `%da`/`%dA`| a, b ... z, aa ... (alphabetic)           |
//! | `%04db`    | binary, `o` octal, `h` hex                |

use crate::conflict::MAX_SEGMENT_LEN;
use crate::error::{RebatchError, Result};
use regex::{Captures, Regex};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumeralSystem {
    Decimal,
    Binary,
    Octal,
    Hex,
    Roman,
    AlphaLower,
    AlphaUpper,
}

impl NumeralSystem {
    fn from_selector(selector: Option<&str>) -> Self {
        match selector {
            Some("b") => Self::Binary,
            Some("o") => Self::Octal,
            Some("h") => Self::Hex,
            Some("r") => Self::Roman,
            Some("a") => Self::AlphaLower,
            Some("A") => Self::AlphaUpper,
            _ => Self::Decimal,
        }
    }
}

/// One parsed numbering token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingToken {
    pub start: Option<i64>,
    pub width: usize,
    pub system: NumeralSystem,
    pub step: i64,
}

impl NumberingToken {
    /// Value for the candidate at position `index` in processing order
    pub fn value(&self, default_start: i64, index: usize) -> Option<i64> {
        let index = i64::try_from(index).ok()?;
        self.start
            .unwrap_or(default_start)
            .checked_add(index.checked_mul(self.step)?)
    }

    pub fn render(&self, value: i64) -> std::result::Result<String, String> {
        let width = self.width;
        match self.system {
            NumeralSystem::Decimal => Ok(format!("{:0width$}", value)),
            NumeralSystem::Binary => non_negative(value).map(|v| format!("{:0width$b}", v)),
            NumeralSystem::Octal => non_negative(value).map(|v| format!("{:0width$o}", v)),
            NumeralSystem::Hex => non_negative(value).map(|v| format!("{:0width$x}", v)),
            NumeralSystem::Roman => to_roman(value),
            NumeralSystem::AlphaLower => to_alphabetic(value),
            NumeralSystem::AlphaUpper => to_alphabetic(value).map(|s| s.to_uppercase()),
        }
    }
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"(\d+)?%(\d*)d([borhaA])?(\d+)?").unwrap())
}

/// True when `name` contains at least one numbering token
pub fn has_numbering(name: &str) -> bool {
    token_regex().is_match(name)
}

/// Parse the token matched by `caps`
fn parse_token(caps: &Captures) -> Result<NumberingToken> {
    let whole = &caps[0];
    let invalid = |reason: &str| RebatchError::InvalidNumbering {
        token: whole.to_string(),
        reason: reason.to_string(),
    };

    let start = caps
        .get(1)
        .map(|m| m.as_str().parse::<i64>())
        .transpose()
        .map_err(|_| invalid("start value out of range"))?;
    let width = match caps.get(2).map(|m| m.as_str()) {
        None | Some("") => 0,
        Some(digits) => digits
            .parse::<usize>()
            .map_err(|_| invalid("width out of range"))?,
    };
    // A padded number wider than a path segment can never be a valid name
    if width > MAX_SEGMENT_LEN {
        return Err(invalid("width exceeds the maximum filename length"));
    }
    let step = match caps.get(4) {
        None => 1,
        Some(m) => m
            .as_str()
            .parse::<i64>()
            .map_err(|_| invalid("step out of range"))?,
    };
    if step < 1 {
        return Err(invalid("step must be at least 1"));
    }

    Ok(NumberingToken {
        start,
        width,
        system: NumeralSystem::from_selector(caps.get(3).map(|m| m.as_str())),
        step,
    })
}

/// Replace every numbering token in `name` with the value for the
/// candidate at `index`.
pub fn expand_numbering(name: &str, default_start: i64, index: usize) -> Result<String> {
    let mut failure = None;
    let expanded = token_regex().replace_all(name, |caps: &Captures| {
        let rendered = parse_token(caps).and_then(|token| {
            let value = token
                .value(default_start, index)
                .ok_or_else(|| RebatchError::InvalidNumbering {
                    token: caps[0].to_string(),
                    reason: "value out of range".to_string(),
                })?;
            token
                .render(value)
                .map_err(|reason| RebatchError::InvalidNumbering {
                    token: caps[0].to_string(),
                    reason,
                })
        });
        match rendered {
            Ok(text) => text,
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            },
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(expanded.into_owned()),
    }
}

fn non_negative(value: i64) -> std::result::Result<u64, String> {
    u64::try_from(value).map_err(|_| format!("{} cannot be rendered in this numeral system", value))
}

fn to_roman(value: i64) -> std::result::Result<String, String> {
    const NUMERALS: &[(i64, &str)] = &[
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];

    if !(1..=3999).contains(&value) {
        return Err(format!("{} has no Roman numeral form (1-3999)", value));
    }

    let mut remaining = value;
    let mut out = String::new();
    for &(amount, numeral) in NUMERALS {
        while remaining >= amount {
            out.push_str(numeral);
            remaining -= amount;
        }
    }
    Ok(out)
}

/// Bijective base-26: 1 -> a, 26 -> z, 27 -> aa
fn to_alphabetic(value: i64) -> std::result::Result<String, String> {
    if value < 1 {
        return Err(format!("{} has no alphabetic form (must be at least 1)", value));
    }

    let mut remaining = value;
    let mut letters = Vec::new();
    while remaining > 0 {
        remaining -= 1;
        let digit = u8::try_from(remaining % 26).unwrap_or(0);
        letters.push(char::from(b'a' + digit));
        remaining /= 26;
    }
    Ok(letters.iter().rev().collect())
}
