use crate::batch::SortKey;
use crate::change::{split_extension, Change};
use crate::error::{RebatchError, Result};
use crate::sort::file_time;
use chrono::{DateTime, Local};
use regex::{Captures, Regex};
use std::fs;
use std::sync::OnceLock;

/// Expands `{{...}}` tokens in an intermediate target name.
///
/// Implementations return the fully expanded string, or an error naming the
/// offending token when it is unknown or malformed.
pub trait VariableExpander {
    fn expand(&self, input: &str, change: &Change) -> Result<String>;
}

/// Leaves names untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVariables;

impl VariableExpander for NoVariables {
    fn expand(&self, input: &str, _change: &Change) -> Result<String> {
        Ok(input.to_string())
    }
}

/// Name and date tokens:
///
/// - `{{f}}` file name without extension
/// - `{{ext}}` extension including the dot
/// - `{{p}}` name of the parent directory
/// - `{{mtime.U}}`, `{{atime.U}}`, `{{btime.U}}`, `{{ctime.U}}`, `{{now.U}}`
///   where `U` is one of `YYYY YY MMMM MMM MM DDDD DDD DD H hh mm ss A`
#[derive(Debug, Clone)]
pub struct BuiltinVariables {
    now: DateTime<Local>,
}

impl Default for BuiltinVariables {
    fn default() -> Self {
        Self::new(Local::now())
    }
}

impl BuiltinVariables {
    pub fn new(now: DateTime<Local>) -> Self {
        Self { now }
    }

    fn resolve(&self, body: &str, change: &Change) -> Result<String> {
        let (stem, ext) = split_extension(change.file_name());
        match body {
            "f" => return Ok(stem.to_string()),
            "ext" => return Ok(ext.to_string()),
            "p" => {
                let parent = change
                    .source_key()
                    .parent()
                    .and_then(|p| p.file_name())
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                return Ok(parent);
            },
            _ => {},
        }

        let Some((source, unit)) = body.split_once('.') else {
            return Err(unknown(body, "unknown variable"));
        };
        let format = date_format(unit).ok_or_else(|| unknown(body, "unknown date unit"))?;

        let time = if source == "now" {
            self.now
        } else {
            let key = match source.parse::<SortKey>() {
                Ok(SortKey::Size) | Err(_) => {
                    return Err(unknown(body, "unknown time attribute"));
                },
                Ok(key) => key,
            };
            let path = change.source_path();
            let metadata = fs::metadata(&path).map_err(|source| RebatchError::Metadata {
                path: path.clone(),
                source,
            })?;
            DateTime::<Local>::from(file_time(&metadata, key))
        };

        Ok(time.format(format).to_string())
    }
}

impl VariableExpander for BuiltinVariables {
    fn expand(&self, input: &str, change: &Change) -> Result<String> {
        let mut failure = None;
        let expanded = token_regex().replace_all(input, |caps: &Captures| {
            match self.resolve(caps[1].trim(), change) {
                Ok(value) => value,
                Err(e) => {
                    failure.get_or_insert(e);
                    String::new()
                },
            }
        });

        if let Some(e) = failure {
            return Err(e);
        }
        if let Some(idx) = expanded.find("{{") {
            return Err(RebatchError::Variable {
                token: expanded[idx..].to_string(),
                reason: "unterminated variable".to_string(),
            });
        }

        Ok(expanded.into_owned())
    }
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\{\{([^{}]*)\}\}").unwrap())
}

fn date_format(unit: &str) -> Option<&'static str> {
    let format = match unit {
        "YYYY" => "%Y",
        "YY" => "%y",
        "MMMM" => "%B",
        "MMM" => "%b",
        "MM" => "%m",
        "DDDD" => "%A",
        "DDD" => "%a",
        "DD" => "%d",
        "H" => "%H",
        "hh" => "%I",
        "mm" => "%M",
        "ss" => "%S",
        "A" => "%p",
        _ => return None,
    };
    Some(format)
}

fn unknown(body: &str, reason: &str) -> RebatchError {
    RebatchError::Variable {
        token: format!("{{{{{}}}}}", body),
        reason: reason.to_string(),
    }
}
