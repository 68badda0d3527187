use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid status filter '{value}', expected digits, '*' or '?'")]
    InvalidStatusPattern { value: String },

    #[error("invalid size filter '{value}', expected digits, '*' or '?'")]
    InvalidSizePattern { value: String },

    #[error("invalid minimum size '{value}', the first size filter must be a plain number")]
    InvalidMinSize { value: String },
}

fn is_filter_syntax(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || c == '*' || c == '?')
}

// `*` matches any run of digits, `?` an optional digit. The regex is anchored
// at the start only, so "20" also matches "200" and "201".
fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(r"\d*"),
            '?' => out.push_str(r"\d?"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Clone, Debug)]
pub struct StatusPattern {
    raw: String,
    re: Regex,
}

impl StatusPattern {
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let raw = raw.trim();
        if !is_filter_syntax(raw) {
            return Err(FilterError::InvalidStatusPattern {
                value: raw.to_string(),
            });
        }
        let re = Regex::new(&wildcard_to_regex(raw)).map_err(|_| {
            FilterError::InvalidStatusPattern {
                value: raw.to_string(),
            }
        })?;
        Ok(Self {
            raw: raw.to_string(),
            re,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, status: u16) -> bool {
        self.re.is_match(&status.to_string())
    }
}

/// Status and size filters applied to every 200 response.
///
/// Only the first size entry is used, as an inclusive lower bound on the body
/// length in bytes. Later entries are syntax-checked and then ignored.
#[derive(Clone, Debug, Default)]
pub struct FilterSpec {
    status: Vec<StatusPattern>,
    min_size: Option<usize>,
    ignored_sizes: Vec<String>,
}

impl FilterSpec {
    pub fn parse<S: AsRef<str>>(status: &[S], size: &[S]) -> Result<Self, FilterError> {
        let status = status
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .map(StatusPattern::parse)
            .collect::<Result<Vec<_>, _>>()?;

        let sizes: Vec<&str> = size
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .collect();
        for s in sizes.iter() {
            if !is_filter_syntax(s) {
                return Err(FilterError::InvalidSizePattern {
                    value: s.to_string(),
                });
            }
        }
        let min_size = match sizes.first() {
            Some(first) => Some(first.parse::<usize>().map_err(|_| {
                FilterError::InvalidMinSize {
                    value: first.to_string(),
                }
            })?),
            None => None,
        };
        let ignored_sizes = sizes.iter().skip(1).map(|s| s.to_string()).collect();

        Ok(Self {
            status,
            min_size,
            ignored_sizes,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_empty() && self.min_size.is_none()
    }

    pub fn status_patterns(&self) -> &[StatusPattern] {
        &self.status
    }

    pub fn min_size(&self) -> Option<usize> {
        self.min_size
    }

    pub fn ignored_sizes(&self) -> &[String] {
        &self.ignored_sizes
    }

    pub fn passes(&self, status: u16, size: usize) -> bool {
        if self.is_empty() {
            return true;
        }
        let status_pass = self.status.is_empty() || self.status.iter().any(|p| p.matches(status));
        let size_pass = self.min_size.map_or(true, |min| size >= min);
        status_pass && size_pass
    }

    pub fn summary(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();
        if !self.status.is_empty() {
            let raw: Vec<&str> = self.status.iter().map(|p| p.as_str()).collect();
            parts.push(format!("status={}", raw.join(",")));
        }
        if let Some(min) = self.min_size {
            parts.push(format!("size>={}", min));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Splits a comma-separated filter list, dropping blank entries.
pub fn split_filter_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
