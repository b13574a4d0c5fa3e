//! Structured query grammar.
//!
//! Whitespace-separated tokens. `key:value` filters are recognized for
//! `type`, `status`, `priority`, and `tag`; `key:from..to` ranges for
//! `date`, `created`, and `updated`; quoted values (`tag:"needs triage"`)
//! keep their spaces. Everything else is free text. The grammar is
//! forgiving: a token that fails to parse falls back to free text.

use chrono::{DateTime, Days, NaiveDate, Utc};

/// Half-open range `[from, to)`; either bound may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Parsed query: structured filters AND across keys, OR within a key;
/// free-text tokens AND together.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ParsedQuery {
    pub types: Vec<String>,
    pub statuses: Vec<String>,
    pub priorities: Vec<String>,
    pub tags: Vec<String>,
    pub date: Vec<DateRange>,
    pub created: Vec<DateRange>,
    pub updated: Vec<DateRange>,
    pub text: Vec<String>,
}

pub(crate) fn parse_query(input: &str) -> ParsedQuery {
    let mut query = ParsedQuery::default();
    for token in split_tokens(input) {
        match token.split_once(':') {
            Some((key, value)) if !value.is_empty() => {
                let value = unquote(value);
                match key {
                    "type" => query.types.push(value),
                    "status" => query.statuses.push(value),
                    "priority" => query.priorities.push(value),
                    "tag" => query.tags.push(value),
                    "date" | "created" | "updated" => match parse_range(&value) {
                        Some(range) => match key {
                            "date" => query.date.push(range),
                            "created" => query.created.push(range),
                            _ => query.updated.push(range),
                        },
                        None => query.text.push(unquote(&token)),
                    },
                    _ => query.text.push(unquote(&token)),
                }
            }
            _ => {
                let text = unquote(&token);
                if !text.is_empty() {
                    query.text.push(text);
                }
            }
        }
    }
    query
}

/// Split on whitespace outside double quotes; quotes are preserved for
/// [`unquote`] to strip later.
fn split_tokens(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse `from..to` (either side optional) or a single date literal, which
/// covers the whole day.
fn parse_range(value: &str) -> Option<DateRange> {
    if let Some((from, to)) = value.split_once("..") {
        let from = if from.is_empty() {
            None
        } else {
            Some(parse_bound(from, false)?)
        };
        let to = if to.is_empty() {
            None
        } else {
            Some(parse_bound(to, true)?)
        };
        if from.is_none() && to.is_none() {
            return None;
        }
        Some(DateRange { from, to })
    } else {
        Some(DateRange {
            from: Some(parse_bound(value, false)?),
            to: Some(parse_bound(value, true)?),
        })
    }
}

/// ISO-8601 literal: full datetime or `YYYY-MM-DD`. A date-only `to` bound
/// advances one day so the range stays inclusive of that date.
fn parse_bound(s: &str, end: bool) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let date = if end { date.checked_add_days(Days::new(1))? } else { date };
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}
