//! Parsing lists given on the command line, e.g. `--pixels "(10, 20) (3,4)"`
//! or `--ids 1,2,3`.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref RE_PIXEL: Regex =
        Regex::new(r"\(\s*([-+]?\d*\.?\d+)\s*,\s*([-+]?\d*\.?\d+)\s*\)").unwrap();
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseListError {
    #[error("No values were found in '{0}'")]
    Empty(String),

    #[error("Couldn't parse '{value}' in '{input}' as {expected}")]
    BadValue {
        input: String,
        value: String,
        expected: &'static str,
    },
}

/// Parse every `(x, y)` pair in `s` as pixel coordinates. Anything between the
/// pairs is ignored.
pub fn parse_pixels(s: &str) -> Result<Vec<(usize, usize)>, ParseListError> {
    let pixels = RE_PIXEL
        .captures_iter(s)
        .map(|caps| {
            let coord = |i: usize| {
                caps[i].parse::<usize>().map_err(|_| ParseListError::BadValue {
                    input: s.to_string(),
                    value: caps[i].to_string(),
                    expected: "a non-negative integer pixel coordinate",
                })
            };
            Ok((coord(1)?, coord(2)?))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if pixels.is_empty() {
        return Err(ParseListError::Empty(s.to_string()));
    }
    Ok(pixels)
}

fn parse_comma_list<T: FromStr>(s: &str, expected: &'static str) -> Result<Vec<T>, ParseListError> {
    if s.trim().is_empty() {
        return Err(ParseListError::Empty(s.to_string()));
    }
    s.split(',')
        .map(|v| {
            let v = v.trim();
            v.parse().map_err(|_| ParseListError::BadValue {
                input: s.to_string(),
                value: v.to_string(),
                expected,
            })
        })
        .collect()
}

/// Parse e.g. `138,169`.
pub fn parse_float_list(s: &str) -> Result<Vec<f64>, ParseListError> {
    parse_comma_list(s, "a float")
}

/// Parse e.g. `1,2,3` as candidate IDs or DM-trial indices.
pub fn parse_index_list(s: &str) -> Result<Vec<usize>, ParseListError> {
    parse_comma_list(s, "a non-negative integer")
}
