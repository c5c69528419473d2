//! Observation metadata from the MWA All-Sky Virtual Observatory (ASVO), and
//! the summaries used to plan which observations to keep.

mod error;
#[cfg(test)]
mod tests;
mod votable;

pub use error::ObsMetadataError;
pub use votable::{parse_asvo_xml, read_asvo_xml};

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
};

use indexmap::IndexMap;
use log::debug;

/// A single cell of an observation table.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl MetaValue {
    /// All-digit text is an integer, otherwise a float if it parses as one,
    /// otherwise text. Missing text is [`MetaValue::Null`].
    pub fn parse(text: Option<&str>) -> MetaValue {
        let text = match text {
            None => return MetaValue::Null,
            Some(t) => t,
        };
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(i) = text.parse() {
                return MetaValue::Int(i);
            }
        }
        match text.parse() {
            Ok(f) => MetaValue::Float(f),
            Err(_) => MetaValue::Str(text.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Int(i) => Some(*i as f64),
            MetaValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl Display for MetaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaValue::Int(i) => write!(f, "{i}"),
            MetaValue::Float(v) => write!(f, "{v}"),
            MetaValue::Str(s) => write!(f, "{s}"),
            MetaValue::Null => write!(f, "-"),
        }
    }
}

/// One row of an ASVO search result, with its columns in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub fields: IndexMap<String, MetaValue>,
}

impl Observation {
    pub fn get(&self, field: &str) -> Option<&MetaValue> {
        self.fields.get(field)
    }

    fn label(&self) -> String {
        self.get("obs_id")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    fn required(&self, field: &'static str) -> Result<&MetaValue, ObsMetadataError> {
        match self.get(field) {
            None | Some(MetaValue::Null) => Err(ObsMetadataError::MissingField {
                obs: self.label(),
                field,
            }),
            Some(v) => Ok(v),
        }
    }

    fn number(&self, field: &'static str) -> Result<f64, ObsMetadataError> {
        self.required(field)?
            .as_f64()
            .ok_or_else(|| ObsMetadataError::WrongType {
                obs: self.label(),
                field,
                expected: "numeric",
            })
    }

    pub fn obs_id(&self) -> Result<i64, ObsMetadataError> {
        self.required("obs_id")?
            .as_i64()
            .ok_or_else(|| ObsMetadataError::WrongType {
                obs: self.label(),
                field: "obs_id",
                expected: "integer",
            })
    }

    /// The project code, e.g. "G0057". Numeric codes are rendered as text.
    pub fn project_id(&self) -> Result<String, ObsMetadataError> {
        self.required("projectid").map(|v| v.to_string())
    }

    pub fn centre_freq_mhz(&self) -> Result<f64, ObsMetadataError> {
        self.number("center_frequency_mhz")
    }

    /// \[s\]
    pub fn duration_s(&self) -> Result<f64, ObsMetadataError> {
        self.number("duration")
    }

    pub fn archived_bytes(&self) -> Result<f64, ObsMetadataError> {
        self.number("total_archived_data_bytes")
    }

    fn text(&self, field: &str) -> String {
        self.get(field)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// A centre frequency \[MHz\] usable as a map key. Ordered by
/// [`f64::total_cmp`].
#[derive(Debug, Clone, Copy)]
pub struct FreqKey(pub f64);

impl PartialEq for FreqKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FreqKey {}

impl PartialOrd for FreqKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FreqKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Display for FreqKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The number of observations of each (project, centre frequency).
pub fn project_frequency_counts(
    observations: &[Observation],
) -> Result<BTreeMap<(String, FreqKey), usize>, ObsMetadataError> {
    let mut counts = BTreeMap::new();
    for obs in observations {
        let key = (obs.project_id()?, FreqKey(obs.centre_freq_mhz()?));
        *counts.entry(key).or_insert(0) += 1;
    }
    Ok(counts)
}

/// The number of observations of each (centre frequency, project).
pub fn frequency_project_counts(
    observations: &[Observation],
) -> Result<BTreeMap<(FreqKey, String), usize>, ObsMetadataError> {
    Ok(project_frequency_counts(observations)?
        .into_iter()
        .map(|((project, freq), count)| ((freq, project), count))
        .collect())
}

pub fn total_duration_hours(observations: &[Observation]) -> Result<f64, ObsMetadataError> {
    let mut total_s = 0.0;
    for obs in observations {
        total_s += obs.duration_s()?;
    }
    Ok(total_s / 3600.0)
}

/// Which observations of a project are worth keeping.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionCriteria {
    pub project_id: String,

    /// \[MHz\]
    pub min_freq_mhz: f64,

    /// \[s\]
    pub min_duration_s: f64,
}

impl SelectionCriteria {
    pub const DEFAULT_MIN_FREQ_MHZ: f64 = 180.0;
    pub const DEFAULT_MIN_DURATION_S: f64 = 1200.0;

    pub fn new(project_id: &str) -> SelectionCriteria {
        SelectionCriteria {
            project_id: project_id.to_string(),
            min_freq_mhz: Self::DEFAULT_MIN_FREQ_MHZ,
            min_duration_s: Self::DEFAULT_MIN_DURATION_S,
        }
    }
}

/// An observation passing the criteria, together with its calibrator.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedObservation {
    pub obs_id: i64,
    pub start_time: String,
    pub array_config: String,
    pub centre_freq_mhz: f64,
    pub duration_s: f64,
    pub terabytes: f64,
    pub calibrator_id: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub selected: Vec<SelectedObservation>,

    /// The archived volume \[TB\] of every observation passing the criteria,
    /// including those without a calibrator.
    pub total_terabytes: f64,

    /// The selected observations and their calibrators.
    pub obs_to_keep: BTreeSet<i64>,
}

/// The ID of the first calibrator observed at `freq_mhz` at or after
/// `obs_id`. `calibrators` (ID, frequency) must be sorted by ID.
fn find_calibrator(obs_id: i64, freq_mhz: f64, calibrators: &[(i64, f64)]) -> Option<i64> {
    let start = calibrators.partition_point(|&(id, _)| id < obs_id);
    calibrators[start..]
        .iter()
        .find(|&&(_, f)| f == freq_mhz)
        .map(|&(id, _)| id)
}

pub fn select_observations(
    observations: &[Observation],
    calibrators: &[Observation],
    criteria: &SelectionCriteria,
) -> Result<Selection, ObsMetadataError> {
    let mut cals = calibrators
        .iter()
        .map(|c| Ok((c.obs_id()?, c.centre_freq_mhz()?)))
        .collect::<Result<Vec<_>, ObsMetadataError>>()?;
    cals.sort_by_key(|&(id, _)| id);

    let mut selection = Selection::default();
    for obs in observations {
        if obs.project_id()? != criteria.project_id {
            continue;
        }
        let freq = obs.centre_freq_mhz()?;
        let duration = obs.duration_s()?;
        if freq < criteria.min_freq_mhz || duration < criteria.min_duration_s {
            continue;
        }
        let obs_id = obs.obs_id()?;
        let terabytes = obs.archived_bytes()? / 1e12;
        selection.total_terabytes += terabytes;

        let cal_id = match find_calibrator(obs_id, freq, &cals) {
            Some(c) => c,
            None => {
                debug!("No calibrator found for {obs_id} at {freq} MHz");
                continue;
            }
        };
        selection.obs_to_keep.insert(obs_id);
        selection.obs_to_keep.insert(cal_id);
        selection.selected.push(SelectedObservation {
            obs_id,
            start_time: obs.text("starttime_utc"),
            array_config: obs.text("mwa_array_configuration"),
            centre_freq_mhz: freq,
            duration_s: duration,
            terabytes,
            calibrator_id: cal_id,
        });
    }
    Ok(selection)
}
