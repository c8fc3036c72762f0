//! Optional TOML overrides for the compiled-in SA constants. An absent file,
//! or an absent field within one, is equivalent to the defaults in
//! `solver.rs`.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::{Error, Result};
use crate::solver::{ScheduleEntry, SolverParams, DEFAULT_SCHEDULE};

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ScheduleRowConfig {
    pub threshold: f64,
    pub max_iter: u32,
    pub alpha: f64,
}

impl From<ScheduleRowConfig> for ScheduleEntry {
    fn from(row: ScheduleRowConfig) -> Self {
        ScheduleEntry {
            threshold: row.threshold,
            max_iter: row.max_iter,
            alpha: row.alpha,
        }
    }
}

/// Every field optional. A present `schedule` replaces the whole six-row
/// cooling table at once; there is no sensible way to merge a single
/// overridden row into an ordered threshold table, so partial overrides
/// aren't supported.
#[derive(Debug, Deserialize, Default)]
pub struct RunConfig {
    pub t_initial: Option<f64>,
    pub t_final: Option<f64>,
    pub reheat_factor: Option<f64>,
    pub reheat_reset_fraction: Option<f64>,
    pub stagnation_cap: Option<u32>,
    pub delta_amplification: Option<i64>,
    pub schedule: Option<Vec<ScheduleRowConfig>>,
}

impl RunConfig {
    pub fn read_from_toml(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|io_error| {
            Box::new(Error::FailedToReadConfig {
                path: path.display().to_string(),
                io_error,
            })
        })?;

        toml::from_str(&text).map_err(|source| {
            Box::new(Error::BadConfig {
                path: path.display().to_string(),
                source,
            })
        })
    }

    /// Merges `self` onto the compiled-in defaults, returning a ready-to-use
    /// `SolverParams` and schedule table. The RNG seed lives outside
    /// `SolverParams` entirely: `main.rs` seeds one process-wide
    /// `fastrand::Rng` from `--seed` and threads it through both phases.
    pub fn apply(&self) -> (SolverParams, Vec<ScheduleEntry>) {
        let defaults = SolverParams::default();

        let params = SolverParams {
            t_initial: self.t_initial.unwrap_or(defaults.t_initial),
            t_final: self.t_final.unwrap_or(defaults.t_final),
            reheat_factor: self.reheat_factor.unwrap_or(defaults.reheat_factor),
            reheat_reset_fraction: self
                .reheat_reset_fraction
                .unwrap_or(defaults.reheat_reset_fraction),
            stagnation_cap: self.stagnation_cap.unwrap_or(defaults.stagnation_cap),
            delta_amplification: self
                .delta_amplification
                .unwrap_or(defaults.delta_amplification),
        };

        let schedule = match &self.schedule {
            Some(rows) if !rows.is_empty() => rows.iter().copied().map(ScheduleEntry::from).collect(),
            _ => DEFAULT_SCHEDULE.to_vec(),
        };

        (params, schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_reproduces_compiled_in_defaults() {
        let config = RunConfig::default();
        let (params, schedule) = config.apply();

        assert_eq!(params.t_initial, SolverParams::default().t_initial);
        assert_eq!(schedule.len(), DEFAULT_SCHEDULE.len());
        assert_eq!(schedule[0].max_iter, DEFAULT_SCHEDULE[0].max_iter);
    }

    #[test]
    fn partial_override_only_changes_named_fields() {
        let config = RunConfig {
            stagnation_cap: Some(123),
            ..RunConfig::default()
        };
        let (params, _schedule) = config.apply();

        assert_eq!(params.stagnation_cap, 123);
        assert_eq!(params.t_final, SolverParams::default().t_final);
    }

    #[test]
    fn schedule_override_replaces_the_whole_table() {
        let config = RunConfig {
            schedule: Some(vec![ScheduleRowConfig {
                threshold: f64::NEG_INFINITY,
                max_iter: 10,
                alpha: 0.5,
            }]),
            ..RunConfig::default()
        };
        let (_params, schedule) = config.apply();

        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].max_iter, 10);
    }
}
