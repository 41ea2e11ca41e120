//! Scenario files: one orbitope constraint plus the fixings of one node
//!
//! Each entry of `rows` is a matrix row, one character per column: `0` and
//! `1` are fixings, anything else is free. Variables are numbered row-major.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::bounds::{Fixing, NodeFixings, VarMapping, VarRef};
use crate::config::Config;
use crate::detectors::{
    colorcomp, include_default_handlers, makespan, suborbitope, ComponentParams,
    ComponentStrategy, MakespanParams, PatternParams,
};
use crate::error;
use crate::handler::HandlerRegistry;
use crate::payload::ConstraintId;
use crate::submatrix::SubmatrixList;

/// Constraint id a scenario payload is registered under.
pub const SCENARIO_CONS: ConstraintId = ConstraintId(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Component,
    Makespan,
    Pattern,
}

impl DetectorKind {
    pub fn handler_name(&self) -> &'static str {
        match self {
            DetectorKind::Component => colorcomp::NAME,
            DetectorKind::Makespan => makespan::NAME,
            DetectorKind::Pattern => suborbitope::NAME,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub detector: DetectorKind,
    pub rows: Vec<String>,
    #[serde(default)]
    pub adjacency: Vec<Vec<usize>>,
    #[serde(default)]
    pub durations: Vec<u64>,
    pub all_color_pairs: Option<bool>,
    pub strategy: Option<ComponentStrategy>,
    pub zero_height: Option<usize>,
    pub one_height: Option<usize>,
}

impl Scenario {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read scenario from {:?}", path.as_ref()))?;
        let scenario: Scenario = toml::from_str(&content)
            .context("Failed to parse scenario TOML")?;
        Ok(scenario)
    }

    pub fn nvars(&self) -> usize {
        self.rows.iter().map(|row| row.chars().count()).sum()
    }

    /// Variable handles laid out like `rows`.
    pub fn matrix(&self) -> Vec<Vec<VarRef>> {
        let mut next = 0;
        self.rows
            .iter()
            .map(|row| {
                row.chars()
                    .map(|_| {
                        next += 1;
                        VarRef(next - 1)
                    })
                    .collect()
            })
            .collect()
    }

    pub fn fixings(&self) -> NodeFixings {
        NodeFixings::from_fixings(
            self.rows
                .iter()
                .flat_map(|row| row.chars().map(Fixing::from_char))
                .collect(),
        )
    }

    /// Register the scenario's constraint with the matching handler.
    ///
    /// Settings missing from the scenario come from `config`.
    pub fn register(
        &self,
        registry: &mut HandlerRegistry,
        cons: ConstraintId,
        config: &Config,
    ) -> error::Result<()> {
        let matrix = self.matrix();
        match self.detector {
            DetectorKind::Component => colorcomp::register_cons(
                registry,
                cons,
                &ComponentParams {
                    matrix: &matrix,
                    adjacency: &self.adjacency,
                    all_color_pairs: self
                        .all_color_pairs
                        .unwrap_or(config.colorcomp.all_color_pairs),
                    strategy: self.strategy.unwrap_or(config.colorcomp.strategy),
                },
            ),
            DetectorKind::Makespan => makespan::register_cons(
                registry,
                cons,
                &MakespanParams {
                    matrix: &matrix,
                    job_durations: &self.durations,
                },
            ),
            DetectorKind::Pattern => suborbitope::register_cons(
                registry,
                cons,
                &PatternParams {
                    matrix: &matrix,
                    zero_height: self.zero_height.unwrap_or(config.suborbitope.zero_height),
                    one_height: self.one_height.unwrap_or(config.suborbitope.one_height),
                },
            ),
        }
    }

    /// Full handler lifecycle for a single query: include, register,
    /// transform, query, shut down.
    pub fn run(&self, config: &Config) -> Result<SubmatrixList> {
        let name = self.detector.handler_name();
        let mut registry = HandlerRegistry::new();
        include_default_handlers(&mut registry, &config.handlers)
            .context("Failed to include activation handlers")?;

        self.register(&mut registry, SCENARIO_CONS, config)
            .with_context(|| format!("Failed to register scenario with <{}>", name))?;
        registry
            .init_all(Arc::new(VarMapping::identity(self.nvars())))
            .context("Failed to initialize activation handlers")?;

        let result = registry.find_activation_data(name, SCENARIO_CONS, &self.fixings())?;
        info!("Handler <{}> reported {} submatrices", name, result.len());

        registry.shutdown()?;
        Ok(result)
    }
}
