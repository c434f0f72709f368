// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register simulation configuration
//!
//! The simulation task periodically writes a batch of random values into one
//! of the register banks, so clients always have live data to poll. The
//! defaults reproduce the original deployment: three holding registers at
//! address 0, refreshed every second with values between 1 and 100.

use serde::{Deserialize, Serialize};

/// The register bank targeted by the simulation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulatedBank {
    DiscreteInputs,
    Coils,
    InputRegisters,
    HoldingRegisters,
}

/// Configuration for the background register simulation task.
///
/// The configured range must fit inside the targeted bank; a range that does
/// not fit is rejected when the configuration is loaded and again when the
/// daemon launches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Enable or disable the simulation task.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Time between two batches in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Bank that receives the synthetic values.
    #[serde(default = "default_bank")]
    pub bank: SimulatedBank,

    /// First cell of the simulated range.
    #[serde(default = "default_start_address")]
    pub start_address: u16,

    /// Number of cells written per batch.
    #[serde(default = "default_count")]
    pub count: u16,

    /// Lower bound of the generated values (word banks only).
    #[serde(default = "default_min")]
    pub min: u16,

    /// Upper bound of the generated values (word banks only).
    #[serde(default = "default_max")]
    pub max: u16,
}

fn default_enabled() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_bank() -> SimulatedBank {
    SimulatedBank::HoldingRegisters
}

fn default_start_address() -> u16 {
    0
}

fn default_count() -> u16 {
    3
}

fn default_min() -> u16 {
    1
}

fn default_max() -> u16 {
    100
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_ms: default_interval_ms(),
            bank: default_bank(),
            start_address: default_start_address(),
            count: default_count(),
            min: default_min(),
            max: default_max(),
        }
    }
}
