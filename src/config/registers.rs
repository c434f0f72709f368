// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register bank capacities
//!
//! Capacities are fixed for the lifetime of the process; each bank is
//! addressed from 0 to `capacity - 1` and starts zeroed.

use serde::{Deserialize, Serialize};

/// Capacities of the four Modbus register banks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistersConfig {
    /// Number of discrete input cells (1 bit, read-only for clients).
    #[serde(default = "default_capacity")]
    pub discrete_inputs: u16,

    /// Number of coil cells (1 bit, read/write).
    #[serde(default = "default_capacity")]
    pub coils: u16,

    /// Number of input registers (16 bit, read-only for clients).
    #[serde(default = "default_capacity")]
    pub input_registers: u16,

    /// Number of holding registers (16 bit, read/write).
    #[serde(default = "default_capacity")]
    pub holding_registers: u16,
}

fn default_capacity() -> u16 {
    100
}

impl Default for RegistersConfig {
    fn default() -> Self {
        Self {
            discrete_inputs: default_capacity(),
            coils: default_capacity(),
            input_registers: default_capacity(),
            holding_registers: default_capacity(),
        }
    }
}
