// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::{Config, SimulatedBank};

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line. It outputs the full JSON schema for the configuration
/// to stdout, formatted for readability.
///
/// ### Example
///
/// ```bash
/// ./rust_modbus_sim --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    // Load the schema from the embedded string
    let schema_str = include_str!("../../resources/config.schema.json");

    // Parse the schema to a JSON Value to pretty-format it
    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
///
/// ### Arguments
///
/// * `addr` - The address string to validate
///
/// ### Returns
///
/// `true` if the address is valid, `false` otherwise
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Capacity of the bank targeted by the simulation task.
fn simulated_bank_capacity(config: &Config) -> u16 {
    match config.simulation.bank {
        SimulatedBank::DiscreteInputs => config.registers.discrete_inputs,
        SimulatedBank::Coils => config.registers.coils,
        SimulatedBank::InputRegisters => config.registers.input_registers,
        SimulatedBank::HoldingRegisters => config.registers.holding_registers,
    }
}

/// Validates the configuration against additional rules that aren't covered
/// by the JSON schema.
///
/// ### Validation Rules
///
/// This function validates:
///
/// - **Port Range**: the Modbus port is within a valid range (1-65534)
/// - **IP Address Format**: the bind address looks like an IP address or a
///   known special value (only logged, not blocking)
/// - **Value Bounds**: the simulation's `min` does not exceed `max`
/// - **Simulation Range**: the simulated range fits inside the targeted bank.
///   A range outside the bank would make every tick fail with an illegal
///   data address, so it is rejected up front.
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.modbus.port < 1 || config.modbus.port > 65534 {
        anyhow::bail!("Invalid port number: {}", config.modbus.port);
    }

    if !is_valid_ip_address(&config.modbus.address) {
        debug!("Potentially invalid address format: {}", config.modbus.address);
        // Just issue a warning but don't block
    }

    if config.simulation.min > config.simulation.max {
        anyhow::bail!(
            "Simulation value bounds are inverted: min {} > max {}",
            config.simulation.min,
            config.simulation.max
        );
    }

    if config.simulation.count == 0 {
        anyhow::bail!("Simulation batch size must be at least 1");
    }

    let capacity = simulated_bank_capacity(config);
    let end = u32::from(config.simulation.start_address) + u32::from(config.simulation.count);
    if end > u32::from(capacity) {
        anyhow::bail!(
            "Simulation range {}..{} does not fit in bank {:?} (capacity {})",
            config.simulation.start_address,
            end,
            config.simulation.bank,
            capacity
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_default_configuration() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn recognizes_addresses() {
        assert!(is_valid_ip_address("127.0.0.1"));
        assert!(is_valid_ip_address("::1"));
        assert!(is_valid_ip_address("localhost"));
        assert!(is_valid_ip_address("0.0.0.0"));
        assert!(!is_valid_ip_address("not-an-address"));
    }

    #[test]
    fn rejects_port_zero() {
        let mut config = Config::default();
        config.modbus.port = 0;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn rejects_inverted_value_bounds() {
        let mut config = Config::default();
        config.simulation.min = 50;
        config.simulation.max = 10;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn rejects_an_empty_simulation_batch() {
        let mut config = Config::default();
        config.simulation.count = 0;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn rejects_a_simulation_range_past_the_bank_end() {
        let mut config = Config::default();
        config.simulation.start_address = 98;
        config.simulation.count = 3;
        let err = validate_specific_rules(&config).unwrap_err();
        assert!(err.to_string().contains("does not fit"));
    }

    #[test]
    fn checks_the_range_against_the_targeted_bank() {
        let mut config = Config::default();
        config.registers.coils = 8;
        config.simulation.bank = SimulatedBank::Coils;
        config.simulation.start_address = 6;
        config.simulation.count = 3;
        assert!(validate_specific_rules(&config).is_err());

        // The same range is fine in the (larger) holding bank.
        config.simulation.bank = SimulatedBank::HoldingRegisters;
        assert!(validate_specific_rules(&config).is_ok());
    }
}
