// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Configuration Management
//!
//! This module implements configuration handling for the Modbus simulator.
//! It supports loading, validating, and saving configuration from YAML files
//! using JSON Schema validation for robust error checking.
//!
//! ## Configuration Structure
//!
//! The configuration is organized as a nested structure with sections:
//! - `modbus`: network binding and unit id of the Modbus TCP server
//! - `registers`: capacities of the four register banks
//! - `simulation`: the background task that feeds synthetic register values
//! - `device`: identification metadata reported in the startup logs
//!
//! ## Usage
//!
//! ```no_run
//! use rust_modbus_sim::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("0.0.0.0".to_string()), // Modbus address
//!     Some(5020),                  // Modbus port
//!     Some(true),                  // Enable simulation
//! );
//!
//! println!("Modbus port: {}", config.modbus.port);
//! ```

mod device;
mod modbus;
mod registers;
mod simulation;
mod utils;

pub use device::DeviceConfig;
pub use modbus::ModbusConfig;
pub use registers::RegistersConfig;
pub use simulation::{SimulatedBank, SimulationConfig};
pub use utils::{is_valid_ip_address, output_config_schema, validate_specific_rules};

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};

/// Root configuration structure for the Modbus simulator.
///
/// The configuration is deserialized from and serialized to YAML using the
/// serde framework and validated against the embedded JSON schema before
/// deserialization. Each section falls back to its default values when not
/// present in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network settings of the Modbus TCP server.
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Capacities of the four register banks.
    #[serde(default)]
    pub registers: RegistersConfig,

    /// Settings of the background register simulation task.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Device identification metadata.
    #[serde(default)]
    pub device: DeviceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modbus: ModbusConfig::default(),
            registers: RegistersConfig::default(),
            simulation: SimulationConfig::default(),
            device: DeviceConfig::default(),
        }
    }
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        debug!("Creating sample configuration file at {:?}", path);
        let sample_path = path.with_extension("sample.yaml");

        // Create parent directories if they don't exist
        if let Some(parent) = sample_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory for sample config at {:?}", parent)
                })?;
            }
        }

        let sample_config = Self::default();
        sample_config
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// If the file does not exist, a default configuration is written there
    /// and returned. An existing file is validated against the embedded JSON
    /// schema before deserialization; on failure a `.sample.yaml` with the
    /// defaults is written next to it and an error is returned.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Configuration file not found at {:?}, creating default", path);
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        // Load and validate with the schema
        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(err) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", err);
        }

        // Now that YAML has been validated, deserialize to Config
        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                match Self::create_sample_config(path) {
                    Ok(_) => debug!("Successfully created sample config"),
                    Err(e) => error!("Failed to create sample config: {}", e),
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        // Perform additional specific validations
        if let Err(err) = validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// # Parameters
    ///
    /// * `modbus_address` - Network address for the Modbus server to bind to
    /// * `modbus_port` - TCP port for the Modbus server
    /// * `simulation_enabled` - Flag to enable/disable the simulation task
    pub fn apply_args(
        &mut self,
        modbus_address: Option<String>,
        modbus_port: Option<u16>,
        simulation_enabled: Option<bool>,
    ) {
        if let Some(address) = modbus_address {
            self.modbus.address = address;
        }
        if let Some(port) = modbus_port {
            self.modbus.port = port;
        }
        if let Some(enabled) = simulation_enabled {
            self.simulation.enabled = enabled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn default_config_matches_the_original_deployment() {
        let config = Config::default();
        assert!(config.modbus.enabled);
        assert_eq!(config.modbus.address, "127.0.0.1");
        assert_eq!(config.modbus.port, 5020);
        assert_eq!(config.modbus.unit_id, 1);
        assert_eq!(config.registers.holding_registers, 100);
        assert!(config.simulation.enabled);
        assert_eq!(config.simulation.interval_ms, 1000);
        assert_eq!(config.simulation.bank, SimulatedBank::HoldingRegisters);
        assert_eq!(config.simulation.start_address, 0);
        assert_eq!(config.simulation.count, 3);
        assert_eq!(config.simulation.min, 1);
        assert_eq!(config.simulation.max, 100);
    }

    #[test]
    fn from_file_creates_a_default_config_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let config = Config::from_file(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.modbus.port, 5020);

        // Loading the freshly written file again must succeed and agree.
        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.modbus.port, config.modbus.port);
        assert_eq!(reloaded.simulation.count, config.simulation.count);
    }

    #[test]
    fn from_file_roundtrips_custom_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.modbus.port = 1502;
        config.registers.coils = 16;
        config.simulation.bank = SimulatedBank::InputRegisters;
        config.save_to_file(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.modbus.port, 1502);
        assert_eq!(reloaded.registers.coils, 16);
        assert_eq!(reloaded.simulation.bank, SimulatedBank::InputRegisters);
    }

    #[test]
    fn from_file_rejects_schema_violations_and_writes_a_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "modbus:\n  port: 70000\n").unwrap();

        let result = Config::from_file(&path);
        assert!(result.is_err());
        assert!(dir.path().join("config.sample.yaml").exists());
    }

    #[test]
    fn from_file_rejects_a_simulation_range_outside_the_bank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "simulation:\n  start_address: 99\n  count: 3\n").unwrap();

        let result = Config::from_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn apply_args_overrides_only_what_was_given() {
        let mut config = Config::default();
        config.apply_args(Some("0.0.0.0".to_string()), None, Some(false));
        assert_eq!(config.modbus.address, "0.0.0.0");
        assert_eq!(config.modbus.port, 5020);
        assert!(!config.simulation.enabled);
    }
}
