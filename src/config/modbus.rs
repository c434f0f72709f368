// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP server configuration
//!
//! This module defines the structures for configuring the network side of the
//! Modbus TCP server.

use serde::{Deserialize, Serialize};

/// Configuration for the Modbus TCP server component.
///
/// This structure contains settings that control the Modbus TCP server
/// functionality, including network binding parameters and the logical unit
/// the server answers for.
///
/// # Fields
///
/// * `enabled` - Flag to enable or disable the Modbus server
/// * `port` - TCP port number for the Modbus server (default: 5020)
/// * `address` - Network address for the Modbus server to bind to (default: 127.0.0.1)
/// * `unit_id` - Unit identifier of the single logical unit (default: 1)
///
/// # Example
///
/// ```
/// use rust_modbus_sim::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     enabled: true,
///     port: 1502,
///     address: "0.0.0.0".to_string(),
///     unit_id: 1,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Flag to enable or disable the Modbus server.
    ///
    /// When enabled, the server will start and respond to Modbus TCP requests.
    /// When disabled, no server will be started and no resources will be used.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// The TCP port the Modbus server will listen on.
    ///
    /// Valid range is 1-65534. Default value is 5020, an unprivileged
    /// alternative to the standard Modbus TCP port 502.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The network address the Modbus server will bind to.
    ///
    /// Can be an IPv4/IPv6 address or a hostname. Default is "127.0.0.1".
    /// Use "0.0.0.0" to bind to all IPv4 interfaces.
    #[serde(default = "default_address")]
    pub address: String,

    /// Unit identifier of the logical unit served by this process.
    ///
    /// The server answers requests for any unit id and echoes the id it
    /// received; this value only identifies the unit in logs.
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
}

fn default_enabled() -> bool {
    true
}

/// Unprivileged Modbus TCP port used by the original deployment.
fn default_port() -> u16 {
    5020
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_unit_id() -> u8 {
    1
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            port: default_port(),
            address: default_address(),
            unit_id: default_unit_id(),
        }
    }
}
