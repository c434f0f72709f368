// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Device identification metadata
//!
//! Descriptive fields identifying the simulated device. They are reported in
//! the startup logs; the device-identification function codes themselves are
//! not served.

use serde::{Deserialize, Serialize};

/// Identification metadata of the simulated device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Name of the device vendor.
    #[serde(default = "default_vendor_name")]
    pub vendor_name: String,

    /// Short product code.
    #[serde(default = "default_product_code")]
    pub product_code: String,

    /// Human readable product name.
    #[serde(default = "default_product_name")]
    pub product_name: String,

    /// Model name reported for the device.
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// URL of the vendor or project page.
    #[serde(default = "default_vendor_url")]
    pub vendor_url: String,

    /// Major/minor revision string.
    #[serde(default = "default_revision")]
    pub revision: String,
}

fn default_vendor_name() -> String {
    "SCTG Development".to_string()
}

fn default_product_code() -> String {
    "RMS".to_string()
}

fn default_product_name() -> String {
    "Rust Modbus Simulator".to_string()
}

fn default_model_name() -> String {
    "Rust Modbus Simulator".to_string()
}

fn default_vendor_url() -> String {
    "https://github.com/sctg-development/rust-modbus-sim".to_string()
}

/// Revision string derived from the current package version.
fn default_revision() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_name: default_vendor_name(),
            product_code: default_product_code(),
            product_name: default_product_name(),
            model_name: default_model_name(),
            vendor_url: default_vendor_url(),
            revision: default_revision(),
        }
    }
}
