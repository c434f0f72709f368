// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust Modbus simulator library
//!
//! This library implements a standalone Modbus TCP server whose register
//! banks are continuously updated by a background simulation task. It is
//! organized in three layers:
//!
//! - [`modbus`]: the protocol engine — register storage, PDU codec, MBAP
//!   framing and the TCP server itself
//! - [`daemon`]: lifecycle management for the server, the register
//!   simulation task and the heartbeat monitor
//! - [`config`]: YAML configuration with JSON Schema validation

pub mod config;
pub mod daemon;
pub mod modbus;
