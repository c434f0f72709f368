// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Daemon management for the Modbus simulator
//!
//! This module coordinates the long-running tasks of the application: the
//! Modbus TCP server, the register simulation task and the heartbeat monitor.
//! See [`launch_daemon::Daemon`] for the lifecycle API.

pub mod launch_daemon;

pub use launch_daemon::Daemon;
