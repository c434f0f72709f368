// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! This module provides functionality for running and managing the background
//! tasks of the Modbus simulator. It handles the lifecycle of:
//!
//! - The Modbus TCP server
//! - The register simulation task feeding synthetic values into the store
//! - System health monitoring (heartbeat)
//!
//! The daemon system allows for graceful startup and shutdown of these
//! services, with proper error handling and task coordination.
//!
//! ## Architecture
//!
//! Each service runs as an independent Tokio task. The daemon structure
//! tracks the task handles and shares a single `running` flag with them;
//! flipping the flag asks every task to wind down.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_modbus_sim::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     // Create and launch daemon with all enabled services
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Later, trigger a graceful shutdown
//!     daemon.shutdown();
//!
//!     // Wait for all tasks to complete
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use log::{debug, error, info, warn};
use rand::{Rng, RngExt};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::{Config, SimulatedBank, SimulationConfig};
use crate::modbus::{BitBank, ModbusTcpServer, RegisterStore, WordBank};

/// Represents a daemon task manager that coordinates the background services
///
/// This structure maintains a collection of asynchronous tasks and provides
/// methods to start, stop, and monitor them.
///
/// # Fields
///
/// * `tasks` - Collection of handles to running tasks for management and cleanup
/// * `running` - Atomic flag shared between tasks to coordinate shutdown
///
/// # Thread Safety
///
/// The `running` flag is wrapped in an `Arc` to allow safe sharing between
/// multiple tasks. Each task checks this flag periodically to determine if it
/// should continue running or gracefully terminate.
///
/// The register store is shared between every Modbus session and the
/// simulation task; it is the only mutable state they have in common.
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    store: Option<Arc<RegisterStore>>,
    modbus_addr: Option<SocketAddr>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// Initializes a new daemon manager with an empty task list and the
    /// running flag set to `true`.
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            store: None,
            modbus_addr: None,
        }
    }

    /// Launch all configured tasks based on configuration
    ///
    /// Creates the shared register store and starts the services enabled in
    /// the configuration, each as a separate asynchronous task:
    /// * Modbus TCP server - if `config.modbus.enabled` is `true`
    /// * Register simulation - if `config.simulation.enabled` is `true`
    /// * Heartbeat monitoring - always started
    ///
    /// # Errors
    ///
    /// This function can fail if:
    /// * The server fails to bind to the configured address/port
    /// * The simulation range does not fit in the targeted bank; this is a
    ///   configuration mistake and is surfaced at startup, not at tick time
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        info!(
            "Starting {} {} ({}, product code {})",
            config.device.product_name,
            config.device.revision,
            config.device.vendor_name,
            config.device.product_code
        );

        let store = Arc::new(RegisterStore::new(
            config.registers.discrete_inputs,
            config.registers.coils,
            config.registers.input_registers,
            config.registers.holding_registers,
        ));
        self.store = Some(Arc::clone(&store));

        // Start modbus server if enabled
        if config.modbus.enabled {
            self.start_modbus_server(config, Arc::clone(&store)).await?;
        }

        // Start register simulation if enabled
        if config.simulation.enabled {
            self.start_register_simulation(config, store)?;
        }

        // Start heartbeat task for monitoring
        self.start_heartbeat()?;

        Ok(())
    }

    /// Launch the modbus server daemon
    ///
    /// Binds the listening socket up front, so a busy port fails the launch
    /// instead of a background task, then spawns the accept loop. The task
    /// watches the daemon's `running` flag and aborts the accept loop when
    /// the flag goes down; sessions already in flight drain on their own.
    async fn start_modbus_server(
        &mut self,
        config: &Config,
        store: Arc<RegisterStore>,
    ) -> Result<()> {
        info!(
            "Starting modbus server on {}:{}",
            config.modbus.address, config.modbus.port
        );

        let server = ModbusTcpServer::bind(
            (config.modbus.address.as_str(), config.modbus.port),
            store,
            config.modbus.unit_id,
        )
        .await?;
        self.modbus_addr = Some(server.local_addr()?);

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            let server_handle = tokio::spawn(async move {
                if let Err(e) = server.run().await {
                    error!("Modbus server error: {}", e);
                }
            });

            while running.load(Ordering::SeqCst) {
                // Check every second if we should continue running
                time::sleep(Duration::from_secs(1)).await;
            }

            info!("Shutting down Modbus server...");
            server_handle.abort();

            // Wait for the server to shut down with a timeout
            match time::timeout(Duration::from_secs(5), server_handle).await {
                Ok(_) => info!("Modbus server shut down successfully"),
                Err(_) => {
                    warn!("Modbus server shutdown timed out, forcing termination");
                }
            }

            Ok(())
        });

        self.tasks.push(task);
        info!("Modbus server started");
        Ok(())
    }

    /// Start the register simulation task
    ///
    /// Every tick the task writes one batch of random values into the
    /// configured bank through a single store call, so a client reading the
    /// same range concurrently sees either the previous batch or the new one,
    /// never a mix.
    fn start_register_simulation(
        &mut self,
        config: &Config,
        store: Arc<RegisterStore>,
    ) -> Result<()> {
        let sim = config.simulation.clone();

        // A range outside the bank would fail on every tick; treat it as a
        // fatal configuration error before spawning anything.
        let capacity = match sim.bank {
            SimulatedBank::DiscreteInputs => store.bit_capacity(BitBank::DiscreteInput),
            SimulatedBank::Coils => store.bit_capacity(BitBank::Coil),
            SimulatedBank::InputRegisters => store.word_capacity(WordBank::Input),
            SimulatedBank::HoldingRegisters => store.word_capacity(WordBank::Holding),
        };
        let end = u32::from(sim.start_address) + u32::from(sim.count);
        if sim.count == 0 || end > u32::from(capacity) {
            anyhow::bail!(
                "Simulation range {}..{} does not fit in bank {:?} (capacity {})",
                sim.start_address,
                end,
                sim.bank,
                capacity
            );
        }

        info!(
            "Starting register simulation: {} cells in {:?} at address {} every {} ms",
            sim.count, sim.bank, sim.start_address, sim.interval_ms
        );

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                if let Err(code) = write_simulated_batch(&store, &sim) {
                    // The range was validated at launch; failing here means
                    // the configuration and the store no longer agree.
                    error!("Register simulation write failed: {:?}", code);
                    anyhow::bail!("Register simulation write rejected: {:?}", code);
                }
                debug!("Register simulation tick written");
                time::sleep(Duration::from_millis(sim.interval_ms)).await;
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs system status periodically
    ///
    /// The heartbeat task runs every 60 seconds and continues until the
    /// daemon's `running` flag is set to `false`. In a production environment
    /// these messages could be monitored by an external system to detect if
    /// the daemon has stopped functioning properly.
    fn start_heartbeat(&mut self) -> Result<()> {
        info!("Starting heartbeat monitor");

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                debug!("Daemon heartbeat: running");
                time::sleep(Duration::from_secs(60)).await;
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Get the shared register store
    ///
    /// Returns the store created by `launch`, shared with the Modbus sessions
    /// and the simulation task, or `None` before launch.
    pub fn get_store(&self) -> Option<Arc<RegisterStore>> {
        self.store.clone()
    }

    /// The address the Modbus server is listening on, or `None` if the server
    /// was not started. Useful when the configured port is 0.
    pub fn get_modbus_addr(&self) -> Option<SocketAddr> {
        self.modbus_addr
    }

    /// Stop all running tasks gracefully
    ///
    /// Signals all spawned tasks to terminate by setting the shared `running`
    /// flag to `false`. This method only signals the tasks to stop; it does
    /// not wait for them to complete. To wait for all tasks to finish, call
    /// `join()` after this method.
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        // Tasks should check the running flag and terminate gracefully
    }

    /// Wait for all tasks to complete
    ///
    /// Consumes the daemon and waits for all spawned tasks to finish
    /// execution. This method should be called after `shutdown()` to ensure a
    /// clean application exit. If any task panics, the error is logged but
    /// this method will still wait for all other tasks to complete.
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match time::timeout(Duration::from_secs(5), task).await {
                Ok(result) => {
                    if let Err(e) = result {
                        log::error!("Task panicked: {}", e);
                    }
                }
                Err(_) => {
                    // Task didn't complete within timeout
                    log::warn!("Task did not complete within timeout period, may be hung");
                }
            }
        }
        Ok(())
    }
}

/// Write one batch of synthetic values into the configured bank.
fn write_simulated_batch(
    store: &RegisterStore,
    sim: &SimulationConfig,
) -> Result<(), crate::modbus::ExceptionCode> {
    match sim.bank {
        SimulatedBank::DiscreteInputs | SimulatedBank::Coils => {
            let mut rng = rand::rng();
            let values: Vec<bool> = (0..sim.count).map(|_| rng.random()).collect();
            let bank = if sim.bank == SimulatedBank::Coils {
                BitBank::Coil
            } else {
                BitBank::DiscreteInput
            };
            store.write_bits(bank, sim.start_address, &values)
        }
        SimulatedBank::InputRegisters | SimulatedBank::HoldingRegisters => {
            let mut rng = rand::rng();
            let values: Vec<u16> =
                (0..sim.count).map(|_| rng.random_range(sim.min..=sim.max)).collect();
            let bank = if sim.bank == SimulatedBank::HoldingRegisters {
                WordBank::Holding
            } else {
                WordBank::Input
            };
            store.write_words(bank, sim.start_address, &values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn simulated_batch_lands_in_the_configured_range() {
        let store = RegisterStore::new(8, 8, 8, 8);
        let sim = SimulationConfig {
            enabled: true,
            interval_ms: 1000,
            bank: SimulatedBank::HoldingRegisters,
            start_address: 2,
            count: 3,
            min: 1,
            max: 100,
        };

        write_simulated_batch(&store, &sim).unwrap();

        let written = store.read_words(WordBank::Holding, 2, 3).unwrap();
        for value in &written {
            assert!((1..=100).contains(value), "value out of bounds: {}", value);
        }
        // Cells around the range stay untouched.
        assert_eq!(store.read_words(WordBank::Holding, 0, 2).unwrap(), vec![0, 0]);
        assert_eq!(store.read_words(WordBank::Holding, 5, 3).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn simulated_batch_can_target_bit_banks() {
        let store = RegisterStore::new(8, 8, 8, 8);
        let sim = SimulationConfig {
            enabled: true,
            interval_ms: 1000,
            bank: SimulatedBank::DiscreteInputs,
            start_address: 0,
            count: 8,
            min: 0,
            max: 1,
        };
        write_simulated_batch(&store, &sim).unwrap();
        // Nothing to assert about random bits beyond the write being accepted.
        assert_eq!(store.read_bits(BitBank::DiscreteInput, 0, 8).unwrap().len(), 8);
    }

    #[tokio::test]
    async fn launch_rejects_a_simulation_range_outside_the_bank() {
        let mut config = Config::default();
        config.modbus.enabled = false;
        config.simulation.start_address = 99;
        config.simulation.count = 3;

        let mut daemon = Daemon::new();
        let result = daemon.launch(&config).await;
        assert!(result.is_err());
    }
}
