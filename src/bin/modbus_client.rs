// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use clap::Parser;
use std::{error::Error, net::SocketAddr};
use tokio_modbus::prelude::*;

/// Modbus client for reading holding registers from the simulator server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Modbus server address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus server port
    #[clap(long, default_value = "5020")]
    port: u16,

    /// Starting holding register address
    #[clap(long, default_value = "0")]
    register: u16,

    /// Number of registers to read
    #[clap(long, default_value = "3")]
    quantity: u16,

    /// Unit identifier to address
    #[clap(long, default_value = "1")]
    unit_id: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    // Parse command line arguments
    let args = Args::parse();

    // Format server address
    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port)
        .parse()
        .expect("Invalid socket address");
    println!("Connecting to Modbus server at {}", socket_addr);

    // Create TCP transport
    let mut ctx = tcp::connect_slave(socket_addr, Slave(args.unit_id)).await?;

    // Read holding registers
    println!(
        "Reading {} holding registers starting at address {}",
        args.quantity, args.register
    );
    let response = ctx
        .read_holding_registers(args.register, args.quantity)
        .await?;

    // Display raw results
    println!("Raw register values: {:?}", response);
    Ok(())
}
