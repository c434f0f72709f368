// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Native Modbus TCP server engine
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module
//! uses the terms "server" and "client" instead. The server is the device that
//! provides data, while the client is the device that requests data. The Modbus
//! master is here the client and the Modbus slave is here the server.
//!
//! ## Register Banks
//!
//! The server exposes the four standard Modbus data banks, each addressed
//! independently from zero:
//!
//! | Bank | Width | Client access | Functions |
//! |------|-------|---------------|-----------|
//! | Discrete Inputs | 1 bit | read only | 0x02 |
//! | Coils | 1 bit | read/write | 0x01, 0x05, 0x0F |
//! | Input Registers | 16 bit | read only | 0x04 |
//! | Holding Registers | 16 bit | read/write | 0x03, 0x06, 0x10 |
//!
//! The bank capacities are fixed when the [`store::RegisterStore`] is built
//! and every cell starts at zero. The banks are also written from inside the
//! process by the register simulation task (see the `daemon` module); a batch
//! write is applied atomically, so a concurrent client read never observes a
//! partially applied batch.
//!
//! ## Wire format
//!
//! Requests and responses travel as Modbus TCP frames: a 7-byte MBAP header
//! (transaction id, protocol id, length, unit id) followed by the PDU
//! (function code and payload). The [`frame`] module owns the header,
//! [`pdu`] owns the function codes, and [`server`] ties both to the shared
//! register store, one session task per TCP connection.

pub mod frame;
pub mod pdu;
pub mod server;
pub mod store;

pub use pdu::ExceptionCode;
pub use server::ModbusTcpServer;
pub use store::{BitBank, RegisterStore, WordBank};
