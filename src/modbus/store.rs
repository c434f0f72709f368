// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared register storage for the Modbus server
//!
//! The store keeps the four Modbus data banks in memory and is shared between
//! every client session and the register simulation task. Each bank sits
//! behind its own `Mutex`, so operations on different banks never contend,
//! while a batch read or write on one bank is a single indivisible step: a
//! concurrent reader sees the whole batch or none of it.
//!
//! Locks are only held for the in-memory copy, never across network I/O.

use std::sync::Mutex;

use log::error;

use crate::modbus::pdu::ExceptionCode;

/// Selects one of the two single-bit banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitBank {
    /// Read-only from the client perspective, written by the simulation task.
    DiscreteInput,
    /// Read/write for clients.
    Coil,
}

/// Selects one of the two 16-bit banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordBank {
    /// Read-only from the client perspective, written by the simulation task.
    Input,
    /// Read/write for clients.
    Holding,
}

/// Thread-safe storage for the four Modbus register banks.
///
/// Capacities are fixed at construction and all cells start at zero. A range
/// is valid iff `address + count <= capacity`; anything else fails with
/// [`ExceptionCode::IllegalDataAddress`] and leaves the bank untouched.
pub struct RegisterStore {
    discrete_inputs: Mutex<Vec<bool>>,
    coils: Mutex<Vec<bool>>,
    input_registers: Mutex<Vec<u16>>,
    holding_registers: Mutex<Vec<u16>>,
}

impl RegisterStore {
    /// Create a store with the given per-bank capacities, all cells zeroed.
    pub fn new(discrete_inputs: u16, coils: u16, input_registers: u16, holding_registers: u16) -> Self {
        Self {
            discrete_inputs: Mutex::new(vec![false; usize::from(discrete_inputs)]),
            coils: Mutex::new(vec![false; usize::from(coils)]),
            input_registers: Mutex::new(vec![0; usize::from(input_registers)]),
            holding_registers: Mutex::new(vec![0; usize::from(holding_registers)]),
        }
    }

    fn bit_bank(&self, bank: BitBank) -> &Mutex<Vec<bool>> {
        match bank {
            BitBank::DiscreteInput => &self.discrete_inputs,
            BitBank::Coil => &self.coils,
        }
    }

    fn word_bank(&self, bank: WordBank) -> &Mutex<Vec<u16>> {
        match bank {
            WordBank::Input => &self.input_registers,
            WordBank::Holding => &self.holding_registers,
        }
    }

    /// Capacity of a bit bank in cells.
    pub fn bit_capacity(&self, bank: BitBank) -> u16 {
        self.bit_bank(bank).lock().unwrap().len() as u16
    }

    /// Capacity of a word bank in cells.
    pub fn word_capacity(&self, bank: WordBank) -> u16 {
        self.word_bank(bank).lock().unwrap().len() as u16
    }

    /// Read `count` bits starting at `address`.
    pub fn read_bits(&self, bank: BitBank, address: u16, count: u16) -> Result<Vec<bool>, ExceptionCode> {
        let cells = self.bit_bank(bank).lock().unwrap();
        let range = check_range(address, usize::from(count), cells.len())?;
        Ok(cells[range].to_vec())
    }

    /// Write a batch of bits starting at `address` as one atomic update.
    pub fn write_bits(&self, bank: BitBank, address: u16, values: &[bool]) -> Result<(), ExceptionCode> {
        let mut cells = self.bit_bank(bank).lock().unwrap();
        let range = check_range(address, values.len(), cells.len())?;
        cells[range].copy_from_slice(values);
        Ok(())
    }

    /// Read `count` 16-bit registers starting at `address`.
    pub fn read_words(&self, bank: WordBank, address: u16, count: u16) -> Result<Vec<u16>, ExceptionCode> {
        let cells = self.word_bank(bank).lock().unwrap();
        let range = check_range(address, usize::from(count), cells.len())?;
        Ok(cells[range].to_vec())
    }

    /// Write a batch of 16-bit registers starting at `address` as one atomic
    /// update.
    pub fn write_words(&self, bank: WordBank, address: u16, values: &[u16]) -> Result<(), ExceptionCode> {
        let mut cells = self.word_bank(bank).lock().unwrap();
        let range = check_range(address, values.len(), cells.len())?;
        cells[range].copy_from_slice(values);
        Ok(())
    }
}

/// Validate a `[address, address + count)` range against a bank capacity.
fn check_range(address: u16, count: usize, capacity: usize) -> Result<std::ops::Range<usize>, ExceptionCode> {
    let start = usize::from(address);
    let end = start.checked_add(count).filter(|end| *end <= capacity);
    match end {
        Some(end) => Ok(start..end),
        None => {
            error!(
                "Exception::IllegalDataAddress - {} cells at address {} exceed capacity {}",
                count, address, capacity
            );
            Err(ExceptionCode::IllegalDataAddress)
        }
    }
}
