// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus PDU codec
//!
//! Translates between raw PDU bytes (function code plus payload) and typed
//! [`Request`]/[`Response`] values, independently of the TCP framing. The
//! supported function codes are the eight bank read/write functions:
//!
//! | Function | Code |
//! |----------|------|
//! | Read Coils | 0x01 |
//! | Read Discrete Inputs | 0x02 |
//! | Read Holding Registers | 0x03 |
//! | Read Input Registers | 0x04 |
//! | Write Single Coil | 0x05 |
//! | Write Single Register | 0x06 |
//! | Write Multiple Coils | 0x0F |
//! | Write Multiple Registers | 0x10 |
//!
//! Any other code decodes to [`DecodeError::IllegalFunction`] and is answered
//! with a Modbus exception response rather than a connection close. Bit
//! payloads are packed low bit first within each byte, trailing pad bits
//! zeroed, as mandated by the Modbus application protocol.

use thiserror::Error;

/// Largest PDU the protocol allows (function code + 252 payload bytes).
pub const MAX_PDU_LEN: usize = 253;

// Per-class quantity ceilings from the Modbus application protocol.
const MAX_READ_BITS: u16 = 0x07D0;
const MAX_READ_REGISTERS: u16 = 0x007D;
const MAX_WRITE_BITS: u16 = 0x07B0;
const MAX_WRITE_REGISTERS: u16 = 0x007B;

/// Function codes understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCode {
    ReadCoils,
    ReadDiscreteInputs,
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleCoil,
    WriteSingleRegister,
    WriteMultipleCoils,
    WriteMultipleRegisters,
}

impl FunctionCode {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::ReadCoils),
            0x02 => Some(Self::ReadDiscreteInputs),
            0x03 => Some(Self::ReadHoldingRegisters),
            0x04 => Some(Self::ReadInputRegisters),
            0x05 => Some(Self::WriteSingleCoil),
            0x06 => Some(Self::WriteSingleRegister),
            0x0F => Some(Self::WriteMultipleCoils),
            0x10 => Some(Self::WriteMultipleRegisters),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::ReadCoils => 0x01,
            Self::ReadDiscreteInputs => 0x02,
            Self::ReadHoldingRegisters => 0x03,
            Self::ReadInputRegisters => 0x04,
            Self::WriteSingleCoil => 0x05,
            Self::WriteSingleRegister => 0x06,
            Self::WriteMultipleCoils => 0x0F,
            Self::WriteMultipleRegisters => 0x10,
        }
    }
}

/// Modbus exception codes returned to clients in exception responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
}

impl ExceptionCode {
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::IllegalFunction => 0x01,
            Self::IllegalDataAddress => 0x02,
            Self::IllegalDataValue => 0x03,
            Self::ServerDeviceFailure => 0x04,
        }
    }
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadCoils { address: u16, quantity: u16 },
    ReadDiscreteInputs { address: u16, quantity: u16 },
    ReadHoldingRegisters { address: u16, quantity: u16 },
    ReadInputRegisters { address: u16, quantity: u16 },
    WriteSingleCoil { address: u16, value: bool },
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleCoils { address: u16, values: Vec<bool> },
    WriteMultipleRegisters { address: u16, values: Vec<u16> },
}

impl Request {
    pub fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadCoils { .. } => FunctionCode::ReadCoils,
            Self::ReadDiscreteInputs { .. } => FunctionCode::ReadDiscreteInputs,
            Self::ReadHoldingRegisters { .. } => FunctionCode::ReadHoldingRegisters,
            Self::ReadInputRegisters { .. } => FunctionCode::ReadInputRegisters,
            Self::WriteSingleCoil { .. } => FunctionCode::WriteSingleCoil,
            Self::WriteSingleRegister { .. } => FunctionCode::WriteSingleRegister,
            Self::WriteMultipleCoils { .. } => FunctionCode::WriteMultipleCoils,
            Self::WriteMultipleRegisters { .. } => FunctionCode::WriteMultipleRegisters,
        }
    }
}

/// A server response ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    ReadCoils(Vec<bool>),
    ReadDiscreteInputs(Vec<bool>),
    ReadHoldingRegisters(Vec<u16>),
    ReadInputRegisters(Vec<u16>),
    WriteSingleCoil { address: u16, value: bool },
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleCoils { address: u16, quantity: u16 },
    WriteMultipleRegisters { address: u16, quantity: u16 },
}

impl Response {
    pub fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadCoils(_) => FunctionCode::ReadCoils,
            Self::ReadDiscreteInputs(_) => FunctionCode::ReadDiscreteInputs,
            Self::ReadHoldingRegisters(_) => FunctionCode::ReadHoldingRegisters,
            Self::ReadInputRegisters(_) => FunctionCode::ReadInputRegisters,
            Self::WriteSingleCoil { .. } => FunctionCode::WriteSingleCoil,
            Self::WriteSingleRegister { .. } => FunctionCode::WriteSingleRegister,
            Self::WriteMultipleCoils { .. } => FunctionCode::WriteMultipleCoils,
            Self::WriteMultipleRegisters { .. } => FunctionCode::WriteMultipleRegisters,
        }
    }
}

/// Reasons a request PDU cannot be decoded.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unsupported function code 0x{0:02X}")]
    IllegalFunction(u8),
    #[error("quantity outside the protocol range")]
    QuantityOutOfRange,
    #[error("invalid data value in request")]
    InvalidValue,
    #[error("payload length does not match the declared counts")]
    MalformedPdu,
    #[error("empty request PDU")]
    Empty,
}

impl DecodeError {
    /// The Modbus exception code reported to the client for this error.
    pub fn exception_code(&self) -> ExceptionCode {
        match self {
            Self::IllegalFunction(_) => ExceptionCode::IllegalFunction,
            // Malformed payloads are answered like out-of-range values.
            Self::QuantityOutOfRange | Self::InvalidValue | Self::MalformedPdu | Self::Empty => {
                ExceptionCode::IllegalDataValue
            }
        }
    }
}

fn be_u16(payload: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([payload[offset], payload[offset + 1]])
}

fn validate_quantity(quantity: u16, max: u16) -> Result<(), DecodeError> {
    if quantity == 0 || quantity > max {
        return Err(DecodeError::QuantityOutOfRange);
    }
    Ok(())
}

/// Decode an `address(16), quantity(16)` payload with no trailing bytes.
fn decode_address_quantity(payload: &[u8]) -> Result<(u16, u16), DecodeError> {
    if payload.len() != 4 {
        return Err(DecodeError::MalformedPdu);
    }
    Ok((be_u16(payload, 0), be_u16(payload, 2)))
}

/// Pack a bit sequence low bit first, trailing pad bits zeroed.
pub fn pack_bits(values: &[bool]) -> Vec<u8> {
    let mut packed = vec![0u8; values.len().div_ceil(8)];
    for (i, value) in values.iter().enumerate() {
        if *value {
            packed[i / 8] |= 1u8 << (i % 8);
        }
    }
    packed
}

fn unpack_bits(packed: &[u8], count: usize) -> Vec<bool> {
    (0..count).map(|i| packed[i / 8] & (1u8 << (i % 8)) != 0).collect()
}

/// Decode a request PDU into a typed [`Request`].
pub fn decode_request(pdu: &[u8]) -> Result<Request, DecodeError> {
    let (&function, payload) = pdu.split_first().ok_or(DecodeError::Empty)?;
    let function = FunctionCode::from_u8(function).ok_or(DecodeError::IllegalFunction(function))?;

    match function {
        FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
            let (address, quantity) = decode_address_quantity(payload)?;
            validate_quantity(quantity, MAX_READ_BITS)?;
            Ok(match function {
                FunctionCode::ReadCoils => Request::ReadCoils { address, quantity },
                _ => Request::ReadDiscreteInputs { address, quantity },
            })
        }
        FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => {
            let (address, quantity) = decode_address_quantity(payload)?;
            validate_quantity(quantity, MAX_READ_REGISTERS)?;
            Ok(match function {
                FunctionCode::ReadHoldingRegisters => Request::ReadHoldingRegisters { address, quantity },
                _ => Request::ReadInputRegisters { address, quantity },
            })
        }
        FunctionCode::WriteSingleCoil => {
            if payload.len() != 4 {
                return Err(DecodeError::MalformedPdu);
            }
            let address = be_u16(payload, 0);
            let value = match be_u16(payload, 2) {
                0xFF00 => true,
                0x0000 => false,
                _ => return Err(DecodeError::InvalidValue),
            };
            Ok(Request::WriteSingleCoil { address, value })
        }
        FunctionCode::WriteSingleRegister => {
            if payload.len() != 4 {
                return Err(DecodeError::MalformedPdu);
            }
            Ok(Request::WriteSingleRegister {
                address: be_u16(payload, 0),
                value: be_u16(payload, 2),
            })
        }
        FunctionCode::WriteMultipleCoils => {
            if payload.len() < 5 {
                return Err(DecodeError::MalformedPdu);
            }
            let address = be_u16(payload, 0);
            let quantity = be_u16(payload, 2);
            validate_quantity(quantity, MAX_WRITE_BITS)?;
            let byte_count = usize::from(payload[4]);
            if byte_count != usize::from(quantity).div_ceil(8) || payload.len() != 5 + byte_count {
                return Err(DecodeError::MalformedPdu);
            }
            let values = unpack_bits(&payload[5..], usize::from(quantity));
            Ok(Request::WriteMultipleCoils { address, values })
        }
        FunctionCode::WriteMultipleRegisters => {
            if payload.len() < 5 {
                return Err(DecodeError::MalformedPdu);
            }
            let address = be_u16(payload, 0);
            let quantity = be_u16(payload, 2);
            validate_quantity(quantity, MAX_WRITE_REGISTERS)?;
            let byte_count = usize::from(payload[4]);
            if byte_count != usize::from(quantity) * 2 || payload.len() != 5 + byte_count {
                return Err(DecodeError::MalformedPdu);
            }
            let values = (0..usize::from(quantity)).map(|i| be_u16(&payload[5..], i * 2)).collect();
            Ok(Request::WriteMultipleRegisters { address, values })
        }
    }
}

/// Encode a [`Response`] into a PDU.
pub fn encode_response(response: &Response) -> Vec<u8> {
    let function = response.function_code().as_u8();
    match response {
        Response::ReadCoils(bits) | Response::ReadDiscreteInputs(bits) => {
            let packed = pack_bits(bits);
            let mut pdu = Vec::with_capacity(2 + packed.len());
            pdu.push(function);
            pdu.push(packed.len() as u8);
            pdu.extend_from_slice(&packed);
            pdu
        }
        Response::ReadHoldingRegisters(words) | Response::ReadInputRegisters(words) => {
            let mut pdu = Vec::with_capacity(2 + words.len() * 2);
            pdu.push(function);
            pdu.push((words.len() * 2) as u8);
            for word in words {
                pdu.extend_from_slice(&word.to_be_bytes());
            }
            pdu
        }
        Response::WriteSingleCoil { address, value } => {
            let raw: u16 = if *value { 0xFF00 } else { 0x0000 };
            let mut pdu = vec![function];
            pdu.extend_from_slice(&address.to_be_bytes());
            pdu.extend_from_slice(&raw.to_be_bytes());
            pdu
        }
        Response::WriteSingleRegister { address, value } => {
            let mut pdu = vec![function];
            pdu.extend_from_slice(&address.to_be_bytes());
            pdu.extend_from_slice(&value.to_be_bytes());
            pdu
        }
        Response::WriteMultipleCoils { address, quantity }
        | Response::WriteMultipleRegisters { address, quantity } => {
            let mut pdu = vec![function];
            pdu.extend_from_slice(&address.to_be_bytes());
            pdu.extend_from_slice(&quantity.to_be_bytes());
            pdu
        }
    }
}

/// Encode a Modbus exception response: the offending function code with the
/// high bit set, followed by the exception code.
pub fn encode_exception(function: u8, code: ExceptionCode) -> Vec<u8> {
    vec![function | 0x80, code.as_u8()]
}
