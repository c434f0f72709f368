// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! MBAP framing for Modbus TCP
//!
//! Every Modbus TCP message starts with the 7-byte MBAP header: transaction
//! id, protocol id (always zero), the byte count of unit id plus PDU, and the
//! unit id. This module reads and writes exactly one frame at a time on an
//! async byte stream; responses mirror the request's transaction id and unit
//! id so the client can correlate them.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::modbus::pdu::MAX_PDU_LEN;

pub const MBAP_HEADER_LEN: usize = 7;

/// The only protocol identifier Modbus defines.
pub const MODBUS_PROTOCOL_ID: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    /// Byte count of the unit id plus the PDU that follows.
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    pub fn to_bytes(&self) -> [u8; MBAP_HEADER_LEN] {
        let mut bytes = [0u8; MBAP_HEADER_LEN];
        bytes[0..2].copy_from_slice(&self.transaction_id.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.protocol_id.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.length.to_be_bytes());
        bytes[6] = self.unit_id;
        bytes
    }

    pub fn from_bytes(bytes: &[u8; MBAP_HEADER_LEN]) -> Self {
        Self {
            transaction_id: u16::from_be_bytes([bytes[0], bytes[1]]),
            protocol_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
            unit_id: bytes[6],
        }
    }
}

/// Transport-level failures. All of them are fatal to the session: the
/// connection is closed without sending a response.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("invalid protocol identifier 0x{0:04X}")]
    InvalidProtocolId(u16),
    #[error("invalid MBAP length field {0}")]
    InvalidLength(u16),
    #[error("stream closed in the middle of a frame")]
    UnexpectedEof,
    #[error("frame I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one complete frame from the stream.
///
/// Returns `Ok(None)` when the peer closed the connection cleanly at a frame
/// boundary. End-of-stream after the first header byte, a non-zero protocol
/// id, or a length field that cannot hold a function code are framing errors.
pub async fn read_frame<R>(stream: &mut R) -> Result<Option<(MbapHeader, Vec<u8>)>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header_bytes = [0u8; MBAP_HEADER_LEN];

    // A clean disconnect can only happen before the first header byte.
    match stream.read_exact(&mut header_bytes[..1]).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(FrameError::Io(err)),
    }
    match stream.read_exact(&mut header_bytes[1..]).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FrameError::UnexpectedEof)
        }
        Err(err) => return Err(FrameError::Io(err)),
    }

    let header = MbapHeader::from_bytes(&header_bytes);
    if header.protocol_id != MODBUS_PROTOCOL_ID {
        return Err(FrameError::InvalidProtocolId(header.protocol_id));
    }
    // The length covers the unit id byte, so a PDU needs at least 2.
    let pdu_len = usize::from(header.length);
    if pdu_len < 2 || pdu_len - 1 > MAX_PDU_LEN {
        return Err(FrameError::InvalidLength(header.length));
    }

    let mut pdu = vec![0u8; pdu_len - 1];
    match stream.read_exact(&mut pdu).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FrameError::UnexpectedEof)
        }
        Err(err) => return Err(FrameError::Io(err)),
    }

    Ok(Some((header, pdu)))
}

/// Write one frame, mirroring the request's transaction id and unit id.
pub async fn write_frame<W>(
    stream: &mut W,
    transaction_id: u16,
    unit_id: u8,
    pdu: &[u8],
) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if pdu.is_empty() || pdu.len() > MAX_PDU_LEN {
        return Err(FrameError::InvalidLength(pdu.len() as u16));
    }

    let header = MbapHeader {
        transaction_id,
        protocol_id: MODBUS_PROTOCOL_ID,
        length: (pdu.len() + 1) as u16,
        unit_id,
    };

    let mut frame = Vec::with_capacity(MBAP_HEADER_LEN + pdu.len());
    frame.extend_from_slice(&header.to_bytes());
    frame.extend_from_slice(pdu);

    stream.write_all(&frame).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_roundtrip_preserves_transaction_and_unit_id() {
        let mut buffer: Vec<u8> = Vec::new();
        write_frame(&mut buffer, 0x1234, 0x11, &[0x03, 0x00, 0x6B, 0x00, 0x03]).await.unwrap();
        assert_eq!(
            buffer,
            vec![0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0x11, 0x03, 0x00, 0x6B, 0x00, 0x03]
        );

        let mut reader = buffer.as_slice();
        let (header, pdu) = read_frame(&mut reader).await.unwrap().expect("one frame");
        assert_eq!(
            header,
            MbapHeader { transaction_id: 0x1234, protocol_id: 0, length: 6, unit_id: 0x11 }
        );
        assert_eq!(pdu, vec![0x03, 0x00, 0x6B, 0x00, 0x03]);
    }

    #[tokio::test]
    async fn rejects_non_zero_protocol_id() {
        let bytes = [0x00, 0x01, 0x00, 0x01, 0x00, 0x02, 0x01, 0x03];
        let mut reader = bytes.as_slice();
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(FrameError::InvalidProtocolId(0x0001))
        ));
    }

    #[tokio::test]
    async fn rejects_length_without_room_for_a_function_code() {
        let bytes = [0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x01];
        let mut reader = bytes.as_slice();
        assert!(matches!(read_frame(&mut reader).await, Err(FrameError::InvalidLength(1))));
    }

    #[tokio::test]
    async fn clean_eof_at_frame_boundary_is_not_an_error() {
        let mut reader: &[u8] = &[];
        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn eof_inside_header_is_a_framing_error() {
        let bytes = [0x00, 0x01, 0x00];
        let mut reader = bytes.as_slice();
        assert!(matches!(read_frame(&mut reader).await, Err(FrameError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn eof_inside_pdu_is_a_framing_error() {
        // Header announces a 5-byte PDU but only 2 bytes follow.
        let bytes = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00];
        let mut reader = bytes.as_slice();
        assert!(matches!(read_frame(&mut reader).await, Err(FrameError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn write_frame_rejects_oversized_pdu() {
        let mut buffer: Vec<u8> = Vec::new();
        let pdu = vec![0u8; MAX_PDU_LEN + 1];
        assert!(matches!(
            write_frame(&mut buffer, 0, 1, &pdu).await,
            Err(FrameError::InvalidLength(_))
        ));
    }
}
