// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP server: listener, sessions and request dispatch
//!
//! The server accepts TCP connections and runs one session task per client.
//! A session is a simple loop: wait for a complete frame, decode the PDU,
//! execute it against the shared [`RegisterStore`], and write the framed
//! response. Protocol-level problems (unknown function, bad quantity, bad
//! address) are answered with a Modbus exception response and the session
//! keeps going; framing-level problems close the connection without a
//! response, leaving reconnection to the client.
//!
//! The server handles a single logical unit. Requests carrying a different
//! unit id are served anyway and the id is echoed back, which matches how
//! most single-unit servers behave in the field.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, warn};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use crate::modbus::frame::{self, FrameError};
use crate::modbus::pdu::{self, ExceptionCode, Request, Response};
use crate::modbus::store::{BitBank, RegisterStore, WordBank};

/// A Modbus TCP server bound to a listening socket.
///
/// Every accepted connection gets its own session task; the sessions share
/// nothing but the register store.
pub struct ModbusTcpServer {
    listener: TcpListener,
    store: Arc<RegisterStore>,
    unit_id: u8,
}

impl ModbusTcpServer {
    /// Bind a listening socket and wrap it in a server.
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        store: Arc<RegisterStore>,
        unit_id: u8,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, store, unit_id))
    }

    pub fn from_listener(listener: TcpListener, store: Arc<RegisterStore>, unit_id: u8) -> Self {
        Self { listener, store, unit_id }
    }

    /// The address the server is actually listening on. Useful with port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is cancelled or the listening socket
    /// fails. Transient accept errors are logged and the loop continues.
    pub async fn run(self) -> io::Result<()> {
        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(connection) => connection,
                Err(err) if is_transient_accept_error(&err) => {
                    warn!("accept failed, continuing: {}", err);
                    continue;
                }
                Err(err) => {
                    error!("listening socket failed: {}", err);
                    return Err(err);
                }
            };

            debug!("client connected from {}", peer);
            let store = Arc::clone(&self.store);
            let unit_id = self.unit_id;
            tokio::spawn(async move {
                match handle_connection(socket, store, unit_id).await {
                    Ok(()) => debug!("client {} disconnected", peer),
                    Err(err) => warn!("closing session with {}: {}", peer, err),
                }
            });
        }
    }
}

fn is_transient_accept_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::Interrupted
    )
}

/// Serve one client connection until it disconnects or a framing error makes
/// the byte stream untrustworthy.
async fn handle_connection(
    mut socket: TcpStream,
    store: Arc<RegisterStore>,
    unit_id: u8,
) -> Result<(), FrameError> {
    loop {
        let (header, request_pdu) = match frame::read_frame(&mut socket).await? {
            Some(frame) => frame,
            None => return Ok(()),
        };

        if header.unit_id != unit_id {
            debug!(
                "serving request addressed to unit {} on unit {} (single-unit pass-through)",
                header.unit_id, unit_id
            );
        }

        let response_pdu = match pdu::decode_request(&request_pdu) {
            Ok(request) => {
                debug!(
                    "request {:?} (transaction {})",
                    request.function_code(),
                    header.transaction_id
                );
                match dispatch(&store, &request) {
                    Ok(response) => pdu::encode_response(&response),
                    Err(code) => {
                        error!("request {:?} failed: {:?}", request.function_code(), code);
                        pdu::encode_exception(request.function_code().as_u8(), code)
                    }
                }
            }
            Err(err) => {
                // The frame layer guarantees a non-empty PDU, so the function
                // code byte is always there to mirror into the exception.
                let function = request_pdu[0] & 0x7F;
                error!("rejecting request with function 0x{:02X}: {}", function, err);
                pdu::encode_exception(function, err.exception_code())
            }
        };

        frame::write_frame(&mut socket, header.transaction_id, header.unit_id, &response_pdu)
            .await?;
    }
}

/// Route a decoded request to the register store.
fn dispatch(store: &RegisterStore, request: &Request) -> Result<Response, ExceptionCode> {
    match request {
        Request::ReadCoils { address, quantity } => {
            store.read_bits(BitBank::Coil, *address, *quantity).map(Response::ReadCoils)
        }
        Request::ReadDiscreteInputs { address, quantity } => store
            .read_bits(BitBank::DiscreteInput, *address, *quantity)
            .map(Response::ReadDiscreteInputs),
        Request::ReadHoldingRegisters { address, quantity } => store
            .read_words(WordBank::Holding, *address, *quantity)
            .map(Response::ReadHoldingRegisters),
        Request::ReadInputRegisters { address, quantity } => store
            .read_words(WordBank::Input, *address, *quantity)
            .map(Response::ReadInputRegisters),
        Request::WriteSingleCoil { address, value } => store
            .write_bits(BitBank::Coil, *address, std::slice::from_ref(value))
            .map(|_| Response::WriteSingleCoil { address: *address, value: *value }),
        Request::WriteSingleRegister { address, value } => store
            .write_words(WordBank::Holding, *address, std::slice::from_ref(value))
            .map(|_| Response::WriteSingleRegister { address: *address, value: *value }),
        Request::WriteMultipleCoils { address, values } => {
            store.write_bits(BitBank::Coil, *address, values).map(|_| Response::WriteMultipleCoils {
                address: *address,
                quantity: values.len() as u16,
            })
        }
        Request::WriteMultipleRegisters { address, values } => store
            .write_words(WordBank::Holding, *address, values)
            .map(|_| Response::WriteMultipleRegisters {
                address: *address,
                quantity: values.len() as u16,
            }),
    }
}
