// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Byte-level tests for the MBAP framing and exception behaviour
//!
//! These tests talk to the server over a raw TCP socket with handcrafted
//! frames, checking the exact response bytes: MBAP header mirroring,
//! exception responses that keep the connection open, and framing errors
//! that close it without a response.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;

use rust_modbus_sim::modbus::{ModbusTcpServer, RegisterStore};

async fn start_test_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let socket_addr = SocketAddr::from_str("127.0.0.1:0").unwrap();
    let store = Arc::new(RegisterStore::new(100, 100, 100, 100));
    let server = ModbusTcpServer::bind(socket_addr, store, 1).await.unwrap();
    let socket_addr = server.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            eprintln!("Server error: {}", e);
        }
    });

    time::sleep(Duration::from_millis(100)).await;
    (socket_addr, handle)
}

/// Send one request frame and read back one complete response frame.
async fn transact(stream: &mut TcpStream, request: &[u8]) -> Vec<u8> {
    stream.write_all(request).await.unwrap();

    let mut header = [0u8; 7];
    stream.read_exact(&mut header).await.unwrap();
    let length = usize::from(u16::from_be_bytes([header[4], header[5]]));

    let mut rest = vec![0u8; length - 1];
    stream.read_exact(&mut rest).await.unwrap();

    let mut frame = header.to_vec();
    frame.extend_from_slice(&rest);
    frame
}

#[tokio::test]
async fn read_holding_registers_response_bytes() {
    let (addr, _server) = start_test_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Read Holding Registers, address 0, count 3, transaction id 0x1234
    let request = [
        0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0x01, // MBAP
        0x03, 0x00, 0x00, 0x00, 0x03, // PDU
    ];
    let response = transact(&mut stream, &request).await;

    // Byte count 6, three zero registers, transaction id mirrored
    assert_eq!(
        response,
        vec![
            0x12, 0x34, 0x00, 0x00, 0x00, 0x09, 0x01, // MBAP
            0x03, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // PDU
        ]
    );
}

#[tokio::test]
async fn unit_id_is_echoed_even_when_it_mismatches() {
    let (addr, _server) = start_test_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // The server is configured as unit 1; address unit 0x11 anyway
    let request = [
        0xAB, 0xCD, 0x00, 0x00, 0x00, 0x06, 0x11, // MBAP
        0x03, 0x00, 0x00, 0x00, 0x01, // PDU
    ];
    let response = transact(&mut stream, &request).await;

    assert_eq!(&response[..7], &[0xAB, 0xCD, 0x00, 0x00, 0x00, 0x05, 0x11]);
    assert_eq!(&response[7..], &[0x03, 0x02, 0x00, 0x00]);
}

#[tokio::test]
async fn oversized_read_coils_count_yields_illegal_data_value() {
    let (addr, _server) = start_test_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Read Coils with count 0x07D1, one past the protocol ceiling
    let request = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, // MBAP
        0x01, 0x00, 0x00, 0x07, 0xD1, // PDU
    ];
    let response = transact(&mut stream, &request).await;
    assert_eq!(&response[7..], &[0x81, 0x03]);

    // The connection must survive the exception
    let request = [
        0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x01, // MBAP
        0x01, 0x00, 0x00, 0x00, 0x08, // PDU
    ];
    let response = transact(&mut stream, &request).await;
    assert_eq!(&response[7..], &[0x01, 0x01, 0x00]);
}

#[tokio::test]
async fn byte_count_mismatch_yields_illegal_data_value() {
    let (addr, _server) = start_test_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Write Multiple Registers declaring 2 registers but a byte count of 3
    let request = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x0A, 0x01, // MBAP
        0x10, 0x00, 0x00, 0x00, 0x02, 0x03, 0xAA, 0xBB, 0xCC, // PDU
    ];
    let response = transact(&mut stream, &request).await;
    assert_eq!(&response[7..], &[0x90, 0x03]);
}

#[tokio::test]
async fn unknown_function_code_yields_illegal_function() {
    let (addr, _server) = start_test_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Encapsulated Interface Transport (0x2B) is not part of the subset
    let request = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x01, // MBAP
        0x2B, 0x0E, 0x01, 0x00, // PDU
    ];
    let response = transact(&mut stream, &request).await;
    assert_eq!(&response[7..], &[0xAB, 0x01]);
}

#[tokio::test]
async fn write_single_coil_echoes_the_request_pdu() {
    let (addr, _server) = start_test_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let request = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, // MBAP
        0x05, 0x00, 0x02, 0xFF, 0x00, // PDU
    ];
    let response = transact(&mut stream, &request).await;
    assert_eq!(&response[7..], &request[7..]);
}

#[tokio::test]
async fn illegal_data_address_exception_bytes() {
    let (addr, _server) = start_test_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Read two holding registers starting at 99 in a 100-cell bank
    let request = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, // MBAP
        0x03, 0x00, 0x63, 0x00, 0x02, // PDU
    ];
    let response = transact(&mut stream, &request).await;
    assert_eq!(&response[7..], &[0x83, 0x02]);
}

#[tokio::test]
async fn non_zero_protocol_id_closes_the_connection_without_a_response() {
    let (addr, _server) = start_test_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Protocol id 0x0001 is a framing error
    let request = [
        0x00, 0x01, 0x00, 0x01, 0x00, 0x06, 0x01, // MBAP
        0x03, 0x00, 0x00, 0x00, 0x01, // PDU
    ];
    stream.write_all(&request).await.unwrap();

    // The server must close without writing anything back
    let mut buffer = [0u8; 16];
    let result = time::timeout(Duration::from_secs(2), stream.read(&mut buffer))
        .await
        .expect("server should close the connection");
    match result {
        Ok(0) => {}  // clean close
        Ok(read) => panic!("unexpected response bytes: {:?}", &buffer[..read]),
        Err(_) => {} // reset by peer, still no response
    }
}

#[tokio::test]
async fn garbage_length_field_closes_the_connection() {
    let (addr, _server) = start_test_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Length 0 cannot even hold the unit id + function code
    let request = [0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01];
    stream.write_all(&request).await.unwrap();

    let mut buffer = [0u8; 16];
    let result = time::timeout(Duration::from_secs(2), stream.read(&mut buffer))
        .await
        .expect("server should close the connection");
    match result {
        Ok(0) => {}
        Ok(read) => panic!("unexpected response bytes: {:?}", &buffer[..read]),
        Err(_) => {}
    }
}
