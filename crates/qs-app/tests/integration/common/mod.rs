//! Test doubles for the transport.
//!
//! - `mock_ws`: Real WebSocket server driven by the test
//! - `scripted`: In-process `Connector` replaying scripted session steps

#![allow(dead_code)]

pub mod mock_ws;
pub mod scripted;
