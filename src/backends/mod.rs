// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera capture and decoding
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        Session controller (app layer)        │
//! └────────────────────┬────────────────────────┘
//!                      │ DecodeEngine
//! ┌────────────────────┴────────────────────────┐
//! │  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │ PipeWire capture │  │ Scripted engine │  │
//! │  │  + rqrr decoder  │  │ (demo / tests)  │  │
//! │  └──────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - [`camera`]: device enumeration, capture sessions and decode events

pub mod camera;
