//! API Server Module
//!
//! HTTP surface consumed by the transport layer: `/fund`, `/relay` and
//! `/checkPending`. Handlers validate the request shape, resolve the
//! target network and delegate to the orchestration flows; internal
//! failure taxonomy maps onto distinct HTTP statuses.

mod server;

pub use server::{AppState, Server};
