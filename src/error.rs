//! Unified error types for the homie32 lifecycle core.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! boot-mode loop's error handling uniform. Variants are `Copy` so they can
//! travel through tick code without allocation. The split mirrors the error
//! taxonomy of the device: fatal usage errors abort setup, rejected input is
//! reported to the peer, degraded conditions are logged and survived.

use core::fmt;

use crate::device::RegistryError;
use crate::ports::{NetError, StoreError};
use crate::publish::PublishError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A network-facing port (AP, DNS, HTTP, scan, station, broker) failed.
    Net(NetError),
    /// The configuration store failed.
    Store(StoreError),
    /// The node/property registry rejected an operation.
    Registry(RegistryError),
    /// A publish intent could not be completed.
    Publish(PublishError),
    /// Peripheral or mode initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Net(e) => write!(f, "net: {e}"),
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl From<NetError> for Error {
    fn from(e: NetError) -> Self {
        Self::Net(e)
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

impl From<PublishError> for Error {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
