use std::{net::Ipv4Addr, time::Duration};

use thiserror::Error as ThisError;

pub type OpaqueError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(ThisError, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid network {input:?}: {reason}")]
    InvalidRange { input: String, reason: String },
    #[error("interface {0} not found")]
    InterfaceNotFound(String),
    #[error("interface {0} has no IPv4 network configured")]
    NoIpv4Network(String),
    #[error("invalid sweep configuration: {0}")]
    InvalidConfig(String),
    #[error("probe for {target_ip} could not be run, reason: {reason}")]
    ProbeUnavailable { target_ip: Ipv4Addr, reason: String },
    #[error("probe for {target_ip} timed out after {timeout:?}")]
    ProbeTimeout {
        target_ip: Ipv4Addr,
        timeout: Duration,
    },
    /// Any other failure of a custom [`crate::probe::ReachabilityCheck`]. The
    /// host is reported down like for [`Error::ProbeUnavailable`].
    #[error("{0}")]
    Opaque(#[from] OpaqueError),
}

impl Error {
    /// Whether the error was raised before any probe was issued.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRange { .. }
                | Error::InterfaceNotFound(_)
                | Error::NoIpv4Network(_)
                | Error::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
