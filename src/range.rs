use std::{
    fmt,
    net::{IpAddr, Ipv4Addr},
    str::FromStr,
};

use ipnet::Ipv4Net;
use pnet::datalink::{self, NetworkInterface};

use crate::error::{Error, Result};

/// A validated IPv4 network to sweep.
///
/// Parsing is lenient about host bits (`192.168.1.77/24` becomes
/// `192.168.1.0/24`) and treats a bare address as a `/32`. Anything else that
/// is not an IPv4 CIDR is rejected with [`Error::InvalidRange`].
///
/// # Example
/// ```
/// use ping_sweep::range::AddressRange;
///
/// let range: AddressRange = "10.0.0.0/30".parse().unwrap();
/// let hosts: Vec<_> = range.hosts().collect();
/// assert_eq!(hosts.len(), 2);
/// assert_eq!(range.host_count(), 2);
/// ```
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct AddressRange {
    net: Ipv4Net,
}

impl AddressRange {
    /// Creates a range from a network address and prefix length.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRange`] if the prefix is longer than 32 bits.
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        let net = Ipv4Net::new(addr, prefix_len).map_err(|err| Error::InvalidRange {
            input: format!("{}/{}", addr, prefix_len),
            reason: err.to_string(),
        })?;
        Ok(Self { net: net.trunc() })
    }

    /// Derives the range from the first IPv4 network configured on a local interface.
    ///
    /// # Errors
    /// Returns [`Error::InterfaceNotFound`] if no interface has the given name and
    /// [`Error::NoIpv4Network`] if it carries no IPv4 address.
    pub fn from_interface(interface_name: &str) -> Result<Self> {
        let interface = datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == interface_name)
            .ok_or_else(|| Error::InterfaceNotFound(interface_name.into()))?;
        Self::from_network_interface(&interface)
    }

    fn from_network_interface(interface: &NetworkInterface) -> Result<Self> {
        let net = interface
            .ips
            .iter()
            .find(|net| net.is_ipv4())
            .ok_or_else(|| Error::NoIpv4Network(interface.name.clone()))?;
        match net.ip() {
            IpAddr::V4(ipv4) => Self::new(ipv4, net.prefix()),
            IpAddr::V6(_) => Err(Error::NoIpv4Network(interface.name.clone())),
        }
    }

    pub fn network(&self) -> Ipv4Addr {
        self.net.network()
    }

    pub fn prefix_len(&self) -> u8 {
        self.net.prefix_len()
    }

    /// Iterates over the usable host addresses.
    ///
    /// Network and broadcast addresses are skipped for prefixes shorter than 31.
    /// A `/31` yields both of its addresses and a `/32` its single address.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        self.net.hosts()
    }

    pub fn host_count(&self) -> u64 {
        let size = 1u64 << (32 - u32::from(self.net.prefix_len()));
        if size > 2 {
            size - 2
        } else {
            size
        }
    }
}

impl FromStr for AddressRange {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = |reason: String| Error::InvalidRange {
            input: input.into(),
            reason,
        };
        if let Ok(net) = trimmed.parse::<Ipv4Net>() {
            return Ok(Self { net: net.trunc() });
        }
        if let Ok(addr) = trimmed.parse::<Ipv4Addr>() {
            return Self::new(addr, 32);
        }
        let (addr, prefix) = trimmed.split_once('/').unwrap_or((trimmed, ""));
        if addr.parse::<IpAddr>().is_ok_and(|ip| ip.is_ipv6()) {
            return Err(invalid("IPv6 networks are not supported".into()));
        }
        if addr.parse::<Ipv4Addr>().is_err() {
            return Err(invalid(format!("{:?} is not an IPv4 address", addr)));
        }
        Err(invalid(format!(
            "{:?} is not a prefix length between 0 and 32",
            prefix
        )))
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.net)
    }
}

impl From<Ipv4Net> for AddressRange {
    fn from(net: Ipv4Net) -> Self {
        Self { net: net.trunc() }
    }
}
