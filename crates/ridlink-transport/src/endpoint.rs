//! Remote endpoint model

use std::fmt;

/// Bonding state of an endpoint as reported by the platform
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PairingState {
    #[default]
    None,
    Pairing,
    Paired,
}

/// Capabilities the platform may withhold from the process
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Discover nearby endpoints
    Scan,
    /// Open streams and bond with endpoints
    Connect,
}

impl Permission {
    pub fn name(self) -> &'static str {
        match self {
            Permission::Scan => "Scan",
            Permission::Connect => "Connect",
        }
    }
}

/// A device the manager can open a byte stream to
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub name: Option<String>,
    /// Stable platform address (MAC, host:port, ...)
    pub address: String,
    pub pairing: PairingState,
}

impl Endpoint {
    pub fn new(name: Option<String>, address: impl Into<String>) -> Self {
        Endpoint {
            name,
            address: address.into(),
            pairing: PairingState::None,
        }
    }

    pub fn named(name: &str, address: impl Into<String>) -> Self {
        Self::new(Some(name.to_string()), address)
    }

    pub fn with_pairing(mut self, pairing: PairingState) -> Self {
        self.pairing = pairing;
        self
    }

    pub fn is_paired(&self) -> bool {
        self.pairing == PairingState::Paired
    }

    /// Name if known, otherwise the address
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) if !name.is_empty() => name,
            _ => &self.address,
        }
    }

    pub fn name_starts_with(&self, prefix: &str) -> bool {
        self.name.as_deref().is_some_and(|n| n.starts_with(prefix))
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Endpoint({} @ {}, {:?})", self.display_name(), self.address, self.pairing)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
