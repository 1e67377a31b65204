use lettre::message::Mailbox;
use serde::Deserialize;

use crate::error::ConfigError;

/// A mailbox as written in configuration.
///
/// Either a plain string (`"ops@example.com"`, `"Ops <ops@example.com>"`) or a
/// table with a display name and an address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Address {
    Plain(String),
    Named {
        #[serde(default)]
        name: Option<String>,
        address: String,
    },
}

impl Address {
    pub(crate) fn to_mailbox(&self, field: &'static str) -> Result<Mailbox, ConfigError> {
        let invalid = |value: &str| ConfigError::InvalidAddress {
            field,
            value: value.to_string(),
        };

        match self {
            Self::Plain(value) => value.trim().parse().map_err(|_| invalid(value)),
            Self::Named { name, address } => address
                .trim()
                .parse()
                .map(|email| Mailbox::new(name.clone(), email))
                .map_err(|_| invalid(address)),
        }
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::Plain(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self::Plain(value)
    }
}

/// One recipient or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(Address),
    Many(Vec<Address>),
}

impl Recipients {
    pub fn iter(&self) -> std::slice::Iter<'_, Address> {
        match self {
            Self::One(address) => std::slice::from_ref(address).iter(),
            Self::Many(addresses) => addresses.iter(),
        }
    }
}

impl From<Address> for Recipients {
    fn from(value: Address) -> Self {
        Self::One(value)
    }
}

impl From<&str> for Recipients {
    fn from(value: &str) -> Self {
        Self::One(value.into())
    }
}

impl From<String> for Recipients {
    fn from(value: String) -> Self {
        Self::One(value.into())
    }
}

impl From<Vec<Address>> for Recipients {
    fn from(value: Vec<Address>) -> Self {
        Self::Many(value)
    }
}
