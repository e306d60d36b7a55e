use crate::error::PaymentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// URI scheme token stripped from optical code payloads.
pub const OPTICAL_SCHEME: &str = "ethereum:";

const ADDRESS_HEX_LEN: usize = 40;

/// A counterparty or wallet address: `0x` followed by exactly 40 hex chars.
///
/// Stored normalized to lowercase so equality and map lookups are
/// case-insensitive, matching how candidates arrive from the two discovery
/// channels in mixed case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(s: &str) -> Result<Self, PaymentError> {
        let s = s.trim();
        if Self::is_valid(s) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(PaymentError::Validation(format!(
                "not a valid address: {s:?}"
            )))
        }
    }

    /// The strict address-format predicate used to validate discovery
    /// candidates: fixed `0x` prefix, fixed-length hexadecimal body.
    pub fn is_valid(s: &str) -> bool {
        let Some(body) = s.strip_prefix("0x") else {
            return false;
        };
        body.len() == ADDRESS_HEX_LEN && body.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Extracts an address from an optical code payload.
    ///
    /// The payload is a UTF-8 string, optionally prefixed with the
    /// `ethereum:` scheme token (any case) and optionally followed by
    /// `@`-delimited parameters. Only the address-shaped prefix before `@`
    /// is considered; anything that fails validation yields `None`.
    pub fn from_optical_payload(payload: &str) -> Option<Self> {
        let payload = payload.trim();
        // Byte-wise prefix compare: the payload is arbitrary UTF-8 and must
        // not be sliced at a non-boundary. A matching prefix is pure ASCII,
        // so the tail starts on a char boundary.
        let scheme_len = OPTICAL_SCHEME.len();
        let rest = if payload.len() >= scheme_len
            && payload.as_bytes()[..scheme_len].eq_ignore_ascii_case(OPTICAL_SCHEME.as_bytes())
        {
            &payload[scheme_len..]
        } else {
            payload
        };
        let candidate = rest.split('@').next().unwrap_or(rest);
        Self::parse(candidate).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 20 raw address bytes, without the `0x` prefix.
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        // Infallible: the constructor guarantees 40 lowercase hex chars.
        if let Ok(bytes) = hex::decode(&self.0[2..]) {
            out.copy_from_slice(&bytes);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; 20]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Shortened `0x1234...abcd` form for step messages and logs.
    pub fn short(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = PaymentError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

/// A confirmed transaction id as reported by the chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub String);

impl TxId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> String {
        if self.0.len() > 10 {
            format!("{}...", &self.0[..10])
        } else {
            self.0.clone()
        }
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
