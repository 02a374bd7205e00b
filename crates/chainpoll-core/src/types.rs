//! Fixed-size EVM primitives and block identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// Decode exactly `N` bytes from hex, with an optional `0x`/`0X` prefix.
/// Upper, lower and mixed case digits are accepted.
fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.len() != N * 2 {
        return Err(ParseError::Length {
            expected: N * 2,
            actual: digits.len(),
        });
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
    Ok(out)
}

macro_rules! fixed_hex {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Length in bytes.
            pub const LEN: usize = $len;

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Lower-case `0x`-prefixed hex.
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_fixed::<$len>(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

fixed_hex!(
    /// A 20-byte EVM contract/account address.
    Address,
    20
);

fixed_hex!(
    /// A 32-byte word: an event topic, or a block hash.
    Topic,
    32
);

// ─── BlockNumberOrTag ────────────────────────────────────────────────────────

/// A block height, or one of the node-resolved block tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockNumberOrTag {
    Number(u64),
    Earliest,
    Latest,
    Pending,
    Safe,
    Finalized,
}

impl BlockNumberOrTag {
    /// The block number, if this is not a tag.
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl Default for BlockNumberOrTag {
    fn default() -> Self {
        Self::Latest
    }
}

impl From<u64> for BlockNumberOrTag {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl fmt::Display for BlockNumberOrTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "0x{n:x}"),
            Self::Earliest => write!(f, "earliest"),
            Self::Latest => write!(f, "latest"),
            Self::Pending => write!(f, "pending"),
            Self::Safe => write!(f, "safe"),
            Self::Finalized => write!(f, "finalized"),
        }
    }
}

impl FromStr for BlockNumberOrTag {
    type Err = ParseError;

    /// Accepts `0x`-prefixed hex (any case), plain decimal, or a tag name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ParseError::InvalidBlock(s.to_string());
        match s.to_ascii_lowercase().as_str() {
            "earliest" => return Ok(Self::Earliest),
            "latest" => return Ok(Self::Latest),
            "pending" => return Ok(Self::Pending),
            "safe" => return Ok(Self::Safe),
            "finalized" => return Ok(Self::Finalized),
            _ => {}
        }
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            u64::from_str_radix(hex, 16).map(Self::Number).map_err(|_| invalid())
        } else {
            s.parse::<u64>().map(Self::Number).map_err(|_| invalid())
        }
    }
}

impl Serialize for BlockNumberOrTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlockNumberOrTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BlockVisitor;

        impl<'de> de::Visitor<'de> for BlockVisitor {
            type Value = BlockNumberOrTag;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a block number (integer or hex string) or a block tag")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(BlockNumberOrTag::Number(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(BlockNumberOrTag::Number)
                    .map_err(|_| E::custom(format!("negative block number {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(BlockVisitor)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parse_is_case_insensitive() {
        let mixed: Address = "0x291D46AE055Dd592B8CC7DdBF232cc206CEfa975".parse().unwrap();
        let lower: Address = "0x291d46ae055dd592b8cc7ddbf232cc206cefa975".parse().unwrap();
        assert_eq!(mixed, lower);
        assert_eq!(mixed.to_hex(), "0x291d46ae055dd592b8cc7ddbf232cc206cefa975");
    }

    #[test]
    fn address_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(err, ParseError::Length { expected: 40, actual: 4 });
    }

    #[test]
    fn topic_rejects_non_hex() {
        let s = format!("0x{}", "zz".repeat(32));
        assert!(matches!(s.parse::<Topic>(), Err(ParseError::InvalidHex(_))));
    }

    #[test]
    fn topic_serializes_lowercase() {
        let t = Topic([0xAB; 32]);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(32)));
        let back: Topic = serde_json::from_str(&json.to_uppercase().replace("0X", "0x")).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn block_tag_parse() {
        assert_eq!("latest".parse::<BlockNumberOrTag>().unwrap(), BlockNumberOrTag::Latest);
        assert_eq!("Finalized".parse::<BlockNumberOrTag>().unwrap(), BlockNumberOrTag::Finalized);
        assert_eq!(
            "0x35e96FC".parse::<BlockNumberOrTag>().unwrap(),
            BlockNumberOrTag::Number(0x35e96fc)
        );
        assert_eq!("1234".parse::<BlockNumberOrTag>().unwrap(), BlockNumberOrTag::Number(1234));
        assert!("0xnope".parse::<BlockNumberOrTag>().is_err());
        assert!("".parse::<BlockNumberOrTag>().is_err());
    }

    #[test]
    fn block_number_serializes_minimal_hex() {
        let json = serde_json::to_string(&BlockNumberOrTag::Number(0x35e96fc)).unwrap();
        assert_eq!(json, "\"0x35e96fc\"");
        let json = serde_json::to_string(&BlockNumberOrTag::Latest).unwrap();
        assert_eq!(json, "\"latest\"");
    }

    #[test]
    fn block_number_deserializes_from_integer() {
        let b: BlockNumberOrTag = serde_json::from_str("56528396").unwrap();
        assert_eq!(b, BlockNumberOrTag::Number(56_528_396));
        assert!(serde_json::from_str::<BlockNumberOrTag>("-1").is_err());
    }
}
