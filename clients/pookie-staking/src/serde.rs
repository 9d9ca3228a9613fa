//! Deserializers for base58 public keys in settings files

use solana_program::pubkey::Pubkey;

pub mod serde_pubkey {
    use super::*;
    use serde::de::{self, Deserialize};
    use std::str::FromStr;

    pub fn deserialize<'de, D>(deser: D) -> std::result::Result<Pubkey, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let str = String::deserialize(deser)?;
        Pubkey::from_str(str.trim()).map_err(|_| de::Error::custom("invalid public key"))
    }
}

pub mod serde_opt_pubkey {
    use super::*;
    use serde::de::{self, Deserialize};
    use std::str::FromStr;

    /// Empty strings read as unset
    pub fn deserialize<'de, D>(deser: D) -> std::result::Result<Option<Pubkey>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match Option::<String>::deserialize(deser)? {
            Some(str) if !str.trim().is_empty() => Pubkey::from_str(str.trim())
                .map(Some)
                .map_err(|_| de::Error::custom("invalid public key")),
            _ => Ok(None),
        }
    }
}
