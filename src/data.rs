use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Legacy SPL token program.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
/// Token-2022 (token extensions) program.
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";

/// Native balances are in lamports, 1 SOL = 10^9 lamports.
pub const LAMPORTS_DECIMALS: u32 = 9;
pub const NATIVE_SYMBOL: &str = "SOL";

/// Number of fields a snapshot row must carry; anything past that is ignored.
pub const ROW_FIELDS: usize = 9;

/// mint[0..32], owner[32..64], amount[64..72]. Extensions come after and are ignored.
pub const TOKEN_ACCOUNT_LEN: usize = 72;

/// Encode any byte string in canonical (bitcoin alphabet) base58.
pub fn encode_base58(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "1".to_string();
    }
    bs58::encode(bytes).into_string()
}

/// 32-byte account identifier. We never need to parse these from text,
/// they only come out of token account payloads and get displayed in base58.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    /// Panics if `bytes` isn't exactly 32 long, callers slice fixed ranges.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut key = [0u8; 32];
        key.copy_from_slice(bytes);
        Self(key)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_base58(&self.0))
    }
}

/// One line of a `solana-snapshot-gpa` dump:
/// `pubkey, owner, data_len, lamports, slot, id, offset, write_version, data`.
/// Only `lamports` and `write_version` have to be numbers, the other bookkeeping
/// fields are carried as text so a garbled `slot` doesn't cost us the row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct AccountRow {
    pub pubkey: String,
    pub owner: String,
    pub data_len: String,
    pub lamports: u64,
    pub slot: String,
    pub id: String,
    pub offset: String,
    pub write_version: u64,
    pub data: String,
}

impl AccountRow {
    pub fn is_token_account(&self) -> bool {
        self.owner == TOKEN_PROGRAM_ID || self.owner == TOKEN_2022_PROGRAM_ID
    }
}

/// Latest known state of a wallet (or any non-token account).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NativeAccount {
    pub write_version: u64,
    pub lamports: u64,
}

/// Latest known state of a token account. `amount` is never zero: empty token
/// accounts are dropped before they get here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TokenAccount {
    pub write_version: u64,
    pub owner: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
}

/// What a row turned out to be once its owning program has been looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Classified {
    Native(NativeAccount),
    Token(TokenAccount),
}

/// Row level problems. None of these stop a run, the row is just skipped.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Row has {0} fields, expected at least 9")]
    TooFewFields(usize),
    #[error("Malformed row: {0}")]
    Malformed(#[from] csv::Error),
    #[error("Account data is not valid base64: {0}")]
    BadPayload(#[from] base64::DecodeError),
    #[error("Account data is {0} bytes long, a token account needs 72")]
    ShortPayload(usize),
}

#[cfg(test)]
mod tests {
    use super::{encode_base58, Pubkey};

    #[test]
    fn base58_known_values() {
        assert_eq!(encode_base58(&[]), "1");
        assert_eq!(encode_base58(&[0]), "1");
        assert_eq!(encode_base58(&[0, 0, 1]), "112");
        assert_eq!(encode_base58(&[57]), "z");
        assert_eq!(encode_base58(&[58]), "21");
        assert_eq!(encode_base58(b"hello world"), "StV1DL6CwTryKyV");
        // system program
        assert_eq!(
            Pubkey([0; 32]).to_string(),
            "11111111111111111111111111111111"
        );
    }

    #[test]
    fn base58_round_trip() {
        let mut samples = vec![[0u8; 32], [0xff; 32]];
        let mut seq = [0u8; 32];
        for (i, b) in seq.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(37).wrapping_add(11);
        }
        samples.push(seq);
        let mut leading = [0xa5u8; 32];
        leading[..5].copy_from_slice(&[0; 5]);
        samples.push(leading);

        for bytes in samples {
            let text = Pubkey(bytes).to_string();
            assert!(!text.contains(|c: char| "0OIl".contains(c)));
            let decoded = bs58::decode(&text).into_vec().unwrap();
            assert_eq!(decoded, bytes);
        }
    }

    #[test]
    fn token_program_owners() {
        let mut row = super::AccountRow {
            pubkey: "acct".into(),
            owner: super::TOKEN_PROGRAM_ID.into(),
            data_len: "165".into(),
            lamports: 0,
            slot: "1".into(),
            id: "0".into(),
            offset: "0".into(),
            write_version: 1,
            data: String::new(),
        };
        assert!(row.is_token_account());
        row.owner = super::TOKEN_2022_PROGRAM_ID.into();
        assert!(row.is_token_account());
        row.owner = "11111111111111111111111111111111".into();
        assert!(!row.is_token_account());
    }
}
