use hmac::Hmac;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::errors::{AuthError, Result};

const HASH_ROUNDS: u32 = 10_000;
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

/// 加盐的 PBKDF2-HMAC-SHA256 摘要 (十六进制存储)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash {
    pub salt: String,
    pub digest: String,
}

impl PasswordHash {
    pub fn new(password: &str) -> Result<Self> {
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill(&mut salt);

        let digest = derive(&salt, password)?;
        Ok(Self {
            salt: to_hex(&salt),
            digest: to_hex(&digest),
        })
    }

    pub fn verify(&self, password: &str) -> bool {
        let (Some(salt), Some(expected)) = (from_hex(&self.salt), from_hex(&self.digest)) else {
            return false;
        };

        match derive(&salt, password) {
            Ok(actual) => constant_time_eq(&actual, &expected),
            Err(_) => false,
        }
    }
}

fn derive(salt: &[u8], password: &str) -> Result<[u8; DIGEST_LEN]> {
    let mut out = [0u8; DIGEST_LEN];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, HASH_ROUNDS, &mut out)
        .map_err(|_| AuthError::Hash)?;
    Ok(out)
}

// 常数时间比较
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}
