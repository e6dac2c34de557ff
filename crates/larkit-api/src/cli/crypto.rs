//! Signing and envelope CLI commands: sign, encrypt, decrypt.
//!
//! These operate on configuration only and never touch the token cache.

use anyhow::{Context, Result};
use console::style;

use larkit_core::crypto::{Encrypter, SignatureVerifier};
use larkit_infra::crypto::{AesCbcEncrypter, Sha1SignatureVerifier};

/// Print the signature a platform would send for `(token, timestamp, nonce)`.
pub fn sign(token: Option<&str>, timestamp: &str, nonce: &str, json: bool) -> Result<()> {
    let token = token.context("no webhook token: pass --token or set `token` / LARKIT_TOKEN")?;
    let signature = compute_signature(token, timestamp, nonce);

    if json {
        println!(
            "{}",
            serde_json::json!({"signature": signature, "timestamp": timestamp, "nonce": nonce})
        );
    } else {
        println!("{signature}");
    }
    Ok(())
}

pub fn encrypt(key: Option<&str>, plaintext: &str, json: bool) -> Result<()> {
    let payload = encrypter(key)?.encrypt(plaintext)?;
    if json {
        println!("{}", serde_json::json!({"payload": payload}));
    } else {
        println!("{payload}");
    }
    Ok(())
}

pub fn decrypt(key: Option<&str>, payload: &str, json: bool) -> Result<()> {
    let plaintext = encrypter(key)?.decrypt(payload)?;
    if json {
        println!("{}", serde_json::json!({"plaintext": plaintext}));
    } else {
        println!("{plaintext}");
    }
    Ok(())
}

fn compute_signature(token: &str, timestamp: &str, nonce: &str) -> String {
    Sha1SignatureVerifier::new().sign(&[token, timestamp, nonce])
}

fn encrypter(key: Option<&str>) -> Result<AesCbcEncrypter> {
    let key = key.with_context(|| {
        format!(
            "no encryption key: set `encryption_key` or {}",
            style("LARKIT_ENCRYPTION_KEY").yellow()
        )
    })?;
    Ok(AesCbcEncrypter::from_key_string(key)?)
}
