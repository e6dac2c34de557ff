//! AES-256-CBC envelope encryption for secure-mode webhook payloads.
//!
//! Each call draws a fresh 16-byte IV from the OS RNG and encrypts with
//! PKCS#7 padding, so the same plaintext never encrypts to the same output.
//!
//! Wire format: `base64( {"iv": base64(iv), "value": base64(ciphertext)} )`.
//!
//! SECURITY: error messages never contain plaintext or key material.

use aes::Aes256;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use larkit_core::crypto::Encrypter;
use larkit_types::error::KernelError;
use larkit_types::webhook::EncryptedEnvelope;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Key size for AES-256 (256 bits / 32 bytes).
pub const KEY_SIZE: usize = 32;
/// IV size for CBC mode (one AES block).
pub const IV_SIZE: usize = 16;

/// Prefix marking a base64-encoded key in configuration.
const BASE64_KEY_PREFIX: &str = "base64:";

#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    iv: String,
    value: String,
}

/// Symmetric cipher holding the process-wide key.
pub struct AesCbcEncrypter {
    key: [u8; KEY_SIZE],
}

impl AesCbcEncrypter {
    /// Create an encrypter from a raw 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self, KernelError> {
        let key: [u8; KEY_SIZE] = key.try_into().map_err(|_| {
            KernelError::EncryptFailure(format!(
                "key must be {KEY_SIZE} bytes, got {}",
                key.len()
            ))
        })?;
        Ok(Self { key })
    }

    /// Create an encrypter from a configured key string.
    ///
    /// `base64:<data>` is decoded first; any other value is used as raw bytes.
    pub fn from_key_string(raw: &str) -> Result<Self, KernelError> {
        match raw.strip_prefix(BASE64_KEY_PREFIX) {
            Some(encoded) => {
                let key = STANDARD.decode(encoded.trim()).map_err(|_| {
                    KernelError::EncryptFailure("encryption key is not valid base64".into())
                })?;
                Self::new(&key)
            }
            None => Self::new(raw.as_bytes()),
        }
    }

    /// Encrypt bytes under a fresh random IV.
    pub fn encrypt_envelope(&self, plaintext: &[u8]) -> Result<EncryptedEnvelope, KernelError> {
        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut iv);

        let cipher = Aes256CbcEnc::new_from_slices(&self.key, &iv)
            .map_err(|_| KernelError::EncryptFailure("invalid key or IV length".into()))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        Ok(EncryptedEnvelope {
            iv: iv.to_vec(),
            ciphertext,
        })
    }

    /// Decrypt an envelope produced by [`encrypt_envelope`](Self::encrypt_envelope).
    pub fn decrypt_envelope(&self, envelope: &EncryptedEnvelope) -> Result<Vec<u8>, KernelError> {
        let cipher = Aes256CbcDec::new_from_slices(&self.key, &envelope.iv)
            .map_err(|_| KernelError::DecryptFailure("invalid IV length".into()))?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&envelope.ciphertext)
            .map_err(|_| KernelError::DecryptFailure("bad padding or wrong key".into()))
    }

    /// Serialize an envelope into its transport-safe string form.
    pub fn encode_envelope(envelope: &EncryptedEnvelope) -> Result<String, KernelError> {
        let wire = WireEnvelope {
            iv: STANDARD.encode(&envelope.iv),
            value: STANDARD.encode(&envelope.ciphertext),
        };
        let json = serde_json::to_vec(&wire)
            .map_err(|e| KernelError::EncryptFailure(format!("envelope serialization: {e}")))?;
        Ok(STANDARD.encode(json))
    }

    /// Parse the transport-safe string form back into an envelope.
    pub fn decode_envelope(payload: &str) -> Result<EncryptedEnvelope, KernelError> {
        let json = STANDARD
            .decode(payload.trim())
            .map_err(|_| KernelError::DecryptFailure("payload is not valid base64".into()))?;
        let wire: WireEnvelope = serde_json::from_slice(&json)
            .map_err(|_| KernelError::DecryptFailure("payload is not a valid envelope".into()))?;
        let iv = STANDARD
            .decode(&wire.iv)
            .map_err(|_| KernelError::DecryptFailure("IV is not valid base64".into()))?;
        let ciphertext = STANDARD
            .decode(&wire.value)
            .map_err(|_| KernelError::DecryptFailure("value is not valid base64".into()))?;
        Ok(EncryptedEnvelope { iv, ciphertext })
    }
}

impl Encrypter for AesCbcEncrypter {
    fn encrypt(&self, plaintext: &str) -> Result<String, KernelError> {
        let envelope = self.encrypt_envelope(plaintext.as_bytes())?;
        Self::encode_envelope(&envelope)
    }

    fn decrypt(&self, payload: &str) -> Result<String, KernelError> {
        let envelope = Self::decode_envelope(payload)?;
        let plaintext = self.decrypt_envelope(&envelope)?;
        String::from_utf8(plaintext)
            .map_err(|_| KernelError::DecryptFailure("plaintext is not valid UTF-8".into()))
    }
}

impl std::fmt::Debug for AesCbcEncrypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesCbcEncrypter")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    fn encrypter() -> AesCbcEncrypter {
        AesCbcEncrypter::from_key_string(KEY).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let enc = encrypter();
        let long = "x".repeat(1000);
        for plaintext in ["", "hello", "<xml><Content>你好</Content></xml>", long.as_str()] {
            let payload = enc.encrypt(plaintext).unwrap();
            assert_eq!(enc.decrypt(&payload).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_wire_format_is_base64_of_json() {
        let payload = encrypter().encrypt("hello").unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(&payload).unwrap()).unwrap();
        let iv = STANDARD.decode(json["iv"].as_str().unwrap()).unwrap();
        let value = STANDARD.decode(json["value"].as_str().unwrap()).unwrap();
        assert_eq!(iv.len(), IV_SIZE);
        assert_eq!(value.len(), 16);
    }

    #[test]
    fn test_random_iv_per_call() {
        let enc = encrypter();
        let a = enc.encrypt("same").unwrap();
        let b = enc.encrypt("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_key_length() {
        let err = AesCbcEncrypter::new(b"short").unwrap_err();
        assert!(matches!(err, KernelError::EncryptFailure(_)));
        assert!(!err.to_string().contains("short"));
    }

    #[test]
    fn test_base64_key() {
        let encoded = format!("base64:{}", STANDARD.encode(KEY));
        let a = AesCbcEncrypter::from_key_string(&encoded).unwrap();
        let payload = a.encrypt("hi").unwrap();
        assert_eq!(encrypter().decrypt(&payload).unwrap(), "hi");
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let enc = encrypter();
        let mut envelope = enc.encrypt_envelope(b"attack at dawn").unwrap();
        envelope.ciphertext.pop();
        let tampered = AesCbcEncrypter::encode_envelope(&envelope).unwrap();
        assert!(matches!(
            enc.decrypt(&tampered),
            Err(KernelError::DecryptFailure(_))
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let payload = encrypter().encrypt("attack at dawn").unwrap();
        let other = AesCbcEncrypter::new(&[7u8; KEY_SIZE]).unwrap();
        assert!(matches!(
            other.decrypt(&payload),
            Err(KernelError::DecryptFailure(_))
        ));
    }

    #[test]
    fn test_structural_garbage_fails() {
        let enc = encrypter();
        let short_iv = STANDARD.encode(r#"{"iv":"AAAA","value":"AAAA"}"#);
        for payload in ["not base64!!", "bm90IGpzb24=", short_iv.as_str()] {
            assert!(matches!(
                enc.decrypt(payload),
                Err(KernelError::DecryptFailure(_))
            ));
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", encrypter());
        assert!(!debug.contains(KEY));
    }
}
