//! Command codec: symmetric encryption of protocol messages.
//!
//! Messages are sealed with XChaCha20-Poly1305 under a key derived from the
//! shared secret (SHA-256). The 24-byte nonce is derived from the key and the
//! plaintext, so sealing the same message twice yields the same bytes, and is
//! sent in front of the ciphertext:
//!
//! ```text
//! nonce (24) ‖ ciphertext ‖ tag (16)
//! ```

use std::fmt;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::error::CodecError;

const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;
const NONCE_DOMAIN: &[u8] = b"toad/smartplug/nonce";

/// Encrypts and decrypts protocol messages with a shared key.
#[derive(Clone)]
pub struct Codec {
    key: [u8; 32],
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

impl Codec {
    /// Derive a codec from the shared secret.
    #[must_use]
    pub fn new(shared_key: &str) -> Self {
        Self {
            key: Sha256::digest(shared_key.as_bytes()).into(),
        }
    }

    /// Seal `plaintext`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encryption`] if the cipher rejects the input.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        let nonce = self.nonce_for(plaintext);
        let sealed = self
            .cipher()
            .encrypt(&nonce, plaintext)
            .map_err(|_| CodecError::Encryption)?;
        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Open bytes produced by [`Codec::encrypt`] under the same key.
    ///
    /// # Errors
    ///
    /// [`CodecError::Truncated`] when `data` cannot hold a nonce and a tag,
    /// [`CodecError::Decryption`] when authentication fails.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(CodecError::Truncated { len: data.len() });
        }
        let (nonce, sealed) = data.split_at(NONCE_LEN);
        self.cipher()
            .decrypt(XNonce::from_slice(nonce), sealed)
            .map_err(|_| CodecError::Decryption)
    }

    /// Serialize `value` as JSON and seal it.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Json`] if `value` cannot be serialized, or the
    /// errors of [`Codec::encrypt`].
    pub fn encrypt_json<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let plaintext = serde_json::to_vec(value).map_err(CodecError::Json)?;
        self.encrypt(&plaintext)
    }

    /// Open `data` and parse the plaintext as JSON.
    ///
    /// # Errors
    ///
    /// The errors of [`Codec::decrypt`], or [`CodecError::Json`] when the
    /// plaintext is not a valid `T`.
    pub fn decrypt_json<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        let plaintext = self.decrypt(data)?;
        serde_json::from_slice(&plaintext).map_err(CodecError::Json)
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(&self.key.into())
    }

    fn nonce_for(&self, plaintext: &[u8]) -> XNonce {
        let digest = Sha256::new()
            .chain_update(NONCE_DOMAIN)
            .chain_update(self.key)
            .chain_update(plaintext)
            .finalize();
        XNonce::clone_from_slice(&digest[..NONCE_LEN])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toad_domain::relay::{DeviceCommand, RelayState};

    /// Bytes that no encryption produced, spread over every byte value.
    fn scrambled(len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| u8::try_from((i * 31 + 7) % 256).unwrap())
            .collect()
    }

    #[test]
    fn should_decrypt_what_it_encrypts() {
        let codec = Codec::new("secret");
        let samples: Vec<Vec<u8>> = vec![
            Vec::new(),
            b"hello plug".to_vec(),
            (0..=255_u8).collect(),
            vec![0xff; 64 * 1024],
            scrambled(1),
            scrambled(17),
            scrambled(1_000),
            scrambled(4_099),
        ];

        for plaintext in samples {
            let sealed = codec.encrypt(&plaintext).unwrap();
            assert_eq!(codec.decrypt(&sealed).unwrap(), plaintext, "len {}", plaintext.len());
        }
    }

    #[test]
    fn should_reject_bytes_not_produced_by_encrypt() {
        let codec = Codec::new("secret");

        for len in [NONCE_LEN + TAG_LEN, 41, 64, 256, 2_048] {
            let err = codec.decrypt(&scrambled(len)).unwrap_err();
            assert!(matches!(err, CodecError::Decryption), "len {len}");
            let err = codec.decrypt(&vec![0_u8; len]).unwrap_err();
            assert!(matches!(err, CodecError::Decryption), "zeroed len {len}");
        }
    }

    #[test]
    fn should_not_leak_plaintext() {
        let codec = Codec::new("secret");
        let sealed = codec.encrypt(b"set_relay_state").unwrap();

        assert_eq!(sealed.len(), NONCE_LEN + b"set_relay_state".len() + TAG_LEN);
        assert!(
            !sealed
                .windows(b"relay".len())
                .any(|window| window == b"relay")
        );
    }

    #[test]
    fn should_encrypt_deterministically() {
        let codec = Codec::new("secret");
        assert_eq!(codec.encrypt(b"same").unwrap(), codec.encrypt(b"same").unwrap());
        assert_ne!(codec.encrypt(b"same").unwrap(), codec.encrypt(b"other").unwrap());
    }

    #[test]
    fn should_reject_wrong_key() {
        let sealed = Codec::new("secret").encrypt(b"hello").unwrap();

        let err = Codec::new("other").decrypt(&sealed).unwrap_err();

        assert!(matches!(err, CodecError::Decryption));
    }

    #[test]
    fn should_reject_tampered_bytes() {
        let codec = Codec::new("secret");
        let mut sealed = codec.encrypt(b"hello").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;

        assert!(matches!(codec.decrypt(&sealed), Err(CodecError::Decryption)));
    }

    #[test]
    fn should_reject_truncated_input() {
        let codec = Codec::new("secret");

        assert!(matches!(
            codec.decrypt(&[0_u8; 10]),
            Err(CodecError::Truncated { len: 10 })
        ));
        assert!(matches!(
            codec.decrypt(&[]),
            Err(CodecError::Truncated { len: 0 })
        ));
    }

    #[test]
    fn should_carry_device_command_as_json() {
        let codec = Codec::new("secret");
        let command = DeviceCommand::set_relay_state(RelayState::On);

        let sealed = codec.encrypt_json(&command).unwrap();
        let plaintext = codec.decrypt(&sealed).unwrap();

        assert_eq!(plaintext, br#"{"system":{"set_relay_state":{"state":1}}}"#);
        assert_eq!(codec.decrypt_json::<DeviceCommand>(&sealed).unwrap(), command);
    }

    #[test]
    fn should_report_non_json_plaintext() {
        let codec = Codec::new("secret");
        let sealed = codec.encrypt(b"not json").unwrap();

        let err = codec.decrypt_json::<serde_json::Value>(&sealed).unwrap_err();

        assert!(matches!(err, CodecError::Json(_)));
    }
}
