//! Sealed-record codec: AES-256-GCM encryption of credential entries.
//!
//! Plaintext records are msgpack-encoded, encrypted under a per-user key
//! with a random 96-bit nonce, and carried as base64 `{iv, ciphertext}`
//! envelopes, the shape exchanged with storage and chain backends. The
//! engine treats ciphertext as opaque bytes; nothing here inspects an
//! envelope except to open it.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ChainError, ChainResult};
use crate::record::{CredentialRecord, DecodedRecord, InvalidRecord, SealedBlob};

/// AES-GCM nonce size in bytes.
const NONCE_SIZE: usize = 12;

/// Symmetric key protecting a user's credential set (256-bit).
///
/// # Security
///
/// - The key is zeroized on drop to prevent memory leaks.
/// - The key is never logged or serialized; `Debug` redacts the bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EntryKey([u8; 32]);

impl EntryKey {
    /// Creates a key from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generates a new random key.
    ///
    /// # Panics
    ///
    /// Panics if the system's random number generator fails.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self(bytes)
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Generates a random AES-GCM nonce.
///
/// # Panics
///
/// Panics if the system's random number generator fails.
fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    getrandom::getrandom(&mut nonce).expect("getrandom failed");
    nonce
}

/// Seals one record into an encrypted envelope.
///
/// Only durable fields travel: the derived `next` pointer and any previously
/// attached envelope are stripped from the plaintext. Every call draws a
/// fresh nonce, so sealing the same record twice yields distinct
/// ciphertexts. The returned envelope is off-chain; committing it to a
/// ledger is the caller's business.
///
/// # Errors
///
/// - [`ChainError::SerializationError`] if plaintext encoding fails.
/// - [`ChainError::EncryptionFailed`] if the AEAD rejects the input.
///
/// # Panics
///
/// This function will not panic: the `expect` covers a condition that
/// cannot fail (key length is always 32 bytes by construction).
pub fn seal_record(key: &EntryKey, record: &CredentialRecord) -> ChainResult<SealedBlob> {
    let mut durable = record.clone();
    durable.next = None;
    durable.sealed = None;

    let mut plaintext = rmp_serde::to_vec_named(&durable)
        .map_err(|err| ChainError::serialization(err.to_string()))?;

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).expect("key length is always 32");
    let nonce_bytes = generate_nonce();
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_slice())
        .map_err(|_| ChainError::encryption("AES-256-GCM encryption failed"))?;
    plaintext.zeroize();

    Ok(SealedBlob {
        iv: BASE64.encode(nonce_bytes),
        ciphertext: BASE64.encode(ciphertext),
        on_chain: false,
    })
}

/// Opens one sealed envelope back into a record.
///
/// The envelope is attached to the returned record so later processing can
/// tell committed ciphertext apart from local state. Link invariants are
/// validated before the record is accepted.
///
/// # Errors
///
/// - [`ChainError::DecryptionFailed`] on bad base64, a wrong-sized nonce, or
///   AEAD authentication failure (wrong key or tampered data).
/// - [`ChainError::MalformedRecord`] when the plaintext does not decode into
///   a record satisfying the link invariants.
///
/// # Panics
///
/// This function will not panic: the `expect` covers a condition that
/// cannot fail (key length is always 32 bytes by construction).
pub fn open_record(key: &EntryKey, blob: &SealedBlob) -> ChainResult<CredentialRecord> {
    let nonce_bytes = BASE64
        .decode(&blob.iv)
        .map_err(|_| ChainError::decryption("iv is not valid base64"))?;
    if nonce_bytes.len() != NONCE_SIZE {
        return Err(ChainError::decryption("iv has the wrong length"));
    }
    let ciphertext = BASE64
        .decode(&blob.ciphertext)
        .map_err(|_| ChainError::decryption("ciphertext is not valid base64"))?;

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).expect("key length is always 32");
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut plaintext = cipher
        .decrypt(nonce, ciphertext.as_slice())
        .map_err(|_| ChainError::decryption("AES-256-GCM decryption failed"))?;

    let decoded = rmp_serde::from_slice::<CredentialRecord>(&plaintext)
        .map_err(|err| ChainError::malformed(err.to_string()));
    plaintext.zeroize();

    let mut record = decoded?;
    record.check_links()?;
    record.next = None;
    record.sealed = Some(blob.clone());
    Ok(record)
}

/// Opens a batch of sealed envelopes, tolerating individual failures.
///
/// A record that fails to decrypt or validate becomes
/// [`DecodedRecord::Invalid`], carrying the raw envelope, and the rest of
/// the batch continues; one corrupt entry never blocks the rest of a
/// user's credential set.
#[must_use]
pub fn decode_batch(key: &EntryKey, blobs: &[SealedBlob]) -> Vec<DecodedRecord> {
    blobs
        .iter()
        .map(|blob| match open_record(key, blob) {
            Ok(record) => DecodedRecord::Valid(record),
            Err(err) => {
                warn!(error = %err, "sealed record failed to open");
                DecodedRecord::Invalid(InvalidRecord {
                    sealed: blob.clone(),
                    reason: err.to_string(),
                })
            }
        })
        .collect()
}
