//! Age encryption/decryption utilities.
//!
//! Two modes are used:
//! - passphrase (scrypt) encryption wraps key material under the user's
//!   password
//! - X25519 encryption protects the index and item content under an
//!   unlocked key

use std::io::{Read, Write};
use std::iter;

use secrecy::SecretString;

use crate::error::{Result, VaultError};

fn finish(encryptor: age::Encryptor, data: &[u8]) -> Result<Vec<u8>> {
    let mut encrypted = Vec::new();
    let mut writer = encryptor
        .wrap_output(&mut encrypted)
        .map_err(|e| VaultError::Crypto(format!("Failed to create encryptor: {}", e)))?;

    writer
        .write_all(data)
        .map_err(|e| VaultError::Crypto(format!("Encryption write failed: {}", e)))?;

    writer
        .finish()
        .map_err(|e| VaultError::Crypto(format!("Encryption finish failed: {}", e)))?;

    Ok(encrypted)
}

fn read_all<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    let mut decrypted = Vec::new();
    reader
        .read_to_end(&mut decrypted)
        .map_err(|e| VaultError::Crypto(format!("Failed to read decrypted data: {}", e)))?;
    Ok(decrypted)
}

/// Encrypt `data` under `password` using age's scrypt recipient.
pub fn encrypt_with_password(data: &[u8], password: &str) -> Result<Vec<u8>> {
    let encryptor =
        age::Encryptor::with_user_passphrase(SecretString::from(password.to_string()));
    finish(encryptor, data)
}

/// Decrypt data produced by `encrypt_with_password`.
///
/// # Errors
///
/// Returns `VaultError::InvalidPassword` if the password does not match,
/// and `VaultError::Crypto` if the data is corrupted.
pub fn decrypt_with_password(encrypted_data: &[u8], password: &str) -> Result<Vec<u8>> {
    let decryptor = age::Decryptor::new(encrypted_data)
        .map_err(|e| VaultError::Crypto(format!("Failed to create decryptor: {}", e)))?;

    let identity = age::scrypt::Identity::new(SecretString::from(password.to_string()));
    let reader = decryptor
        .decrypt(iter::once(&identity as &dyn age::Identity))
        .map_err(|e| match e {
            age::DecryptError::NoMatchingKeys
            | age::DecryptError::DecryptionFailed
            | age::DecryptError::KeyDecryptionFailed => VaultError::InvalidPassword,
            _ => VaultError::Crypto(format!("Decryption failed: {}", e)),
        })?;

    read_all(reader)
}

/// Encrypt `data` to a single X25519 recipient.
pub fn encrypt_to(data: &[u8], recipient: &age::x25519::Recipient) -> Result<Vec<u8>> {
    let encryptor = age::Encryptor::with_recipients(iter::once(recipient as &dyn age::Recipient))
        .map_err(|e| VaultError::Crypto(format!("Failed to create encryptor: {}", e)))?;
    finish(encryptor, data)
}

/// Decrypt data produced by `encrypt_to` with the matching identity.
pub fn decrypt_with(encrypted_data: &[u8], identity: &age::x25519::Identity) -> Result<Vec<u8>> {
    let decryptor = age::Decryptor::new(encrypted_data)
        .map_err(|e| VaultError::Crypto(format!("Failed to create decryptor: {}", e)))?;

    let reader = decryptor
        .decrypt(iter::once(identity as &dyn age::Identity))
        .map_err(|e| match e {
            age::DecryptError::NoMatchingKeys => {
                VaultError::Crypto("Data was not encrypted with this key".to_string())
            }
            _ => VaultError::Crypto(format!("Decryption failed: {}", e)),
        })?;

    read_all(reader)
}
