//! Authenticated file encryption at rest.
//!
//! Files are encrypted in place with ChaCha20-Poly1305 under a key derived
//! from a passphrase. The on-disk format is a fixed magic, a random
//! per-file nonce, then ciphertext with the authentication tag, so
//! decrypting with the wrong key or tampered bytes fails loudly instead of
//! yielding garbage plaintext.
//!
//! Encryption preserves the file's modification time and records enough to
//! recover the plaintext length, which keeps the differ's unchanged-check
//! valid for destinations that are already encrypted at rest.

use crate::{Error, Result};
use chacha20poly1305::aead::rand_core::RngCore;
use chacha20poly1305::{
    aead::{Aead, KeyInit, OsRng},
    ChaCha20Poly1305, Nonce,
};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Marks a file as encrypted by this tool
const MAGIC: &[u8; 4] = b"CVB1";

/// Size of the ChaCha20-Poly1305 nonce in bytes
const NONCE_SIZE: usize = 12;

/// Size of the Poly1305 authentication tag in bytes
const TAG_SIZE: usize = 16;

/// Bytes added to a plaintext by encryption
const OVERHEAD: usize = MAGIC.len() + NONCE_SIZE + TAG_SIZE;

/// Symmetric cipher for in-place file encryption
pub struct FileCipher {
    cipher: ChaCha20Poly1305,
}

impl FileCipher {
    /// Derive a cipher from a passphrase via SHA-256.
    ///
    /// An empty passphrase is a configuration error, never a silent no-op.
    pub fn from_passphrase(passphrase: &str) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(Error::configuration("encryption key must not be empty"));
        }
        let key = Sha256::digest(passphrase.as_bytes());
        let cipher = ChaCha20Poly1305::new_from_slice(key.as_slice())
            .map_err(|e| Error::configuration(format!("failed to create cipher: {e}")))?;
        Ok(Self { cipher })
    }

    /// Encrypt a file's bytes in place, preserving its modification time.
    ///
    /// Refuses to encrypt a file that already carries the encryption magic,
    /// so a file can never be silently wrapped twice.
    pub fn encrypt_file(&self, path: &Path) -> Result<()> {
        let plaintext = fs::read(path)?;
        if is_encrypted_bytes(&plaintext) {
            return Err(Error::Crypto {
                path: path.to_path_buf(),
                reason: "file is already encrypted".to_string(),
            });
        }

        let modified = fs::metadata(path)?.modified()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|_| Error::Crypto {
                path: path.to_path_buf(),
                reason: "encryption failed".to_string(),
            })?;

        let mut output = Vec::with_capacity(OVERHEAD + ciphertext.len() - TAG_SIZE);
        output.extend_from_slice(MAGIC);
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);
        fs::write(path, output)?;

        // Keep the pre-encryption mtime so reruns still classify the file
        // as unchanged
        fs::File::options()
            .write(true)
            .open(path)?
            .set_modified(modified)?;

        Ok(())
    }

    /// Decrypt a file's bytes in place.
    ///
    /// Fails for files without the encryption magic, truncated ciphertext,
    /// a wrong key, or tampered content.
    pub fn decrypt_file(&self, path: &Path) -> Result<()> {
        let data = fs::read(path)?;
        if data.len() < OVERHEAD || &data[..MAGIC.len()] != MAGIC {
            return Err(Error::Crypto {
                path: path.to_path_buf(),
                reason: "not an encrypted file".to_string(),
            });
        }

        let nonce = Nonce::from_slice(&data[MAGIC.len()..MAGIC.len() + NONCE_SIZE]);
        let ciphertext = &data[MAGIC.len() + NONCE_SIZE..];

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| Error::Crypto {
                path: path.to_path_buf(),
                reason: "decryption failed: invalid key or corrupted data".to_string(),
            })?;

        fs::write(path, plaintext)?;
        Ok(())
    }
}

fn is_encrypted_bytes(data: &[u8]) -> bool {
    data.len() >= OVERHEAD && &data[..MAGIC.len()] == MAGIC
}

/// Whether the file at `path` carries the encryption magic
pub fn is_encrypted(path: &Path) -> Result<bool> {
    Ok(is_encrypted_bytes(&read_prefix(path, OVERHEAD)?))
}

/// Plaintext-equivalent length of a file.
///
/// For files encrypted by [`FileCipher::encrypt_file`] this is the original
/// plaintext length; for anything else it is the raw file length.
pub fn effective_len(path: &Path) -> Result<u64> {
    let len = fs::metadata(path)?.len();
    if is_encrypted(path)? {
        Ok(len - OVERHEAD as u64)
    } else {
        Ok(len)
    }
}

fn read_prefix(path: &Path, limit: usize) -> Result<Vec<u8>> {
    use std::io::Read;
    let mut buf = vec![0u8; limit];
    let mut file = fs::File::open(path)?;
    let mut filled = 0;
    loop {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == limit {
            break;
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn cipher() -> FileCipher {
        FileCipher::from_passphrase("test_passphrase").unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        fs::write(&path, b"hello, world").unwrap();

        let cipher = cipher();
        cipher.encrypt_file(&path).unwrap();
        assert_ne!(fs::read(&path).unwrap(), b"hello, world");
        cipher.decrypt_file(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello, world");
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        assert!(FileCipher::from_passphrase("").is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        fs::write(&path, b"secret").unwrap();

        cipher().encrypt_file(&path).unwrap();
        let other = FileCipher::from_passphrase("different").unwrap();
        assert!(other.decrypt_file(&path).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        fs::write(&path, b"secret").unwrap();

        let cipher = cipher();
        cipher.encrypt_file(&path).unwrap();

        let mut data = fs::read(&path).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        fs::write(&path, data).unwrap();

        assert!(cipher.decrypt_file(&path).is_err());
    }

    #[test]
    fn test_decrypting_plaintext_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plain.txt");
        fs::write(&path, b"never encrypted").unwrap();

        assert!(cipher().decrypt_file(&path).is_err());
    }

    #[test]
    fn test_double_encryption_refused() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        fs::write(&path, b"once only").unwrap();

        let cipher = cipher();
        cipher.encrypt_file(&path).unwrap();
        assert!(cipher.encrypt_file(&path).is_err());
    }

    #[test]
    fn test_effective_len_recovers_plaintext_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        fs::write(&path, b"12345").unwrap();

        assert_eq!(effective_len(&path).unwrap(), 5);
        cipher().encrypt_file(&path).unwrap();
        assert_eq!(effective_len(&path).unwrap(), 5);
    }

    #[test]
    fn test_mtime_preserved_across_encryption() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        fs::write(&path, b"content").unwrap();
        let before = fs::metadata(&path).unwrap().modified().unwrap();

        cipher().encrypt_file(&path).unwrap();
        let after = fs::metadata(&path).unwrap().modified().unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_empty_file_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty");
        fs::write(&path, b"").unwrap();

        let cipher = cipher();
        cipher.encrypt_file(&path).unwrap();
        assert_eq!(effective_len(&path).unwrap(), 0);
        cipher.decrypt_file(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"");
    }
}
