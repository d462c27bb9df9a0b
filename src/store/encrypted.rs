//! Cookie store encrypted at rest.
//!
//! The default location is `$XDG_CONFIG_HOME/session-auth/cookie.enc`
//! (falling back to `~/.config/session-auth/cookie.enc`). The payload is
//! `MAGIC || nonce || XChaCha20-Poly1305 ciphertext` of the raw cookie.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::file::write_atomically;
use super::{CookieStore, StoreError, non_blank};
use crate::context::AuthContext;
use crate::cookie::Cookie;

/// Environment variable that overrides keychain key management.
pub const MASTER_KEY_ENV: &str = "SESSION_AUTH_MASTER_KEY";

const STORE_NAME: &str = "encrypted";
const APP_DIR: &str = "session-auth";
const COOKIE_FILE_NAME: &str = "cookie.enc";
const KEYRING_SERVICE: &str = "session-auth";
const KEYRING_ENTRY_NAME: &str = "cookie-master-key-v1";
const MAGIC: &[u8; 4] = b"SAC1";
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;

/// Failures specific to the encrypted store.
#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    /// No suitable user config directory is available.
    #[error("unable to determine config directory (set XDG_CONFIG_HOME or HOME)")]
    ConfigDirUnavailable,
    /// Could not access the keychain and no env key was provided.
    #[error("unable to access system keychain for cookie encryption key; set {MASTER_KEY_ENV}")]
    KeychainUnavailable,
    /// Stored payload is not in the expected format.
    #[error("encrypted cookie payload is invalid")]
    InvalidPayload,
    /// Encryption failed.
    #[error("failed to encrypt cookie")]
    EncryptionFailed,
    /// Decryption failed, usually a wrong key.
    #[error("failed to decrypt cookie")]
    DecryptionFailed,
    /// Decrypted bytes are not UTF-8.
    #[error("decrypted cookie is not valid UTF-8")]
    InvalidUtf8,
}

/// Key material, redacted in Debug output.
#[derive(Clone)]
struct KeyMaterial(String);

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

/// Durable cookie store that encrypts the cookie at rest.
#[derive(Debug)]
pub struct EncryptedFileCookieStore {
    path: PathBuf,
    key: KeyMaterial,
    write_lock: Mutex<()>,
}

impl EncryptedFileCookieStore {
    /// Creates a store using explicit key material.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, key_material: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: KeyMaterial(key_material.into()),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store whose key comes from [`MASTER_KEY_ENV`] or the system
    /// keychain, generating and saving a keychain key on first use.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::KeychainUnavailable`] when neither source works.
    pub fn from_env_or_keychain(path: impl Into<PathBuf>) -> Result<Self, EncryptionError> {
        let key = load_or_create_key()?;
        Ok(Self::new(path, key))
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the encrypted file. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when removal fails.
    pub async fn clear(&self) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::unavailable(STORE_NAME, e)),
        }
    }
}

#[async_trait]
impl CookieStore for EncryptedFileCookieStore {
    #[instrument(level = "debug", skip(self, ctx), fields(path = %self.path.display()))]
    async fn get_cookie(&self, ctx: &AuthContext) -> Result<Cookie, StoreError> {
        let payload = match ctx.run(tokio::fs::read(&self.path)).await? {
            Ok(payload) => payload,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::Empty { store: STORE_NAME });
            }
            Err(e) => return Err(StoreError::unavailable(STORE_NAME, e)),
        };

        let plaintext = decrypt_bytes(&payload, &self.key.0)
            .map_err(|e| StoreError::unavailable(STORE_NAME, e))?;
        let raw = String::from_utf8(plaintext)
            .map_err(|_| StoreError::unavailable(STORE_NAME, EncryptionError::InvalidUtf8))?;
        non_blank(STORE_NAME, Cookie::new(raw))
    }

    #[instrument(level = "debug", skip(self, ctx, cookie), fields(path = %self.path.display()))]
    async fn set_cookie(&self, ctx: &AuthContext, cookie: Cookie) -> Result<(), StoreError> {
        let payload = encrypt_bytes(cookie.expose().as_bytes(), &self.key.0)
            .map_err(|e| StoreError::unavailable(STORE_NAME, e))?;
        let _guard = ctx.run(self.write_lock.lock()).await?;
        ctx.run(write_atomically(&self.path, &payload))
            .await?
            .map_err(|e| StoreError::unavailable(STORE_NAME, e))?;
        debug!(pairs = cookie.pair_count(), "persisted encrypted cookie");
        Ok(())
    }

    fn name(&self) -> &'static str {
        STORE_NAME
    }
}

/// Returns the default encrypted cookie path.
///
/// # Errors
///
/// Returns [`EncryptionError::ConfigDirUnavailable`] if no config dir is found.
pub fn default_encrypted_path() -> Result<PathBuf, EncryptionError> {
    let dir = resolve_config_dir(
        sanitize_env_path(env::var_os("XDG_CONFIG_HOME")),
        sanitize_env_path(env::var_os("HOME")),
        sanitize_env_path(env::var_os("APPDATA")),
    )?;
    Ok(dir.join(COOKIE_FILE_NAME))
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(value))
}

fn resolve_config_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, EncryptionError> {
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join(APP_DIR));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join(APP_DIR));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join(APP_DIR));
    }
    Err(EncryptionError::ConfigDirUnavailable)
}

fn load_or_create_key() -> Result<String, EncryptionError> {
    if let Some(from_env) = env::var_os(MASTER_KEY_ENV) {
        let key = from_env.to_string_lossy().trim().to_string();
        if !key.is_empty() {
            return Ok(key);
        }
    }

    // keyring backends can panic on headless systems without a secret service
    let entry = catch_unwind(|| keyring::Entry::new(KEYRING_SERVICE, KEYRING_ENTRY_NAME))
        .map_err(|_| EncryptionError::KeychainUnavailable)?
        .map_err(|_| EncryptionError::KeychainUnavailable)?;

    match catch_unwind(AssertUnwindSafe(|| entry.get_password())) {
        Ok(Ok(existing)) if !existing.trim().is_empty() => Ok(existing),
        _ => {
            let generated = generate_key_material();
            catch_unwind(AssertUnwindSafe(|| entry.set_password(&generated)))
                .map_err(|_| EncryptionError::KeychainUnavailable)?
                .map_err(|_| EncryptionError::KeychainUnavailable)?;
            Ok(generated)
        }
    }
}

fn generate_key_material() -> String {
    let mut bytes = [0_u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

fn derive_key_bytes(key_material: &str) -> [u8; KEY_LEN] {
    let digest = Sha256::digest(key_material.as_bytes());
    let mut key = [0_u8; KEY_LEN];
    key.copy_from_slice(&digest[..KEY_LEN]);
    key
}

fn encrypt_bytes(plaintext: &[u8], key_material: &str) -> Result<Vec<u8>, EncryptionError> {
    let key_bytes = derive_key_bytes(key_material);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key_bytes));

    let mut nonce = [0_u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
    output.extend_from_slice(MAGIC);
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

fn decrypt_bytes(payload: &[u8], key_material: &str) -> Result<Vec<u8>, EncryptionError> {
    if payload.len() < MAGIC.len() + NONCE_LEN || &payload[..MAGIC.len()] != MAGIC {
        return Err(EncryptionError::InvalidPayload);
    }

    let key_bytes = derive_key_bytes(key_material);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key_bytes));
    let nonce_end = MAGIC.len() + NONCE_LEN;
    let nonce = XNonce::from_slice(&payload[MAGIC.len()..nonce_end]);

    cipher
        .decrypt(nonce, &payload[nonce_end..])
        .map_err(|_| EncryptionError::DecryptionFailed)
}
