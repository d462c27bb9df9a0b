//! Plain file-backed cookie store.
//!
//! The cookie is persisted verbatim, one cookie per file. Writes go to a
//! sibling temp file that is then renamed over the target, so readers never
//! observe a half-written cookie.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::{CookieStore, StoreError, non_blank};
use crate::context::AuthContext;
use crate::cookie::Cookie;

const STORE_NAME: &str = "file";

/// Durable cookie store backed by a single file.
#[derive(Debug)]
pub struct FileCookieStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCookieStore {
    /// Creates a store reading and writing `path`. The file is read lazily.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the backing file. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when removal fails for a reason
    /// other than the file being absent.
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
impl CookieStore for FileCookieStore {
    #[instrument(level = "debug", skip(self, ctx), fields(path = %self.path.display()))]
    async fn get_cookie(&self, ctx: &AuthContext) -> Result<Cookie, StoreError> {
        match ctx.run(tokio::fs::read_to_string(&self.path)).await? {
            Ok(contents) => {
                let cookie = Cookie::new(contents.trim_end_matches(['\r', '\n']));
                non_blank(STORE_NAME, cookie)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("cookie file does not exist yet");
                Err(StoreError::Empty { store: STORE_NAME })
            }
            Err(e) => Err(StoreError::unavailable(STORE_NAME, e)),
        }
    }

    #[instrument(level = "debug", skip(self, ctx, cookie), fields(path = %self.path.display()))]
    async fn set_cookie(&self, ctx: &AuthContext, cookie: Cookie) -> Result<(), StoreError> {
        let _guard = ctx.run(self.write_lock.lock()).await?;
        ctx.run(write_atomically(&self.path, cookie.expose().as_bytes()))
            .await?
            .map_err(|e| StoreError::unavailable(STORE_NAME, e))?;
        debug!(pairs = cookie.pair_count(), "persisted cookie");
        Ok(())
    }

    fn name(&self) -> &'static str {
        STORE_NAME
    }
}

/// Writes `contents` to a temp sibling, restricts permissions, then renames it over `path`.
///
/// The temp name is unique per write, so concurrent writers in separate
/// processes or store instances never share one. The temp file is removed
/// if any step fails.
pub(super) async fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp_path = temp_sibling(path);
    let result = async {
        tokio::fs::write(&temp_path, contents).await?;
        set_owner_only_permissions(&temp_path).await?;
        tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp_path).await;
    }
    result
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "cookie".into(), |n| n.to_string_lossy());
    path.with_file_name(format!(
        ".{name}.{}.{:016x}.tmp",
        std::process::id(),
        rand::random::<u64>()
    ))
}

#[cfg(unix)]
async fn set_owner_only_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn set_owner_only_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
