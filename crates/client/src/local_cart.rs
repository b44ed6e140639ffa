//! The anonymous shopper's cart, persisted to a JSON file.
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the cart file, so a crash mid-write leaves the previous cart intact.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use stockroom_core::{Cart, CartLine, ProductId};

use crate::ClientResult;

/// File-backed cart for anonymous shoppers. Never authoritative.
#[derive(Debug)]
pub struct LocalCart {
    path: PathBuf,
    cart: Mutex<Cart>,
}

impl LocalCart {
    /// Load the cart at `path`.
    ///
    /// A missing file is an empty cart. A file that cannot be parsed is
    /// treated as corrupted and replaced by an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the file exists but cannot be read, or
    /// the replacement cannot be written.
    pub async fn open(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();

        let cart = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Cart>(&bytes) {
                Ok(cart) => cart,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Local cart is corrupted, starting with an empty cart"
                    );
                    let empty = Cart::new();
                    persist(&path, &empty).await?;
                    empty
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Cart::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            cart: Mutex::new(cart),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents.
    pub async fn snapshot(&self) -> Cart {
        self.cart.lock().await.clone()
    }

    /// Insert or replace the line for its product and persist.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the file cannot be written; the in-memory
    /// cart is left unchanged in that case.
    pub async fn upsert(&self, line: CartLine) -> ClientResult<()> {
        let mut cart = self.cart.lock().await;
        let mut next = cart.clone();
        next.upsert(line);
        persist(&self.path, &next).await?;
        *cart = next;
        Ok(())
    }

    /// Remove the line for `product_id` and persist. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the file cannot be written.
    pub async fn remove(&self, product_id: ProductId) -> ClientResult<bool> {
        let mut cart = self.cart.lock().await;
        if cart.get(product_id).is_none() {
            return Ok(false);
        }
        let mut next = cart.clone();
        next.remove(product_id);
        persist(&self.path, &next).await?;
        *cart = next;
        Ok(true)
    }

    /// Empty the cart and persist.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the file cannot be written.
    pub async fn clear(&self) -> ClientResult<()> {
        let mut cart = self.cart.lock().await;
        persist(&self.path, &Cart::new()).await?;
        cart.clear();
        Ok(())
    }
}

/// Serialize on the caller, write and rename on the blocking pool.
async fn persist(path: &Path, cart: &Cart) -> ClientResult<()> {
    let mut bytes = serde_json::to_vec_pretty(cart)?;
    bytes.push(b'\n');
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
        .await
        .map_err(std::io::Error::other)??;
    Ok(())
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
