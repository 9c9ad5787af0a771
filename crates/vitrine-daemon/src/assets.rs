//! Asset loading from the local asset directory
//!
//! Scene documents refer to assets with page-relative URLs such as
//! `./3d_assets/font/helvetiker_regular.typeface.json`. The daemon resolves
//! those against its configured asset root. The handle of a loaded asset is
//! the SHA256 of its bytes, so two URLs with identical content share a handle.

use std::path::{Component, Path, PathBuf};
use tracing::debug;
use vitrine_core::sha256_hex;
use vitrine_scene::{Asset, AssetError, AssetHandle, AssetKind, AssetLoader};

/// URL prefix that maps onto the asset root
pub const ASSET_URL_PREFIX: &str = "./3d_assets/";

pub struct FsAssetLoader {
    root: PathBuf,
}

impl FsAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File backing `url`, if it names something under the asset root
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let relative = url
            .strip_prefix(ASSET_URL_PREFIX)
            .or_else(|| url.strip_prefix("/assets/"))?;
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl AssetLoader for FsAssetLoader {
    async fn load(&self, kind: AssetKind, url: &str) -> Result<Asset, AssetError> {
        let Some(path) = self.resolve(url) else {
            debug!(url = %url, "Asset URL is outside the asset root");
            return Err(AssetError::NotFound(url.to_string()));
        };

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AssetError::NotFound(url.to_string()));
            }
            Err(e) => {
                return Err(AssetError::Io {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
        };

        // Typeface fonts are JSON; catch a truncated file before it reaches a renderer
        if kind == AssetKind::Font {
            if let Err(e) = serde_json::from_slice::<serde_json::Value>(&bytes) {
                return Err(AssetError::Parse {
                    url: url.to_string(),
                    message: e.to_string(),
                });
            }
        }

        let handle = AssetHandle(sha256_hex(&bytes));
        debug!(url = %url, kind = %kind, bytes = bytes.len(), "Loaded asset");
        Ok(Asset {
            kind,
            url: url.to_string(),
            handle,
        })
    }
}
