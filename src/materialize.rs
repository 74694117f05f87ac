//! Image storage.
//!
//! Images are laid out as `<root>/<last digit of id>/<id>_<index>.<ext>`, so a path
//! depends only on the comic id, the panel index and the source URL's extension.

use crate::error::{Error, Result};
use crate::fetch::{Fetcher, Transport};
use crate::util::file_ext;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Result of materializing a single image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    /// Path relative to the output directory.
    pub path: String,
    /// `false` if an existing file was reused.
    pub downloaded: bool,
}

/// Relative destination of image `index` of comic `id`.
pub fn destination(id: i32, index: usize, url: &Url) -> String {
    let shard = id.rem_euclid(10);
    match file_ext(url) {
        Some(ext) => format!("{}/{}_{}.{}", shard, id, index, ext),
        None => format!("{}/{}_{}", shard, id, index),
    }
}

pub struct Materializer {
    root: PathBuf,
    overwrite: bool,
}

impl Materializer {
    /// `overwrite` forces a download even if the destination exists already.
    pub fn new(root: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            root: root.into(),
            overwrite,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Downloads an image into its destination, unless a non-empty file is already there.
    pub fn materialize<T: Transport>(
        &self,
        fetcher: &Fetcher<T>,
        url: &Url,
        id: i32,
        index: usize,
    ) -> Result<Materialized> {
        let relative = destination(id, index, url);
        let path = self.root.join(&relative);

        if !self.overwrite && is_nonempty_file(&path) {
            log::debug!("Reusing {} for {}", path.display(), url);
            return Ok(Materialized {
                path: relative,
                downloaded: false,
            });
        }

        let body = fetcher.bytes(url.as_str()).map_err(|e| match e {
            Error::Fetch { url, reason } => Error::Download { url, reason },
            other => Error::download(url.as_str(), other),
        })?;
        if body.is_empty() {
            return Err(Error::download(url.as_str(), "empty response body"));
        }

        write_file(&path, &body).map_err(|e| Error::download(url.as_str(), e))?;
        log::debug!("Saved {} ({} bytes)", path.display(), body.len());

        Ok(Materialized {
            path: relative,
            downloaded: true,
        })
    }
}

fn is_nonempty_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// Writes through a sibling `.part` file so an interrupted write never looks complete.
fn write_file(path: &Path, body: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    fs::write(&partial, body)?;
    fs::rename(&partial, path)
}
