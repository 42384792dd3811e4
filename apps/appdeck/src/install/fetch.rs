//! Byte streams over an asset's origin.

use std::path::PathBuf;

use anyhow::Result;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::io::AsyncReadExt;

use crate::errors::AppdeckError;
use crate::http::status_error;
use crate::source::{Asset, AssetOrigin};

const LOCAL_CHUNK_SIZE: usize = 64 * 1024;

/// Chunked reader over a bundle, from the network or from disk.
pub enum AssetStream {
    Network {
        url: String,
        body: BoxStream<'static, reqwest::Result<Bytes>>,
    },
    Local {
        path: PathBuf,
        file: tokio::fs::File,
    },
}

impl AssetStream {
    /// Opens `asset` for reading.
    ///
    /// # Errors
    ///
    /// Returns a network error if the request fails, or a filesystem error if
    /// the local file cannot be opened.
    pub async fn open(http: &reqwest::Client, asset: &Asset) -> Result<Self> {
        match &asset.origin {
            AssetOrigin::Network(url) => {
                let response = http.get(url).send().await.map_err(|e| {
                    AppdeckError::network_with_source(format!("failed to connect to {url}"), e)
                })?;
                if !response.status().is_success() {
                    return Err(status_error(response.status(), url));
                }
                Ok(Self::Network {
                    url: url.clone(),
                    body: response.bytes_stream().boxed(),
                })
            }
            AssetOrigin::Local(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    AppdeckError::filesystem(format!("failed to open {}", path.display()), e)
                })?;
                Ok(Self::Local {
                    path: path.clone(),
                    file,
                })
            }
        }
    }

    /// Next chunk, or `None` at the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns a network or filesystem error if reading fails midway.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        match self {
            Self::Network { url, body } => match body.next().await {
                None => Ok(None),
                Some(Ok(chunk)) => Ok(Some(chunk)),
                Some(Err(e)) => Err(AppdeckError::network_with_source(
                    format!("failed to read chunk from {url}"),
                    e,
                )
                .into()),
            },
            Self::Local { path, file } => {
                let mut buf = vec![0u8; LOCAL_CHUNK_SIZE];
                let read = file.read(&mut buf).await.map_err(|e| {
                    AppdeckError::filesystem(format!("failed to read {}", path.display()), e)
                })?;
                if read == 0 {
                    return Ok(None);
                }
                buf.truncate(read);
                Ok(Some(Bytes::from(buf)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_stream_yields_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.AppImage");
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        let asset = Asset::local(path).unwrap();
        let mut stream = AssetStream::open(&reqwest::Client::new(), &asset)
            .await
            .unwrap();

        let mut collected = Vec::new();
        let mut chunks = 0;
        while let Some(chunk) = stream.next_chunk().await.unwrap() {
            assert!(chunk.len() <= LOCAL_CHUNK_SIZE);
            collected.extend_from_slice(&chunk);
            chunks += 1;
        }
        assert_eq!(collected, content);
        assert!(chunks > 1);
    }

    #[tokio::test]
    async fn unreachable_url_is_a_network_error() {
        let asset = Asset::network("http://127.0.0.1:9/none.AppImage", 0);
        let err = AssetStream::open(&reqwest::Client::new(), &asset)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<AppdeckError>(),
            Some(AppdeckError::NetworkFailure { .. })
        ));
    }
}
