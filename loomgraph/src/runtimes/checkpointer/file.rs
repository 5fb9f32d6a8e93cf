//! The local-file checkpointer: one file per `(workflow_id, superstep)`,
//! written via a `.tmp`-then-`rename` dance so a reader never observes a
//! partially written checkpoint, with optional transparent gzip compression
//! behind the `compression` feature.
//!
//! The same write-to-staging-path-then-rename dance is applied to every
//! superstep's checkpoint rather than just a single database file.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::runtimes::checkpoint::Checkpoint;
use crate::state::WorkflowState;

use super::{Checkpointer, CheckpointerError, Result};

const MAGIC_RAW: u8 = 0x00;
#[cfg(feature = "compression")]
const MAGIC_GZIP: u8 = 0x01;

/// Local-file [`Checkpointer`] backend.
///
/// Each checkpoint is its own file named `{workflow_id}__{superstep:020}.ckpt`
/// under `directory`, so [`FileCheckpointer::list`] is a directory scan and
/// [`FileCheckpointer::prune`] is a handful of `remove_file` calls.
pub struct FileCheckpointer<S: WorkflowState> {
    directory: PathBuf,
    compress: bool,
    _phantom: PhantomData<S>,
}

impl<S: WorkflowState> FileCheckpointer<S> {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            compress: false,
            _phantom: PhantomData,
        }
    }

    #[cfg(feature = "compression")]
    #[must_use]
    pub fn with_compression(mut self) -> Self {
        self.compress = true;
        self
    }

    fn path_for(&self, workflow_id: &str, superstep: u64) -> PathBuf {
        self.directory
            .join(format!("{workflow_id}__{superstep:020}.ckpt"))
    }

    fn tmp_path_for(&self, workflow_id: &str, superstep: u64) -> PathBuf {
        self.directory
            .join(format!("{workflow_id}__{superstep:020}.ckpt.tmp"))
    }

    fn parse_filename(workflow_id: &str, file_name: &str) -> Option<u64> {
        let stem = file_name.strip_suffix(".ckpt")?;
        let (prefix, superstep) = stem.rsplit_once("__")?;
        if prefix != workflow_id {
            return None;
        }
        superstep.parse().ok()
    }

    fn encode<T: serde::Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(value)
            .map_err(|e| CheckpointerError::Serialization { message: e.to_string() })?;
        if self.compress {
            #[cfg(feature = "compression")]
            {
                use std::io::Write;
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder
                    .write_all(&json)
                    .map_err(|e| CheckpointerError::backend(e.to_string()))?;
                let compressed = encoder
                    .finish()
                    .map_err(|e| CheckpointerError::backend(e.to_string()))?;
                let mut framed = Vec::with_capacity(compressed.len() + 1);
                framed.push(MAGIC_GZIP);
                framed.extend_from_slice(&compressed);
                return Ok(framed);
            }
            #[cfg(not(feature = "compression"))]
            {
                return Err(CheckpointerError::backend(
                    "compression requested but the `compression` feature is disabled",
                ));
            }
        }
        let mut framed = Vec::with_capacity(json.len() + 1);
        framed.push(MAGIC_RAW);
        framed.extend_from_slice(&json);
        Ok(framed)
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let (&magic, payload) = bytes
            .split_first()
            .ok_or_else(|| CheckpointerError::backend("empty checkpoint file"))?;
        let json: Vec<u8> = match magic {
            MAGIC_RAW => payload.to_vec(),
            #[cfg(feature = "compression")]
            MAGIC_GZIP => {
                use std::io::Read;
                let mut decoder = flate2::read::GzDecoder::new(payload);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| CheckpointerError::backend(e.to_string()))?;
                out
            }
            other => {
                return Err(CheckpointerError::backend(format!(
                    "unknown checkpoint compression magic byte {other:#x}"
                )))
            }
        };
        serde_json::from_slice(&json)
            .map_err(|e| CheckpointerError::Serialization { message: e.to_string() })
    }

    async fn ensure_directory(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))
    }

    async fn list_files(&self, workflow_id: &str) -> Result<Vec<(u64, PathBuf)>> {
        self.ensure_directory().await?;
        let mut entries = tokio::fs::read_dir(&self.directory)
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        let mut found = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))?
        {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else { continue };
            if let Some(superstep) = Self::parse_filename(workflow_id, file_name) {
                found.push((superstep, entry.path()));
            }
        }
        found.sort_by_key(|(superstep, _)| *superstep);
        Ok(found)
    }

    async fn load_path(&self, path: &Path) -> Result<Checkpoint<S>> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        self.decode(&bytes)
    }
}

#[async_trait]
impl<S: WorkflowState> Checkpointer<S> for FileCheckpointer<S> {
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<()> {
        self.ensure_directory().await?;
        let bytes = self.encode(checkpoint)?;
        let tmp_path = self.tmp_path_for(&checkpoint.workflow_id, checkpoint.superstep);
        let final_path = self.path_for(&checkpoint.workflow_id, checkpoint.superstep);
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        Ok(())
    }

    async fn load_latest(&self, workflow_id: &str) -> Result<Option<Checkpoint<S>>> {
        let files = self.list_files(workflow_id).await?;
        match files.last() {
            Some((_, path)) => Ok(Some(self.load_path(path).await?)),
            None => Ok(None),
        }
    }

    async fn load(&self, workflow_id: &str, superstep: u64) -> Result<Option<Checkpoint<S>>> {
        let path = self.path_for(workflow_id, superstep);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(self.load_path(&path).await?))
    }

    async fn list(&self, workflow_id: &str) -> Result<Vec<u64>> {
        Ok(self
            .list_files(workflow_id)
            .await?
            .into_iter()
            .map(|(superstep, _)| superstep)
            .collect())
    }

    async fn prune(&self, workflow_id: &str, keep_count: usize) -> Result<()> {
        let mut files = self.list_files(workflow_id).await?;
        if files.len() <= keep_count {
            return Ok(());
        }
        let to_remove = files.split_off(0).into_iter().rev().skip(keep_count);
        for (_, path) in to_remove {
            tokio::fs::remove_file(path)
                .await
                .map_err(|e| CheckpointerError::backend(e.to_string()))?;
        }
        Ok(())
    }
}
