use std::{io, path::PathBuf};

use async_trait::async_trait;
use eyre::WrapErr;
use tokio::{fs, io::AsyncWriteExt};

use super::Storage;

/// Stores each key as one file inside a directory.
///
/// Writes go to a sibling temp file which is synced and then renamed over
/// the target, so a crash mid-write leaves the previous value intact.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name(key))
    }
}

// keys are arbitrary strings; keep them inside `dir`
fn file_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();

    if name.is_empty() || name.starts_with('.') {
        name.insert(0, '_');
    }

    name
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> eyre::Result<Option<Vec<u8>>> {
        let path = self.path_for(key);

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).wrap_err_with(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> eyre::Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .wrap_err_with(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.path_for(key);
        let tmp = path.with_file_name(format!("{}.tmp", file_name(key)));

        let mut file = fs::File::create(&tmp)
            .await
            .wrap_err_with(|| format!("Failed to create {}", tmp.display()))?;
        file.write_all(&value).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &path)
            .await
            .wrap_err_with(|| format!("Failed to replace {}", path.display()))?;

        Ok(())
    }
}
