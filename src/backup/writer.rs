//! CSV output of normalized rows.
//!
//! Rows are buffered in memory and only reach the disk on [`CsvFile::commit`],
//! which writes a `.partial` sibling and renames it over the target. A file
//! that is never committed leaves nothing behind.

use std::path::{Path, PathBuf};

use csv::{Terminator, WriterBuilder};

use crate::error::BackupError;

pub struct CsvFile {
    path: PathBuf,
    writer: csv::Writer<Vec<u8>>,
    rows: usize,
}

impl CsvFile {
    /// Starts a file at `path` with `header` as its first line.
    pub fn create(path: impl Into<PathBuf>, header: &[&str]) -> Result<Self, BackupError> {
        let path = path.into();
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer
            .write_record(header)
            .map_err(|e| BackupError::write(&path, e.into()))?;

        Ok(CsvFile {
            path,
            writer,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows pushed so far, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn push<I, T>(&mut self, row: I) -> Result<(), BackupError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(row)
            .map_err(|e| BackupError::write(&self.path, e.into()))?;
        self.rows += 1;
        Ok(())
    }

    /// Writes the buffered content to disk, replacing any existing file.
    ///
    /// Returns the number of data rows written.
    pub async fn commit(self) -> Result<usize, BackupError> {
        let CsvFile { path, writer, rows } = self;
        let bytes = writer
            .into_inner()
            .map_err(|e| {
                let source = e.error();
                BackupError::write(&path, std::io::Error::new(source.kind(), source.to_string()))
            })?;

        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| BackupError::write(parent, e))?;
        }

        let partial = partial_path(&path);
        async_fs::write(&partial, bytes)
            .await
            .map_err(|e| BackupError::write(&partial, e))?;
        if let Err(e) = async_fs::rename(&partial, &path).await {
            let _ = async_fs::remove_file(&partial).await;
            return Err(BackupError::write(&path, e));
        }

        Ok(rows)
    }
}

/// Writes `rows` below `header` to `path` in one go.
pub async fn write_csv<R, T>(
    path: impl Into<PathBuf>,
    header: &[&str],
    rows: impl IntoIterator<Item = R>,
) -> Result<usize, BackupError>
where
    R: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut file = CsvFile::create(path, header)?;
    for row in rows {
        file.push(row)?;
    }
    file.commit().await
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}
