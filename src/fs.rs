use crate::exceptions::{PagesError, PublishError};
use serde::de::DeserializeOwned;
use std::fs::{self, OpenOptions};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Atomically write bytes to a file using a temporary file + rename strategy.
pub fn atomic_write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    // Create temp file in the same directory to ensure atomic rename works across filesystems
    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(bytes)?;
    temp_file.as_file().sync_all()?;

    // Persist replaces the destination path atomically
    temp_file.persist(path).map_err(|e| e.error)?;

    Ok(())
}

pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<(), PagesError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut temp_file = NamedTempFile::new_in(dir)?;

    // Buffer the writer for performance
    {
        let mut writer = io::BufWriter::new(&mut temp_file);
        serde_json::to_writer(&mut writer, data)?;
        writer.flush()?;
    }
    temp_file.as_file().sync_all()?;

    temp_file
        .persist(path)
        .map_err(|e| PagesError::Io(e.error))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PagesError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::with_capacity(64 * 1024, file);
    Ok(serde_json::from_reader(reader)?)
}

// --- Multi-file commit ---

/// Stages several files in one directory and swaps them in as a unit.
///
/// Every file is fully written to a temporary sibling before the first rename.
/// If any rename fails, the targets already replaced are restored to their
/// previous bytes (or removed when they did not exist before), so readers end
/// up with either the complete old set or the complete new set.
#[derive(Debug)]
pub struct FileTransaction {
    dir: PathBuf,
    staged: Vec<StagedFile>,
}

#[derive(Debug)]
struct StagedFile {
    target: PathBuf,
    temp: NamedTempFile,
}

impl FileTransaction {
    pub fn new(dir: &Path) -> Result<Self, PublishError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            staged: Vec::new(),
        })
    }

    /// Writes `bytes` to a temporary file that will replace `dir/file_name` on commit.
    pub fn stage(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), PublishError> {
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;

        self.staged.push(StagedFile {
            target: self.dir.join(file_name),
            temp,
        });
        Ok(())
    }

    /// Swaps staged files in, in staging order. Dropping an uncommitted
    /// transaction deletes its temporary files and leaves targets untouched.
    pub fn commit(self) -> Result<(), PublishError> {
        let mut committed: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::with_capacity(self.staged.len());

        for StagedFile { target, temp } in self.staged {
            let swap = read_previous(&target).and_then(|previous| {
                temp.persist(&target).map_err(|e| e.error)?;
                Ok(previous)
            });

            match swap {
                Ok(previous) => committed.push((target, previous)),
                Err(source) => {
                    log::error!("Failed to commit {}: {}", target.display(), source);
                    let rolled_back = rollback(&committed);
                    return Err(PublishError::PartialWrite {
                        file: target.display().to_string(),
                        source,
                        rolled_back,
                    });
                }
            }
        }

        Ok(())
    }
}

fn read_previous(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn rollback(committed: &[(PathBuf, Option<Vec<u8>>)]) -> bool {
    let mut restored = true;

    for (path, previous) in committed.iter().rev() {
        let result = match previous {
            Some(bytes) => atomic_write_bytes(path, bytes),
            None => fs::remove_file(path),
        };
        if let Err(e) = result {
            log::error!("Rollback of {} failed: {}", path.display(), e);
            restored = false;
        }
    }

    restored
}

// --- Run lock ---

/// Exclusive lock held for a whole fetch -> publish cycle. Released on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: &Path) -> Result<Self, PublishError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(PublishError::LockUnavailable {
                    path: path.to_path_buf(),
                    holder: lock_holder(path),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = writeln!(file, "{}", std::process::id()) {
            let _ = fs::remove_file(path);
            return Err(e.into());
        }
        log::debug!("Acquired run lock {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

/// Pid recorded in an existing lock file, as text for the error message.
fn lock_holder(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(contents) if !contents.trim().is_empty() => format!("pid {}", contents.trim()),
        _ => "an unknown process".to_string(),
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Could not release run lock {}: {}", self.path.display(), e);
        }
    }
}
