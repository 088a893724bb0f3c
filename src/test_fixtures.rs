//! Shared helpers for unit tests: stand-in collaborator scripts and a
//! fetcher that serves "remote" files from a local directory.

use crate::acquire::Fetcher;
use crate::discovery::classifier::remote_file_name;
use crate::error::{BookbinderError, Result};
use std::path::{Path, PathBuf};

/// Write an executable `/bin/sh` script and return its path
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(format!("#!/bin/sh\n{}", body).as_bytes()).unwrap();
    file.sync_all().unwrap();
    drop(file);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Fetcher that copies `<root>/<last URL segment>` to the destination
pub struct CopyFetcher {
    root: PathBuf,
}

impl CopyFetcher {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl Fetcher for CopyFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let name = remote_file_name(url).ok_or_else(|| BookbinderError::Download {
            url: url.to_string(),
            reason: "no file name".to_string(),
        })?;
        std::fs::copy(self.root.join(name), dest).map_err(|e| BookbinderError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "copy"
    }
}
