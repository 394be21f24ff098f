// # Storage
//
// Loading contact lists and persisting batch results.
//
// ## Input
//
// UTF-8 text, one contact per line. Lines are trimmed and blank lines are
// dropped, so the engine only ever sees non-blank input.
//
// ## Output
//
// - Text report (see `report`)
// - Pretty-printed JSON of the full `BatchResult`
//
// Both are written atomically: the content goes to a `.tmp` sibling first
// and is then renamed over the destination. The `.tmp` file is removed if
// either step fails.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::batch::BatchResult;
use crate::report::format_report;

/// Load a contact list, dropping blank lines
pub async fn load_contacts<P: AsRef<Path>>(path: P) -> Result<Vec<String>, Error> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).await.map_err(|e| {
        Error::invalid_input(format!(
            "Failed to read contact list {}: {}",
            path.display(),
            e
        ))
    })?;

    let contacts = parse_contact_list(&content);
    tracing::debug!(
        "Loaded {} contact line(s) from {}",
        contacts.len(),
        path.display()
    );
    Ok(contacts)
}

/// Split file content into trimmed, non-blank lines
pub fn parse_contact_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Write the text report for a batch
pub async fn save_report<P: AsRef<Path>>(path: P, result: &BatchResult) -> Result<(), Error> {
    write_atomic(path.as_ref(), format_report(result).as_bytes()).await
}

/// Write the full batch result as JSON
pub async fn save_json<P: AsRef<Path>>(path: P, result: &BatchResult) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(result)?;
    write_atomic(path.as_ref(), json.as_bytes()).await
}

/// Write to a temporary sibling, then rename over `path`
async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        // create_dir_all succeeds on an existing directory
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create output directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let temp_path = temp_path(path);
    if let Err(e) = write_and_rename(&temp_path, path, content).await {
        if let Err(cleanup) = fs::remove_file(&temp_path).await {
            tracing::debug!("Could not remove {}: {}", temp_path.display(), cleanup);
        }
        return Err(e);
    }

    tracing::trace!("Wrote {}", path.display());
    Ok(())
}

async fn write_and_rename(temp_path: &Path, path: &Path, content: &[u8]) -> Result<(), Error> {
    {
        let mut file = fs::File::create(temp_path).await?;
        file.write_all(content).await?;
        file.flush().await?;
    }

    fs::rename(temp_path, path).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ),
        ))
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    PathBuf::from(temp)
}
