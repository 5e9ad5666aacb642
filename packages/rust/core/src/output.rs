//! JSON Lines + JSON array output.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use docprep_shared::{DocPrepError, Result};

/// Files produced by [`write_outputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub jsonl: PathBuf,
    pub json: PathBuf,
}

impl OutputPaths {
    /// The JSON companion sits next to the JSON Lines file.
    pub fn for_jsonl(jsonl: &Path) -> Self {
        Self {
            jsonl: jsonl.to_path_buf(),
            json: jsonl.with_extension("json"),
        }
    }
}

/// Write `records` as JSON Lines to `jsonl_path` and as a pretty-printed
/// array to the same path with a `.json` extension.
///
/// Both files are replaced atomically (temp file, then rename). Parent
/// directories are created as needed.
#[instrument(skip_all, fields(path = %jsonl_path.display(), records = records.len()))]
pub fn write_outputs<T: Serialize>(jsonl_path: &Path, records: &[T]) -> Result<OutputPaths> {
    let paths = OutputPaths::for_jsonl(jsonl_path);
    if paths.jsonl == paths.json {
        return Err(DocPrepError::validation(format!(
            "output file {} would be overwritten by its JSON companion; use a .jsonl extension",
            jsonl_path.display()
        )));
    }

    if let Some(parent) = jsonl_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DocPrepError::io(parent, e))?;
    }

    let mut lines = Vec::new();
    for record in records {
        serde_json::to_writer(&mut lines, record)?;
        lines.push(b'\n');
    }
    write_atomic(&paths.jsonl, &lines)?;

    let mut array = serde_json::to_vec_pretty(records)?;
    array.push(b'\n');
    write_atomic(&paths.json, &array)?;

    info!(
        jsonl = %paths.jsonl.display(),
        json = %paths.json.display(),
        records = records.len(),
        "outputs written"
    );
    Ok(paths)
}

fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = target.with_file_name(format!(".{file_name}.tmp"));

    let mut file = std::fs::File::create(&temp).map_err(|e| DocPrepError::io(&temp, e))?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| DocPrepError::io(&temp, e))?;
    drop(file);

    std::fs::rename(&temp, target).map_err(|e| DocPrepError::io(target, e))?;
    debug!(file = %target.display(), size = bytes.len(), "wrote output");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
