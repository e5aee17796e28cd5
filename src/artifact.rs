use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::artifact::{BLOCK_EXTENSION, NBACK_DIR_SUFFIX, SEEDS_FILENAME};
use crate::data::NBackSequence;
use crate::errors::NBackError;
use crate::protocol::ProtocolRun;
use crate::types::NBack;

/// Write `sequence` as the two-line artifact (symbols, then conditions).
pub fn write_sequence(
    path: impl AsRef<Path>,
    sequence: &NBackSequence,
    seed_marker: bool,
) -> Result<(), NBackError> {
    fs::write(path, sequence.to_artifact_string(seed_marker))?;
    Ok(())
}

/// Read a two-line artifact written for an `n`-back block.
pub fn read_sequence(path: impl AsRef<Path>, n: NBack) -> Result<NBackSequence, NBackError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let mut lines = raw.lines();
    let (Some(symbols), Some(conditions)) = (lines.next(), lines.next()) else {
        return Err(NBackError::Artifact {
            path: path.to_path_buf(),
            reason: "expected a symbol line and a condition line".to_string(),
        });
    };
    if lines.any(|line| !line.trim().is_empty()) {
        return Err(NBackError::Artifact {
            path: path.to_path_buf(),
            reason: "unexpected content after the condition line".to_string(),
        });
    }
    NBackSequence::from_lines(symbols, conditions, n).map_err(|reason| NBackError::Artifact {
        path: path.to_path_buf(),
        reason,
    })
}

/// Directory holding the blocks of one n (`<root>/<n>back`).
pub fn nback_dir(root: impl AsRef<Path>, n: NBack) -> PathBuf {
    root.as_ref().join(format!("{n}{NBACK_DIR_SUFFIX}"))
}

/// Write every block of `runs` under `root` plus a seed listing per n.
///
/// Layout: `<root>/<n>back/<i>.txt` and `<root>/<n>back/seeds.json`.
/// Returns the written block paths.
pub fn write_protocol(
    root: impl AsRef<Path>,
    runs: &[ProtocolRun],
    seed_marker: bool,
) -> Result<Vec<PathBuf>, NBackError> {
    let mut written = Vec::new();
    for run in runs {
        let dir = nback_dir(&root, run.n);
        fs::create_dir_all(&dir)?;
        for (idx, block) in run.blocks.iter().enumerate() {
            let path = dir.join(format!("{idx}.{BLOCK_EXTENSION}"));
            write_sequence(&path, &block.sequence, seed_marker)?;
            written.push(path);
        }
        let seeds_path = dir.join(SEEDS_FILENAME);
        let seeds = serde_json::to_vec_pretty(&run.seeds()).map_err(|err| NBackError::Artifact {
            path: seeds_path.clone(),
            reason: err.to_string(),
        })?;
        fs::write(&seeds_path, seeds)?;
        debug!(n = run.n, blocks = run.blocks.len(), dir = %dir.display(), "protocol blocks written");
    }
    Ok(written)
}

/// Seeds recorded by [`write_protocol`] for one n.
pub fn read_seeds(root: impl AsRef<Path>, n: NBack) -> Result<Vec<u64>, NBackError> {
    let path = nback_dir(root, n).join(SEEDS_FILENAME);
    let raw = fs::read(&path)?;
    serde_json::from_slice(&raw).map_err(|err| NBackError::Artifact {
        path,
        reason: err.to_string(),
    })
}
