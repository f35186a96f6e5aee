//! Loading and saving the persisted workspace document (spec §6).
//!
//! Saves are atomic: the new document is written to a sibling temp file
//! and renamed over the target, so a crash mid-write never leaves a
//! truncated workspace file behind. A workspace file that fails to parse
//! is preserved under a timestamped `.bak` name rather than silently
//! discarded, mirroring the reference server's recovery behavior.

use crate::error::{ConfigError, Result};
use crate::model::AppState;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Load a workspace document from `path`.
///
/// Every environment's `play_state` is forced to `STOPPED` on load
/// (spec §6: a freshly started process has nothing playing yet,
/// regardless of what was persisted).
///
/// If the file exists but fails to parse, it is renamed aside to
/// `<path>.<unix_ts>.bak` and the error is still returned — the caller
/// decides whether to fall back to a fresh default workspace.
pub fn load_workspace(path: impl AsRef<Path>) -> Result<AppState> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    match serde_json::from_str::<AppState>(&contents) {
        Ok(mut state) => {
            state.force_all_stopped();
            Ok(state)
        }
        Err(parse_err) => {
            let _ = backup_corrupted(path);
            Err(ConfigError::JsonParse(parse_err))
        }
    }
}

/// Load a workspace document, falling back to `AppState::default()`-like
/// behavior via `fallback` when the file is missing or corrupted.
pub fn load_workspace_or_else(
    path: impl AsRef<Path>,
    fallback: impl FnOnce() -> AppState,
) -> AppState {
    match load_workspace(&path) {
        Ok(state) => state,
        Err(_) => fallback(),
    }
}

/// Persist `state` to `path` atomically: write to a temp file in the
/// same directory, then rename over the target.
pub fn save_workspace(path: impl AsRef<Path>, state: &AppState) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let json = serde_json::to_string_pretty(state)?;
    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, json).map_err(|e| ConfigError::write_file(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| ConfigError::write_file(path, e))?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("workspace.json");
    path.with_file_name(format!("{file_name}.tmp"))
}

fn backup_corrupted(path: &Path) -> std::io::Result<PathBuf> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("workspace.json");
    let backup_path = path.with_file_name(format!("{file_name}.{ts}.bak"));
    fs::copy(path, &backup_path)?;
    Ok(backup_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Effects, PlayState};

    fn sample_state() -> AppState {
        AppState {
            environments: vec![crate::model::Environment {
                id: "e1".into(),
                name: "Forest".into(),
                max_weight: 10.0,
                background_image: None,
                soundboard: vec![],
                layers: vec![],
                presets: vec![],
                active_preset_id: None,
                play_state: PlayState::Playing,
            }],
            master_volume: 0.8,
            soundboard: vec![],
            effects: Effects::default(),
            files: vec![],
        }
    }

    #[test]
    fn save_then_load_roundtrips_and_forces_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspace.json");

        save_workspace(&path, &sample_state()).unwrap();
        let loaded = load_workspace(&path).unwrap();

        assert_eq!(loaded.master_volume, 0.8);
        assert_eq!(loaded.environments[0].play_state, PlayState::Stopped);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspace.json");
        save_workspace(&path, &sample_state()).unwrap();
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn corrupted_file_is_backed_up_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspace.json");
        fs::write(&path, "{ not valid json").unwrap();

        let result = load_workspace(&path);
        assert!(result.is_err());

        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let state = load_workspace_or_else(&path, sample_state);
        assert_eq!(state.master_volume, 0.8);
    }
}
