//! State file storage for persisting poll cursors between runs.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use directories::ProjectDirs;
use fs2::FileExt;
use tracing::{debug, warn};
use uuid::Uuid;

use esm_core::PollCursor;

use super::StoredState;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// A cursor read from disk, remembering the version it was read at.
#[derive(Debug)]
pub struct LoadedCursor {
    pub cursor: PollCursor,
    pub read_version: Option<u64>,
}

/// Exclusive hold on one trigger's state, released on drop.
///
/// Loading and saving a trigger's state require the hold, so two runs of the
/// same trigger cannot interleave.
#[derive(Debug)]
pub struct TriggerLock {
    trigger: String,
    file: File,
}

impl TriggerLock {
    pub fn trigger(&self) -> &str {
        &self.trigger
    }
}

impl Drop for TriggerLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Directory of state files.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Use `dir`, or the platform data directory when none is given.
    pub fn open(dir: Option<PathBuf>) -> Result<Self> {
        let dir = match dir {
            Some(dir) => dir,
            None => {
                let dirs = ProjectDirs::from("", "", "esm-sync")
                    .context("Could not determine data directory")?;
                dirs.data_dir().join("poll-state")
            }
        };

        fs::create_dir_all(&dir).context("Failed to create state directory")?;
        Ok(Self { dir })
    }

    /// Returns the state file of a trigger.
    pub fn path(&self, trigger: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_key(trigger)))
    }

    /// Take the exclusive hold on a trigger. Fails at once if another run
    /// holds it.
    pub fn lock(&self, trigger: &str) -> Result<TriggerLock> {
        let path = self.dir.join(format!("{}.lock", file_key(trigger)));
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .context("Failed to open state lock file")?;

        if file.try_lock_exclusive().is_err() {
            bail!("Another poll for trigger '{}' is running", trigger);
        }
        debug!(trigger, "Locked poll state");

        Ok(TriggerLock {
            trigger: trigger.to_string(),
            file,
        })
    }

    /// Load a trigger's cursor. A trigger that never polled starts empty.
    ///
    /// State written for a different instance or template is ignored.
    pub fn load(&self, lock: &TriggerLock, base_url: &str, template: &str) -> Result<LoadedCursor> {
        let trigger = lock.trigger();
        let path = self.path(trigger);
        let Some(stored) = read(&path)? else {
            debug!(trigger, "No poll state yet");
            return Ok(LoadedCursor {
                cursor: PollCursor::new(),
                read_version: None,
            });
        };

        if stored.base_url != base_url || stored.template != template {
            warn!(
                trigger,
                stored_template = %stored.template,
                stored_base = %stored.base_url,
                "Poll state belongs to another configuration; starting fresh"
            );
            return Ok(LoadedCursor {
                cursor: PollCursor::new(),
                read_version: Some(stored.cursor.version()),
            });
        }

        Ok(LoadedCursor {
            read_version: Some(stored.cursor.version()),
            cursor: stored.cursor,
        })
    }

    /// Write a trigger's cursor.
    ///
    /// Refuses to overwrite state another run wrote after `read_version`.
    pub fn save(
        &self,
        lock: &TriggerLock,
        base_url: &str,
        template: &str,
        cursor: &PollCursor,
        read_version: Option<u64>,
    ) -> Result<()> {
        let trigger = lock.trigger();
        let path = self.path(trigger);

        let on_disk = read(&path)?.map(|stored| stored.cursor.version());
        if on_disk != read_version {
            bail!(
                "Poll state for trigger '{}' changed while polling (read version {:?}, now {:?})",
                trigger,
                read_version,
                on_disk
            );
        }

        let stored = StoredState {
            base_url: base_url.to_string(),
            template: template.to_string(),
            updated_at: Utc::now(),
            cursor: cursor.clone(),
        };
        let json = serde_json::to_string_pretty(&stored)?;

        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        fs::write(&tmp, &json).context("Failed to write state file")?;

        // Set restrictive permissions (Unix only)
        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&tmp)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&tmp, perms)?;
        }

        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(err).context("Failed to replace state file");
        }
        debug!(trigger, version = cursor.version(), "Saved poll state");
        Ok(())
    }
}

fn read(path: &Path) -> Result<Option<StoredState>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path).context("Failed to read state file")?;
    let stored = serde_json::from_str(&json).context("Invalid state file")?;
    Ok(Some(stored))
}

/// Map a trigger name to a safe file name.
fn file_key(trigger: &str) -> String {
    trigger
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}
