//! Handoff descriptor published as a JSON file, so another process (or a
//! synced folder) can pick up what is playing and hand it back through
//! `POST /api/activity/continue`.

use std::path::{Path, PathBuf};

use marconio_core::clients::{UserActivity, UserActivityBridge, UserActivityEvent};
use tracing::{debug, warn};

pub struct FileActivityBridge {
    path: PathBuf,
}

impl FileActivityBridge {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The descriptor currently on disk, if any.
    pub fn read(path: &Path) -> anyhow::Result<Option<UserActivity>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, activity: &UserActivity) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // write-then-rename so readers never see a half-written file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(activity)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl UserActivityBridge for FileActivityBridge {
    fn mark_current(&mut self, activity: &UserActivity) {
        match self.write(activity) {
            Ok(()) => debug!("activity: published {:?} to {}", activity.title, self.path.display()),
            Err(e) => warn!("activity: failed to publish {}: {:#}", self.path.display(), e),
        }
    }

    fn resign_current(&mut self, activity: &UserActivity) -> UserActivityEvent {
        // only retire the file if it is still ours
        match Self::read(&self.path) {
            Ok(Some(current)) if current.id == activity.id => {
                if let Err(e) = std::fs::remove_file(&self.path) {
                    warn!("activity: failed to remove {}: {}", self.path.display(), e);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("activity: unreadable descriptor at {}: {:#}", self.path.display(), e),
        }
        UserActivityEvent::ResignCurrent
    }
}
