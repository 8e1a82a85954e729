// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File system change event source.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::ChangeEvent;
use crate::error::{Error, Result};

/// Watches device record files and emits a [`ChangeEvent`] per write.
///
/// Events are delivered from the watcher's own thread with `try_send`; when
/// the channel is full the event is dropped with a warning. Nothing is
/// lost by that: the dispatcher diffs against its cache, so the next event
/// for the device reports every pending change.
///
/// Dropping the `FileWatcher` stops watching.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    paths: PathMap,
}

impl FileWatcher {
    /// Starts watching the given `(device, path)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Watch`] if the watcher cannot be created or a path
    /// cannot be watched.
    pub fn spawn<I, N, P>(devices: I, sender: mpsc::Sender<ChangeEvent>) -> Result<Self>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: AsRef<Path>,
    {
        let devices: Vec<(String, PathBuf)> = devices
            .into_iter()
            .map(|(name, path)| (name.into(), path.as_ref().to_path_buf()))
            .collect();
        let paths = PathMap::new(&devices);
        let handler_paths = paths.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => forward(&handler_paths, &event, &sender),
                Err(e) => tracing::warn!(error = %e, "File watcher error"),
            },
            notify::Config::default(),
        )
        .map_err(|e| Error::Watch(e.to_string()))?;

        for (device, path) in &devices {
            watcher
                .watch(path, RecursiveMode::NonRecursive)
                .map_err(|e| Error::Watch(format!("{}: {e}", path.display())))?;
            tracing::info!(device = %device, path = %path.display(), "Watching device");
        }

        Ok(Self {
            _watcher: watcher,
            paths,
        })
    }

    /// Returns the device whose record lives at `path`.
    #[must_use]
    pub fn device_for_path(&self, path: &Path) -> Option<&str> {
        self.paths.lookup(path)
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

/// Lookup from record path (as configured and canonicalized) to device.
#[derive(Debug, Clone, Default)]
struct PathMap(HashMap<PathBuf, String>);

impl PathMap {
    fn new(devices: &[(String, PathBuf)]) -> Self {
        let mut map = HashMap::new();
        for (device, path) in devices {
            if let Ok(canonical) = path.canonicalize() {
                map.insert(canonical, device.clone());
            }
            map.insert(path.clone(), device.clone());
        }
        Self(map)
    }

    fn lookup(&self, path: &Path) -> Option<&str> {
        if let Some(device) = self.0.get(path) {
            return Some(device);
        }
        let canonical = path.canonicalize().ok()?;
        self.0.get(&canonical).map(String::as_str)
    }
}

/// Returns `true` for events that mean "content was written".
fn is_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
            | EventKind::Access(AccessKind::Close(AccessMode::Write))
    )
}

fn forward(paths: &PathMap, event: &Event, sender: &mpsc::Sender<ChangeEvent>) {
    if !is_write(&event.kind) {
        return;
    }
    for path in &event.paths {
        let Some(device) = paths.lookup(path) else {
            tracing::trace!(path = %path.display(), "Ignoring change of unknown path");
            continue;
        };
        tracing::debug!(device = %device, "Device resource changed");
        match sender.try_send(ChangeEvent::new(device)) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(device = %event.device, "Change event channel full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Change event channel closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use notify::event::{CreateKind, DataChange, MetadataKind};

    use super::*;

    #[test]
    fn write_kinds() {
        assert!(is_write(&EventKind::Modify(ModifyKind::Data(DataChange::Any))));
        assert!(is_write(&EventKind::Access(AccessKind::Close(AccessMode::Write))));
        assert!(!is_write(&EventKind::Access(AccessKind::Close(AccessMode::Read))));
        assert!(!is_write(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))));
        assert!(!is_write(&EventKind::Create(CreateKind::File)));
    }

    #[test]
    fn forward_maps_path_to_device() {
        let paths = PathMap::new(&[("relay".to_string(), PathBuf::from("/tmp/devices/relay.json"))]);
        let (tx, mut rx) = mpsc::channel(4);

        let event = Event::new(EventKind::Access(AccessKind::Close(AccessMode::Write)))
            .add_path(PathBuf::from("/tmp/devices/relay.json"));
        forward(&paths, &event, &tx);

        let unknown = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from("/tmp/devices/other.json"));
        forward(&paths, &unknown, &tx);

        assert_eq!(rx.try_recv().unwrap(), ChangeEvent::new("relay"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn forward_drops_when_full() {
        let paths = PathMap::new(&[("relay".to_string(), PathBuf::from("/tmp/devices/relay.json"))]);
        let (tx, mut rx) = mpsc::channel(1);
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/tmp/devices/relay.json"));

        forward(&paths, &event, &tx);
        forward(&paths, &event, &tx);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn emits_event_when_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        std::fs::write(&path, "{}").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let watcher = FileWatcher::spawn([("relay", &path)], tx).unwrap();
        assert_eq!(watcher.device_for_path(&path), Some("relay"));

        std::fs::write(&path, "{\"ch1\": {\"state\": \"ON\", \"possible_states\": \"ON, OFF\"}}")
            .unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.device, "relay");
    }
}
