// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON file backed device store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{DeviceRecord, DeviceStore, SetOutcome, apply_targets, record_states};
use crate::error::{Error, Result, StoreError};
use crate::protocol::DeviceStates;

/// Device store keeping one JSON record file per device.
///
/// Every read goes to disk, so values written by other processes are
/// always visible. A `set` rewrites the whole file in a single write, which
/// is what the file watcher observes as a change.
///
/// # Examples
///
/// ```no_run
/// use devnotify::store::{DeviceStore, FileStore};
///
/// let store = FileStore::new([("relay", "devices/relay.json")]);
/// let states = store.states("relay")?;
/// println!("{states:?}");
/// # Ok::<(), devnotify::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileStore {
    paths: BTreeMap<String, PathBuf>,
}

impl FileStore {
    /// Creates a store from `(device name, record path)` pairs.
    #[must_use]
    pub fn new<I, N, P>(devices: I) -> Self
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            paths: devices
                .into_iter()
                .map(|(name, path)| (name.into(), path.into()))
                .collect(),
        }
    }

    /// Returns the record path of `device`.
    #[must_use]
    pub fn path(&self, device: &str) -> Option<&Path> {
        self.paths.get(device).map(PathBuf::as_path)
    }

    fn resolve(&self, device: &str) -> Result<&Path> {
        self.path(device)
            .ok_or_else(|| Error::UnknownDevice(device.to_string()))
    }

    fn read_record(&self, device: &str) -> Result<DeviceRecord> {
        let path = self.resolve(device)?;
        let contents = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let record = serde_json::from_str(&contents).map_err(|e| StoreError::Format {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(record)
    }

    fn write_record(&self, device: &str, record: &DeviceRecord) -> Result<()> {
        let path = self.resolve(device)?;
        let contents = serde_json::to_string_pretty(record).map_err(|e| StoreError::Format {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        fs::write(path, contents).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}

impl DeviceStore for FileStore {
    fn device_names(&self) -> Vec<String> {
        self.paths.keys().cloned().collect()
    }

    fn states(&self, device: &str) -> Result<DeviceStates> {
        tracing::debug!(device = %device, "Reading device states");
        Ok(record_states(&self.read_record(device)?))
    }

    fn set(&mut self, device: &str, targets: &[(String, String)]) -> Result<SetOutcome> {
        tracing::debug!(device = %device, ?targets, "Changing device states");
        let mut record = self.read_record(device)?;
        if !apply_targets(device, &mut record, targets)? {
            return Ok(SetOutcome::Unchanged);
        }
        self.write_record(device, &record)?;
        Ok(SetOutcome::Applied(record_states(&record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AttributeRecord;

    fn write_relay(dir: &Path) -> PathBuf {
        let path = dir.join("relay.json");
        let record = DeviceRecord::from([
            ("ch1".to_string(), AttributeRecord::new("OFF", &["ON", "OFF"])),
            ("ch2".to_string(), AttributeRecord::new("OFF", &["ON", "OFF"])),
        ]);
        fs::write(&path, serde_json::to_string(&record).unwrap()).unwrap();
        path
    }

    #[test]
    fn reads_states_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new([("relay", write_relay(dir.path()))]);

        let states = store.states("relay").unwrap();
        assert_eq!(states["ch1"], "OFF");
        assert_eq!(store.state("relay", "ch2").unwrap(), "OFF");
    }

    #[test]
    fn unknown_device_and_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new([("relay", write_relay(dir.path()))]);

        assert!(matches!(store.states("lamp"), Err(Error::UnknownDevice(_))));
        assert!(matches!(
            store.state("relay", "ch9"),
            Err(Error::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn set_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_relay(dir.path());
        let mut store = FileStore::new([("relay", path.clone())]);

        let targets = vec![("ch1".to_string(), "ON".to_string())];
        let outcome = store.set("relay", &targets).unwrap();
        let SetOutcome::Applied(states) = outcome else {
            panic!("expected applied");
        };
        assert_eq!(states["ch1"], "ON");

        let on_disk: DeviceRecord =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["ch1"].state, "ON");
        assert_eq!(on_disk["ch1"].possible_states, "ON, OFF");
    }

    #[test]
    fn unchanged_set_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_relay(dir.path());
        let before = fs::read_to_string(&path).unwrap();
        let mut store = FileStore::new([("relay", path.clone())]);

        let targets = vec![("ch1".to_string(), "OFF".to_string())];
        assert_eq!(store.set("relay", &targets).unwrap(), SetOutcome::Unchanged);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn missing_file_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new([("relay", dir.path().join("missing.json"))]);
        assert!(matches!(
            store.states("relay"),
            Err(Error::Store(StoreError::Io { .. }))
        ));
    }

    #[test]
    fn malformed_file_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        fs::write(&path, "{\"ch1\": \"ON\"").unwrap();
        let store = FileStore::new([("relay", path)]);
        assert!(matches!(
            store.states("relay"),
            Err(Error::Store(StoreError::Format { .. }))
        ));
    }
}
