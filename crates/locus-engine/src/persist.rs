//! Snapshots of long-lived requests, so they can be recreated after a restart.
//!
//! Only configuration is stored: identifier, optional name and the kind's
//! options. Subscribers and received values are not.

use crate::error::PersistError;
use crate::request::{
    LocationOptions, LocationRequest, QueuedRequest, RegionOptions, RegionRequest, Request,
    RequestOptions, VisitsOptions, VisitsRequest,
};
use locus_core::{LocusConfig, RequestId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the default store inside the data directory.
pub const STORE_FILE_NAME: &str = "requests.json";

/// Kind-specific configuration of a persisted request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersistedOptions {
    /// Continuous or significant location updates
    Location(LocationOptions),
    /// Region monitor
    Region(RegionOptions),
    /// Visits monitor
    Visits(VisitsOptions),
}

/// A persisted request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    /// Identifier, reused on restore
    pub id: RequestId,
    /// Caller-chosen name
    pub name: Option<String>,
    /// Kind-specific configuration
    pub options: PersistedOptions,
}

impl RequestSnapshot {
    /// Recreate an idle request with the same identifier and name.
    #[must_use]
    pub fn restore(&self) -> RestoredRequest {
        match &self.options {
            PersistedOptions::Location(options) => {
                RestoredRequest::Location(self.rebuild(options.clone()))
            }
            PersistedOptions::Region(options) => {
                RestoredRequest::Region(self.rebuild(options.clone()))
            }
            PersistedOptions::Visits(options) => RestoredRequest::Visits(self.rebuild(*options)),
        }
    }

    fn rebuild<O: RequestOptions>(&self, options: O) -> Request<O> {
        let request = Request::with_id(self.id.clone(), options);
        if let Some(name) = &self.name {
            request.set_name(name.clone());
        }
        request
    }
}

/// A request recreated from a [`RequestSnapshot`].
#[derive(Debug, Clone)]
pub enum RestoredRequest {
    /// Location request
    Location(LocationRequest),
    /// Region monitor
    Region(RegionRequest),
    /// Visits monitor
    Visits(VisitsRequest),
}

impl RestoredRequest {
    /// Identifier of the restored request.
    #[must_use]
    pub fn id(&self) -> &RequestId {
        self.as_queued().id()
    }

    pub(crate) fn as_queued(&self) -> &dyn QueuedRequest {
        match self {
            Self::Location(request) => request as &dyn QueuedRequest,
            Self::Region(request) => request,
            Self::Visits(request) => request,
        }
    }

    pub(crate) fn boxed(&self) -> Box<dyn QueuedRequest> {
        match self {
            Self::Location(request) => Box::new(request.clone()),
            Self::Region(request) => Box::new(request.clone()),
            Self::Visits(request) => Box::new(request.clone()),
        }
    }
}

/// JSON file holding request snapshots.
#[derive(Debug, Clone)]
pub struct RequestStore {
    path: PathBuf,
}

impl RequestStore {
    /// Store at an explicit path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the platform data directory.
    pub fn open_default() -> Result<Self, PersistError> {
        Ok(Self::new(LocusConfig::data_dir()?.join(STORE_FILE_NAME)))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored snapshots.
    pub fn save(&self, snapshots: &[RequestSnapshot]) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(snapshots)?;
        fs::write(&self.path, contents)?;
        debug!(count = snapshots.len(), path = %self.path.display(), "Saved request snapshots");
        Ok(())
    }

    /// Load stored snapshots. A missing file yields an empty list.
    pub fn load(&self) -> Result<Vec<RequestSnapshot>, PersistError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        let snapshots: Vec<RequestSnapshot> = serde_json::from_str(&contents)?;
        debug!(count = snapshots.len(), path = %self.path.display(), "Loaded request snapshots");
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{LocationAccuracy, RequestState};
    use crate::timeout::TimeoutMode;
    use locus_core::{ActivityType, Coordinates, Region};
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_json_shape() {
        let request = VisitsRequest::new(VisitsOptions::new(ActivityType::Fitness));
        request.set_name("gym");
        let snapshot = QueuedRequest::snapshot(&request).expect("visits are persisted");

        let json = serde_json::to_value(&snapshot).expect("serialize snapshot");
        assert_eq!(json["id"], request.id().as_str());
        assert_eq!(json["name"], "gym");
        assert_eq!(json["options"]["kind"], "visits");
        assert_eq!(json["options"]["activity"], "fitness");
    }

    #[test]
    fn test_restore_keeps_identity() {
        let options = LocationOptions::continuous()
            .accuracy(LocationAccuracy::House)
            .min_interval(Duration::from_secs(30))
            .with_timeout(TimeoutMode::Idle(Duration::from_secs(60)));
        let request = LocationRequest::new(options.clone());
        let snapshot = QueuedRequest::snapshot(&request).expect("continuous is persisted");

        let RestoredRequest::Location(restored) = snapshot.restore() else {
            panic!("expected a location request");
        };
        assert_eq!(restored.id(), request.id());
        assert_eq!(restored.options(), &options);
        assert_eq!(restored.state(), RequestState::Idle);
    }

    #[test]
    fn test_store_round_trip() {
        let tmp = TempDir::new().expect("create temp dir");
        let store = RequestStore::new(tmp.path().join("nested").join(STORE_FILE_NAME));
        assert!(store.load().expect("load missing store").is_empty());

        let region = RegionRequest::new(RegionOptions::new(Region::new(
            "office",
            Coordinates::new(45.46, 9.19),
            150.0,
        ))
        .notify_on_entry(false));
        region.set_name("work");
        let visits = VisitsRequest::new(VisitsOptions::default());
        let snapshots: Vec<RequestSnapshot> = [
            QueuedRequest::snapshot(&region),
            QueuedRequest::snapshot(&visits),
        ]
        .into_iter()
        .flatten()
        .collect();

        store.save(&snapshots).expect("save store");
        let loaded = store.load().expect("load store");
        assert_eq!(loaded, snapshots);

        let restored = loaded[0].restore();
        assert_eq!(restored.id(), region.id());
        let RestoredRequest::Region(restored) = restored else {
            panic!("expected a region monitor");
        };
        assert_eq!(restored.name().as_deref(), Some("work"));
        assert!(!restored.options().notify_on_entry);
        assert!(restored.options().notify_on_exit);
    }

    #[test]
    fn test_corrupt_store() {
        let tmp = TempDir::new().expect("create temp dir");
        let store = RequestStore::new(tmp.path().join(STORE_FILE_NAME));
        fs::write(store.path(), "{ not json").expect("write store");
        assert!(matches!(store.load(), Err(PersistError::Json(_))));
    }
}
