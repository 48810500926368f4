//! Migration persistence and versioning.
//!
//! A [`MigrationStore`] hands out version tokens and records generated
//! artifacts. [`FsMigrationStore`] keeps one Rust source file per artifact in a
//! directory, next to a `version.json` manifest listing every version in the
//! order it was written.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{info, warn};

/// Manifest file name inside a migrations directory.
pub const MANIFEST_FILE: &str = "version.json";

/// Errors raised by a migration store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The migrations directory could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest could not be parsed or written.
    #[error("Manifest error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A version token is malformed.
    #[error("Invalid version '{0}': expected major.minor.patch")]
    InvalidVersion(String),

    /// The version was already recorded.
    #[error("Version {0} already exists")]
    VersionExists(Version),

    /// The patch component cannot be incremented any further.
    #[error("No version follows {0}: patch component is at its maximum")]
    VersionExhausted(Version),
}

/// A `major.minor.patch` version token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component.
    pub patch: u32,
}

impl Version {
    /// The version handed out when nothing was recorded yet.
    pub const INITIAL: Self = Self::new(1, 0, 1);

    /// Creates a version.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns the following patch version.
    pub fn next(self) -> Result<Self, StoreError> {
        let patch = self
            .patch
            .checked_add(1)
            .ok_or(StoreError::VersionExhausted(self))?;
        Ok(Self::new(self.major, self.minor, patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StoreError::InvalidVersion(s.to_string());
        let parts: Vec<&str> = s.trim().trim_start_matches('v').split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(invalid());
        };
        Ok(Self::new(
            major.parse().map_err(|_| invalid())?,
            minor.parse().map_err(|_| invalid())?,
            patch.parse().map_err(|_| invalid())?,
        ))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A generated migration ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationArtifact {
    /// Rust source of the migration.
    pub code: String,
    /// Version token handed out by the store.
    pub version: Version,
    /// Human-readable summary, e.g. `Created table acme_posts`.
    pub description: String,
    /// Table the migration applies to.
    pub table: String,
    /// Snake-case file stem, e.g. `table_create_acme_posts`.
    pub migration_name: String,
}

/// Versioning and persistence for generated migrations.
pub trait MigrationStore {
    /// Returns the next version token. Tokens increase monotonically.
    fn next_version(&self) -> Result<Version, StoreError>;

    /// Records an artifact.
    fn persist(&self, artifact: &MigrationArtifact) -> Result<(), StoreError>;
}

/// One entry of the `version.json` manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Version token.
    pub version: Version,
    /// Artifact description.
    pub description: String,
    /// Source files written for this version, relative to the directory.
    pub scripts: Vec<String>,
    /// When the entry was written.
    pub generated_at: DateTime<Utc>,
}

/// A [`MigrationStore`] backed by a directory.
#[derive(Debug, Clone)]
pub struct FsMigrationStore {
    dir: PathBuf,
}

impl FsMigrationStore {
    /// Creates a store writing into `dir`. The directory is created on the
    /// first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the migrations directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads the manifest; a missing manifest is empty.
    pub fn manifest(&self) -> Result<Vec<ManifestEntry>, StoreError> {
        let path = self.dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_manifest(&self, entries: &[ManifestEntry]) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(self.dir.join(MANIFEST_FILE), content + "\n")?;
        Ok(())
    }

    /// Picks `<stem>.rs`, or `<stem>_2.rs`, `<stem>_3.rs`... when taken.
    fn free_file_name(&self, stem: &str) -> String {
        let mut name = format!("{stem}.rs");
        let mut n = 2;
        while self.dir.join(&name).exists() {
            name = format!("{stem}_{n}.rs");
            n += 1;
        }
        name
    }
}

impl MigrationStore for FsMigrationStore {
    fn next_version(&self) -> Result<Version, StoreError> {
        self.manifest()?
            .iter()
            .map(|entry| entry.version)
            .max()
            .map_or(Ok(Version::INITIAL), Version::next)
    }

    fn persist(&self, artifact: &MigrationArtifact) -> Result<(), StoreError> {
        let mut entries = self.manifest()?;
        if entries.iter().any(|e| e.version == artifact.version) {
            return Err(StoreError::VersionExists(artifact.version));
        }

        fs::create_dir_all(&self.dir)?;
        let file_name = self.free_file_name(&artifact.migration_name);
        let script = self.dir.join(&file_name);
        fs::write(&script, &artifact.code)?;

        entries.push(ManifestEntry {
            version: artifact.version,
            description: artifact.description.clone(),
            scripts: vec![file_name.clone()],
            generated_at: Utc::now(),
        });
        // A script must never outlive a failed manifest write.
        if let Err(err) = self.write_manifest(&entries) {
            if let Err(cleanup) = fs::remove_file(&script) {
                warn!(file = %file_name, "could not remove orphaned script: {cleanup}");
            }
            return Err(err);
        }

        info!(
            version = %artifact.version,
            file = %file_name,
            "{}",
            artifact.description
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(version: Version, name: &str) -> MigrationArtifact {
        MigrationArtifact {
            code: "pub struct TableCreateAcmePosts;\n".to_string(),
            version,
            description: "Created table acme_posts".to_string(),
            table: "acme_posts".to_string(),
            migration_name: name.to_string(),
        }
    }

    #[test]
    fn test_version_parse_and_display() {
        let version: Version = "1.2.3".parse().unwrap();
        assert_eq!(version, Version::new(1, 2, 3));
        assert_eq!(version.to_string(), "1.2.3");
        assert_eq!("v1.0.9".parse::<Version>().unwrap(), Version::new(1, 0, 9));
        assert_eq!(version.next().unwrap(), Version::new(1, 2, 4));
    }

    #[test]
    fn test_version_parse_invalid() {
        assert!(matches!(
            "1.0".parse::<Version>(),
            Err(StoreError::InvalidVersion(_))
        ));
        assert!("1.x.0".parse::<Version>().is_err());
    }

    #[test]
    fn test_version_next_overflow() {
        let last = Version::new(1, 0, u32::MAX);
        match last.next() {
            Err(StoreError::VersionExhausted(version)) => assert_eq!(version, last),
            other => panic!("Expected VersionExhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_next_version_after_exhausted_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMigrationStore::new(dir.path());
        store
            .persist(&artifact(
                Version::new(1, 0, u32::MAX),
                "table_create_acme_posts",
            ))
            .unwrap();

        assert!(matches!(
            store.next_version(),
            Err(StoreError::VersionExhausted(_))
        ));
    }

    #[test]
    fn test_version_ordering() {
        assert!(Version::new(1, 0, 10) > Version::new(1, 0, 9));
        assert!(Version::new(2, 0, 0) > Version::new(1, 9, 9));
    }

    #[test]
    fn test_first_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMigrationStore::new(dir.path().join("migrations"));
        assert_eq!(store.next_version().unwrap(), Version::INITIAL);
        assert!(store.manifest().unwrap().is_empty());
    }

    #[test]
    fn test_persist_writes_file_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMigrationStore::new(dir.path());

        let version = store.next_version().unwrap();
        store
            .persist(&artifact(version, "table_create_acme_posts"))
            .unwrap();

        let code = fs::read_to_string(dir.path().join("table_create_acme_posts.rs")).unwrap();
        assert!(code.contains("TableCreateAcmePosts"));

        let manifest = store.manifest().unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].version, Version::new(1, 0, 1));
        assert_eq!(manifest[0].scripts, vec!["table_create_acme_posts.rs"]);

        let raw = fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        assert!(raw.contains("\"version\": \"1.0.1\""));

        assert_eq!(store.next_version().unwrap(), Version::new(1, 0, 2));
    }

    #[test]
    fn test_file_name_collision() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMigrationStore::new(dir.path());

        for _ in 0..3 {
            let version = store.next_version().unwrap();
            store
                .persist(&artifact(version, "table_update_acme_posts"))
                .unwrap();
        }

        let scripts: Vec<String> = store
            .manifest()
            .unwrap()
            .into_iter()
            .flat_map(|e| e.scripts)
            .collect();
        assert_eq!(
            scripts,
            vec![
                "table_update_acme_posts.rs",
                "table_update_acme_posts_2.rs",
                "table_update_acme_posts_3.rs",
            ]
        );
    }

    #[test]
    fn test_duplicate_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMigrationStore::new(dir.path());

        store
            .persist(&artifact(Version::INITIAL, "table_create_acme_posts"))
            .unwrap();
        let err = store
            .persist(&artifact(Version::INITIAL, "table_create_acme_tags"))
            .unwrap_err();

        match err {
            StoreError::VersionExists(version) => assert_eq!(version, Version::INITIAL),
            other => panic!("Expected VersionExists, got {other:?}"),
        }
        assert!(!dir.path().join("table_create_acme_tags.rs").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_manifest_write_removes_script() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMigrationStore::new(dir.path());
        // Dangling link: reads as a missing manifest, writes fail.
        std::os::unix::fs::symlink(
            dir.path().join("missing").join(MANIFEST_FILE),
            dir.path().join(MANIFEST_FILE),
        )
        .unwrap();

        let err = store
            .persist(&artifact(Version::INITIAL, "table_create_acme_posts"))
            .unwrap_err();

        assert!(matches!(err, StoreError::Io(_)));
        assert!(!dir.path().join("table_create_acme_posts.rs").exists());
    }
}
