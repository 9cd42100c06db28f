// tests/integration_test.rs

//! Integration tests for regsync
//!
//! These tests drive full synchronization runs against an in-memory remote
//! serving real zip archives, with the real extractor and a temp directory.

use regsync::archive::ArchiveExtractor;
use regsync::config::{ConcurrencyPolicy, SyncConfig};
use regsync::registry::{HttpResponse, RegistryDocument, Transport};
use regsync::sync::{Synchronizer, TaskKind};
use regsync::{PackageErrorKind, TransportError};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const REGISTRY_URL: &str = "https://remote.test/registry.json";
const ARCHIVE_BASE: &str = "https://remote.test";

/// Remote registry and archives held in memory
#[derive(Default)]
struct Remote {
    packages: Mutex<Vec<(String, String)>>,
    archives: Mutex<HashMap<String, Vec<u8>>>,
    downloads: Mutex<Vec<String>>,
}

impl Remote {
    /// Publish `name@version` with the given files
    fn publish(&self, name: &str, version: &str, files: &[(&str, &str)]) {
        let mut packages = self.packages.lock().unwrap();
        packages.retain(|(n, _)| n != name);
        packages.push((name.to_string(), version.to_string()));

        let url = format!("{}/{}/{}-{}.zip", ARCHIVE_BASE, name, name, version);
        self.archives.lock().unwrap().insert(url, zip_bytes(files));
    }

    /// Publish `name@version` serving `body` as its archive verbatim
    fn publish_raw(&self, name: &str, version: &str, body: &[u8]) {
        let mut packages = self.packages.lock().unwrap();
        packages.retain(|(n, _)| n != name);
        packages.push((name.to_string(), version.to_string()));

        let url = format!("{}/{}/{}-{}.zip", ARCHIVE_BASE, name, name, version);
        self.archives.lock().unwrap().insert(url, body.to_vec());
    }

    /// List `name@version` in the registry without serving its archive
    fn publish_broken(&self, name: &str, version: &str) {
        self.packages
            .lock()
            .unwrap()
            .push((name.to_string(), version.to_string()));
    }

    fn registry_json(&self) -> String {
        let doc: RegistryDocument = self.packages.lock().unwrap().iter().cloned().collect();
        serde_json::to_string(&doc).unwrap()
    }

    fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }
}

struct RemoteTransport(Arc<Remote>);

impl Transport for RemoteTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        if url != REGISTRY_URL {
            return Ok(HttpResponse {
                status: 404,
                body: Vec::new(),
            });
        }
        Ok(HttpResponse {
            status: 200,
            body: self.0.registry_json().into_bytes(),
        })
    }

    fn download(&self, url: &str, dest: &Path) -> Result<(), TransportError> {
        self.0.downloads.lock().unwrap().push(url.to_string());
        let archives = self.0.archives.lock().unwrap();
        let body = archives.get(url).ok_or_else(|| TransportError::Status {
            url: url.to_string(),
            status: 404,
        })?;
        fs::write(dest, body).map_err(|source| TransportError::Io {
            path: dest.to_path_buf(),
            source,
        })
    }
}

fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn synchronizer(root: &TempDir, remote: &Arc<Remote>, policy: ConcurrencyPolicy) -> Synchronizer {
    let mut config = SyncConfig::new(root.path().join("downloads"));
    config.registry_url = REGISTRY_URL.to_string();
    config.archive_base_url = ARCHIVE_BASE.to_string();
    config.concurrency = policy;

    Synchronizer::with_components(
        config,
        Box::new(RemoteTransport(Arc::clone(remote))),
        Box::new(ArchiveExtractor::new()),
    )
    .unwrap()
}

fn parallel() -> ConcurrencyPolicy {
    ConcurrencyPolicy::Parallel { limit: 3 }
}

/// Relative paths of all files below `dir`, sorted
fn list_files(dir: &Path) -> Vec<String> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let relative = path.strip_prefix(base).unwrap();
                out.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    let mut files = Vec::new();
    walk(dir, dir, &mut files);
    files.sort();
    files
}

#[test]
fn test_first_sync_mirrors_every_package() {
    let temp_dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(Remote::default());
    remote.publish("brackets-git", "0.14.3", &[("main.js", "git"), ("nls/strings.js", "{}")]);
    remote.publish("emmet", "1.2.0", &[("main.js", "emmet")]);

    let sync = synchronizer(&temp_dir, &remote, parallel());
    let report = sync.run().unwrap();

    assert!(report.is_clean(), "First sync should succeed");
    assert_eq!(report.tasks(), 2);

    let store = sync.store();
    assert_eq!(
        list_files(&store.expansion_path("brackets-git")),
        vec!["main.js", "nls/strings.js"]
    );
    assert!(store.archive_exists("emmet", "1.2.0"));

    let snapshot = store.load_snapshot().unwrap();
    assert_eq!(snapshot.version_of("brackets-git"), Some("0.14.3"));
    assert_eq!(snapshot.version_of("emmet"), Some("1.2.0"));
}

#[test]
fn test_second_run_without_changes_is_noop() {
    let temp_dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(Remote::default());
    remote.publish("alpha", "1.0.0", &[("a.js", "1")]);
    remote.publish("beta", "1.0.0", &[("b.js", "1")]);

    synchronizer(&temp_dir, &remote, parallel()).run().unwrap();
    let snapshot_path = temp_dir.path().join("downloads/registry.json");
    let before = fs::read(&snapshot_path).unwrap();
    let downloads_before = remote.download_count();

    let sync = synchronizer(&temp_dir, &remote, parallel());
    assert!(sync.plan().unwrap().tasks.is_empty());

    let report = sync.run().unwrap();
    assert_eq!(report.tasks(), 0);
    assert_eq!(remote.download_count(), downloads_before);

    // Snapshot rewritten with identical content
    assert_eq!(fs::read(&snapshot_path).unwrap(), before);
}

#[test]
fn test_version_bump_replaces_expansion_without_residue() {
    let temp_dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(Remote::default());
    remote.publish("alpha", "1.0.0", &[("main.js", "v1"), ("legacy/old.js", "old")]);
    remote.publish("beta", "1.0.0", &[("main.js", "beta")]);
    synchronizer(&temp_dir, &remote, parallel()).run().unwrap();

    remote.publish("alpha", "1.1.0", &[("main.js", "v2"), ("lib/new.js", "new")]);
    let downloads_before = remote.download_count();

    let sync = synchronizer(&temp_dir, &remote, parallel());
    let report = sync.run().unwrap();

    assert_eq!(report.batch.succeeded, vec!["alpha"]);
    assert_eq!(remote.download_count(), downloads_before + 1);

    let dest = sync.store().expansion_path("alpha");
    assert_eq!(list_files(&dest), vec!["lib/new.js", "main.js"]);
    assert_eq!(fs::read_to_string(dest.join("main.js")).unwrap(), "v2");

    // Old archive stays cached under its own key
    assert!(sync.store().archive_exists("alpha", "1.0.0"));
    assert!(sync.store().archive_exists("alpha", "1.1.0"));
}

#[test]
fn test_lost_snapshot_reexpands_from_cache() {
    let temp_dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(Remote::default());
    remote.publish("alpha", "1.0.0", &[("main.js", "v1")]);
    remote.publish("beta", "2.0.0", &[("main.js", "v2")]);
    synchronizer(&temp_dir, &remote, parallel()).run().unwrap();

    // Simulate an interrupted run: snapshot gone, archives still cached
    fs::remove_file(temp_dir.path().join("downloads/registry.json")).unwrap();
    let downloads_before = remote.download_count();

    let sync = synchronizer(&temp_dir, &remote, parallel());
    let plan = sync.plan().unwrap();
    assert_eq!(plan.tasks.len(), 2);
    assert!(plan
        .tasks
        .iter()
        .all(|t| t.kind == TaskKind::NeedsReExpandOnly));

    let report = sync.run().unwrap();
    assert!(report.is_clean());
    assert_eq!(remote.download_count(), downloads_before, "No network fetch expected");
    assert_eq!(
        fs::read_to_string(sync.store().expansion_path("beta").join("main.js")).unwrap(),
        "v2"
    );
}

#[test]
fn test_failures_are_contained_and_snapshot_still_written() {
    let temp_dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(Remote::default());
    remote.publish("ok-1", "1.0.0", &[("a", "1")]);
    remote.publish("ok-2", "1.0.0", &[("b", "2")]);
    remote.publish("ok-3", "1.0.0", &[("c", "3")]);
    remote.publish_broken("missing-1", "1.0.0");
    remote.publish_broken("missing-2", "1.0.0");

    let sync = synchronizer(&temp_dir, &remote, ConcurrencyPolicy::Parallel { limit: 2 });
    let report = sync.run().unwrap();

    assert_eq!(report.tasks(), 5);
    assert_eq!(report.batch.succeeded, vec!["ok-1", "ok-2", "ok-3"]);
    assert_eq!(report.batch.failed.len(), 2);
    assert!(report
        .batch
        .failed
        .iter()
        .all(|e| e.kind() == PackageErrorKind::DownloadFailed));
    assert!(report.snapshot_error.is_none());

    let snapshot = sync.store().load_snapshot().unwrap();
    assert_eq!(snapshot.len(), 5);
    assert!(!sync.store().archive_exists("missing-1", "1.0.0"));

    // Failed downloads left no archive, so the next run retries them
    let retry = synchronizer(&temp_dir, &remote, parallel()).plan().unwrap();
    let names: Vec<&str> = retry.tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["missing-1", "missing-2"]);
}

#[test]
fn test_sequential_policy_syncs_everything() {
    let temp_dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(Remote::default());
    for name in ["one", "two", "three", "four"] {
        remote.publish(name, "0.1.0", &[("index.js", name)]);
    }

    let sync = synchronizer(&temp_dir, &remote, ConcurrencyPolicy::Sequential);
    let report = sync.run().unwrap();

    assert!(report.is_clean());
    assert_eq!(report.batch.succeeded, vec!["four", "one", "three", "two"]);
    for name in ["one", "two", "three", "four"] {
        assert_eq!(
            fs::read_to_string(sync.store().expansion_path(name).join("index.js")).unwrap(),
            name
        );
    }
}

#[test]
fn test_unchanged_package_with_missing_archive_is_downloaded_again() {
    let temp_dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(Remote::default());
    remote.publish("A", "v1", &[("a", "1")]);
    synchronizer(&temp_dir, &remote, parallel()).run().unwrap();

    // Cache partially cleared between runs, B newly published
    let sync = synchronizer(&temp_dir, &remote, parallel());
    fs::remove_file(sync.store().archive_path("A", "v1")).unwrap();
    remote.publish("B", "v1", &[("b", "1")]);

    let plan = sync.plan().unwrap();
    let summary: Vec<(&str, TaskKind)> = plan
        .tasks
        .iter()
        .map(|t| (t.name.as_str(), t.kind))
        .collect();
    assert_eq!(
        summary,
        vec![("A", TaskKind::NeedsDownload), ("B", TaskKind::NeedsDownload)]
    );
}

#[test]
fn test_corrupt_archive_is_retried_on_next_run() {
    let temp_dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(Remote::default());
    remote.publish_raw("alpha", "1.0.0", b"<html>503 Service Unavailable</html>");
    remote.publish("beta", "1.0.0", &[("main.js", "beta")]);

    let sync = synchronizer(&temp_dir, &remote, parallel());
    let first = sync.run().unwrap();

    assert_eq!(first.batch.succeeded, vec!["beta"]);
    assert_eq!(first.batch.failed.len(), 1);
    assert_eq!(first.batch.failed[0].package(), "alpha");
    assert_eq!(first.batch.failed[0].kind(), PackageErrorKind::ExtractFailed);
    assert!(!sync.store().archive_exists("alpha", "1.0.0"));
    assert_eq!(
        sync.store().load_snapshot().unwrap().version_of("alpha"),
        Some("1.0.0")
    );

    // Same version, now served intact
    remote.publish("alpha", "1.0.0", &[("main.js", "v1")]);
    let downloads_before = remote.download_count();

    let second = sync.run().unwrap();

    assert!(second.is_clean());
    assert_eq!(second.batch.succeeded, vec!["alpha"]);
    assert_eq!(remote.download_count(), downloads_before + 1);
    assert_eq!(
        fs::read_to_string(sync.store().expansion_path("alpha").join("main.js")).unwrap(),
        "v1"
    );
}
