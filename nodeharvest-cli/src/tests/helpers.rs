//! Test helpers for staging stores and temporary workspaces.

use camino::{Utf8Path, Utf8PathBuf};
use nodeharvest_core::MergeStore;
use nodeharvest_core::test_support::point_record;
use tempfile::TempDir;

/// Temporary directory exposing UTF-8 paths.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }
}

/// Persist a store holding one point per `(id, origin)` pair.
pub(super) fn write_store(path: &Utf8Path, records: &[(&str, &str)]) {
    let mut store = MergeStore::new();
    store.merge(
        records
            .iter()
            .map(|(id, origin)| point_record(id, origin, -74.1, 4.6)),
    );
    store.persist(path).expect("persist store");
}

pub(super) fn load_store(path: &Utf8Path) -> MergeStore {
    MergeStore::load(path).expect("load store")
}
