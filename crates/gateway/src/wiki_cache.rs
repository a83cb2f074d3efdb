//! Content-addressed wiki page cache under `wiki_dump/<sha1>/`. Read-mostly
//! and safe for concurrent readers; writers go through a temp-then-rename
//! so a reader never observes a half-written file.

use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};

pub struct WikiCache {
    root: PathBuf,
}

/// Flatten a wiki file path (which may contain `/`) into a single
/// filesystem-safe component.
fn sanitize(file: &str) -> String {
    file.replace('/', "__")
}

impl WikiCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn hash_of(content: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn dir_for(&self, hash: &str) -> PathBuf {
        self.root.join(hash)
    }

    pub fn load(&self, hash: &str, file: &str) -> Option<String> {
        std::fs::read_to_string(self.dir_for(hash).join(sanitize(file))).ok()
    }

    /// Write `content` for `file` under the cache entry for `hash`,
    /// creating the directory if needed and writing through a temp file
    /// in the same directory before renaming into place.
    pub fn store(&self, hash: &str, file: &str, content: &str) -> std::io::Result<()> {
        let dir = self.dir_for(hash);
        std::fs::create_dir_all(&dir)?;

        let target = dir.join(sanitize(file));
        let tmp = dir.join(format!("{}.tmp-{}", sanitize(file), std::process::id()));
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_loads_by_hash() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WikiCache::new(dir.path());
        let hash = WikiCache::hash_of("hello wiki");
        cache.store(&hash, "onboarding/setup.md", "hello wiki").unwrap();

        assert_eq!(cache.load(&hash, "onboarding/setup.md").as_deref(), Some("hello wiki"));
    }

    #[test]
    fn missing_entries_return_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WikiCache::new(dir.path());
        assert_eq!(cache.load("deadbeef", "nope.md"), None);
    }

    #[test]
    fn no_temp_file_left_behind_after_a_successful_store() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WikiCache::new(dir.path());
        let hash = WikiCache::hash_of("content");
        cache.store(&hash, "page.md", "content").unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join(&hash))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["page.md".to_string()]);
    }
}
