//! Filesystem artifact cache.
//!
//! ## Layout
//!
//! ```text
//! <cache_dir>/
//! └── 3f/
//!     └── 3f9a…e1.hbsc     # sha256(template name)
//! ```
//!
//! Writes go to a temporary file in the destination directory which is synced,
//! renamed over the artifact, and followed by a sync of the directory. Several processes may share one cache directory:
//! the last writer wins and readers see either the old or the new artifact,
//! never a partial one.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tempfile::NamedTempFile;

use super::{evaluate, name_digest, ArtifactCache, CacheKey, NEVER_WRITTEN};
use crate::error::{HbsError, Result};
use crate::render::RenderFunction;

const ARTIFACT_EXT: &str = "hbsc";

/// Artifact cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct FilesystemCache {
    directory: PathBuf,
}

impl FilesystemCache {
    /// The directory is created lazily on first write.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl ArtifactCache for FilesystemCache {
    fn generate_key(&self, name: &str) -> Option<CacheKey> {
        let hash = name_digest(name)?;
        let path = self
            .directory
            .join(&hash[..2])
            .join(format!("{hash}.{ARTIFACT_EXT}"));
        Some(CacheKey::new(path))
    }

    fn write(&self, key: &CacheKey, content: &str) -> Result<()> {
        let path = key.as_path();
        let dir = path.parent().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cache key has no parent directory: {key}"),
            )
        })?;
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        // Make the rename itself durable.
        #[cfg(unix)]
        std::fs::File::open(dir)?.sync_all()?;

        tracing::debug!(key = %key, bytes = content.len(), "artifact written");
        Ok(())
    }

    fn load(&self, key: &CacheKey) -> Result<RenderFunction> {
        let text = match std::fs::read_to_string(key.as_path()) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HbsError::ArtifactMissing(key.to_string()));
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(HbsError::ArtifactCorrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        evaluate(key, &text)
    }

    fn timestamp(&self, key: &CacheKey) -> SystemTime {
        std::fs::metadata(key.as_path())
            .and_then(|meta| meta.modified())
            .unwrap_or(NEVER_WRITTEN)
    }

    fn exists(&self, key: &CacheKey) -> bool {
        key.as_path().is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact;
    use crate::compiler::{CompileOptions, HandlebarsCompiler, TemplateCompiler};
    use serde_json::json;
    use std::sync::Arc;

    fn compiled(source: &str) -> String {
        HandlebarsCompiler::new()
            .compile(source, &CompileOptions::default())
            .unwrap()
    }

    #[test]
    fn test_key_layout() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FilesystemCache::new(dir.path());
        let key = cache.generate_key("greeting").unwrap();
        let path = key.as_path();

        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().unwrap(), "hbsc");
        let stem = path.file_stem().unwrap().to_str().unwrap();
        let fan_out = path.parent().unwrap().file_name().unwrap().to_str().unwrap();
        assert_eq!(&stem[..2], fan_out);
        assert_eq!(cache.generate_key("greeting"), Some(key.clone()));
        assert!(cache.generate_key("").is_none());
    }

    #[test]
    fn test_distinct_names_distinct_keys() {
        let cache = FilesystemCache::new("/cache");
        let names = ["a", "b", "a/b", "a\\b", "ab", "a.hbs", "emails/welcome", "emails/welcome.hbs"];
        let keys: std::collections::HashSet<_> =
            names.iter().map(|n| cache.generate_key(n).unwrap()).collect();
        assert_eq!(keys.len(), names.len());
    }

    #[test]
    fn test_write_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FilesystemCache::new(dir.path().join("nested/cache"));
        let key = cache.generate_key("greeting").unwrap();
        let code = compiled("Hello, {{name}}!");

        cache.write(&key, &artifact::encode("greeting", &code)).unwrap();

        let on_disk = std::fs::read_to_string(key.as_path()).unwrap();
        assert!(on_disk.starts_with("// greeting\n"));

        let direct = RenderFunction::from_code("greeting", &code).unwrap();
        let loaded = cache.load(&key).unwrap();
        let context = json!({"name": "Ada"});
        assert_eq!(loaded.call(&context).unwrap(), "Hello, Ada!");
        assert_eq!(loaded.call(&context).unwrap(), direct.call(&context).unwrap());
        assert_eq!(loaded.name(), "greeting");
    }

    #[test]
    fn test_missing_and_timestamp_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FilesystemCache::new(dir.path());
        let key = cache.generate_key("absent").unwrap();

        assert!(!cache.exists(&key));
        assert_eq!(cache.timestamp(&key), NEVER_WRITTEN);
        assert!(matches!(cache.load(&key), Err(HbsError::ArtifactMissing(_))));
    }

    #[test]
    fn test_timestamp_after_write() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FilesystemCache::new(dir.path());
        let key = cache.generate_key("t").unwrap();
        cache.write(&key, &artifact::encode("t", &compiled("x"))).unwrap();

        assert!(cache.exists(&key));
        assert!(cache.timestamp(&key) > NEVER_WRITTEN);
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FilesystemCache::new(dir.path());
        let key = cache.generate_key("t").unwrap();
        cache.write(&key, "// t\n{ truncated").unwrap();

        assert!(matches!(
            cache.load(&key),
            Err(HbsError::ArtifactCorrupt { .. })
        ));
    }

    #[test]
    fn test_overwrite_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FilesystemCache::new(dir.path());
        let key = cache.generate_key("t").unwrap();
        cache.write(&key, &artifact::encode("t", &compiled("one"))).unwrap();
        cache.write(&key, &artifact::encode("t", &compiled("two"))).unwrap();

        let entries: Vec<_> = std::fs::read_dir(key.as_path().parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(cache.load(&key).unwrap().call(&json!({})).unwrap(), "two");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_syncs_into_fresh_shard_directory() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let cache = FilesystemCache::new(dir.path().join("cache"));
        let key = cache.generate_key("t").unwrap();
        let shard = key.as_path().parent().unwrap().to_path_buf();
        assert!(!shard.exists());

        cache.write(&key, &artifact::encode("t", &compiled("x"))).unwrap();

        let mode = std::fs::metadata(key.as_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        let names: Vec<_> = std::fs::read_dir(&shard)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![key.as_path().file_name().unwrap().to_os_string()]);
    }

    #[test]
    fn test_concurrent_writers_never_tear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(FilesystemCache::new(dir.path()));
        let key = cache.generate_key("race").unwrap();

        // Large bodies make a torn read likely if writes were not atomic.
        let bodies: Vec<String> = (0..4)
            .map(|i| artifact::encode("race", &compiled(&format!("{i}").repeat(64 * 1024))))
            .collect();
        cache.write(&key, &bodies[0]).unwrap();

        let writers: Vec<_> = bodies
            .iter()
            .cloned()
            .map(|body| {
                let cache = Arc::clone(&cache);
                let key = key.clone();
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        cache.write(&key, &body).unwrap();
                    }
                })
            })
            .collect();

        let reader = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let output = cache.load(&key).unwrap().call(&json!({})).unwrap();
                    assert_eq!(output.len(), 64 * 1024);
                    let first = output.chars().next().unwrap();
                    assert!(output.chars().all(|c| c == first));
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();
    }
}
