//! Destinations for received text: the on-screen log and the backup file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::SinkError;
use crate::logbuf::LogStore;

struct Mirror {
    path: PathBuf,
    file: File,
}

impl Mirror {
    fn create(path: PathBuf) -> Result<Self, SinkError> {
        let file = File::create(&path).map_err(|e| SinkError::io(&path, e))?;
        Ok(Self { path, file })
    }

    fn append(&mut self, data: &[u8]) -> Result<(), SinkError> {
        self.file
            .write_all(data)
            .and_then(|()| self.file.flush())
            .map_err(|e| SinkError::io(&self.path, e))
    }
}

pub struct OutputSink {
    log: LogStore,
    dir: PathBuf,
    mirror: Mirror,
    mirror_enabled: bool,
}

impl OutputSink {
    /// Creates `dir` if needed and starts a fresh backup file
    /// `<dir>/<backup_name>.txt`.
    pub fn new(
        dir: impl Into<PathBuf>,
        backup_name: &str,
        mirror_enabled: bool,
    ) -> Result<Self, SinkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| SinkError::io(&dir, e))?;
        let path = text_file_path(&dir, backup_name)?;
        let mirror = Mirror::create(path)?;
        info!("mirroring output to {}", mirror.path.display());
        Ok(Self {
            log: LogStore::new(),
            dir,
            mirror,
            mirror_enabled,
        })
    }

    pub fn log(&self) -> &LogStore {
        &self.log
    }

    pub fn system(&mut self, message: impl Into<String>) {
        self.log.push_system(message);
    }

    /// Appends one received line to the display and, when enabled, its raw
    /// bytes to the backup file. The line is in the log even if the file
    /// write fails.
    pub fn record(&mut self, raw: &[u8], text: &str) -> Result<(), SinkError> {
        self.log.push_device(raw, text);
        if self.mirror_enabled {
            self.mirror.append(raw)?;
        }
        Ok(())
    }

    pub fn set_mirror_enabled(&mut self, enabled: bool) {
        self.mirror_enabled = enabled;
    }

    pub fn mirror_path(&self) -> &Path {
        &self.mirror.path
    }

    pub fn clear_output(&mut self) {
        self.log.clear_output();
    }

    pub fn snapshot_path(&self, name: &str) -> Result<PathBuf, SinkError> {
        text_file_path(&self.dir, name)
    }

    /// Writes the visible output, as received, to `<dir>/<name>.txt`. Later
    /// mirrored lines are appended to that file.
    ///
    /// An existing file is left untouched unless `overwrite` is set.
    pub fn save_snapshot(&mut self, name: &str, overwrite: bool) -> Result<PathBuf, SinkError> {
        let path = self.snapshot_path(name)?;
        if path.exists() && !overwrite {
            return Err(SinkError::FileAlreadyExists(path));
        }
        let mut mirror = Mirror::create(path.clone())?;
        mirror.append(self.log.output_bytes())?;
        debug!(
            "mirror moved from {} to {}",
            self.mirror.path.display(),
            mirror.path.display()
        );
        self.mirror = mirror;
        info!("saved snapshot to {}", path.display());
        Ok(path)
    }
}

fn text_file_path(dir: &Path, name: &str) -> Result<PathBuf, SinkError> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(SinkError::InvalidFileName(name.to_string()));
    }
    Ok(dir.join(format!("{name}.txt")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(dir: &Path) -> OutputSink {
        OutputSink::new(dir.join("SavedFiles"), "defaultFile", true).unwrap()
    }

    #[test]
    fn creates_backup_file_on_startup() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = sink(tmp.path());
        assert_eq!(
            sink.mirror_path(),
            tmp.path().join("SavedFiles").join("defaultFile.txt")
        );
        assert_eq!(fs::read_to_string(sink.mirror_path()).unwrap(), "");
    }

    #[test]
    fn records_lines_to_log_and_backup_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = sink(tmp.path());
        sink.record(b"first\r\n", "first\r\n").unwrap();
        sink.record(b"second\r\n", "second\r\n").unwrap();
        assert_eq!(sink.log().output_text(), "first\r\nsecond\r\n");
        assert_eq!(
            fs::read_to_string(sink.mirror_path()).unwrap(),
            "first\r\nsecond\r\n"
        );
    }

    #[test]
    fn disabled_mirror_only_updates_log() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = sink(tmp.path());
        sink.set_mirror_enabled(false);
        sink.record(b"quiet\n", "quiet\n").unwrap();
        assert_eq!(sink.log().output_text(), "quiet\n");
        assert_eq!(fs::read_to_string(sink.mirror_path()).unwrap(), "");
    }

    #[test]
    fn snapshot_refuses_existing_file_without_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = sink(tmp.path());
        let target = sink.snapshot_path("run1").unwrap();
        fs::write(&target, "keep me").unwrap();
        sink.record(b"new data\n", "new data\n").unwrap();

        let err = sink.save_snapshot("run1", false).unwrap_err();
        assert!(matches!(err, SinkError::FileAlreadyExists(ref p) if *p == target));
        assert_eq!(fs::read_to_string(&target).unwrap(), "keep me");
    }

    #[test]
    fn snapshot_overwrites_and_takes_over_mirroring() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = sink(tmp.path());
        let target = sink.snapshot_path("run1").unwrap();
        fs::write(&target, "old").unwrap();
        sink.record(b"a\n", "a\n").unwrap();

        assert_eq!(sink.save_snapshot("run1", true).unwrap(), target);
        sink.record(b"b\n", "b\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "a\nb\n");
        assert_eq!(sink.mirror_path(), target);
    }

    #[test]
    fn rejects_path_like_names() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = sink(tmp.path());
        for name in ["", "  ", "../escape", "a/b", "a\\b", ".."] {
            assert!(matches!(
                sink.save_snapshot(name, true),
                Err(SinkError::InvalidFileName(_))
            ));
        }
    }

    #[test]
    fn backup_gets_received_bytes_not_decoded_text() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = sink(tmp.path());
        sink.record(b"T=21\xb0C\n", "T=21\u{b0}C\n").unwrap();
        assert_eq!(fs::read(sink.mirror_path()).unwrap(), b"T=21\xb0C\n");

        sink.save_snapshot("run2", false).unwrap();
        assert_eq!(fs::read(sink.mirror_path()).unwrap(), b"T=21\xb0C\n");
    }
}
