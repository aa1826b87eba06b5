//! Collaborators supplied by the embedding program
//!
//! The front-end never touches the file system or the clock directly. Include
//! files, `$$Read` and `$$Resource` data and build metadata all come through the traits here,
//! bundled in a [`Host`]. The default implementations cover the usual cases;
//! tests swap in the in-memory ones.

use crate::parser::ast::ResType;
use chrono::{Local, NaiveDateTime};
use rustc_hash::FxHashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// One `#include` / `#import` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncludeRequest<'a> {
    pub path: &'a str,
    /// `<path>` rather than a string expression
    pub angled: bool,
    /// Name of the file containing the directive
    pub from: &'a str,
}

/// Source text returned by a resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludedSource {
    /// Name used in diagnostics and as the `from` of nested includes
    pub name: String,
    pub text: String,
}

pub trait IncludeResolver {
    fn resolve(&self, request: &IncludeRequest<'_>) -> io::Result<IncludedSource>;
}

/// Backs `$$Read` and `$$Resource`
pub trait FileReader {
    fn read_bytes(&self, path: &str) -> io::Result<Vec<u8>>;

    /// One resource from the resource fork of `path`.
    ///
    /// Readers that know nothing about resource forks refuse.
    fn read_resource(&self, _path: &str, _type_code: ResType, _id: i64, _name: &[u8]) -> io::Result<Vec<u8>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "resource forks are not supported",
        ))
    }
}

/// Date, time, version and shell variables seen by the pseudo-functions.
pub trait BuildMetadata {
    /// Local time of the build
    fn now(&self) -> NaiveDateTime;

    fn version(&self) -> String;

    fn shell_variable(&self, name: &str) -> Option<String>;

    /// `$$Date`, e.g. "Wednesday, August 30, 1995"
    fn date(&self) -> String {
        self.now().format("%A, %B %-d, %Y").to_string()
    }

    /// `$$Time`, e.g. "23:45:35"
    fn time(&self) -> String {
        self.now().format("%H:%M:%S").to_string()
    }
}

/// Searches the including file's directory, then the configured paths.
/// Angle-bracket includes only search the configured paths.
#[derive(Debug, Clone, Default)]
pub struct FsIncludeResolver {
    search_paths: Vec<PathBuf>,
}

impl FsIncludeResolver {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        FsIncludeResolver { search_paths }
    }

    fn candidates(&self, request: &IncludeRequest<'_>) -> Vec<PathBuf> {
        let path = Path::new(request.path);
        if path.is_absolute() {
            return vec![path.to_path_buf()];
        }

        let mut candidates = Vec::new();
        if !request.angled {
            let base = Path::new(request.from).parent().unwrap_or_else(|| Path::new(""));
            candidates.push(base.join(path));
        }
        candidates.extend(self.search_paths.iter().map(|dir| dir.join(path)));
        if !request.angled {
            candidates.push(path.to_path_buf());
        }
        candidates
    }
}

impl IncludeResolver for FsIncludeResolver {
    fn resolve(&self, request: &IncludeRequest<'_>) -> io::Result<IncludedSource> {
        for candidate in self.candidates(request) {
            trace!(candidate = %candidate.display(), "trying include candidate");
            if candidate.is_file() {
                let bytes = fs::read(&candidate)?;
                return Ok(IncludedSource {
                    name: candidate.display().to_string(),
                    text: String::from_utf8_lossy(&bytes).into_owned(),
                });
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            "not found in any include directory",
        ))
    }
}

/// Include files held in memory, keyed by the path exactly as written
#[derive(Debug, Clone, Default)]
pub struct MemoryIncludeResolver {
    files: FxHashMap<String, String>,
}

impl MemoryIncludeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.insert(path.into(), text.into());
        self
    }
}

impl IncludeResolver for MemoryIncludeResolver {
    fn resolve(&self, request: &IncludeRequest<'_>) -> io::Result<IncludedSource> {
        self.files
            .get(request.path)
            .map(|text| IncludedSource {
                name: request.path.to_string(),
                text: text.clone(),
            })
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

/// Reads from the file system, trying each search directory in turn.
#[derive(Debug, Clone, Default)]
pub struct FsFileReader {
    search_paths: Vec<PathBuf>,
}

impl FsFileReader {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        FsFileReader { search_paths }
    }
}

impl FileReader for FsFileReader {
    fn read_bytes(&self, path: &str) -> io::Result<Vec<u8>> {
        let direct = Path::new(path);
        if direct.is_file() || direct.is_absolute() {
            return fs::read(direct);
        }
        for dir in &self.search_paths {
            let candidate = dir.join(direct);
            if candidate.is_file() {
                return fs::read(candidate);
            }
        }
        Err(io::Error::new(io::ErrorKind::NotFound, "file not found"))
    }
}

/// Refuses every read; the default so `$$Read` cannot reach the disk unless allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyFileReader;

impl FileReader for DenyFileReader {
    fn read_bytes(&self, _path: &str) -> io::Result<Vec<u8>> {
        Err(denied())
    }

    fn read_resource(&self, _path: &str, _type_code: ResType, _id: i64, _name: &[u8]) -> io::Result<Vec<u8>> {
        Err(denied())
    }
}

fn denied() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "file reading is disabled")
}

#[derive(Debug, Clone, Default)]
pub struct MemoryFileReader {
    files: FxHashMap<String, Vec<u8>>,
    /// Keyed by file, type and ID; the resource name is not consulted
    resources: FxHashMap<(String, ResType, i64), Vec<u8>>,
}

impl MemoryFileReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), bytes.into());
        self
    }

    pub fn with_resource(
        mut self,
        path: impl Into<String>,
        type_code: ResType,
        id: i64,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.resources.insert((path.into(), type_code, id), bytes.into());
        self
    }
}

impl FileReader for MemoryFileReader {
    fn read_bytes(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn read_resource(&self, path: &str, type_code: ResType, id: i64, _name: &[u8]) -> io::Result<Vec<u8>> {
        self.resources
            .get(&(path.to_string(), type_code, id))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such resource"))
    }
}

/// Local clock, this crate's version and the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMetadata;

impl BuildMetadata for SystemMetadata {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn version(&self) -> String {
        format!("rezparse version {}", env!("CARGO_PKG_VERSION"))
    }

    fn shell_variable(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Reproducible metadata for tests and deterministic builds
#[derive(Debug, Clone)]
pub struct FixedMetadata {
    pub timestamp: NaiveDateTime,
    pub version: String,
    pub shell: FxHashMap<String, String>,
}

impl FixedMetadata {
    pub fn new(timestamp: NaiveDateTime, version: impl Into<String>) -> Self {
        FixedMetadata {
            timestamp,
            version: version.into(),
            shell: FxHashMap::default(),
        }
    }

    pub fn with_shell_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.shell.insert(name.into(), value.into());
        self
    }
}

impl BuildMetadata for FixedMetadata {
    fn now(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn version(&self) -> String {
        self.version.clone()
    }

    fn shell_variable(&self, name: &str) -> Option<String> {
        self.shell.get(name).cloned()
    }
}

/// Everything a parse may ask of the outside world
pub struct Host {
    pub resolver: Box<dyn IncludeResolver>,
    pub reader: Box<dyn FileReader>,
    pub metadata: Box<dyn BuildMetadata>,
}

impl Default for Host {
    fn default() -> Self {
        Host {
            resolver: Box::new(FsIncludeResolver::default()),
            reader: Box::new(DenyFileReader),
            metadata: Box::new(SystemMetadata),
        }
    }
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    /// File-system host searching `include_paths`
    pub fn with_include_paths(include_paths: Vec<PathBuf>) -> Self {
        Host {
            resolver: Box::new(FsIncludeResolver::new(include_paths)),
            ..Self::default()
        }
    }

    pub fn resolver(mut self, resolver: impl IncludeResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn reader(mut self, reader: impl FileReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn metadata(mut self, metadata: impl BuildMetadata + 'static) -> Self {
        self.metadata = Box::new(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed() -> FixedMetadata {
        let timestamp = NaiveDate::from_ymd_opt(1995, 8, 30)
            .unwrap()
            .and_hms_opt(23, 45, 35)
            .unwrap();
        FixedMetadata::new(timestamp, "Rez V3.0")
    }

    #[test]
    fn test_date_and_time_format() {
        let meta = fixed();
        assert_eq!(meta.date(), "Wednesday, August 30, 1995");
        assert_eq!(meta.time(), "23:45:35");
        assert_eq!(meta.version(), "Rez V3.0");
    }

    #[test]
    fn test_memory_resolver() {
        let resolver = MemoryIncludeResolver::new().with_file("a.r", "type 'a' {};");
        let request = IncludeRequest {
            path: "a.r",
            angled: false,
            from: "main.r",
        };
        assert_eq!(resolver.resolve(&request).unwrap().text, "type 'a' {};");

        let missing = IncludeRequest { path: "b.r", ..request };
        assert_eq!(
            resolver.resolve(&missing).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_fs_resolver_prefers_including_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("src");
        let inc = dir.path().join("inc");
        fs::create_dir_all(&sub).unwrap();
        fs::create_dir_all(&inc).unwrap();
        fs::write(sub.join("defs.r"), "local").unwrap();
        fs::write(inc.join("defs.r"), "search path").unwrap();

        let resolver = FsIncludeResolver::new(vec![inc.clone()]);
        let from = sub.join("main.r").display().to_string();

        let quoted = IncludeRequest {
            path: "defs.r",
            angled: false,
            from: &from,
        };
        assert_eq!(resolver.resolve(&quoted).unwrap().text, "local");

        let angled = IncludeRequest {
            angled: true,
            ..quoted
        };
        assert_eq!(resolver.resolve(&angled).unwrap().text, "search path");
    }

    #[test]
    fn test_deny_reader() {
        let err = DenyFileReader.read_bytes("/etc/hosts").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        let err = DenyFileReader
            .read_resource("System", ResType::from_bytes(*b"snd "), 1, b"")
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_memory_reader_resources() {
        let icon = ResType::from_bytes(*b"ICN#");
        let reader = MemoryFileReader::new().with_resource("Finder", icon, 128, vec![0xFFu8; 4]);
        assert_eq!(reader.read_resource("Finder", icon, 128, b"").unwrap(), vec![0xFF; 4]);
        assert_eq!(
            reader.read_resource("Finder", icon, 129, b"").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        // Plain file readers have no resource fork support
        let fs_reader = FsFileReader::new(Vec::new());
        assert_eq!(
            fs_reader.read_resource("Finder", icon, 128, b"").unwrap_err().kind(),
            io::ErrorKind::Unsupported
        );
    }

    #[test]
    fn test_fs_reader_search_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blob.bin"), [1u8, 2, 3]).unwrap();
        let reader = FsFileReader::new(vec![dir.path().to_path_buf()]);
        assert_eq!(reader.read_bytes("blob.bin").unwrap(), vec![1, 2, 3]);
    }
}
