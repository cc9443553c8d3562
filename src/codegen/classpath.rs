//! Classpath lookup.
//!
//! A classpath is an ordered list of directories and zip/jar archives plus
//! the set of classes compiled in-process. Lookups are answered from the
//! in-process registry first, so a unit compiled (or skeleton-registered)
//! earlier in the same invocation shadows anything on disk. Parsed entries
//! are cached for the lifetime of the driver invocation.

use super::builtins::builtin_class;
use super::class_reader::{parse_class, ParsedClass};
use crate::common::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use zip::ZipArchive;

enum Entry {
    Directory(PathBuf),
    Archive(ZipArchive<File>),
}

#[derive(Default)]
pub struct ClassPath {
    entries: Vec<Entry>,
    cache: HashMap<String, Option<Rc<ParsedClass>>>,
    in_process: HashMap<String, Rc<ParsedClass>>,
}

impl ClassPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_directory(&mut self, path: impl Into<PathBuf>) {
        self.entries.push(Entry::Directory(path.into()));
    }

    pub fn add_archive(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path.as_ref())?;
        let archive = ZipArchive::new(file)
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        self.entries.push(Entry::Archive(archive));
        Ok(())
    }

    /// Add a path, dispatching on whether it is a directory or an archive.
    pub fn add_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.is_dir() {
            self.add_directory(path);
            Ok(())
        } else {
            self.add_archive(path)
        }
    }

    /// Locate the platform runtime archive through `JAVA_HOME`. Returns
    /// false when no archive could be found; resolution then relies on
    /// in-process classes only.
    pub fn add_runtime_archive(&mut self) -> Result<bool> {
        let Ok(java_home) = std::env::var("JAVA_HOME") else {
            return Ok(false);
        };
        let home = PathBuf::from(java_home);
        for candidate in [home.join("lib/rt.jar"), home.join("jre/lib/rt.jar")] {
            if candidate.is_file() {
                self.add_archive(candidate)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Register a class compiled (or signature-registered) in this
    /// invocation. Later registrations replace earlier ones, so a skeleton
    /// from phase 1 is upgraded by the full description.
    pub fn register(&mut self, class: ParsedClass) {
        self.cache.remove(&class.name);
        self.in_process.insert(class.name.clone(), Rc::new(class));
    }

    pub fn contains(&mut self, internal_name: &str) -> bool {
        self.find(internal_name).is_some()
    }

    /// Look up a class by internal name.
    pub fn find(&mut self, internal_name: &str) -> Option<Rc<ParsedClass>> {
        if let Some(cls) = self.in_process.get(internal_name) {
            return Some(Rc::clone(cls));
        }
        if let Some(cached) = self.cache.get(internal_name) {
            return cached.clone();
        }
        let found = self.load(internal_name);
        self.cache.insert(internal_name.to_string(), found.clone());
        found
    }

    fn load(&mut self, internal_name: &str) -> Option<Rc<ParsedClass>> {
        let file_name = format!("{}.class", internal_name);
        for entry in &mut self.entries {
            match entry {
                Entry::Directory(dir) => {
                    let path = dir.join(&file_name);
                    let Ok(data) = std::fs::read(&path) else {
                        continue;
                    };
                    if let Ok(parsed) = parse_class(&data) {
                        return Some(Rc::new(parsed));
                    }
                }
                Entry::Archive(archive) => {
                    let Ok(mut zipped) = archive.by_name(&file_name) else {
                        continue;
                    };
                    let mut data = Vec::with_capacity(zipped.size() as usize);
                    if zipped.read_to_end(&mut data).is_err() {
                        continue;
                    }
                    if let Ok(parsed) = parse_class(&data) {
                        return Some(Rc::new(parsed));
                    }
                }
            }
        }
        // last resort: the compiled-in platform surface, so the printing,
        // wrapper and functional-interface machinery resolves without a
        // runtime archive
        builtin_class(internal_name).map(Rc::new)
    }
}
