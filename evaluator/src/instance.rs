//! An immutable snapshot of a module's (or provider's) source files.
//!
//! `Instance` is what the loader's *load* phase returns: parsing and
//! module-graph resolution happen, but no evaluation. The file bytes are
//! captured once on the main thread; each executor job re-parses its own
//! copy in a fresh [`crate::Context`] rather than reusing this handle
//! (spec §5, §9: "module instance reuse is unsafe").

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), bytes: bytes.into() }
    }
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub root: PathBuf,
    pub package_name: String,
    pub files: Vec<SourceFile>,
}

impl Instance {
    /// Byte snapshot of every file, safe to hand to any number of workers.
    pub fn snapshot(&self) -> Vec<SourceFile> {
        self.files.clone()
    }

    pub fn with_extra_file(&self, file: SourceFile) -> Instance {
        let mut files = self.files.clone();
        files.push(file);
        Instance { root: self.root.clone(), package_name: self.package_name.clone(), files }
    }
}
