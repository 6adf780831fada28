//! Core data models for repograph
//!
//! Typed extraction records produced by the Python syntax index. These are
//! plain data: nothing here touches the graph store.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Inclusive, 1-based line span of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }

    /// Number of lines covered
    pub fn span(&self) -> u32 {
        self.end.saturating_sub(self.start) + 1
    }
}

/// A call expression inside a function body, callee as written (`foo`,
/// `self.bar`, `mod.baz`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub callee: String,
    pub line: u32,
}

/// A function or method definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub range: LineRange,
    /// Header text up to the body, e.g. `def run(self, x: int) -> bool`
    pub signature: String,
    /// Dedented source of the whole definition
    pub code: String,
    pub is_async: bool,
    pub calls: Vec<CallSite>,
    /// Bare identifiers read in the body, sorted and deduplicated
    pub uses: Vec<String>,
    /// Attribute names accessed through `self.`
    pub self_uses: Vec<String>,
}

/// A class attribute: class-body assignment or `self.x = ...` in a method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    /// Lexically nested name, `Outer.Inner` for nested classes
    pub qualname: String,
    pub range: LineRange,
    /// Base expressions as written, declaration order
    pub bases: Vec<String>,
    pub methods: Vec<FunctionDef>,
    pub fields: Vec<FieldDef>,
    /// `class Name(Base)` header text
    pub signature: String,
    pub code: String,
}

impl ClassDef {
    pub fn method(&self, name: &str) -> Option<&FunctionDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn defines(&self, name: &str) -> bool {
        self.method(name).is_some()
    }
}

/// Module-level variable assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalDef {
    pub name: String,
    pub range: LineRange,
    pub code: String,
}

/// A name listed in an import statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedName {
    /// Name as imported; `*` for wildcard imports
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    /// Name the import binds in the importing module
    pub fn bound_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportKind {
    /// `import a.b as c`
    Plain,
    /// `from a.b import c`
    From,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStmt {
    pub kind: ImportKind,
    /// Dotted module path without the leading dots of a relative import
    pub module: String,
    /// Number of leading dots (0 for absolute imports)
    pub level: usize,
    pub names: Vec<ImportedName>,
    pub line: u32,
}

/// Everything the syntax index extracts from one source file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedFile {
    pub path: PathBuf,
    /// All classes, nested ones included, outer before inner
    pub classes: Vec<ClassDef>,
    /// Top-level functions only
    pub functions: Vec<FunctionDef>,
    pub imports: Vec<ImportStmt>,
    pub globals: Vec<GlobalDef>,
}

impl ParsedFile {
    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// (class name, method) pairs for every method in the file
    pub fn methods(&self) -> impl Iterator<Item = (&ClassDef, &FunctionDef)> {
        self.classes
            .iter()
            .flat_map(|c| c.methods.iter().map(move |m| (c, m)))
    }
}
