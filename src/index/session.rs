//! One indexing run over a project
//!
//! The session owns everything that lives for a single `run()`: parsed
//! files, the inheritance table, processed-pair memo and diagnostics. Work
//! happens in phases, each fanned out over files with rayon:
//!
//! 1. define: parse and write every file's own symbols
//! 2. link: resolve `from ... import` names into CONTAINS edges
//! 3. bases: resolve base classes into INHERITS edges
//! 4. propagate: synthesize inherited HAS_METHOD edges
//! 5. calls: CALL and USES edges from function bodies

use super::inheritance::{resolve_method, InheritanceEngine};
use super::mutator::{GraphMutator, LockRegistry};
use super::resolver::{ModuleIndexer, NameResolver, ReferenceResolver, Resolved, VisitedFiles};
use crate::attrs;
use crate::error::{Diagnostic, IndexError, IndexResult, ReferenceKind};
use crate::graph::{Attrs, EdgeKind, GraphBackend, NodeKind, NodeMatch, Pattern};
use crate::models::{FunctionDef, ImportKind, ParsedFile};
use crate::parsers::{self, display_path, import_target_module};
use dashmap::{DashMap, DashSet};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A file (or class, for propagation) whose processing failed
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub subject: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct IndexReport {
    pub files_discovered: usize,
    pub files_indexed: usize,
    pub classes: usize,
    pub propagated_pairs: usize,
    pub nodes: usize,
    pub parse_failures: Vec<Failure>,
    /// Lock or store failures; these writers stopped early
    pub writer_failures: Vec<Failure>,
    pub diagnostics: Vec<Diagnostic>,
    pub elapsed_ms: u128,
}

impl IndexReport {
    pub fn unresolved(&self, kind: ReferenceKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }
}

pub struct IndexSession {
    root: PathBuf,
    mutator: GraphMutator,
    inheritance: InheritanceEngine,
    parsed: DashMap<PathBuf, Arc<ParsedFile>>,
    /// Files whose imports are fully linked in this run
    linked: DashSet<PathBuf>,
    failed: DashSet<PathBuf>,
    /// Per module: name bound by `import a.b [as c]` -> module it names
    module_aliases: DashMap<String, HashMap<String, String>>,
    diagnostics: Mutex<Vec<Diagnostic>>,
    failures: Mutex<(Vec<Failure>, Vec<Failure>)>,
    propagated: AtomicUsize,
}

fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn function_attrs(func: &FunctionDef, file_path: &str) -> Attrs {
    attrs! {
        "name" => func.name.as_str(),
        "file_path" => file_path,
        "start_line" => func.range.start,
        "end_line" => func.range.end,
        "signature" => func.signature.as_str(),
        "code" => func.code.as_str(),
    }
}

impl IndexSession {
    pub fn new(
        root: &Path,
        backend: Arc<dyn GraphBackend>,
        task: &str,
        locks: &LockRegistry,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            mutator: GraphMutator::new(backend, task, locks),
            inheritance: InheritanceEngine::new(),
            parsed: DashMap::new(),
            linked: DashSet::new(),
            failed: DashSet::new(),
            module_aliases: DashMap::new(),
            diagnostics: Mutex::new(Vec::new()),
            failures: Mutex::new((Vec::new(), Vec::new())),
            propagated: AtomicUsize::new(0),
        }
    }

    pub fn task(&self) -> &str {
        self.mutator.task()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn inheritance(&self) -> &InheritanceEngine {
        &self.inheritance
    }

    /// Everything parsed so far, ordered by path
    pub fn parsed_files(&self) -> Vec<Arc<ParsedFile>> {
        let mut files: Vec<_> = self.parsed.iter().map(|e| e.value().clone()).collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    fn resolver(&self) -> NameResolver<'_> {
        NameResolver::new(self.mutator.backend(), self.mutator.task(), &self.root)
    }

    fn module_of(&self, path: &Path) -> String {
        parsers::module_name(&self.root, path)
    }

    fn relative_path(&self, path: &Path) -> String {
        display_path(path.strip_prefix(&self.root).unwrap_or(path))
    }

    fn diagnose(&self, diagnostic: Diagnostic) {
        debug!("{}", diagnostic);
        self.diagnostics
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(diagnostic);
    }

    /// Record a per-file failure once. Parse failures mark the file as
    /// skipped; writer failures stop that writer only.
    fn record_failure(&self, subject: &Path, error: &IndexError) {
        if !self.failed.insert(subject.to_path_buf()) {
            return;
        }
        let failure = Failure {
            subject: display_path(subject),
            error: error.to_string(),
        };
        let mut failures = self.failures.lock().unwrap_or_else(|p| p.into_inner());
        if error.is_parse_failure() {
            warn!("Skipping {}: {}", subject.display(), error);
            failures.0.push(failure);
        } else {
            warn!("Writer for {} stopped: {}", subject.display(), error);
            failures.1.push(failure);
        }
    }

    /// Files that parsed and have not failed
    fn ready(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        files
            .iter()
            .filter(|f| self.parsed.contains_key(*f) && !self.failed.contains(*f))
            .cloned()
            .collect()
    }

    // ==================== Runs ====================

    /// Index `files` as one task. Per-file failures are collected in the
    /// report and never abort the other files.
    pub fn run(&self, files: &[PathBuf]) -> IndexReport {
        let start = Instant::now();

        files.par_iter().for_each(|path| {
            if let Err(e) = self.define_file(path) {
                self.record_failure(path, &e);
            }
        });
        let ready = self.ready(files);
        info!("Defined symbols for {}/{} files", ready.len(), files.len());

        ready.par_iter().for_each(|path| {
            let mut visited = VisitedFiles::new();
            if let Err(e) = self.index_file(path, &mut visited) {
                self.record_failure(path, &e);
            }
        });

        let ready = self.ready(files);
        self.finish(&ready);
        self.report(files.len(), start)
    }

    /// Index one file plus whatever its imports pull in
    pub fn run_single(&self, file: &Path) -> IndexReport {
        let start = Instant::now();

        let mut visited = VisitedFiles::new();
        if let Err(e) = self.index_file(file, &mut visited) {
            self.record_failure(file, &e);
        }

        let touched: Vec<PathBuf> = self.parsed.iter().map(|e| e.key().clone()).collect();
        let ready = self.ready(&touched);
        self.finish(&ready);
        self.report(1, start)
    }

    fn finish(&self, ready: &[PathBuf]) {
        ready.par_iter().for_each(|path| {
            if let Err(e) = self.record_file_bases(path) {
                self.record_failure(path, &e);
            }
        });

        let classes = self.inheritance.classes();
        classes.par_iter().for_each(|class| {
            match self.inheritance.propagate_methods(class, &self.mutator) {
                Ok(pairs) => {
                    self.propagated.fetch_add(pairs, Ordering::Relaxed);
                }
                Err(e) => self.record_failure(Path::new(class), &e),
            }
        });

        self.ready(ready).par_iter().for_each(|path| {
            if let Err(e) = self.link_calls(path) {
                self.record_failure(path, &e);
            }
        });
    }

    fn report(&self, discovered: usize, start: Instant) -> IndexReport {
        let (parse_failures, writer_failures) = {
            let failures = self.failures.lock().unwrap_or_else(|p| p.into_inner());
            failures.clone()
        };
        let diagnostics = self
            .diagnostics
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();

        let backend = self.mutator.backend();
        let task = self.task();
        let report = IndexReport {
            files_discovered: discovered,
            files_indexed: self
                .parsed
                .iter()
                .filter(|e| !self.failed.contains(e.key()))
                .count(),
            classes: backend
                .query(&Pattern::node(task, NodeMatch::kind(NodeKind::Class)))
                .len(),
            propagated_pairs: self.propagated.load(Ordering::Relaxed),
            nodes: backend.query(&Pattern::node(task, NodeMatch::any())).len(),
            parse_failures,
            writer_failures,
            diagnostics,
            elapsed_ms: start.elapsed().as_millis(),
        };
        info!(
            "Indexed {} files into task '{}' in {}ms ({} unresolved references)",
            report.files_indexed,
            task,
            report.elapsed_ms,
            report.diagnostics.len()
        );
        report
    }

    // ==================== Define ====================

    /// Parse a file and write its own symbols. Cached for the run.
    fn define_file(&self, path: &Path) -> IndexResult<Arc<ParsedFile>> {
        if let Some(parsed) = self.parsed.get(path) {
            return Ok(parsed.clone());
        }
        let parsed = Arc::new(parsers::parse_file(path)?);
        self.write_definitions(&parsed)?;
        self.parsed.insert(path.to_path_buf(), parsed.clone());
        Ok(parsed)
    }

    fn write_definitions(&self, parsed: &ParsedFile) -> IndexResult<()> {
        let m = &self.mutator;
        let module = self.module_of(&parsed.path);
        let rel = self.relative_path(&parsed.path);

        m.upsert_node(
            NodeKind::Module,
            &module,
            attrs! { "name" => last_segment(&module), "file_path" => rel.as_str() },
        )?;

        for func in &parsed.functions {
            let fqn = format!("{}.{}", module, func.name);
            m.upsert_node(NodeKind::Function, &fqn, function_attrs(func, &rel))?;
            m.upsert_edge(EdgeKind::Contains, &module, &fqn, attrs!())?;
        }

        for class in &parsed.classes {
            let class_fqn = format!("{}.{}", module, class.qualname);
            m.upsert_node(
                NodeKind::Class,
                &class_fqn,
                attrs! {
                    "name" => class.name.as_str(),
                    "file_path" => rel.as_str(),
                    "start_line" => class.range.start,
                    "end_line" => class.range.end,
                    "signature" => class.signature.as_str(),
                    "code" => class.code.as_str(),
                },
            )?;
            let container = match class.qualname.rsplit_once('.') {
                Some((outer, _)) => format!("{}.{}", module, outer),
                None => module.clone(),
            };
            m.upsert_edge(EdgeKind::Contains, &container, &class_fqn, attrs!())?;

            for method in &class.methods {
                let method_fqn = format!("{}.{}", class_fqn, method.name);
                let mut method_attrs = function_attrs(method, &rel);
                method_attrs.insert("class".to_string(), class.name.as_str().into());
                m.upsert_node(NodeKind::Method, &method_fqn, method_attrs)?;
                m.upsert_edge(EdgeKind::HasMethod, &class_fqn, &method_fqn, attrs!())?;
            }

            for field in class.fields.iter().filter(|f| !class.defines(&f.name)) {
                let field_fqn = format!("{}.{}", class_fqn, field.name);
                m.upsert_node(
                    NodeKind::Field,
                    &field_fqn,
                    attrs! {
                        "name" => field.name.as_str(),
                        "file_path" => rel.as_str(),
                        "start_line" => field.line,
                    },
                )?;
                m.upsert_edge(EdgeKind::HasField, &class_fqn, &field_fqn, attrs!())?;
                m.upsert_edge(EdgeKind::Contains, &class_fqn, &field_fqn, attrs!())?;
            }
        }

        for global in &parsed.globals {
            let fqn = format!("{}.{}", module, global.name);
            m.upsert_node(
                NodeKind::GlobalVariable,
                &fqn,
                attrs! {
                    "name" => global.name.as_str(),
                    "file_path" => rel.as_str(),
                    "start_line" => global.range.start,
                    "end_line" => global.range.end,
                    "code" => global.code.as_str(),
                },
            )?;
            m.upsert_edge(EdgeKind::Contains, &module, &fqn, attrs!())?;
        }

        Ok(())
    }

    // ==================== Link ====================

    /// Define and link one file, re-entrant through name resolution
    fn index_file(&self, path: &Path, visited: &mut VisitedFiles) -> IndexResult<()> {
        if !visited.enter(path) || self.linked.contains(path) {
            return Ok(());
        }
        let parsed = self.define_file(path)?;
        self.link_imports(&parsed, visited)?;
        self.linked.insert(path.to_path_buf());
        Ok(())
    }

    fn link_imports(&self, parsed: &ParsedFile, visited: &mut VisitedFiles) -> IndexResult<()> {
        let home = self.module_of(&parsed.path);

        for stmt in &parsed.imports {
            if stmt.kind == ImportKind::Plain {
                let mut aliases = self.module_aliases.entry(home.clone()).or_default();
                for imported in &stmt.names {
                    aliases.insert(imported.bound_name().to_string(), imported.name.clone());
                }
                continue;
            }

            let target = import_target_module(&self.root, &parsed.path, stmt);
            for imported in &stmt.names {
                if imported.name == "*" {
                    self.diagnose(Diagnostic {
                        kind: ReferenceKind::Import,
                        context: home.clone(),
                        name: format!("{}.*", target),
                    });
                    continue;
                }

                match self.resolver().resolve(&imported.name, &target, visited, self)? {
                    Some(found) => {
                        let mut edge_attrs = attrs! { "association_type" => found.kind.as_str() };
                        // Re-exports can bind a name that differs from the target's own
                        let bound = imported.bound_name();
                        if imported.alias.is_some() || bound != last_segment(&found.full_name) {
                            edge_attrs.insert("alias".to_string(), bound.into());
                        }
                        self.mutator
                            .upsert_edge(EdgeKind::Contains, &home, &found.full_name, edge_attrs)?;
                    }
                    None => self.diagnose(Diagnostic {
                        kind: ReferenceKind::Import,
                        context: home.clone(),
                        name: format!("{}.{}", target, imported.name),
                    }),
                }
            }
        }
        Ok(())
    }

    // ==================== Bases ====================

    fn record_file_bases(&self, path: &Path) -> IndexResult<()> {
        let Some(parsed) = self.parsed.get(path).map(|p| p.clone()) else {
            return Ok(());
        };
        let module = self.module_of(path);
        let mut visited = VisitedFiles::new();

        for class in parsed.classes.iter().filter(|c| !c.bases.is_empty()) {
            let class_fqn = format!("{}.{}", module, class.qualname);
            let diagnostics = self.inheritance.record_bases(
                &class_fqn,
                &class.bases,
                &module,
                self,
                &mut visited,
                &self.mutator,
            )?;
            for d in diagnostics {
                self.diagnose(d);
            }
        }
        Ok(())
    }

    /// Owner of `member` on `class_fqn`: an inherited-aware method, or a field
    fn resolve_member(&self, class_fqn: &str, member: &str) -> Option<Resolved> {
        if let Some(owner) = self.resolve_method(class_fqn, member) {
            return Some(Resolved {
                full_name: format!("{}.{}", owner, member),
                kind: NodeKind::Method,
            });
        }
        let field = format!("{}.{}", class_fqn, member);
        self.mutator
            .backend()
            .get_node(self.task(), &field)
            .filter(|n| n.kind == NodeKind::Field)
            .map(|n| Resolved {
                full_name: n.full_name,
                kind: n.kind,
            })
    }

    /// Ancestor (or `class_fqn` itself) that defines `method`
    pub fn resolve_method(&self, class_fqn: &str, method: &str) -> Option<String> {
        let hierarchy = self.inheritance.hierarchy(self.mutator.backend(), self.task());
        resolve_method(&hierarchy, class_fqn, method)
    }

    // ==================== Calls ====================

    fn link_calls(&self, path: &Path) -> IndexResult<()> {
        let Some(parsed) = self.parsed.get(path).map(|p| p.clone()) else {
            return Ok(());
        };
        let module = self.module_of(path);
        let mut visited = VisitedFiles::new();

        for func in &parsed.functions {
            let caller = format!("{}.{}", module, func.name);
            self.link_body(&caller, func, None, &module, &mut visited)?;
        }
        for class in &parsed.classes {
            let class_fqn = format!("{}.{}", module, class.qualname);
            for method in &class.methods {
                let caller = format!("{}.{}", class_fqn, method.name);
                self.link_body(&caller, method, Some(&class_fqn), &module, &mut visited)?;
            }
        }
        Ok(())
    }

    fn link_body(
        &self,
        caller: &str,
        func: &FunctionDef,
        class_fqn: Option<&str>,
        module: &str,
        visited: &mut VisitedFiles,
    ) -> IndexResult<()> {
        for call in &func.calls {
            let target = match (call.callee.strip_prefix("self."), class_fqn) {
                (Some(member), Some(class)) if !member.contains('.') => {
                    self.resolve_member(class, member)
                }
                (Some(_), _) => None,
                (None, _) => self.resolve_reference(&call.callee, module, visited)?,
            };

            match target {
                Some(callee) if callee.kind.is_callable() || callee.kind == NodeKind::Class => {
                    self.mutator.upsert_edge(
                        EdgeKind::Calls,
                        caller,
                        &callee.full_name,
                        attrs! { "line" => call.line },
                    )?;
                }
                _ => self.diagnose(Diagnostic {
                    kind: ReferenceKind::Call,
                    context: caller.to_string(),
                    name: call.callee.clone(),
                }),
            }
        }

        let resolver = self.resolver();
        for name in &func.uses {
            if let Some(used) = resolver.lookup(name, module) {
                if used.kind == NodeKind::GlobalVariable {
                    self.mutator
                        .upsert_edge(EdgeKind::Uses, caller, &used.full_name, attrs!())?;
                }
            }
        }

        if let Some(class) = class_fqn {
            for attr in &func.self_uses {
                if let Some(field) = self.resolve_member(class, attr) {
                    if field.kind == NodeKind::Field {
                        self.mutator
                            .upsert_edge(EdgeKind::Uses, caller, &field.full_name, attrs!())?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Longest dotted prefix of `name` bound by a plain import in `module`
    fn plain_import_prefix(&self, module: &str, name: &str) -> Option<(String, usize)> {
        let aliases = self.module_aliases.get(module)?;
        let mut end = name.len();
        while let Some(idx) = name[..end].rfind('.') {
            if let Some(target) = aliases.get(&name[..idx]) {
                return Some((target.clone(), idx));
            }
            end = idx;
        }
        None
    }
}

impl ModuleIndexer for IndexSession {
    fn index_module_file(&self, path: &Path, visited: &mut VisitedFiles) -> IndexResult<()> {
        match self.index_file(path, visited) {
            Err(e) if e.is_parse_failure() => {
                self.record_failure(path, &e);
                Ok(())
            }
            other => other,
        }
    }
}

impl ReferenceResolver for IndexSession {
    /// Resolves bare names through module containment and dotted names
    /// through plain-import aliases, imported modules and classes.
    fn resolve_reference(
        &self,
        name: &str,
        module: &str,
        visited: &mut VisitedFiles,
    ) -> IndexResult<Option<Resolved>> {
        let Some((head, rest)) = name.split_once('.') else {
            return self.resolver().resolve(name, module, visited, self);
        };

        if let Some((target, idx)) = self.plain_import_prefix(module, name) {
            return self.resolve_reference(&name[idx + 1..], &target, visited);
        }

        match self.resolver().resolve(head, module, visited, self)? {
            Some(found) if found.kind == NodeKind::Module => {
                self.resolve_reference(rest, &found.full_name, visited)
            }
            Some(found) if found.kind == NodeKind::Class && !rest.contains('.') => {
                Ok(self.resolve_member(&found.full_name, rest))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphStore;
    use std::fs;

    fn write(root: &Path, rel: &str, source: &str) -> PathBuf {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(&path, source).expect("write fixture");
        path
    }

    fn session(root: &Path, store: &Arc<GraphStore>) -> IndexSession {
        IndexSession::new(root, store.clone(), "t", &LockRegistry::new())
    }

    fn has_edge(store: &GraphStore, start: &str, kind: EdgeKind, end: &str) -> bool {
        store
            .outgoing("t", start, kind)
            .iter()
            .any(|(_, n)| n.full_name == end)
    }

    #[test]
    fn test_define_writes_symbols_and_containment() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let file = write(
            dir.path(),
            "pkg/shapes.py",
            "SCALE = 2\n\nclass Shape:\n    sides = 0\n    def area(self):\n        return 0\n\ndef make():\n    return Shape()\n",
        );
        let store = Arc::new(GraphStore::in_memory());
        let report = session(dir.path(), &store).run(&[file]);

        assert_eq!(report.files_indexed, 1);
        let shape = store.get_node("t", "pkg.shapes.Shape").expect("class node");
        assert_eq!(shape.kind, NodeKind::Class);
        assert_eq!(shape.file_path(), Some("pkg/shapes.py"));
        assert_eq!(shape.lines(), Some((3, 6)));

        let area = store.get_node("t", "pkg.shapes.Shape.area").expect("method node");
        assert_eq!(area.kind, NodeKind::Method);
        assert_eq!(area.get_str("class"), Some("Shape"));

        assert!(has_edge(&store, "pkg.shapes", EdgeKind::Contains, "pkg.shapes.Shape"));
        assert!(has_edge(&store, "pkg.shapes", EdgeKind::Contains, "pkg.shapes.make"));
        assert!(has_edge(&store, "pkg.shapes", EdgeKind::Contains, "pkg.shapes.SCALE"));
        assert!(has_edge(&store, "pkg.shapes.Shape", EdgeKind::HasField, "pkg.shapes.Shape.sides"));
        assert!(has_edge(&store, "pkg.shapes.make", EdgeKind::Calls, "pkg.shapes.Shape"));
    }

    #[test]
    fn test_parse_failure_is_skipped() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let good = write(dir.path(), "good.py", "def ok():\n    pass\n");
        let bad = write(dir.path(), "bad.py", "def broken(:\n");
        let store = Arc::new(GraphStore::in_memory());

        let report = session(dir.path(), &store).run(&[bad, good]);

        assert_eq!(report.parse_failures.len(), 1);
        assert!(report.writer_failures.is_empty());
        assert!(store.get_node("t", "good.ok").is_some());
        assert!(store.get_node("t", "bad").is_none());
    }

    #[test]
    fn test_imports_link_through_package_initializer() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let files = vec![
            write(dir.path(), "lib/core.py", "class Engine:\n    def start(self):\n        pass\n"),
            write(dir.path(), "lib/__init__.py", "from .core import Engine as Motor\n"),
            write(
                dir.path(),
                "app.py",
                "from lib import Motor\n\nclass Car(Motor):\n    def drive(self):\n        self.start()\n",
            ),
        ];
        let store = Arc::new(GraphStore::in_memory());
        let report = session(dir.path(), &store).run(&files);

        assert!(report.parse_failures.is_empty());
        assert!(has_edge(&store, "lib", EdgeKind::Contains, "lib.core.Engine"));
        assert!(has_edge(&store, "app", EdgeKind::Contains, "lib.core.Engine"));
        assert!(has_edge(&store, "app.Car", EdgeKind::Inherits, "lib.core.Engine"));
        assert!(has_edge(&store, "app.Car", EdgeKind::HasMethod, "lib.core.Engine.start"));
        assert!(has_edge(&store, "app.Car.drive", EdgeKind::Calls, "lib.core.Engine.start"));
    }

    #[test]
    fn test_plain_import_alias_resolves_dotted_call() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let files = vec![
            write(dir.path(), "util/text.py", "def clean(s):\n    return s\n"),
            write(
                dir.path(),
                "main.py",
                "import util.text as t\n\ndef run():\n    return t.clean('x')\n",
            ),
        ];
        let store = Arc::new(GraphStore::in_memory());
        session(dir.path(), &store).run(&files);

        assert!(has_edge(&store, "main.run", EdgeKind::Calls, "util.text.clean"));
    }

    #[test]
    fn test_unresolved_base_is_diagnostic() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let file = write(dir.path(), "m.py", "class Child(Missing):\n    pass\n");
        let store = Arc::new(GraphStore::in_memory());
        let report = session(dir.path(), &store).run(&[file]);

        assert_eq!(report.unresolved(ReferenceKind::Base), 1);
        assert!(report.writer_failures.is_empty());
        assert!(store.outgoing("t", "m.Child", EdgeKind::Inherits).is_empty());
    }

    #[test]
    fn test_run_single_pulls_in_dependencies() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write(dir.path(), "base.py", "class Base:\n    def hello(self):\n        pass\n");
        let child = write(dir.path(), "child.py", "from base import Base\n\nclass Child(Base):\n    pass\n");
        let store = Arc::new(GraphStore::in_memory());

        let report = session(dir.path(), &store).run_single(&child);

        assert_eq!(report.files_indexed, 2);
        assert!(has_edge(&store, "child.Child", EdgeKind::HasMethod, "base.Base.hello"));
    }
}
