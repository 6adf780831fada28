//! Python syntax index using tree-sitter
//!
//! Walks one parsed file and produces typed records for classes, methods,
//! top-level functions, imports and module globals. No external state: the
//! output depends only on the path and the source text.

use crate::error::{IndexError, IndexResult};
use crate::models::{
    CallSite, ClassDef, FieldDef, FunctionDef, GlobalDef, ImportKind, ImportStmt, ImportedName,
    LineRange, ParsedFile,
};
use std::collections::BTreeSet;
use std::path::Path;
use tree_sitter::{Node, Parser};

/// The syntax node kinds the index distinguishes. Everything else is `Other`
/// and is not descended into at definition level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyntaxKind {
    ClassDef,
    FunctionDef,
    Decorated,
    ImportFrom,
    Import,
    ExpressionStatement,
    Assignment,
    Call,
    Attribute,
    Name,
    Block,
    Compound,
    Other,
}

impl SyntaxKind {
    fn of(node: &Node) -> Self {
        match node.kind() {
            "class_definition" => Self::ClassDef,
            "function_definition" | "async_function_definition" => Self::FunctionDef,
            "decorated_definition" => Self::Decorated,
            "import_from_statement" => Self::ImportFrom,
            "import_statement" => Self::Import,
            "expression_statement" => Self::ExpressionStatement,
            "assignment" => Self::Assignment,
            "call" => Self::Call,
            "attribute" => Self::Attribute,
            "identifier" => Self::Name,
            "block" => Self::Block,
            "if_statement" | "elif_clause" | "else_clause" | "try_statement" | "except_clause"
            | "finally_clause" | "with_statement" | "for_statement" | "while_statement" => {
                Self::Compound
            }
            _ => Self::Other,
        }
    }
}

/// Extract all definitions from Python source.
///
/// A file with syntax errors is rejected as a whole with
/// [`IndexError::Parse`]; callers skip it and continue.
pub fn extract(path: &Path, source: &str) -> IndexResult<ParsedFile> {
    let parse_error = |reason: String| IndexError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| parse_error(format!("failed to load Python grammar: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| parse_error("parser produced no tree".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        let line = first_error_line(root).unwrap_or(1);
        return Err(parse_error(format!("syntax error near line {}", line)));
    }

    let extractor = Extractor { source };
    let mut parsed = ParsedFile {
        path: path.to_path_buf(),
        ..Default::default()
    };
    extractor.module_scope(root, &mut parsed);
    Ok(parsed)
}

fn first_error_line(root: Node) -> Option<u32> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node.start_position().row as u32 + 1);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    None
}

/// `decorated_definition` wraps the real class/function
fn unwrap_decorated(node: Node) -> Node {
    if SyntaxKind::of(&node) == SyntaxKind::Decorated {
        if let Some(def) = node.child_by_field_name("definition") {
            return def;
        }
    }
    node
}

fn start_line(node: &Node) -> u32 {
    node.start_position().row as u32 + 1
}

fn line_range(node: &Node) -> LineRange {
    LineRange::new(start_line(node), node.end_position().row as u32 + 1)
}

fn push_field(fields: &mut Vec<FieldDef>, name: &str, line: u32) {
    if !fields.iter().any(|f| f.name == name) {
        fields.push(FieldDef {
            name: name.to_string(),
            line,
        });
    }
}

/// Strip the common leading whitespace from every line
pub fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|l| if l.len() >= indent { &l[indent..] } else { l.trim_start() })
        .collect::<Vec<_>>()
        .join("\n")
}

struct Extractor<'s> {
    source: &'s str,
}

impl<'s> Extractor<'s> {
    fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Full source lines covered by `node`, dedented
    fn code(&self, node: Node) -> String {
        let start = node.start_byte();
        let line_start = self.source[..start].rfind('\n').map_or(0, |i| i + 1);
        dedent(&self.source[line_start..node.end_byte()])
    }

    /// Definition header, up to (not including) the colon before the body
    fn header(&self, node: Node) -> String {
        let end = node
            .child_by_field_name("body")
            .map_or(node.end_byte(), |b| b.start_byte());
        let text = self.source[node.start_byte()..end].trim_end();
        let text = match text.rfind(':') {
            Some(idx) => &text[..idx],
            None => text,
        };
        text.trim_end().to_string()
    }

    fn module_scope(&self, node: Node, out: &mut ParsedFile) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            let child = unwrap_decorated(child);
            match SyntaxKind::of(&child) {
                SyntaxKind::ClassDef => self.class_def(child, None, &mut out.classes),
                SyntaxKind::FunctionDef => out.functions.push(self.function_def(child, None)),
                SyntaxKind::ImportFrom => out.imports.extend(self.import_from(child)),
                SyntaxKind::Import => out.imports.extend(self.import_plain(child)),
                SyntaxKind::ExpressionStatement => self.globals(child, &mut out.globals),
                SyntaxKind::Block | SyntaxKind::Compound => self.module_scope(child, out),
                _ => {}
            }
        }
    }

    fn class_def(&self, node: Node, outer: Option<&str>, classes: &mut Vec<ClassDef>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let qualname = match outer {
            Some(outer) => format!("{}.{}", outer, name),
            None => name.clone(),
        };
        let bases = node
            .child_by_field_name("superclasses")
            .map(|args| self.bases(args))
            .unwrap_or_default();

        let mut class = ClassDef {
            name,
            qualname,
            range: line_range(&node),
            bases,
            methods: Vec::new(),
            fields: Vec::new(),
            signature: self.header(node),
            code: self.code(node),
        };

        let mut nested = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            self.class_body(body, &mut class, &mut nested);
        }
        classes.push(class);
        classes.extend(nested);
    }

    fn class_body(&self, body: Node, class: &mut ClassDef, nested: &mut Vec<ClassDef>) {
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            let child = unwrap_decorated(child);
            match SyntaxKind::of(&child) {
                SyntaxKind::FunctionDef => {
                    let method = self.function_def(child, Some(&mut class.fields));
                    class.methods.push(method);
                }
                SyntaxKind::ClassDef => self.class_def(child, Some(&class.qualname), nested),
                SyntaxKind::ExpressionStatement => {
                    for (name, line) in self.assigned_names(child) {
                        push_field(&mut class.fields, &name, line);
                    }
                }
                SyntaxKind::Block | SyntaxKind::Compound => self.class_body(child, class, nested),
                _ => {}
            }
        }
    }

    /// Base expressions from a class's argument list, keyword args skipped
    fn bases(&self, args: Node) -> Vec<String> {
        let mut cursor = args.walk();
        args.named_children(&mut cursor)
            .filter_map(|arg| self.base_name(arg))
            .collect()
    }

    fn base_name(&self, node: Node) -> Option<String> {
        match node.kind() {
            "identifier" | "attribute" => Some(self.text(node).to_string()),
            // Generic[T]
            "subscript" => node
                .child_by_field_name("value")
                .and_then(|n| self.base_name(n)),
            _ => None,
        }
    }

    fn function_def(&self, node: Node, mut self_fields: Option<&mut Vec<FieldDef>>) -> FunctionDef {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();

        let mut calls = Vec::new();
        let mut uses = BTreeSet::new();
        let mut self_uses = BTreeSet::new();

        if let Some(body) = node.child_by_field_name("body") {
            let mut stack = vec![body];
            while let Some(n) = stack.pop() {
                match SyntaxKind::of(&n) {
                    SyntaxKind::Call => {
                        if let Some(callee) = n
                            .child_by_field_name("function")
                            .and_then(|f| self.call_target(f))
                        {
                            calls.push(CallSite {
                                callee,
                                line: start_line(&n),
                            });
                        }
                    }
                    SyntaxKind::Attribute => {
                        if let Some(attr) = self.self_attribute(n) {
                            self_uses.insert(attr.to_string());
                        } else if let Some(object) = n.child_by_field_name("object") {
                            stack.push(object);
                        }
                        continue;
                    }
                    SyntaxKind::Name => {
                        uses.insert(self.text(n).to_string());
                    }
                    SyntaxKind::Assignment => {
                        if let (Some(fields), Some(left)) =
                            (self_fields.as_deref_mut(), n.child_by_field_name("left"))
                        {
                            if let Some(attr) = self.self_attribute(left) {
                                push_field(fields, attr, start_line(&n));
                            }
                        }
                    }
                    _ => {}
                }
                let mut cursor = n.walk();
                let children: Vec<_> = n.named_children(&mut cursor).collect();
                stack.extend(children.into_iter().rev());
            }
        }
        calls.sort_by_key(|c: &CallSite| c.line);

        FunctionDef {
            name,
            range: line_range(&node),
            signature: self.header(node),
            code: self.code(node),
            is_async: self.text(node).starts_with("async"),
            calls,
            uses: uses.into_iter().collect(),
            self_uses: self_uses.into_iter().collect(),
        }
    }

    /// `x` for an attribute node of the form `self.x`
    fn self_attribute(&self, node: Node) -> Option<&'s str> {
        if SyntaxKind::of(&node) != SyntaxKind::Attribute {
            return None;
        }
        let object = node.child_by_field_name("object")?;
        if object.kind() == "identifier" && self.text(object) == "self" {
            node.child_by_field_name("attribute").map(|a| self.text(a))
        } else {
            None
        }
    }

    /// Callee of a call expression, kept only when it is a plain dotted name
    fn call_target(&self, node: Node) -> Option<String> {
        match node.kind() {
            "identifier" => Some(self.text(node).to_string()),
            "attribute" => {
                let text = self.text(node);
                let dotted = text
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '.');
                dotted.then(|| text.to_string())
            }
            // func[T]()
            "subscript" => node
                .child_by_field_name("value")
                .and_then(|n| self.call_target(n)),
            _ => None,
        }
    }

    /// Identifier targets of the assignments in an expression statement
    fn assigned_names(&self, stmt: Node) -> Vec<(String, u32)> {
        let mut names = Vec::new();
        let mut cursor = stmt.walk();
        for child in stmt.named_children(&mut cursor) {
            if SyntaxKind::of(&child) != SyntaxKind::Assignment {
                continue;
            }
            let Some(left) = child.child_by_field_name("left") else {
                continue;
            };
            match left.kind() {
                "identifier" => names.push((self.text(left).to_string(), start_line(&child))),
                "pattern_list" | "tuple_pattern" => {
                    let mut inner = left.walk();
                    for target in left.named_children(&mut inner) {
                        if target.kind() == "identifier" {
                            names.push((self.text(target).to_string(), start_line(&child)));
                        }
                    }
                }
                _ => {}
            }
        }
        names
    }

    fn globals(&self, stmt: Node, globals: &mut Vec<GlobalDef>) {
        for (name, _) in self.assigned_names(stmt) {
            if globals.iter().any(|g| g.name == name) {
                continue;
            }
            globals.push(GlobalDef {
                name,
                range: line_range(&stmt),
                code: self.code(stmt),
            });
        }
    }

    fn imported_name(&self, node: Node) -> Option<ImportedName> {
        match node.kind() {
            "dotted_name" | "identifier" => Some(ImportedName {
                name: self.text(node).to_string(),
                alias: None,
            }),
            "aliased_import" => Some(ImportedName {
                name: self.text(node.child_by_field_name("name")?).to_string(),
                alias: node
                    .child_by_field_name("alias")
                    .map(|a| self.text(a).to_string()),
            }),
            _ => None,
        }
    }

    /// `from a.b import c as d`, `from .. import x`, `from m import *`
    fn import_from(&self, node: Node) -> Option<ImportStmt> {
        let module_node = node.child_by_field_name("module_name")?;
        let (module, level) = if module_node.kind() == "relative_import" {
            let text = self.text(module_node);
            let level = text.chars().take_while(|c| *c == '.').count();
            (text[level..].trim().to_string(), level)
        } else {
            (self.text(module_node).to_string(), 0)
        };

        let mut cursor = node.walk();
        let mut names: Vec<ImportedName> = node
            .children_by_field_name("name", &mut cursor)
            .filter_map(|n| self.imported_name(n))
            .collect();

        let mut cursor = node.walk();
        if names.is_empty()
            && node
                .named_children(&mut cursor)
                .any(|c| c.kind() == "wildcard_import")
        {
            names.push(ImportedName {
                name: "*".to_string(),
                alias: None,
            });
        }

        Some(ImportStmt {
            kind: ImportKind::From,
            module,
            level,
            names,
            line: start_line(&node),
        })
    }

    /// `import a.b, c as d` yields one statement per imported module
    fn import_plain(&self, node: Node) -> Vec<ImportStmt> {
        let mut cursor = node.walk();
        node.children_by_field_name("name", &mut cursor)
            .filter_map(|n| self.imported_name(n))
            .map(|imported| ImportStmt {
                kind: ImportKind::Plain,
                module: imported.name.clone(),
                level: 0,
                names: vec![imported],
                line: start_line(&node),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(source: &str) -> ParsedFile {
        extract(&PathBuf::from("test.py"), source).expect("should parse source")
    }

    #[test]
    fn test_extract_class_with_bases_and_methods() {
        let source = r#"
class MyClass(BaseClass, mixins.Mixin, metaclass=Meta):
    def __init__(self):
        pass

    @property
    def method(self, x):
        return x * 2
"#;
        let parsed = parse(source);

        assert_eq!(parsed.classes.len(), 1);
        let class = &parsed.classes[0];
        assert_eq!(class.name, "MyClass");
        assert_eq!(class.bases, vec!["BaseClass", "mixins.Mixin"]);
        let names: Vec<_> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["__init__", "method"]);
        assert_eq!(class.range, LineRange::new(2, 8));
        assert_eq!(class.method("method").map(|m| m.range), Some(LineRange::new(7, 8)));
        assert_eq!(class.signature, "class MyClass(BaseClass, mixins.Mixin, metaclass=Meta)");
    }

    #[test]
    fn test_top_level_functions_exclude_methods() {
        let source = r#"
def helper(a, b=1):
    return a + b

class Thing:
    def run(self):
        return helper(1)

async def fetch(url):
    return url
"#;
        let parsed = parse(source);

        let names: Vec<_> = parsed.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["helper", "fetch"]);
        assert!(parsed.function("fetch").map_or(false, |f| f.is_async));
        assert_eq!(
            parsed.function("helper").map(|f| f.signature.as_str()),
            Some("def helper(a, b=1)")
        );
    }

    #[test]
    fn test_method_code_is_dedented() {
        let source = "class A:\n    def m(self):\n        return 1\n";
        let parsed = parse(source);
        let method = &parsed.classes[0].methods[0];
        assert_eq!(method.code, "def m(self):\n    return 1");
    }

    #[test]
    fn test_nested_class_gets_qualified_name() {
        let source = r#"
class Outer:
    class Inner:
        def deep(self):
            pass
"#;
        let parsed = parse(source);

        assert_eq!(parsed.classes.len(), 2);
        assert_eq!(parsed.classes[0].qualname, "Outer");
        assert_eq!(parsed.classes[1].qualname, "Outer.Inner");
        assert!(parsed.classes[1].defines("deep"));
        assert!(!parsed.classes[0].defines("deep"));
    }

    #[test]
    fn test_extract_imports() {
        let source = r#"
import os
import numpy as np
from pathlib import Path
from typing import List, Optional as Opt
from . import sibling
from ..core.base import Base
from helpers import *
"#;
        let parsed = parse(source);

        assert_eq!(parsed.imports.len(), 7);

        let np = &parsed.imports[1];
        assert_eq!(np.kind, ImportKind::Plain);
        assert_eq!(np.module, "numpy");
        assert_eq!(np.names[0].bound_name(), "np");

        let typing = &parsed.imports[3];
        assert_eq!(typing.module, "typing");
        let bound: Vec<_> = typing.names.iter().map(|n| n.bound_name()).collect();
        assert_eq!(bound, vec!["List", "Opt"]);

        let sibling = &parsed.imports[4];
        assert_eq!((sibling.module.as_str(), sibling.level), ("", 1));
        assert_eq!(sibling.names[0].name, "sibling");

        let base = &parsed.imports[5];
        assert_eq!((base.module.as_str(), base.level), ("core.base", 2));

        assert_eq!(parsed.imports[6].names[0].name, "*");
    }

    #[test]
    fn test_extract_calls_and_uses() {
        let source = r#"
LIMIT = 10

class Worker:
    retries = 3

    def __init__(self):
        self.queue = []

    def run(self, item):
        self.prepare(item)
        process(item, LIMIT)
        utils.log.info("done")
        make()()
"#;
        let parsed = parse(source);
        let class = &parsed.classes[0];
        let run = class.method("run").expect("run method");

        let callees: Vec<_> = run.calls.iter().map(|c| c.callee.as_str()).collect();
        assert_eq!(callees, vec!["self.prepare", "process", "utils.log.info", "make"]);
        assert!(run.uses.contains(&"LIMIT".to_string()));
        assert_eq!(run.self_uses, vec!["prepare"]);

        let fields: Vec<_> = class.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["retries", "queue"]);

        assert_eq!(parsed.globals.len(), 1);
        assert_eq!(parsed.globals[0].name, "LIMIT");
    }

    #[test]
    fn test_definitions_inside_compound_statements() {
        let source = r#"
try:
    from fast import Impl
except ImportError:
    class Impl:
        pass
"#;
        let parsed = parse(source);
        assert_eq!(parsed.imports.len(), 1);
        assert_eq!(parsed.classes.len(), 1);
    }

    #[test]
    fn test_syntax_error_is_parse_failure() {
        let err = extract(&PathBuf::from("broken.py"), "def broken(:\n    pass\n")
            .expect_err("broken source should fail");
        assert!(err.is_parse_failure());
    }

    #[test]
    fn test_dedent() {
        assert_eq!(dedent("    a\n      b\n\n    c"), "a\n  b\n\nc");
    }
}
