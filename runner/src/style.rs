//! Static analysis of student Java sources.
//!
//! A fixed, line-oriented rule set good enough to grade exercise code:
//! excessive class/method length, non-final fields, naming conventions,
//! package dependency cycles, unused private members and empty control
//! statements. Each analyzed file yields a [`FileReport`] named by the
//! fully qualified class name.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use regex::Regex;

// PMD-style thresholds: reported from 82/17 lines, messages quote 80/15.
const CLASS_LENGTH_TRIGGER: usize = 82;
const METHOD_LENGTH_TRIGGER: usize = 17;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// Fully qualified name of the file's main type, e.g. `fr.lernejo.site.Pojo`.
    pub name: String,
    pub violations: Vec<Violation>,
}

/// Analyzes every `.java` file under the modules' `src/main/java` roots.
///
/// Files without violations are omitted. An empty result on a repository
/// without any Java source means no analysis could be performed.
pub fn analyze_repository(root: &Path) -> Option<Vec<FileReport>> {
    let mut sources = Vec::new();
    collect_java_sources(root, &mut sources);
    if sources.is_empty() {
        return None;
    }

    let parsed: Vec<SourceFile> = sources
        .iter()
        .filter_map(|path| {
            let content = fs::read_to_string(path).ok()?;
            Some(parse_source(path, &content))
        })
        .collect();

    let cycles = package_cycles(&parsed);
    let mut reports: Vec<FileReport> = parsed
        .into_iter()
        .filter_map(|file| {
            let mut violations = file.violations;
            for (line, column, other) in cycle_violations(&file.package, &file.imports, &cycles) {
                violations.push(Violation {
                    line,
                    column,
                    message: format!(
                        "The package `{}` must not depend back on `{other}`",
                        file.package
                    ),
                });
            }
            if violations.is_empty() {
                None
            } else {
                violations.sort_by_key(|v| (v.line, v.column));
                Some(FileReport {
                    name: file.qualified_name,
                    violations,
                })
            }
        })
        .collect();
    reports.sort_by(|a, b| a.name.cmp(&b.name));
    Some(reports)
}

fn collect_java_sources(root: &Path, out: &mut Vec<std::path::PathBuf>) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if path.file_name().is_some_and(|n| n == ".git" || n == "target") {
                continue;
            }
            collect_java_sources(&path, out);
        } else if path.extension().is_some_and(|e| e == "java")
            && path.to_string_lossy().contains("src/main/java")
        {
            out.push(path);
        }
    }
    out.sort();
}

struct SourceFile {
    qualified_name: String,
    package: String,
    /// (line, column, imported package)
    imports: Vec<(usize, usize, String)>,
    violations: Vec<Violation>,
}

fn parse_source(path: &Path, content: &str) -> SourceFile {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let package_re = Regex::new(r"^\s*package\s+([\w.]+)\s*;").unwrap();
    let import_re = Regex::new(r"^\s*import\s+(?:static\s+)?([\w.]+)\.\w+\s*;").unwrap();
    let type_re =
        Regex::new(r"^\s*(?:public\s+|final\s+|abstract\s+)*(?:class|interface|enum|record)\s+(\w+)")
            .unwrap();
    let method_re = Regex::new(
        r"^\s*(?:public\s+|private\s+|protected\s+|static\s+|final\s+|synchronized\s+)*[\w<>\[\], ?]+\s+(\w+)\s*\([^;]*\)\s*(?:throws\s+[\w, ]+)?\s*\{",
    )
    .unwrap();
    let field_re = Regex::new(
        r"^\s*(?P<mods>(?:public\s+|private\s+|protected\s+|static\s+|final\s+|transient\s+|volatile\s+)*)[\w<>\[\], ?.]+\s+(?P<name>\w+)\s*(?:=[^;]*)?;\s*$",
    )
    .unwrap();
    let empty_control_re = Regex::new(
        r"^\s*(?:\}\s*)?(?:(if|for|while)\s*\([^{;]*\)|(else))\s*(\{\s*\}|;)\s*$",
    )
    .unwrap();

    let mut package = String::new();
    let mut imports = Vec::new();
    let mut violations = Vec::new();
    let mut private_members: Vec<(usize, usize, String)> = Vec::new();

    let mut depth: i32 = 0;
    // (name, decl line, decl depth) of blocks still open
    let mut type_stack: Vec<(String, usize, i32)> = Vec::new();
    let mut method_stack: Vec<(usize, i32)> = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let column = line.len() - line.trim_start().len() + 1;
        let code = strip_comment(line);

        if let Some(c) = package_re.captures(code) {
            package = c[1].to_string();
        } else if let Some(c) = import_re.captures(code) {
            imports.push((line_no, column, c[1].to_string()));
        }

        if let Some(c) = type_re.captures(code) {
            let name = c[1].to_string();
            if !is_upper_camel_case(&name) {
                violations.push(Violation {
                    line: line_no,
                    column,
                    message: format!("The type name `{name}` doesn't match UpperCamelCase"),
                });
            }
            type_stack.push((name, line_no, depth));
        } else if depth >= 1 && method_re.is_match(code) && !is_control_keyword_line(code) {
            let name = method_re.captures(code).unwrap()[1].to_string();
            if !is_lower_camel_case(&name) && !type_stack.iter().any(|(t, _, _)| *t == name) {
                violations.push(Violation {
                    line: line_no,
                    column,
                    message: format!("The method name `{name}` doesn't match lowerCamelCase"),
                });
            }
            if code.contains("private") {
                private_members.push((line_no, column, name));
            }
            method_stack.push((line_no, depth));
        } else if depth >= 1 && method_stack.is_empty() {
            if let Some(c) = field_re.captures(code) {
                let name = c["name"].to_string();
                let mods = &c["mods"];
                if !mods.contains("final") && !mods.contains("static") {
                    violations.push(Violation {
                        line: line_no,
                        column,
                        message: format!("The field `{name}` must have modifier `final`"),
                    });
                }
                if mods.contains("private") {
                    private_members.push((line_no, column, name));
                }
            }
        }

        if let Some(c) = empty_control_re.captures(code) {
            let keyword = c.get(1).map_or("else", |m| m.as_str());
            violations.push(Violation {
                line: line_no,
                column,
                message: format!("Empty `{keyword}` statement"),
            });
        }

        for ch in code.chars() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if let Some((start, d)) = method_stack.last().copied() {
                        if depth == d {
                            method_stack.pop();
                            let length = line_no - start + 1;
                            if length >= METHOD_LENGTH_TRIGGER {
                                violations.push(Violation {
                                    line: start,
                                    column: 1,
                                    message: format!(
                                        "Method has {length} lines, exceeding the maximum of 15"
                                    ),
                                });
                            }
                        }
                    }
                    if let Some((_, start, d)) = type_stack.last().cloned() {
                        if depth == d {
                            type_stack.pop();
                            let length = line_no - start + 1;
                            if length >= CLASS_LENGTH_TRIGGER {
                                violations.push(Violation {
                                    line: start,
                                    column: 1,
                                    message: format!(
                                        "Class has {length} lines, exceeding the maximum of 80"
                                    ),
                                });
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    for (line, column, name) in private_members {
        let uses = Regex::new(&format!(r"\b{}\b", regex::escape(&name)))
            .map(|re| re.find_iter(content).count())
            .unwrap_or(2);
        if uses <= 1 {
            violations.push(Violation {
                line,
                column,
                message: format!("The private member `{name}` is unused"),
            });
        }
    }

    let qualified_name = if package.is_empty() {
        stem
    } else {
        format!("{package}.{stem}")
    };
    SourceFile {
        qualified_name,
        package,
        imports,
        violations,
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn is_control_keyword_line(code: &str) -> bool {
    let trimmed = code.trim_start();
    ["if", "for", "while", "switch", "catch", "synchronized", "return", "new", "else"]
        .iter()
        .any(|kw| {
            trimmed
                .strip_prefix(kw)
                .is_some_and(|rest| rest.starts_with([' ', '(']))
        })
}

fn is_upper_camel_case(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) && !name.contains('_')
}

fn is_lower_camel_case(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_lowercase()) && !name.contains('_')
}

/// Pairs of project packages that import each other.
fn package_cycles(files: &[SourceFile]) -> Vec<(String, String)> {
    let mut deps: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for file in files {
        for (_, _, import) in &file.imports {
            deps.entry(file.package.as_str())
                .or_default()
                .push(import.as_str());
        }
    }
    let mut cycles = Vec::new();
    for (from, tos) in &deps {
        for to in tos {
            let reversed = deps
                .get(*to)
                .is_some_and(|back| back.iter().any(|p| p == from));
            if reversed && from < to {
                cycles.push((from.to_string(), to.to_string()));
            }
        }
    }
    cycles
}

fn cycle_violations(
    package: &str,
    imports: &[(usize, usize, String)],
    cycles: &[(String, String)],
) -> Vec<(usize, usize, String)> {
    imports
        .iter()
        .filter(|(_, _, to)| {
            cycles
                .iter()
                .any(|(a, b)| (a == package && b == to) || (b == package && a == to))
        })
        .map(|(line, column, to)| (*line, *column, to.clone()))
        .collect()
}
