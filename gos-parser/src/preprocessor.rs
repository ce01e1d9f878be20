// gos-parser - Front end for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Textual preprocessor: `$import`, `$define` and conditional inclusion.
//!
//! Runs before the lexer and produces a single macro-free,
//! import-flattened source string. A directive is a line whose first
//! non-whitespace character is `$`; every other line gets whole-word
//! macro substitution.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory searched for system imports after the including file's own
/// directory.
pub const SYSTEM_IMPORT_DIR: &str = "/usr/local/gos";

/// Source file extension tried when an import path has none.
const SOURCE_EXTENSION: &str = "gos";

/// Preprocessor error.
#[derive(Debug, Clone)]
pub enum PreprocessorError {
    /// An imported file could not be found in any search location.
    ImportNotFound { file: String, line: usize },
    /// Reading an imported file failed.
    Io { path: String, message: String },
    /// A directive line could not be parsed.
    MalformedDirective { message: String, line: usize },
    /// `$ifdef`/`$ifndef`/`$endif` do not nest properly.
    UnbalancedConditional { message: String, line: usize },
}

impl fmt::Display for PreprocessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessorError::ImportNotFound { file, line } => {
                write!(
                    f,
                    "Preprocessor error at line {}: cannot import '{}'",
                    line, file
                )
            }
            PreprocessorError::Io { path, message } => {
                write!(f, "Preprocessor error: reading '{}': {}", path, message)
            }
            PreprocessorError::MalformedDirective { message, line } => {
                write!(f, "Preprocessor error at line {}: {}", line, message)
            }
            PreprocessorError::UnbalancedConditional { message, line } => {
                write!(f, "Preprocessor error at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for PreprocessorError {}

/// Result type for preprocessing.
pub type Result<T> = std::result::Result<T, PreprocessorError>;

/// The preprocessor expands one translation unit.
///
/// Macro definitions accumulate across imports; each file is spliced in
/// at most once per unit, guarded by its canonical path.
pub struct Preprocessor {
    defines: HashMap<String, String>,
    included: HashSet<PathBuf>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Preprocessor {
            defines: HashMap::new(),
            included: HashSet::new(),
        }
    }

    /// Expand a whole file, resolving imports against its directory.
    pub fn expand_file(&mut self, path: &Path) -> Result<String> {
        if let Ok(canonical) = path.canonicalize() {
            self.included.insert(canonical);
        }
        let source = fs::read_to_string(path).map_err(|e| PreprocessorError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        self.expand(&source, &dir)
    }

    /// Expand a source string, resolving imports against `dir`.
    pub fn expand(&mut self, source: &str, dir: &Path) -> Result<String> {
        let mut output = String::new();
        // Conditional-inclusion state is per file: each file must close
        // every conditional it opens.
        let mut conditions: Vec<bool> = Vec::new();

        for (idx, line) in source.lines().enumerate() {
            let lineno = idx + 1;
            let trimmed = line.trim_start();

            if let Some(rest) = trimmed.strip_prefix('$') {
                self.directive(rest, lineno, dir, &mut conditions, &mut output)?;
                continue;
            }

            if conditions.iter().all(|&active| active) {
                output.push_str(&self.substitute(line));
                output.push('\n');
            }
        }

        if !conditions.is_empty() {
            return Err(PreprocessorError::UnbalancedConditional {
                message: "missing $endif".to_string(),
                line: source.lines().count(),
            });
        }

        Ok(output)
    }

    // ========================================================================
    // Directives
    // ========================================================================

    fn directive(
        &mut self,
        rest: &str,
        lineno: usize,
        dir: &Path,
        conditions: &mut Vec<bool>,
        output: &mut String,
    ) -> Result<()> {
        let (name, args) = split_directive(rest);
        let active = conditions.iter().all(|&a| a);

        match name {
            "define" => {
                if active {
                    self.define(args, lineno)?;
                }
            }
            "import" => {
                if active {
                    let expanded = self.import(args, lineno, dir)?;
                    output.push_str(&expanded);
                }
            }
            "ifdef" => {
                let defined = self.defines.contains_key(condition_name(args, lineno)?);
                conditions.push(active && defined);
            }
            "ifndef" => {
                let defined = self.defines.contains_key(condition_name(args, lineno)?);
                conditions.push(active && !defined);
            }
            "endif" => {
                if conditions.pop().is_none() {
                    return Err(PreprocessorError::UnbalancedConditional {
                        message: "unexpected $endif".to_string(),
                        line: lineno,
                    });
                }
            }
            other => {
                return Err(PreprocessorError::MalformedDirective {
                    message: format!("unknown directive '${}'", other),
                    line: lineno,
                });
            }
        }
        Ok(())
    }

    fn define(&mut self, args: &str, lineno: usize) -> Result<()> {
        let args = args.trim();
        let name: String = args
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if name.is_empty() {
            return Err(PreprocessorError::MalformedDirective {
                message: "$define requires a macro name".to_string(),
                line: lineno,
            });
        }
        let replacement = args[name.len()..].trim().to_string();
        // Earlier macros are expanded inside the replacement now, so a
        // later redefinition of those does not retroactively change it.
        let replacement = self.substitute(&replacement);
        self.defines.insert(name, replacement);
        Ok(())
    }

    fn import(&mut self, args: &str, lineno: usize, dir: &Path) -> Result<String> {
        let args = args.trim();
        let file = args
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .ok_or_else(|| PreprocessorError::MalformedDirective {
                message: "$import requires a quoted path".to_string(),
                line: lineno,
            })?;
        if file.is_empty() {
            return Err(PreprocessorError::MalformedDirective {
                message: "$import requires a non-empty path".to_string(),
                line: lineno,
            });
        }

        let with_ext = format!("{}.{}", file, SOURCE_EXTENSION);
        let candidates = [
            dir.join(file),
            dir.join(&with_ext),
            Path::new(SYSTEM_IMPORT_DIR).join(file),
            Path::new(SYSTEM_IMPORT_DIR).join(&with_ext),
        ];

        let path = candidates
            .iter()
            .find(|p| p.is_file())
            .ok_or_else(|| PreprocessorError::ImportNotFound {
                file: file.to_string(),
                line: lineno,
            })?;

        // Each file is spliced at most once per translation unit.
        let canonical = path.canonicalize().map_err(|e| PreprocessorError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if !self.included.insert(canonical) {
            return Ok(String::new());
        }

        let source = fs::read_to_string(path).map_err(|e| PreprocessorError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let child_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        self.expand(&source, &child_dir)
    }

    // ========================================================================
    // Macro substitution
    // ========================================================================

    /// Replace whole-word occurrences of defined macro names.
    fn substitute(&self, line: &str) -> String {
        if self.defines.is_empty() {
            return line.to_string();
        }

        let mut result = String::with_capacity(line.len());
        let mut chars = line.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_alphabetic() || c == '_' {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match self.defines.get(&word) {
                    Some(replacement) => result.push_str(replacement),
                    None => result.push_str(&word),
                }
            } else {
                result.push(c);
                chars.next();
            }
        }
        result
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

fn split_directive(rest: &str) -> (&str, &str) {
    let name_len = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .count();
    (&rest[..name_len], &rest[name_len..])
}

fn condition_name(args: &str, lineno: usize) -> Result<&str> {
    let name = args.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(PreprocessorError::MalformedDirective {
            message: "conditional directive requires a macro name".to_string(),
            line: lineno,
        });
    }
    Ok(name)
}

// ============================================================================
// Tests
// ============================================================================
