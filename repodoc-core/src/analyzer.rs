//! Pattern-based structural extraction for Java-like source text.
//!
//! This is deliberately not a parser. Declarations are found with regular expressions,
//! which means the analyzer is total (any input, including garbage, yields a unit) and
//! also that it over-matches: statements such as `return result;` look like field
//! declarations, and `else if (x) {` looks like a method. The diagram generator filters
//! the most common of these artifacts.
//!
//! # Member scoping
//! [`MemberScope::WholeFile`] attaches every method and field match in the file to every
//! class in that file (and every interface-method match to every interface).
//! [`MemberScope::BraceScoped`] instead looks only at the top level of each
//! declaration's brace-balanced body, so nested blocks and sibling types do not leak in.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::contract::Analyzer;
use crate::model::{ClassEntity, Field, InterfaceEntity, Method, Parameter, StructuralUnit};

static PACKAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"package\s+([\w.]+);").expect("package pattern"));

static IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"import\s+(static\s+)?([\w.*]+);").expect("import pattern"));

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:public\s+)?(?:abstract\s+)?(?:final\s+)?class\s+(\w+)(?:\s+extends\s+([\w.]+))?(?:\s+implements\s+([\w\s,]+))?\s*\{",
    )
    .expect("class pattern")
});

static INTERFACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:public\s+)?interface\s+(\w+)(?:\s+extends\s+([\w\s,]+))?\s*\{")
        .expect("interface pattern")
});

static CLASS_METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:public|private|protected)?\s*(?:static\s+)?(?:synchronized\s+)?(\w+(?:<[\w\s,]+>)?)\s+(\w+)\s*\((.*?)\)\s*(?:throws\s+[\w\s,]+)?\s*\{",
    )
    .expect("class method pattern")
});

static INTERFACE_METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\w+(?:<[\w\s,]+>)?)\s+(\w+)\s*\((.*?)\)\s*;").expect("interface method pattern")
});

static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:public|private|protected)?\s*(?:static\s+)?(?:final\s+)?(\w+(?:<[\w\s,]+>)?)\s+(\w+)\s*(?:=\s*.*?)?\s*;",
    )
    .expect("field pattern")
});

/// Which part of the file member patterns are matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberScope {
    #[default]
    WholeFile,
    BraceScoped,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PatternAnalyzer {
    scope: MemberScope,
}

impl PatternAnalyzer {
    pub fn new(scope: MemberScope) -> Self {
        Self { scope }
    }

    /// Text member patterns run against for a declaration whose opening brace is at
    /// byte offset `open_brace`.
    fn member_text<'a>(&self, source: &'a str, open_brace: usize) -> Cow<'a, str> {
        match self.scope {
            MemberScope::WholeFile => Cow::Borrowed(source),
            MemberScope::BraceScoped => Cow::Owned(top_level_body(source, open_brace)),
        }
    }
}

impl Analyzer for PatternAnalyzer {
    fn analyze(&self, source: &str) -> StructuralUnit {
        let package_name = PACKAGE_RE.captures(source).map(|c| c[1].to_string());

        let imports = IMPORT_RE
            .captures_iter(source)
            .map(|c| c[2].to_string())
            .collect();

        let classes = CLASS_RE
            .captures_iter(source)
            .map(|c| {
                let decl_end = c.get(0).map(|m| m.end()).unwrap_or(0);
                let body = self.member_text(source, decl_end.saturating_sub(1));
                ClassEntity {
                    name: c[1].to_string(),
                    extends_name: c.get(2).map(|m| m.as_str().to_string()),
                    implements_names: c.get(3).map(|m| split_names(m.as_str())).unwrap_or_default(),
                    fields: extract_fields(&body),
                    methods: extract_methods(&CLASS_METHOD_RE, &body),
                }
            })
            .collect();

        let interfaces = INTERFACE_RE
            .captures_iter(source)
            .map(|c| {
                let decl_end = c.get(0).map(|m| m.end()).unwrap_or(0);
                let body = self.member_text(source, decl_end.saturating_sub(1));
                InterfaceEntity {
                    name: c[1].to_string(),
                    extends_names: c.get(2).map(|m| split_names(m.as_str())).unwrap_or_default(),
                    methods: extract_methods(&INTERFACE_METHOD_RE, &body),
                }
            })
            .collect();

        StructuralUnit {
            package_name,
            imports,
            classes,
            interfaces,
        }
    }
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn extract_methods(pattern: &Regex, text: &str) -> Vec<Method> {
    pattern
        .captures_iter(text)
        .map(|c| Method {
            return_type: c[1].to_string(),
            name: c[2].to_string(),
            parameters: parse_parameters(&c[3]),
        })
        .collect()
}

fn extract_fields(text: &str) -> Vec<Field> {
    FIELD_RE
        .captures_iter(text)
        .map(|c| Field {
            type_name: c[1].to_string(),
            name: c[2].to_string(),
        })
        .collect()
}

/// Splits a parameter list on commas; in each entry the last whitespace-separated token
/// is the name and everything before it the type.
pub fn parse_parameters(list: &str) -> Vec<Parameter> {
    if list.trim().is_empty() {
        return Vec::new();
    }
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut tokens: Vec<&str> = p.split_whitespace().collect();
            let name = tokens.pop().unwrap_or_default().to_string();
            Parameter {
                type_name: tokens.join(" "),
                name,
            }
        })
        .collect()
}

/// Returns the body of the block opened at `open_brace` with every nested block emptied:
/// the braces of nested blocks are kept, their contents dropped. An unterminated block
/// runs to the end of the source.
fn top_level_body(source: &str, open_brace: usize) -> String {
    let Some(rest) = source.get(open_brace..) else {
        return String::new();
    };
    let mut body = String::new();
    let mut depth = 0usize;
    for ch in rest.chars() {
        match ch {
            '{' => {
                depth += 1;
                if depth == 2 {
                    body.push(ch);
                }
            }
            '}' => {
                if depth == 2 {
                    body.push(ch);
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            _ if depth == 1 => body.push(ch),
            _ => {}
        }
    }
    body
}
