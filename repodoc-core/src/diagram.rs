//! PlantUML class-diagram text from an aggregated [`StructuralUnit`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

use crate::model::{ClassEntity, InterfaceEntity, Method};

const HEADER: &str = "@startuml\n\
!define ABSTRACT abstract\n\
skinparam classBackgroundColor #FEFCE8\n\
skinparam classBorderColor #333333\n\n";

const FOOTER: &str = "@enduml\n";

const MAX_IDENTIFIER_CHARS: usize = 50;
const MAX_RENDERED_PARAMS: usize = 3;

static REDACTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[REDACTED:[^\]]*\]").expect("redaction pattern"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Fragments that mark a "field" match as a statement artifact rather than a declaration.
const FIELD_NAME_REJECTS: &[&str] = &["return", "WHERE", "AND", "to ", "for(", "package", "for "];
const METHOD_NAME_REJECTS: &[&str] = &["return", "WHERE", "for("];

/// Makes `raw` safe to place in a PlantUML member line. Idempotent.
pub fn sanitize_identifier(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| *c != '<' && *c != '>').collect();
    let unredacted = REDACTED_RE.replace_all(&stripped, "String");
    let joined = WHITESPACE_RE.replace_all(&unredacted, "_");
    let truncated: String = joined.chars().take(MAX_IDENTIFIER_CHARS).collect();
    if truncated.is_empty() {
        "unknown".to_string()
    } else {
        truncated
    }
}

pub fn generate_diagram(unit: &crate::model::StructuralUnit) -> String {
    let mut puml = String::from(HEADER);

    for class in &unit.classes {
        write_class(&mut puml, class);
    }
    for interface in &unit.interfaces {
        write_interface(&mut puml, interface);
    }

    for class in &unit.classes {
        if let Some(parent) = &class.extends_name {
            let _ = writeln!(puml, "{} --|> {}", class.name, parent);
        }
        for implemented in &class.implements_names {
            let _ = writeln!(puml, "{} ..|> {}", class.name, implemented);
        }
    }
    for interface in &unit.interfaces {
        for parent in &interface.extends_names {
            let _ = writeln!(puml, "{} --|> {}", interface.name, parent);
        }
    }

    puml.push_str(FOOTER);
    puml
}

/// Writes the diagram source, creating parent directories as needed.
pub fn save_diagram(text: &str, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)
}

fn write_class(puml: &mut String, class: &ClassEntity) {
    let _ = writeln!(puml, "class {} {{", class.name);

    if !class.fields.is_empty() {
        for field in &class.fields {
            let name = field.name.trim();
            if name.chars().count() < 2 || FIELD_NAME_REJECTS.iter().any(|r| name.contains(r)) {
                continue;
            }
            let type_name = non_empty_or(field.type_name.trim(), "Object");
            let _ = writeln!(
                puml,
                "  {} {}",
                sanitize_identifier(type_name),
                sanitize_identifier(name)
            );
        }
        puml.push('\n');
    }

    write_methods(puml, &class.methods, true);
    puml.push_str("}\n\n");
}

fn write_interface(puml: &mut String, interface: &InterfaceEntity) {
    let _ = writeln!(puml, "interface {} {{", interface.name);
    write_methods(puml, &interface.methods, false);
    puml.push_str("}\n\n");
}

fn write_methods(puml: &mut String, methods: &[Method], reject_constructor_calls: bool) {
    let mut emitted: HashSet<&str> = HashSet::new();
    for method in methods {
        let name = method.name.trim();
        if name.chars().count() < 2
            || METHOD_NAME_REJECTS.iter().any(|r| name.contains(r))
            || (reject_constructor_calls && name.contains("new "))
            || emitted.contains(name)
        {
            continue;
        }
        emitted.insert(name);

        let params: Vec<String> = method
            .parameters
            .iter()
            .take(MAX_RENDERED_PARAMS)
            .map(|p| {
                format!(
                    "{}: {}",
                    sanitize_identifier(non_empty_or(&p.name, "param")),
                    sanitize_identifier(non_empty_or(&p.type_name, "Object"))
                )
            })
            .collect();
        let return_type = non_empty_or(method.return_type.trim(), "void");
        let _ = writeln!(
            puml,
            "  {} {}({})",
            sanitize_identifier(return_type),
            sanitize_identifier(name),
            params.join(", ")
        );
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}
