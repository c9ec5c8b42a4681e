use std::fmt::Write as _;
use std::path::Path;

use crate::model::{EnrichmentMap, Method, StructuralUnit};

const METHODS_SHOWN: usize = 10;

#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    pub title: String,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            title: "Java API Documentation".to_string(),
        }
    }
}

/// Renders the aggregated model as Markdown.
///
/// The diagram, when given, is embedded by bare file name so the Markdown and the image
/// can be moved together.
pub fn to_markdown(
    unit: &StructuralUnit,
    enrichments: &EnrichmentMap,
    diagram_image_path: Option<&Path>,
    options: &MarkdownOptions,
) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# {}\n", options.title);
    let _ = writeln!(
        md,
        "**{} Classes** | **{} Interfaces**\n",
        unit.classes.len(),
        unit.interfaces.len()
    );

    if let Some(image) = diagram_image_path.and_then(|p| p.file_name()) {
        md.push_str("## Class Diagram\n\n");
        let _ = writeln!(
            md,
            "![Class Diagram - relationships between classes and interfaces]({})\n",
            image.to_string_lossy()
        );
        md.push_str("_Diagram generated automatically from the source analysis_\n\n");
    }

    if !unit.classes.is_empty() {
        md.push_str("## Classes\n\n");
        for class in &unit.classes {
            let mut inheritance = Vec::new();
            if let Some(parent) = &class.extends_name {
                inheritance.push(format!("extends `{parent}`"));
            }
            if !class.implements_names.is_empty() {
                inheritance.push(format!("implements {}", code_list(&class.implements_names)));
            }
            write_entity(&mut md, &class.name, &inheritance, &class.methods, enrichments);
        }
    }

    if !unit.interfaces.is_empty() {
        md.push_str("## Interfaces\n\n");
        for interface in &unit.interfaces {
            let mut inheritance = Vec::new();
            if !interface.extends_names.is_empty() {
                inheritance.push(format!("extends {}", code_list(&interface.extends_names)));
            }
            write_entity(
                &mut md,
                &interface.name,
                &inheritance,
                &interface.methods,
                enrichments,
            );
        }
    }

    md
}

fn code_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("`{n}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_entity(
    md: &mut String,
    name: &str,
    inheritance: &[String],
    methods: &[Method],
    enrichments: &EnrichmentMap,
) {
    let _ = writeln!(md, "### {name}");
    if let Some(summary) = enrichments.get(name) {
        let _ = writeln!(md, "{}", summary.text().trim());
    }
    if !inheritance.is_empty() {
        let _ = writeln!(md, "\n_{}_", inheritance.join(" | "));
    }

    if !methods.is_empty() {
        md.push_str("\n**Methods:**\n");
        for method in methods.iter().take(METHODS_SHOWN) {
            let params = if method.parameters.is_empty() {
                "void".to_string()
            } else {
                method
                    .parameters
                    .iter()
                    .map(|p| p.type_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let _ = write!(md, "- **{}**({}): {}", method.name, params, method.return_type);
            let key = format!("{name}.{}", method.name);
            if let Some(description) = enrichments.get(&key) {
                let _ = write!(md, " - {}", description.first_line());
            }
            md.push('\n');
        }
        if methods.len() > METHODS_SHOWN {
            let _ = writeln!(md, "- _(+{} more methods)_", methods.len() - METHODS_SHOWN);
        }
    }
    md.push('\n');
}
