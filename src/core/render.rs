//! Markdown rendering for pages and diagrams

use std::path::Path;

use async_trait::async_trait;
use tera::{Context, Tera};
use tracing::{debug, info};

use crate::error::{DocwrightError, Result};
use super::call_graph::{DiagramGraph, NodeKind};
use super::scheduler::{PageGenerator, PageRequest};

pub const FILE_TEMPLATE: &str = "file.md";
pub const OVERVIEW_TEMPLATE: &str = "overview.md";

const BUILTIN_FILE: &str = r#"# {{ path }}

{{ language }} source, {{ line_count }} lines.
{% for entity in entities %}
## {{ entity.name }}

*{{ entity.kind }}*, lines {{ entity.start_line }}-{{ entity.end_line }}
{% if entity.calls | length > 0 %}
Calls:
{% for call in entity.calls %}
- `{{ call }}`
{%- endfor %}
{% endif %}{% if entity.used_by | length > 0 %}
Used by:
{% for caller in entity.used_by %}
- {% if caller.link %}[`{{ caller.name }}`]({{ caller.link }}){% else %}`{{ caller.name }}`{% endif %}
{%- endfor %}
{% endif %}{% endfor %}
[Back to overview]({{ overview_link }})
"#;

const BUILTIN_OVERVIEW: &str = r#"# {{ project }}

{{ file_count }} source files, {{ entity_count }} documented entities.

## Call graph
{% if diagram %}
```mermaid
{{ diagram }}
```
{% if omitted_nodes > 0 %}
{{ omitted_nodes }} less connected functions are not shown.
{% endif %}{% else %}
No calls between documented functions were found.
{% endif %}
## Files
{% for file in files %}
- {% if file.link %}[{{ file.path }}]({{ file.link }}){% else %}{{ file.path }}{% endif %} ({{ file.language }}, {{ file.entity_count }} entities)
{%- endfor %}
"#;

/// Renders pages from tera templates; the template is named by the
/// request's `template` context key
pub struct TemplateGenerator {
    tera: Tera,
}

impl TemplateGenerator {
    /// Built-in templates, each replaced by a same-named file in `template_dir`
    pub fn new(template_dir: Option<&Path>) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (FILE_TEMPLATE, BUILTIN_FILE),
            (OVERVIEW_TEMPLATE, BUILTIN_OVERVIEW),
        ])?;

        if let Some(dir) = template_dir {
            for name in [FILE_TEMPLATE, OVERVIEW_TEMPLATE] {
                let path = dir.join(name);
                if path.is_file() {
                    info!("Using custom template {}", path.display());
                    tera.add_template_file(&path, Some(name))?;
                } else {
                    debug!("No {} override in {}", name, dir.display());
                }
            }
        }

        Ok(Self { tera })
    }

    pub fn render(&self, request: &PageRequest) -> Result<String> {
        let template = request
            .context
            .get("template")
            .and_then(|value| value.as_str())
            .ok_or_else(|| DocwrightError::Generation {
                page: request.path.clone(),
                reason: "no template named in page context".to_string(),
            })?;

        let context = Context::from_value(request.context.clone())?;
        self.tera
            .render(template, &context)
            .map_err(|e| DocwrightError::Generation {
                page: request.path.clone(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl PageGenerator for TemplateGenerator {
    async fn generate_page(&self, request: &PageRequest) -> Result<String> {
        self.render(request)
    }
}

/// Mermaid flowchart for a projected diagram
pub fn mermaid(graph: &DiagramGraph) -> String {
    let mut out = String::from("flowchart LR\n");

    for node in &graph.nodes {
        let label = node.label.replace('"', "#quot;");
        match node.kind {
            NodeKind::Qualified => out.push_str(&format!("    {}[\"{}\"]:::qualified\n", node.id, label)),
            NodeKind::Function => out.push_str(&format!("    {}[\"{}\"]\n", node.id, label)),
        }
    }
    for edge in &graph.edges {
        out.push_str(&format!("    {} --> {}\n", edge.from, edge.to));
    }
    out.push_str("    classDef qualified fill:#eef3ff,stroke:#5b6fa8");

    out
}
