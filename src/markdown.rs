//! Markdown rendering of lifelog content trees.
//!
//! Used when the API omits the `markdown` body. Output format:
//! ```markdown
//! # Morning standup
//!
//! ## Sprint review
//!
//! > **Alex**: We shipped the importer.
//!
//! > Sounds good.
//! ```

use crate::model::ContentNode;

/// Render a sequence of content nodes (and their children, depth-first).
pub fn render_contents(nodes: &[ContentNode]) -> String {
    let mut out = String::with_capacity(1024);
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &ContentNode) {
    let text = node.content.trim();
    if !text.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }

        match node.node_type.as_str() {
            "heading1" => out.push_str(&format!("# {}\n", text)),
            "heading2" => out.push_str(&format!("## {}\n", text)),
            "heading3" => out.push_str(&format!("### {}\n", text)),
            "blockquote" => write_quote(out, node, text),
            _ => {
                out.push_str(text);
                out.push('\n');
            }
        }
    }

    for child in &node.children {
        write_node(out, child);
    }
}

fn write_quote(out: &mut String, node: &ContentNode, text: &str) {
    let speaker = node
        .speaker_name
        .as_deref()
        .filter(|name| !name.trim().is_empty());

    // Multi-line quotes need the marker on every line
    let quoted = text.lines().collect::<Vec<_>>().join("\n> ");
    match speaker {
        Some(name) => out.push_str(&format!("> **{}**: {}\n", name.trim(), quoted)),
        None => out.push_str(&format!("> {}\n", quoted)),
    }
}
