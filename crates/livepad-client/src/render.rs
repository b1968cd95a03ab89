//! HTML rendering of a result tree.
//!
//! A thin, mechanical transform: Complex nodes become tables, sequences
//! become lists, images become data URIs. This is the output contract only;
//! presentation beyond it belongs to whatever editor embeds the client.

use livepad_core::dump::{DumpType, DumpValue, ExecuteResponse};

/// Render a full response as a self-contained HTML fragment.
pub fn to_html(response: &ExecuteResponse) -> String {
    let mut out = String::from("<div class=\"livepad-results\">\n");

    if let Some(error) = &response.error_message {
        out.push_str(&format!(
            "<p class=\"error\">{}</p>\n",
            escape(error)
        ));
    }

    for pair in response.results.as_deref().unwrap_or_default() {
        out.push_str(&format!("<h3>{}</h3>\n", escape(&pair.result_key)));
        match &pair.result_value {
            Some(node) => render_node(node, &mut out),
            None => out.push_str("<p class=\"empty\">null</p>\n"),
        }
    }

    out.push_str("</div>\n");
    out
}

fn render_node(node: &DumpValue, out: &mut String) {
    match node.dump_type {
        DumpType::Primitive => {
            out.push_str(&format!(
                "<span class=\"primitive\" title=\"{}\">{}</span>\n",
                escape(node.type_name.as_deref().unwrap_or("")),
                escape(&scalar_text(node.primitive_value.as_ref())),
            ));
        }
        DumpType::PrimitiveSequence => {
            out.push_str("<ul class=\"sequence\">\n");
            for value in node.primitive_enumerable.as_deref().unwrap_or_default() {
                out.push_str(&format!("<li>{}</li>\n", escape(&scalar_text(Some(value)))));
            }
            out.push_str("</ul>\n");
        }
        DumpType::Complex => {
            out.push_str(&format!(
                "<table class=\"object\"><caption>{}</caption>\n",
                escape(node.type_name.as_deref().unwrap_or(""))
            ));
            if let Some(fields) = &node.complex_value {
                for (name, child) in fields.iter() {
                    out.push_str(&format!("<tr><th>{}</th><td>", escape(name)));
                    render_node(child, out);
                    out.push_str("</td></tr>\n");
                }
            }
            out.push_str("</table>\n");
        }
        DumpType::ComplexSequence => {
            out.push_str("<ol class=\"items\">\n");
            for child in node.complex_enumerable.as_deref().unwrap_or_default() {
                out.push_str("<li>");
                render_node(child, out);
                out.push_str("</li>\n");
            }
            out.push_str("</ol>\n");
        }
        DumpType::BeyondDepthLimit => {
            out.push_str(&format!(
                "<span class=\"truncated\">{} \u{2026}</span>\n",
                escape(node.type_name.as_deref().unwrap_or(""))
            ));
        }
        DumpType::Image => {
            if let Some(serde_json::Value::String(base64_jpeg)) = &node.primitive_value {
                out.push_str(&format!(
                    "<img alt=\"dump\" src=\"data:image/jpeg;base64,{base64_jpeg}\"/>\n"
                ));
            }
        }
    }
}

fn scalar_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => "null".to_string(),
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
