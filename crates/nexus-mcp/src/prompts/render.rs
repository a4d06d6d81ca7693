//! Literal `{{key}}` substitution.

use serde_json::{Map, Value};

/// Render `template` by replacing every `{{key}}` with the string form of
/// `variables[key]`.
///
/// Substitution is literal and happens in one pass over the template:
/// inserted values are never scanned again, and a placeholder whose key
/// is not supplied stays in the output verbatim.
pub fn render(template: &str, variables: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            rest = &rest[open..];
            break;
        };

        match variables.get(&after[..close]) {
            Some(value) => {
                out.push_str(&stringify(value));
                rest = &after[close + 2..];
            }
            None => {
                // Not a supplied key; keep the brace and resume just after it.
                out.push('{');
                rest = &rest[open + 1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// String form of a variable: strings are inserted raw, anything else as
/// compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
