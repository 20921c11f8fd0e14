//! Response assembly.
//!
//! Two shapes leave the processor: a JSON patch (partial requests) and
//! a full HTML document (page requests). The patch is the DOM record
//! in order; the document is the page's DOM with every descendant's
//! output spliced into its `jmb-placeholder` marker and every
//! component root annotated with `jmb:name`, `jmb:state`, `jmb:url`.

use crate::processor::Processor;
use jembe_types::{ExecName, JembeError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// One component in a JSON patch response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchEntry {
    /// Exec name of the instance.
    pub exec_name: String,
    /// Non-injected state, for the client to echo back.
    pub state: Value,
    /// Rendered output.
    pub dom: String,
    /// Browser URL of the instance.
    pub url: String,
    /// Whether the instance contributes to the page URL.
    pub changes_url: bool,
}

/// Builds the JSON patch for a partial request, in DOM-record order.
///
/// # Errors
///
/// Returns [`JembeError::Internal`] when a recorded instance has no
/// DOM or a URL param value is missing.
pub fn partial_response(processor: &Processor<'_>) -> Result<Vec<PatchEntry>, JembeError> {
    let mut entries = Vec::new();
    for exec in processor.rendered() {
        let slot = processor
            .slot(exec)
            .ok_or_else(|| JembeError::Internal(format!("{exec} recorded but not live")))?;
        let dom = slot
            .dom
            .clone()
            .ok_or_else(|| JembeError::Internal(format!("{exec} recorded without a DOM")))?;
        entries.push(PatchEntry {
            exec_name: exec.to_string(),
            state: slot.instance.state.to_json(),
            dom,
            url: processor.url_for_exec(exec)?,
            changes_url: slot.instance.config().changes_url(),
        });
    }
    Ok(entries)
}

/// Builds the full HTML document for a page request.
///
/// # Errors
///
/// Returns [`JembeError::Internal`] when no page component was
/// rendered or assembly data is missing.
pub fn page_response(processor: &Processor<'_>) -> Result<String, JembeError> {
    let root = processor
        .rendered()
        .iter()
        .find(|exec| exec.is_page())
        .ok_or_else(|| JembeError::Internal("no page component rendered".to_string()))?;

    let mut parts: BTreeMap<String, String> = BTreeMap::new();
    for exec in processor.rendered() {
        let slot = processor
            .slot(exec)
            .ok_or_else(|| JembeError::Internal(format!("{exec} recorded but not live")))?;
        let dom = slot
            .dom
            .clone()
            .ok_or_else(|| JembeError::Internal(format!("{exec} recorded without a DOM")))?;
        let annotated = annotate_root(
            &dom,
            exec,
            &slot.instance.state.to_json(),
            &processor.url_for_exec(exec)?,
        );
        parts.insert(exec.to_string(), annotated);
    }

    let mut document = parts
        .get(root.as_str())
        .cloned()
        .ok_or_else(|| JembeError::Internal("page DOM missing".to_string()))?;
    // Splice until no known placeholder remains; unknown placeholders
    // stay in place for the client to fill later.
    loop {
        let (next, replaced) = splice_placeholders(&document, &parts);
        document = next;
        if !replaced {
            break;
        }
    }
    Ok(document)
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"<(?:[^>"]|"[^"]*")*jmb-placeholder="([^"]+)"(?:[^>"]|"[^"]*")*>\s*</[a-zA-Z][\w-]*>"#,
        )
        .unwrap_or_else(|err| panic!("placeholder regex: {err}"))
    })
}

fn splice_placeholders(document: &str, parts: &BTreeMap<String, String>) -> (String, bool) {
    let mut replaced = false;
    let next = placeholder_regex()
        .replace_all(document, |caps: &regex::Captures<'_>| {
            let exec = &caps[1];
            match parts.get(exec) {
                Some(dom) => {
                    replaced = true;
                    dom.clone()
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned();
    (next, replaced)
}

fn escape_attr(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Annotates the single root element of `dom` with the `jmb:*` trio,
/// wrapping in a neutral `<div>` when the fragment has no single root.
fn annotate_root(dom: &str, exec: &ExecName, state: &Value, url: &str) -> String {
    let attrs = format!(
        " jmb:name=\"{}\" jmb:state=\"{}\" jmb:url=\"{}\"",
        escape_attr(&exec.full_name().to_string()),
        escape_attr(&state.to_string()),
        escape_attr(url),
    );
    match single_root_tag_end(dom) {
        Some(insert_at) => {
            let mut out = String::with_capacity(dom.len() + attrs.len());
            out.push_str(&dom[..insert_at]);
            out.push_str(&attrs);
            out.push_str(&dom[insert_at..]);
            out
        }
        None => format!("<div{attrs}>{dom}</div>"),
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// If `dom` is a single element (ignoring surrounding whitespace,
/// comments, and a doctype), returns the byte offset just before the
/// `>` of its opening tag.
fn single_root_tag_end(dom: &str) -> Option<usize> {
    let bytes = dom.as_bytes();
    let mut pos = 0;
    let mut depth = 0usize;
    let mut insert_at = None;

    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if bytes[pos] != b'<' {
            // Top-level text is only tolerable inside the root.
            if depth == 0 {
                return None;
            }
            pos += 1;
            continue;
        }
        if dom[pos..].starts_with("<!--") {
            pos = dom[pos..].find("-->").map(|i| pos + i + 3)?;
            continue;
        }
        if dom[pos..].starts_with("<!") {
            pos = dom[pos..].find('>').map(|i| pos + i + 1)?;
            continue;
        }
        let end = dom[pos..].find('>').map(|i| pos + i)?;
        let inner = &dom[pos + 1..end];
        let closing = inner.starts_with('/');
        let self_closing = inner.ends_with('/');
        let name = inner
            .trim_start_matches('/')
            .split(|c: char| c.is_ascii_whitespace() || c == '/')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        let void = VOID_ELEMENTS.contains(&name.as_str());

        if closing {
            depth = depth.checked_sub(1)?;
        } else if !self_closing && !void {
            if depth == 0 {
                if insert_at.is_some() {
                    return None;
                }
                insert_at = Some(end);
            }
            depth += 1;
        } else if depth == 0 {
            // A lone void or self-closing element can still be the root.
            if insert_at.is_some() {
                return None;
            }
            insert_at = Some(if self_closing { end - 1 } else { end });
        }
        pos = end + 1;

        if depth == 0 && insert_at.is_some() {
            return if dom[pos..].trim().is_empty() {
                insert_at
            } else {
                None
            };
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn exec(s: &str) -> ExecName {
        ExecName::parse(s).unwrap()
    }

    #[test]
    fn annotates_single_root() {
        let out = annotate_root(
            "<div class=\"c\">hi</div>",
            &exec("/cpage/counter.a"),
            &json!({"value": 1}),
            "/cpage",
        );
        assert_eq!(
            out,
            "<div class=\"c\" jmb:name=\"/cpage/counter\" \
             jmb:state=\"{&quot;value&quot;:1}\" jmb:url=\"/cpage\">hi</div>"
        );
    }

    #[test]
    fn wraps_multi_root_fragments() {
        let out = annotate_root(
            "<p>a</p><p>b</p>",
            &exec("/cpage"),
            &json!({}),
            "/cpage",
        );
        assert!(out.starts_with("<div jmb:name=\"/cpage\""));
        assert!(out.ends_with("<p>a</p><p>b</p></div>"));
    }

    #[test]
    fn wraps_bare_text() {
        let out = annotate_root("hello", &exec("/cpage"), &json!({}), "/");
        assert!(out.starts_with("<div "));
        assert!(out.contains(">hello</div>"));
    }

    #[test]
    fn single_root_tolerates_nested_and_void_elements() {
        assert!(single_root_tag_end("<div><br><span>x</span></div>").is_some());
        assert!(single_root_tag_end("<div>a</div><div>b</div>").is_none());
        assert!(single_root_tag_end("<!-- c --><section>x</section>").is_some());
        assert!(single_root_tag_end("<html><body>x</body></html>").is_some());
    }

    #[test]
    fn splices_known_placeholders_and_keeps_unknown() {
        let mut parts = BTreeMap::new();
        parts.insert(
            "/cpage/counter".to_string(),
            "<div>counter</div>".to_string(),
        );
        let doc = "<html><div jmb-placeholder=\"/cpage/counter\"></div>\
                   <div jmb-placeholder=\"/cpage/modal\"></div></html>";
        let (out, replaced) = splice_placeholders(doc, &parts);
        assert!(replaced);
        assert!(out.contains("<div>counter</div>"));
        assert!(out.contains("jmb-placeholder=\"/cpage/modal\""));
    }
}
