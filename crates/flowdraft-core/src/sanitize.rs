//! Cleanup of model output into flowchart code the renderer accepts.
//!
//! Only the header and surrounding noise are fixed here. Node and edge syntax
//! is left alone; a bad body is reported by the renderer.

use regex::Regex;
use std::sync::OnceLock;

pub const CANONICAL_KEYWORD: &str = "flowchart";
pub const LEGACY_KEYWORD: &str = "graph";
pub const CANONICAL_HEADER: &str = "flowchart TD";

const FENCE_MARKER: &str = "```";

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Opening fences may carry a language tag; either kind may end its line
    RE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_+.\-]*[ \t]*(?:\r?\n)?").expect("fence pattern"))
}

fn legacy_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*graph\b").expect("legacy keyword pattern"))
}

fn partial_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The keyword must end at a word boundary so node ids like `flowchartStep`
    // survive; `TD` glued to the body is the one exception
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^flowchart(?:[ \t]+(?:TD|TB|BT|LR|RL)\b|[ \t]+TD|\b)[ \t]*;?[ \t]*(?:\r?\n)?",
        )
        .expect("partial header pattern")
    })
}

fn glued_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^flowchart TD([^\n])").expect("glued header pattern"))
}

/// Normalize raw completion text into flowchart code starting with
/// `flowchart TD` and a newline.
pub fn sanitize(raw: &str) -> String {
    let mut code = strip_fences(raw);

    code = legacy_keyword_re()
        .replace(&code, CANONICAL_KEYWORD)
        .into_owned();

    code = code.trim().to_string();

    let header_line = format!("{}\n", CANONICAL_HEADER);
    if !code.starts_with(&header_line) {
        let body = partial_header_re().replace(&code, "");
        code = format!("{}{}", header_line, body);
    }

    glued_header_re()
        .replace(&code, format!("{}\n$1", CANONICAL_HEADER).as_str())
        .into_owned()
}

fn strip_fences(raw: &str) -> String {
    let mut text = raw.to_string();
    // Removing a marker can join backticks on either side into a new one
    while text.contains(FENCE_MARKER) {
        text = fence_re().replace_all(&text, "").into_owned();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_mermaid_block() {
        let raw = "```mermaid\ngraph TD\nA[Start]-->B[End]\n```";
        assert_eq!(sanitize(raw), "flowchart TD\nA[Start]-->B[End]");
    }

    #[test]
    fn test_header_glued_to_body() {
        let raw = "flowchart TDA[Start]-->B[End]";
        assert_eq!(sanitize(raw), "flowchart TD\nA[Start]-->B[End]");
    }

    #[test]
    fn test_node_id_starting_with_keyword_is_kept() {
        assert_eq!(sanitize("flowchartStep-->B"), "flowchart TD\nflowchartStep-->B");
        assert_eq!(sanitize("flowcharts-->B"), "flowchart TD\nflowcharts-->B");
    }

    #[test]
    fn test_partial_headers_are_replaced() {
        assert_eq!(sanitize("flowchart LR\nA-->B"), "flowchart TD\nA-->B");
        assert_eq!(sanitize("flowchart\nA-->B"), "flowchart TD\nA-->B");
        assert_eq!(sanitize("flowchart td;\nA-->B"), "flowchart TD\nA-->B");
        assert_eq!(sanitize("flowchart"), "flowchart TD\n");
    }

    #[test]
    fn test_canonical_input_is_unchanged() {
        let code = "flowchart TD\n    A[Login] --> B{Valid?}\n    B -->|yes| C[Home]";
        assert_eq!(sanitize(code), code);
    }

    #[test]
    fn test_idempotent_on_messy_inputs() {
        let inputs = [
            "```mermaid\ngraph TD\nA-->B\n```",
            "Here you go\n```\nflowchart LR\nA-->B\n```\nThanks",
            "flowchart TDA-->B",
            "GRAPH td\nA-->B",
            "A-->B",
            "",
            "   \n\t",
            "flowchart",
            "`` ```\n`",
            "flowchartStep-->B",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_strips_every_fence() {
        let raw = "```mermaid\nflowchart TD\nA-->B\n```\n\n```js\nconsole.log(1)\n```";
        let out = sanitize(raw);
        assert!(!out.contains("```"));
        assert!(out.contains("console.log(1)"));
    }

    #[test]
    fn test_fence_markers_joined_by_removal_are_stripped() {
        let out = sanitize("`` ```\n`");
        assert!(!out.contains("```"));
    }

    #[test]
    fn test_output_always_has_header_line() {
        let inputs = ["", "A-->B", "graph", "flowchart LR\nA-->B", "sequenceDiagram\nA->>B: hi"];
        for input in inputs {
            assert!(sanitize(input).starts_with("flowchart TD\n"), "input: {:?}", input);
        }
    }

    #[test]
    fn test_empty_input_yields_bare_header() {
        assert_eq!(sanitize(""), "flowchart TD\n");
    }

    #[test]
    fn test_legacy_keyword_any_case() {
        for raw in ["graph TD\nA-->B", "Graph TD\nA-->B", "GRAPH TD\nA-->B", "  graph TD\nA-->B"] {
            assert_eq!(sanitize(raw), "flowchart TD\nA-->B", "input: {:?}", raw);
        }
    }

    #[test]
    fn test_legacy_keyword_needs_word_boundary() {
        let out = sanitize("graphics-->B");
        assert_eq!(out, "flowchart TD\ngraphics-->B");
    }

    #[test]
    fn test_other_direction_is_replaced() {
        assert_eq!(sanitize("flowchart LR\nA-->B"), "flowchart TD\nA-->B");
        assert_eq!(sanitize("graph BT;\nA-->B"), "flowchart TD\nA-->B");
    }

    #[test]
    fn test_header_with_trailing_space_and_crlf() {
        assert_eq!(sanitize("flowchart TD \r\nA-->B"), "flowchart TD\nA-->B");
    }

    #[test]
    fn test_missing_header_is_prepended() {
        assert_eq!(sanitize("  A[Start] --> B[End]  "), "flowchart TD\nA[Start] --> B[End]");
    }
}
