//! Flowchart text to nodes and edges.

use std::collections::HashMap;

use super::SecurityLevel;
use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TopDown,
    BottomUp,
    LeftRight,
    RightLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Rect,
    Round,
    Stadium,
    Subroutine,
    Cylinder,
    Circle,
    Diamond,
    Hexagon,
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStyle {
    Solid,
    Dotted,
    Thick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEdge {
    pub from: usize,
    pub to: usize,
    pub label: Option<String>,
    pub style: EdgeStyle,
    pub arrow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Flowchart {
    pub direction: Direction,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

/// Statements that style or group nodes without adding any
const IGNORED_KEYWORDS: &[&str] = &[
    "classDef", "class", "style", "linkStyle", "click", "subgraph", "end", "direction",
    "accTitle", "accDescr",
];

/// Openers ordered so that longer ones win
const SHAPES: &[(&str, &str, NodeShape)] = &[
    ("(((", ")))", NodeShape::Circle),
    ("((", "))", NodeShape::Circle),
    ("([", "])", NodeShape::Stadium),
    ("[(", ")]", NodeShape::Cylinder),
    ("[[", "]]", NodeShape::Subroutine),
    ("{{", "}}", NodeShape::Hexagon),
    ("[", "]", NodeShape::Rect),
    ("(", ")", NodeShape::Round),
    ("{", "}", NodeShape::Diamond),
    (">", "]", NodeShape::Flag),
];

struct Cursor {
    src: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(s: &str) -> Self {
        Cursor { src: s.chars().collect(), pos: 0 }
    }

    fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn ch(&self) -> char {
        self.src.get(self.pos).copied().unwrap_or('\0')
    }

    fn peek_at(&self, offset: usize) -> char {
        self.src.get(self.pos + offset).copied().unwrap_or('\0')
    }

    fn peek_str(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == c)
    }

    fn consume_str(&mut self, s: &str) -> bool {
        if self.peek_str(s) {
            self.pos += s.chars().count();
            true
        } else {
            false
        }
    }

    fn consume_run(&mut self, c: char) -> usize {
        let start = self.pos;
        while !self.eof() && self.ch() == c {
            self.pos += 1;
        }
        self.pos - start
    }

    fn skip_ws(&mut self) {
        while !self.eof() && matches!(self.ch(), ' ' | '\t') {
            self.pos += 1;
        }
    }

    fn rest(&self) -> String {
        self.src[self.pos.min(self.src.len())..].iter().collect()
    }

    /// Node ids allow inner hyphens (`step-1`) but never swallow a connector
    fn node_id(&mut self) -> Option<String> {
        let start = self.pos;
        while !self.eof() {
            let c = self.ch();
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else if c == '-' && self.pos > start && (self.peek_at(1).is_alphanumeric() || self.peek_at(1) == '_') {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            None
        } else {
            Some(self.src[start..self.pos].iter().collect())
        }
    }
}

struct Connector {
    style: EdgeStyle,
    arrow: bool,
    label: Option<String>,
}

#[derive(Default)]
struct Builder {
    nodes: Vec<FlowNode>,
    index: HashMap<String, usize>,
    edges: Vec<FlowEdge>,
}

impl Builder {
    /// Later definitions replace the label and shape of earlier ones
    fn upsert(&mut self, id: String, shape: Option<(NodeShape, String)>) -> usize {
        if let Some(&idx) = self.index.get(&id) {
            if let Some((shape, label)) = shape {
                self.nodes[idx].shape = shape;
                self.nodes[idx].label = label;
            }
            return idx;
        }
        let (shape, label) = shape.unwrap_or_else(|| (NodeShape::Rect, id.clone()));
        let idx = self.nodes.len();
        self.index.insert(id.clone(), idx);
        self.nodes.push(FlowNode { id, label, shape });
        idx
    }
}

pub fn parse_flowchart(text: &str, security: SecurityLevel) -> Result<Flowchart, RenderError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with("%%"));

    let (header_line, header) = lines.next().ok_or(RenderError::Empty)?;
    let direction = parse_header(header_line, header)?;

    let mut builder = Builder::default();
    for (line_no, line) in lines {
        for statement in split_statements(line) {
            let statement = statement.trim();
            if statement.is_empty() || is_ignored(statement) {
                continue;
            }
            parse_statement(&mut builder, line_no, statement, security)?;
        }
    }

    if builder.nodes.is_empty() {
        return Err(RenderError::Empty);
    }

    Ok(Flowchart {
        direction,
        nodes: builder.nodes,
        edges: builder.edges,
    })
}

fn parse_header(line_no: usize, header: &str) -> Result<Direction, RenderError> {
    let mut parts = header.trim_end_matches(';').split_whitespace();
    let keyword = parts.next().unwrap_or_default();
    if !keyword.eq_ignore_ascii_case("flowchart") && !keyword.eq_ignore_ascii_case("graph") {
        return Err(RenderError::UnsupportedDiagram(keyword.to_string()));
    }

    let direction = match parts.next().map(|d| d.to_ascii_uppercase()) {
        None => Direction::TopDown,
        Some(d) => match d.as_str() {
            "TD" | "TB" => Direction::TopDown,
            "BT" => Direction::BottomUp,
            "LR" => Direction::LeftRight,
            "RL" => Direction::RightLeft,
            _ => return Err(RenderError::syntax(line_no, format!("unknown direction `{}`", d))),
        },
    };

    if let Some(extra) = parts.next() {
        return Err(RenderError::syntax(line_no, format!("unexpected `{}` after header", extra)));
    }
    Ok(direction)
}

fn is_ignored(statement: &str) -> bool {
    let first = statement.split_whitespace().next().unwrap_or_default();
    IGNORED_KEYWORDS.contains(&first) || first.starts_with("%%")
}

/// Split on `;` outside of brackets and quotes
fn split_statements(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '[' | '(' | '{' if !in_quotes => depth += 1,
            ']' | ')' | '}' if !in_quotes => depth -= 1,
            ';' if !in_quotes && depth <= 0 => {
                out.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&line[start..]);
    out
}

fn parse_statement(
    builder: &mut Builder,
    line_no: usize,
    statement: &str,
    security: SecurityLevel,
) -> Result<(), RenderError> {
    let mut c = Cursor::new(statement);

    let mut sources = parse_group(builder, &mut c, line_no, security)?;
    loop {
        c.skip_ws();
        if c.eof() {
            break;
        }
        let connector = match parse_connector(&mut c, line_no)? {
            Some(connector) => connector,
            None => {
                return Err(RenderError::syntax(line_no, format!("unexpected `{}`", c.rest())));
            }
        };
        c.skip_ws();
        if c.eof() {
            return Err(RenderError::syntax(line_no, "edge has no target node"));
        }
        let targets = parse_group(builder, &mut c, line_no, security)?;
        let label = connector.label.map(|l| clean_label(&l, security));
        for &from in &sources {
            for &to in &targets {
                builder.edges.push(FlowEdge {
                    from,
                    to,
                    label: label.clone(),
                    style: connector.style,
                    arrow: connector.arrow,
                });
            }
        }
        sources = targets;
    }
    Ok(())
}

/// One node or several joined with `&`
fn parse_group(
    builder: &mut Builder,
    c: &mut Cursor,
    line_no: usize,
    security: SecurityLevel,
) -> Result<Vec<usize>, RenderError> {
    let mut group = Vec::new();
    loop {
        c.skip_ws();
        let id = c
            .node_id()
            .ok_or_else(|| RenderError::syntax(line_no, format!("expected node id at `{}`", c.rest())))?;
        let shape = parse_shape(c, line_no)?.map(|(shape, label)| (shape, clean_label(&label, security)));
        if c.consume_str(":::") {
            // Class shorthand, styling only
            c.node_id();
        }
        group.push(builder.upsert(id, shape));

        c.skip_ws();
        if !c.consume_str("&") {
            return Ok(group);
        }
    }
}

fn parse_shape(c: &mut Cursor, line_no: usize) -> Result<Option<(NodeShape, String)>, RenderError> {
    let Some(&(open, close, shape)) = SHAPES.iter().find(|(open, _, _)| c.peek_str(open)) else {
        return Ok(None);
    };
    c.consume_str(open);
    c.skip_ws();

    let label = if c.ch() == '"' {
        c.pos += 1;
        let start = c.pos;
        while !c.eof() && c.ch() != '"' {
            c.pos += 1;
        }
        if c.eof() {
            return Err(RenderError::syntax(line_no, "unterminated quoted label"));
        }
        let quoted: String = c.src[start..c.pos].iter().collect();
        c.pos += 1;
        c.skip_ws();
        quoted
    } else {
        let start = c.pos;
        while !c.eof() && !c.peek_str(close) {
            c.pos += 1;
        }
        let raw: String = c.src[start..c.pos].iter().collect();
        raw.trim().trim_matches(|ch| ch == '/' || ch == '\\').trim().to_string()
    };

    if !c.consume_str(close) {
        return Err(RenderError::syntax(line_no, format!("missing `{}` to close node shape", close)));
    }
    Ok(Some((shape, label)))
}

fn parse_connector(c: &mut Cursor, line_no: usize) -> Result<Option<Connector>, RenderError> {
    let saved = c.pos;

    let mut connector = if c.peek_str("-.") {
        c.pos += 1;
        c.consume_run('.');
        let dashes = c.consume_run('-');
        let arrow = c.consume_str(">");
        if dashes == 0 {
            c.pos = saved;
            return Ok(None);
        }
        Connector { style: EdgeStyle::Dotted, arrow, label: None }
    } else if matches!(c.ch(), '-' | '=') {
        let line_char = c.ch();
        let style = if line_char == '=' { EdgeStyle::Thick } else { EdgeStyle::Solid };
        let run = c.consume_run(line_char);
        let arrow = c.consume_str(">");
        if run < 2 {
            c.pos = saved;
            return Ok(None);
        }
        if !arrow && run == 2 {
            // `-- text -->` form
            let (label, arrow) = parse_inline_label(c, line_char, line_no)?;
            Connector { style, arrow, label: Some(label) }
        } else {
            Connector { style, arrow, label: None }
        }
    } else {
        return Ok(None);
    };

    c.skip_ws();
    if c.consume_str("|") {
        let start = c.pos;
        while !c.eof() && c.ch() != '|' {
            c.pos += 1;
        }
        if c.eof() {
            return Err(RenderError::syntax(line_no, "unterminated edge label"));
        }
        let text: String = c.src[start..c.pos].iter().collect();
        c.pos += 1;
        connector.label = Some(text.trim().trim_matches('"').to_string());
    }

    Ok(Some(connector))
}

fn parse_inline_label(c: &mut Cursor, line_char: char, line_no: usize) -> Result<(String, bool), RenderError> {
    let closing: String = [line_char, line_char].iter().collect();
    let start = c.pos;
    while !c.eof() && !c.peek_str(&closing) {
        c.pos += 1;
    }
    if c.eof() {
        return Err(RenderError::syntax(line_no, "edge text is missing its closing arrow"));
    }
    let label: String = c.src[start..c.pos].iter().collect();
    let run = c.consume_run(line_char);
    let arrow = c.consume_str(">");
    if !arrow && run < 3 {
        return Err(RenderError::syntax(line_no, "edge text is missing its closing arrow"));
    }
    Ok((label.trim().to_string(), arrow))
}

/// Strict mode drops markup from labels; line breaks become spaces
fn clean_label(label: &str, security: SecurityLevel) -> String {
    match security {
        SecurityLevel::Loose => label.to_string(),
        SecurityLevel::Strict => {
            let mut out = String::with_capacity(label.len());
            let mut in_tag = false;
            for c in label.chars() {
                match c {
                    '<' => {
                        in_tag = true;
                        out.push(' ');
                    }
                    '>' if in_tag => in_tag = false,
                    _ if !in_tag => out.push(c),
                    _ => {}
                }
            }
            out.split_whitespace().collect::<Vec<_>>().join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Flowchart {
        parse_flowchart(text, SecurityLevel::Strict).unwrap()
    }

    fn labels(chart: &Flowchart) -> Vec<&str> {
        chart.nodes.iter().map(|n| n.label.as_str()).collect()
    }

    #[test]
    fn test_simple_edge() {
        let chart = parse("flowchart TD\nA[Start]-->B[End]");
        assert_eq!(labels(&chart), vec!["Start", "End"]);
        assert_eq!(chart.edges.len(), 1);
        assert_eq!((chart.edges[0].from, chart.edges[0].to), (0, 1));
        assert!(chart.edges[0].arrow);
    }

    #[test]
    fn test_shapes() {
        let chart = parse(
            "flowchart TD\nA(Round) --> B{Choice}\nB --> C((Circle))\nC --> D([Pill])\nD --> E[(Db)]\nE --> F[[Sub]]\nF --> G{{Hex}}\nG --> H>Flag]",
        );
        let shapes: Vec<NodeShape> = chart.nodes.iter().map(|n| n.shape).collect();
        assert_eq!(
            shapes,
            vec![
                NodeShape::Round,
                NodeShape::Diamond,
                NodeShape::Circle,
                NodeShape::Stadium,
                NodeShape::Cylinder,
                NodeShape::Subroutine,
                NodeShape::Hexagon,
                NodeShape::Flag,
            ]
        );
        assert_eq!(chart.nodes[4].label, "Db");
    }

    #[test]
    fn test_edge_labels_both_forms() {
        let chart = parse("flowchart TD\nA -->|yes| B\nA -- no --> C\nA -.->|\"maybe\"| D");
        let edge_labels: Vec<Option<&str>> = chart.edges.iter().map(|e| e.label.as_deref()).collect();
        assert_eq!(edge_labels, vec![Some("yes"), Some("no"), Some("maybe")]);
        assert_eq!(chart.edges[2].style, EdgeStyle::Dotted);
    }

    #[test]
    fn test_connector_kinds() {
        let chart = parse("flowchart TD\nA --- B\nB ==> C\nC -.- D\nD ---> E");
        let kinds: Vec<(EdgeStyle, bool)> = chart.edges.iter().map(|e| (e.style, e.arrow)).collect();
        assert_eq!(
            kinds,
            vec![
                (EdgeStyle::Solid, false),
                (EdgeStyle::Thick, true),
                (EdgeStyle::Dotted, false),
                (EdgeStyle::Solid, true),
            ]
        );
    }

    #[test]
    fn test_chains_and_groups() {
        let chart = parse("flowchart TD\nA --> B --> C\nD & E --> F");
        assert_eq!(chart.edges.len(), 4);
        assert_eq!(chart.nodes.len(), 6);
    }

    #[test]
    fn test_hyphenated_ids_do_not_eat_connectors() {
        let chart = parse("flowchart TD\nstep-1---step-2");
        assert_eq!(labels(&chart), vec!["step-1", "step-2"]);
    }

    #[test]
    fn test_semicolons_and_ignored_statements() {
        let chart = parse(
            "graph TD;\n%% comment\nA[\"a; b\"]-->B;B-->C\nclassDef hot fill:#f00\nclass A hot\nsubgraph S\nC --> D:::hot\nend\nstyle D stroke:#333",
        );
        assert_eq!(chart.nodes.len(), 4);
        assert_eq!(chart.nodes[0].label, "a; b");
        assert_eq!(chart.edges.len(), 3);
    }

    #[test]
    fn test_redefinition_updates_label() {
        let chart = parse("flowchart TD\nA --> B\nB[Second]");
        assert_eq!(chart.nodes[1].label, "Second");
    }

    #[test]
    fn test_directions() {
        assert_eq!(parse("flowchart BT\nA-->B").direction, Direction::BottomUp);
        assert_eq!(parse("graph lr\nA-->B").direction, Direction::LeftRight);
    }

    #[test]
    fn test_strict_strips_markup() {
        let chart = parse("flowchart TD\nA[\"Line one<br/>line <b>two</b>\"]");
        assert_eq!(chart.nodes[0].label, "Line one line two");

        let loose = parse_flowchart("flowchart TD\nA[x<br>y]", SecurityLevel::Loose).unwrap();
        assert_eq!(loose.nodes[0].label, "x<br>y");
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_flowchart("", SecurityLevel::Strict), Err(RenderError::Empty));
        assert_eq!(parse_flowchart("flowchart TD\n", SecurityLevel::Strict), Err(RenderError::Empty));
        assert_eq!(
            parse_flowchart("sequenceDiagram\nA->>B: hi", SecurityLevel::Strict),
            Err(RenderError::UnsupportedDiagram("sequenceDiagram".to_string()))
        );
        assert!(matches!(
            parse_flowchart("flowchart TD\nA[Start --> B", SecurityLevel::Strict),
            Err(RenderError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            parse_flowchart("flowchart TD\nA -->", SecurityLevel::Strict),
            Err(RenderError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            parse_flowchart("flowchart TD\nA ~~ B", SecurityLevel::Strict),
            Err(RenderError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            parse_flowchart("flowchart XY\nA-->B", SecurityLevel::Strict),
            Err(RenderError::Syntax { line: 1, .. })
        ));
    }
}
