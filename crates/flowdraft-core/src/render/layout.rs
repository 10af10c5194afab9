//! Layered placement and character painting.
//!
//! Ranks come from the longest path over the graph with back edges reversed.
//! Painting happens per call so a zoom change only repaints.

use super::parse::{EdgeStyle, FlowEdge, FlowNode, Flowchart, NodeShape};

/// Rank and slot of every node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub rank: Vec<usize>,
    pub layers: Vec<Vec<usize>>,
    /// Edges that point against the rank order
    pub back_edges: Vec<bool>,
}

pub fn place(chart: &Flowchart) -> Placement {
    let n = chart.nodes.len();
    let back_edges = find_back_edges(n, &chart.edges);

    // Longest path over forward edges, in topological order
    let mut indegree = vec![0usize; n];
    let mut forward: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (edge, &back) in chart.edges.iter().zip(&back_edges) {
        if edge.from == edge.to {
            continue;
        }
        let (from, to) = if back { (edge.to, edge.from) } else { (edge.from, edge.to) };
        forward[from].push(to);
        indegree[to] += 1;
    }

    let mut rank = vec![0usize; n];
    let mut queue: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut head = 0;
    while head < queue.len() {
        let node = queue[head];
        head += 1;
        for &next in &forward[node] {
            rank[next] = rank[next].max(rank[node] + 1);
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push(next);
            }
        }
    }

    let depth = rank.iter().copied().max().map_or(0, |r| r + 1);
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); depth];
    for node in 0..n {
        layers[rank[node]].push(node);
    }
    order_by_parents(&mut layers, &rank, &chart.edges, &back_edges);

    Placement { rank, layers, back_edges }
}

/// Depth-first search in declaration order; an edge into a node still on the
/// stack closes a cycle
fn find_back_edges(n: usize, edges: &[FlowEdge]) -> Vec<bool> {
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, edge) in edges.iter().enumerate() {
        outgoing[edge.from].push(i);
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut marks = vec![Mark::New; n];
    let mut back = vec![false; edges.len()];
    for root in 0..n {
        if marks[root] != Mark::New {
            continue;
        }
        marks[root] = Mark::Active;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(top) = stack.last_mut() {
            let node = top.0;
            if let Some(&edge_idx) = outgoing[node].get(top.1) {
                top.1 += 1;
                let target = edges[edge_idx].to;
                match marks[target] {
                    Mark::Active => back[edge_idx] = target != node,
                    Mark::New => {
                        marks[target] = Mark::Active;
                        stack.push((target, 0));
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                stack.pop();
            }
        }
    }
    back
}

/// One downward barycenter pass; nodes without parents keep their slot
fn order_by_parents(layers: &mut [Vec<usize>], rank: &[usize], edges: &[FlowEdge], back: &[bool]) {
    let mut slot = vec![0f32; rank.len()];
    for layer in layers.iter() {
        for (i, &node) in layer.iter().enumerate() {
            slot[node] = i as f32;
        }
    }

    for r in 1..layers.len() {
        let mut keyed: Vec<(f32, usize)> = layers[r]
            .iter()
            .map(|&node| {
                let parents: Vec<f32> = edges
                    .iter()
                    .zip(back)
                    .filter(|&(e, &b)| !b && e.to == node && e.from != node && rank[e.from] + 1 == r)
                    .map(|(e, _)| slot[e.from])
                    .collect();
                let key = if parents.is_empty() {
                    slot[node]
                } else {
                    parents.iter().sum::<f32>() / parents.len() as f32
                };
                (key, node)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        layers[r] = keyed.into_iter().map(|(_, node)| node).collect();
        for (i, &node) in layers[r].iter().enumerate() {
            slot[node] = i as f32;
        }
    }
}

/// Spacing after the zoom factor has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spacing {
    pub padding: usize,
    pub node_gap: usize,
    pub rank_gap: usize,
}

const BOX_HEIGHT: usize = 3;

struct Canvas {
    cells: Vec<Vec<char>>,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Canvas { cells: vec![vec![' '; width]; height] }
    }

    fn get(&self, x: usize, y: usize) -> char {
        self.cells.get(y).and_then(|row| row.get(x)).copied().unwrap_or(' ')
    }

    fn set(&mut self, x: usize, y: usize, c: char) {
        if let Some(cell) = self.cells.get_mut(y).and_then(|row| row.get_mut(x)) {
            *cell = c;
        }
    }

    /// Crossing lines become a junction
    fn set_line(&mut self, x: usize, y: usize, c: char) {
        let existing = self.get(x, y);
        let vertical = |ch: char| matches!(ch, '|' | ':' | '#');
        let horizontal = |ch: char| matches!(ch, '-' | '.' | '=');
        if (vertical(existing) && horizontal(c)) || (horizontal(existing) && vertical(c)) {
            self.set(x, y, '+');
        } else if existing == ' ' || vertical(existing) == vertical(c) {
            self.set(x, y, c);
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str) {
        for (i, c) in s.chars().enumerate() {
            self.set(x + i, y, c);
        }
    }

    fn vline(&mut self, x: usize, y0: usize, y1: usize, c: char) {
        let (a, b) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        for y in a..=b {
            self.set_line(x, y, c);
        }
    }

    fn hline(&mut self, y: usize, x0: usize, x1: usize, c: char) {
        let (a, b) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        for x in a..=b {
            self.set_line(x, y, c);
        }
    }

    fn into_lines(self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .cells
            .into_iter()
            .map(|row| row.into_iter().collect::<String>().trim_end().to_string())
            .collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines
    }
}

struct BoxChars {
    top_left: char,
    top_right: char,
    bottom_left: char,
    bottom_right: char,
    left: char,
    right: char,
}

fn box_chars(shape: NodeShape) -> BoxChars {
    let (top_left, top_right, bottom_left, bottom_right, left, right) = match shape {
        NodeShape::Rect => ('+', '+', '+', '+', '|', '|'),
        NodeShape::Round | NodeShape::Stadium | NodeShape::Circle => ('.', '.', '\'', '\'', '(', ')'),
        NodeShape::Cylinder => ('.', '.', '\'', '\'', '|', '|'),
        NodeShape::Subroutine => ('+', '+', '+', '+', '[', ']'),
        NodeShape::Diamond | NodeShape::Hexagon => ('/', '\\', '\\', '/', '<', '>'),
        NodeShape::Flag => ('+', '+', '+', '+', '>', '|'),
    };
    BoxChars { top_left, top_right, bottom_left, bottom_right, left, right }
}

fn line_chars(style: EdgeStyle) -> (char, char) {
    match style {
        EdgeStyle::Solid => ('|', '-'),
        EdgeStyle::Dotted => (':', '.'),
        EdgeStyle::Thick => ('#', '='),
    }
}

fn label_width(label: &str) -> usize {
    label.chars().count()
}

/// Draw the placed chart top-down
pub fn paint(
    nodes: &[FlowNode],
    edges: &[FlowEdge],
    placement: &Placement,
    spacing: Spacing,
) -> Vec<String> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let widths: Vec<usize> = nodes
        .iter()
        .map(|n| label_width(&n.label) + 2 * spacing.padding + 2)
        .collect();
    let layer_widths: Vec<usize> = placement
        .layers
        .iter()
        .map(|layer| {
            layer.iter().map(|&n| widths[n]).sum::<usize>()
                + spacing.node_gap * layer.len().saturating_sub(1)
        })
        .collect();
    let body_width = layer_widths.iter().copied().max().unwrap_or(0);

    // Edge labels may hang to the right of the widest layer
    let label_room = edges
        .iter()
        .filter_map(|e| e.label.as_deref())
        .map(|l| label_width(l) + 2)
        .max()
        .unwrap_or(0);
    let back_count = placement.back_edges.iter().filter(|&&b| b).count();
    let width = body_width + label_room + 2 * back_count + 2;
    let rank_gap = spacing.rank_gap.max(1);
    let row_stride = BOX_HEIGHT + rank_gap;
    let height = placement.layers.len() * row_stride;

    // Left x and top y of every node
    let mut x = vec![0usize; nodes.len()];
    let mut y = vec![0usize; nodes.len()];
    for (r, layer) in placement.layers.iter().enumerate() {
        let mut cursor = (body_width - layer_widths[r]) / 2;
        for &node in layer {
            x[node] = cursor;
            y[node] = r * row_stride;
            cursor += widths[node] + spacing.node_gap;
        }
    }
    let center = |node: usize| x[node] + widths[node] / 2;

    let mut canvas = Canvas::new(width, height);
    let mut labels: Vec<(usize, usize, &str)> = Vec::new();
    let mut lane = body_width + 1;

    for (edge, &back) in edges.iter().zip(&placement.back_edges) {
        if edge.from == edge.to {
            continue;
        }
        let (vertical, horizontal) = line_chars(edge.style);

        if back {
            // Up the right-hand lane into the target's side
            lane += 2;
            let from_row = y[edge.from] + 1;
            let to_row = y[edge.to] + 1;
            let from_side = x[edge.from] + widths[edge.from];
            let to_side = x[edge.to] + widths[edge.to];
            canvas.hline(from_row, from_side, lane, horizontal);
            canvas.vline(lane, from_row, to_row, vertical);
            canvas.hline(to_row, to_side, lane, horizontal);
            if edge.arrow {
                canvas.set(to_side, to_row, '<');
            }
            if let Some(label) = edge.label.as_deref() {
                labels.push((lane + 2, (from_row + to_row) / 2, label));
            }
            continue;
        }

        let sx = center(edge.from);
        let tx = center(edge.to);
        let below = y[edge.from] + BOX_HEIGHT;
        let above = y[edge.to].saturating_sub(1);
        let bend = below + (rank_gap - 1) / 2;

        canvas.vline(sx, below, bend, vertical);
        canvas.vline(tx, bend, above, vertical);
        if sx != tx {
            canvas.hline(bend, sx, tx, horizontal);
            canvas.set(sx, bend, '+');
            canvas.set(tx, bend, '+');
        }
        if edge.arrow {
            canvas.set(tx, above, 'v');
        }
        if let Some(label) = edge.label.as_deref() {
            let row = if above > bend { bend + 1 } else { bend };
            labels.push((tx + 2, row, label));
        }
    }

    for (lx, ly, label) in labels {
        canvas.put_str(lx, ly, label);
    }

    for (i, node) in nodes.iter().enumerate() {
        let chars = box_chars(node.shape);
        let (left, top) = (x[i], y[i]);
        let right = left + widths[i] - 1;
        let bottom = top + BOX_HEIGHT - 1;
        for col in left..=right {
            canvas.set(col, top, '-');
            canvas.set(col, bottom, '-');
        }
        for col in left + 1..right {
            canvas.set(col, top + 1, ' ');
        }
        canvas.set(left, top, chars.top_left);
        canvas.set(right, top, chars.top_right);
        canvas.set(left, bottom, chars.bottom_left);
        canvas.set(right, bottom, chars.bottom_right);
        canvas.set(left, top + 1, chars.left);
        canvas.set(right, top + 1, chars.right);
        canvas.put_str(left + 1 + spacing.padding, top + 1, &node.label);
    }

    canvas.into_lines()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::parse::parse_flowchart;
    use crate::render::SecurityLevel;

    fn chart(text: &str) -> Flowchart {
        parse_flowchart(text, SecurityLevel::Strict).unwrap()
    }

    #[test]
    fn test_ranks_follow_longest_path() {
        let chart = chart("flowchart TD\nA-->B\nB-->C\nA-->C");
        let placement = place(&chart);
        assert_eq!(placement.rank, vec![0, 1, 2]);
        assert_eq!(placement.layers.len(), 3);
    }

    #[test]
    fn test_cycle_is_broken() {
        let chart = chart("flowchart TD\nA-->B\nB-->C\nC-->A");
        let placement = place(&chart);
        assert_eq!(placement.rank, vec![0, 1, 2]);
        assert_eq!(placement.back_edges, vec![false, false, true]);
    }

    #[test]
    fn test_self_loop_is_not_a_back_edge() {
        let chart = chart("flowchart TD\nA-->A\nA-->B");
        let placement = place(&chart);
        assert_eq!(placement.back_edges, vec![false, false]);
        assert_eq!(placement.rank, vec![0, 1]);
    }

    #[test]
    fn test_siblings_share_a_layer() {
        let chart = chart("flowchart TD\nA-->B\nA-->C\nB-->D\nC-->D");
        let placement = place(&chart);
        assert_eq!(placement.layers, vec![vec![0], vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_paint_two_boxes() {
        let chart = chart("flowchart TD\nA[Start]-->B[End]");
        let placement = place(&chart);
        let spacing = Spacing { padding: 1, node_gap: 2, rank_gap: 2 };
        let lines = paint(&chart.nodes, &chart.edges, &placement, spacing);

        assert_eq!(lines[0].trim(), "+-------+");
        assert_eq!(lines[1].trim(), "| Start |");
        assert_eq!(lines[2].trim(), "+-------+");
        assert_eq!(lines[4].trim(), "v");
        assert_eq!(lines[5].trim(), "+-----+");
        assert_eq!(lines[6].trim(), "| End |");
    }

    #[test]
    fn test_paint_keeps_labels_at_minimum_spacing() {
        let chart = chart("flowchart TD\nA[Start]-->|go| B{Done?}");
        let placement = place(&chart);
        let spacing = Spacing { padding: 0, node_gap: 1, rank_gap: 1 };
        let text = paint(&chart.nodes, &chart.edges, &placement, spacing).join("\n");

        assert!(text.contains("|Start|"));
        assert!(text.contains("<Done?>"));
        assert!(text.contains("go"));
    }

    #[test]
    fn test_back_edge_enters_from_the_side() {
        let chart = chart("flowchart TD\nA-->B\nB-->A");
        let placement = place(&chart);
        let spacing = Spacing { padding: 1, node_gap: 2, rank_gap: 2 };
        let lines = paint(&chart.nodes, &chart.edges, &placement, spacing);
        assert!(lines[1].contains("<"));
    }
}
