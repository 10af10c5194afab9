//! Terminal flowchart renderer
//!
//! `FlowchartRenderer` is configured once per session and turns flowchart
//! text into a `RenderedDiagram`. Zooming is applied when painting, so the
//! same rendered diagram can be redrawn at any scale without parsing again.

pub mod layout;
pub mod parse;

pub use layout::{Placement, Spacing};
pub use parse::{Direction, EdgeStyle, FlowEdge, FlowNode, Flowchart, NodeShape};

use crate::error::RenderError;

/// Color theme for the diagram panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Default,
    Dark,
    Forest,
    Neutral,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Dark => "dark",
            Theme::Forest => "forest",
            Theme::Neutral => "neutral",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "default" => Some(Theme::Default),
            "dark" => Some(Theme::Dark),
            "forest" => Some(Theme::Forest),
            "neutral" => Some(Theme::Neutral),
            _ => None,
        }
    }
}

/// How much of the model's markup reaches the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityLevel {
    /// Markup tags are stripped from labels
    #[default]
    Strict,
    Loose,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub theme: Theme,
    pub security: SecurityLevel,
    /// Center the diagram in the available width
    pub use_max_width: bool,
    /// Blank columns between a label and its box edge, at 100%
    pub padding: usize,
    /// Columns between neighbouring nodes, at 100%
    pub node_spacing: usize,
    /// Rows between ranks, at 100%
    pub rank_spacing: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            theme: Theme::Default,
            security: SecurityLevel::Strict,
            use_max_width: true,
            padding: 2,
            node_spacing: 4,
            rank_spacing: 3,
        }
    }
}

impl RenderOptions {
    /// Spacing at `scale`; gaps never collapse below one cell
    pub fn spacing(&self, scale: f32) -> Spacing {
        let scaled = |value: usize| (value as f32 * scale).round().max(0.0) as usize;
        Spacing {
            padding: scaled(self.padding),
            node_gap: scaled(self.node_spacing).max(1),
            rank_gap: scaled(self.rank_spacing).max(1),
        }
    }
}

pub trait DiagramRenderer {
    fn render(&self, source: &str) -> Result<RenderedDiagram, RenderError>;
}

#[derive(Debug, Clone)]
pub struct FlowchartRenderer {
    options: RenderOptions,
}

impl FlowchartRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }
}

impl Default for FlowchartRenderer {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

impl DiagramRenderer for FlowchartRenderer {
    fn render(&self, source: &str) -> Result<RenderedDiagram, RenderError> {
        let chart = parse::parse_flowchart(source, self.options.security)?;
        let placement = layout::place(&chart);
        Ok(RenderedDiagram {
            chart,
            placement,
            options: self.options,
        })
    }
}

/// A parsed and placed diagram, ready to paint at any scale
#[derive(Debug, Clone)]
pub struct RenderedDiagram {
    chart: Flowchart,
    placement: Placement,
    options: RenderOptions,
}

impl RenderedDiagram {
    pub fn chart(&self) -> &Flowchart {
        &self.chart
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Draw the diagram as text lines with the zoom factor applied
    pub fn paint(&self, scale: f32) -> Vec<String> {
        let lines = layout::paint(
            &self.chart.nodes,
            &self.chart.edges,
            &self.placement,
            self.options.spacing(scale),
        );
        match self.chart.direction {
            Direction::BottomUp => flip_vertical(lines),
            _ => lines,
        }
    }
}

fn flip_vertical(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .rev()
        .map(|line| {
            line.chars()
                .map(|c| match c {
                    'v' => '^',
                    '\'' => '.',
                    '.' => '\'',
                    '/' => '\\',
                    '\\' => '/',
                    other => other,
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spacing_scales_and_clamps() {
        let options = RenderOptions::default();
        assert_eq!(options.spacing(1.0), Spacing { padding: 2, node_gap: 4, rank_gap: 3 });
        assert_eq!(options.spacing(2.0), Spacing { padding: 4, node_gap: 8, rank_gap: 6 });
        assert_eq!(options.spacing(0.1), Spacing { padding: 0, node_gap: 1, rank_gap: 1 });
    }

    #[test]
    fn test_render_then_paint_at_scales() {
        let renderer = FlowchartRenderer::default();
        let diagram = renderer.render("flowchart TD\nA[Start]-->B[End]").unwrap();

        let normal = diagram.paint(1.0);
        let zoomed = diagram.paint(2.0);
        let small = diagram.paint(0.1);

        assert!(normal.iter().any(|l| l.contains("Start")));
        assert!(small.iter().any(|l| l.contains("|Start|")));
        assert!(zoomed.len() > normal.len());
        assert!(normal.len() > small.len());
    }

    #[test]
    fn test_render_failure_is_render_error() {
        let renderer = FlowchartRenderer::default();
        let err = renderer.render("flowchart TD\nA[oops").unwrap_err();
        assert!(matches!(err, RenderError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_bottom_up_flips_arrows() {
        let renderer = FlowchartRenderer::default();
        let diagram = renderer.render("flowchart BT\nA-->B").unwrap();
        let text = diagram.paint(1.0).join("\n");
        assert!(text.contains('^'));
        assert!(!text.contains('v'));
    }

    #[test]
    fn test_theme_names() {
        assert_eq!(Theme::from_str("Forest"), Some(Theme::Forest));
        assert_eq!(Theme::from_str("neon"), None);
        assert_eq!(Theme::Dark.as_str(), "dark");
    }
}
