use flowdraft_core::{ChatRole, Theme};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode};

/// Colors used for the diagram panel
struct Palette {
    accent: Color,
    diagram: Color,
    background: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Default => Palette {
            accent: Color::Cyan,
            diagram: Color::Reset,
            background: Color::Reset,
        },
        Theme::Dark => Palette {
            accent: Color::LightBlue,
            diagram: Color::Gray,
            background: Color::Black,
        },
        Theme::Forest => Palette {
            accent: Color::Green,
            diagram: Color::LightGreen,
            background: Color::Reset,
        },
        Theme::Neutral => Palette {
            accent: Color::Gray,
            diagram: Color::DarkGray,
            background: Color::Reset,
        },
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let [chat_area, diagram_area] = Layout::horizontal([
        Constraint::Percentage(40),
        Constraint::Percentage(60),
    ])
    .areas(body_area);

    render_header(app, frame, header_area);
    render_chat_panel(app, frame, chat_area);
    render_diagram_panel(app, frame, diagram_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" flowdraft ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("{}: {} ", app.provider.display_name(), app.session.settings().model),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" PROMPT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(
                if app.is_loading() { " busy " } else { " send " },
                label_style,
            ),
            Span::styled(" Alt+Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" i ", key_style),
            Span::styled(" prompt ", label_style),
            Span::styled(" +/- ", key_style),
            Span::styled(" zoom ", label_style),
            Span::styled(" 0 ", key_style),
            Span::styled(" reset ", label_style),
            Span::styled(" hjkl ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" s ", key_style),
            Span::styled(if app.show_source { " diagram " } else { " source " }, label_style),
            Span::styled(" n ", key_style),
            Span::styled(" new ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)]
            .into_iter()
            .chain(hints)
            .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_chat_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    // Prompt box grows with its line count, up to a limit
    let prompt_lines = app.session.prompt().lines().count().max(1) as u16
        + u16::from(app.session.prompt().ends_with('\n'));
    let input_height = prompt_lines.clamp(1, 6) + 2;

    let error = app.session.error_message();
    let error_height = if error.is_some() { 3 } else { 0 };

    let [transcript_area, error_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(error_height),
        Constraint::Length(input_height),
    ])
    .areas(area);

    // Store transcript dimensions for scroll calculations (inner size minus borders)
    app.transcript_height = transcript_area.height.saturating_sub(2);
    app.transcript_width = transcript_area.width.saturating_sub(2);

    let transcript_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let turns = app.session.conversation().turns();
    let transcript_text = if turns.is_empty() && !app.is_loading() {
        Text::from(Span::styled(
            "Describe the flowchart you want...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in turns {
            let (label, color) = match msg.role {
                ChatRole::User => ("You:", Color::Cyan),
                _ => ("Diagram:", Color::Yellow),
            };
            lines.push(Line::from(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            for line in msg.content.lines() {
                lines.push(Line::from(line.to_string()));
            }
            lines.push(Line::default());
        }

        if app.is_loading() {
            lines.push(Line::from(Span::styled(
                "Diagram:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Generating{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let transcript = Paragraph::new(transcript_text)
        .block(transcript_block)
        .wrap(Wrap { trim: false })
        .scroll((app.transcript_scroll, 0));
    frame.render_widget(transcript, transcript_area);

    if let Some(message) = error {
        let error_widget = Paragraph::new(message)
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(" Error "),
            );
        frame.render_widget(error_widget, error_area);
    }

    let editing = app.input_mode == InputMode::Editing;
    let input_border_color = if app.is_loading() {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::Gray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(format!(" {} ", app.session.submit_label()));

    // Keep the cursor line visible when the prompt is taller than the box
    let inner_height = input_area.height.saturating_sub(2) as usize;
    let (cursor_line, cursor_col) = app.cursor_line_col();
    let line_offset = (cursor_line + 1).saturating_sub(inner_height);

    let input = Paragraph::new(app.session.prompt().to_string())
        .style(Style::default().fg(Color::Cyan))
        .scroll((line_offset as u16, 0))
        .block(input_block);
    frame.render_widget(input, input_area);

    if editing {
        frame.set_cursor_position((
            input_area.x + cursor_col as u16 + 1,
            input_area.y + cursor_line.saturating_sub(line_offset) as u16 + 1,
        ));
    }
}

fn render_diagram_panel(app: &App, frame: &mut Frame, area: Rect) {
    let colors = palette(app.theme());

    let title = Line::from(vec![
        Span::raw(" "),
        Span::styled("-", Style::default().fg(colors.accent).bold()),
        Span::raw(format!(" {}% ", app.session.scale_percent())),
        Span::styled("+", Style::default().fg(colors.accent).bold()),
        Span::raw(if app.show_source { " source " } else { " " }),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.accent))
        .title(title)
        .style(Style::default().bg(colors.background));

    let mut lines = app.diagram_lines();

    // Center the whole drawing with one offset so its columns stay aligned
    let options = app.session.view().renderer().options();
    if options.use_max_width && !app.show_source && app.diagram_scroll.1 == 0 {
        let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let inner_width = area.width.saturating_sub(2) as usize;
        let offset = " ".repeat(inner_width.saturating_sub(widest) / 2);
        lines = lines.into_iter().map(|l| format!("{}{}", offset, l)).collect();
    }

    let body = if lines.is_empty() {
        let hint = if app.session.view().error().is_some() {
            "The diagram could not be drawn. Press s to see its source."
        } else {
            "Your flowchart will appear here."
        };
        Text::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
    } else {
        Text::from(lines.into_iter().map(Line::from).collect::<Vec<_>>())
    };

    let style = if app.show_source {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(colors.diagram)
    };

    let diagram = Paragraph::new(body)
        .style(style)
        .block(block)
        .scroll(app.diagram_scroll);

    frame.render_widget(diagram, area);
}
