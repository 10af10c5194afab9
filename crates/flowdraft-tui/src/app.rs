use flowdraft_core::{
    AiClient, CompletionClient, Config, FlowchartRenderer, GenerationError, GenerationSettings,
    PendingGeneration, Provider, RenderOptions, Session, Theme,
};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn saturating_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: Session<FlowchartRenderer>,

    // Prompt editing
    pub prompt_cursor: usize, // cursor position in the session prompt, in chars

    // Generation in flight
    pub generation_task: Option<JoinHandle<Result<String, GenerationError>>>,
    pub pending: Option<PendingGeneration>,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Transcript panel
    pub transcript_scroll: u16,
    pub transcript_height: u16,
    pub transcript_width: u16,

    // Diagram panel
    pub diagram_scroll: (u16, u16), // (rows, columns)
    pub show_source: bool,

    // Provider
    pub provider: Provider,
    pub client: Option<AiClient>,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let provider = config.provider();
        let client = match AiClient::from_config(provider, config) {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::warn!(error = %err, "no completion client available");
                None
            }
        };
        let renderer = FlowchartRenderer::new(RenderOptions {
            theme: config.theme(),
            ..RenderOptions::default()
        });

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            session: Session::new(renderer, GenerationSettings::from_config(config)),
            prompt_cursor: 0,
            generation_task: None,
            pending: None,
            animation_frame: 0,
            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,
            diagram_scroll: (0, 0),
            show_source: false,
            provider,
            client,
        }
    }

    /// Theme the diagram was configured with
    pub fn theme(&self) -> Theme {
        self.session.view().renderer().options().theme
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    /// Submit the prompt and spawn the completion request
    pub fn start_generation(&mut self) {
        if self.generation_task.is_some() {
            return;
        }
        let Some(pending) = self.session.submit() else {
            return;
        };
        self.input_mode = InputMode::Normal;

        let Some(client) = self.client.clone() else {
            self.session
                .complete_failure(&GenerationError::MissingApiKey(self.provider.display_name()));
            return;
        };

        let request = pending.request.clone();
        self.generation_task = Some(tokio::spawn(async move { client.complete(&request).await }));
        self.pending = Some(pending);
        self.scroll_transcript_to_bottom();
    }

    /// Apply the outcome of a finished generation task, if any
    pub async fn poll_generation(&mut self) {
        let finished = self
            .generation_task
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        let (Some(task), Some(pending)) = (self.generation_task.take(), self.pending.take()) else {
            return;
        };
        let result = match task.await {
            Ok(result) => result,
            Err(err) => Err(GenerationError::Task(err.to_string())),
        };

        let succeeded = result.is_ok();
        self.session.finish(pending, result);
        if succeeded {
            self.prompt_cursor = 0;
            self.diagram_scroll = (0, 0);
        }
        self.scroll_transcript_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Throw away the conversation and diagram
    pub fn new_diagram(&mut self) {
        if self.session.clear() {
            self.prompt_cursor = 0;
            self.diagram_scroll = (0, 0);
            self.transcript_scroll = 0;
            self.show_source = false;
        }
    }

    // Prompt editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(self.session.prompt(), self.prompt_cursor);
        self.session.prompt_mut().insert(byte_pos, c);
        self.prompt_cursor += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.prompt_cursor > 0 {
            self.prompt_cursor -= 1;
            let byte_pos = char_to_byte_index(self.session.prompt(), self.prompt_cursor);
            self.session.prompt_mut().remove(byte_pos);
        }
    }

    pub fn delete_at_cursor(&mut self) {
        let char_count = self.session.prompt().chars().count();
        if self.prompt_cursor < char_count {
            let byte_pos = char_to_byte_index(self.session.prompt(), self.prompt_cursor);
            self.session.prompt_mut().remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.prompt_cursor = self.prompt_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.session.prompt().chars().count();
        self.prompt_cursor = (self.prompt_cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.prompt_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.prompt_cursor = self.session.prompt().chars().count();
    }

    /// Cursor as (line, column) within the prompt, for drawing
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let before: String = self.session.prompt().chars().take(self.prompt_cursor).collect();
        let line = before.matches('\n').count();
        let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count());
        (line, col)
    }

    // Diagram panel

    pub fn diagram_lines(&self) -> Vec<String> {
        if self.show_source {
            self.session.diagram_source().lines().map(str::to_string).collect()
        } else {
            self.session.view().lines().to_vec()
        }
    }

    pub fn scroll_diagram_down(&mut self) {
        let max = saturating_u16(self.diagram_lines().len().saturating_sub(1));
        self.diagram_scroll.0 = (self.diagram_scroll.0 + 1).min(max);
    }

    pub fn scroll_diagram_up(&mut self) {
        self.diagram_scroll.0 = self.diagram_scroll.0.saturating_sub(1);
    }

    pub fn scroll_diagram_right(&mut self) {
        let widest = self
            .diagram_lines()
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0);
        let max = saturating_u16(widest.saturating_sub(1));
        self.diagram_scroll.1 = (self.diagram_scroll.1 + 2).min(max);
    }

    pub fn scroll_diagram_left(&mut self) {
        self.diagram_scroll.1 = self.diagram_scroll.1.saturating_sub(2);
    }

    pub fn toggle_source(&mut self) {
        self.show_source = !self.show_source;
        self.diagram_scroll = (0, 0);
    }

    // Transcript panel

    pub fn scroll_transcript_down(&mut self) {
        self.transcript_scroll = self.transcript_scroll.saturating_add(1);
    }

    pub fn scroll_transcript_up(&mut self) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(1);
    }

    /// Scroll the transcript so the newest message (or loading line) is visible
    pub fn scroll_transcript_to_bottom(&mut self) {
        let wrap_width = if self.transcript_width > 0 {
            self.transcript_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for msg in self.session.conversation().turns() {
            // Role line plus the blank line after the message
            total_lines = total_lines.saturating_add(2);
            for line in msg.content.lines() {
                let wrapped = line.chars().count() / wrap_width + 1;
                total_lines = total_lines.saturating_add(saturating_u16(wrapped));
            }
        }
        if self.is_loading() {
            total_lines = total_lines.saturating_add(2);
        }

        let visible_height = if self.transcript_height > 0 {
            self.transcript_height
        } else {
            20
        };

        self.transcript_scroll = total_lines.saturating_sub(visible_height);
    }
}
