//! Session state behind the two panels
//!
//! `Session` owns the prompt, conversation, current diagram source, zoom
//! scale and request status. Every change to the source or the scale is
//! pushed to its `DiagramView`, which re-renders only when the source changed
//! and otherwise just repaints.

use tracing::{error, info, warn};

use crate::ai::{CompletionClient, CompletionRequest};
use crate::config::Config;
use crate::conversation::{build_request_messages, Conversation};
use crate::error::{GenerationError, RenderError};
use crate::render::{DiagramRenderer, FlowchartRenderer, RenderedDiagram};
use crate::sanitize::sanitize;

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 2.0;
pub const ZOOM_STEP: f32 = 0.1;
pub const DEFAULT_SCALE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    InFlight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model(),
            temperature: config.temperature(),
            max_tokens: config.max_tokens(),
        }
    }
}

/// A submitted prompt waiting on the completion endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct PendingGeneration {
    pub prompt: String,
    pub request: CompletionRequest,
}

/// Rendered output for the current source and scale
pub struct DiagramView<R> {
    renderer: R,
    source: String,
    scale: f32,
    rendered: Option<RenderedDiagram>,
    error: Option<RenderError>,
    lines: Vec<String>,
    render_count: usize,
}

impl<R: DiagramRenderer> DiagramView<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            source: String::new(),
            scale: DEFAULT_SCALE,
            rendered: None,
            error: None,
            lines: Vec::new(),
            render_count: 0,
        }
    }

    /// Bring the view in line with `source` and `scale`
    pub fn sync(&mut self, source: &str, scale: f32) {
        let source_changed = source != self.source;
        if source_changed {
            self.source = source.to_string();
            self.render();
        }
        if source_changed || scale != self.scale {
            self.scale = scale;
            self.lines = self
                .rendered
                .as_ref()
                .map(|diagram| diagram.paint(scale))
                .unwrap_or_default();
        }
    }

    fn render(&mut self) {
        self.rendered = None;
        self.error = None;
        if self.source.trim().is_empty() {
            return;
        }

        self.render_count += 1;
        match self.renderer.render(&self.source) {
            Ok(diagram) => self.rendered = Some(diagram),
            Err(err) => {
                error!(error = %err, source = %self.source, "diagram failed to render");
                self.error = Some(err);
            }
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn rendered(&self) -> Option<&RenderedDiagram> {
        self.rendered.as_ref()
    }

    pub fn error(&self) -> Option<&RenderError> {
        self.error.as_ref()
    }

    /// Number of times the renderer has been invoked
    pub fn render_count(&self) -> usize {
        self.render_count
    }
}

pub struct Session<R = FlowchartRenderer> {
    prompt: String,
    conversation: Conversation,
    diagram_source: String,
    scale: f32,
    status: RequestStatus,
    last_error: Option<String>,
    settings: GenerationSettings,
    view: DiagramView<R>,
}

impl<R: DiagramRenderer> Session<R> {
    pub fn new(renderer: R, settings: GenerationSettings) -> Self {
        Self {
            prompt: String::new(),
            conversation: Conversation::default(),
            diagram_source: String::new(),
            scale: DEFAULT_SCALE,
            status: RequestStatus::Idle,
            last_error: None,
            settings,
            view: DiagramView::new(renderer),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, text: impl Into<String>) {
        self.prompt = text.into();
    }

    pub fn prompt_mut(&mut self) -> &mut String {
        &mut self.prompt
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn diagram_source(&self) -> &str {
        &self.diagram_source
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn scale_percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == RequestStatus::InFlight
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: GenerationSettings) {
        self.settings = settings;
    }

    pub fn view(&self) -> &DiagramView<R> {
        &self.view
    }

    /// Error text from the last failed generation
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The one message the user sees: generation failures first, then render failures
    pub fn error_message(&self) -> Option<String> {
        self.last_error
            .clone()
            .or_else(|| self.view.error().map(|e| format!("Render error: {}", e)))
    }

    pub fn submit_label(&self) -> &'static str {
        if self.diagram_source.is_empty() {
            "Generate Diagram"
        } else {
            "Update Diagram"
        }
    }

    /// Start a generation. Returns `None` and changes nothing when the prompt
    /// is blank or a request is already in flight.
    pub fn submit(&mut self) -> Option<PendingGeneration> {
        if self.status == RequestStatus::InFlight {
            warn!("submit ignored, a generation is already in flight");
            return None;
        }
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            warn!("submit ignored, the prompt is blank");
            return None;
        }

        let messages = build_request_messages(&self.conversation, &self.diagram_source, prompt);
        let pending = PendingGeneration {
            prompt: prompt.to_string(),
            request: CompletionRequest {
                model: self.settings.model.clone(),
                messages,
                temperature: self.settings.temperature,
                max_tokens: self.settings.max_tokens,
            },
        };
        self.status = RequestStatus::InFlight;
        Some(pending)
    }

    pub fn complete_success(&mut self, pending: PendingGeneration, raw: &str) {
        let code = sanitize(raw);
        info!(
            model = %pending.request.model,
            bytes = code.len(),
            "diagram generated"
        );

        self.conversation = self
            .conversation
            .append_user(&pending.prompt)
            .append_assistant(&code);
        self.diagram_source = code;
        self.last_error = None;
        self.prompt.clear();
        self.status = RequestStatus::Idle;
        self.view.sync(&self.diagram_source, self.scale);
    }

    pub fn complete_failure(&mut self, err: &GenerationError) {
        warn!(error = %err, "diagram generation failed");
        self.last_error = Some(format!("Failed to generate diagram: {}", err));
        self.status = RequestStatus::Idle;
    }

    pub fn finish(&mut self, pending: PendingGeneration, result: Result<String, GenerationError>) {
        match result {
            Ok(raw) => self.complete_success(pending, &raw),
            Err(err) => self.complete_failure(&err),
        }
    }

    /// Submit, wait for the client and apply the outcome. Returns false when
    /// the submission was rejected.
    pub async fn generate<C>(&mut self, client: &C) -> bool
    where
        C: CompletionClient + ?Sized,
    {
        let Some(pending) = self.submit() else {
            return false;
        };
        let result = client.complete(&pending.request).await;
        self.finish(pending, result);
        true
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale - ZOOM_STEP);
    }

    pub fn reset_zoom(&mut self) {
        self.set_scale(DEFAULT_SCALE);
    }

    pub fn set_scale(&mut self, scale: f32) {
        // One decimal keeps repeated steps from drifting
        let rounded = (scale * 10.0).round() / 10.0;
        self.scale = rounded.clamp(MIN_SCALE, MAX_SCALE);
        self.view.sync(&self.diagram_source, self.scale);
    }

    /// Start over with an empty conversation; ignored while in flight
    pub fn clear(&mut self) -> bool {
        if self.is_loading() {
            return false;
        }
        self.conversation = Conversation::default();
        self.diagram_source.clear();
        self.last_error = None;
        self.prompt.clear();
        self.view.sync(&self.diagram_source, self.scale);
        true
    }
}
