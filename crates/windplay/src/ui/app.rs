//! Application loop for the TUI.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;

use crate::app::coordinator::{
    ApplyOutcome, CoordinatorState, GenerationOutcome, GenerationRequest, GenerationResponse,
};
use crate::app::dispatch::RequestDispatcher;
use crate::app::playground::{DEFAULT_WINDFILE, Playground};
use crate::app::session::{SessionSnapshot, SessionStore};
use crate::domain::model::GenerationTarget;
use crate::infra::config::{Config, DeploymentMode, Endpoint, EnvOverrides};
use crate::infra::generation::{GenerationService, HttpGenerationClient};
use crate::infra::highlight::Highlighter;
use crate::infra::schema::SchemaValidator;
use crate::ui::components::command_palette::{
    CommandPalette, CommandPaletteState, HELP, PaletteCommand,
};
use crate::ui::components::diagnostics::Diagnostics;
use crate::ui::components::editor::{Editor, EditorState};
use crate::ui::components::output_tabs::{OutputTabs, OutputView};

const TICK_RATE: Duration = Duration::from_millis(250);
const SCROLL_PAGE: i32 = 10;

/// Command-line choices for the interactive playground.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Windfile to edit; saved back on `save`.
    pub file: Option<PathBuf>,
    pub target: Option<GenerationTarget>,
    pub mode: Option<DeploymentMode>,
}

/// Everything resolved at startup apart from the validator and the generation service.
#[derive(Debug, Clone)]
pub struct PlaygroundSetup {
    pub document: String,
    pub target: GenerationTarget,
    pub theme: String,
    pub endpoint: Endpoint,
    pub file: Option<PathBuf>,
    pub session_store: SessionStore,
}

/// Primary entry point for running the interactive TUI.
pub struct UiApp {
    theme: String,
    endpoint: Endpoint,
    playground: Playground,
    dispatcher: RequestDispatcher,
    responses: mpsc::UnboundedReceiver<GenerationResponse>,
    validator: SchemaValidator,
    highlighter: Highlighter,
    editor: EditorState,
    output: OutputView,
    session_store: SessionStore,
    file: Option<PathBuf>,
    palette_state: CommandPaletteState,
    status: Option<StatusMessage>,
    focus: FocusTarget,
    should_quit: bool,
}

impl UiApp {
    /// Resolve config, session, endpoint, and schema, then build the app.
    pub async fn bootstrap(options: AppOptions, root: PathBuf) -> Result<Self> {
        let config = Config::load()?;
        let session_store = SessionStore::new(root);

        let snapshot = if options.file.is_none() {
            session_store.load().unwrap_or_else(|err| {
                tracing::warn!(error = %format!("{err:#}"), "ignoring unreadable session");
                None
            })
        } else {
            None
        };

        let document = match &options.file {
            Some(path) if path.exists() => fs::read_to_string(path)
                .with_context(|| format!("failed to read windfile {}", path.display()))?,
            Some(_) => DEFAULT_WINDFILE.to_string(),
            None => snapshot
                .as_ref()
                .map(|snapshot| snapshot.document.clone())
                .unwrap_or_else(|| DEFAULT_WINDFILE.to_string()),
        };
        let target = options
            .target
            .or(snapshot.map(|snapshot| snapshot.target))
            .unwrap_or(config.defaults.target);

        let mode = DeploymentMode::resolve(options.mode, EnvOverrides::from_env().mode());
        let endpoint = config.endpoint.resolve(mode);
        let timeout = config.endpoint.timeout();
        let validator = SchemaValidator::load(&config.schema, timeout).await?;
        let client = HttpGenerationClient::new(&endpoint, timeout)
            .context("failed to build generation client")?;

        tracing::info!(
            mode = %mode,
            endpoint = endpoint.base_url(),
            schema = validator.source().describe(),
            target = %target,
            "playground starting"
        );

        let setup = PlaygroundSetup {
            document,
            target,
            theme: config.defaults.theme.clone(),
            endpoint,
            file: options.file,
            session_store,
        };
        Ok(Self::new(setup, validator, Arc::new(client)))
    }

    /// Assemble the app and issue the request for the initial document. Requires a tokio runtime.
    pub fn new(
        setup: PlaygroundSetup,
        validator: SchemaValidator,
        service: Arc<dyn GenerationService>,
    ) -> Self {
        let (dispatcher, responses) = RequestDispatcher::new(service);
        let mut app = Self {
            theme: setup.theme,
            endpoint: setup.endpoint,
            playground: Playground::new(setup.document.clone(), setup.target),
            dispatcher,
            responses,
            validator,
            highlighter: Highlighter::new(),
            editor: EditorState::from_text(&setup.document),
            output: OutputView::default(),
            session_store: setup.session_store,
            file: setup.file,
            palette_state: CommandPaletteState::default(),
            status: None,
            focus: FocusTarget::Editor,
            should_quit: false,
        };
        let markers = app.validator.validate(app.playground.source());
        if let Some(request) = app.playground.validate(markers) {
            app.dispatch(request);
        }
        app
    }

    /// Launch the terminal UI and enter the event loop.
    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to initialize terminal")?;

        let event_loop_result = self.event_loop(&mut terminal).await;

        disable_raw_mode().ok();
        let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
        let _ = terminal.show_cursor();

        event_loop_result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        let mut events = EventStream::new();
        let mut ticker = tokio::time::interval(TICK_RATE);

        loop {
            terminal.draw(|frame| self.render(frame))?;
            if self.should_quit {
                break;
            }

            tokio::select! {
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(err)) => return Err(err).context("failed to read terminal event"),
                    None => break,
                },
                Some(response) = self.responses.recv() => self.handle_response(response),
                _ = ticker.tick() => self.tick(),
            }
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame<'_>) {
        let size = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(size);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(layout[0]);

        let left_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(7)])
            .split(main_chunks[0]);

        Editor.render(
            frame,
            left_chunks[0],
            &mut self.editor,
            self.playground.markers(),
            self.focus == FocusTarget::Editor && !self.palette_state.is_open(),
        );
        Diagnostics.render(frame, left_chunks[1], self.playground.markers());

        let tabs = self.playground.tabs();
        if let Some(selected) = tabs.iter().find(|tab| tab.selected) {
            self.output.refresh(&self.highlighter, selected, &self.theme);
        }
        OutputTabs.render(
            frame,
            main_chunks[1],
            &tabs,
            &self.output,
            self.focus == FocusTarget::Output,
        );

        self.render_status(frame, layout[1]);
        CommandPalette.render(frame, size, &self.palette_state);
    }

    fn render_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let state = self.playground.state();
        let state_color = match state {
            CoordinatorState::Idle => Color::Green,
            CoordinatorState::Blocked => Color::Red,
            CoordinatorState::Requesting => Color::Yellow,
        };
        let mut spans = vec![
            Span::styled(
                format!(" {} ", state.label()),
                Style::default()
                    .fg(state_color)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} · {} ", self.endpoint.mode(), self.endpoint.base_url()),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("│ "),
        ];

        match &self.status {
            Some(status) => {
                let style = match status.level {
                    StatusLevel::Info => Style::default().fg(Color::Gray),
                    StatusLevel::Success => Style::default().fg(Color::Green),
                    StatusLevel::Error => Style::default().fg(Color::Red),
                };
                spans.push(Span::styled(status.text.as_str(), style));
            }
            None => spans.push(Span::styled(
                "ctrl+p commands · ctrl+r regenerate · ctrl+s save · ctrl+q quit",
                Style::default().fg(Color::DarkGray),
            )),
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn tick(&mut self) {
        if let Some(status) = &self.status
            && status.is_expired()
        {
            self.status = None;
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key_event(key),
            Event::Paste(text) if self.focus == FocusTarget::Editor => {
                self.editor.insert_str(&text.replace('\r', ""));
                self.on_edit();
            }
            _ => {}
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if self.palette_state.is_open() {
            self.handle_palette_key(key);
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('q') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Char('r') => {
                    self.regenerate();
                    return;
                }
                KeyCode::Char('s') => {
                    self.report(Self::save_session);
                    return;
                }
                KeyCode::Char('p') => {
                    self.palette_state.open();
                    return;
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::F(n @ 1..=3) => {
                self.select_tab(usize::from(n) - 1);
                return;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.toggled();
                return;
            }
            _ => {}
        }

        match self.focus {
            FocusTarget::Editor => {
                if self.editor.handle_key(key) {
                    self.on_edit();
                }
            }
            FocusTarget::Output => self.handle_output_key(key),
        }
    }

    fn handle_output_key(&mut self, key: KeyEvent) {
        let current = self.playground.target().tab_index();
        let count = GenerationTarget::ALL.len();
        match key.code {
            KeyCode::Left => self.select_tab((current + count - 1) % count),
            KeyCode::Right => self.select_tab((current + 1) % count),
            KeyCode::Up | KeyCode::Char('k') => self.output.scroll_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.output.scroll_by(1),
            KeyCode::PageUp => self.output.scroll_by(-SCROLL_PAGE),
            KeyCode::PageDown => self.output.scroll_by(SCROLL_PAGE),
            KeyCode::Home => self.output.scroll_by(i32::MIN / 2),
            KeyCode::Tab | KeyCode::Esc => self.focus = FocusTarget::Editor,
            _ => {}
        }
    }

    fn handle_palette_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.palette_state.close();
            }
            KeyCode::Enter => {
                let command = self.palette_state.take_input();
                self.palette_state.close();
                self.report(|app| app.execute_command(&command));
            }
            KeyCode::Backspace => {
                self.palette_state.pop_char();
            }
            KeyCode::Char(ch) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    self.palette_state.push_char(ch);
                }
            }
            _ => {}
        }
    }

    fn execute_command(&mut self, input: &str) -> Result<()> {
        let Some(command) = PaletteCommand::parse(input)? else {
            return Ok(());
        };

        match command {
            PaletteCommand::Target(target) => {
                if let Some(request) = self.playground.select_target(target) {
                    self.dispatch(request);
                }
                self.set_status(
                    StatusLevel::Success,
                    format!("Target set to {}", target.tab_name()),
                );
            }
            PaletteCommand::Regenerate => self.regenerate(),
            PaletteCommand::Write(path) => self.write_output(path)?,
            PaletteCommand::Save => self.save_session()?,
            PaletteCommand::Reset => {
                self.editor = EditorState::from_text(DEFAULT_WINDFILE);
                self.on_edit();
                self.set_status(StatusLevel::Info, "Editor reset to the sample windfile");
            }
            PaletteCommand::Help => self.set_status(StatusLevel::Info, HELP),
        }
        Ok(())
    }

    /// Validate the editor text and hand both to the playground in one step.
    fn on_edit(&mut self) {
        let text = self.editor.text();
        let markers = self.validator.validate(&text);
        if let Some(request) = self.playground.edit_validated(text, markers) {
            self.dispatch(request);
        }
    }

    fn select_tab(&mut self, index: usize) {
        if let Some(request) = self.playground.select_tab(index) {
            self.dispatch(request);
        }
    }

    fn regenerate(&mut self) {
        match self.playground.regenerate() {
            Some(request) => {
                self.dispatch(request);
                self.set_status(StatusLevel::Info, "Regenerating");
            }
            None => self.set_status(
                StatusLevel::Error,
                "Fix the validation problems before regenerating",
            ),
        }
    }

    fn dispatch(&self, request: GenerationRequest) {
        tracing::debug!(request = %request.id, path = %request.path(), "dispatching");
        drop(self.dispatcher.dispatch(request));
    }

    fn handle_response(&mut self, response: GenerationResponse) {
        let failure = match &response.outcome {
            GenerationOutcome::Failed(reason) => Some(reason.clone()),
            _ => None,
        };
        if self.playground.apply(response) == ApplyOutcome::Failed {
            let reason = failure.unwrap_or_default();
            self.set_status(StatusLevel::Error, format!("Generation failed: {reason}"));
        }
    }

    fn write_output(&mut self, path: Option<PathBuf>) -> Result<()> {
        let tab = self.playground.selected_tab();
        if tab.placeholder {
            return Err(anyhow!("nothing generated for {} yet", tab.name));
        }

        let path = path.unwrap_or_else(|| PathBuf::from(output_file_name(tab.target)));
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, &tab.body)
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.set_status(
            StatusLevel::Success,
            format!("Wrote {} to {}", tab.name, path.display()),
        );
        Ok(())
    }

    fn save_session(&mut self) -> Result<()> {
        let snapshot = SessionSnapshot::capture(self.playground.source(), self.playground.target());
        self.session_store.save(&snapshot)?;
        if let Some(file) = &self.file {
            fs::write(file, self.playground.source())
                .with_context(|| format!("failed to write windfile {}", file.display()))?;
        }
        self.set_status(StatusLevel::Success, "Session saved");
        Ok(())
    }

    /// Run an action, turning its error into a status message.
    fn report(&mut self, action: impl FnOnce(&mut Self) -> Result<()>) {
        if let Err(err) = action(self) {
            tracing::debug!(error = %format!("{err:#}"), "command failed");
            self.set_status(StatusLevel::Error, format!("{err:#}"));
        }
    }

    fn set_status<S: Into<String>>(&mut self, level: StatusLevel, message: S) {
        self.status = Some(StatusMessage::new(level, message.into()));
    }
}

/// File name used by `write` when no path is given.
fn output_file_name(target: GenerationTarget) -> &'static str {
    match target {
        GenerationTarget::Cli => "generated.sh",
        GenerationTarget::Bamboo => "bamboo-specs.yaml",
        GenerationTarget::Jenkins => "Jenkinsfile",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTarget {
    Editor,
    Output,
}

impl FocusTarget {
    fn toggled(self) -> Self {
        match self {
            FocusTarget::Editor => FocusTarget::Output,
            FocusTarget::Output => FocusTarget::Editor,
        }
    }
}

#[derive(Debug)]
struct StatusMessage {
    level: StatusLevel,
    text: String,
    expires_at: Instant,
}

impl StatusMessage {
    fn new(level: StatusLevel, text: String) -> Self {
        Self {
            level,
            text,
            expires_at: Instant::now() + Duration::from_secs(4),
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusLevel {
    Info,
    Success,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use ratatui::backend::TestBackend;

    use crate::infra::generation::GenerationError;

    struct EchoService;

    #[async_trait]
    impl GenerationService for EchoService {
        async fn generate(
            &self,
            target: GenerationTarget,
            windfile: &str,
        ) -> Result<Option<String>, GenerationError> {
            Ok(Some(format!(
                "# {target}\n# {} lines\n",
                windfile.lines().count()
            )))
        }
    }

    fn app_in(dir: &std::path::Path, file: Option<PathBuf>) -> UiApp {
        let setup = PlaygroundSetup {
            document: DEFAULT_WINDFILE.to_string(),
            target: GenerationTarget::Cli,
            theme: "base16-ocean.dark".into(),
            endpoint: Endpoint::new(DeploymentMode::Development, "http://127.0.0.1:8000"),
            file,
            session_store: SessionStore::new(dir),
        };
        let validator = SchemaValidator::embedded().expect("embedded schema compiles");
        UiApp::new(setup, validator, Arc::new(EchoService))
    }

    async fn settle(app: &mut UiApp) {
        while app.playground.state() == CoordinatorState::Requesting {
            let response = app.responses.recv().await.expect("dispatcher alive");
            app.handle_response(response);
        }
    }

    fn press(app: &mut UiApp, code: KeyCode) {
        app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn ctrl(app: &mut UiApp, ch: char) {
        app.handle_key_event(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL));
    }

    fn run_command(app: &mut UiApp, command: &str) {
        ctrl(app, 'p');
        for ch in command.chars() {
            press(app, KeyCode::Char(ch));
        }
        press(app, KeyCode::Enter);
    }

    #[tokio::test]
    async fn startup_generates_for_the_initial_document() {
        let temp = tempfile::tempdir().unwrap();
        let mut app = app_in(temp.path(), None);
        assert_eq!(app.playground.state(), CoordinatorState::Requesting);

        settle(&mut app).await;
        assert_eq!(app.playground.state(), CoordinatorState::Idle);
        assert!(app.playground.result().unwrap().starts_with("# cli"));
    }

    #[tokio::test]
    async fn invalid_edit_blocks_and_undo_regenerates_once() {
        let temp = tempfile::tempdir().unwrap();
        let mut app = app_in(temp.path(), None);
        settle(&mut app).await;

        press(&mut app, KeyCode::Char('['));
        assert_eq!(app.playground.state(), CoordinatorState::Blocked);
        assert!(!app.playground.markers().is_empty());

        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.playground.state(), CoordinatorState::Requesting);
        settle(&mut app).await;
        assert!(app.playground.markers().is_empty());
        assert!(app.playground.result().is_some());
    }

    #[tokio::test]
    async fn function_keys_and_palette_switch_targets() {
        let temp = tempfile::tempdir().unwrap();
        let mut app = app_in(temp.path(), None);
        settle(&mut app).await;

        press(&mut app, KeyCode::F(3));
        assert_eq!(app.playground.target(), GenerationTarget::Jenkins);
        settle(&mut app).await;
        assert!(app.playground.result().unwrap().starts_with("# jenkins"));

        run_command(&mut app, "target bamboo");
        assert_eq!(app.playground.target(), GenerationTarget::Bamboo);
        settle(&mut app).await;
        assert!(app.playground.result().unwrap().starts_with("# bamboo"));

        app.focus = FocusTarget::Output;
        press(&mut app, KeyCode::Right);
        assert_eq!(app.playground.target(), GenerationTarget::Jenkins);
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.playground.target(), GenerationTarget::Cli);
    }

    #[tokio::test]
    async fn save_writes_session_and_file() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("windfile.yaml");
        let mut app = app_in(temp.path(), Some(file.clone()));
        press(&mut app, KeyCode::Char('#'));

        ctrl(&mut app, 's');
        let snapshot = app.session_store.load().unwrap().expect("session saved");
        assert!(snapshot.document.starts_with("#api"));
        assert_eq!(fs::read_to_string(&file).unwrap(), snapshot.document);
        assert_eq!(app.status.as_ref().unwrap().level, StatusLevel::Success);
    }

    #[tokio::test]
    async fn write_requires_generated_output() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("out/generated.sh");
        let mut app = app_in(temp.path(), None);

        run_command(&mut app, &format!("write {}", target.display()));
        assert_eq!(app.status.as_ref().unwrap().level, StatusLevel::Error);
        assert!(!target.exists());

        settle(&mut app).await;
        run_command(&mut app, &format!("write {}", target.display()));
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            app.playground.result().unwrap()
        );
    }

    #[tokio::test]
    async fn unknown_command_reports_error() {
        let temp = tempfile::tempdir().unwrap();
        let mut app = app_in(temp.path(), None);
        run_command(&mut app, "deploy now");
        let status = app.status.as_ref().unwrap();
        assert_eq!(status.level, StatusLevel::Error);
        assert!(status.text.contains("deploy"));
        assert!(!app.palette_state.is_open());
    }

    #[tokio::test]
    async fn status_line_shows_state_and_endpoint() {
        let temp = tempfile::tempdir().unwrap();
        let mut app = app_in(temp.path(), None);
        settle(&mut app).await;

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let status: String = (0..120)
            .map(|x| buffer.get(x, 29).symbol().to_string())
            .collect();
        assert!(status.contains("idle"), "status was {status:?}");
        assert!(status.contains("development · http://127.0.0.1:8000"));
    }
}
