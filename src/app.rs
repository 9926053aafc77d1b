//! Main application logic and orchestration

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cpal::traits::StreamTrait;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::audio;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::monitor::{self, Monitor, TickReport};
use crate::overlay::SharedOverlay;
use crate::ui;

/// Main application struct
pub struct App {
    config: Config,
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
    session: Option<Session>,
    last_report: TickReport,
    notice: Option<String>,
}

/// A running monitoring session.
///
/// Stop is cooperative: clearing `active` is observed by the monitoring task
/// at its next iteration, which then hides the overlays and discards the
/// sample window before exiting.
struct Session {
    device_name: String,
    active: Arc<AtomicBool>,
    overlay: SharedOverlay,
    status: watch::Receiver<TickReport>,
    task: JoinHandle<()>,
    // Keeps the capture stream alive for the session's duration
    _stream: cpal::Stream,
}

impl Session {
    fn running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Request shutdown and wait for the monitoring task to finish cleanup
    async fn stop(self) {
        self.active.store(false, Ordering::SeqCst);
        let _ = self.task.await;
    }
}

/// Exit codes for the application
#[derive(Debug, Clone, Copy)]
pub enum ExitCode {
    Success = 0,
    UserExit = 1, // User pressed Ctrl+C
    Error = 2,    // Actual application error
}

pub type AppRunResult = Result<(), AppError>;

/// Extended result that tracks exit reason
pub struct RunResult {
    pub result: AppRunResult,
    pub exit_code: ExitCode,
}

impl App {
    /// Initialize the application with configuration
    pub fn new_with_config(config: Config) -> AppResult<Self> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(App {
            config,
            terminal,
            session: None,
            last_report: TickReport::idle(),
            notice: None,
        })
    }

    /// Start a monitoring session from the current configuration
    fn start_session(&mut self) -> AppResult<Session> {
        let (device, audio_config) = audio::setup_audio_device(self.config.device_name.clone())?;
        let device_name = audio_config.device_name.clone();

        // Persist the merged settings on start, recording the resolved device
        if let Err(e) = self
            .config
            .to_settings(Some(device_name.clone()))
            .save(&self.config.settings_path)
        {
            log::warn!("could not save settings: {}", e);
        }

        let (source, stream) = audio::start_capture(&device, &audio_config)?;
        stream.play()?;

        let active = Arc::new(AtomicBool::new(true));
        let overlay = SharedOverlay::new();
        let (status_tx, status_rx) = watch::channel(TickReport::idle());
        let session_monitor = Monitor::new(self.config.monitor_config(), overlay.clone());
        let task = tokio::spawn(monitor::run(
            session_monitor,
            source,
            Arc::clone(&active),
            status_tx,
        ));

        Ok(Session {
            device_name,
            active,
            overlay,
            status: status_rx,
            task,
            _stream: stream,
        })
    }

    /// Run the main application loop
    pub async fn run(mut self) -> RunResult {
        // Monitoring starts right away; it can be stopped and restarted from
        // the keyboard without leaving the app
        match self.start_session() {
            Ok(session) => self.session = Some(session),
            Err(e) => return self.fail(e),
        }

        let mut interval = tokio::time::interval(Duration::from_millis(
            crate::constants::ui::UPDATE_INTERVAL_MS,
        ));
        let mut exit_reason = ExitCode::Success;

        loop {
            // Reap a session that ended on its own (device disconnect),
            // keeping its final notice on screen
            let session_ended = self
                .session
                .as_ref()
                .is_some_and(|s| !s.running() && s.task.is_finished());
            if session_ended && let Some(session) = self.session.take() {
                self.last_report = session.status.borrow().clone();
            }

            if let Some(session) = &self.session {
                self.last_report = session.status.borrow().clone();
            }

            let ui_state = ui::UiState {
                device_name: self
                    .session
                    .as_ref()
                    .map(|s| s.device_name.clone())
                    .or_else(|| self.config.device_name.clone())
                    .unwrap_or_else(|| "(default input device)".to_string()),
                status: self
                    .notice
                    .clone()
                    .unwrap_or_else(|| self.last_report.message.clone()),
                level: self.last_report.level,
                warning_level: self.config.warning_level,
                alarm_level: self.config.alarm_level,
                running: self.session.is_some(),
                overlay: self.session.as_ref().and_then(|s| s.overlay.current()),
            };

            if let Err(e) = self.terminal.draw(|f| ui::render_ui(f, &ui_state)) {
                return self.fail(e.into());
            }

            // Check for keyboard events and signals
            let mut should_exit = false;

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    should_exit = true;
                    exit_reason = ExitCode::UserExit;
                }
                _ = tokio::time::sleep(Duration::from_millis(1)) => {
                    // Timeout - check for keyboard events
                }
            }

            if !should_exit
                && crossterm::event::poll(Duration::from_millis(0)).unwrap_or(false)
                && let Ok(Event::Key(key_event)) = crossterm::event::read()
            {
                match key_event.code {
                    KeyCode::Esc | KeyCode::Char('q') => {
                        should_exit = true;
                    }
                    KeyCode::Char('c')
                        if key_event
                            .modifiers
                            .contains(crossterm::event::KeyModifiers::CONTROL) =>
                    {
                        should_exit = true;
                        exit_reason = ExitCode::UserExit;
                    }
                    // Start is only accepted while idle, stop while running;
                    // the control surface serializes session transitions
                    KeyCode::Char('s') if self.session.is_none() => {
                        match self.start_session() {
                            Ok(session) => {
                                self.notice = None;
                                self.session = Some(session);
                            }
                            Err(e) => self.notice = Some(e.to_string()),
                        }
                    }
                    KeyCode::Char('x') if self.session.is_some() => {
                        if let Some(session) = self.session.take() {
                            session.stop().await;
                        }
                        self.last_report = TickReport::idle();
                        self.notice = None;
                    }
                    _ => {}
                }
            }

            if should_exit {
                break;
            }

            interval.tick().await;
        }

        // Stop any running session before tearing down the terminal
        if let Some(session) = self.session.take() {
            session.stop().await;
        }
        let _ = self.cleanup(); // Ignore cleanup errors

        RunResult {
            result: Ok(()),
            exit_code: exit_reason,
        }
    }

    fn fail(self, err: AppError) -> RunResult {
        let _ = self.cleanup();
        RunResult {
            result: Err(err),
            exit_code: ExitCode::Error,
        }
    }

    /// Clean up terminal state
    fn cleanup(mut self) -> AppResult<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}
