use anyhow::{bail, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::buffer::Buffer;
use ratatui::prelude::*;
use std::io::{self, stdout};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::clock::FrameClock;
use super::RunOptions;
use crate::audio::{self, AudioFrame};
use crate::config::Config;
use crate::input::{self, Flow};
use crate::ipc::{self, IpcMessage};
use crate::renderer::Canvas;
use crate::visualizer::{VisualizerMode, VisualizerState};

const OVERLAY_FG: Color = Color::Rgb(200, 200, 200);
const PAUSED_FG: Color = Color::Rgb(255, 100, 100);

pub async fn run(config: Config, options: RunOptions) -> Result<()> {
    // Open the audio source before touching the terminal so connection
    // errors are printed normally
    let (_audio_capture, audio_rx) = audio::create_audio_pipeline(&config, options.demo)?;

    let (ipc_tx, ipc_rx) = mpsc::channel(16);
    let socket = ipc::socket_path();
    let ipc_task = if config.ipc.enabled {
        let path = socket.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = ipc::start_server(&path, ipc_tx).await {
                warn!("IPC server stopped: {:#}", e);
            }
        }))
    } else {
        None
    };

    let result = run_terminal(&config, &options, audio_rx, ipc_rx).await;
    stop_ipc(ipc_task, &socket);
    result
}

/// Abort the IPC server and remove its socket file
fn stop_ipc(task: Option<JoinHandle<()>>, socket: &Path) {
    if let Some(task) = task {
        task.abort();
        let _ = std::fs::remove_file(socket);
    }
}

/// Own the terminal for the lifetime of the render loop. The terminal is
/// restored even when the loop fails.
async fn run_terminal(
    config: &Config,
    options: &RunOptions,
    audio_rx: watch::Receiver<Arc<AudioFrame>>,
    ipc_rx: mpsc::Receiver<IpcMessage>,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }

    let result = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(mut terminal) => {
            let result = match terminal.clear() {
                Ok(()) => run_app(&mut terminal, config, options, audio_rx, ipc_rx).await,
                Err(e) => Err(e.into()),
            };
            let _ = terminal.show_cursor();
            result
        }
        Err(e) => Err(e.into()),
    };

    let restored = restore_terminal();
    result.and(restored)
}

fn restore_terminal() -> Result<()> {
    let raw = disable_raw_mode();
    let screen = execute!(io::stdout(), LeaveAlternateScreen);
    raw?;
    screen?;
    Ok(())
}

/// Tracks the newest audio frame and keeps the canvas in step with it
struct FrameSync {
    audio_rx: watch::Receiver<Arc<AudioFrame>>,
    last_frame: Arc<AudioFrame>,
    needs_render: bool,
}

impl FrameSync {
    fn new(audio_rx: watch::Receiver<Arc<AudioFrame>>) -> Self {
        let last_frame = audio_rx.borrow().clone();
        Self {
            audio_rx,
            last_frame,
            needs_render: true,
        }
    }

    /// Fit the canvas to `cols` x `rows` cells, step the state on a new
    /// frame unless paused, and re-render when anything changed. Returns
    /// whether the canvas was redrawn. Fails once the capture side is gone.
    fn update(
        &mut self,
        state: &mut VisualizerState,
        canvas: &mut Canvas,
        cols: u16,
        rows: u16,
    ) -> Result<bool> {
        // Two pixels per cell row
        if canvas.resize(cols as usize, rows as usize * 2) {
            self.needs_render = true;
        }

        match self.audio_rx.has_changed() {
            Ok(true) if !state.is_paused() => {
                self.last_frame = self.audio_rx.borrow_and_update().clone();
                state.step(&self.last_frame, canvas.width, canvas.height);
                self.needs_render = true;
            }
            Ok(_) => {}
            Err(_) => bail!("Audio capture stopped"),
        }

        if !self.needs_render {
            return Ok(false);
        }
        state.render(canvas, &self.last_frame);
        self.needs_render = false;
        Ok(true)
    }
}

/// Apply every queued remote command. Returns true when one asked to quit.
fn drain_remote(
    ipc_rx: &mut mpsc::Receiver<IpcMessage>,
    state: &mut VisualizerState,
    options: &RunOptions,
) -> bool {
    while let Ok(message) = ipc_rx.try_recv() {
        match ipc::process_message(message, state) {
            Flow::Exit => return true,
            Flow::Save => save_mode(options, state.mode()),
            Flow::Continue => {}
        }
    }
    false
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &Config,
    options: &RunOptions,
    audio_rx: watch::Receiver<Arc<AudioFrame>>,
    mut ipc_rx: mpsc::Receiver<IpcMessage>,
) -> Result<()> {
    let mut state = VisualizerState::new(&config.visualizer, config.display.start_mode);
    let mut clock = FrameClock::new(config.display.fps);
    let mut canvas = Canvas::new(0, 0);
    let mut sync = FrameSync::new(audio_rx);

    info!("Render loop started at {} fps in mode {}", config.display.fps, state.mode());

    loop {
        if drain_remote(&mut ipc_rx, &mut state, options) {
            return Ok(());
        }

        let size = terminal.size()?;
        sync.update(&mut state, &mut canvas, size.width, size.height)?;

        let fps = clock.fps();
        terminal.draw(|frame| {
            let area = frame.area();
            let buf = frame.buffer_mut();
            blit_canvas(buf, area, &canvas);
            if config.display.show_overlay {
                render_status(buf, area, state.mode(), fps);
            }
            if state.is_paused() {
                render_paused(buf, area);
            }
        })?;

        // Handle input for whatever is left of the frame budget
        loop {
            let remaining = clock.remaining();
            if !event::poll(remaining)? {
                break;
            }
            if let Event::Key(key) = event::read()? {
                if let Some(command) = input::map_key(key) {
                    match input::apply(&mut state, command) {
                        Flow::Exit => return Ok(()),
                        Flow::Save => save_mode(options, state.mode()),
                        Flow::Continue => {}
                    }
                }
            }
            if remaining.is_zero() {
                break;
            }
        }

        clock.tick();
    }
}

fn save_mode(options: &RunOptions, mode: VisualizerMode) {
    let Some(path) = options.config_path.clone().or_else(Config::default_path) else {
        warn!("No config path available, mode not saved");
        return;
    };
    match Config::persist_start_mode(&path, mode) {
        Ok(()) => info!("Saved start mode {} to {}", mode, path.display()),
        Err(e) => warn!("Failed to save start mode: {:#}", e),
    }
}

/// Copy the canvas into the cell buffer, two pixels per cell: the upper
/// half block takes the top pixel as foreground and the bottom pixel as
/// background.
fn blit_canvas(buf: &mut Buffer, area: Rect, canvas: &Canvas) {
    for row in 0..area.height {
        for col in 0..area.width {
            let x = col as usize;
            let y = row as usize * 2;
            let (tr, tg, tb) = canvas.get_pixel(x, y);
            let (br, bg, bb) = canvas.get_pixel(x, y + 1);

            if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                cell.set_char('▀');
                cell.set_fg(Color::Rgb(tr, tg, tb));
                cell.set_bg(Color::Rgb(br, bg, bb));
            }
        }
    }
}

/// Write `text` starting at (x, y), clipped to the area
fn put_text(buf: &mut Buffer, area: Rect, x: u16, y: u16, text: &str, style: Style) {
    for (i, ch) in text.chars().enumerate() {
        let cx = x.saturating_add(i as u16);
        if cx >= area.x + area.width || y >= area.y + area.height {
            break;
        }
        if let Some(cell) = buf.cell_mut((cx, y)) {
            cell.set_char(ch);
            cell.set_style(style);
        }
    }
}

fn render_status(buf: &mut Buffer, area: Rect, mode: VisualizerMode, fps: f32) {
    let status = format!(" Mode {} | FPS: {} ", mode.number(), fps as u32);
    let style = Style::default().fg(OVERLAY_FG).bg(Color::Black);
    put_text(buf, area, area.x, area.y, &status, style);
}

fn render_paused(buf: &mut Buffer, area: Rect) {
    let text = " PAUSED ";
    let x = area.x + area.width.saturating_sub(text.len() as u16) / 2;
    let y = area.y + area.height / 2;
    let style = Style::default()
        .fg(PAUSED_FG)
        .bg(Color::Black)
        .add_modifier(Modifier::BOLD);
    put_text(buf, area, x, y, text, style);
}
