use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::input::{self, Command, Flow};
use crate::visualizer::{VisualizerMode, VisualizerState};

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0}")]
    BadMode(String),
}

/// A parsed request line
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Control(Command),
    Status,
    ListModes,
    Ping,
}

/// Request plus the channel its answer goes back on
pub struct IpcMessage {
    pub request: Request,
    pub reply: oneshot::Sender<String>,
}

/// Get the socket path for IPC
pub fn socket_path() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(dir).join("micviz.sock")
    } else {
        PathBuf::from("/tmp/micviz.sock")
    }
}

/// Parse one protocol line
pub fn parse_request(line: &str) -> Result<Request, ProtocolError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let request = match parts.as_slice() {
        [] => return Err(ProtocolError::Empty),
        ["mode", "next"] => Request::Control(Command::NextMode),
        ["mode", "prev"] => Request::Control(Command::PrevMode),
        ["mode", value] => {
            let mode = value.parse::<VisualizerMode>().map_err(ProtocolError::BadMode)?;
            Request::Control(Command::SelectMode(mode))
        }
        ["pause"] => Request::Control(Command::SetPaused(true)),
        ["resume"] => Request::Control(Command::SetPaused(false)),
        ["toggle"] => Request::Control(Command::TogglePause),
        ["save"] => Request::Control(Command::SaveSettings),
        ["quit"] => Request::Control(Command::Quit),
        ["status"] => Request::Status,
        ["list", "modes"] => Request::ListModes,
        ["ping"] => Request::Ping,
        _ => return Err(ProtocolError::Unknown(line.trim().to_string())),
    };
    Ok(request)
}

/// Apply a remote request to the render loop state and answer it
pub fn process_message(message: IpcMessage, state: &mut VisualizerState) -> Flow {
    let (flow, response) = match message.request {
        Request::Control(command) => {
            let flow = input::apply(state, command);
            (flow, format!("ok: {}", describe(state)))
        }
        Request::Status => (Flow::Continue, format!("ok: {}", describe(state))),
        Request::ListModes => {
            let names: Vec<String> = VisualizerMode::all()
                .iter()
                .map(|m| format!("{}={}", m.number(), m.key()))
                .collect();
            (Flow::Continue, format!("ok: {}", names.join(",")))
        }
        Request::Ping => (Flow::Continue, "ok: pong".to_string()),
    };

    let _ = message.reply.send(response);
    flow
}

fn describe(state: &VisualizerState) -> String {
    format!(
        "mode={} name=\"{}\" paused={} bass={:.1}",
        state.mode().number(),
        state.mode().name(),
        state.is_paused(),
        state.bass_energy()
    )
}

/// Handle a single client connection
async fn handle_client(stream: UnixStream, cmd_tx: mpsc::Sender<IpcMessage>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut buf_reader = BufReader::new(reader);
    let mut line = String::new();
    buf_reader.read_line(&mut line).await?;

    let request = match parse_request(&line) {
        Ok(request) => request,
        Err(ProtocolError::Empty) => return Ok(()),
        Err(e) => {
            writer.write_all(format!("err: {}\n", e).as_bytes()).await?;
            return Ok(());
        }
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    cmd_tx
        .send(IpcMessage {
            request,
            reply: reply_tx,
        })
        .await
        .map_err(|_| anyhow::anyhow!("Render loop has shut down"))?;

    let response = reply_rx
        .await
        .unwrap_or_else(|_| "err: internal error".to_string());

    writer.write_all(format!("{}\n", response).as_bytes()).await?;
    Ok(())
}

/// Start the IPC server, listening for commands on a Unix socket
pub async fn start_server(path: &Path, cmd_tx: mpsc::Sender<IpcMessage>) -> Result<()> {
    // Remove stale socket from previous run
    let _ = std::fs::remove_file(path);

    let listener = UnixListener::bind(path).context("Failed to bind IPC socket")?;

    info!("IPC server listening on {}", path.display());

    loop {
        let (stream, _) = listener.accept().await?;
        let cmd_tx = cmd_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, cmd_tx).await {
                debug!("IPC client error: {}", e);
            }
        });
    }
}

/// Send a command to a running instance (client mode)
pub async fn send_command(path: &Path, line: &str) -> Result<String> {
    let stream = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        UnixStream::connect(path),
    )
    .await
    .context("Connection timed out")?
    .context("Could not connect to micviz. Is it running?")?;

    let (reader, mut writer) = stream.into_split();

    writer.write_all(format!("{}\n", line).as_bytes()).await?;
    writer.shutdown().await?;

    let mut buf_reader = BufReader::new(reader);
    let mut response = String::new();

    tokio::time::timeout(
        std::time::Duration::from_secs(2),
        buf_reader.read_line(&mut response),
    )
    .await
    .context("Response timed out")?
    .context("Failed to read response")?;

    Ok(response.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisualizerConfig;

    #[test]
    fn parses_mode_requests() {
        assert_eq!(
            parse_request("mode 2\n"),
            Ok(Request::Control(Command::SelectMode(VisualizerMode::Spectrum)))
        );
        assert_eq!(
            parse_request("mode waveform"),
            Ok(Request::Control(Command::SelectMode(VisualizerMode::Waveform)))
        );
        assert_eq!(parse_request("mode next"), Ok(Request::Control(Command::NextMode)));
        assert!(matches!(parse_request("mode 9"), Err(ProtocolError::BadMode(_))));
    }

    #[test]
    fn parses_simple_requests() {
        assert_eq!(parse_request("pause"), Ok(Request::Control(Command::SetPaused(true))));
        assert_eq!(parse_request("  quit "), Ok(Request::Control(Command::Quit)));
        assert_eq!(parse_request("list modes"), Ok(Request::ListModes));
        assert_eq!(parse_request("ping"), Ok(Request::Ping));
        assert_eq!(parse_request(""), Err(ProtocolError::Empty));
        assert_eq!(
            parse_request("dance"),
            Err(ProtocolError::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn process_replies_with_state() {
        let mut state = VisualizerState::new(&VisualizerConfig::default(), VisualizerMode::Circular);
        let (tx, mut rx) = oneshot::channel();
        let flow = process_message(
            IpcMessage {
                request: Request::Control(Command::SelectMode(VisualizerMode::Radial)),
                reply: tx,
            },
            &mut state,
        );
        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            rx.try_recv().unwrap(),
            "ok: mode=4 name=\"Radial Wave Pattern\" paused=false bass=0.0"
        );

        let (tx, mut rx) = oneshot::channel();
        let flow = process_message(
            IpcMessage {
                request: Request::Control(Command::Quit),
                reply: tx,
            },
            &mut state,
        );
        assert_eq!(flow, Flow::Exit);
        assert!(rx.try_recv().unwrap().starts_with("ok:"));
    }

    #[test]
    fn status_reports_bass_energy() {
        let mut state = VisualizerState::new(&VisualizerConfig::default(), VisualizerMode::Spectrum);
        let frame = crate::audio::AudioFrame {
            bass_energy: 123.456,
            ..Default::default()
        };
        state.step(&frame, 160, 90);

        let (tx, mut rx) = oneshot::channel();
        process_message(
            IpcMessage {
                request: Request::Status,
                reply: tx,
            },
            &mut state,
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            "ok: mode=2 name=\"Spectrum Analyzer\" paused=false bass=123.5"
        );
    }

    #[tokio::test]
    async fn round_trip_over_socket() {
        let path = std::env::temp_dir().join(format!("micviz-ipc-{}.sock", std::process::id()));
        let (tx, mut rx) = mpsc::channel(8);

        let server_path = path.clone();
        let server = tokio::spawn(async move { start_server(&server_path, tx).await });

        // Stand-in for the render loop
        let loop_task = tokio::spawn(async move {
            let mut state =
                VisualizerState::new(&VisualizerConfig::default(), VisualizerMode::Circular);
            while let Some(message) = rx.recv().await {
                process_message(message, &mut state);
            }
        });

        let mut response = Err(anyhow::anyhow!("not connected"));
        for _ in 0..50 {
            response = send_command(&path, "list modes").await;
            if response.is_ok() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(
            response.unwrap(),
            "ok: 1=circular,2=spectrum,3=waveform,4=radial,5=particles"
        );

        let err = send_command(&path, "dance").await.unwrap();
        assert_eq!(err, "err: unknown command: dance");

        server.abort();
        loop_task.abort();
        let _ = std::fs::remove_file(&path);
    }
}
