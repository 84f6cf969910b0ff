//! Audio backend driving an external player program
//!
//! Each [`ProcessHandle`] runs one child process per playback. Pausing kills
//! the child, a non-zero exit is reported as [`MediaEvent::Error`] and
//! `reload` restarts the child on the current source.

use crate::error::{PlayerError, Result};
use crate::handle::{AudioBackend, HandleSpec, MediaEvent, PlaybackHandle};
use crate::listeners::{Listener, ListenerId, Listeners};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub const DEFAULT_PLAYER_PROGRAM: &str = "mpv";

pub const DEFAULT_PLAYER_ARGS: &[&str] = &[
    "--no-video",
    "--really-quiet",
    "--loop-file={loop}",
    "--volume={volume}",
    "{url}",
];

/// Player program and its arguments
///
/// Arguments may contain `{url}`, `{volume}` (0-100) and `{loop}`
/// (`inf` or `no`) placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ProcessCommand {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYER_PROGRAM, DEFAULT_PLAYER_ARGS.iter().copied())
    }
}

impl ProcessCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Arguments with placeholders substituted for `spec`
    pub fn render(&self, spec: &HandleSpec) -> Vec<String> {
        let volume = spec.volume_percent().to_string();
        let looping = if spec.looping { "inf" } else { "no" };
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{url}", &spec.url)
                    .replace("{volume}", &volume)
                    .replace("{loop}", looping)
            })
            .collect()
    }
}

/// [`AudioBackend`] spawning a [`ProcessCommand`] per handle
#[derive(Debug, Clone, Default)]
pub struct ProcessBackend {
    command: ProcessCommand,
}

impl ProcessBackend {
    pub fn new(command: ProcessCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &ProcessCommand {
        &self.command
    }
}

impl AudioBackend for ProcessBackend {
    fn create(&self, spec: HandleSpec) -> Result<Arc<dyn PlaybackHandle>> {
        debug!(program = %self.command.program, url = %spec.url, "Creating process handle");
        Ok(Arc::new(ProcessHandle::new(self.command.clone(), spec)))
    }
}

struct Running {
    generation: u64,
    stop: oneshot::Sender<()>,
}

struct Shared {
    command: ProcessCommand,
    spec: Mutex<HandleSpec>,
    running: Mutex<Option<Running>>,
    generation: AtomicU64,
    listeners: Listeners<MediaEvent>,
}

impl Shared {
    fn start(self: &Arc<Self>) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PlayerError::backend(format!("no async runtime: {e}")))?;

        let spec = self.spec.lock().clone();
        let mut running = self.running.lock();
        if running.is_some() {
            return Ok(());
        }

        let child = Command::new(&self.command.program)
            .args(self.command.render(&spec))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlayerError::Load {
                url: spec.url.clone(),
                reason: format!("cannot run {}: {e}", self.command.program),
            })?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (stop, stop_rx) = oneshot::channel();
        *running = Some(Running { generation, stop });
        drop(running);

        debug!(generation, pid = ?child.id(), url = %spec.url, "Player process started");
        runtime.spawn(Arc::clone(self).supervise(child, generation, stop_rx));
        self.listeners.emit(&MediaEvent::Play);
        Ok(())
    }

    async fn supervise(self: Arc<Self>, mut child: Child, generation: u64, stop: oneshot::Receiver<()>) {
        tokio::select! {
            status = child.wait() => {
                self.forget(generation);
                match status {
                    Ok(status) if status.success() => {
                        debug!(generation, "Player process ended");
                        self.listeners.emit(&MediaEvent::Pause);
                    }
                    Ok(status) => {
                        self.listeners
                            .emit(&MediaEvent::Error(format!("player exited with {status}")));
                    }
                    Err(e) => self.listeners.emit(&MediaEvent::Error(e.to_string())),
                }
            }
            _ = stop => {
                if let Err(e) = child.kill().await {
                    warn!(generation, "Cannot kill player process: {}", e);
                }
            }
        }
    }

    /// Clears the running slot if it still belongs to `generation`
    fn forget(&self, generation: u64) {
        let mut running = self.running.lock();
        if running.as_ref().map(|r| r.generation) == Some(generation) {
            *running = None;
        }
    }

    /// Returns true when a child was running
    fn stop(&self) -> bool {
        match self.running.lock().take() {
            Some(running) => {
                let _ = running.stop.send(());
                true
            }
            None => false,
        }
    }
}

/// Playback handle backed by a child process
pub struct ProcessHandle {
    shared: Arc<Shared>,
}

impl ProcessHandle {
    pub fn new(command: ProcessCommand, spec: HandleSpec) -> Self {
        Self {
            shared: Arc::new(Shared {
                command,
                spec: Mutex::new(spec),
                running: Mutex::new(None),
                generation: AtomicU64::new(0),
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.lock().is_some()
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

#[async_trait]
impl PlaybackHandle for ProcessHandle {
    fn source(&self) -> String {
        self.shared.spec.lock().url.clone()
    }

    async fn play(&self) -> Result<()> {
        self.shared.start()
    }

    fn pause(&self) {
        if self.shared.stop() {
            self.shared.listeners.emit(&MediaEvent::Pause);
        }
    }

    fn set_source(&self, url: &str) {
        self.shared.spec.lock().url = url.to_string();
    }

    fn reload(&self) {
        self.shared.stop();
        if let Err(e) = self.shared.start() {
            self.shared.listeners.emit(&MediaEvent::Error(e.to_string()));
        }
    }

    fn add_listener(&self, listener: Listener<MediaEvent>) -> ListenerId {
        self.shared.listeners.register(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.shared.listeners.unregister(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_placeholders() {
        let command = ProcessCommand::default();
        let args = command.render(&HandleSpec::background("/sounds/bg.mp3"));
        assert_eq!(
            args,
            vec![
                "--no-video",
                "--really-quiet",
                "--loop-file=inf",
                "--volume=30",
                "/sounds/bg.mp3",
            ]
        );
    }

    #[test]
    fn test_render_without_loop() {
        let command = ProcessCommand::new("play", ["{url}", "repeat={loop}"]);
        let mut spec = HandleSpec::background("a.mp3");
        spec.looping = false;
        assert_eq!(command.render(&spec), vec!["a.mp3", "repeat=no"]);
    }
}
