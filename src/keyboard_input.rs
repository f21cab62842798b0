use crate::error::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Command issued from the keyboard while the live camera is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraCommand {
    /// Take the selfie from the current frame
    Capture,
    /// Close the camera without capturing
    Cancel,
}

impl CameraCommand {
    /// Map a key to a camera command: SPACE captures, ESC or `q` cancels
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char(' ') | KeyCode::Enter => Some(CameraCommand::Capture),
            KeyCode::Esc | KeyCode::Char('q') => Some(CameraCommand::Cancel),
            _ => None,
        }
    }
}

/// Keyboard input handler for the live selfie capture
pub struct KeyboardInputHandler {
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new() -> Self {
        Self {
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input.
    ///
    /// The returned channel yields a single command, then the listener
    /// restores the terminal and exits.
    pub async fn start(&self) -> Result<mpsc::Receiver<CameraCommand>> {
        info!("Starting keyboard input handler - SPACE to capture, ESC to cancel");

        let (tx, rx) = mpsc::channel(1);
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let key_event = match event::read() {
                            Ok(Event::Key(key_event)) => key_event,
                            _ => continue,
                        };

                        // Only handle key press events (not release)
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        match CameraCommand::from_key(key_event.code) {
                            Some(command) => {
                                info!("Camera command from keyboard: {:?}", command);
                                if tx.blocking_send(command).is_err() {
                                    warn!("Camera command receiver dropped");
                                }
                                break;
                            }
                            None => debug!("Key pressed: {:?}", key_event.code),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(rx)
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to clean up and disable raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Ensure raw mode is disabled even if the task didn't clean up properly
        let _ = disable_raw_mode();

        Ok(())
    }
}

impl Default for KeyboardInputHandler {
    fn default() -> Self {
        Self::new()
    }
}
