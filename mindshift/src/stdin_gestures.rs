use mindplayer::{GestureBus, GestureKind};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Forwards every line typed on stdin to `bus` as a key press
pub fn spawn_stdin_gestures(bus: Arc<GestureBus>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(_)) => {
                    debug!("Key press on stdin");
                    bus.dispatch(GestureKind::KeyDown);
                }
                Ok(None) => {
                    debug!("stdin closed, no more gestures");
                    break;
                }
                Err(e) => {
                    warn!("Cannot read stdin: {}", e);
                    break;
                }
            }
        }
    })
}
