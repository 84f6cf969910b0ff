//! Extension to read the player settings from mindconfig
//!
//! ```yaml
//! player:
//!   command:
//!     program: mpv
//!     args: ["--volume={volume}", "{url}"]
//!   reload:
//!     max_attempts: 3
//!     initial_backoff_ms: 500
//!     healthy_after_secs: 60
//! ```

use crate::player::{
    ReloadPolicy, DEFAULT_RELOAD_ATTEMPTS, DEFAULT_RELOAD_BACKOFF_MS, DEFAULT_RELOAD_HEALTHY_SECS,
};
use crate::process::ProcessCommand;
use anyhow::Result;
use mindconfig::Config;
use serde_yaml::Value;
use std::time::Duration;
use tracing::warn;

pub trait PlayerConfigExt {
    /// Reload budget; missing keys take the defaults
    fn get_reload_policy(&self) -> ReloadPolicy;

    fn set_reload_policy(&self, policy: ReloadPolicy) -> Result<()>;

    /// External player command; the defaults apply to missing parts
    fn get_player_command(&self) -> ProcessCommand;

    fn set_player_command(&self, command: &ProcessCommand) -> Result<()>;
}

impl PlayerConfigExt for Config {
    fn get_reload_policy(&self) -> ReloadPolicy {
        let max_attempts = self.get_u64_or(
            &["player", "reload", "max_attempts"],
            DEFAULT_RELOAD_ATTEMPTS as u64,
        );
        let backoff_ms = self.get_u64_or(
            &["player", "reload", "initial_backoff_ms"],
            DEFAULT_RELOAD_BACKOFF_MS,
        );
        let healthy_secs = self.get_u64_or(
            &["player", "reload", "healthy_after_secs"],
            DEFAULT_RELOAD_HEALTHY_SECS,
        );

        ReloadPolicy {
            max_attempts: u32::try_from(max_attempts).unwrap_or(u32::MAX),
            initial_backoff: Duration::from_millis(backoff_ms),
            healthy_after: Duration::from_secs(healthy_secs),
        }
    }

    fn set_reload_policy(&self, policy: ReloadPolicy) -> Result<()> {
        self.set_u64(&["player", "reload", "max_attempts"], policy.max_attempts as u64)?;
        let backoff_ms = u64::try_from(policy.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        self.set_u64(&["player", "reload", "initial_backoff_ms"], backoff_ms)?;
        self.set_u64(
            &["player", "reload", "healthy_after_secs"],
            policy.healthy_after.as_secs(),
        )
    }

    fn get_player_command(&self) -> ProcessCommand {
        let mut command = ProcessCommand::default();

        if let Some(program) = self.get_string(&["player", "command", "program"]) {
            if !program.trim().is_empty() {
                command.program = program;
            }
        }

        match self.get_value(&["player", "command", "args"]) {
            Ok(Value::Sequence(args)) => {
                command.args = args
                    .into_iter()
                    .filter_map(|arg| match arg {
                        Value::String(s) => Some(s),
                        Value::Number(n) => Some(n.to_string()),
                        other => {
                            warn!(arg = ?other, "Ignoring non-scalar player argument");
                            None
                        }
                    })
                    .collect();
            }
            Ok(Value::Null) | Err(_) => {}
            Ok(other) => warn!(value = ?other, "player.command.args is not a list, using defaults"),
        }

        command
    }

    fn set_player_command(&self, command: &ProcessCommand) -> Result<()> {
        self.set_value(
            &["player", "command", "program"],
            Value::String(command.program.clone()),
        )?;
        self.set_value(
            &["player", "command", "args"],
            Value::Sequence(command.args.iter().cloned().map(Value::String).collect()),
        )
    }
}
