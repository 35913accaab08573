//! Mail notifications for operators.

use crate::config::{NotifyConfig, ToolEnv};
use crate::error::{Error, Result};
use crate::tools::{Invocation, Stdin, ToolRunner};
use log::{info, warn};
use std::sync::Arc;

/// True when a count falling from `pre` to `post` passes one of `thresholds`.
pub fn threshold_crossed(pre: usize, post: usize, thresholds: &[usize]) -> bool {
    thresholds.iter().any(|&th| pre > th && post <= th)
}

pub trait Notifier: Send + Sync {
    fn send(&self, subject: &str, body: &str) -> Result<()>;
}

/// Hands messages to the local MTA through `sendmail -t`.
pub struct SendmailNotifier {
    runner: Arc<dyn ToolRunner>,
    config: NotifyConfig,
    site_id: String,
}

impl SendmailNotifier {
    pub fn new(config: &NotifyConfig, site_id: &str, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner,
            config: config.clone(),
            site_id: site_id.to_string(),
        }
    }

    fn message(&self, subject: &str, body: &str) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\n\n{}",
            self.config.from,
            self.config.to.join(", "),
            subject,
            body
        )
    }
}

impl Notifier for SendmailNotifier {
    fn send(&self, subject: &str, body: &str) -> Result<()> {
        if self.config.to.is_empty() {
            warn!("No notification recipients configured, dropping '{}'", subject);
            return Ok(());
        }

        let mut env = ToolEnv::new();
        env.set("WWPDB_SITE_ID", &self.site_id);
        let inv = Invocation::new(&self.config.sendmail_program, std::env::temp_dir())
            .arg("-t")
            .env(env)
            .stdin(Stdin::Bytes(self.message(subject, body).into_bytes()));

        let output = self.runner.run(&inv)?;
        if !output.success {
            return Err(Error::Notify(output.text()));
        }
        info!("Sent notification '{}' to {}", subject, self.config.to.join(", "));
        Ok(())
    }
}
