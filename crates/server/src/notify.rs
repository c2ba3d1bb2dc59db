//! Outbound notifications.
//!
//! The server only needs "tell this person something happened"; how the
//! message leaves the building is behind the `Mailer` trait. The default
//! implementation writes to the log, which is enough for a self-hosted
//! deployment and for tests.

pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str);
}

pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, to: &str, subject: &str, body: &str) {
        tracing::info!(%to, %subject, "mail: {body}");
    }
}
