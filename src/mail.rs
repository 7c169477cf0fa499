use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Delivers mail into the log. Stands in for an SMTP relay on single-box installs.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(%recipient, %subject, "outgoing mail");
        debug!(body = %redact_tokens(body), "outgoing mail body");
        Ok(())
    }
}

/// Blanks out the value of every `token=` query parameter.
pub fn redact_tokens(body: &str) -> String {
    lazy_static! {
        static ref TOKEN_RE: Regex = Regex::new(r"token=[^\s&]+").unwrap();
    }
    TOKEN_RE.replace_all(body, "token=[redacted]").into_owned()
}

#[cfg(test)]
pub mod outbox {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentMail {
        pub recipient: String,
        pub subject: String,
        pub body: String,
    }

    #[derive(Default)]
    pub struct OutboxMailer {
        sent: Mutex<Vec<SentMail>>,
    }

    impl OutboxMailer {
        pub fn sent(&self) -> Vec<SentMail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for OutboxMailer {
        async fn send(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(SentMail {
                recipient: recipient.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
            Ok(())
        }
    }

    /// Always fails; used to check that delivery errors reach the caller.
    pub struct BrokenMailer;

    #[async_trait]
    impl Mailer for BrokenMailer {
        async fn send(&self, _recipient: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
            anyhow::bail!("smtp relay unreachable")
        }
    }
}
