//! Delivery of rendered sections as HTML mail.

use std::cell::Cell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::{AppError, Result};

pub trait Mailer {
    fn send(&self, from: &str, to: &str, subject: &str, html: &str) -> Result<()>;
}

/// RFC 2047 encoded-word, so non-ASCII captions survive in the subject
pub fn encode_subject(subject: &str) -> String {
    format!("=?UTF-8?B?{}?=", STANDARD.encode(subject))
}

pub fn compose_message(from: &str, to: &str, subject: &str, html: &str) -> String {
    format!(
        "From: {}\nTo: {}\nSubject: {}\nMIME-Version: 1.0\nContent-Type: text/html; charset=UTF-8\n\n{}\n",
        from,
        to,
        encode_subject(subject),
        html
    )
}

/// Hands messages to a local `sendmail` compatible program
pub struct SendmailMailer {
    program: PathBuf,
}

impl SendmailMailer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Mailer for SendmailMailer {
    fn send(&self, from: &str, to: &str, subject: &str, html: &str) -> Result<()> {
        let message = compose_message(from, to, subject, html);

        let mut child = Command::new(&self.program)
            .arg("-t")
            .arg(format!("-f{}", from))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AppError::Mail(format!(
                    "failed to spawn {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.as_bytes())
                .map_err(|e| AppError::Mail(format!("failed to write to stdin: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| AppError::Mail(format!("failed to wait for sendmail: {}", e)))?;

        if !output.status.success() {
            return Err(AppError::Mail(format!(
                "cannot send mail to `{}` from `{}`: {} {}",
                to,
                from,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

/// Writes each message as a numbered `.eml` file instead of sending it
pub struct FileMailer {
    dir: PathBuf,
    sent: Cell<usize>,
}

impl FileMailer {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| AppError::WriteFile {
            path: dir.display().to_string(),
            source: e,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            sent: Cell::new(0),
        })
    }
}

impl Mailer for FileMailer {
    fn send(&self, from: &str, to: &str, subject: &str, html: &str) -> Result<()> {
        let index = self.sent.get() + 1;
        let path = self.dir.join(format!("{:03}-{}.eml", index, slug(subject)));

        fs::write(&path, compose_message(from, to, subject, html)).map_err(|e| {
            AppError::WriteFile {
                path: path.display().to_string(),
                source: e,
            }
        })?;

        self.sent.set(index);
        Ok(())
    }
}

fn slug(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

/// Send every `(subject, html)` document. A failed delivery is logged and
/// the remaining documents are still sent.
pub fn deliver_all<M: Mailer + ?Sized>(
    mailer: &M,
    from: &str,
    to: &str,
    documents: &[(String, String)],
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for (subject, html) in documents {
        match mailer.send(from, to, subject, html) {
            Ok(()) => {
                tracing::info!(subject = %subject, to, "sent history mail");
                report.sent += 1;
            }
            Err(e) => {
                tracing::warn!(subject = %subject, to, error = %e, "failed to send history mail");
                report.failed += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::tempdir;

    struct RecordingMailer {
        fail_on: Option<String>,
        sent: RefCell<Vec<String>>,
    }

    impl Mailer for RecordingMailer {
        fn send(&self, _from: &str, _to: &str, subject: &str, _html: &str) -> Result<()> {
            if self.fail_on.as_deref() == Some(subject) {
                return Err(AppError::Mail("refused".to_string()));
            }
            self.sent.borrow_mut().push(subject.to_string());
            Ok(())
        }
    }

    fn documents(subjects: &[&str]) -> Vec<(String, String)> {
        subjects
            .iter()
            .map(|s| (s.to_string(), format!("<h1>{}</h1>", s)))
            .collect()
    }

    #[test]
    fn test_encode_subject() {
        assert_eq!(encode_subject("hello"), "=?UTF-8?B?aGVsbG8=?=");
    }

    #[test]
    fn test_compose_message_headers() {
        let message = compose_message("bot@example.com", "me@example.com", "hi", "<p>x</p>");

        assert!(message.starts_with("From: bot@example.com\nTo: me@example.com\n"));
        assert!(message.contains("Subject: =?UTF-8?B?aGk=?=\n"));
        assert!(message.contains("Content-Type: text/html; charset=UTF-8\n\n<p>x</p>"));
    }

    #[test]
    fn test_slug() {
        assert_eq!(
            slug("History for slack channel general (2024-01-01)"),
            "history-for-slack-channel-general-2024-01-01"
        );
    }

    #[test]
    fn test_deliver_all_continues_after_failure() {
        let mailer = RecordingMailer {
            fail_on: Some("b".to_string()),
            sent: RefCell::new(Vec::new()),
        };

        let report = deliver_all(&mailer, "from@x", "to@x", &documents(&["a", "b", "c"]));

        assert_eq!(report, DeliveryReport { sent: 2, failed: 1 });
        assert_eq!(*mailer.sent.borrow(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_file_mailer_writes_numbered_files() {
        let dir = tempdir().unwrap();
        let mailer = FileMailer::new(&dir.path().join("out")).unwrap();

        let report = deliver_all(&mailer, "from@x", "to@x", &documents(&["first one", "second"]));

        assert_eq!(report.sent, 2);
        let first = fs::read_to_string(dir.path().join("out/001-first-one.eml")).unwrap();
        assert!(first.contains("<h1>first one</h1>"));
        assert!(dir.path().join("out/002-second.eml").exists());
    }

    #[test]
    fn test_sendmail_missing_program_is_mail_error() {
        let mailer = SendmailMailer::new("/nonexistent/sendmail");

        let result = mailer.send("from@x", "to@x", "s", "<p></p>");

        assert!(matches!(result, Err(AppError::Mail(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_sendmail_receives_message_on_stdin() {
        let dir = tempdir().unwrap();
        let captured = dir.path().join("captured.eml");
        let script = dir.path().join("fake-sendmail");
        fs::write(
            &script,
            format!("#!/bin/sh\ncat > {}\n", captured.display()),
        )
        .unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        }

        SendmailMailer::new(&script)
            .send("from@x", "to@x", "subject", "<p>body</p>")
            .unwrap();

        let message = fs::read_to_string(&captured).unwrap();
        assert!(message.contains("To: to@x"));
        assert!(message.ends_with("<p>body</p>\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_sendmail_failure_status() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("failing-sendmail");
        fs::write(&script, "#!/bin/sh\ncat > /dev/null\necho boom >&2\nexit 1\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let result = SendmailMailer::new(&script).send("from@x", "to@x", "s", "<p></p>");

        assert!(matches!(result, Err(AppError::Mail(msg)) if msg.contains("boom")));
    }
}
