//! Email delivery of finished CSV artifacts.
//!
//! The download variant lives with the HTTP handlers; this module covers the
//! mail variant, which consumes the artifact and deletes the file once the
//! message is accepted. If sending fails the file stays on disk for a retry.

use std::fs;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::{error, info};

use crate::batch::CsvArtifact;
use crate::config::SmtpConfig;
use crate::error::DeliveryError;

const SUBJECT: &str = "Your carrier CSV export";
const BODY: &str = "Attached is the carrier CSV you requested.";

pub fn parse_recipient(address: &str) -> Result<Mailbox, DeliveryError> {
    let address = address.trim();
    address
        .parse::<Mailbox>()
        .map_err(|source| DeliveryError::InvalidRecipient {
            address: address.to_string(),
            source,
        })
}

pub trait Mailer: Send + Sync {
    fn send_csv(&self, to: &Mailbox, artifact: &CsvArtifact) -> Result<(), DeliveryError>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, DeliveryError> {
        let credentials = config
            .credentials
            .as_ref()
            .ok_or(DeliveryError::NotConfigured)?;
        let from = parse_recipient(&credentials.username)?;

        let transport = SmtpTransport::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                credentials.username.clone(),
                credentials.password.clone(),
            ))
            .build();

        Ok(SmtpMailer { transport, from })
    }
}

impl Mailer for SmtpMailer {
    fn send_csv(&self, to: &Mailbox, artifact: &CsvArtifact) -> Result<(), DeliveryError> {
        let body = fs::read(artifact.path()).map_err(|source| DeliveryError::Attachment {
            path: artifact.path().to_path_buf(),
            source,
        })?;
        let csv_type = ContentType::parse("text/csv").unwrap_or(ContentType::TEXT_PLAIN);
        let attachment = Attachment::new(artifact.file_name()).body(body, csv_type);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to.clone())
            .subject(SUBJECT)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(BODY.to_string()))
                    .singlepart(attachment),
            )?;

        self.transport.send(&message)?;
        Ok(())
    }
}

/// Sends `artifact` to `to`, deleting the file only once the send succeeds.
pub fn email_artifact(mailer: &dyn Mailer, to: &Mailbox, artifact: CsvArtifact) -> Result<(), DeliveryError> {
    match mailer.send_csv(to, &artifact) {
        Ok(()) => {
            info!("Sent {} rows to {}", artifact.rows(), to);
            artifact.discard();
            Ok(())
        }
        Err(e) => {
            error!("Sending to {} failed, keeping {:?}: {}", to, artifact.path(), e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchOutcome, BatchRun};
    use crate::config::SmtpCredentials;
    use crate::contact_scraper::EmailSource;
    use crate::fetcher::RecordSource;
    use crate::output::OutputLayout;
    use crate::pipeline::McRange;
    use crate::record::{CarrierRecord, Lookup};
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Qualifying;

    impl RecordSource for Qualifying {
        fn fetch(&self, mc_number: u64) -> Lookup<CarrierRecord> {
            Lookup::Found(CarrierRecord {
                mc_number,
                legal_name: "MAIL TEST LLC".to_string(),
                power_units: 1,
                operating_status: "AUTHORIZED FOR PROPERTY".to_string(),
                ..Default::default()
            })
        }
    }

    struct NoEmail;

    impl EmailSource for NoEmail {
        fn scrape_email(&self, _usdot: &str) -> Lookup<String> {
            Lookup::Absent
        }
    }

    struct FakeMailer {
        fail: bool,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl Mailer for FakeMailer {
        fn send_csv(&self, to: &Mailbox, artifact: &CsvArtifact) -> Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError::NotConfigured);
            }
            let contents = fs::read_to_string(artifact.path()).unwrap();
            self.sent.lock().unwrap().push((to.to_string(), contents));
            Ok(())
        }
    }

    fn artifact_in(dir: &Path) -> CsvArtifact {
        let run = BatchRun::new(McRange::new(1, 1).unwrap(), OutputLayout::RecordOnly, dir);
        match run.execute(&Qualifying, &NoEmail, Duration::ZERO).unwrap() {
            BatchOutcome::Rows(artifact) => artifact,
            BatchOutcome::NoData => panic!("expected a row"),
        }
    }

    #[test]
    fn recipient_must_be_an_address() {
        assert!(parse_recipient(" ops@example.com ").is_ok());
        assert!(matches!(
            parse_recipient("not-an-address"),
            Err(DeliveryError::InvalidRecipient { .. })
        ));
    }

    #[test]
    fn successful_send_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = artifact_in(dir.path());
        let path = artifact.path().to_path_buf();
        let mailer = FakeMailer { fail: false, sent: Mutex::new(Vec::new()) };

        email_artifact(&mailer, &parse_recipient("ops@example.com").unwrap(), artifact).unwrap();

        assert!(!path.exists());
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "ops@example.com");
        assert!(sent[0].1.contains("MAIL TEST LLC"));
    }

    #[test]
    fn failed_send_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = artifact_in(dir.path());
        let path = artifact.path().to_path_buf();
        let mailer = FakeMailer { fail: true, sent: Mutex::new(Vec::new()) };

        let result = email_artifact(&mailer, &parse_recipient("ops@example.com").unwrap(), artifact);

        assert!(result.is_err());
        assert!(path.exists());
    }

    #[test]
    fn smtp_mailer_needs_credentials() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            credentials: None,
        };
        assert!(matches!(
            SmtpMailer::from_config(&config),
            Err(DeliveryError::NotConfigured)
        ));
    }

    #[test]
    fn smtp_mailer_builds_without_connecting() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 2525,
            credentials: Some(SmtpCredentials {
                username: "sender@example.com".to_string(),
                password: "secret".to_string(),
            }),
        };
        assert!(SmtpMailer::from_config(&config).is_ok());
    }
}
