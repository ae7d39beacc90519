use lettre::message::header::ContentType;
use lettre::message::{Attachment as LettreAttachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use ti_core::config::SmtpConfig;
use ti_core::{Error, Result};
use tracing::{info, warn};

/// Whether the report body goes out as preformatted HTML or plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Markdown,
    Plain,
}

pub struct EmailAttachment {
    pub data: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| Error::Mail(format!("bad smtp relay {}: {e}", config.host)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            sender: config.username.clone(),
        })
    }

    /// Send the report body plus any number of attachments. Recipients and
    /// attachments that fail to parse are skipped with a warning; the send
    /// only errors when nothing deliverable remains or SMTP rejects it.
    pub async fn send_report(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
        format: BodyFormat,
        attachments: Vec<EmailAttachment>,
    ) -> Result<()> {
        let mut builder = Message::builder().subject(subject).from(
            self.sender
                .parse()
                .map_err(|e| Error::Mail(format!("bad sender address: {e}")))?,
        );

        let mut valid_recipients = 0;
        for recipient in recipients {
            match recipient.trim().parse() {
                Ok(mailbox) => {
                    builder = builder.to(mailbox);
                    valid_recipients += 1;
                }
                Err(e) => warn!(recipient, error = %e, "skipping invalid recipient"),
            }
        }
        if valid_recipients == 0 {
            return Err(Error::Mail("no valid recipients".to_string()));
        }

        let body_part = match format {
            BodyFormat::Markdown => SinglePart::html(wrap_report_html(body)),
            BodyFormat::Plain => SinglePart::plain(body.to_string()),
        };

        let mut multipart = MultiPart::mixed().singlepart(body_part);
        for attachment in attachments {
            let content_type = match ContentType::parse(&attachment.mime_type) {
                Ok(ct) => ct,
                Err(e) => {
                    warn!(
                        filename = %attachment.filename,
                        mime_type = %attachment.mime_type,
                        error = %e,
                        "skipping attachment with unusable mime type"
                    );
                    continue;
                }
            };
            multipart = multipart.singlepart(
                LettreAttachment::new(attachment.filename).body(attachment.data, content_type),
            );
        }

        let email = builder
            .multipart(multipart)
            .map_err(|e| Error::Mail(format!("failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| Error::Mail(format!("smtp send failed: {e}")))?;
        info!(recipients = valid_recipients, "report email sent");
        Ok(())
    }
}

fn wrap_report_html(body: &str) -> String {
    let escaped = body
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        "<html>\n  <body>\n    <p>안녕하세요!</p>\n    <p>요청하신 뉴스 트렌드 분석 보고서입니다.</p>\n    \
         <pre style=\"white-space: pre-wrap; font-family: monospace;\">{escaped}</pre>\n    \
         <p>감사합니다.</p>\n  </body>\n</html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_wrapper_preserves_report_text() {
        let html = wrap_report_html("# 보고서\n본문");
        assert!(html.contains("# 보고서\n본문"));
        assert!(html.contains("pre-wrap"));
    }

    #[test]
    fn html_wrapper_escapes_markup_in_the_body() {
        let html = wrap_report_html("A & B <script>1 > 0</script>");
        assert!(html.contains("A &amp; B &lt;script&gt;1 &gt; 0&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn mailer_builds_from_config() {
        let config = SmtpConfig {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: "reports@example.com".to_string(),
            password: "app-password".to_string(),
        };
        assert!(Mailer::new(&config).is_ok());
    }
}
