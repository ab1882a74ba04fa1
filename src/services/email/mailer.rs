use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;

use super::images::InlineImage;
use super::EmailError;
use crate::config::Config;

/// A rendered message ready for delivery
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub subject: String,
    pub text: Option<String>,
    pub html: String,
    pub inline_images: Vec<InlineImage>,
}

/// SMTP delivery. The transport connects lazily, so building a `Mailer`
/// never touches the network.
///
/// The transport owns a connection pool that spawns onto the Tokio runtime,
/// so a `Mailer` must be built and dropped inside that runtime.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Result<Self, EmailError> {
        if config.smtp_host.trim().is_empty() {
            return Err(EmailError::NotConfigured("SMTP host is not configured"));
        }
        if config.sender_email.trim().is_empty() {
            return Err(EmailError::NotConfigured("Sender email is not configured"));
        }

        let credentials = Credentials::new(
            config.smtp_user.clone(),
            config.smtp_pass.expose_secret().clone(),
        );

        // 465 is implicit TLS, 587 upgrades with STARTTLS, anything else is a
        // local relay speaking plaintext.
        let builder = match config.smtp_port {
            465 => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?,
            587 => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?,
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host),
        };

        let transport = builder
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        let address: Address = config.sender_email.trim().parse()?;
        let from = Mailbox::new(Some(config.smtp_from.clone()), address);

        Ok(Self { transport, from })
    }

    /// Builds the MIME message: plain text alternative plus an HTML part
    /// with its inline images grouped as `multipart/related`.
    pub fn build_message(&self, to: &str, email: &OutgoingEmail) -> Result<Message, EmailError> {
        let to: Mailbox = to.trim().parse()?;

        let mut related = MultiPart::related().singlepart(SinglePart::html(email.html.clone()));
        for image in &email.inline_images {
            let content_type = ContentType::parse(image.content_type)
                .map_err(|_| EmailError::InvalidContentType(image.content_type.to_string()))?;
            related = related.singlepart(
                Attachment::new_inline(image.content_id.clone()).body(image.data.clone(), content_type),
            );
        }

        let body = match &email.text {
            Some(text) => MultiPart::alternative()
                .singlepart(SinglePart::plain(text.clone()))
                .multipart(related),
            None => related,
        };

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .multipart(body)?;

        Ok(message)
    }

    #[tracing::instrument(skip(self, email), fields(subject = %email.subject))]
    pub async fn send(&self, to: &str, email: &OutgoingEmail) -> Result<(), EmailError> {
        let message = self.build_message(to, email)?;

        match self.transport.send(message).await {
            Ok(_) => {
                tracing::info!(to = %to, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(to = %to, error = %e, "Failed to send email");
                Err(EmailError::Smtp(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> Mailer {
        Mailer::from_config(&Config::test_default()).unwrap()
    }

    fn email(images: Vec<InlineImage>) -> OutgoingEmail {
        OutgoingEmail {
            subject: "Credits Added to Your Account".to_string(),
            text: Some("Plain body".to_string()),
            html: r#"<img src="cid:email-logo"><p>HTML body</p>"#.to_string(),
            inline_images: images,
        }
    }

    #[tokio::test]
    async fn test_message_contains_both_parts_and_inline_image() {
        let logo = InlineImage {
            content_id: "email-logo".to_string(),
            filename: "email-logo.png".to_string(),
            content_type: "image/png",
            data: vec![137, 80, 78, 71],
        };

        let message = mailer()
            .build_message("user@example.com", &email(vec![logo]))
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("From: Helium <noreply@example.com>"));
        assert!(raw.contains("To: user@example.com"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("multipart/related"));
        assert!(raw.contains("Content-ID: <email-logo>"));
        assert!(raw.contains("Plain body"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_rejected() {
        let err = mailer()
            .build_message("not-an-address", &email(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, EmailError::InvalidAddress(_)));
    }

    #[test]
    fn test_missing_host_is_rejected() {
        let mut config = Config::test_default();
        config.smtp_host = " ".to_string();
        assert!(matches!(
            Mailer::from_config(&config),
            Err(EmailError::NotConfigured(_))
        ));
    }
}
