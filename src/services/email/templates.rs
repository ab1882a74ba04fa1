use askama::Template;
use chrono::{DateTime, Utc};

use super::images::EmailImage;
use super::parser::{parse_email_text, ParsedEmail};

pub const CTA_URL: &str = "http://he2.ai";

pub const DOWNTIME_SUBJECT: &str = "Scheduled Downtime: Helium will be unavailable for 1 hour";
pub const DOWNTIME_TEXT: &str = "Scheduled Downtime: Helium will be unavailable for 1 hour

Greetings from Helium,

We wanted to let you know that Helium will be temporarily unavailable for 1 hour as we perform scheduled maintenance and upgrades.

During this window, you won't be able to access Helium. Once the maintenance is complete, you'll be able to log back in and experience the platform as usual.

We appreciate your patience and understanding as we work to make Helium even better for you.

Thanks,
The Helium Team";

const DOWNTIME_PARAGRAPHS: [&str; 3] = [
    "We wanted to let you know that Helium will be temporarily unavailable for 1 hour as we perform scheduled maintenance and upgrades.",
    "During this window, you won't be able to access Helium. Once the maintenance is complete, you'll be able to log back in and experience the platform as usual.",
    "We appreciate your patience and understanding as we work to make Helium even better for you.",
];

pub const CREDITS_SUBJECT: &str = "Credits Added to Your Account";
pub const CREDITS_TEXT: &str = "Credits Added to Your Account

Greetings from Helium,

We're excited to inform you that credits have been added to your Helium account. These credits are now available for you to use across all platform features.

You can check your credit balance in your account dashboard at any time. If you have any questions about your credits or how to use them, please feel free to reach out to our support team.

Thank you for being a valued member of the Helium community.

Thanks,
The Helium Team";

/// Where template images point: inline attachments or embedded data URIs
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    Cid,
    DataUri(Option<&'a str>),
}

impl<'a> ImageSource<'a> {
    fn src(self, image: EmailImage) -> Option<&'a str> {
        match self {
            ImageSource::Cid => Some(image.cid_src()),
            ImageSource::DataUri(uri) => uri,
        }
    }
}

#[derive(Template)]
#[template(path = "emails/downtime.html")]
struct DowntimeTemplate<'a> {
    logo_src: Option<&'a str>,
    body_src: Option<&'a str>,
    greeting: String,
    main_text: String,
    secondary_text: String,
    closing_text: String,
    signoff: String,
}

#[derive(Template)]
#[template(path = "emails/credits.html")]
struct CreditsTemplate<'a> {
    logo_src: Option<&'a str>,
    body_src: Option<&'a str>,
    cta_url: &'a str,
}

#[derive(Template)]
#[template(path = "emails/invite.html")]
struct InviteTemplate<'a> {
    logo_src: Option<&'a str>,
    greeting: String,
    intro: &'a str,
    code: &'a str,
    expires_on: Option<&'a str>,
    cta_url: &'a str,
}

fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

fn greeting_html(greeting: &str) -> String {
    escape(greeting).replace(
        "Greetings from Helium,",
        r#"Greetings from <span style="font-weight:700">Helium</span>,"#,
    )
}

/// Renders the maintenance notice. Paragraphs come from `text` when it has
/// any, otherwise the stock downtime copy is used.
pub fn render_downtime(
    text: &str,
    logo: ImageSource<'_>,
    body: ImageSource<'_>,
) -> Result<String, askama::Error> {
    let ParsedEmail {
        greeting,
        paragraphs,
        signoff,
    } = parse_email_text(text);

    let paragraphs: Vec<String> = if paragraphs.is_empty() {
        DOWNTIME_PARAGRAPHS.iter().map(|p| escape(p)).collect()
    } else {
        paragraphs.iter().map(|p| escape(p)).collect()
    };

    let template = DowntimeTemplate {
        logo_src: logo.src(EmailImage::Logo),
        body_src: body.src(EmailImage::DowntimeBody),
        greeting: greeting_html(&greeting),
        main_text: paragraphs.first().cloned().unwrap_or_default(),
        secondary_text: paragraphs.get(1).cloned().unwrap_or_default(),
        closing_text: paragraphs.get(2..).map(|rest| rest.join("<br>")).unwrap_or_default(),
        signoff: signoff.iter().map(|line| escape(line)).collect::<Vec<_>>().join("<br>"),
    };

    template.render()
}

pub fn render_credits(logo: ImageSource<'_>, body: ImageSource<'_>) -> Result<String, askama::Error> {
    CreditsTemplate {
        logo_src: logo.src(EmailImage::Logo),
        body_src: body.src(EmailImage::CreditsBody),
        cta_url: CTA_URL,
    }
    .render()
}

/// Invitation and reminder emails share a layout and differ in wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteKind {
    Invitation,
    Reminder,
}

pub struct InviteEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

pub fn render_invite(
    kind: InviteKind,
    recipient_name: &str,
    code: &str,
    expires_at: Option<DateTime<Utc>>,
    logo: ImageSource<'_>,
) -> Result<InviteEmail, askama::Error> {
    let (subject, intro) = match kind {
        InviteKind::Invitation => (
            "You're invited to Helium",
            "You've been invited to join Helium. Use the invite code below when you sign up.",
        ),
        InviteKind::Reminder => (
            "Reminder: your Helium invite is waiting",
            "Just a reminder that your Helium invite is still waiting for you. Use the code below to sign up.",
        ),
    };

    let name = recipient_name.trim();
    let greeting = if name.is_empty() {
        "Hello,".to_string()
    } else {
        format!("Hello {},", name)
    };
    let expires_on = expires_at.map(|at| at.format("%B %-d, %Y").to_string());

    let html = InviteTemplate {
        logo_src: logo.src(EmailImage::Logo),
        greeting: greeting.clone(),
        intro,
        code,
        expires_on: expires_on.as_deref(),
        cta_url: CTA_URL,
    }
    .render()?;

    let mut text = format!("{}\n\n{}\n\n{}\n\nInvite code: {}\n", subject, greeting, intro, code);
    if let Some(expiry) = &expires_on {
        text.push_str(&format!("This code expires on {}.\n", expiry));
    }
    text.push_str(&format!("\nJoin at {}\n\nThanks,\nThe Helium Team", CTA_URL));

    Ok(InviteEmail {
        subject: subject.to_string(),
        html,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_downtime_uses_cid_images() {
        let html = render_downtime(DOWNTIME_TEXT, ImageSource::Cid, ImageSource::Cid).unwrap();
        assert!(html.contains("cid:email-logo"));
        assert!(html.contains("cid:downtime-body"));
        assert!(html.contains(r#"Greetings from <span style="font-weight:700">Helium</span>,"#));
        assert!(html.contains("temporarily unavailable for 1 hour"));
    }

    #[test]
    fn test_downtime_escapes_custom_text() {
        let text = "Hello,\n\nA <script> tag & more. Really.\n\nThanks,";
        let html = render_downtime(text, ImageSource::DataUri(None), ImageSource::DataUri(None))
            .unwrap();
        assert!(html.contains("A &lt;script&gt; tag &amp; more. Really."));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("cid:"));
    }

    #[test]
    fn test_credits_with_data_uri() {
        let html = render_credits(
            ImageSource::DataUri(Some("data:image/png;base64,AAAA")),
            ImageSource::Cid,
        )
        .unwrap();
        assert!(html.contains("data:image/png;base64,AAAA"));
        assert!(html.contains("cid:credits-body"));
        assert!(html.contains("Get Started"));
    }

    #[test]
    fn test_invite_and_reminder_wording() {
        let expires = Utc.with_ymd_and_hms(2026, 11, 18, 0, 0, 0).unwrap();

        let invite = render_invite(
            InviteKind::Invitation,
            "Grace",
            "NA7K2QZ",
            Some(expires),
            ImageSource::Cid,
        )
        .unwrap();
        assert_eq!(invite.subject, "You're invited to Helium");
        assert!(invite.html.contains("NA7K2QZ"));
        assert!(invite.html.contains("Hello Grace,"));
        assert!(invite.text.contains("This code expires on November 18, 2026."));

        let reminder =
            render_invite(InviteKind::Reminder, "  ", "NA7K2QZ", None, ImageSource::Cid).unwrap();
        assert!(reminder.subject.starts_with("Reminder"));
        assert!(reminder.text.contains("Hello,"));
        assert!(!reminder.text.contains("expires"));
    }
}
