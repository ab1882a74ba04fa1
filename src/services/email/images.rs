use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Images that can be embedded in outgoing emails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailImage {
    Logo,
    DowntimeBody,
    UptimeBody,
    CreditsBody,
}

impl EmailImage {
    pub const ALL: [EmailImage; 4] = [
        EmailImage::Logo,
        EmailImage::DowntimeBody,
        EmailImage::UptimeBody,
        EmailImage::CreditsBody,
    ];

    pub fn filename(self) -> &'static str {
        match self {
            EmailImage::Logo => "email-logo.png",
            EmailImage::DowntimeBody => "downtime-body.png",
            EmailImage::UptimeBody => "uptime-body.png",
            EmailImage::CreditsBody => "1Kcredits.png",
        }
    }

    pub fn content_id(self) -> &'static str {
        match self {
            EmailImage::Logo => "email-logo",
            EmailImage::DowntimeBody => "downtime-body",
            EmailImage::UptimeBody => "uptime-body",
            EmailImage::CreditsBody => "credits-body",
        }
    }

    /// `src` value referencing the inline attachment
    pub fn cid_src(self) -> &'static str {
        match self {
            EmailImage::Logo => "cid:email-logo",
            EmailImage::DowntimeBody => "cid:downtime-body",
            EmailImage::UptimeBody => "cid:uptime-body",
            EmailImage::CreditsBody => "cid:credits-body",
        }
    }

    fn fallback_filename(self) -> Option<&'static str> {
        match self {
            EmailImage::Logo => Some("Email.png"),
            _ => None,
        }
    }
}

/// Images referenced by `cid:` in an HTML body, in declaration order
pub fn referenced_images(html: &str) -> Vec<EmailImage> {
    EmailImage::ALL
        .into_iter()
        .filter(|image| html.contains(image.cid_src()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct InlineImage {
    pub content_id: String,
    pub filename: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

/// Data URIs for the dashboard's email preview
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailImageUris {
    pub logo: Option<String>,
    pub downtime_body: Option<String>,
    pub uptime_body: Option<String>,
    pub credits_body: Option<String>,
}

/// Directory holding the email image assets
#[derive(Debug, Clone)]
pub struct EmailAssets {
    dir: PathBuf,
}

impl EmailAssets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn locate(&self, image: EmailImage) -> Option<PathBuf> {
        let candidates = std::iter::once(image.filename()).chain(image.fallback_filename());

        for name in candidates {
            let path = self.dir.join(name);
            if path.is_file() {
                return Some(path);
            }
        }

        tracing::warn!(
            image = image.filename(),
            dir = %self.dir.display(),
            "Email image not found"
        );
        None
    }

    async fn read(&self, image: EmailImage) -> Option<Vec<u8>> {
        let path = self.locate(image)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read email image");
                None
            }
        }
    }

    pub async fn data_uri(&self, image: EmailImage) -> Option<String> {
        let data = self.read(image).await?;
        Some(format!(
            "data:{};base64,{}",
            mime_type(Path::new(image.filename())),
            STANDARD.encode(data)
        ))
    }

    pub async fn data_uris(&self) -> EmailImageUris {
        EmailImageUris {
            logo: self.data_uri(EmailImage::Logo).await,
            downtime_body: self.data_uri(EmailImage::DowntimeBody).await,
            uptime_body: self.data_uri(EmailImage::UptimeBody).await,
            credits_body: self.data_uri(EmailImage::CreditsBody).await,
        }
    }

    /// Loads the attachments for `images`, skipping any that are missing
    pub async fn inline_images(&self, images: &[EmailImage]) -> Vec<InlineImage> {
        let mut attachments = Vec::with_capacity(images.len());
        for &image in images {
            if let Some(data) = self.read(image).await {
                attachments.push(InlineImage {
                    content_id: image.content_id().to_string(),
                    filename: image.filename().to_string(),
                    content_type: mime_type(Path::new(image.filename())),
                    data,
                });
            }
        }
        attachments
    }
}

fn mime_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_assets(name: &str) -> (PathBuf, EmailAssets) {
        let dir = std::env::temp_dir().join(format!("invite-admin-{}-{}", name, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        (dir.clone(), EmailAssets::new(dir))
    }

    #[test]
    fn test_referenced_images() {
        let html = r#"<img src="cid:email-logo"><img src="cid:credits-body">"#;
        assert_eq!(
            referenced_images(html),
            vec![EmailImage::Logo, EmailImage::CreditsBody]
        );
        assert!(referenced_images("<p>plain</p>").is_empty());
    }

    #[tokio::test]
    async fn test_logo_falls_back_to_legacy_name() {
        let (dir, assets) = temp_assets("logo");
        std::fs::write(dir.join("Email.png"), [1u8, 2, 3]).unwrap();

        let uri = assets.data_uri(EmailImage::Logo).await.unwrap();
        assert_eq!(uri, "data:image/png;base64,AQID");

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_missing_images_are_skipped() {
        let (dir, assets) = temp_assets("missing");
        std::fs::write(dir.join("1Kcredits.png"), [0u8; 4]).unwrap();

        let images = assets
            .inline_images(&[EmailImage::Logo, EmailImage::CreditsBody])
            .await;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].content_id, "credits-body");

        let uris = assets.data_uris().await;
        assert!(uris.logo.is_none());
        assert!(uris.credits_body.is_some());

        std::fs::remove_dir_all(dir).unwrap();
    }
}
