use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Template used when the form does not upload one.
    pub default_template: PathBuf,
    /// Place printed before the signature date.
    pub city: String,
    pub font_family: Option<String>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();

        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let default_template = base_dir.join(
            std::env::var("DEFAULT_TEMPLATE")
                .unwrap_or_else(|_| "templates/certificate.pdf".to_string()),
        );

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse()
            .unwrap_or(5001);

        let city = std::env::var("CERT_CITY").unwrap_or_else(|_| "City".to_string());
        let font_family = std::env::var("CERT_FONT").ok().filter(|f| !f.trim().is_empty());

        let max_upload_mb: usize = std::env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(32);
        if max_upload_mb == 0 {
            return Err("MAX_UPLOAD_MB must be at least 1".into());
        }

        Ok(Self {
            host,
            port,
            default_template,
            city,
            font_family,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        })
    }
}
