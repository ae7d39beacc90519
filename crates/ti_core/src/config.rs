use crate::{Error, Result};

/// SMTP delivery settings. Absent entirely when email is not configured;
/// partially-set or malformed values are configuration errors.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Application configuration, read from the environment once at startup.
///
/// A missing Gemini key leaves `gemini_api_key` as `None` (the AI surface is
/// disabled for the session); a malformed SMTP port fails fast here rather
/// than at send time.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub smtp: Option<SmtpConfig>,
}

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let gemini_api_key = non_empty(std::env::var("GEMINI_API_KEY").ok());
        let gemini_model = non_empty(std::env::var("TI_GEMINI_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        let smtp = match non_empty(std::env::var("TI_SMTP_HOST").ok()) {
            None => None,
            Some(host) => {
                let port_raw = std::env::var("TI_SMTP_PORT")
                    .map_err(|_| Error::Config("TI_SMTP_PORT is not set".to_string()))?;
                let port: u16 = port_raw.trim().parse().map_err(|_| {
                    Error::Config(format!("TI_SMTP_PORT is not a valid port: {port_raw:?}"))
                })?;
                let username = std::env::var("TI_SMTP_USERNAME")
                    .map_err(|_| Error::Config("TI_SMTP_USERNAME is not set".to_string()))?;
                let password = std::env::var("TI_SMTP_PASSWORD")
                    .map_err(|_| Error::Config("TI_SMTP_PASSWORD is not set".to_string()))?;
                Some(SmtpConfig {
                    host,
                    port,
                    username,
                    password,
                })
            }
        };

        Ok(Self {
            gemini_api_key,
            gemini_model,
            smtp,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_filters_blank() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some("x".to_string())), Some("x".to_string()));
        assert_eq!(non_empty(None), None);
    }
}
