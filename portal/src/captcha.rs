use crate::config::CaptchaConfig;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptchaError {
    #[error("CAPTCHA service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Checked before credentials on every login attempt.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<bool, CaptchaError>;
}

#[derive(Debug, Deserialize)]
struct Verdict {
    success: bool,
}

/// reCAPTCHA / hCaptcha style `siteverify` endpoint.
pub struct HttpCaptchaVerifier {
    client: reqwest::Client,
    config: CaptchaConfig,
}

impl HttpCaptchaVerifier {
    pub fn new(config: CaptchaConfig) -> Self {
        HttpCaptchaVerifier {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CaptchaVerifier for HttpCaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<bool, CaptchaError> {
        if token.is_empty() {
            return Ok(false);
        }
        let verdict: Verdict = self
            .client
            .post(&self.config.verify_url)
            .form(&[("secret", self.config.secret.as_str()), ("response", token)])
            .send()
            .await?
            .json()
            .await?;
        Ok(verdict.success)
    }
}

/// Used when no `[captcha]` section is configured: any non-empty token passes.
pub struct DisabledCaptcha;

#[async_trait]
impl CaptchaVerifier for DisabledCaptcha {
    async fn verify(&self, token: &str) -> Result<bool, CaptchaError> {
        Ok(!token.trim().is_empty())
    }
}
