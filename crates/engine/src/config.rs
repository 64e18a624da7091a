//! External-service configuration for step executors.
//!
//! Each sub-config loads from environment variables and returns `None` when
//! its service is not configured; the corresponding executors stay
//! registered but report a configuration error if a step actually needs
//! the missing service.

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@flowline.local";

/// Default Slack Web API base URL.
const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// Default chat-completions model when `AI_MODEL` is not set.
const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Configuration for the SMTP email executor.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured.
    ///
    /// | Variable        | Required | Default                   |
    /// |-----------------|----------|---------------------------|
    /// | `SMTP_HOST`     | yes      | --                        |
    /// | `SMTP_PORT`     | no       | `587`                     |
    /// | `SMTP_FROM`     | no       | `noreply@flowline.local`  |
    /// | `SMTP_USER`     | no       | --                        |
    /// | `SMTP_PASSWORD` | no       | --                        |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// SlackConfig
// ---------------------------------------------------------------------------

/// Configuration for the Slack executors.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// Bot token used as a Bearer credential against the Slack Web API.
    pub bot_token: String,
    /// API base URL; overridable for tests.
    pub api_base: String,
}

impl SlackConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SLACK_BOT_TOKEN` is not set.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("SLACK_BOT_TOKEN").ok()?;
        Some(Self {
            bot_token,
            api_base: std::env::var("SLACK_API_BASE")
                .unwrap_or_else(|_| DEFAULT_SLACK_API_BASE.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// AiConfig
// ---------------------------------------------------------------------------

/// Configuration for the AI text-generation executors.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Full chat-completions endpoint URL.
    pub api_url: String,
    /// Bearer token for the provider.
    pub api_key: String,
    /// Model identifier sent with every request.
    pub model: String,
}

impl AiConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if either `AI_API_URL` or `AI_API_KEY` is not set.
    pub fn from_env() -> Option<Self> {
        let api_url = std::env::var("AI_API_URL").ok()?;
        let api_key = std::env::var("AI_API_KEY").ok()?;
        Some(Self {
            api_url,
            api_key,
            model: std::env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_AI_MODEL.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Aggregate configuration for the executor registry.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub email: Option<EmailConfig>,
    pub slack: Option<SlackConfig>,
    pub ai: Option<AiConfig>,
}

impl EngineConfig {
    /// Load all external-service configs from the environment.
    pub fn from_env() -> Self {
        Self {
            email: EmailConfig::from_env(),
            slack: SlackConfig::from_env(),
            ai: AiConfig::from_env(),
        }
    }
}
