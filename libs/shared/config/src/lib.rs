use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub moderation_api_key: String,
    pub moderation_base_url: String,
    pub notify_relay_url: String,
    pub notify_from_email: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            moderation_api_key: env::var("MODERATION_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("MODERATION_API_KEY not set, review moderation runs in pass-through mode");
                    String::new()
                }),
            moderation_base_url: env::var("MODERATION_BASE_URL")
                .unwrap_or_else(|_| {
                    "https://generativelanguage.googleapis.com/v1beta".to_string()
                }),
            notify_relay_url: env::var("NOTIFY_RELAY_URL")
                .unwrap_or_else(|_| {
                    warn!("NOTIFY_RELAY_URL not set, booking notifications disabled");
                    String::new()
                }),
            notify_from_email: env::var("NOTIFY_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@vetbook.example".to_string()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_moderation_configured(&self) -> bool {
        !self.moderation_api_key.is_empty() && !self.moderation_base_url.is_empty()
    }

    pub fn is_notifications_configured(&self) -> bool {
        !self.notify_relay_url.is_empty() && !self.notify_from_email.is_empty()
    }
}
