use crate::models::Settings;

const ENV_SYNC_TOKEN: &str = "DAYBOOK_SYNC_TOKEN";
const ENV_SYNC_ENDPOINT: &str = "DAYBOOK_SYNC_ENDPOINT";

pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

pub fn sync_token_from_env() -> Option<String> {
    std::env::var(ENV_SYNC_TOKEN)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn sync_endpoint_from_env() -> Option<String> {
    std::env::var(ENV_SYNC_ENDPOINT)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn resolve_sync_token(explicit_token: &str) -> String {
    let trimmed = explicit_token.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    sync_token_from_env().unwrap_or_default()
}

pub fn apply_env_defaults(settings: &mut Settings) {
    if settings.sync.api_token.trim().is_empty() {
        settings.sync.api_token = sync_token_from_env().unwrap_or_default();
    }
    if settings.sync.endpoint.trim().is_empty() {
        if let Some(endpoint) = sync_endpoint_from_env() {
            settings.sync.endpoint = endpoint;
            settings.sync.enabled = true;
        }
    }
}
