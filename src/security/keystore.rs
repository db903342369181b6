use crate::error::AppError;

const SERVICE_NAME: &str = "app.cocompose";

/// Account name the Gemini key is stored under.
pub const GEMINI_ACCOUNT: &str = "gemini";

/// OS-native keychain storage for API keys.
/// Uses macOS Keychain, Windows Credential Manager, or Linux Secret Service.
pub struct KeyStore;

impl KeyStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(provider: &str) -> Result<keyring::Entry, AppError> {
        keyring::Entry::new(SERVICE_NAME, provider)
            .map_err(|e| AppError::Security(format!("Keyring entry error: {e}")))
    }

    pub fn save_api_key(&self, provider: &str, key: &str) -> Result<(), AppError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::Security("API key must not be empty".into()));
        }
        Self::entry(provider)?
            .set_password(key)
            .map_err(|e| AppError::Security(format!("Failed to save key for {provider}: {e}")))
    }

    pub fn get_api_key(&self, provider: &str) -> Result<Option<String>, AppError> {
        match Self::entry(provider)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AppError::Security(format!(
                "Failed to get key for {provider}: {e}"
            ))),
        }
    }

    pub fn delete_api_key(&self, provider: &str) -> Result<(), AppError> {
        match Self::entry(provider)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
            Err(e) => Err(AppError::Security(format!(
                "Failed to delete key for {provider}: {e}"
            ))),
        }
    }

    /// Keychain first, then the environment (`GEMINI_API_KEY`, `API_KEY`).
    pub fn resolve_gemini_key(&self) -> Result<String, AppError> {
        if let Some(key) = self.get_api_key(GEMINI_ACCOUNT)? {
            return Ok(key);
        }
        crate::config::api_key_from_env()
            .ok_or_else(|| AppError::Security("No Gemini API key configured".into()))
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}
