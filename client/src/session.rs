use gloo_storage::Storage;

use crate::config::AUTH_TOKEN_STORAGE_KEY;

/// Credentials for backend requests. Built once at startup and handed to the
/// API client; nothing else reads browser storage for auth.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionContext {
    token: Option<String>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        let token = token.trim();
        Self {
            token: (!token.is_empty()).then(|| token.to_string()),
        }
    }

    /// Read the bearer token left in `localStorage` by the sign-in flow.
    pub fn from_local_storage() -> Self {
        match gloo_storage::LocalStorage::get::<String>(AUTH_TOKEN_STORAGE_KEY) {
            Ok(token) => Self::with_token(token),
            // The sign-in flow may have stored the raw token rather than JSON.
            Err(_) => gloo_storage::LocalStorage::raw()
                .get_item(AUTH_TOKEN_STORAGE_KEY)
                .ok()
                .flatten()
                .map(Self::with_token)
                .unwrap_or_default(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Value for the `Authorization` header, if a token is present.
    pub fn authorization_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }
}
