//! Access token supply.
//!
//! Token exchange and refresh belong to the surrounding application. This crate only asks for
//! the current bearer token, once per upstream call.

use async_trait::async_trait;

#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// The current access token, or `None` when no usable token is available.
    async fn access_token(&self) -> Option<String>;
}

/// A fixed token, typically from configuration or the environment.
#[derive(Clone, Default)]
pub struct StaticAccessToken {
    token: Option<String>,
}

impl StaticAccessToken {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl std::fmt::Debug for StaticAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAccessToken")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl AccessTokenProvider for StaticAccessToken {
    async fn access_token(&self) -> Option<String> {
        usable_token(self.token.as_deref())
    }
}

/// Blank tokens count as missing
pub(crate) fn usable_token(token: Option<&str>) -> Option<String> {
    token.map(str::trim).filter(|t| !t.is_empty()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blank_tokens_are_missing() {
        assert_eq!(StaticAccessToken::new(None).access_token().await, None);
        assert_eq!(StaticAccessToken::new(Some("   ".into())).access_token().await, None);
        assert_eq!(
            StaticAccessToken::new(Some(" ya29.token ".into())).access_token().await,
            Some("ya29.token".to_string())
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", StaticAccessToken::new(Some("secret".into())));
        assert!(!debug.contains("secret"));
    }
}
