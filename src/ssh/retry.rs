//! Login retry policy
//!
//! Rejected credentials get a bounded number of password re-prompts; after
//! that the user is asked for a complete new login. Network errors are
//! returned immediately.

use std::future::Future;

use async_trait::async_trait;
use tracing::{info, warn};

use super::config::SshConfig;
use super::error::SshError;

/// Password re-prompts before falling back to a full login prompt
pub const DEFAULT_MAX_AUTH_ATTEMPTS: u32 = 3;

/// Source of replacement credentials (a terminal prompt in the binary)
#[async_trait]
pub trait CredentialPrompt: Send {
    /// Ask for a new password after a rejected one; `None` cancels.
    async fn password(&mut self, config: &SshConfig, attempt: u32, max: u32) -> Option<String>;

    /// Ask for a complete login, pre-filled from `previous`; `None` cancels.
    async fn login(&mut self, previous: &SshConfig) -> Option<SshConfig>;
}

/// Run `attempt` until it succeeds, re-prompting on authentication failures.
pub async fn connect_with_retry<T, F, Fut, P>(
    mut config: SshConfig,
    max_auth_attempts: u32,
    mut attempt: F,
    prompt: &mut P,
) -> Result<T, SshError>
where
    F: FnMut(SshConfig) -> Fut,
    Fut: Future<Output = Result<T, SshError>>,
    P: CredentialPrompt + ?Sized,
{
    let mut failures = 0;

    loop {
        let err = match attempt(config.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_auth_failure() => return Err(e),
            Err(e) => e,
        };

        failures += 1;
        warn!(
            "Authentication failed for {}@{} ({}/{}): {}",
            config.username,
            config.address(),
            failures,
            max_auth_attempts,
            err
        );

        if failures <= max_auth_attempts {
            match prompt.password(&config, failures, max_auth_attempts).await {
                Some(password) => config.password = password,
                None => return Err(SshError::Cancelled),
            }
        } else {
            info!("Retry limit reached, asking for a new login");
            match prompt.login(&config).await {
                Some(fresh) => {
                    config = fresh;
                    failures = 0;
                }
                None => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedPrompt {
        passwords: VecDeque<String>,
        logins: VecDeque<SshConfig>,
        password_calls: u32,
        login_calls: u32,
    }

    #[async_trait]
    impl CredentialPrompt for ScriptedPrompt {
        async fn password(&mut self, _: &SshConfig, _: u32, _: u32) -> Option<String> {
            self.password_calls += 1;
            self.passwords.pop_front()
        }

        async fn login(&mut self, _: &SshConfig) -> Option<SshConfig> {
            self.login_calls += 1;
            self.logins.pop_front()
        }
    }

    async fn fake_server(config: SshConfig) -> Result<String, SshError> {
        match (config.host.as_str(), config.password.as_str()) {
            ("down.example.com", _) => Err(SshError::ConnectionFailed("refused".into())),
            (_, "right") => Ok(format!("{}@{}", config.username, config.host)),
            _ => Err(SshError::AuthenticationFailed("denied".into())),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_password_retry() {
        let mut prompt = ScriptedPrompt {
            passwords: VecDeque::from(vec!["wrong".into(), "right".into()]),
            ..Default::default()
        };
        let config = SshConfig::new("example.com", "me", "bad");

        let result = connect_with_retry(config, 3, fake_server, &mut prompt).await;
        assert_eq!(result.unwrap(), "me@example.com");
        assert_eq!(prompt.password_calls, 2);
        assert_eq!(prompt.login_calls, 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_full_login_after_limit() {
        let mut prompt = ScriptedPrompt {
            passwords: VecDeque::from(vec!["a".into(), "b".into(), "c".into()]),
            logins: VecDeque::from(vec![SshConfig::new("other.example.com", "you", "right")]),
            ..Default::default()
        };
        let config = SshConfig::new("example.com", "me", "bad");

        let result = connect_with_retry(config, 3, fake_server, &mut prompt).await;
        assert_eq!(result.unwrap(), "you@other.example.com");
        assert_eq!(prompt.password_calls, 3);
        assert_eq!(prompt.login_calls, 1);
    }

    #[tokio::test]
    async fn test_network_error_is_not_retried() {
        let mut prompt = ScriptedPrompt::default();
        let config = SshConfig::new("down.example.com", "me", "right");

        let result = connect_with_retry(config, 3, fake_server, &mut prompt).await;
        assert!(matches!(result, Err(SshError::ConnectionFailed(_))));
        assert_eq!(prompt.password_calls, 0);
    }

    #[tokio::test]
    async fn test_cancelled_prompt() {
        let mut prompt = ScriptedPrompt::default();
        let config = SshConfig::new("example.com", "me", "bad");

        let result = connect_with_retry(config, 3, fake_server, &mut prompt).await;
        assert!(matches!(result, Err(SshError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_login_returns_auth_error() {
        let mut prompt = ScriptedPrompt {
            passwords: VecDeque::from(vec!["a".into()]),
            ..Default::default()
        };
        let config = SshConfig::new("example.com", "me", "bad");

        let result = connect_with_retry(config, 1, fake_server, &mut prompt).await;
        assert!(matches!(result, Err(SshError::AuthenticationFailed(_))));
        assert_eq!(prompt.login_calls, 1);
    }
}
