//! Credentials management infrastructure
//!
//! RAII scoping for provider API keys: the router needs the credential
//! present in the process environment for the duration of a single vendor
//! call (some HTTP client configurations read it lazily), and must restore
//! whatever was there before on every exit path, including panics.

#![allow(unsafe_code)]

use std::collections::HashMap;
use std::env;
use std::sync::Mutex;

/// Serializes credential-scoping guards process-wide. `std::env::set_var`
/// mutates global state; without this, two concurrent router calls could
/// stomp on each other's environment variables mid-flight.
static ENV_MUTATION_LOCK: Mutex<()> = Mutex::new(());

/// Temporarily sets one or more environment variables, restoring their
/// prior values (or absence) when dropped.
///
/// ```ignore
/// let _guard = CredentialScope::set(&[("ANTHROPIC_API_KEY", key.as_str())]);
/// // call out to the vendor SDK here
/// // original value restored when `_guard` drops
/// ```
pub struct CredentialScope {
    previous: Vec<(String, Option<String>)>,
    _lock: std::sync::MutexGuard<'static, ()>,
}

impl CredentialScope {
    pub fn set(vars: &[(&str, &str)]) -> Self {
        let lock = ENV_MUTATION_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut previous = Vec::with_capacity(vars.len());
        for (key, value) in vars {
            previous.push(((*key).to_string(), env::var(key).ok()));
            // SAFETY: serialized by `ENV_MUTATION_LOCK`, which every
            // `CredentialScope` in this process acquires before touching
            // the environment.
            unsafe {
                env::set_var(key, value);
            }
        }
        Self { previous, _lock: lock }
    }

    /// Looks up the credential env var name for `provider` from the
    /// configured table, reads its current value, and scopes it under the
    /// same name for the duration of the returned guard. Returns `None`
    /// (no guard, no mutation) if the provider has no configured env var
    /// or the var is unset — the caller then proceeds without credentials,
    /// which is valid for local/self-hosted providers.
    pub fn for_provider(credential_env_vars: &HashMap<String, String>, provider: &str) -> Option<(Self, String)> {
        let env_var = credential_env_vars.get(provider)?;
        let value = env::var(env_var).ok()?;
        let scope = Self::set(&[(env_var.as_str(), value.as_str())]);
        Some((scope, value))
    }
}

impl Drop for CredentialScope {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            // SAFETY: see `set`.
            unsafe {
                match value {
                    Some(v) => env::set_var(&key, v),
                    None => env::remove_var(&key),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use temp_env::with_var;

    #[test]
    fn restores_prior_value_on_drop() {
        with_var("TASKSWARM_TEST_CRED", Some("original"), || {
            {
                let _scope = CredentialScope::set(&[("TASKSWARM_TEST_CRED", "scoped")]);
                assert_eq!(env::var("TASKSWARM_TEST_CRED").unwrap(), "scoped");
            }
            assert_eq!(env::var("TASKSWARM_TEST_CRED").unwrap(), "original");
        });
    }

    #[test]
    fn removes_var_that_was_previously_unset() {
        with_var("TASKSWARM_TEST_CRED_UNSET", None::<&str>, || {
            {
                let _scope = CredentialScope::set(&[("TASKSWARM_TEST_CRED_UNSET", "scoped")]);
                assert_eq!(env::var("TASKSWARM_TEST_CRED_UNSET").unwrap(), "scoped");
            }
            assert!(env::var("TASKSWARM_TEST_CRED_UNSET").is_err());
        });
    }

    #[test]
    fn for_provider_returns_none_when_unconfigured() {
        let table = HashMap::new();
        assert!(CredentialScope::for_provider(&table, "anthropic").is_none());
    }
}
