pub mod gemini;
pub mod postprocess;
pub mod prompts;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

pub use prompts::PromptType;

/// Ordered candidate models, most to least preferred. The rotation walks this
/// list until one call succeeds.
pub const CANDIDATE_MODELS: &[&str] = &[
    "gemini-2.0-flash",
    "gemini-1.5-flash",
    "gemini-1.5-flash-8b",
    "gemini-1.5-pro",
];

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("No API credential available")]
    MissingCredential,

    #[error("Unknown prompt type: {0}")]
    InvalidPromptType(String),

    #[error("Credential rejected: {0}")]
    CredentialRejected(String),

    #[error("All {attempts} candidate models failed")]
    Exhausted {
        attempts: usize,
        /// Best-effort diagnostic: models the credential can actually access
        available_models: Option<Vec<String>>,
    },
}

/// Errors a backend call can produce, classified so the rotation knows
/// whether trying another model could help.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Authorization/credential problem. Retrying other models cannot help.
    #[error("auth: {0}")]
    Auth(String),

    /// The model itself failed or is unavailable. The next candidate may work.
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

/// Seam between the fallback policy and the actual generative API, mockable
/// in tests.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, BackendError>;

    /// Diagnostic: which models can this credential reach?
    async fn list_models(&self) -> Result<Vec<String>, BackendError>;
}

/// State of the candidate rotation. A successful call exits the machine
/// directly with the generated text.
#[derive(Debug, Clone, PartialEq)]
enum Attempt {
    Trying(usize),
    Exhausted,
}

/// Resolve the effective credential: caller-supplied key overrides the
/// server-side default, and the absence of both fails before any network call.
pub fn resolve_credential(user_key: Option<&str>) -> Result<String, GenerateError> {
    if let Some(key) = user_key {
        let key = key.trim();
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }
    crate::config::config()
        .ai
        .gemini_api_key
        .clone()
        .ok_or(GenerateError::MissingCredential)
}

/// Run the ordered model rotation against a backend.
///
/// Stop rules: first success wins; an auth-style failure short-circuits the
/// whole loop (other models cannot fix a bad credential); any other failure
/// advances to the next candidate. Exhaustion is enriched, best-effort, with
/// the models the credential can list.
pub async fn generate_with_fallback(
    backend: &dyn GenerationBackend,
    candidates: &[&str],
    system_prompt: &str,
    user_prompt: &str,
) -> Result<String, GenerateError> {
    let mut state = Attempt::Trying(0);

    loop {
        match state {
            Attempt::Trying(i) => {
                let Some(model) = candidates.get(i) else {
                    state = Attempt::Exhausted;
                    continue;
                };
                match backend.generate(model, system_prompt, user_prompt).await {
                    Ok(text) => {
                        info!("Generation succeeded with model '{}'", model);
                        return Ok(text);
                    }
                    Err(BackendError::Auth(msg)) => {
                        warn!("Model '{}' rejected credential, aborting rotation", model);
                        return Err(GenerateError::CredentialRejected(msg));
                    }
                    Err(e) => {
                        warn!("Model '{}' failed ({}), trying next candidate", model, e);
                        state = Attempt::Trying(i + 1);
                    }
                }
            }
            Attempt::Exhausted => {
                // Diagnostic query is itself best-effort; its failure is swallowed.
                let available_models = match backend.list_models().await {
                    Ok(models) => Some(models),
                    Err(e) => {
                        warn!("Model listing diagnostic failed: {}", e);
                        None
                    }
                };
                return Err(GenerateError::Exhausted {
                    attempts: candidates.len(),
                    available_models,
                });
            }
        }
    }
}

/// Full gateway path: resolve prompt templates, run the rotation, post-process
/// text-oriented output.
pub async fn generate(
    backend: &dyn GenerationBackend,
    prompt_type: PromptType,
    data: &serde_json::Value,
) -> Result<String, GenerateError> {
    let system_prompt = prompt_type.system_prompt();
    let user_prompt = prompts::build_user_prompt(prompt_type, data);

    let raw = generate_with_fallback(backend, CANDIDATE_MODELS, system_prompt, &user_prompt).await?;

    if prompt_type.wants_plain_text() {
        Ok(postprocess::strip_markdown(&raw))
    } else {
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedBackend {
        // one entry per candidate model, in rotation order
        results: Vec<Result<String, fn() -> BackendError>>,
        calls: AtomicUsize,
        models: Result<Vec<String>, ()>,
    }

    impl ScriptedBackend {
        fn new(results: Vec<Result<String, fn() -> BackendError>>) -> Self {
            Self {
                results,
                calls: AtomicUsize::new(0),
                models: Ok(vec!["gemini-1.5-flash".to_string()]),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate(
            &self,
            _model: &str,
            _system_prompt: &str,
            _user_prompt: &str,
        ) -> Result<String, BackendError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.results.get(i) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(make)) => Err(make()),
                None => Err(BackendError::Unavailable("no more scripted results".into())),
            }
        }

        async fn list_models(&self) -> Result<Vec<String>, BackendError> {
            self.models
                .clone()
                .map_err(|_| BackendError::Other("listing failed".into()))
        }
    }

    #[tokio::test]
    async fn first_candidate_success_stops_rotation() {
        let backend = ScriptedBackend::new(vec![Ok("copy".to_string())]);
        let out = generate_with_fallback(&backend, CANDIDATE_MODELS, "sys", "user")
            .await
            .unwrap();
        assert_eq!(out, "copy");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn generic_failure_rotates_to_next_candidate() {
        let backend = ScriptedBackend::new(vec![
            Err(|| BackendError::Unavailable("model retired".into())),
            Ok("second try".to_string()),
        ]);
        let out = generate_with_fallback(&backend, CANDIDATE_MODELS, "sys", "user")
            .await
            .unwrap();
        assert_eq!(out, "second try");
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn auth_failure_short_circuits() {
        let backend = ScriptedBackend::new(vec![
            Err(|| BackendError::Auth("API key invalid".into())),
            Ok("should never be reached".to_string()),
        ]);
        let err = generate_with_fallback(&backend, CANDIDATE_MODELS, "sys", "user")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::CredentialRejected(_)));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempts_and_available_models() {
        let backend = ScriptedBackend::new(vec![
            Err(|| BackendError::Unavailable("down".into())),
            Err(|| BackendError::Unavailable("down".into())),
            Err(|| BackendError::Unavailable("down".into())),
            Err(|| BackendError::Unavailable("down".into())),
        ]);
        let err = generate_with_fallback(&backend, CANDIDATE_MODELS, "sys", "user")
            .await
            .unwrap_err();
        match err {
            GenerateError::Exhausted { attempts, available_models } => {
                assert_eq!(attempts, CANDIDATE_MODELS.len());
                assert_eq!(available_models, Some(vec!["gemini-1.5-flash".to_string()]));
            }
            other => panic!("expected Exhausted, got {:?}", other),
        }
        assert_eq!(backend.call_count(), CANDIDATE_MODELS.len());
    }

    #[tokio::test]
    async fn exhaustion_swallows_diagnostic_failure() {
        let mut backend = ScriptedBackend::new(vec![
            Err(|| BackendError::Unavailable("down".into())),
            Err(|| BackendError::Unavailable("down".into())),
            Err(|| BackendError::Unavailable("down".into())),
            Err(|| BackendError::Unavailable("down".into())),
        ]);
        backend.models = Err(());
        let err = generate_with_fallback(&backend, CANDIDATE_MODELS, "sys", "user")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Exhausted { available_models: None, .. }
        ));
    }

    #[tokio::test]
    async fn listing_output_is_plain_text() {
        let backend = ScriptedBackend::new(vec![Ok(
            "# Stunning Villa\n**Bright** and *airy*.\n- Sea view\n- `Pool`".to_string(),
        )]);
        let out = generate(&backend, PromptType::Listing, &serde_json::json!({}))
            .await
            .unwrap();
        assert!(!out.contains("**"));
        assert!(!out.contains('#'));
        assert!(!out.contains('`'));
        assert!(out.contains("• Sea view"));
    }
}
