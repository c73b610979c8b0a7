//! Prompt pipeline orchestration
//!
//! `use_prompt` runs fetch, decrypt and fill for one session:
//!
//! ```text
//! FetchingSession -> SessionChecked -> FetchingPayload -> Decrypting
//!     -> Filling -> Returning -> Cleanup
//! ```
//!
//! Every intermediate holding key material or plaintext wipes itself when
//! dropped, so cleanup runs on every exit path, including `?` returns and a
//! caller dropping the future on timeout. The session metadata cache is the
//! only state shared between calls; it never holds prompt content.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::cache::SessionCache;
use super::decryptor::{self, PromptDecryptor};
use super::memory::{format_mb, MemoryProbe, MemoryThresholds, SystemMemoryProbe};
use crate::crypto::SecureString;
use crate::error::{StardustError, StardustResult};
use crate::models::Session;
use crate::remote::PromptService;
use crate::template::TemplateEngine;

/// How often the cache janitor runs
pub const JANITOR_PERIOD: Duration = Duration::from_secs(60);

/// Default lifetime of cached session metadata
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Pipeline stages, used for debug logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchingSession,
    SessionChecked,
    FetchingPayload,
    Decrypting,
    Filling,
    Returning,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchingSession => "fetching_session",
            Self::SessionChecked => "session_checked",
            Self::FetchingPayload => "fetching_payload",
            Self::Decrypting => "decrypting",
            Self::Filling => "filling",
            Self::Returning => "returning",
            Self::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Non-sensitive facts about a filled prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptMetadata {
    pub form_id: String,
    pub form_name: String,
    pub session_id: String,
    /// Wall time of the whole call in milliseconds
    pub duration: u64,
}

/// A filled prompt; the text is wiped when this is dropped
#[derive(Debug)]
pub struct PromptOutput {
    pub prompt: SecureString,
    pub metadata: PromptMetadata,
}

/// Best-effort readiness of the pipeline for a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    pub session: bool,
    pub auth: bool,
    pub memory: bool,
    pub network: bool,
}

/// Orchestrates fetch, decrypt and fill
pub struct PromptManager {
    service: Arc<dyn PromptService>,
    decryptor: PromptDecryptor,
    engine: TemplateEngine,
    cache: Arc<SessionCache>,
    probe: Arc<dyn MemoryProbe>,
    thresholds: MemoryThresholds,
}

impl PromptManager {
    pub fn new(
        service: Arc<dyn PromptService>,
        decryptor: PromptDecryptor,
        engine: TemplateEngine,
    ) -> Self {
        Self {
            service,
            decryptor,
            engine,
            cache: Arc::new(SessionCache::new(DEFAULT_CACHE_TTL)),
            probe: Arc::new(SystemMemoryProbe),
            thresholds: MemoryThresholds::default(),
        }
    }

    pub fn with_memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_thresholds(mut self, thresholds: MemoryThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = Arc::new(SessionCache::new(ttl));
        self
    }

    /// The session metadata cache
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Fetch, decrypt and fill the prompt for a session
    ///
    /// `api_key` overrides the service's configured key for this call only.
    pub async fn use_prompt(
        &self,
        session_id: &str,
        api_key: Option<&str>,
    ) -> StardustResult<PromptOutput> {
        let started = Instant::now();
        let result = self.run_pipeline(session_id, api_key, started).await;

        debug!(stage = %Stage::Cleanup, session_id, ok = result.is_ok(), "Prompt pipeline finished");
        result
    }

    async fn run_pipeline(
        &self,
        session_id: &str,
        api_key: Option<&str>,
        started: Instant,
    ) -> StardustResult<PromptOutput> {
        debug!(stage = %Stage::FetchingSession, session_id, "Pipeline stage");
        let session = self.service.get_session(session_id).await?;
        ensure_not_expired(&session)?;

        debug!(stage = %Stage::SessionChecked, session_id, "Pipeline stage");
        debug!(stage = %Stage::FetchingPayload, session_id, "Pipeline stage");
        let payload = self
            .service
            .get_encrypted_prompt(session_id, api_key)
            .await?;

        // The fetch may have outlived the session
        ensure_not_expired(&session)?;
        if payload.is_expired_at(Utc::now()) {
            return Err(StardustError::Session(
                "session has expired, generate a new one on the web".into(),
            ));
        }

        debug!(stage = %Stage::Decrypting, session_id, "Pipeline stage");
        self.relieve_memory_pressure().await;
        if let Some(resident) = self.probe.resident_bytes() {
            if !decryptor::can_safely_decrypt(resident, &payload.encrypted_prompt) {
                warn!(
                    resident = %format_mb(resident),
                    "Decrypting close to the memory ceiling"
                );
            }
        }
        let template = self.decryptor.decrypt(
            &payload.encrypted_prompt,
            &payload.iv,
            &payload.auth_tag,
            &payload.session_key,
        )?;

        debug!(stage = %Stage::Filling, session_id, "Pipeline stage");
        let prompt = self.engine.fill(&template, &payload.parameters)?;
        drop(template);

        debug!(stage = %Stage::Returning, session_id, "Pipeline stage");
        Ok(PromptOutput {
            prompt,
            metadata: PromptMetadata {
                form_id: payload.form_id.clone(),
                form_name: payload.form_name.clone(),
                session_id: session_id.to_string(),
                duration: started.elapsed().as_millis() as u64,
            },
        })
    }

    /// Check that `user_id` may use a session
    ///
    /// Sessions without an owner are open to everyone.
    pub async fn validate_access(&self, session_id: &str, user_id: &str) -> StardustResult<()> {
        let session = match self.cache.get(session_id).await {
            Some(session) => session,
            None => {
                let session = self.service.get_session(session_id).await?;
                self.cache.insert(session.clone()).await;
                session
            }
        };

        if !session.is_accessible_by(user_id) {
            return Err(StardustError::Access(format!(
                "user {} may not use session {}",
                user_id, session_id
            )));
        }
        Ok(())
    }

    /// Readiness of session, credentials, memory and network
    ///
    /// Never fails; any error leaves every field false.
    pub async fn pre_check(&self, session_id: &str) -> ReadinessReport {
        match self.service.get_session(session_id).await {
            Ok(session) => ReadinessReport {
                session: !session.is_expired(),
                auth: self.service.has_credentials(),
                memory: self
                    .probe
                    .resident_bytes()
                    .map(|bytes| self.thresholds.is_ready(bytes))
                    .unwrap_or(false),
                network: true,
            },
            Err(e) => {
                debug!(session_id, error = %e, "Pre-check could not reach the session");
                ReadinessReport::default()
            }
        }
    }

    async fn relieve_memory_pressure(&self) {
        relieve_memory_pressure(&self.cache, self.probe.as_ref(), self.thresholds).await;
    }

    /// Periodically evict stale cache entries and re-check memory
    ///
    /// The task runs until the returned handle is aborted or the runtime
    /// shuts down.
    pub fn spawn_cache_janitor(&self, period: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        let probe = Arc::clone(&self.probe);
        let thresholds = self.thresholds;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = cache.evict_stale().await;
                if evicted > 0 {
                    debug!(evicted, "Evicted stale session metadata");
                }
                relieve_memory_pressure(&cache, probe.as_ref(), thresholds).await;
            }
        })
    }
}

fn ensure_not_expired(session: &Session) -> StardustResult<()> {
    if session.is_expired_at(Utc::now()) {
        return Err(StardustError::Session(
            "session has expired, generate a new one on the web".into(),
        ));
    }
    Ok(())
}

/// Clear soft caches when memory use is above the warning threshold
///
/// Returns whether the threshold was exceeded. Never blocks the pipeline.
async fn relieve_memory_pressure(
    cache: &SessionCache,
    probe: &dyn MemoryProbe,
    thresholds: MemoryThresholds,
) -> bool {
    let Some(resident) = probe.resident_bytes() else {
        return false;
    };
    if !thresholds.is_under_pressure(resident) {
        return false;
    }

    let cleared = cache.clear().await;
    warn!(resident = %format_mb(resident), cleared, "High memory usage, cleared session cache");
    true
}
