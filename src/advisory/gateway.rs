//! Advisory Gateway
//!
//! Single bounded attempt at the text generator per request. Successful
//! advice is cached for an hour; failures are never cached and never
//! replaced with canned text.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::gemini::GeminiClient;
use super::parser::{parse_advice, Advice};
use super::prompt::build_prompt;
use super::TextGenerator;
use crate::config::Config;
use crate::error::{AdviceCause, GenerationError, ServiceError};
use crate::features::FeatureVector;

const CACHE_CAPACITY: u64 = 1_000;
const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

pub struct AdvisoryGateway {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
    cache: Cache<String, Advice>,
}

impl AdvisoryGateway {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, timeout: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();
        Self { generator, timeout, cache }
    }

    /// Gemini-backed gateway, or an unconfigured one when no API key is set
    pub fn from_config(config: &Config) -> Self {
        let generator = config.gemini_api_key.as_ref().map(|key| {
            info!("AI advisory enabled (model: {})", config.gemini_model);
            Arc::new(GeminiClient::new(
                key.clone(),
                config.gemini_model.clone(),
                config.gemini_base_url.clone(),
            )) as Arc<dyn TextGenerator>
        });
        if generator.is_none() {
            warn!("GEMINI_API_KEY not set; /api/ai-advice will answer 503");
        }
        Self::new(generator, config.advice_timeout)
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    /// Advice for growing `crop` under `vector`, optionally at `location`
    pub async fn get_advice(
        &self,
        crop: &str,
        vector: &FeatureVector,
        location: Option<&str>,
    ) -> Result<Advice, ServiceError> {
        let generator = self.generator.as_ref().ok_or(ServiceError::AdviceUnavailable {
            cause: AdviceCause::NotConfigured,
        })?;

        let key = cache_key(crop, vector, location);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let prompt = build_prompt(crop, vector, location);
        let text = tokio::time::timeout(self.timeout, generator.generate(&prompt))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))
            .and_then(|reply| reply)
            .inspect_err(|e| warn!("Advisory request for {} failed: {}", crop, e))?;

        let advice = parse_advice(&text).ok_or(ServiceError::AdviceUnavailable {
            cause: AdviceCause::EmptyResponse,
        })?;

        self.cache.insert(key, advice.clone()).await;
        Ok(advice)
    }
}

fn cache_key(crop: &str, vector: &FeatureVector, location: Option<&str>) -> String {
    format!(
        "{}|{:?}|{}",
        crop,
        vector.to_array(),
        location.map(str::trim).unwrap_or_default().to_lowercase()
    )
}
