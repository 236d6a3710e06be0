use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{history::GenerationHistory, BackendError, GenerationBackend};
use crate::{
    config::BackendConfig,
    error::Result,
    models::{Generation, GenerationRequest},
};

/// In-process stand-in for the image generation service: answers after a
/// random delay and sometimes reports that the model is overloaded.
#[derive(Clone)]
pub struct SimulatedBackend {
    config: BackendConfig,
    history: Arc<GenerationHistory>,
}

impl SimulatedBackend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        config.validate()?;
        let history = Arc::new(GenerationHistory::seeded(config.history_capacity));
        Ok(Self { config, history })
    }

    pub fn history(&self) -> &Arc<GenerationHistory> {
        &self.history
    }

    fn processing_delay(&self) -> Duration {
        rand::thread_rng().gen_range(self.config.min_delay..=self.config.max_delay)
    }

    fn roll_overload(&self) -> bool {
        rand::thread_rng().gen_bool(self.config.overload_probability)
    }
}

#[async_trait]
impl GenerationBackend for SimulatedBackend {
    async fn create_generation(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> std::result::Result<Generation, BackendError> {
        let delay = self.processing_delay();
        log::debug!(
            "Simulating generation for '{}' ({}) in {}ms",
            request.prompt,
            request.style,
            delay.as_millis()
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BackendError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        if cancel.is_cancelled() {
            return Err(BackendError::Cancelled);
        }

        if self.roll_overload() {
            return Err(BackendError::Overloaded);
        }

        let seed: f64 = rand::thread_rng().gen();
        let generation = Generation::new(
            format!("https://picsum.photos/seed/{}/512", seed),
            request.prompt.clone(),
            request.style,
        );
        self.history.push(generation.clone());

        Ok(generation)
    }

    async fn recent_generations(
        &self,
        limit: usize,
    ) -> std::result::Result<Vec<Generation>, BackendError> {
        tokio::time::sleep(self.config.list_delay).await;
        Ok(self.history.recent(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageData, StyleOption};

    fn request() -> GenerationRequest {
        let image = ImageData::new("ref.jpg", "image/jpeg", vec![0xff, 0xd8, 0xff]);
        GenerationRequest::new("red scarf", StyleOption::Vintage, image).unwrap()
    }

    fn backend(overload_probability: f64) -> SimulatedBackend {
        let config = BackendConfig::new()
            .with_delay_range(Duration::from_millis(1000), Duration::from_millis(2000))
            .with_overload_probability(overload_probability);
        SimulatedBackend::new(config).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_echoes_request_and_records_history() {
        let backend = backend(0.0);
        let generation = backend
            .create_generation(&request(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(generation.prompt, "red scarf");
        assert_eq!(generation.style, StyleOption::Vintage);
        assert!(generation.image_url.starts_with("https://picsum.photos/seed/"));

        let recent = backend.recent_generations(5).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].id, generation.id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_overloaded() {
        let backend = backend(1.0);
        let err = backend
            .create_generation(&request(), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::Overloaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_wins_even_when_overloaded() {
        let backend = backend(1.0);
        let token = CancellationToken::new();
        token.cancel();
        let err = backend.create_generation(&request(), token).await.unwrap_err();
        assert_eq!(err, BackendError::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_flight_stops_work() {
        let backend = backend(0.0);
        let before = backend.history().len();
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            canceller.cancel();
        });

        let started = tokio::time::Instant::now();
        let err = backend.create_generation(&request(), token).await.unwrap_err();
        assert_eq!(err, BackendError::Cancelled);
        assert!(started.elapsed() < Duration::from_millis(1000));
        assert_eq!(backend.history().len(), before);
    }

    #[test]
    fn test_processing_delay_stays_in_range() {
        let backend = SimulatedBackend::new(
            BackendConfig::new()
                .with_delay_range(Duration::from_micros(1500), Duration::from_micros(2500)),
        )
        .unwrap();
        for _ in 0..100 {
            let delay = backend.processing_delay();
            assert!(delay >= Duration::from_micros(1500));
            assert!(delay <= Duration::from_micros(2500));
        }

        let fixed = SimulatedBackend::new(
            BackendConfig::new()
                .with_delay_range(Duration::from_secs(3), Duration::from_secs(3)),
        )
        .unwrap();
        assert_eq!(fixed.processing_delay(), Duration::from_secs(3));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = BackendConfig::new().with_overload_probability(-0.1);
        assert!(SimulatedBackend::new(config).is_err());
    }
}
