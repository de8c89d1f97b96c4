//! Mock text generator for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{GenerationError, TextGenerator};

/// Mock generator.
///
/// Returns a configurable response and records the prompts it receives.
pub struct MockGenerator {
    available: AtomicBool,
    response: String,
    call_count: AtomicU32,
    last_prompt: Mutex<Option<String>>,
}

impl MockGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            available: AtomicBool::new(true),
            response: response.into(),
            call_count: AtomicU32::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Set availability.
    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Get the number of times generate was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new("Mock response")
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(GenerationError::Unavailable("Mock generator disabled".to_string()));
        }

        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generator() {
        let generator = MockGenerator::new("{\"ok\": true}");

        assert_eq!(generator.generate("hi").await.unwrap(), "{\"ok\": true}");
        assert_eq!(generator.call_count(), 1);
        assert_eq!(generator.last_prompt().as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_mock_unavailable() {
        let generator = MockGenerator::default().with_available(false);
        assert!(generator.generate("hi").await.is_err());
    }
}
