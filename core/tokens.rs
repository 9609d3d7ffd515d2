use tiktoken_rs::{CoreBPE, get_bpe_from_model};

pub const DEFAULT_TOKENIZER_MODEL: &str = "gpt-4";

/// Characters per token assumed when no BPE tokenizer is available.
pub const CHARS_PER_TOKEN: usize = 4;

/// Counts tokens with a tiktoken BPE when one could be built for the model,
/// otherwise approximates with one token per [`CHARS_PER_TOKEN`] characters.
pub struct TokenEstimator {
    bpe: Option<CoreBPE>,
}

impl TokenEstimator {
    pub fn for_model(model: &str) -> Self {
        match get_bpe_from_model(model) {
            Ok(bpe) => {
                log::debug!("Using tiktoken encoding for model '{}'", model);
                Self { bpe: Some(bpe) }
            }
            Err(e) => {
                log::warn!(
                    "No tokenizer available for model '{}' ({}). Falling back to a character-based estimate.",
                    model,
                    e
                );
                Self::approximate()
            }
        }
    }

    pub fn approximate() -> Self {
        Self { bpe: None }
    }

    pub fn is_approximate(&self) -> bool {
        self.bpe.is_none()
    }

    pub fn estimate(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_ordinary(text).len(),
            None => text.chars().count() / CHARS_PER_TOKEN,
        }
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::for_model(DEFAULT_TOKENIZER_MODEL)
    }
}

impl std::fmt::Debug for TokenEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEstimator")
            .field("approximate", &self.is_approximate())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_counts_four_chars_per_token() {
        let estimator = TokenEstimator::approximate();
        assert_eq!(estimator.estimate(&"a".repeat(400)), 100);
        assert_eq!(estimator.estimate("abc"), 0);
        assert_eq!(estimator.estimate(""), 0);
    }

    #[test]
    fn fallback_counts_characters_not_bytes() {
        let estimator = TokenEstimator::approximate();
        assert_eq!(estimator.estimate(&"é".repeat(8)), 2);
    }

    #[test]
    fn unknown_model_falls_back() {
        let estimator = TokenEstimator::for_model("definitely-not-a-model");
        assert!(estimator.is_approximate());
        assert_eq!(estimator.estimate(&"x".repeat(40)), 10);
    }

    #[test]
    fn known_model_uses_bpe() {
        let estimator = TokenEstimator::for_model("gpt-4");
        assert!(!estimator.is_approximate());
        let count = estimator.estimate("hello world");
        assert!(count > 0 && count < 5);
    }
}
