use serde::{Deserialize, Serialize};

/// Token usage for a single LLM call. `estimated` is set when the vendor
/// returned zero usage and the invoker fell back to a char-count heuristic.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageSample {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub estimated: bool,
}

impl UsageSample {
    pub fn estimate(prompt_chars: usize, completion_chars: usize) -> Self {
        let prompt_tokens = (prompt_chars / 4) as u32;
        let completion_tokens = (completion_chars / 4) as u32;
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            estimated: true,
        }
    }

    pub fn accumulate(&mut self, other: &UsageSample) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_divides_char_count_by_four() {
        let usage = UsageSample::estimate(400, 40);
        assert_eq!(usage.prompt_tokens, 100);
        assert_eq!(usage.completion_tokens, 10);
        assert_eq!(usage.total_tokens, 110);
        assert!(usage.estimated);
    }

    #[test]
    fn accumulate_sums_fields() {
        let mut total = UsageSample::default();
        total.accumulate(&UsageSample {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
            estimated: false,
        });
        total.accumulate(&UsageSample {
            prompt_tokens: 1,
            completion_tokens: 1,
            total_tokens: 2,
            estimated: false,
        });
        assert_eq!(total.total_tokens, 17);
    }
}
