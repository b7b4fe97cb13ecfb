//! Pairing code generation.
//!
//! Codes are read aloud at a kiosk and typed on a tablet, so the alphabet
//! drops the confusable `0/O` and `1/I`. They are a convenience key for
//! binding a device to a lane, not a credential.

use crate::errors::LaneError;
use lane_protocol::PairingCode;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;

/// Symbols a code may contain.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Characters per code.
pub const CODE_LENGTH: usize = 4;

/// Draws attempted before giving up with [`LaneError::CodeSpaceExhausted`].
pub const MAX_CODE_ATTEMPTS: usize = 64;

/// Source of candidate pairing codes.
pub trait CodeSource: Send + fmt::Debug {
    /// Draw one candidate code. Candidates may collide; the caller filters.
    fn draw(&mut self) -> PairingCode;
}

/// Uniform random codes over [`CODE_ALPHABET`].
#[derive(Debug)]
pub struct RandomCodeSource {
    rng: StdRng,
}

impl RandomCodeSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic source for reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomCodeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeSource for RandomCodeSource {
    fn draw(&mut self) -> PairingCode {
        let code: String = (0..CODE_LENGTH)
            .filter_map(|_| CODE_ALPHABET.choose(&mut self.rng).copied().map(char::from))
            .collect();
        PairingCode::new(code)
    }
}

/// Draw a code that differs from `prior` and for which `in_use` is false.
///
/// # Errors
///
/// Returns [`LaneError::CodeSpaceExhausted`] after [`MAX_CODE_ATTEMPTS`]
/// rejected draws.
pub fn generate_code(
    source: &mut dyn CodeSource,
    prior: Option<&PairingCode>,
    in_use: impl Fn(&PairingCode) -> bool,
) -> Result<PairingCode, LaneError> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let candidate = source.draw();
        if prior == Some(&candidate) || in_use(&candidate) {
            continue;
        }
        return Ok(candidate);
    }
    Err(LaneError::CodeSpaceExhausted)
}

#[cfg(any(test, feature = "test-utils"))]
pub use scripted::ScriptedCodeSource;

#[cfg(any(test, feature = "test-utils"))]
mod scripted {
    use super::{CodeSource, RandomCodeSource};
    use lane_protocol::PairingCode;
    use std::collections::VecDeque;

    /// Yields the given codes in order, then falls back to random draws.
    #[derive(Debug)]
    pub struct ScriptedCodeSource {
        script: VecDeque<PairingCode>,
        fallback: RandomCodeSource,
    }

    impl ScriptedCodeSource {
        #[must_use]
        pub fn new<I, S>(codes: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                script: codes.into_iter().map(PairingCode::new).collect(),
                fallback: RandomCodeSource::seeded(7),
            }
        }
    }

    impl CodeSource for ScriptedCodeSource {
        fn draw(&mut self) -> PairingCode {
            self.script
                .pop_front()
                .unwrap_or_else(|| self.fallback.draw())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_random_codes_use_alphabet() {
        let mut source = RandomCodeSource::seeded(42);
        for _ in 0..500 {
            let code = source.draw();
            assert_eq!(code.as_str().len(), CODE_LENGTH);
            assert!(code
                .as_str()
                .bytes()
                .all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_alphabet_excludes_confusables() {
        for confusable in [b'0', b'O', b'1', b'I'] {
            assert!(!CODE_ALPHABET.contains(&confusable));
        }
        assert_eq!(CODE_ALPHABET.len(), 32);
    }

    #[test]
    fn test_generate_skips_prior_code() {
        let mut source = ScriptedCodeSource::new(["AAAA", "AAAA", "BBBB"]);
        let prior = PairingCode::new("AAAA");

        let code = generate_code(&mut source, Some(&prior), |_| false).unwrap();
        assert_eq!(code.as_str(), "BBBB");
    }

    #[test]
    fn test_generate_skips_codes_in_use() {
        let mut source = ScriptedCodeSource::new(["K7X2", "M4QP"]);
        let taken = PairingCode::new("K7X2");

        let code = generate_code(&mut source, None, |c| *c == taken).unwrap();
        assert_eq!(code.as_str(), "M4QP");
    }

    #[test]
    fn test_generate_gives_up_when_every_draw_rejected() {
        let mut source = RandomCodeSource::seeded(1);
        let result = generate_code(&mut source, None, |_| true);
        assert!(matches!(result, Err(LaneError::CodeSpaceExhausted)));
    }

    #[test]
    fn test_scripted_source_falls_back_to_random() {
        let mut source = ScriptedCodeSource::new(["K7X2"]);
        assert_eq!(source.draw().as_str(), "K7X2");
        assert_eq!(source.draw().as_str().len(), CODE_LENGTH);
    }
}
