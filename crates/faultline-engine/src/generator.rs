//! Operation sequence generation: byte strategies plus the sequence builder.
//!
//! Key and value buffers are synthesized under configurable strategies, all
//! drawing from the single shared stream.  Every strategy consumes a
//! deterministic number of draws given fixed inputs, so a sequence is fully
//! reproducible from the seed.
//!
//! Draw order per operation is part of the engine contract: kind, then key,
//! then value.

use crate::distribution::OperationDistribution;
use crate::op::{OpKind, Operation, OperationSequence};
use rand::{Rng, RngCore};
use rand_chacha::ChaCha8Rng;

/// Alphabet for text-ish keys: alphanumeric only.
const KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length range used when collision-prone generation falls back to a
/// random key.
const COLLISION_FALLBACK_LEN: (usize, usize) = (8, 32);

/// Size range for [`ValueStrategy::RandomBinary`] payloads.
const RANDOM_BINARY_SIZE: (usize, usize) = (64, 1024);

/// How key bytes are synthesized.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyStrategy {
    /// Length uniform in the inclusive range, bytes from a fixed
    /// alphanumeric alphabet.
    UniformRandom { min_length: usize, max_length: usize },
    /// With `collision_probability`, take a key generated earlier in the
    /// same sequence and flip one bit; otherwise a random key.
    CollisionProne { collision_probability: f64 },
    /// A fixed prefix plus a zero-padded integer drawn from the stream.
    ///
    /// The suffix is fixed-width, not monotone: it is a stream draw, so
    /// keys share a common shape but are not ordered.
    Sequential { prefix: String, pad_width: usize },
}

impl KeyStrategy {
    /// Synthesize one key.  `previous` holds the keys generated earlier in
    /// the same sequence, needed by [`KeyStrategy::CollisionProne`].
    pub fn generate(&self, rng: &mut ChaCha8Rng, previous: &[Vec<u8>]) -> Vec<u8> {
        match self {
            Self::UniformRandom {
                min_length,
                max_length,
            } => random_key(rng, *min_length, *max_length),
            Self::CollisionProne {
                collision_probability,
            } => {
                let roll = rng.gen::<f64>();
                if roll < *collision_probability && !previous.is_empty() {
                    let index = rng.gen_range(0..previous.len());
                    let base = &previous[index];
                    if base.is_empty() {
                        return random_key(
                            rng,
                            COLLISION_FALLBACK_LEN.0,
                            COLLISION_FALLBACK_LEN.1,
                        );
                    }
                    let bit = rng.gen_range(0..base.len() * 8);
                    let mut key = base.clone();
                    key[bit / 8] ^= 1 << (bit % 8);
                    key
                } else {
                    random_key(rng, COLLISION_FALLBACK_LEN.0, COLLISION_FALLBACK_LEN.1)
                }
            }
            Self::Sequential { prefix, pad_width } => {
                let modulus = 10u64.saturating_pow(*pad_width as u32);
                let suffix = rng.next_u64() % modulus.max(1);
                format!("{prefix}{suffix:0width$}", width = *pad_width).into_bytes()
            }
        }
    }
}

impl Default for KeyStrategy {
    fn default() -> Self {
        Self::UniformRandom {
            min_length: 8,
            max_length: 32,
        }
    }
}

/// How value bytes are synthesized.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueStrategy {
    /// Exactly `size` random bytes.
    FixedSize { size: usize },
    /// Size uniform in the inclusive range, random bytes.
    VariableSize { min_size: usize, max_size: usize },
    /// Full byte-range content, size uniform in a fixed 64..=1024 range.
    RandomBinary,
}

impl ValueStrategy {
    /// Synthesize one value.
    pub fn generate(&self, rng: &mut ChaCha8Rng) -> Vec<u8> {
        let size = match self {
            Self::FixedSize { size } => *size,
            Self::VariableSize { min_size, max_size } => rng.gen_range(*min_size..=*max_size),
            Self::RandomBinary => rng.gen_range(RANDOM_BINARY_SIZE.0..=RANDOM_BINARY_SIZE.1),
        };
        let mut value = vec![0u8; size];
        rng.fill_bytes(&mut value);
        value
    }
}

impl Default for ValueStrategy {
    fn default() -> Self {
        Self::VariableSize {
            min_size: 16,
            max_size: 256,
        }
    }
}

/// Builds operation sequences from the distribution and byte strategies.
///
/// Stateless across sequences: per-sequence key memory (for collision-prone
/// keys) lives only for the duration of one [`generate`](Self::generate)
/// call.
#[derive(Debug, Clone)]
pub struct SequenceGenerator<K: OpKind> {
    distribution: OperationDistribution<K>,
    key_strategy: KeyStrategy,
    value_strategy: ValueStrategy,
    min_len: usize,
    max_len: usize,
}

impl<K: OpKind> SequenceGenerator<K> {
    /// Create a generator.  The distribution should already be normalized.
    pub fn new(
        distribution: OperationDistribution<K>,
        key_strategy: KeyStrategy,
        value_strategy: ValueStrategy,
        min_len: usize,
        max_len: usize,
    ) -> Self {
        Self {
            distribution,
            key_strategy,
            value_strategy,
            min_len,
            max_len,
        }
    }

    /// Generate one sequence.
    ///
    /// The length is sampled once from the configured inclusive range, then
    /// each operation draws kind, key, value, in that order.
    pub fn generate(&self, rng: &mut ChaCha8Rng) -> OperationSequence<K> {
        let len = rng.gen_range(self.min_len..=self.max_len);
        let mut sequence = OperationSequence::with_capacity(len);
        let mut keys: Vec<Vec<u8>> = Vec::with_capacity(len);

        for _ in 0..len {
            let Some(kind) = self.distribution.sample(rng) else {
                break;
            };
            let key = self.key_strategy.generate(rng, &keys);
            let value = self.value_strategy.generate(rng);
            keys.push(key.clone());
            sequence.push(Operation::new(kind).with_key(key).with_value(value));
        }

        sequence
    }

    /// The configured distribution.
    pub fn distribution(&self) -> &OperationDistribution<K> {
        &self.distribution
    }
}

fn random_key(rng: &mut ChaCha8Rng, min_length: usize, max_length: usize) -> Vec<u8> {
    let length = rng.gen_range(min_length..=max_length);
    (0..length)
        .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())])
        .collect()
}
