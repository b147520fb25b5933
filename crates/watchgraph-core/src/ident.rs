//! # Opaque Identifier Codec
//!
//! Reversible mapping between internal `u64` keys and short opaque strings,
//! with one independent codec per entity namespace so identifiers cannot be
//! meaningfully cross-used between namespaces.
//!
//! ## Construction
//!
//! The whole family derives from one configured seed string:
//!
//! 1. the seed is digested with BLAKE3 (fixed 32-byte output);
//! 2. a 32-bit integer is taken from the first four digest bytes
//!    (little-endian);
//! 3. a ChaCha8 generator is seeded from that integer;
//! 4. one full-alphabet Fisher–Yates shuffle is drawn per namespace, in
//!    the order declared by [`Namespace::ORDER`].
//!
//! The draw order is part of the format: reordering it changes every
//! encoded identifier. Identical seed strings produce bit-identical
//! alphabets and encodings across restarts and platforms.
//!
//! ## Encoding scheme
//!
//! The first character of a codec's shuffled alphabet is its separator; the
//! remaining 61 characters are value digits (most significant first, zero
//! encodes as a single digit). A string may carry several integers joined by
//! single separators, but the public [`IdCodec::decode`] contract accepts
//! exactly one. Short outputs are padded up to [`MIN_LENGTH`]: one trailing
//! separator when a single character is missing, otherwise two separators
//! followed by filler digits derived from the value. Decoding stops at the
//! first empty segment, so padding never alters the decoded numbers.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::types::WatchGraphError;

/// Characters available to every codec, shuffled per namespace.
/// No character repeats; 1 separator + 61 value digits after shuffling.
const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Minimum length of every encoded identifier.
const MIN_LENGTH: usize = 8;

/// Step between consecutive filler digits when padding.
const FILL_STRIDE: usize = 7;

// =============================================================================
// NAMESPACES
// =============================================================================

/// Entity namespaces with independent codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Namespace {
    Graph,
    Node,
    Image,
    Template,
}

impl Namespace {
    /// The declared construction order. One alphabet shuffle is drawn per
    /// entry, from a single generator stream, in exactly this order.
    pub const ORDER: [Namespace; 4] = [
        Namespace::Graph,
        Namespace::Node,
        Namespace::Image,
        Namespace::Template,
    ];
}

// =============================================================================
// PER-NAMESPACE CODEC
// =============================================================================

/// A single namespace's encoder/decoder.
#[derive(Debug, Clone)]
pub struct IdCodec {
    alphabet: [u8; 62],
}

impl IdCodec {
    fn new(alphabet: [u8; 62]) -> Self {
        debug_assert!(
            {
                let mut seen = [false; 256];
                alphabet.iter().all(|&c| {
                    let fresh = !seen[c as usize];
                    seen[c as usize] = true;
                    fresh
                })
            },
            "codec alphabet must not repeat characters"
        );
        Self { alphabet }
    }

    fn separator(&self) -> u8 {
        self.alphabet[0]
    }

    fn digits(&self) -> &[u8] {
        &self.alphabet[1..]
    }

    fn digit_index(&self, byte: u8) -> Option<u64> {
        self.digits().iter().position(|&c| c == byte).map(|i| i as u64)
    }

    /// Encode one integer as an opaque string of at least [`MIN_LENGTH`]
    /// characters.
    pub fn encode(&self, value: u64) -> String {
        let digits = self.digits();
        let mut out = String::with_capacity(MIN_LENGTH);
        push_digits(&mut out, value, digits);

        if out.len() < MIN_LENGTH {
            let missing = MIN_LENGTH - out.len();
            out.push(self.separator() as char);
            if missing > 1 {
                out.push(self.separator() as char);
                let mut fill = (value % digits.len() as u64) as usize;
                for _ in 0..missing - 2 {
                    out.push(digits[fill] as char);
                    fill = (fill + FILL_STRIDE) % digits.len();
                }
            }
        }

        out
    }

    /// Decode an opaque string that must carry exactly one integer.
    ///
    /// Fails on the empty string, characters outside this namespace's
    /// alphabet, values overflowing `u64`, and strings carrying zero or
    /// more than one integer.
    pub fn decode(&self, id: &str) -> Result<u64, WatchGraphError> {
        match self.decode_all(id)?.as_slice() {
            [single] => Ok(*single),
            _ => Err(WatchGraphError::InvalidIdentifier),
        }
    }

    /// Decode every integer carried by the string, stopping at the first
    /// empty segment (the padding boundary).
    fn decode_all(&self, id: &str) -> Result<Vec<u64>, WatchGraphError> {
        if id.is_empty() {
            return Err(WatchGraphError::InvalidIdentifier);
        }

        let sep = self.separator();
        let base = self.digits().len() as u64;
        let mut values = Vec::new();
        let mut current: Option<u64> = None;

        for byte in id.bytes() {
            if byte == sep {
                match current.take() {
                    Some(value) => values.push(value),
                    None if values.is_empty() => return Err(WatchGraphError::InvalidIdentifier),
                    None => return Ok(values),
                }
            } else {
                let digit = self
                    .digit_index(byte)
                    .ok_or(WatchGraphError::InvalidIdentifier)?;
                let acc = current.unwrap_or(0);
                let next = acc
                    .checked_mul(base)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or(WatchGraphError::InvalidIdentifier)?;
                current = Some(next);
            }
        }

        if let Some(value) = current {
            values.push(value);
        }
        if values.is_empty() {
            return Err(WatchGraphError::InvalidIdentifier);
        }
        Ok(values)
    }
}

fn push_digits(out: &mut String, mut value: u64, digits: &[u8]) {
    let base = digits.len() as u64;
    // 61^11 > u64::MAX, so 11 digit positions always suffice.
    let mut buf = [0u8; 11];
    let mut start = buf.len();
    loop {
        start -= 1;
        buf[start] = digits[(value % base) as usize];
        value /= base;
        if value == 0 {
            break;
        }
    }
    for &byte in &buf[start..] {
        out.push(byte as char);
    }
}

// =============================================================================
// CODEC FAMILY
// =============================================================================

/// The per-namespace codec family, built once at startup from the
/// configured seed string and immutable thereafter.
#[derive(Debug, Clone)]
pub struct IdCodecs {
    graph: IdCodec,
    node: IdCodec,
    image: IdCodec,
    template: IdCodec,
}

impl IdCodecs {
    /// Derive the full family from a seed string. Deterministic: the same
    /// seed always yields the same four alphabets.
    pub fn from_seed(seed: &str) -> Self {
        let digest = blake3::hash(seed.as_bytes());
        let bytes = digest.as_bytes();
        let seed32 = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let mut rng = ChaCha8Rng::seed_from_u64(u64::from(seed32));

        // One labelled draw per namespace, in Namespace::ORDER.
        let graph = draw_codec(&mut rng);
        let node = draw_codec(&mut rng);
        let image = draw_codec(&mut rng);
        let template = draw_codec(&mut rng);

        Self { graph, node, image, template }
    }

    pub fn codec(&self, namespace: Namespace) -> &IdCodec {
        match namespace {
            Namespace::Graph => &self.graph,
            Namespace::Node => &self.node,
            Namespace::Image => &self.image,
            Namespace::Template => &self.template,
        }
    }

    pub fn graph(&self) -> &IdCodec {
        &self.graph
    }

    pub fn node(&self) -> &IdCodec {
        &self.node
    }

    pub fn image(&self) -> &IdCodec {
        &self.image
    }

    pub fn template(&self) -> &IdCodec {
        &self.template
    }
}

fn draw_codec(rng: &mut ChaCha8Rng) -> IdCodec {
    let mut alphabet = *ALPHABET;
    alphabet.shuffle(rng);
    IdCodec::new(alphabet)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn codecs() -> IdCodecs {
        IdCodecs::from_seed("unit-test-seed")
    }

    #[test]
    fn round_trips_representative_values() {
        let family = codecs();
        for namespace in Namespace::ORDER {
            let codec = family.codec(namespace);
            for value in [0, 1, 7, 60, 61, 62, 3721, 226_980, u64::MAX - 1, u64::MAX] {
                let encoded = codec.encode(value);
                assert_eq!(codec.decode(&encoded).unwrap(), value, "namespace {namespace:?}");
            }
        }
    }

    #[test]
    fn encodings_meet_minimum_length() {
        let family = codecs();
        for value in 0..500 {
            assert!(family.node().encode(value).len() >= 8);
        }
        assert!(family.node().encode(u64::MAX).len() >= 8);
    }

    #[test]
    fn same_seed_produces_identical_encodings() {
        let left = IdCodecs::from_seed("stable seed");
        let right = IdCodecs::from_seed("stable seed");
        for namespace in Namespace::ORDER {
            for value in [0u64, 42, 9_999_999] {
                assert_eq!(
                    left.codec(namespace).encode(value),
                    right.codec(namespace).encode(value)
                );
            }
        }
    }

    #[test]
    fn different_seeds_produce_different_encodings() {
        let left = IdCodecs::from_seed("seed-a");
        let right = IdCodecs::from_seed("seed-b");
        let differing = (0..32u64)
            .filter(|&v| left.graph().encode(v) != right.graph().encode(v))
            .count();
        assert!(differing > 0);
    }

    #[test]
    fn namespaces_have_distinct_alphabets() {
        let family = codecs();
        let order = Namespace::ORDER;
        for (i, a) in order.iter().enumerate() {
            for b in &order[i + 1..] {
                assert_ne!(
                    family.codec(*a).alphabet,
                    family.codec(*b).alphabet,
                    "{a:?} and {b:?} drew the same shuffle"
                );
            }
        }
    }

    #[test]
    fn cross_namespace_decode_never_preserves_the_integer() {
        for seed in ["alpha", "beta", "gamma", "delta"] {
            let family = IdCodecs::from_seed(seed);
            for value in [0u64, 5, 812, 44_021] {
                let encoded = family.graph().encode(value);
                match family.node().decode(&encoded) {
                    Ok(decoded) => assert_ne!(decoded, value, "seed {seed}"),
                    Err(WatchGraphError::InvalidIdentifier) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
        }
    }

    #[test]
    fn rejects_malformed_input() {
        let codec = codecs().graph().clone();
        assert!(matches!(codec.decode(""), Err(WatchGraphError::InvalidIdentifier)));
        assert!(matches!(codec.decode("not valid!"), Err(WatchGraphError::InvalidIdentifier)));
        assert!(matches!(codec.decode("héllo"), Err(WatchGraphError::InvalidIdentifier)));
    }

    #[test]
    fn rejects_multi_integer_strings() {
        let codec = codecs().node().clone();
        let mut two = String::new();
        two.push(codec.digits()[5] as char);
        two.push(codec.separator() as char);
        two.push(codec.digits()[9] as char);
        assert_eq!(codec.decode_all(&two).unwrap(), vec![5, 9]);
        assert!(matches!(codec.decode(&two), Err(WatchGraphError::InvalidIdentifier)));
    }

    #[test]
    fn rejects_values_overflowing_u64() {
        let codec = codecs().image().clone();
        // Twelve maximal digits always exceed u64::MAX.
        let top = *codec.digits().last().unwrap() as char;
        let oversized: String = std::iter::repeat_n(top, 12).collect();
        assert!(matches!(codec.decode(&oversized), Err(WatchGraphError::InvalidIdentifier)));
    }

    #[test]
    fn leading_separator_is_invalid() {
        let codec = codecs().graph().clone();
        let mut id = String::new();
        id.push(codec.separator() as char);
        id.push(codec.digits()[0] as char);
        assert!(matches!(codec.decode(&id), Err(WatchGraphError::InvalidIdentifier)));
    }
}
