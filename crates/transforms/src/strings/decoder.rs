//! Offline replicas of the string pool access wrappers. Each [`Decoder`]
//! replays one wrapper's calls against the extracted pool so the call sites
//! can be folded down to plain literals.

use alembic_core::printer::js_number;
use rustc_hash::FxHashMap;

/// The lowercase-first base64 alphabet the obfuscated shims embed.
const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+/=";

/// How a wrapper turns a pool entry into the original string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    /// Plain indexed lookup.
    Basic,
    /// Custom-alphabet base64, read back as UTF-8.
    Base64,
    /// Base64 layer, then an rc4 keystream XOR over UTF-16 units.
    Rc4,
}

/// A literal argument lifted from a wrapper call site.
#[derive(Debug, Clone)]
pub enum DecodeArg {
    Num(f64),
    Str(String),
}

/// Replays one pool wrapper. Basic lookups are stateless; the encoded kinds
/// memoize results the way the shims do, keyed on the index text plus the
/// pool head at call time so cached values track rotation.
#[derive(Debug)]
pub struct Decoder {
    kind: DecoderKind,
    offset: f64,
    cache: FxHashMap<String, String>,
    first_call: bool,
}

impl Decoder {
    pub fn new(kind: DecoderKind, offset: f64) -> Self {
        Decoder {
            kind,
            offset,
            cache: FxHashMap::default(),
            first_call: true,
        }
    }

    pub fn kind(&self) -> DecoderKind {
        self.kind
    }

    /// Replays one wrapper call. `None` stands in for every runtime failure:
    /// an index outside the pool, malformed base64, or a missing key.
    pub fn get_string(&mut self, pool: &[String], args: &[DecodeArg]) -> Option<String> {
        let index = match args.first() {
            Some(DecodeArg::Num(value)) => *value,
            _ => return None,
        };
        let slot = pool_index(index, self.offset, pool.len());
        match self.kind {
            DecoderKind::Basic => pool.get(slot?).cloned(),
            DecoderKind::Base64 => {
                let key = cache_key(index, pool);
                if let Some(hit) = self.cache.get(&key) {
                    return Some(hit.clone());
                }
                let value = base64_transform(pool.get(slot?)?)?;
                self.cache.insert(key, value.clone());
                Some(value)
            }
            DecoderKind::Rc4 => {
                let key = cache_key(index, pool);
                if let Some(hit) = self.cache.get(&key) {
                    return Some(hit.clone());
                }
                let rc4_key = match args.get(1) {
                    Some(DecodeArg::Str(value)) => value,
                    _ => return None,
                };
                let value = rc4_decode(pool.get(slot?)?, rc4_key)?;
                self.cache.insert(key, value.clone());
                Some(value)
            }
        }
    }

    /// Rotation replay variant. The shipped base64 and rc4 shims throw on
    /// their very first invocation, so the replica reports one failure before
    /// behaving like [`Decoder::get_string`].
    pub fn get_string_for_rotation(&mut self, pool: &[String], args: &[DecodeArg]) -> Option<String> {
        if self.kind != DecoderKind::Basic && self.first_call {
            self.first_call = false;
            return None;
        }
        self.get_string(pool, args)
    }
}

fn cache_key(index: f64, pool: &[String]) -> String {
    let head = pool.first().map(String::as_str).unwrap_or_default();
    format!("{}{head}", js_number(index))
}

fn pool_index(index: f64, offset: f64, len: usize) -> Option<usize> {
    let slot = index + offset;
    if slot < 0.0 || slot.fract() != 0.0 || slot >= len as f64 {
        return None;
    }
    Some(slot as usize)
}

/// Decodes the custom-alphabet base64 variant, then reads the raw bytes back
/// as UTF-8. Characters outside the alphabet are skipped, matching the shim.
pub fn base64_transform(encoded: &str) -> Option<String> {
    let mut bytes = Vec::new();
    let mut buffer: u32 = 0;
    let mut count: u64 = 0;
    for ch in encoded.chars() {
        let Some(value) = ALPHABET.find(ch) else {
            continue;
        };
        buffer = if count % 4 != 0 {
            buffer * 64 + value as u32
        } else {
            value as u32
        };
        let emit = count % 4 != 0;
        count += 1;
        if emit {
            let shift = match count % 4 {
                2 => 4,
                3 => 2,
                _ => 0,
            };
            bytes.push((buffer >> shift) as u8);
        }
    }
    String::from_utf8(bytes).ok()
}

/// Replays the rc4 shim: the base64 layer first, then a keystream XOR over
/// the UTF-16 code units of the intermediate string.
pub fn rc4_decode(encoded: &str, key: &str) -> Option<String> {
    let transformed = base64_transform(encoded)?;
    let key_units: Vec<u16> = key.encode_utf16().collect();
    if key_units.is_empty() {
        return None;
    }
    let mut state: [u8; 256] = std::array::from_fn(|i| i as u8);
    let mut j = 0usize;
    for i in 0..256 {
        j = (j + state[i] as usize + key_units[i % key_units.len()] as usize) % 256;
        state.swap(i, j);
    }
    let mut i = 0usize;
    let mut j = 0usize;
    let mut output = Vec::new();
    for unit in transformed.encode_utf16() {
        i = (i + 1) % 256;
        j = (j + state[i] as usize) % 256;
        state.swap(i, j);
        let keystream = state[(state[i] as usize + state[j] as usize) % 256];
        output.push(unit ^ keystream as u16);
    }
    String::from_utf16(&output).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_custom_alphabet_decodes() {
        assert_eq!(base64_transform("Agv5").as_deref(), Some("hey"));
        assert_eq!(base64_transform("y2fI").as_deref(), Some("cab"));
        assert_eq!(base64_transform("Agv5y2fI").as_deref(), Some("heycab"));
    }

    #[test]
    fn foreign_characters_are_skipped() {
        assert_eq!(base64_transform("A gv\n5!").as_deref(), Some("hey"));
    }

    #[test]
    fn bytes_that_are_not_utf8_fail() {
        // "/8" decodes to the lone byte 0xff.
        assert_eq!(base64_transform("/8"), None);
    }

    #[test]
    fn rc4_matches_the_reference_vector() {
        // RC4("Key", "Plaintext") = bbf316e8d940af0ad3, re-encoded with the
        // shim's base64 flavor over its UTF-8 expansion.
        assert_eq!(
            rc4_decode("WRVdSXBdQmozqmkVcSot", "Key").as_deref(),
            Some("Plaintext")
        );
    }

    #[test]
    fn basic_lookups_respect_offset_and_bounds() {
        let pool = vec!["alpha".to_string(), "beta".to_string()];
        let mut decoder = Decoder::new(DecoderKind::Basic, -1.0);
        let args = [DecodeArg::Num(1.0)];
        assert_eq!(decoder.get_string(&pool, &args).as_deref(), Some("alpha"));
        assert_eq!(decoder.get_string(&pool, &[DecodeArg::Num(9.0)]), None);
        assert_eq!(decoder.get_string(&pool, &[DecodeArg::Num(1.5)]), None);
    }

    #[test]
    fn encoded_kinds_fail_their_first_rotation_call() {
        let pool = vec!["Agv5".to_string()];
        let mut decoder = Decoder::new(DecoderKind::Base64, 0.0);
        let args = [DecodeArg::Num(0.0)];
        assert_eq!(decoder.get_string_for_rotation(&pool, &args), None);
        assert_eq!(
            decoder.get_string_for_rotation(&pool, &args).as_deref(),
            Some("hey")
        );

        let mut basic = Decoder::new(DecoderKind::Basic, 0.0);
        assert_eq!(
            basic.get_string_for_rotation(&pool, &args).as_deref(),
            Some("Agv5")
        );
    }

    #[test]
    fn the_cache_follows_the_pool_head() {
        let mut pool = vec!["Agv5".to_string()];
        let mut decoder = Decoder::new(DecoderKind::Base64, 0.0);
        let args = [DecodeArg::Num(0.0)];
        assert_eq!(decoder.get_string(&pool, &args).as_deref(), Some("hey"));
        // A different head means a different cache key, so the stale entry
        // cannot shadow the fresh pool contents.
        pool[0] = "y2fI".to_string();
        assert_eq!(decoder.get_string(&pool, &args).as_deref(), Some("cab"));
    }

    #[test]
    fn rc4_requires_its_key_argument() {
        let pool = vec!["WRVdSXBdQmozqmkVcSot".to_string()];
        let mut decoder = Decoder::new(DecoderKind::Rc4, 0.0);
        assert_eq!(decoder.get_string(&pool, &[DecodeArg::Num(0.0)]), None);
        let args = [DecodeArg::Num(0.0), DecodeArg::Str("Key".to_string())];
        assert_eq!(
            decoder.get_string(&pool, &args).as_deref(),
            Some("Plaintext")
        );
    }
}
