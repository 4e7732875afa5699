// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Order-preserving column-key codecs.
//!
//! The wide-row core does not own the column-name wire format; it delegates
//! through [`KeyCodec`]. Implementations must be order-preserving: comparing
//! two encoded byte strings lexicographically must agree with comparing the
//! keys themselves, otherwise range boundaries select the wrong columns.

use std::io;

/// Encodes and decodes column keys to the column-name wire form.
pub trait KeyCodec<K>: Send + Sync {
    /// Encode a key into an order-preserving byte string.
    fn encode(&self, key: &K) -> Vec<u8>;

    /// Decode a column name back into a key.
    fn decode(&self, bytes: &[u8]) -> Result<K, io::Error>;
}

impl<K, T> KeyCodec<K> for &T
where T: KeyCodec<K>
{
    fn encode(&self, key: &K) -> Vec<u8> {
        (**self).encode(key)
    }

    fn decode(&self, bytes: &[u8]) -> Result<K, io::Error> {
        (**self).decode(bytes)
    }
}

/// Identity codec for `String` keys.
///
/// UTF-8 byte order agrees with `str` order, so no transformation is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8KeyCodec;

impl KeyCodec<String> for Utf8KeyCodec {
    fn encode(&self, key: &String) -> Vec<u8> {
        key.as_bytes().to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, io::Error> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Big-endian fixed-width codec for `u64` keys.
///
/// Big-endian byte order agrees with numeric order.
#[derive(Debug, Clone, Copy, Default)]
pub struct U64KeyCodec;

impl KeyCodec<u64> for U64KeyCodec {
    fn encode(&self, key: &u64) -> Vec<u8> {
        key.to_be_bytes().to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> Result<u64, io::Error> {
        let arr: [u8; 8] = bytes.try_into().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("u64 column name must be 8 bytes, got {}", bytes.len()),
            )
        })?;
        Ok(u64::from_be_bytes(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_round_trip() {
        let codec = Utf8KeyCodec;
        let key = "tag:rust".to_string();
        assert_eq!(codec.decode(&codec.encode(&key)).unwrap(), key);
    }

    #[test]
    fn test_utf8_rejects_invalid_bytes() {
        let codec = Utf8KeyCodec;
        assert!(codec.decode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_u64_round_trip_and_order() {
        let codec = U64KeyCodec;
        assert_eq!(codec.decode(&codec.encode(&42)).unwrap(), 42);

        // Encoded order must agree with numeric order.
        assert!(codec.encode(&1) < codec.encode(&2));
        assert!(codec.encode(&255) < codec.encode(&256));
        assert!(codec.encode(&(u64::MAX - 1)) < codec.encode(&u64::MAX));
    }

    #[test]
    fn test_u64_rejects_wrong_width() {
        let codec = U64KeyCodec;
        assert!(codec.decode(&[1, 2, 3]).is_err());
    }
}
