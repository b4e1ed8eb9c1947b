// blockcipher_core is a streaming CBC block-cipher transform library.
// Copyright (C) 2024  Himbeer <himbeerserverde@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

/// A `Buffer` is a growable, ordered byte sequence with amortised growth,
/// head removal, and positional insert/remove.
///
/// It is the transform's input/output staging area: a driver appends bytes
/// at one end and the transform consumes whole blocks from the front,
/// shifting the remainder left with [`Buffer::remove_head`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer with at least `capacity` bytes preallocated.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// The number of defined bytes, i.e. `self.data(0).len()`.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The number of bytes the buffer can hold before it must reallocate.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// A shared view of the bytes at or after `offset`.
    pub fn data(&self, offset: usize) -> &[u8] {
        &self.data[offset..]
    }

    /// A mutable view of the bytes at or after `offset`.
    pub fn data_mut(&mut self, offset: usize) -> &mut [u8] {
        &mut self.data[offset..]
    }

    /// The full contents as a shared slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Ensures `capacity() >= n`, preserving `[0, size())`.
    pub fn reserve(&mut self, n: usize) {
        if n > self.data.capacity() {
            self.data.reserve(n - self.data.len());
        }
    }

    /// Sets the logical size to `n`, growing capacity if needed.
    ///
    /// Bytes in `[old_size, n)` are zero-filled; the caller overwrites them
    /// before relying on their contents (matching the "unspecified until
    /// written" contract the spec allows, implemented here as the safe
    /// default rather than leaving them uninitialized).
    pub fn set_size(&mut self, n: usize) {
        self.data.resize(n, 0);
    }

    /// Appends `bytes` to the end of the buffer.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Prepends `bytes` to the start of the buffer.
    pub fn prepend(&mut self, bytes: &[u8]) {
        self.insert(0, bytes);
    }

    /// Inserts `bytes` at `pos`, shifting the tail right. `pos` must be `<= size()`.
    pub fn insert(&mut self, pos: usize, bytes: &[u8]) {
        assert!(pos <= self.data.len(), "insert position out of bounds");
        self.data.splice(pos..pos, bytes.iter().copied());
    }

    /// Removes `n` bytes starting at `pos`, shifting the tail left.
    /// Requires `pos + n <= size()`.
    pub fn remove(&mut self, pos: usize, n: usize) {
        assert!(pos + n <= self.data.len(), "remove range out of bounds");
        self.data.drain(pos..pos + n);
    }

    /// Removes the first `n` bytes, shifting the tail left. Requires `n <= size()`.
    pub fn remove_head(&mut self, n: usize) {
        self.remove(0, n);
    }

    /// Empties the buffer without releasing its capacity.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Consumes the buffer, returning its bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Encodes the buffer's contents as canonical MIME base64.
    ///
    /// `columns <= 0` produces a single unbroken line; otherwise a newline
    /// is inserted every `columns` characters.
    pub fn base64_encode(&self, columns: i64) -> String {
        let encoded = BASE64_STANDARD.encode(&self.data);
        if columns <= 0 {
            return encoded;
        }
        let columns = columns as usize;
        let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / columns + 1);
        for (i, chunk) in encoded.as_bytes().chunks(columns).enumerate() {
            if i > 0 {
                wrapped.push('\n');
            }
            wrapped.push_str(std::str::from_utf8(chunk).expect("base64 output is ASCII"));
        }
        wrapped
    }

    /// Decodes `s` as base64 (ignoring embedded whitespace) and replaces the
    /// buffer's contents with the decoded bytes.
    pub fn base64_decode(&mut self, s: &str) -> Result<(), base64::DecodeError> {
        let stripped: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        self.data = BASE64_STANDARD.decode(stripped.as_bytes())?;
        Ok(())
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }
}
