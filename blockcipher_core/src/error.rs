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

use crate::registry::Algorithm;

use thiserror::Error;

/// A `TransformError` indicates a failure condition surfaced by the
/// streaming block-cipher transform, its cipher adapter, or its buffers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum TransformError {
    /// Buffer growth failed. Unreachable via [`crate::buffer::Buffer`] on its
    /// own (the global allocator aborts the process on exhaustion instead);
    /// kept for parity with callers that plug in a fallible growth strategy.
    #[error("out of memory")]
    OutOfMemory,
    /// The requested algorithm has no registered transform descriptor.
    #[error("unknown or unavailable transform for algorithm {0:?}")]
    InvalidTransform(Algorithm),
    /// The supplied key is shorter than the cipher's required key length.
    #[error("key too short: need at least {needed} bytes, got {got}")]
    InvalidKeySize { needed: usize, got: usize },
    /// `Execute` was called with `last = true` before a full IV block had
    /// arrived on the decrypt side.
    #[error("not enough data to initialize transform")]
    InsufficientInitData,
    /// Decryption failed due to misaligned ciphertext or invalid padding.
    ///
    /// The two causes are deliberately collapsed into one variant: a driver
    /// that can distinguish "bad alignment" from "bad padding" has a padding
    /// oracle.
    #[error("decryption failed")]
    DecryptionFailed,
    /// `Execute` was called while the transform was in an invalid status.
    #[error("transform called in an invalid status")]
    InvalidStatus,
    /// The underlying cipher provider reported a failure
    /// (`set_key`, `set_iv`, `encrypt`, `decrypt`, `open`, or `random`).
    #[error("cipher operation failed")]
    CryptoFailed,
}

pub type Result<T> = std::result::Result<T, TransformError>;
