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
use crate::{Result, TransformError};

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use des::TdesEde3;
use rand::RngCore;
use zeroize::Zeroizing;

/// The direction a [`crate::transform::Transform`] (and therefore its
/// [`CipherSession`]) is fixed to for its whole lifetime.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

macro_rules! ciphers {
    ({ $($variant:ident($enc:ty, $dec:ty)),+ $(,)? }) => {
        enum Encryptors {
            $($variant($enc)),+
        }

        enum Decryptors {
            $($variant($dec)),+
        }

        impl Encryptors {
            fn new(algorithm: Algorithm, key: &[u8], iv: &[u8]) -> Self {
                match algorithm {
                    $(Algorithm::$variant => Encryptors::$variant(<$enc>::new(key.into(), iv.into()))),+
                }
            }

            fn encrypt_blocks(&mut self, block_len: usize, buf: &mut [u8]) {
                match self {
                    $(Encryptors::$variant(c) => {
                        for block in buf.chunks_exact_mut(block_len) {
                            c.encrypt_block_mut(block.into());
                        }
                    }),+
                }
            }
        }

        impl Decryptors {
            fn new(algorithm: Algorithm, key: &[u8], iv: &[u8]) -> Self {
                match algorithm {
                    $(Algorithm::$variant => Decryptors::$variant(<$dec>::new(key.into(), iv.into()))),+
                }
            }

            fn decrypt_blocks(&mut self, block_len: usize, buf: &mut [u8]) {
                match self {
                    $(Decryptors::$variant(c) => {
                        for block in buf.chunks_exact_mut(block_len) {
                            c.decrypt_block_mut(block.into());
                        }
                    }),+
                }
            }
        }
    };
}

ciphers!({
    TripleDesCbc(cbc::Encryptor<TdesEde3>, cbc::Decryptor<TdesEde3>),
    Aes128Cbc(cbc::Encryptor<Aes128>, cbc::Decryptor<Aes128>),
    Aes192Cbc(cbc::Encryptor<Aes192>, cbc::Decryptor<Aes192>),
    Aes256Cbc(cbc::Encryptor<Aes256>, cbc::Decryptor<Aes256>),
});

enum Keying {
    /// Key (if any) has been supplied but the IV has not, so the concrete
    /// RustCrypto CBC cipher (which needs both simultaneously) can't be
    /// constructed yet.
    Unkeyed {
        key: Option<Zeroizing<Vec<u8>>>,
    },
    Encrypting(Encryptors),
    Decrypting(Decryptors),
}

/// A façade over the RustCrypto CBC block cipher stack, playing the role of
/// `spec.md` §4.B's cipher primitive adapter: open, set key, set IV,
/// encrypt/decrypt in place, close.
pub struct CipherSession {
    algorithm: Algorithm,
    direction: Direction,
    keying: Keying,
}

impl CipherSession {
    /// Opens a session for `algorithm` in CBC mode. The direction is fixed
    /// for the session's lifetime, matching the driver contract in `spec.md` §6.
    pub fn open(algorithm: Algorithm, direction: Direction) -> Self {
        Self {
            algorithm,
            direction,
            keying: Keying::Unkeyed { key: None },
        }
    }

    pub fn block_len(&self) -> usize {
        self.algorithm.block_len()
    }

    pub fn key_len(&self) -> usize {
        self.algorithm.key_len()
    }

    /// Supplies the raw key. Only the first `key_len()` bytes are used;
    /// fails with [`TransformError::InvalidKeySize`] if fewer are given.
    pub fn set_key(&mut self, key: &[u8]) -> Result<()> {
        let needed = self.key_len();
        if key.len() < needed {
            return Err(TransformError::InvalidKeySize {
                needed,
                got: key.len(),
            });
        }

        match &mut self.keying {
            Keying::Unkeyed { key: stored } => {
                *stored = Some(Zeroizing::new(key[..needed].to_vec()));
                Ok(())
            }
            _ => Err(TransformError::CryptoFailed),
        }
    }

    /// Supplies the IV (exactly `block_len()` bytes) and, now that both key
    /// and IV are present, constructs the concrete CBC encryptor/decryptor.
    pub fn set_iv(&mut self, iv: &[u8]) -> Result<()> {
        if iv.len() != self.block_len() {
            return Err(TransformError::CryptoFailed);
        }

        let key = match &mut self.keying {
            Keying::Unkeyed { key: Some(key) } => key.clone(),
            _ => return Err(TransformError::CryptoFailed),
        };

        self.keying = match self.direction {
            Direction::Encrypt => Keying::Encrypting(Encryptors::new(self.algorithm, &key, iv)),
            Direction::Decrypt => Keying::Decrypting(Decryptors::new(self.algorithm, &key, iv)),
        };
        Ok(())
    }

    /// Encrypts `buf` in place. `buf.len()` must be a nonzero multiple of `block_len()`.
    pub fn encrypt(&mut self, buf: &mut [u8]) -> Result<()> {
        let block_len = self.block_len();
        if buf.is_empty() || !buf.len().is_multiple_of(block_len) {
            return Err(TransformError::CryptoFailed);
        }
        match &mut self.keying {
            Keying::Encrypting(enc) => {
                enc.encrypt_blocks(block_len, buf);
                Ok(())
            }
            _ => Err(TransformError::CryptoFailed),
        }
    }

    /// Decrypts `buf` in place. `buf.len()` must be a nonzero multiple of `block_len()`.
    pub fn decrypt(&mut self, buf: &mut [u8]) -> Result<()> {
        let block_len = self.block_len();
        if buf.is_empty() || !buf.len().is_multiple_of(block_len) {
            return Err(TransformError::CryptoFailed);
        }
        match &mut self.keying {
            Keying::Decrypting(dec) => {
                dec.decrypt_blocks(block_len, buf);
                Ok(())
            }
            _ => Err(TransformError::CryptoFailed),
        }
    }
}

/// Fills `dst` with cryptographically strong random bytes, the same
/// `rand::thread_rng()` CSPRNG idiom used throughout this codebase's
/// companion tooling for nonce and verifier generation.
pub fn random(dst: &mut [u8]) {
    rand::thread_rng().fill_bytes(dst);
}
