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

/// The CBC block ciphers this core knows how to drive.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Algorithm {
    TripleDesCbc,
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
}

impl Algorithm {
    /// The cipher's native block size in bytes. Also the IV length.
    pub const fn block_len(self) -> usize {
        match self {
            Algorithm::TripleDesCbc => 8,
            Algorithm::Aes128Cbc | Algorithm::Aes192Cbc | Algorithm::Aes256Cbc => 16,
        }
    }

    /// The cipher's required key length in bytes.
    pub const fn key_len(self) -> usize {
        match self {
            Algorithm::TripleDesCbc => 24,
            Algorithm::Aes128Cbc => 16,
            Algorithm::Aes192Cbc => 24,
            Algorithm::Aes256Cbc => 32,
        }
    }
}

/// Immutable metadata describing one of the registry's supported transforms.
///
/// Mirrors the descriptor record of `spec.md` §3/§4.D: a display name, a
/// stable URI reference (the XML Encryption namespace identifier this
/// algorithm corresponds to), and the algorithm it binds to the transform
/// state machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Descriptor {
    pub name: &'static str,
    pub uri: &'static str,
    pub algorithm: Algorithm,
}

const DESCRIPTORS: [Descriptor; 4] = [
    Descriptor {
        name: "3DES-CBC",
        uri: "http://www.w3.org/2001/04/xmlenc#tripledes-cbc",
        algorithm: Algorithm::TripleDesCbc,
    },
    Descriptor {
        name: "AES-128-CBC",
        uri: "http://www.w3.org/2001/04/xmlenc#aes128-cbc",
        algorithm: Algorithm::Aes128Cbc,
    },
    Descriptor {
        name: "AES-192-CBC",
        uri: "http://www.w3.org/2001/04/xmlenc#aes192-cbc",
        algorithm: Algorithm::Aes192Cbc,
    },
    Descriptor {
        name: "AES-256-CBC",
        uri: "http://www.w3.org/2001/04/xmlenc#aes256-cbc",
        algorithm: Algorithm::Aes256Cbc,
    },
];

impl Descriptor {
    /// Looks up the static descriptor for `algorithm`. Infallible: every
    /// [`Algorithm`] variant has exactly one descriptor.
    pub fn for_algorithm(algorithm: Algorithm) -> &'static Descriptor {
        DESCRIPTORS
            .iter()
            .find(|d| d.algorithm == algorithm)
            .expect("every Algorithm variant has a registered descriptor")
    }

    /// All registered descriptors, in table order.
    pub fn all() -> &'static [Descriptor] {
        &DESCRIPTORS
    }

    /// Looks up a descriptor by its XML Encryption URI reference.
    pub fn by_uri(uri: &str) -> Option<&'static Descriptor> {
        DESCRIPTORS.iter().find(|d| d.uri == uri)
    }
}
