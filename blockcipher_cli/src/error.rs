// blockcipher_cli is a command-line driver for the streaming CBC
// block-cipher transform.
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

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("wrong key length for {algorithm:?}: need {needed} bytes, got {got}")]
    KeyLength {
        algorithm: blockcipher_core::Algorithm,
        needed: usize,
        got: usize,
    },

    #[error("a transform error occured: {0}")]
    Transform(#[from] blockcipher_core::TransformError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("hexadecimal decoding error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

pub type Result<T> = std::result::Result<T, Error>;
