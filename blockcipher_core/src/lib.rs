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

mod error;
pub use error::*;

pub mod buffer;
pub mod cipher;
pub mod registry;
pub mod transform;

pub use buffer::Buffer;
pub use cipher::Direction;
pub use registry::{Algorithm, Descriptor};
pub use transform::Transform;
