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

mod error;
use error::*;

use blockcipher_core::{Algorithm, Buffer, Direction, Transform};

use std::io::{self, Read, Write};

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read plaintext from stdin, write IV-prefixed ciphertext to stdout.
    Encrypt {
        #[command(flatten)]
        shared: Shared,
    },
    /// Read IV-prefixed ciphertext from stdin, write plaintext to stdout.
    Decrypt {
        #[command(flatten)]
        shared: Shared,
    },
}

#[derive(clap::Args)]
struct Shared {
    /// Which CBC cipher to drive.
    #[arg(short, long, value_enum)]
    algorithm: AlgorithmArg,
    /// Raw key bytes, hex-encoded.
    #[arg(short, long)]
    key: String,
    /// How many bytes to read from stdin per driver loop iteration.
    ///
    /// Deliberately defaults smaller than a cipher block so a plain `encrypt`
    /// or `decrypt` invocation already exercises the chunk-invariant code
    /// paths, not just a single block-aligned call.
    #[arg(long, default_value_t = 5)]
    chunk_size: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    Tdes,
    Aes128,
    Aes192,
    Aes256,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Tdes => Algorithm::TripleDesCbc,
            AlgorithmArg::Aes128 => Algorithm::Aes128Cbc,
            AlgorithmArg::Aes192 => Algorithm::Aes192Cbc,
            AlgorithmArg::Aes256 => Algorithm::Aes256Cbc,
        }
    }
}

fn main() {
    match logic() {
        Ok(_) => {}
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn logic() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Encrypt { shared } => run(shared, Direction::Encrypt),
        Commands::Decrypt { shared } => run(shared, Direction::Decrypt),
    }
}

/// Drives a [`Transform`] end to end over stdin/stdout: the exact driver
/// contract from the library's documentation (append bytes, call `execute`,
/// drain output, final call with `last = true`), run with a caller-chosen
/// chunk size so it doubles as a conformance check of that contract.
fn run(shared: Shared, direction: Direction) -> Result<()> {
    let algorithm: Algorithm = shared.algorithm.into();
    let key = hex::decode(&shared.key)?;

    if key.len() < algorithm.key_len() {
        return Err(Error::KeyLength {
            algorithm,
            needed: algorithm.key_len(),
            got: key.len(),
        });
    }

    let mut transform = Transform::new(algorithm, direction)?;
    transform.set_key(&key)?;

    let stdin = io::stdin();
    let mut stdin = stdin.lock();
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    let mut in_buffer = Buffer::new();
    let mut out_buffer = Buffer::new();
    let mut chunk = vec![0u8; shared.chunk_size.max(1)];

    loop {
        let n = stdin.read(&mut chunk)?;
        let last = n == 0;
        in_buffer.append(&chunk[..n]);

        transform.execute(&mut in_buffer, &mut out_buffer, last)?;
        stdout.write_all(out_buffer.as_slice())?;
        out_buffer.clear();

        if last {
            break;
        }
    }

    stdout.flush()?;
    Ok(())
}
