//! Hashing utilities using aws-lc-rs

use aws_lc_rs::digest::{self, Algorithm, Context, SHA256, SHA384, SHA512};
use keyless_types::HashFunction;
use std::io::Read;

fn algorithm(function: HashFunction) -> &'static Algorithm {
    match function {
        HashFunction::Sha256 => &SHA256,
        HashFunction::Sha384 => &SHA384,
        HashFunction::Sha512 => &SHA512,
    }
}

/// Hash data in one shot
pub fn digest(function: HashFunction, data: &[u8]) -> Vec<u8> {
    digest::digest(algorithm(function), data).as_ref().to_vec()
}

/// Hash data using SHA-256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let digest = digest::digest(&SHA256, data);
    let mut result = [0u8; 32];
    result.copy_from_slice(digest.as_ref());
    result
}

/// Incremental hasher for any supported [`HashFunction`]
pub struct Hasher {
    function: HashFunction,
    context: Context,
}

impl Hasher {
    /// Create a new hasher
    pub fn new(function: HashFunction) -> Self {
        Self {
            function,
            context: Context::new(algorithm(function)),
        }
    }

    /// The function this hasher computes
    pub fn function(&self) -> HashFunction {
        self.function
    }

    /// Update the hasher with data
    pub fn update(&mut self, data: &[u8]) {
        self.context.update(data);
    }

    /// Feed everything `reader` yields into the hasher
    pub fn update_reader<R: Read + ?Sized>(&mut self, reader: &mut R) -> std::io::Result<u64> {
        let mut buf = [0u8; 8192];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => return Ok(total),
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            self.context.update(&buf[..n]);
            total += n as u64;
        }
    }

    /// Finalize and get the digest
    pub fn finalize(self) -> Vec<u8> {
        self.context.finish().as_ref().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let hash = sha256(b"hello");

        // Known SHA-256 hash of "hello"
        let expected =
            hex::decode("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
                .unwrap();
        assert_eq!(&hash[..], &expected[..]);
    }

    #[test]
    fn test_incremental_reader_matches_one_shot() {
        let data = vec![0x5au8; 20_000];
        for function in HashFunction::ALL {
            let mut hasher = Hasher::new(function);
            let read = hasher.update_reader(&mut data.as_slice()).unwrap();
            assert_eq!(read, data.len() as u64);
            let streamed = hasher.finalize();
            assert_eq!(streamed.len(), function.digest_size());
            assert_eq!(streamed, digest(function, &data));
        }
    }
}
