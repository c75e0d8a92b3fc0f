use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use ocfl_types::{Digest, DigestAlgorithm};
use sha2::Digest as _;

use crate::error::{DigestError, DigestResult};

const BUFFER_SIZE: usize = 64 * 1024;

enum Hasher {
    Blake3(Box<blake3::Hasher>),
    Md5(md5::Context),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
}

impl Hasher {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            DigestAlgorithm::Md5 => Self::Md5(md5::Context::new()),
            DigestAlgorithm::Sha1 => Self::Sha1(sha1::Sha1::new()),
            DigestAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            DigestAlgorithm::Sha512 => Self::Sha512(sha2::Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Blake3(h) => {
                h.update(data);
            }
            Self::Md5(ctx) => ctx.consume(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    fn finalize(self) -> Digest {
        match self {
            Self::Blake3(h) => Digest::from_bytes(h.finalize().as_bytes()),
            Self::Md5(ctx) => Digest::from_bytes(&ctx.compute().0),
            Self::Sha1(h) => Digest::from_bytes(&h.finalize()),
            Self::Sha256(h) => Digest::from_bytes(&h.finalize()),
            Self::Sha512(h) => Digest::from_bytes(&h.finalize()),
        }
    }
}

/// Incremental digester feeding one byte stream into several algorithms.
///
/// Implements [`Write`] so it can sit at the end of `io::copy` or be teed
/// with a destination writer.
pub struct Digester {
    hashers: BTreeMap<DigestAlgorithm, Hasher>,
    bytes: u64,
}

impl Digester {
    /// Digester for the given algorithms. Duplicates are ignored.
    pub fn new(algorithms: impl IntoIterator<Item = DigestAlgorithm>) -> Self {
        let hashers = algorithms
            .into_iter()
            .map(|alg| (alg, Hasher::new(alg)))
            .collect();
        Self { hashers, bytes: 0 }
    }

    pub fn update(&mut self, data: &[u8]) {
        for hasher in self.hashers.values_mut() {
            hasher.update(data);
        }
        self.bytes += data.len() as u64;
    }

    /// Bytes consumed so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn algorithms(&self) -> impl Iterator<Item = DigestAlgorithm> + '_ {
        self.hashers.keys().copied()
    }

    pub fn finalize(self) -> DigestSet {
        DigestSet(
            self.hashers
                .into_iter()
                .map(|(alg, hasher)| (alg, hasher.finalize()))
                .collect(),
        )
    }
}

impl Write for Digester {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Digests of one byte stream, keyed by algorithm.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DigestSet(BTreeMap<DigestAlgorithm, Digest>);

impl DigestSet {
    pub fn get(&self, algorithm: DigestAlgorithm) -> Option<&Digest> {
        self.0.get(&algorithm)
    }

    /// Digest for `algorithm`, failing if it was not part of the computation.
    pub fn require(&self, algorithm: DigestAlgorithm) -> DigestResult<&Digest> {
        self.get(algorithm).ok_or(DigestError::NotComputed(algorithm))
    }

    pub fn iter(&self) -> impl Iterator<Item = (DigestAlgorithm, &Digest)> {
        self.0.iter().map(|(alg, d)| (*alg, d))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<DigestAlgorithm, Digest> {
        self.0
    }
}

/// Digest an in-memory buffer with one algorithm.
pub fn digest_bytes(algorithm: DigestAlgorithm, data: &[u8]) -> Digest {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Stream `reader` to the end through every algorithm.
pub fn digest_reader<R: Read + ?Sized>(
    reader: &mut R,
    algorithms: impl IntoIterator<Item = DigestAlgorithm>,
) -> io::Result<DigestSet> {
    let mut digester = Digester::new(algorithms);
    let mut buf = vec![0u8; BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        digester.update(&buf[..n]);
    }
    Ok(digester.finalize())
}

/// Copy `reader` into `writer`, digesting the bytes on the way through.
///
/// Returns the number of bytes copied and their digests. The writer is
/// flushed before returning.
pub fn copy_with_digests<R, W>(
    reader: &mut R,
    writer: &mut W,
    algorithms: impl IntoIterator<Item = DigestAlgorithm>,
) -> io::Result<(u64, DigestSet)>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut digester = Digester::new(algorithms);
    let mut buf = vec![0u8; BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        digester.update(&buf[..n]);
    }
    writer.flush()?;
    let bytes = digester.bytes();
    Ok((bytes, digester.finalize()))
}

/// Stream `reader` and check it against `expected`.
pub fn verify_reader<R: Read + ?Sized>(
    reader: &mut R,
    algorithm: DigestAlgorithm,
    expected: &Digest,
) -> DigestResult<()> {
    let digests = digest_reader(reader, [algorithm])?;
    let computed = digests.require(algorithm)?;
    if computed != expected {
        return Err(DigestError::Mismatch {
            algorithm,
            expected: expected.clone(),
            computed: computed.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use proptest::prelude::*;

    use super::*;

    const ABC_SHA512: &str = "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f";
    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
    const ABC_SHA1: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";
    const ABC_MD5: &str = "900150983cd24fb0d6963f7d28e17f72";
    const EMPTY_SHA512: &str = "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e";

    #[test]
    fn known_vectors() {
        assert_eq!(digest_bytes(DigestAlgorithm::Sha512, b"abc").as_str(), ABC_SHA512);
        assert_eq!(digest_bytes(DigestAlgorithm::Sha256, b"abc").as_str(), ABC_SHA256);
        assert_eq!(digest_bytes(DigestAlgorithm::Sha1, b"abc").as_str(), ABC_SHA1);
        assert_eq!(digest_bytes(DigestAlgorithm::Md5, b"abc").as_str(), ABC_MD5);
        assert_eq!(digest_bytes(DigestAlgorithm::Sha512, b"").as_str(), EMPTY_SHA512);
    }

    #[test]
    fn blake3_matches_crate_output() {
        let expected = blake3::hash(b"abc");
        assert_eq!(
            digest_bytes(DigestAlgorithm::Blake3, b"abc").as_str(),
            expected.to_hex().as_str()
        );
    }

    #[test]
    fn one_pass_feeds_every_algorithm() {
        let mut reader = Cursor::new(b"abc".to_vec());
        let set = digest_reader(
            &mut reader,
            [DigestAlgorithm::Sha512, DigestAlgorithm::Md5, DigestAlgorithm::Sha512],
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(DigestAlgorithm::Sha512).unwrap().as_str(), ABC_SHA512);
        assert_eq!(set.get(DigestAlgorithm::Md5).unwrap().as_str(), ABC_MD5);
        assert!(set.get(DigestAlgorithm::Sha1).is_none());
        assert!(matches!(
            set.require(DigestAlgorithm::Sha1),
            Err(DigestError::NotComputed(DigestAlgorithm::Sha1))
        ));
    }

    #[test]
    fn copy_writes_and_digests() {
        let data = vec![7u8; BUFFER_SIZE * 2 + 17];
        let mut out = Vec::new();
        let (n, set) =
            copy_with_digests(&mut Cursor::new(&data), &mut out, [DigestAlgorithm::Sha256]).unwrap();
        assert_eq!(n, data.len() as u64);
        assert_eq!(out, data);
        assert_eq!(
            set.get(DigestAlgorithm::Sha256).unwrap(),
            &digest_bytes(DigestAlgorithm::Sha256, &data)
        );
    }

    #[test]
    fn digester_as_writer() {
        let mut digester = Digester::new([DigestAlgorithm::Sha1]);
        digester.write_all(b"ab").unwrap();
        digester.write_all(b"c").unwrap();
        assert_eq!(digester.bytes(), 3);
        let set = digester.finalize();
        assert_eq!(set.get(DigestAlgorithm::Sha1).unwrap().as_str(), ABC_SHA1);
    }

    #[test]
    fn verify_detects_mismatch() {
        let good = Digest::from_hex(ABC_SHA256).unwrap();
        verify_reader(&mut Cursor::new(b"abc"), DigestAlgorithm::Sha256, &good).unwrap();

        let err = verify_reader(&mut Cursor::new(b"abd"), DigestAlgorithm::Sha256, &good).unwrap_err();
        assert!(matches!(err, DigestError::Mismatch { .. }));
        assert_eq!(err.kind(), ocfl_types::ErrorKind::DigestMismatch);
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_digest(data in proptest::collection::vec(any::<u8>(), 0..4096), split in 0usize..4096) {
            let split = split.min(data.len());
            let mut digester = Digester::new([DigestAlgorithm::Sha512]);
            digester.update(&data[..split]);
            digester.update(&data[split..]);
            let set = digester.finalize();
            prop_assert_eq!(
                set.get(DigestAlgorithm::Sha512).unwrap(),
                &digest_bytes(DigestAlgorithm::Sha512, &data)
            );
        }
    }
}
