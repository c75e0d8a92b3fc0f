//! Reading and writing `inventory.json` with its digest sidecar.

use ocfl_digest::digest_bytes;
use ocfl_fs::{path, ReadFs, WriteFs};
use ocfl_types::{Digest, DigestAlgorithm, VersionLabel};
use tracing::debug;

use crate::error::{InventoryError, InventoryResult};
use crate::inventory::Inventory;

pub const INVENTORY_FILE: &str = "inventory.json";

/// Sidecar file name for `algorithm`, e.g. `inventory.json.sha512`.
pub fn sidecar_name(algorithm: DigestAlgorithm) -> String {
    format!("{INVENTORY_FILE}.{algorithm}")
}

/// Sidecar contents: `"<digest> inventory.json"` and a newline.
pub fn sidecar_line(digest: &Digest) -> String {
    format!("{digest} {INVENTORY_FILE}\n")
}

/// Parse sidecar contents into the recorded digest.
pub fn parse_sidecar(path: &str, text: &str) -> InventoryResult<Digest> {
    let malformed = |reason: &str| InventoryError::MalformedSidecar {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    let mut parts = text.split_whitespace();
    let digest = parts.next().ok_or_else(|| malformed("empty file"))?;
    match (parts.next(), parts.next()) {
        (Some(INVENTORY_FILE), None) => {}
        _ => return Err(malformed("expected \"<digest> inventory.json\"")),
    }
    Digest::from_hex(digest).map_err(|_| malformed("digest is not hex"))
}

/// Locate the sidecar next to the inventory in `dir`.
///
/// Returns the algorithm taken from the sidecar's extension and the sidecar
/// path. Fails when there is no sidecar or its extension is not a known
/// algorithm.
pub fn find_sidecar(fs: &dyn ReadFs, dir: &str) -> InventoryResult<(DigestAlgorithm, String)> {
    let prefix = format!("{INVENTORY_FILE}.");
    for entry in fs.read_dir(dir)? {
        if entry.is_dir {
            continue;
        }
        if let Some(suffix) = entry.name.strip_prefix(&prefix) {
            let algorithm = suffix.parse::<DigestAlgorithm>()?;
            return Ok((algorithm, path::join(dir, &entry.name)?));
        }
    }
    Err(InventoryError::MissingSidecar(dir.to_string()))
}

/// Read the inventory bytes in `dir` and check them against the sidecar.
///
/// Returns the verified bytes and their digest. Nothing is parsed before
/// the digest matches.
pub fn read_verified(fs: &dyn ReadFs, dir: &str) -> InventoryResult<(Vec<u8>, DigestAlgorithm, Digest)> {
    let inventory_path = path::join(dir, INVENTORY_FILE)?;
    let data = fs.read_file(&inventory_path)?;
    let (algorithm, sidecar_path) = find_sidecar(fs, dir)?;
    let sidecar = fs.read_file(&sidecar_path)?;
    let expected = parse_sidecar(&sidecar_path, &String::from_utf8_lossy(&sidecar))?;
    let computed = digest_bytes(algorithm, &data);
    if computed != expected {
        return Err(InventoryError::DigestMismatch {
            path: inventory_path,
            expected,
            computed,
        });
    }
    Ok((data, algorithm, computed))
}

/// Load and verify the inventory stored in `dir`.
pub fn read_inventory(fs: &dyn ReadFs, dir: &str) -> InventoryResult<Inventory> {
    let (data, algorithm, digest) = read_verified(fs, dir)?;
    let inventory = Inventory::from_json(&data)?;
    if inventory.digest_algorithm() != algorithm {
        return Err(InventoryError::Structure(format!(
            "sidecar uses {algorithm} but inventory declares {}",
            inventory.digest_algorithm()
        )));
    }
    debug!(
        object_id = %inventory.id(),
        digest = %digest.short_hex(),
        "loaded inventory"
    );
    Ok(inventory)
}

/// Serialize `inventory` and write it with its sidecar.
///
/// With `version` set, a copy goes into the version directory first; the
/// object root copy is replaced last so a failure never leaves the root
/// pointing at a version whose directory is incomplete.
pub fn write_inventory(
    fs: &dyn WriteFs,
    inventory: &Inventory,
    version: Option<VersionLabel>,
) -> InventoryResult<Digest> {
    let data = inventory.to_canonical_json()?;
    let algorithm = inventory.digest_algorithm();
    let digest = digest_bytes(algorithm, &data);
    let sidecar = sidecar_line(&digest);

    if let Some(label) = version {
        let dir = label.to_string();
        fs.write_file(&path::join(&dir, INVENTORY_FILE)?, &data)?;
        fs.write_file(&path::join(&dir, &sidecar_name(algorithm))?, sidecar.as_bytes())?;
    }
    fs.replace_file(INVENTORY_FILE, &data)?;
    fs.replace_file(&sidecar_name(algorithm), sidecar.as_bytes())?;
    debug!(object_id = %inventory.id(), digest = %digest.short_hex(), "wrote inventory");
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use ocfl_fs::MemoryFs;
    use ocfl_types::OcflVersion;

    use super::*;

    fn committed(fs: &MemoryFs) -> Inventory {
        let mut inv = Inventory::new("obj-1", DigestAlgorithm::Sha256, OcflVersion::V1_1).unwrap();
        inv.begin_version(Some("first".into()), None, false).unwrap();
        let digest = digest_bytes(DigestAlgorithm::Sha256, b"hello");
        inv.add_digest(&digest, "hello.txt", Some("v1/content/hello.txt"), false)
            .unwrap();
        inv.commit(fs).unwrap();
        inv
    }

    #[test]
    fn sidecar_round_trip() {
        let digest = Digest::from_hex("abc123").unwrap();
        let line = sidecar_line(&digest);
        assert_eq!(line, "abc123 inventory.json\n");
        assert_eq!(parse_sidecar("s", &line).unwrap(), digest);
        // tabs are tolerated
        assert_eq!(parse_sidecar("s", "abc123\tinventory.json").unwrap(), digest);
    }

    #[test]
    fn malformed_sidecars() {
        assert!(parse_sidecar("s", "").is_err());
        assert!(parse_sidecar("s", "abc123").is_err());
        assert!(parse_sidecar("s", "abc123 other.json").is_err());
        assert!(parse_sidecar("s", "zz inventory.json").is_err());
    }

    #[test]
    fn write_then_read_verifies() {
        let fs = MemoryFs::new();
        let inv = committed(&fs);
        let loaded = read_inventory(&fs, "").unwrap();
        assert_eq!(loaded, inv);
        let copy = read_inventory(&fs, "v1").unwrap();
        assert_eq!(copy, inv);

        let sidecar = fs.read_file("inventory.json.sha256").unwrap();
        let recorded = parse_sidecar("s", std::str::from_utf8(&sidecar).unwrap()).unwrap();
        let bytes = fs.read_file("inventory.json").unwrap();
        assert_eq!(recorded, digest_bytes(DigestAlgorithm::Sha256, &bytes));
    }

    #[test]
    fn tampered_inventory_fails_to_load() {
        let fs = MemoryFs::new();
        committed(&fs);
        let mut bytes = fs.read_file("inventory.json").unwrap();
        let pos = bytes.iter().position(|b| *b == b'f').unwrap();
        bytes[pos] = b'F';
        fs.write_file("inventory.json", &bytes).unwrap();

        let err = read_inventory(&fs, "").unwrap_err();
        assert!(matches!(err, InventoryError::DigestMismatch { .. }));
        assert_eq!(err.kind(), ocfl_types::ErrorKind::DigestMismatch);
    }

    #[test]
    fn missing_sidecar_fails_to_load() {
        let fs = MemoryFs::new();
        committed(&fs);
        fs.remove("inventory.json.sha256").unwrap();
        assert!(matches!(
            read_inventory(&fs, ""),
            Err(InventoryError::MissingSidecar(_))
        ));
    }
}
