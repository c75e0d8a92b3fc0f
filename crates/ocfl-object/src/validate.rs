//! File level validation of a stored object.
//!
//! Works on the raw filesystem, so an object that fails to load can still be
//! reported on. Structural checks of the parsed inventory come from
//! [`Inventory::validate`].

use std::collections::BTreeSet;

use ocfl_digest::verify_reader;
use ocfl_extension::{ExtensionFactory, INITIAL_NAME};
use ocfl_fs::{path, ReadFs};
use ocfl_inventory::{
    read_verified, Finding, Inventory, InventoryError, ValidationCode, ValidationReport,
    INVENTORY_FILE,
};
use ocfl_types::OcflVersion;
use tracing::debug;

use crate::object::{object_declarations, Object, EXTENSIONS_DIR};

/// Finding for an inventory that could not be read or verified.
pub fn finding_for_load_error(error: &InventoryError, object: Option<&str>, dir: &str) -> Finding {
    let at = if dir.is_empty() { "object root" } else { dir };
    let code = match error {
        InventoryError::MissingSidecar(_) => ValidationCode::E058,
        InventoryError::MalformedSidecar { .. } => ValidationCode::E061,
        InventoryError::DigestMismatch { .. } => ValidationCode::E060,
        _ => ValidationCode::E034,
    };
    Finding::new(code, object, format!("{at}: {error}"))
}

fn check_declaration(fs: &dyn ReadFs, report: &mut ValidationReport, id: Option<&str>) {
    let declarations = match object_declarations(fs) {
        Ok(declarations) => declarations,
        Err(e) => {
            report.push(Finding::new(ValidationCode::E003, id, e.to_string()));
            return;
        }
    };
    let [name] = declarations.as_slice() else {
        report.push(Finding::new(
            ValidationCode::E003,
            id,
            format!("{} declaration files", declarations.len()),
        ));
        return;
    };
    let version = [OcflVersion::V1_0, OcflVersion::V1_1]
        .into_iter()
        .find(|v| v.object_declaration() == *name);
    let content = fs.read_file(name).map(|d| String::from_utf8_lossy(&d).into_owned());
    match (version, content) {
        (Some(version), Ok(content)) if content == version.object_declaration_content() => {}
        (_, Ok(content)) => report.push(Finding::new(
            ValidationCode::E007,
            id,
            format!("{name} contains {:?}", content.trim_end()),
        )),
        (_, Err(e)) => report.push(Finding::new(ValidationCode::E007, id, e.to_string())),
    }
}

/// Validate the object stored at the root of `fs`.
///
/// `factory` decides which extension directories count as registered.
pub fn validate_object(fs: &dyn ReadFs, factory: &ExtensionFactory) -> ValidationReport {
    let mut report = ValidationReport::new();
    report.objects_checked = 1;

    let inventory = match read_verified(fs, "") {
        Ok((data, _, _)) => match Inventory::from_json(&data) {
            Ok(inventory) => Some(inventory),
            Err(e) => {
                report.push(finding_for_load_error(&e, None, ""));
                None
            }
        },
        Err(e) => {
            report.push(finding_for_load_error(&e, None, ""));
            None
        }
    };
    let id = inventory.as_ref().map(|inv| inv.id());
    check_declaration(fs, &mut report, id);
    check_extensions(fs, factory, &mut report, id);
    let Some(inventory) = &inventory else {
        return report;
    };

    report.extend(inventory.validate());
    check_version_inventories(fs, inventory, &mut report);
    check_content(fs, inventory, &mut report);
    debug!(
        object_id = %inventory.id(),
        findings = report.findings.len(),
        "validated object"
    );
    report
}

fn check_version_inventories(fs: &dyn ReadFs, inventory: &Inventory, report: &mut ValidationReport) {
    let id = Some(inventory.id());
    for label in inventory.versions().keys() {
        let dir = label.to_string();
        let copy = match path::join(&dir, INVENTORY_FILE) {
            Ok(copy) => copy,
            Err(e) => {
                report.push(Finding::new(ValidationCode::E034, id, e.to_string()));
                continue;
            }
        };
        match fs.exists(&copy) {
            Ok(true) => {
                if let Err(e) = read_verified(fs, &dir) {
                    report.push(finding_for_load_error(&e, id, &dir));
                }
            }
            Ok(false) => report.push(Finding::new(
                ValidationCode::W010,
                id,
                format!("{dir} has no inventory"),
            )),
            Err(e) => report.push(Finding::new(ValidationCode::E034, id, e.to_string())),
        }
    }
}

fn check_content(fs: &dyn ReadFs, inventory: &Inventory, report: &mut ValidationReport) {
    let id = Some(inventory.id());
    let algorithm = inventory.digest_algorithm();
    let mut manifested = BTreeSet::new();

    // Every (digest, path) pair is checked, so a path listed under two
    // digests fails against at least one of them.
    for (digest, paths) in inventory.manifest() {
        for content_path in paths {
            manifested.insert(content_path.as_str());
            let result = fs
                .open(content_path)
                .map_err(|e| e.to_string())
                .and_then(|mut reader| {
                    verify_reader(&mut reader, algorithm, digest).map_err(|e| e.to_string())
                });
            if let Err(reason) = result {
                report.push(Finding::new(
                    ValidationCode::E092,
                    id,
                    format!("{content_path}: {reason}"),
                ));
            }
        }
    }

    for label in inventory.versions().keys() {
        let Ok(content_dir) = path::join(&label.to_string(), inventory.content_directory()) else {
            continue;
        };
        if !fs.exists(&content_dir).unwrap_or(false) {
            continue;
        }
        let files = match fs.walk(&content_dir) {
            Ok(files) => files,
            Err(e) => {
                report.push(Finding::new(ValidationCode::E023, id, e.to_string()));
                continue;
            }
        };
        for file in files {
            let Ok(full) = path::join(&content_dir, &file) else {
                continue;
            };
            if !manifested.contains(full.as_str()) {
                report.push(Finding::new(
                    ValidationCode::E023,
                    id,
                    format!("{full} is not in the manifest"),
                ));
            }
        }
    }
}

fn check_extensions(
    fs: &dyn ReadFs,
    factory: &ExtensionFactory,
    report: &mut ValidationReport,
    id: Option<&str>,
) {
    if !fs.exists(EXTENSIONS_DIR).unwrap_or(false) {
        return;
    }
    let entries = match fs.read_dir(EXTENSIONS_DIR) {
        Ok(entries) => entries,
        Err(e) => {
            report.push(Finding::new(ValidationCode::W013, id, e.to_string()));
            return;
        }
    };
    let unknown: BTreeSet<String> = entries
        .into_iter()
        .filter(|e| e.is_dir && e.name != INITIAL_NAME && !factory.has(&e.name))
        .map(|e| e.name)
        .collect();
    for name in unknown {
        report.push(Finding::new(
            ValidationCode::W013,
            id,
            format!("{EXTENSIONS_DIR}/{name}"),
        ));
    }
}

impl Object {
    /// Validate this object's stored files.
    pub fn validate(&self, factory: &ExtensionFactory) -> ValidationReport {
        validate_object(self.fs().as_read_fs(), factory)
    }
}
