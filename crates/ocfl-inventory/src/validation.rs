use std::collections::{BTreeSet, HashSet};
use std::fmt;

use ocfl_types::{OcflVersion, VersionLabel};
use serde::Serialize;

use crate::inventory::{check_path, Inventory};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Stable finding codes from the OCFL validation catalogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ValidationCode {
    E003,
    E007,
    E008,
    E009,
    E011,
    E023,
    E025,
    E034,
    E036,
    E038,
    E040,
    E042,
    E050,
    E058,
    E060,
    E061,
    E069,
    E082,
    E092,
    E101,
    E107,
    W004,
    W005,
    W007,
    W008,
    W010,
    W013,
}

impl ValidationCode {
    pub fn severity(&self) -> Severity {
        match self {
            Self::W004 | Self::W005 | Self::W007 | Self::W008 | Self::W010 | Self::W013 => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    /// Short statement of the rule the code stands for.
    pub fn description(&self) -> &'static str {
        match self {
            Self::E003 => "object must contain exactly one version declaration",
            Self::E007 => "object declaration content must name the OCFL version",
            Self::E008 => "object must contain at least one version",
            Self::E009 => "version numbers must start at 1 and be continuous",
            Self::E011 => "version labels must use consistent zero padding",
            Self::E023 => "every file in a content directory must be in the manifest",
            Self::E025 => "digest algorithm must be sha512 or sha256",
            Self::E034 => "inventory must be parseable",
            Self::E036 => "inventory must contain id, type, digestAlgorithm and head",
            Self::E038 => "type must be the inventory URI of the OCFL version",
            Self::E040 => "head must be the highest version",
            Self::E042 => "content paths must be relative and well-formed",
            Self::E050 => "state digests must appear in the manifest",
            Self::E058 => "every inventory must have a sidecar",
            Self::E060 => "sidecar digest must match the inventory",
            Self::E061 => "sidecar must read \"<digest> inventory.json\"",
            Self::E069 => "storage root must contain a root declaration",
            Self::E082 => "object roots must end their storage hierarchy, never nest",
            Self::E092 => "manifest content paths must exist",
            Self::E101 => "logical and content paths must be unique and non-conflicting",
            Self::E107 => "every manifest digest must be referenced by a state",
            Self::W004 => "sha512 should be used",
            Self::W005 => "object id should be a URI",
            Self::W007 => "versions should include message and user",
            Self::W008 => "version user should include an address",
            Self::W010 => "every version directory should include an inventory",
            Self::W013 => "extension directories should use registered names",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One problem found during validation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Finding {
    pub code: ValidationCode,
    /// Object the finding belongs to; `None` for storage root findings.
    pub object: Option<String>,
    pub context: String,
}

impl Finding {
    pub fn new(code: ValidationCode, object: Option<&str>, context: impl Into<String>) -> Self {
        Self {
            code,
            object: object.map(str::to_string),
            context: context.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity() {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.object {
            Some(id) => write!(f, "[{level} {}] {id}: {}: {}", self.code, self.code.description(), self.context),
            None => write!(f, "[{level} {}] {}: {}", self.code, self.code.description(), self.context),
        }
    }
}

/// Findings collected across a validation run.
///
/// Validation never stops at the first problem: one broken object must not
/// hide what is wrong with the rest of a root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
    pub objects_checked: u64,
    /// Set when validation stopped before covering everything.
    pub partial: bool,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no errors were found. Warnings do not count.
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity() == Severity::Warning)
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.findings.extend(other.findings);
        self.objects_checked += other.objects_checked;
        self.partial |= other.partial;
    }

    pub fn has_code(&self, code: ValidationCode) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }

    /// Merge duplicate findings, keeping first-seen order.
    pub fn compact(&self) -> ValidationReport {
        let mut seen = HashSet::new();
        let findings = self
            .findings
            .iter()
            .filter(|f| seen.insert(*f))
            .cloned()
            .collect();
        ValidationReport {
            findings,
            objects_checked: self.objects_checked,
            partial: self.partial,
        }
    }
}

/// Structural checks on a parsed inventory.
///
/// File level checks (declaration, sidecars, content presence) need the
/// object's filesystem and live with the object.
pub fn validate_inventory(inventory: &Inventory) -> Vec<Finding> {
    let id = Some(inventory.id());
    let mut findings = Vec::new();
    let mut push = |code, context: String| findings.push(Finding::new(code, id, context));

    if inventory.id().trim().is_empty() {
        push(ValidationCode::E036, "id is empty".into());
    } else if !inventory.id().contains(':') {
        push(ValidationCode::W005, format!("id {:?} is not a URI", inventory.id()));
    }

    if OcflVersion::from_inventory_type(inventory.inventory_type()).is_err() {
        push(
            ValidationCode::E038,
            format!("unknown type {:?}", inventory.inventory_type()),
        );
    }

    let algorithm = inventory.digest_algorithm();
    if !algorithm.is_content_algorithm() {
        push(ValidationCode::E025, format!("digest algorithm {algorithm}"));
    } else if algorithm != ocfl_types::DigestAlgorithm::Sha512 {
        push(ValidationCode::W004, format!("digest algorithm {algorithm}"));
    }

    let labels: Vec<VersionLabel> = inventory.versions().keys().copied().collect();
    if labels.is_empty() {
        push(ValidationCode::E008, "no versions".into());
    }
    for (index, label) in labels.iter().enumerate() {
        if label.number() as usize != index + 1 {
            push(ValidationCode::E009, format!("expected v{}, found {label}", index + 1));
            break;
        }
    }
    let width = labels.first().map_or(0, VersionLabel::padding);
    if let Some(label) = labels.iter().find(|l| !l.fits_width(width)) {
        push(
            ValidationCode::E011,
            format!("{label} does not match the padding of {}", labels[0]),
        );
    }

    match (inventory.head(), labels.last()) {
        (None, _) => push(ValidationCode::E036, "head is missing".into()),
        (Some(head), Some(max)) if head != *max || head.padding() != max.padding() => push(
            ValidationCode::E040,
            format!("head is {head} but highest version is {max}"),
        ),
        _ => {}
    }

    let mut content = BTreeSet::new();
    for (digest, paths) in inventory.manifest() {
        if !digest.matches_algorithm(algorithm) {
            push(
                ValidationCode::E025,
                format!("manifest digest {digest} does not fit {algorithm}"),
            );
        }
        for path in paths {
            let versioned = labels.iter().any(|l| path.starts_with(&format!("{l}/")));
            if check_path(path).is_err() || !versioned {
                push(ValidationCode::E042, format!("content path {path:?}"));
            }
            if !content.insert(path.as_str()) {
                push(
                    ValidationCode::E101,
                    format!("content path {path} is listed under more than one digest"),
                );
            }
        }
    }
    for path in &content {
        let dirs = path.match_indices('/').map(|(i, _)| &path[..i]);
        for dir in dirs.filter(|d| content.contains(d)) {
            push(
                ValidationCode::E101,
                format!("content path {dir} conflicts with {path}"),
            );
        }
    }

    let mut referenced = HashSet::new();
    for (label, version) in inventory.versions() {
        if version.message.is_none() || version.user.is_none() {
            push(ValidationCode::W007, format!("{label} lacks message or user"));
        }
        if let Some(user) = &version.user {
            if user.address.is_none() {
                push(ValidationCode::W008, format!("{label} user has no address"));
            }
        }
        for (digest, _) in &version.state {
            referenced.insert(digest);
            if !inventory.manifest().contains(digest) {
                push(
                    ValidationCode::E050,
                    format!("{label} state digest {digest} not in manifest"),
                );
            }
        }
        let logical: BTreeSet<&str> = version.state.paths().into_keys().collect();
        for path in &logical {
            let dirs = path.match_indices('/').map(|(i, _)| &path[..i]);
            for dir in dirs.filter(|d| logical.contains(d)) {
                push(
                    ValidationCode::E101,
                    format!("{label}: {dir} conflicts with {path}"),
                );
            }
        }
    }
    for digest in inventory.manifest().digests() {
        if !referenced.contains(digest) {
            push(
                ValidationCode::E107,
                format!("manifest digest {digest} is not in any state"),
            );
        }
    }

    findings
}
