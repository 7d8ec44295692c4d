//! CSV member store
//!
//! Each collection persists as one CSV file with a fixed header:
//!
//! ```text
//! RedHatEmailAddress,GitHubUsername,LinkedGitHubUsernames,LinkedQuayUsernames,Source,DeleteAfter
//! ```
//!
//! Multi-valued columns are colon-joined. `DeleteAfter` is an ISO date.
//!
//! Rows written by older tooling may carry `GoogleForm` as their source.
//! They read as [`Source::ExternalForm`] and are written back under that
//! name, so a store migrates on its first rewrite.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::collection::MemberCollection;
use crate::error::{RosterError, RosterResult};
use crate::member::{Member, Source};

pub const COLUMN_EMAIL: &str = "RedHatEmailAddress";
pub const COLUMN_USERNAME: &str = "GitHubUsername";
pub const COLUMN_LINKED_PLATFORM: &str = "LinkedGitHubUsernames";
pub const COLUMN_LINKED_SECONDARY: &str = "LinkedQuayUsernames";
pub const COLUMN_SOURCE: &str = "Source";
pub const COLUMN_DELETE_AFTER: &str = "DeleteAfter";

/// Header row, in write order.
pub const HEADER: [&str; 6] = [
    COLUMN_EMAIL,
    COLUMN_USERNAME,
    COLUMN_LINKED_PLATFORM,
    COLUMN_LINKED_SECONDARY,
    COLUMN_SOURCE,
    COLUMN_DELETE_AFTER,
];

/// Separator for multi-valued columns.
const LIST_SEPARATOR: char = ':';

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Read the collection stored at `path`. The file must exist.
pub fn read_collection(path: impl AsRef<Path>) -> RosterResult<MemberCollection> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(RosterError::MissingStore {
            path: path.to_path_buf(),
        });
    }

    let data = std::fs::read(path)?;
    let collection = parse_collection(path, &data)?;

    info!(
        path = %path.display(),
        members = collection.len(),
        "Loaded member store"
    );
    Ok(collection)
}

/// Read the collection at `path`, or start empty when the file is absent.
pub fn read_collection_or_empty(path: impl AsRef<Path>) -> RosterResult<MemberCollection> {
    match read_collection(path.as_ref()) {
        Err(e) if e.is_missing_store() => {
            info!(path = %path.as_ref().display(), "No member store yet, starting empty");
            Ok(MemberCollection::new(path.as_ref()))
        }
        other => other,
    }
}

/// Parse store bytes into a collection bound to `path`.
pub fn parse_collection(path: &Path, data: &[u8]) -> RosterResult<MemberCollection> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut collection = MemberCollection::new(path);
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(collection);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.to_string(), idx))
        .collect();

    if !columns.contains_key(COLUMN_USERNAME) {
        return Err(RosterError::MissingColumn {
            path: path.to_path_buf(),
            column: COLUMN_USERNAME.to_string(),
        });
    }

    for (idx, result) in reader.records().enumerate() {
        // header = 1, first data row = 2
        let line = idx as u64 + 2;
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let member = parse_row(path, line, &record, &columns)?;
        if let Some(previous) = collection.insert_loaded(member) {
            debug!(
                path = %path.display(),
                line,
                username = %previous.platform_username(),
                "Duplicate username in store, keeping the later row"
            );
        }
    }

    Ok(collection)
}

fn parse_row(
    path: &Path,
    line: u64,
    record: &csv::StringRecord,
    columns: &HashMap<String, usize>,
) -> RosterResult<Member> {
    let field = |name: &str| optional_field(record, columns, name);

    let username = field(COLUMN_USERNAME)
        .ok_or_else(|| RosterError::invalid_row(path, line, "missing GitHubUsername"))?;

    let source = match field(COLUMN_SOURCE) {
        Some(raw) => raw
            .parse::<Source>()
            .map_err(|e| RosterError::invalid_row(path, line, e))?,
        None => Source::Manual,
    };

    let delete_after = field(COLUMN_DELETE_AFTER)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                RosterError::invalid_row(path, line, format!("invalid DeleteAfter '{raw}': {e}"))
            })
        })
        .transpose()?;

    let member = Member::new(username, source)?
        .with_email(field(COLUMN_EMAIL).map(str::to_string))
        .with_linked_platform_accounts(split_list(field(COLUMN_LINKED_PLATFORM)))
        .with_linked_secondary_accounts(split_list(field(COLUMN_LINKED_SECONDARY)))
        .with_delete_after(delete_after);

    Ok(member)
}

/// Non-empty value of a named column.
fn optional_field<'r>(
    record: &'r csv::StringRecord,
    columns: &HashMap<String, usize>,
    name: &str,
) -> Option<&'r str> {
    columns
        .get(name)
        .and_then(|&idx| record.get(idx))
        .filter(|s| !s.is_empty())
}

fn split_list(value: Option<&str>) -> Vec<&str> {
    value
        .map(|v| v.split(LIST_SEPARATOR).map(str::trim).collect())
        .unwrap_or_default()
}

/// Encode a collection as store bytes.
pub fn encode_collection(collection: &MemberCollection) -> RosterResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for member in collection.items() {
        let linked_platform = member.linked_platform_accounts().join(":");
        let linked_secondary = member.linked_secondary_accounts().join(":");
        let delete_after = member
            .delete_after()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        writer.write_record([
            member.directory_email().unwrap_or(""),
            member.platform_username(),
            linked_platform.as_str(),
            linked_secondary.as_str(),
            member.source().as_str(),
            delete_after.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| RosterError::Io(e.into_error()))
}

/// Write a collection back to its store file.
///
/// An empty collection is a no-op: the existing file is left untouched.
/// Otherwise the file is replaced atomically, keeping the permissions of the
/// file it replaces.
pub fn write_collection(collection: &MemberCollection) -> RosterResult<()> {
    let path = collection.path();
    if collection.is_empty() {
        debug!(path = %path.display(), "Empty collection, skipping write");
        return Ok(());
    }

    let bytes = encode_collection(collection)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    if let Some(permissions) = store_permissions(path)? {
        tmp.as_file().set_permissions(permissions)?;
    }
    tmp.persist(path).map_err(|e| RosterError::Io(e.error))?;

    info!(
        path = %path.display(),
        members = collection.len(),
        "Wrote member store"
    );
    Ok(())
}

/// Permissions for a rewritten store: those of the existing file, or
/// owner read-write and world-readable for a new one.
fn store_permissions(path: &Path) -> RosterResult<Option<std::fs::Permissions>> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.permissions())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(new_store_permissions()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn new_store_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_store_permissions() -> Option<std::fs::Permissions> {
    None
}
