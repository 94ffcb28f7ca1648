use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::{AdapterError, Result};

use super::{Client, PackageCreateRequest};

const DEFAULT_PROCESSING_CONFIG: &str = "default";

/// A scoped staging workspace on a pipeline's ingest filesystem.
///
/// The session owns a fresh temporary directory under the tenant's transfer
/// directory. Files are created under it, metadata and checksums accumulate
/// in memory, and `start` writes `metadata/metadata.csv` plus the checksum
/// manifests before submitting the package creation request.
pub struct TransferSession<'a> {
    client: &'a Client,
    dir: PathBuf,
    name: String,
    processing_config: String,

    pub metadata: MetadataSet,
    pub checksums_md5: ChecksumSet,
    pub checksums_sha1: ChecksumSet,
    pub checksums_sha256: ChecksumSet,
}

impl<'a> TransferSession<'a> {
    pub(super) fn new(client: &'a Client, name: &str) -> Result<TransferSession<'a>> {
        let base = client.transfer_dir();
        if !base.is_dir() {
            return Err(AdapterError::Config(format!(
                "transfer directory is not accessible ({})",
                base.display()
            )));
        }
        let dir = base.join(format!("transfer{}", Uuid::new_v4().simple()));
        fs::create_dir(&dir)?;
        Ok(TransferSession {
            client,
            dir,
            name: name.to_string(),
            processing_config: DEFAULT_PROCESSING_CONFIG.to_string(),
            metadata: MetadataSet::new(),
            checksums_md5: ChecksumSet::new("md5"),
            checksums_sha1: ChecksumSet::new("sha1"),
            checksums_sha256: ChecksumSet::new("sha256"),
        })
    }

    /// Absolute path of the transfer directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn with_processing_config(&mut self, name: &str) -> &mut Self {
        self.processing_config = name.to_string();
        self
    }

    /// Creates a new file inside the transfer directory, making intermediate
    /// directories as needed.
    pub async fn create(&self, name: &str) -> Result<tokio::fs::File> {
        let path = self.dir.join(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(tokio::fs::File::create(path).await?)
    }

    /// Registers metadata of the whole dataset.
    pub fn describe(&mut self, field: &str, value: &str) {
        self.metadata.add("objects/", field, value);
    }

    /// Registers metadata of a single file.
    pub fn describe_file(&mut self, name: &str, field: &str, value: &str) {
        self.metadata.add(name, field, value);
    }

    pub fn checksum_md5(&mut self, name: &str, sum: &str) {
        self.checksums_md5.add(name, sum);
    }

    pub fn checksum_sha1(&mut self, name: &str, sum: &str) {
        self.checksums_sha1.add(name, sum);
    }

    pub fn checksum_sha256(&mut self, name: &str, sum: &str) {
        self.checksums_sha256.add(name, sum);
    }

    /// Starts the transfer through the package endpoint, writing the
    /// metadata and checksum files first. Returns the transfer id.
    pub async fn start(&self) -> Result<String> {
        fs::create_dir_all(self.dir.join("metadata"))?;
        self.metadata.write(&self.dir)?;
        self.checksums_md5.write(&self.dir)?;
        self.checksums_sha1.write(&self.dir)?;
        self.checksums_sha256.write(&self.dir)?;

        let path = self
            .dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let req = PackageCreateRequest {
            name: self.name.clone(),
            path,
            processing_config: self.processing_config.clone(),
        };
        let resp = self.client.package_create(&req).await?;
        debug!(transfer_id = %resp.id, "Package created");
        Ok(resp.id)
    }

    /// Lists the files currently staged in the transfer directory, relative
    /// to its root.
    pub fn contents(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_files(&self.dir, &self.dir, &mut paths);
        paths.sort();
        paths
    }

    /// Removes the transfer directory and everything below it. The session
    /// is not usable afterwards.
    pub fn destroy(&self) -> Result<()> {
        fs::remove_dir_all(&self.dir)?;
        Ok(())
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().into_owned());
        }
    }
}

/// Metadata entries of a transfer, keyed by filename. Entries keep their
/// insertion order so repeated fields land in successive columns.
#[derive(Debug, Default)]
pub struct MetadataSet {
    entries: BTreeMap<String, Vec<(String, String)>>,
}

impl MetadataSet {
    pub fn new() -> MetadataSet {
        MetadataSet::default()
    }

    pub fn add(&mut self, name: &str, field: &str, value: &str) {
        self.entries
            .entry(name.to_string())
            .or_default()
            .push((field.to_string(), value.to_string()));
    }

    pub fn entries(&self) -> &BTreeMap<String, Vec<(String, String)>> {
        &self.entries
    }

    /// Writes `metadata/metadata.csv` under the given directory.
    ///
    /// The header is `filename` followed by the sorted field names, with
    /// multi-occurrence fields repeated to match the maximum count seen in
    /// any single row. Rows are emitted sorted by filename, scanning each
    /// row's pairs in order with a per-field cursor so repeated values fill
    /// successive columns of the same field.
    pub fn write(&self, base: &Path) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }

        let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in self.entries.values() {
            for (field, _) in entry {
                let count = entry.iter().filter(|(f, _)| f == field).count();
                let known = occurrences.entry(field).or_default();
                if count > *known {
                    *known = count;
                }
            }
        }

        let mut fields: Vec<&str> = Vec::new();
        for (field, count) in &occurrences {
            for _ in 0..*count {
                fields.push(field);
            }
        }

        let mut file = fs::File::create(base.join("metadata/metadata.csv"))?;
        let mut header = vec!["filename".to_string()];
        header.extend(fields.iter().map(|f| f.to_string()));
        write_record(&mut file, &header, ',')?;

        for (filename, entry) in &self.entries {
            let mut values = vec![filename.clone()];
            let mut cursors: HashMap<&str, usize> = HashMap::new();
            for field in &fields {
                let start = cursors.get(field).copied().unwrap_or(0);
                let mut value = String::new();
                for (index, (f, v)) in entry.iter().enumerate().skip(start) {
                    if f == field {
                        value = v.clone();
                        cursors.insert(field, index + 1);
                        break;
                    }
                }
                values.push(value);
            }
            if values.len() > 1 {
                write_record(&mut file, &values, ',')?;
            }
        }
        Ok(())
    }
}

/// Checksums of the transferred files for one sum algorithm.
#[derive(Debug)]
pub struct ChecksumSet {
    sum_type: String,
    values: BTreeMap<String, String>,
}

impl ChecksumSet {
    pub fn new(sum_type: &str) -> ChecksumSet {
        ChecksumSet { sum_type: sum_type.to_string(), values: BTreeMap::new() }
    }

    pub fn add(&mut self, name: &str, sum: &str) {
        self.values.insert(name.to_string(), sum.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Writes `metadata/checksum.{algo}` with space-separated `<sum> <name>`
    /// lines. Empty sets write nothing.
    pub fn write(&self, base: &Path) -> Result<()> {
        if self.values.is_empty() {
            return Ok(());
        }
        let path = base.join(format!("metadata/checksum.{}", self.sum_type));
        let mut file = fs::File::create(path)?;
        for (name, sum) in &self.values {
            write_record(&mut file, &[sum.clone(), name.clone()], ' ')?;
        }
        Ok(())
    }
}

// Minimal CSV record writer with RFC 4180 quoting, enough for the metadata
// and checksum manifests.
fn write_record<W: Write>(out: &mut W, values: &[String], sep: char) -> std::io::Result<()> {
    let mut line = String::new();
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            line.push(sep);
        }
        let needs_quotes =
            value.contains(sep) || value.contains('"') || value.contains('\n') || value.contains('\r');
        if needs_quotes {
            line.push('"');
            line.push_str(&value.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(value);
        }
    }
    line.push('\n');
    out.write_all(line.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_csv(path: &Path) -> Vec<Vec<String>> {
        let raw = fs::read_to_string(path).unwrap();
        raw.lines().map(parse_record).collect()
    }

    // Small CSV reader for assertions, understands the quoting used by
    // write_record.
    fn parse_record(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut chars = line.chars().peekable();
        let mut quoted = false;
        while let Some(c) = chars.next() {
            match c {
                '"' if quoted => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        quoted = false;
                    }
                }
                '"' if field.is_empty() => quoted = true,
                ',' if !quoted => {
                    fields.push(std::mem::take(&mut field));
                }
                other => field.push(other),
            }
        }
        fields.push(field);
        fields
    }

    #[test]
    fn metadata_csv_expands_repeated_fields_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("metadata")).unwrap();

        let mut set = MetadataSet::new();
        set.add("objects/", "dc.title", "Title");
        set.add("objects/", "dc.identifier", "one");
        set.add("objects/", "dc.identifier", "two");
        set.add("objects/a.bin", "dc.identifier", "file-id");
        set.write(dir.path()).unwrap();

        let rows = read_csv(&dir.path().join("metadata/metadata.csv"));
        assert_eq!(
            rows[0],
            vec!["filename", "dc.identifier", "dc.identifier", "dc.title"]
        );
        assert_eq!(rows[1], vec!["objects/", "one", "two", "Title"]);
        assert_eq!(rows[2], vec!["objects/a.bin", "file-id", "", ""]);
    }

    #[test]
    fn metadata_csv_quotes_values_with_commas() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("metadata")).unwrap();

        let mut set = MetadataSet::new();
        set.add("objects/", "dc.creatorName", "Winter, Kat");
        set.write(dir.path()).unwrap();

        let raw = fs::read_to_string(dir.path().join("metadata/metadata.csv")).unwrap();
        assert!(raw.contains("\"Winter, Kat\""));
        let rows = read_csv(&dir.path().join("metadata/metadata.csv"));
        assert_eq!(rows[1], vec!["objects/", "Winter, Kat"]);
    }

    #[test]
    fn empty_metadata_set_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("metadata")).unwrap();
        MetadataSet::new().write(dir.path()).unwrap();
        assert!(!dir.path().join("metadata/metadata.csv").exists());
    }

    #[test]
    fn checksum_sets_write_sum_then_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("metadata")).unwrap();

        let mut set = ChecksumSet::new("md5");
        set.add("data.bin", "0a1b2c");
        set.write(dir.path()).unwrap();

        let raw = fs::read_to_string(dir.path().join("metadata/checksum.md5")).unwrap();
        assert_eq!(raw, "0a1b2c data.bin\n");
    }
}
