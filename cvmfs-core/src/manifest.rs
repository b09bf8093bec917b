//! Reader for the `.cvmfspublished` repository manifest.
//!
//! The manifest starts with a textual header, one field per line, where the
//! first byte of a line is the field key and the rest is its value. The
//! header ends with a line containing `--`; the certificate hash and binary
//! signature follow and are not interpreted here.

use crate::error::{RepositoryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};

/// Parsed header of a repository manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Fully qualified repository name (`N`)
    pub repository_name: String,

    /// Content hash of the root catalog (`C`)
    pub root_catalog: Option<String>,

    /// Path hash of the root entry (`R`)
    pub root_hash: Option<String>,

    /// Size of the root catalog in bytes (`B`)
    pub root_catalog_size: Option<u64>,

    /// Hash of the signing certificate (`X`)
    pub certificate: Option<String>,

    /// Hash of the tag history database (`H`)
    pub history_database: Option<String>,

    /// Publish time in Unix seconds (`T`)
    pub last_modified: Option<i64>,

    /// Root catalog TTL in seconds (`D`)
    pub ttl: Option<u64>,

    /// Repository revision (`S`)
    pub revision: Option<u64>,

    /// Whether the repository is garbage-collectable (`G`)
    pub garbage_collectable: bool,

    /// Fields without a dedicated member, keyed by their one-letter key
    pub other: BTreeMap<char, String>,
}

impl Manifest {
    /// Parse the textual header of a manifest.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = BufReader::new(reader);
        let mut fields: BTreeMap<char, String> = BTreeMap::new();
        let mut line = Vec::new();

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\r', '\n']);
            if text == "--" {
                break;
            }
            let mut chars = text.chars();
            let Some(key) = chars.next() else {
                continue;
            };
            // first occurrence wins
            fields.entry(key).or_insert_with(|| chars.as_str().to_string());
        }

        let repository_name = fields
            .remove(&'N')
            .filter(|name| !name.is_empty())
            .ok_or_else(|| RepositoryError::InvalidManifest("missing repository name".into()))?;

        Ok(Self {
            repository_name,
            root_catalog: fields.remove(&'C'),
            root_hash: fields.remove(&'R'),
            root_catalog_size: parse_number(&mut fields, 'B')?,
            certificate: fields.remove(&'X'),
            history_database: fields.remove(&'H'),
            last_modified: parse_number(&mut fields, 'T')?,
            ttl: parse_number(&mut fields, 'D')?,
            revision: parse_number(&mut fields, 'S')?,
            garbage_collectable: fields.remove(&'G').is_some_and(|v| v == "yes"),
            other: fields,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    fields: &mut BTreeMap<char, String>,
    key: char,
) -> Result<Option<T>> {
    match fields.remove(&key) {
        None => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|_| {
            RepositoryError::InvalidManifest(format!("field {} is not a number: {:?}", key, value))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &[u8] = b"C600230b0ba7620426f2e898f1e1f43c5466efe59\n\
B6144\n\
Rd41d8cd98f00b204e9800998ecf8427e\n\
D240\n\
S42\n\
Gno\n\
Aoff\n\
Nexample.org\n\
Xd32fd8bbbd0d5e3e8ab3e7bcaa9b0b2a6a0c1e9f\n\
T1577836800\n\
--\n\
0123456789abcdef\n\
\x00\xff\xfe binary signature";

    #[test]
    fn test_parse_full_header() {
        let manifest = Manifest::from_reader(MANIFEST).unwrap();
        assert_eq!(manifest.repository_name, "example.org");
        assert_eq!(
            manifest.root_catalog.as_deref(),
            Some("600230b0ba7620426f2e898f1e1f43c5466efe59")
        );
        assert_eq!(manifest.root_catalog_size, Some(6144));
        assert_eq!(manifest.ttl, Some(240));
        assert_eq!(manifest.revision, Some(42));
        assert_eq!(manifest.last_modified, Some(1_577_836_800));
        assert!(!manifest.garbage_collectable);
        assert_eq!(manifest.other.get(&'A').map(String::as_str), Some("off"));
    }

    #[test]
    fn test_signature_is_not_parsed() {
        let manifest = Manifest::from_reader(MANIFEST).unwrap();
        assert!(!manifest.other.contains_key(&'0'));
    }

    #[test]
    fn test_minimal_header() {
        let manifest = Manifest::from_reader(&b"Ntest.cern.ch\n"[..]).unwrap();
        assert_eq!(manifest.repository_name, "test.cern.ch");
        assert!(manifest.root_catalog.is_none());
        assert!(manifest.revision.is_none());
    }

    #[test]
    fn test_missing_name() {
        let err = Manifest::from_reader(&b"C1234\nS3\n--\n"[..]).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidManifest(_)));
    }

    #[test]
    fn test_bad_number() {
        let err = Manifest::from_reader(&b"Nexample.org\nSabc\n"[..]).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidManifest(_)));
    }

    #[test]
    fn test_garbage_collectable() {
        let manifest = Manifest::from_reader(&b"Nexample.org\nGyes\n"[..]).unwrap();
        assert!(manifest.garbage_collectable);
    }
}
