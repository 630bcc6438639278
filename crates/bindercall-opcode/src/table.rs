use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OpcodeError, Result};
use crate::provider::{stub_name, transaction_field, LookupFailure, OpcodeProvider};
use crate::{FIRST_CALL_TRANSACTION, LAST_CALL_TRANSACTION};

/// Maximum size of a table file read from disk.
const MAX_TABLE_FILE_SIZE: u64 = 8 * 1024 * 1024;

/// Opcode table generated offline for one OS build.
///
/// Shaped like the stub types it stands in for:
///
/// ```json
/// { "sdk": 25,
///   "stubs": { "android.os.IPowerManager$Stub": { "TRANSACTION_goToSleep": 13 } } }
/// ```
///
/// Field values are kept as raw JSON so malformed entries surface as
/// "inaccessible" at lookup time instead of rejecting the whole table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpcodeTable {
    /// API level the table was generated for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk: Option<u32>,
    #[serde(default)]
    stubs: BTreeMap<String, BTreeMap<String, Value>>,
}

impl OpcodeTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table tagged with an API level.
    pub fn for_sdk(sdk: u32) -> Self {
        Self {
            sdk: Some(sdk),
            stubs: BTreeMap::new(),
        }
    }

    /// Parse a table from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a table from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_file_limited(path, MAX_TABLE_FILE_SIZE)
    }

    fn from_file_limited(path: &Path, max: u64) -> Result<Self> {
        let read_err = |source| OpcodeError::Read {
            path: path.to_path_buf(),
            source,
        };
        let too_large = |size| OpcodeError::TooLarge {
            path: path.to_path_buf(),
            size,
            max,
        };
        let file = std::fs::File::open(path).map_err(read_err)?;
        let size = file.metadata().map_err(read_err)?.len();
        if size > max {
            return Err(too_large(size));
        }

        // The file may grow between the metadata check and the read.
        let mut content = String::new();
        file.take(max + 1)
            .read_to_string(&mut content)
            .map_err(read_err)?;
        if content.len() as u64 > max {
            return Err(too_large(content.len() as u64));
        }

        let table = Self::from_json(&content)?;
        tracing::debug!(path = %path.display(), stubs = table.stubs.len(), sdk = ?table.sdk, "loaded opcode table");
        Ok(table)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Record the code of `method` on `interface`.
    pub fn insert(&mut self, interface: &str, method: &str, code: u32) {
        self.stubs
            .entry(stub_name(interface))
            .or_default()
            .insert(transaction_field(method), Value::from(code));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, interface: &str, method: &str, code: u32) -> Self {
        self.insert(interface, method, code);
        self
    }

    /// Merge `other` into this table. Disagreeing codes are an error and
    /// leave this table unchanged.
    pub fn merge(&mut self, other: OpcodeTable) -> Result<()> {
        let mut merged = self.stubs.clone();
        for (stub, fields) in other.stubs {
            let target = merged.entry(stub.clone()).or_default();
            for (field, incoming) in fields {
                match target.get(&field) {
                    Some(existing) if existing != &incoming => {
                        return Err(OpcodeError::Conflict {
                            key: format!("{stub}.{field}"),
                            existing: existing.clone(),
                            incoming,
                        });
                    }
                    Some(_) => {}
                    None => {
                        target.insert(field, incoming);
                    }
                }
            }
        }
        self.stubs = merged;
        if self.sdk.is_none() {
            self.sdk = other.sdk;
        }
        Ok(())
    }

    /// Number of method entries across all stubs.
    pub fn len(&self) -> usize {
        self.stubs.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the interfaces the table knows, without the stub suffix.
    pub fn interfaces(&self) -> impl Iterator<Item = &str> {
        self.stubs
            .keys()
            .map(|stub| stub.strip_suffix("$Stub").unwrap_or(stub))
    }
}

impl OpcodeProvider for OpcodeTable {
    fn lookup(&self, interface: &str, method: &str) -> std::result::Result<u32, LookupFailure> {
        let stub = stub_name(interface);
        let Some(fields) = self.stubs.get(&stub) else {
            return Err(LookupFailure::StubNotFound { stub });
        };

        let field = transaction_field(method);
        let Some(raw) = fields.get(&field) else {
            return Err(LookupFailure::FieldNotFound { stub, field });
        };

        let inaccessible = |reason: String| LookupFailure::FieldInaccessible {
            stub: stub.clone(),
            field: field.clone(),
            reason,
        };
        let code = raw
            .as_u64()
            .ok_or_else(|| inaccessible(format!("not an unsigned integer: {raw}")))?;
        let code = u32::try_from(code)
            .ok()
            .filter(|c| (FIRST_CALL_TRANSACTION..=LAST_CALL_TRANSACTION).contains(c))
            .ok_or_else(|| inaccessible(format!("code {code} outside call range")))?;
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"{
        "sdk": 25,
        "stubs": {
            "android.os.IPowerManager$Stub": {
                "TRANSACTION_goToSleep": 13,
                "TRANSACTION_broken": "thirteen",
                "TRANSACTION_huge": 4294967296
            }
        }
    }"#;

    #[test]
    fn parses_and_looks_up() {
        let table = OpcodeTable::from_json(TABLE).unwrap();
        assert_eq!(table.sdk, Some(25));
        assert_eq!(table.lookup("android.os.IPowerManager", "goToSleep"), Ok(13));
    }

    #[test]
    fn distinguishes_failure_modes() {
        let table = OpcodeTable::from_json(TABLE).unwrap();
        assert!(matches!(
            table.lookup("android.os.IMissing", "x"),
            Err(LookupFailure::StubNotFound { .. })
        ));
        assert!(matches!(
            table.lookup("android.os.IPowerManager", "wakeUp"),
            Err(LookupFailure::FieldNotFound { .. })
        ));
        assert!(matches!(
            table.lookup("android.os.IPowerManager", "broken"),
            Err(LookupFailure::FieldInaccessible { .. })
        ));
        assert!(matches!(
            table.lookup("android.os.IPowerManager", "huge"),
            Err(LookupFailure::FieldInaccessible { .. })
        ));
    }

    #[test]
    fn zero_is_not_a_call_code() {
        let table = OpcodeTable::new().with("a.IFoo", "bar", 0);
        assert!(table.lookup("a.IFoo", "bar").is_err());
    }

    #[test]
    fn merge_combines_and_detects_conflicts() {
        let mut base = OpcodeTable::for_sdk(25).with("a.IFoo", "one", 1);
        base.merge(OpcodeTable::new().with("a.IFoo", "two", 2).with("a.IBar", "x", 5))
            .unwrap();
        assert_eq!(base.len(), 3);
        assert_eq!(base.interfaces().collect::<Vec<_>>(), vec!["a.IBar", "a.IFoo"]);

        let err = base
            .merge(OpcodeTable::new().with("a.IFoo", "one", 9))
            .unwrap_err();
        match err {
            OpcodeError::Conflict { existing, incoming, .. } => {
                assert_eq!(existing, Value::from(1));
                assert_eq!(incoming, Value::from(9));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn failed_merge_leaves_table_untouched() {
        let mut base = OpcodeTable::for_sdk(25).with("a.IFoo", "one", 1);
        let before = base.clone();
        let incoming = OpcodeTable::new()
            .with("a.IBar", "early", 3)
            .with("a.IFoo", "one", 2)
            .with("a.IFoo", "zzz", 4);

        assert!(base.merge(incoming).is_err());
        assert_eq!(base, before);
        assert!(base.lookup("a.IBar", "early").is_err());
    }

    #[test]
    fn conflict_reports_raw_values() {
        let mut base = OpcodeTable::from_json(
            r#"{"stubs": {"a.IFoo$Stub": {"TRANSACTION_big": 4294967297}}}"#,
        )
        .unwrap();
        let other = OpcodeTable::from_json(
            r#"{"stubs": {"a.IFoo$Stub": {"TRANSACTION_big": "one"}}}"#,
        )
        .unwrap();
        let err = base.merge(other).unwrap_err();
        assert_eq!(
            err.to_string(),
            "conflicting opcode for a.IFoo$Stub.TRANSACTION_big: 4294967297 vs \"one\""
        );
    }

    fn temp_table(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "bindercall-table-{name}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("opcodes.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn oversized_file_is_rejected() {
        let path = temp_table("oversized", TABLE);
        let err = OpcodeTable::from_file_limited(&path, 16).unwrap_err();
        assert!(matches!(err, OpcodeError::TooLarge { max: 16, .. }));
        assert!(OpcodeTable::from_file_limited(&path, 64 * 1024).is_ok());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn json_roundtrip_preserves_entries() {
        let table = OpcodeTable::for_sdk(30).with("a.IFoo", "bar", 7);
        let parsed = OpcodeTable::from_json(&table.to_json().unwrap()).unwrap();
        assert_eq!(parsed, table);
    }
}
