//! Loading logical queries from a JSON query file.
//!
//! The file holds an array of queries:
//!
//! ```json
//! [
//!   { "name": "ddos", "operators": ["filter(proto == 17)", "map(dIP)", "reduce(sum)"],
//!     "refinement_levels": [8, 16, 32] }
//! ]
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::types::LogicalQuery;

/// Errors loading a query file.
#[derive(Debug, Error)]
pub enum QueryFileError {
    #[error("Failed to read query file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse query file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load logical queries from `path`, preserving file order.
pub fn load_queries(path: &Path) -> Result<Vec<LogicalQuery>, QueryFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| QueryFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| QueryFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_queries_preserves_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("queries.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "first", "operators": ["map(dIP)"]},
                {"name": "second", "operators": ["filter(x)"], "refinement_levels": [8]}
            ]"#,
        )
        .unwrap();

        let queries = load_queries(&path).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].name, "first");
        assert_eq!(queries[1].refinement_levels, vec![8]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_queries(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, QueryFileError::Read { .. }));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_queries(&path).unwrap_err();
        assert!(matches!(err, QueryFileError::Parse { .. }));
        assert!(err.to_string().contains("bad.json"));
    }
}
