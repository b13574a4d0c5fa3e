//! Version normalization.
//!
//! Item versions are stored zero-padded (`NNNNN.NNNNN.NNNNN`) so plain
//! string order agrees with semver order. Reads denormalize back to `X.Y.Z`.

use crate::error::{Result, ServiceError};

/// Maximum value (exclusive) for a single version component.
const COMPONENT_LIMIT: u64 = 100_000;

/// Normalize `X.Y.Z` into the zero-padded storage form.
///
/// Components ≥ 100000 are rejected because they would break the
/// fixed-width string ordering.
pub fn normalize_version(version: &str) -> Result<String> {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() != 3 {
        return Err(ServiceError::InvalidInput(format!(
            "version must be X.Y.Z, got '{version}'"
        )));
    }
    let mut components = [0u64; 3];
    for (i, part) in parts.iter().enumerate() {
        let n: u64 = part.parse().map_err(|_| {
            ServiceError::InvalidInput(format!("version component '{part}' is not a number"))
        })?;
        if n >= COMPONENT_LIMIT {
            return Err(ServiceError::InvalidInput(format!(
                "version component {n} out of range (max {})",
                COMPONENT_LIMIT - 1
            )));
        }
        components[i] = n;
    }
    Ok(format!(
        "{:05}.{:05}.{:05}",
        components[0], components[1], components[2]
    ))
}

/// Denormalize the storage form back to `X.Y.Z`.
///
/// Tolerates already-denormalized input so callers can pass through
/// rows written before normalization existed.
pub fn denormalize_version(stored: &str) -> String {
    stored
        .split('.')
        .map(|part| {
            let trimmed = part.trim_start_matches('0');
            if trimmed.is_empty() { "0" } else { trimmed }
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize_version("1.2.3").unwrap(), "00001.00002.00003");
        assert_eq!(normalize_version("0.0.0").unwrap(), "00000.00000.00000");
        assert_eq!(
            normalize_version("99999.99999.99999").unwrap(),
            "99999.99999.99999"
        );
    }

    #[test]
    fn test_normalize_rejects_bad_shapes() {
        assert!(normalize_version("1.2").is_err());
        assert!(normalize_version("1.2.3.4").is_err());
        assert!(normalize_version("1.2.x").is_err());
        assert!(normalize_version("").is_err());
        assert!(normalize_version("100000.0.0").is_err());
        assert!(normalize_version("-1.0.0").is_err());
    }

    #[test]
    fn test_roundtrip() {
        for v in ["0.1.0", "1.0.0", "12.34.56", "99999.0.7"] {
            let normalized = normalize_version(v).unwrap();
            assert_eq!(denormalize_version(&normalized), v);
            // Normalization is stable
            assert_eq!(normalize_version(v).unwrap(), normalized);
        }
    }

    #[test]
    fn test_string_order_agrees_with_semver() {
        let versions = ["0.9.9", "0.10.0", "1.0.0", "1.2.10", "1.2.9", "10.0.0", "2.0.0"];
        let mut normalized: Vec<String> = versions
            .iter()
            .map(|v| normalize_version(v).unwrap())
            .collect();
        normalized.sort();
        let denormalized: Vec<String> =
            normalized.iter().map(|v| denormalize_version(v)).collect();
        assert_eq!(
            denormalized,
            vec!["0.9.9", "0.10.0", "1.0.0", "1.2.9", "1.2.10", "2.0.0", "10.0.0"]
        );
    }
}
