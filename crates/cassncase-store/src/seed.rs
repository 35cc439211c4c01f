// ABOUTME: Seed collaborators that populate an empty store on first initialization.
// ABOUTME: Includes the built-in buyer dataset and a JSON file source of the same shape.

use std::path::PathBuf;

use cassncase_core::ImportRecord;
use thiserror::Error;

/// Errors that can occur while reading a seed.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("io error reading seed {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("seed {path} is not a JSON array of buyer records: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

/// A fixed, read-only list of buyer records consumed once when the store is empty.
pub trait SeedSource: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    fn records(&self) -> Result<Vec<ImportRecord>, SeedError>;
}

/// Seeds nothing; used when seeding is disabled.
pub struct NoSeed;

impl SeedSource for NoSeed {
    fn name(&self) -> &str {
        "no seed"
    }

    fn records(&self) -> Result<Vec<ImportRecord>, SeedError> {
        Ok(Vec::new())
    }
}

/// Reads buyer records from a JSON array on disk.
pub struct JsonSeedFile {
    path: PathBuf,
    name: String,
}

impl JsonSeedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl SeedSource for JsonSeedFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn records(&self) -> Result<Vec<ImportRecord>, SeedError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| SeedError::Io {
            path: self.name.clone(),
            source,
        })?;
        let rows: Vec<serde_json::Value> =
            serde_json::from_str(&raw).map_err(|source| SeedError::Json {
                path: self.name.clone(),
                source,
            })?;
        Ok(ImportRecord::decode_rows(rows))
    }
}

/// The built-in mock buyer dataset.
pub struct BuiltinSeed;

impl SeedSource for BuiltinSeed {
    fn name(&self) -> &str {
        "built-in buyers"
    }

    fn records(&self) -> Result<Vec<ImportRecord>, SeedError> {
        Ok(BUILTIN_BUYERS
            .iter()
            .map(|&(id, full_name, email, phone, address, order_type, status)| ImportRecord {
                order_id: Some(id.to_string()),
                full_name: Some(full_name.to_string()),
                email: Some(email.to_string()),
                phone: Some(phone.to_string()),
                address: None,
                shipping_address: Some(address.to_string()),
                order_type: Some(order_type.to_string()),
                status: Some(status.to_string()),
            })
            .collect())
    }
}

/// (id, full name, email, phone, shipping address, order type, status)
type BuyerRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
);

const BUILTIN_BUYERS: &[BuyerRow] = &[
    (
        "CN-0001",
        "Alyssa Mae Cruz",
        "sky@example.com",
        "09171234567",
        "Unit 404, The Grass Residences, Quezon City, Metro Manila",
        "Hardbound Set",
        "Confirmed",
    ),
    (
        "CN-0002",
        "Joshua Lee Santos",
        "joshua.santos@example.com",
        "09281234567",
        "123 Mango Avenue, Cebu City, Cebu",
        "Paperback Set",
        "Pending Confirmation",
    ),
    (
        "CN-0003",
        "Mikaela Reyes",
        "mika.reyes@example.com",
        "09061234567",
        "Block 5 Lot 2, Camella Homes, Davao City, Davao del Sur",
        "Hardbound + PDF",
        "Pending Confirmation",
    ),
    (
        "CN-0004",
        "Gabriel Tan",
        "gabriel.tan@example.com",
        "09159876543",
        "45 Session Road, Baguio City, Benguet",
        "Paperback Set",
        "Pending Confirmation",
    ),
    (
        "CN-0005",
        "Sophia Grace Dizon",
        "sophia.dizon@example.com",
        "09198765432",
        "789 Macapagal Blvd, Pasay City, Metro Manila",
        "Hardbound Set",
        "Confirmed",
    ),
    (
        "CN-0006",
        "Ethan James Rivera",
        "ethan.rivera@example.com",
        "09201239876",
        "Subic Bay Freeport Zone, Olongapo City, Zambales",
        "Paperback Set",
        "Pending Confirmation",
    ),
    (
        "CN-0007",
        "Isabella Garcia",
        "isabella.garcia@example.com",
        "09334567890",
        "56 Lacson Street, Bacolod City, Negros Occidental",
        "Hardbound Set",
        "Confirmed",
    ),
    (
        "CN-0008",
        "Liam Alexander Lim",
        "liam.lim@example.com",
        "09445678901",
        "22 Rizal Street, Iloilo City, Iloilo",
        "Paperback Set",
        "Pending Confirmation",
    ),
    (
        "CN-0009",
        "Chloe Nicole Yap",
        "chloe.yap@example.com",
        "09556789012",
        "One Oasis Condo, Cagayan de Oro City, Misamis Oriental",
        "Hardbound Set",
        "Pending Confirmation",
    ),
    (
        "CN-0010",
        "Noah Kristoff Go",
        "noah.go@example.com",
        "09667890123",
        "99 Divisoria, Zamboanga City, Zamboanga del Sur",
        "Paperback Set",
        "Confirmed",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use cassncase_core::OrderStatus;
    use tempfile::TempDir;

    #[test]
    fn builtin_seed_maps_every_buyer() {
        let rows = BuiltinSeed.records().unwrap();
        assert_eq!(rows.len(), 10);

        let records: Vec<_> = rows
            .into_iter()
            .map(|row| row.into_master().unwrap())
            .collect();
        assert_eq!(records[0].order_id, "CN-0001");
        assert_eq!(records[0].status, OrderStatus::Confirmed);
        assert_eq!(records[1].status, OrderStatus::Pending);
        assert_eq!(records[1].address, "123 Mango Avenue, Cebu City, Cebu");
    }

    #[test]
    fn json_seed_file_reads_buyer_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("buyers.json");
        std::fs::write(
            &path,
            r#"[{"id": "S-1", "fullName": "Seed Buyer", "email": "s@example.com",
                "phone": "0917 000 0000", "shippingAddress": "Somewhere",
                "orderType": "Paperback Set"}]"#,
        )
        .unwrap();

        let rows = JsonSeedFile::new(&path).records().unwrap();
        assert_eq!(rows.len(), 1);
        let record = rows[0].clone().into_master().unwrap();
        assert_eq!(record.order_id, "S-1");
        assert_eq!(record.status, OrderStatus::Pending);
    }

    #[test]
    fn json_seed_file_skips_mistyped_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("buyers.json");
        std::fs::write(
            &path,
            r#"[{"id": "S-1", "email": "s@example.com"},
                {"id": 42, "email": "wrong@example.com"},
                "stray string",
                {"id": "S-2", "phone": "0917 111 2222"}]"#,
        )
        .unwrap();

        let rows = JsonSeedFile::new(&path).records().unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.order_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("S-1"), Some("S-2")]);
    }

    #[test]
    fn json_seed_file_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = JsonSeedFile::new(dir.path().join("nope.json"))
            .records()
            .unwrap_err();
        assert!(matches!(err, SeedError::Io { .. }));
    }

    #[test]
    fn json_seed_file_reports_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("buyers.json");
        std::fs::write(&path, "{\"not\": \"an array\"}").unwrap();

        let err = JsonSeedFile::new(&path).records().unwrap_err();
        assert!(matches!(err, SeedError::Json { .. }));
    }
}
