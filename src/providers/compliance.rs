use alloy::primitives::Address;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;

use crate::config::ComplianceConfig;
use crate::risk::types::{AssetId, ComplianceStatus};

use super::ComplianceProvider;

/// What a label says about an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    KycVerified,
    Sanctioned,
    Flagged,
}

#[derive(Debug, Clone)]
pub struct ComplianceLabel {
    pub kind: LabelKind,
    pub name: String,
    pub source: String,
}

/// A parsed OFAC SDN entry with crypto addresses.
#[derive(Debug, Clone)]
pub struct OfacEntry {
    pub sdn_id: String,
    pub entity_name: String,
    pub program: String,
    pub addresses: Vec<String>,
}

/// In-memory label index answering compliance lookups.
/// One address can carry several labels (e.g. KYC-verified and flagged by a watchlist).
pub struct WatchlistCompliance {
    by_address: HashMap<Address, Vec<ComplianceLabel>>,
    asset_overrides: HashMap<Address, u32>,
    asset_default_score: u32,
}

impl WatchlistCompliance {
    pub fn new(asset_default_score: u32) -> Self {
        Self {
            by_address: HashMap::new(),
            asset_overrides: HashMap::new(),
            asset_default_score,
        }
    }

    /// Build the store from config lists and any configured CSV files.
    pub fn from_config(config: &ComplianceConfig) -> eyre::Result<Self> {
        let mut store = Self::new(config.asset_default_score);

        for addr in &config.kyc_verified {
            store.insert(parse(addr)?, LabelKind::KycVerified, "kyc", "config");
        }
        for addr in &config.sanctioned {
            store.insert(parse(addr)?, LabelKind::Sanctioned, "sanctioned", "config");
        }
        for addr in &config.flagged {
            store.insert(parse(addr)?, LabelKind::Flagged, "flagged", "config");
        }
        for o in &config.asset_overrides {
            store.asset_overrides.insert(parse(&o.contract)?, o.score);
        }

        if let Some(path) = &config.ofac_sdn_path {
            match parse_ofac_csv(path) {
                Ok(entries) => {
                    let count = store.seed_ofac_entries(&entries);
                    tracing::info!(count, "OFAC SDN entries loaded");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load OFAC SDN file, continuing without");
                }
            }
        }

        for list in &config.custom_watchlists {
            match parse_watchlist_csv(&list.file_path) {
                Ok(entries) => {
                    let count = entries.len();
                    for (address, label) in entries {
                        store.insert(address, LabelKind::Flagged, &label, &list.name);
                    }
                    tracing::info!(watchlist = %list.name, count, "Custom watchlist loaded");
                }
                Err(e) => {
                    tracing::warn!(
                        watchlist = %list.name,
                        error = %e,
                        "Failed to load watchlist, continuing without"
                    );
                }
            }
        }

        Ok(store)
    }

    /// Merge labels from an `entity_labels` table.
    ///
    /// `sanctioned` rows (or any OFAC-sourced row) become sanctions,
    /// `kyc_verified` rows become KYC, and configured risky entity types become flags.
    pub async fn load_from_db(&mut self, pool: &PgPool, flag_entity_types: &[String]) -> eyre::Result<usize> {
        let rows: Vec<(Vec<u8>, String, String, String)> = sqlx::query_as(
            "SELECT address, entity_name, entity_type, label_source FROM entity_labels",
        )
        .fetch_all(pool)
        .await?;

        let mut count = 0;
        for (address, entity_name, entity_type, label_source) in rows {
            if address.len() != 20 {
                continue;
            }
            let kind = if entity_type == "sanctioned" || label_source == "ofac_sdn" {
                LabelKind::Sanctioned
            } else if entity_type == "kyc_verified" {
                LabelKind::KycVerified
            } else if flag_entity_types.iter().any(|t| *t == entity_type) {
                LabelKind::Flagged
            } else {
                continue;
            };
            self.insert(Address::from_slice(&address), kind, &entity_name, &label_source);
            count += 1;
        }

        tracing::info!(labels = count, "Loaded compliance labels from database");
        Ok(count)
    }

    pub fn insert(&mut self, address: Address, kind: LabelKind, name: &str, source: &str) {
        self.by_address.entry(address).or_default().push(ComplianceLabel {
            kind,
            name: name.to_string(),
            source: source.to_string(),
        });
    }

    pub fn lookup(&self, address: &Address) -> Option<&[ComplianceLabel]> {
        self.by_address.get(address).map(|v| v.as_slice())
    }

    fn has(&self, address: &Address, kind: LabelKind) -> bool {
        self.by_address
            .get(address)
            .map(|labels| labels.iter().any(|l| l.kind == kind))
            .unwrap_or(false)
    }

    pub fn status(&self, address: &Address) -> ComplianceStatus {
        ComplianceStatus {
            kyc_verified: self.has(address, LabelKind::KycVerified),
            sanctioned: self.has(address, LabelKind::Sanctioned),
            has_flags: self.has(address, LabelKind::Flagged),
        }
    }

    fn seed_ofac_entries(&mut self, entries: &[OfacEntry]) -> usize {
        let mut count = 0;
        for entry in entries {
            let name = if entry.program.is_empty() {
                entry.entity_name.clone()
            } else {
                format!("{} ({})", entry.entity_name, entry.program)
            };
            for addr_hex in &entry.addresses {
                let Ok(address) = Address::from_str(addr_hex) else {
                    tracing::debug!(sdn_id = %entry.sdn_id, address = %addr_hex, "Skipping unparseable SDN address");
                    continue;
                };
                self.insert(address, LabelKind::Sanctioned, &name, "ofac_sdn");
                count += 1;
            }
        }
        count
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

#[async_trait]
impl ComplianceProvider for WatchlistCompliance {
    async fn wallet_status(&self, address: Address) -> eyre::Result<ComplianceStatus> {
        for label in self.lookup(&address).unwrap_or_default() {
            tracing::debug!(
                %address,
                kind = ?label.kind,
                name = %label.name,
                source = %label.source,
                "Compliance label matched"
            );
        }
        Ok(self.status(&address))
    }

    async fn asset_score(&self, asset: &AssetId) -> eyre::Result<u32> {
        if self.has(&asset.contract, LabelKind::Sanctioned) {
            return Ok(1000);
        }
        Ok(self
            .asset_overrides
            .get(&asset.contract)
            .copied()
            .unwrap_or(self.asset_default_score))
    }
}

fn parse(addr: &str) -> eyre::Result<Address> {
    Address::from_str(addr.trim()).map_err(|e| eyre::eyre!("Invalid address '{}': {}", addr, e))
}

/// Parse an OFAC SDN CSV file (simplified format).
/// Expected CSV columns: sdn_id, entity_name, program, address
/// Each row represents one crypto address for one SDN entry.
pub fn parse_ofac_csv(path: &str) -> eyre::Result<Vec<OfacEntry>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("Failed to open OFAC CSV '{}': {}", path, e))?;
    parse_ofac_records(reader)
}

fn parse_ofac_records<R: std::io::Read>(mut reader: csv::Reader<R>) -> eyre::Result<Vec<OfacEntry>> {
    let mut by_sdn: HashMap<String, OfacEntry> = HashMap::new();

    for result in reader.records() {
        let record = result?;
        let sdn_id = record.get(0).unwrap_or("").trim().to_string();
        let entity_name = record.get(1).unwrap_or("").trim().to_string();
        let program = record.get(2).unwrap_or("").trim().to_string();
        let address = record.get(3).unwrap_or("").trim().to_string();

        if address.is_empty() || !address.starts_with("0x") {
            continue;
        }

        by_sdn
            .entry(sdn_id.clone())
            .or_insert_with(|| OfacEntry {
                sdn_id,
                entity_name,
                program,
                addresses: Vec::new(),
            })
            .addresses
            .push(address);
    }

    let entries: Vec<OfacEntry> = by_sdn.into_values().collect();
    tracing::info!(entries = entries.len(), "Parsed OFAC SDN entries");
    Ok(entries)
}

/// Parse a two-column watchlist CSV: address, label. Invalid rows are skipped.
pub fn parse_watchlist_csv(path: &str) -> eyre::Result<Vec<(Address, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("Failed to open watchlist CSV '{}': {}", path, e))?;

    let mut entries = Vec::new();
    for result in reader.records() {
        let record = result?;
        let raw = record.get(0).unwrap_or("").trim();
        let label = record.get(1).unwrap_or("watchlist").trim();
        match Address::from_str(raw) {
            Ok(address) => entries.push((address, label.to_string())),
            Err(_) => tracing::debug!(address = raw, "Skipping invalid watchlist row"),
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    const TORNADO: &str = "0x8589427373D6D84E98730D7795D8f6f8731FDA16";

    #[test]
    fn test_parse_ofac_groups_by_sdn() {
        let data = format!(
            "sdn_id,entity_name,program,address\n\
             1,Tornado Cash,CYBER2,{TORNADO}\n\
             1,Tornado Cash,CYBER2,0x722122dF12D4e14e13Ac3b6895a86e84145b6967\n\
             2,Someone,SDGT,bc1qnotanethaddress\n"
        );
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data.as_bytes());
        let entries = parse_ofac_records(reader).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].addresses.len(), 2);

        let mut store = WatchlistCompliance::new(150);
        assert_eq!(store.seed_ofac_entries(&entries), 2);
        let addr = Address::from_str(TORNADO).unwrap();
        assert!(store.status(&addr).sanctioned);
        let labels = store.lookup(&addr).unwrap();
        assert_eq!(labels[0].source, "ofac_sdn");
        assert_eq!(labels[0].name, "Tornado Cash (CYBER2)");
        assert!(store.lookup(&Address::with_last_byte(1)).is_none());
    }

    #[tokio::test]
    async fn test_status_combines_labels() {
        let mut store = WatchlistCompliance::new(150);
        assert!(store.is_empty());
        let addr = Address::with_last_byte(5);
        assert_eq!(store.wallet_status(addr).await.unwrap(), ComplianceStatus::default());

        store.insert(addr, LabelKind::KycVerified, "kyc", "test");
        store.insert(addr, LabelKind::Flagged, "mixer", "test");
        let status = store.wallet_status(addr).await.unwrap();
        assert!(status.kyc_verified);
        assert!(status.has_flags);
        assert!(!status.sanctioned);
    }

    #[tokio::test]
    async fn test_asset_scores() {
        let mut store = WatchlistCompliance::new(150);
        let contract = Address::with_last_byte(9);
        let asset = AssetId {
            contract,
            token_id: U256::from(1u64),
        };
        assert_eq!(store.asset_score(&asset).await.unwrap(), 150);

        store.asset_overrides.insert(contract, 40);
        assert_eq!(store.asset_score(&asset).await.unwrap(), 40);

        store.insert(contract, LabelKind::Sanctioned, "sanctioned", "test");
        assert_eq!(store.asset_score(&asset).await.unwrap(), 1000);
    }

    #[test]
    fn test_from_config_rejects_bad_address() {
        let config = ComplianceConfig {
            kyc_verified: vec!["nope".to_string()],
            ..Default::default()
        };
        assert!(WatchlistCompliance::from_config(&config).is_err());
    }
}
