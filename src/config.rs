/// Service configuration loaded from `peatmon.toml`.
///
/// Every field has a default so the service runs from a bare checkout;
/// a missing config file is a logged warning, not an error. Secrets
/// (Telegram bot token, database URL) never live here — they come from
/// the environment, loaded via dotenv in `main`.

use serde::Deserialize;
use std::path::Path;

use crate::logging::{self, Component};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Peatland polygon dataset (GeoJSON FeatureCollection).
    pub polygon_path: String,
    /// Directory holding archived FIRMS CSVs for `--source local`.
    pub archive_dir: String,
    /// Append-only delivery ledger file.
    pub ledger_path: String,
    /// Recipient chat-id list maintained by the subscription bot.
    pub users_path: String,
    /// Per-recipient region subscriptions.
    pub regions_path: String,
    /// Latest-alerts snapshot for on-demand recall.
    pub snapshot_path: String,
    /// Wiki reference lookup cache.
    pub wiki_cache_path: String,
    /// Uncertainty radius in meters applied to sources missing from the
    /// tolerance table.
    pub default_tolerance_m: f64,
    /// Timeout applied to every outbound HTTP request.
    pub http_timeout_secs: u64,
    /// Chat ids that always receive alerts, merged with the user list.
    pub admin_chat_ids: Vec<i64>,
    /// Optional log file; console logging is always on.
    pub log_file: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            polygon_path: "data/Final_CFO(9region).geojson".to_string(),
            archive_dir: "data/firms_archive".to_string(),
            ledger_path: "data/sent_log.json".to_string(),
            users_path: "data/users.json".to_string(),
            regions_path: "data/user_regions.json".to_string(),
            snapshot_path: "data/last_alerts.json".to_string(),
            wiki_cache_path: "data/wiki_cache.json".to_string(),
            default_tolerance_m: crate::tolerances::DEFAULT_TOLERANCE_M,
            http_timeout_secs: 30,
            admin_chat_ids: Vec::new(),
            log_file: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file is absent. A present-but-invalid file is an error: running
    /// with silently ignored configuration is worse than not starting.
    pub fn load(path: &str) -> Result<Self, String> {
        if !Path::new(path).exists() {
            logging::warn(
                Component::System,
                None,
                &format!("config file {} not found, using defaults", path),
            );
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path, e))?;
        toml::from_str(&text).map_err(|e| format!("cannot parse {}: {}", path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_field() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.default_tolerance_m, 500.0);
        assert_eq!(cfg.http_timeout_secs, 30);
        assert!(cfg.admin_chat_ids.is_empty());
        assert!(cfg.log_file.is_none());
    }

    #[test]
    fn test_partial_toml_fills_missing_fields_from_defaults() {
        let cfg: ServiceConfig = toml::from_str(
            r#"
            default_tolerance_m = 750.0
            admin_chat_ids = [111, 222]
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(cfg.default_tolerance_m, 750.0);
        assert_eq!(cfg.admin_chat_ids, vec![111, 222]);
        // untouched fields keep their defaults
        assert_eq!(cfg.ledger_path, "data/sent_log.json");
        assert_eq!(cfg.http_timeout_secs, 30);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let cfg = ServiceConfig::load("definitely/not/here.toml")
            .expect("missing file should not be an error");
        assert_eq!(cfg.polygon_path, ServiceConfig::default().polygon_path);
    }
}
