/// Recipient directory: who receives alerts, and for which regions.
///
/// The subscription bot maintains two files — a chat-id list and a
/// per-recipient region map. This service only reads them; configured
/// admin chat ids are merged in and always receive alerts. An empty
/// region list means "all regions".

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::logging::{self, Component};
use crate::model::RecipientSubscription;

/// Load the recipient directory, merging subscriber and admin chat ids.
///
/// Missing or unreadable directory files degrade to "admins only" with a
/// warning — the directory belongs to another process, and a broken file
/// there must not abort a monitoring run.
pub fn load_recipients(
    users_path: &str,
    regions_path: &str,
    admin_chat_ids: &[i64],
) -> Vec<RecipientSubscription> {
    let user_ids = load_user_ids(users_path);
    let regions = load_user_regions(regions_path);

    // BTreeSet dedups admin/user overlap and fixes the iteration order.
    let mut all_ids: BTreeSet<i64> = user_ids.into_iter().collect();
    all_ids.extend(admin_chat_ids.iter().copied());

    all_ids
        .into_iter()
        .map(|chat_id| RecipientSubscription {
            chat_id,
            regions: regions.get(&chat_id.to_string()).cloned().unwrap_or_default(),
        })
        .collect()
}

fn load_user_ids(path: &str) -> Vec<i64> {
    if !Path::new(path).exists() {
        return Vec::new();
    }
    match std::fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(ids) => ids,
            Err(e) => {
                logging::warn(Component::Telegram, None, &format!("bad users file {}: {}", path, e));
                Vec::new()
            }
        },
        Err(e) => {
            logging::warn(Component::Telegram, None, &format!("cannot read {}: {}", path, e));
            Vec::new()
        }
    }
}

fn load_user_regions(path: &str) -> HashMap<String, Vec<String>> {
    if !Path::new(path).exists() {
        return HashMap::new();
    }
    match std::fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(map) => map,
            Err(e) => {
                logging::warn(Component::Telegram, None, &format!("bad regions file {}: {}", path, e));
                HashMap::new()
            }
        },
        Err(e) => {
            logging::warn(Component::Telegram, None, &format!("cannot read {}: {}", path, e));
            HashMap::new()
        }
    }
}
