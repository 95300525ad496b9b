//! Channel and region filters for the ranked store list.

use crate::models::{InsightRecord, TOP_STORES_KEY};
use serde_json::{Map, Value};

const MATCH_ALL: &str = "all";

/// Optional filters applied to `lojas_top` of a single-period result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsightFilter {
    /// Sales channel (`saleschannel` field); `all` disables the filter.
    pub channel: Option<String>,
    /// Delivery region (`delivery.region`, falling back to `region`).
    pub region: Option<String>,
}

impl InsightFilter {
    pub fn new(channel: Option<String>, region: Option<String>) -> Self {
        Self {
            channel: normalize(channel),
            region: normalize(region),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_none() && self.region.is_none()
    }

    /// Return `record` with `lojas_top` narrowed to matching entries.
    ///
    /// Everything else in the record is passed through untouched, and a
    /// record without a store list is returned as is. When a filter is set,
    /// list entries that are not objects carry no channel or region and are
    /// dropped.
    pub fn apply(&self, mut record: InsightRecord) -> InsightRecord {
        if self.is_empty() || record.get(TOP_STORES_KEY).is_none() {
            return record;
        }

        let kept: Vec<Value> = record
            .top_stores()
            .into_iter()
            .filter(|store| self.matches(store))
            .map(|store| Value::Object(store.clone()))
            .collect();

        record.set_ranked_list(TOP_STORES_KEY, kept);
        record
    }

    fn matches(&self, store: &Map<String, Value>) -> bool {
        if let Some(ref channel) = self.channel {
            if field_lower(store, &["saleschannel"]) != *channel {
                return false;
            }
        }
        if let Some(ref region) = self.region {
            if field_lower(store, &["delivery.region", "region"]) != *region {
                return false;
            }
        }
        true
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty() && v != MATCH_ALL)
}

/// First non-empty string among `keys`, lowercased; empty when none match.
fn field_lower(store: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| store.get(*k).and_then(Value::as_str))
        .find(|v| !v.is_empty())
        .unwrap_or("")
        .to_lowercase()
}
