use crate::geocoder::Geocoder;
use crate::models::{Coordinates, GraduateRecord, RosterSnapshot};
use chrono::NaiveDateTime;
use futures::stream::{self, StreamExt};
use log::info;
use std::collections::{HashMap, HashSet};

/// Roster split into records that can be placed on the map and those that
/// cannot. Both partitions keep input order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRoster {
    pub geocoded: Vec<GraduateRecord>,
    pub unlocatable: Vec<GraduateRecord>,
    pub last_updated: Option<NaiveDateTime>,
}

impl NormalizedRoster {
    pub fn total(&self) -> usize {
        self.geocoded.len() + self.unlocatable.len()
    }

    /// Every record, geocoded first.
    pub fn all_records(&self) -> impl Iterator<Item = &GraduateRecord> {
        self.geocoded.iter().chain(self.unlocatable.iter())
    }

    pub fn unlocatable_names(&self) -> Vec<&str> {
        self.unlocatable.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Uppercase the first letter of every word and lowercase the rest. A word
/// starts at any letter not preceded by another letter.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;

    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }

    out
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Cleaned copy of a record's display text. Address and work setting are
/// kept exactly as submitted.
pub fn normalize_text(record: &GraduateRecord) -> GraduateRecord {
    GraduateRecord {
        name: title_case(record.name.trim()),
        class_year: clean(record.class_year.as_deref()),
        department: clean(record.department.as_deref()),
        employer: clean(record.employer.as_deref()).map(|e| title_case(&e)),
        ..record.clone()
    }
}

/// Distinct non-empty addresses in order of first appearance.
fn distinct_addresses(snapshot: &RosterSnapshot) -> Vec<&str> {
    let mut seen = HashSet::new();
    snapshot
        .records
        .iter()
        .filter_map(GraduateRecord::lookup_address)
        .filter(|address| seen.insert(*address))
        .collect()
}

/// Geocode every distinct address once, then produce normalized records
/// partitioned into geocoded and unlocatable sets.
///
/// Up to `concurrency` lookups run at a time. Results are joined back by
/// address, so the output does not depend on completion order.
pub async fn normalize<G>(snapshot: &RosterSnapshot, geocoder: &G, concurrency: usize) -> NormalizedRoster
where
    G: Geocoder + Sync,
{
    let addresses = distinct_addresses(snapshot);
    info!(
        "Geocoding {} distinct addresses for {} graduates",
        addresses.len(),
        snapshot.len()
    );

    let resolved: HashMap<&str, Option<Coordinates>> = stream::iter(addresses)
        .map(|address| async move { (address, geocoder.lookup(address).await) })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut geocoded = Vec::new();
    let mut unlocatable = Vec::new();

    for record in &snapshot.records {
        let mut normalized = normalize_text(record);
        normalized.coordinates = record
            .lookup_address()
            .and_then(|address| resolved.get(address).copied().flatten());

        if normalized.is_geocoded() {
            geocoded.push(normalized);
        } else {
            unlocatable.push(normalized);
        }
    }

    info!(
        "Geocoded {} of {} graduates ({} unlocatable)",
        geocoded.len(),
        snapshot.len(),
        unlocatable.len()
    );

    NormalizedRoster {
        geocoded,
        unlocatable,
        last_updated: snapshot.last_updated,
    }
}
