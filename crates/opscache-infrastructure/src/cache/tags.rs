//! Tag index
//!
//! Forward (tag -> keys) and reverse (key -> tags) maps kept in step under one
//! lock. A key is listed under a tag iff its latest write carried that tag and
//! some tier may still hold it. Each key records when its entry expires and
//! whether only the local tier holds it, so expired and evicted keys can be
//! dropped. The lock is never held across an `.await`.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Where a tagged entry lives and until when
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagLifetime {
    /// Absolute expiry of the entry, `None` when it never expires
    pub expires_at: Option<DateTime<Utc>>,
    /// Only the local tier holds the entry
    pub local_only: bool,
}

impl TagLifetime {
    /// Entry held by the local tier alone
    pub fn local(expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            expires_at,
            local_only: true,
        }
    }

    /// Entry held by the distributed tier, with or without a local copy
    pub fn shared(expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            expires_at,
            local_only: false,
        }
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[derive(Debug)]
struct TaggedKey {
    tags: BTreeSet<String>,
    lifetime: TagLifetime,
}

#[derive(Debug, Default)]
struct TagMaps {
    keys_by_tag: HashMap<String, HashSet<String>>,
    tags_by_key: HashMap<String, TaggedKey>,
}

impl TagMaps {
    fn unlink(&mut self, key: &str) {
        let Some(TaggedKey { tags, .. }) = self.tags_by_key.remove(key) else {
            return;
        };
        for tag in tags {
            if let Some(keys) = self.keys_by_tag.get_mut(&tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.keys_by_tag.remove(&tag);
                }
            }
        }
    }
}

/// Process-local tag index
#[derive(Debug, Default)]
pub struct TagIndex {
    maps: RwLock<TagMaps>,
}

impl TagIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, TagMaps> {
        self.maps.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TagMaps> {
        self.maps.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Associate `key` with exactly `tags`, replacing earlier associations
    pub fn set_tags(&self, key: &str, tags: &BTreeSet<String>, lifetime: TagLifetime) {
        let mut maps = self.write();
        maps.unlink(key);
        if tags.is_empty() {
            return;
        }

        for tag in tags {
            maps.keys_by_tag
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        maps.tags_by_key.insert(
            key.to_string(),
            TaggedKey {
                tags: tags.clone(),
                lifetime,
            },
        );
    }

    /// Drop `key` after the local tier lost the entry expiring at `expires_at`
    ///
    /// Only applies while the key is local-only and still indexed for that
    /// same entry; a newer write or a distributed copy keeps it.
    pub fn forget_local(&self, key: &str, expires_at: Option<DateTime<Utc>>) -> bool {
        let mut maps = self.write();
        let stale = maps.tags_by_key.get(key).is_some_and(|tagged| {
            tagged.lifetime == TagLifetime::local(expires_at)
        });
        if stale {
            maps.unlink(key);
        }
        stale
    }

    /// Drop every key whose entry has expired by `now`; returns how many
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let mut maps = self.write();
        let expired: Vec<String> = maps
            .tags_by_key
            .iter()
            .filter(|(_, tagged)| tagged.lifetime.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            maps.unlink(key);
        }
        expired.len()
    }

    /// Whether `key` is indexed as held by the local tier alone
    pub fn is_local_only(&self, key: &str) -> bool {
        self.read()
            .tags_by_key
            .get(key)
            .is_some_and(|tagged| tagged.lifetime.local_only)
    }

    /// Drop every association of `key`
    pub fn remove_key(&self, key: &str) {
        self.write().unlink(key);
    }

    /// Drop every association of each key; tags left without keys disappear
    pub fn remove_keys(&self, keys: &[String]) {
        let mut maps = self.write();
        for key in keys {
            maps.unlink(key);
        }
    }

    /// Snapshot of the keys carrying `tag`, sorted
    pub fn keys_for(&self, tag: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .read()
            .keys_by_tag
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Tags currently associated with `key`
    pub fn tags_of(&self, key: &str) -> BTreeSet<String> {
        self.read()
            .tags_by_key
            .get(key)
            .map(|tagged| tagged.tags.clone())
            .unwrap_or_default()
    }

    /// Whether `tag` has any key
    pub fn contains_tag(&self, tag: &str) -> bool {
        self.read().keys_by_tag.contains_key(tag)
    }

    /// Number of indexed keys
    pub fn key_count(&self) -> usize {
        self.read().tags_by_key.len()
    }

    /// Number of tags with at least one key
    pub fn tag_count(&self) -> usize {
        self.read().keys_by_tag.len()
    }

    /// Drop everything
    pub fn clear(&self) {
        let mut maps = self.write();
        maps.keys_by_tag.clear();
        maps.tags_by_key.clear();
    }
}
