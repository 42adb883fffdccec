//! Registry Store
//!
//! The table of children a node is authoritative for: directly registered
//! hosts and delegated subdomain servers. Both namespaces live behind one
//! lock, so the "a name is a host or a subdomain, never both" check and the
//! insert that follows it are a single atomic step.

use super::RegistryEvent;
use crate::error::{Error, Result};
use crate::protocol::{normalize_label, ChildKind, DomainName};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the registry event channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

// =============================================================================
// Registry Entry
// =============================================================================

/// Entry for a single registered child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Host or subdomain
    pub kind: ChildKind,
    /// Child's leaf label
    pub name: String,
    /// Address the child registered from
    pub endpoint: SocketAddr,
    /// Registration timestamp
    pub registered_at: DateTime<Utc>,
}

impl RegistryEntry {
    /// Create a new entry stamped with the current time
    pub fn new(kind: ChildKind, name: String, endpoint: SocketAddr) -> Self {
        Self {
            kind,
            name,
            endpoint,
            registered_at: Utc::now(),
        }
    }
}

// =============================================================================
// Namespaces
// =============================================================================

#[derive(Debug, Default)]
struct Namespaces {
    hosts: HashMap<String, RegistryEntry>,
    subdomains: HashMap<String, RegistryEntry>,
}

impl Namespaces {
    fn table(&self, kind: ChildKind) -> &HashMap<String, RegistryEntry> {
        match kind {
            ChildKind::Host => &self.hosts,
            ChildKind::Subdomain => &self.subdomains,
        }
    }

    fn table_mut(&mut self, kind: ChildKind) -> &mut HashMap<String, RegistryEntry> {
        match kind {
            ChildKind::Host => &mut self.hosts,
            ChildKind::Subdomain => &mut self.subdomains,
        }
    }

    /// Which namespace, if any, already holds `name`
    fn kind_of(&self, name: &str) -> Option<ChildKind> {
        if self.hosts.contains_key(name) {
            Some(ChildKind::Host)
        } else if self.subdomains.contains_key(name) {
            Some(ChildKind::Subdomain)
        } else {
            None
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Counters kept by the store
#[derive(Debug, Default)]
pub struct RegistryStats {
    pub registrations: AtomicU64,
    pub conflicts: AtomicU64,
    pub invalid_names: AtomicU64,
    pub lookups: AtomicU64,
    pub lookup_hits: AtomicU64,
}

impl RegistryStats {
    /// Create a snapshot of current stats
    pub fn snapshot(&self) -> RegistryStatsSnapshot {
        RegistryStatsSnapshot {
            registrations: self.registrations.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            invalid_names: self.invalid_names.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
            lookup_hits: self.lookup_hits.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStatsSnapshot {
    pub registrations: u64,
    pub conflicts: u64,
    pub invalid_names: u64,
    pub lookups: u64,
    pub lookup_hits: u64,
}

// =============================================================================
// Registry Store
// =============================================================================

/// Concurrency-safe registry of one node's hosts and subdomains
pub struct RegistryStore {
    /// Domain this registry is scoped to
    domain: DomainName,
    /// Hosts and subdomains, guarded together
    namespaces: RwLock<Namespaces>,
    /// Counters
    stats: RegistryStats,
    /// Event broadcaster
    event_sender: broadcast::Sender<RegistryEvent>,
}

impl std::fmt::Debug for RegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let namespaces = self.namespaces.read();
        f.debug_struct("RegistryStore")
            .field("domain", &self.domain)
            .field("hosts", &namespaces.hosts.len())
            .field("subdomains", &namespaces.subdomains.len())
            .finish()
    }
}

impl RegistryStore {
    /// Create an empty registry for `domain`
    pub fn new(domain: DomainName) -> Arc<Self> {
        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Arc::new(Self {
            domain,
            namespaces: RwLock::new(Namespaces::default()),
            stats: RegistryStats::default(),
            event_sender,
        })
    }

    /// Domain this registry is authoritative for
    pub fn domain(&self) -> &DomainName {
        &self.domain
    }

    /// Get an event receiver
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_sender.subscribe()
    }

    /// Register a child of the given kind.
    ///
    /// Fails with [`Error::RegistrationConflict`] when the name is already
    /// held in either namespace; the existing entry is left untouched.
    pub fn register(
        &self,
        kind: ChildKind,
        name: &str,
        endpoint: SocketAddr,
    ) -> Result<RegistryEntry> {
        let label = match normalize_label(name) {
            Ok(label) => label,
            Err(e) => {
                self.stats.invalid_names.fetch_add(1, Ordering::Relaxed);
                self.emit_rejected(kind, name, endpoint, &e);
                return Err(e);
            }
        };

        let result = {
            let mut namespaces = self.namespaces.write();
            match namespaces.kind_of(&label) {
                Some(existing) => Err(Error::RegistrationConflict {
                    name: label.clone(),
                    existing: existing.to_string(),
                }),
                None => {
                    let entry = RegistryEntry::new(kind, label.clone(), endpoint);
                    namespaces.table_mut(kind).insert(label, entry.clone());
                    Ok(entry)
                }
            }
        };

        match &result {
            Ok(entry) => {
                self.stats.registrations.fetch_add(1, Ordering::Relaxed);
                let _ = self.event_sender.send(RegistryEvent::Registered {
                    kind,
                    name: entry.name.clone(),
                    endpoint,
                });
            }
            Err(e) => {
                self.stats.conflicts.fetch_add(1, Ordering::Relaxed);
                self.emit_rejected(kind, name, endpoint, e);
            }
        }

        result
    }

    /// Register a host
    pub fn register_host(&self, name: &str, endpoint: SocketAddr) -> Result<RegistryEntry> {
        self.register(ChildKind::Host, name, endpoint)
    }

    /// Register a subdomain server
    pub fn register_subdomain(&self, name: &str, endpoint: SocketAddr) -> Result<RegistryEntry> {
        self.register(ChildKind::Subdomain, name, endpoint)
    }

    /// Exact, case-insensitive label lookup in one namespace
    pub fn lookup(&self, kind: ChildKind, name: &str) -> Option<SocketAddr> {
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);

        let label = name.to_ascii_lowercase();
        let endpoint = self
            .namespaces
            .read()
            .table(kind)
            .get(&label)
            .map(|entry| entry.endpoint);

        if endpoint.is_some() {
            self.stats.lookup_hits.fetch_add(1, Ordering::Relaxed);
        }
        endpoint
    }

    /// Look up a host
    pub fn lookup_host(&self, name: &str) -> Option<SocketAddr> {
        self.lookup(ChildKind::Host, name)
    }

    /// Look up a subdomain server
    pub fn lookup_subdomain(&self, name: &str) -> Option<SocketAddr> {
        self.lookup(ChildKind::Subdomain, name)
    }

    /// Consistent copy of one namespace, sorted by name
    pub fn snapshot(&self, kind: ChildKind) -> Vec<RegistryEntry> {
        let mut entries: Vec<_> = self.namespaces.read().table(kind).values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn snapshot_hosts(&self) -> Vec<RegistryEntry> {
        self.snapshot(ChildKind::Host)
    }

    pub fn snapshot_subdomains(&self) -> Vec<RegistryEntry> {
        self.snapshot(ChildKind::Subdomain)
    }

    /// Total number of registered children
    pub fn len(&self) -> usize {
        let namespaces = self.namespaces.read();
        namespaces.hosts.len() + namespaces.subdomains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get registry statistics
    pub fn stats(&self) -> RegistryStatsSnapshot {
        self.stats.snapshot()
    }

    fn emit_rejected(&self, kind: ChildKind, name: &str, endpoint: SocketAddr, error: &Error) {
        let _ = self.event_sender.send(RegistryEvent::Rejected {
            kind,
            name: name.to_string(),
            endpoint,
            reason: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashSet;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn root_store() -> Arc<RegistryStore> {
        RegistryStore::new(DomainName::root())
    }

    #[test]
    fn test_register_and_lookup() {
        let store = root_store();

        store.register_host("www", addr(53001)).unwrap();
        store.register_subdomain("com", addr(53002)).unwrap();

        assert_eq!(store.lookup_host("www"), Some(addr(53001)));
        assert_eq!(store.lookup_subdomain("com"), Some(addr(53002)));
        assert_eq!(store.lookup_subdomain("COM"), Some(addr(53002)));

        // Namespaces are disjoint
        assert_eq!(store.lookup_subdomain("www"), None);
        assert_eq!(store.lookup_host("com"), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_lookup_is_exact_not_substring() {
        let store = root_store();
        store.register_subdomain("com", addr(53002)).unwrap();

        assert_eq!(store.lookup_subdomain("co"), None);
        assert_eq!(store.lookup_subdomain("comm"), None);
        assert_eq!(store.lookup_subdomain("example.com"), None);
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let store = root_store();

        store.register_host("www", addr(53001)).unwrap();
        let result = store.register_host("www", addr(53009));
        assert_matches!(result, Err(Error::RegistrationConflict { ref name, .. }) if name == "www");

        assert_eq!(store.lookup_host("www"), Some(addr(53001)));
        assert_eq!(store.snapshot_hosts().len(), 1);
    }

    #[test]
    fn test_same_label_cannot_be_both_kinds() {
        let store = root_store();

        store.register_subdomain("com", addr(53002)).unwrap();
        assert_matches!(
            store.register_host("com", addr(53003)),
            Err(Error::RegistrationConflict { ref existing, .. }) if existing == "subdomain"
        );

        store.register_host("mail", addr(53004)).unwrap();
        assert_matches!(
            store.register_subdomain("MAIL", addr(53005)),
            Err(Error::RegistrationConflict { .. })
        );

        assert_eq!(store.lookup_host("com"), None);
        assert_eq!(store.lookup_subdomain("mail"), None);
        assert_eq!(store.stats().conflicts, 2);
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let store = root_store();

        assert_matches!(store.register_host("", addr(1)), Err(Error::InvalidName { .. }));
        assert_matches!(store.register_host("a.b", addr(1)), Err(Error::InvalidName { .. }));
        assert!(store.is_empty());
        assert_eq!(store.stats().invalid_names, 2);
    }

    #[test]
    fn test_snapshot_sorted_by_name() {
        let store = root_store();
        store.register_subdomain("org", addr(3)).unwrap();
        store.register_subdomain("com", addr(1)).unwrap();
        store.register_subdomain("net", addr(2)).unwrap();

        let names: Vec<_> = store
            .snapshot_subdomains()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, ["com", "net", "org"]);
        assert!(store.snapshot_hosts().is_empty());
    }

    #[test]
    fn test_events_are_broadcast() {
        let store = root_store();
        let mut events = store.subscribe();

        store.register_subdomain("com", addr(53002)).unwrap();
        let _ = store.register_host("com", addr(53003));

        assert_eq!(
            events.try_recv().unwrap(),
            RegistryEvent::Registered {
                kind: ChildKind::Subdomain,
                name: "com".to_string(),
                endpoint: addr(53002),
            }
        );
        assert_matches!(events.try_recv().unwrap(), RegistryEvent::Rejected { kind: ChildKind::Host, .. });
    }

    #[test]
    fn test_concurrent_registrations() {
        const N: u16 = 64;
        let store = root_store();

        let handles: Vec<_> = (0..N)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let kind = if i % 2 == 0 { ChildKind::Host } else { ChildKind::Subdomain };
                    store.register(kind, &format!("child-{}", i), addr(53000 + i))
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let registered: HashSet<_> = store
            .snapshot_hosts()
            .into_iter()
            .chain(store.snapshot_subdomains())
            .map(|entry| entry.name)
            .collect();
        let expected: HashSet<_> = (0..N).map(|i| format!("child-{}", i)).collect();

        assert_eq!(registered, expected);
        assert_eq!(store.stats().registrations, N as u64);
    }

    #[test]
    fn test_concurrent_duplicates_admit_exactly_one() {
        let store = root_store();

        let handles: Vec<_> = (0..16u16)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.register_subdomain("com", addr(53000 + i)).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(store.len(), 1);
    }
}
