//! Listener reconciliation primitives.
//!
//! This library decides which listeners must change on a load balancer.
//! Key concepts:
//!
//! - **Fingerprint**: hash of a listener's identity fields. Equal
//!   fingerprints mean "the same remote object".
//! - **Diff**: set difference of desired and current listeners under
//!   fingerprint equality.
//! - **Drift**: a listener present on both sides whose non-identity
//!   settings differ. The diff never acts on drift by itself; see
//!   [`DriftPolicy`].
//!
//! # Invariants
//!
//! - Fingerprints depend only on instance port, listener port, protocol,
//!   bandwidth and certificate.
//! - `diff(D, D)` is empty.
//! - Decisions are deterministic given the same inputs.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use sha2::{Digest, Sha256};
use slb_listener::{Listener, ListenerKey};
use thiserror::Error;

/// Errors in a listener set that make it unusable for reconciliation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Two listeners claim the same load balancer port.
    #[error("listeners {first} and {second} share load balancer port {port}")]
    DuplicatePort {
        port: u16,
        first: ListenerKey,
        second: ListenerKey,
    },

    /// Two listeners have the same identity.
    #[error("listener {0} is declared more than once")]
    DuplicateFingerprint(ListenerKey),
}

// ============================================================================
// Fingerprints
// ============================================================================

/// Identity hash of a listener.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a listener's identity fields.
    pub fn of(listener: &Listener) -> Self {
        let identity = format!(
            "{}-{}-{}-{}-{}-",
            listener.instance_port,
            listener.load_balancer_port,
            listener.protocol.as_str().to_lowercase(),
            listener.bandwidth,
            listener.ssl_certificate_id,
        );
        Self(digest(identity.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash of the settings a remote read can reconstruct.
///
/// Used to detect drift between a declared and a described listener that
/// share a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SettingsDigest(String);

impl SettingsDigest {
    /// Digest the protocol-defined fields of a listener.
    pub fn of(listener: &Listener) -> Self {
        Self(digest(canonical_json(&settings_json(listener)).as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SettingsDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// JSON of the fields a listener's protocol defines.
fn settings_json(listener: &Listener) -> serde_json::Value {
    // Plain struct of strings, integers and string-valued enums.
    serde_json::to_value(listener.projected()).expect("listener serializes to JSON")
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    format!("sha256:{}", hex::encode(&result[..16])) // First 16 bytes (128 bits)
}

/// Produce canonical JSON (sorted keys, no extra whitespace).
fn canonical_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let inner: Vec<String> = pairs
                .iter()
                .map(|(k, v)| format!("{}:{}", serde_json::Value::from(k.as_str()), canonical_json(v)))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
        serde_json::Value::Array(arr) => {
            let inner: Vec<String> = arr.iter().map(canonical_json).collect();
            format!("[{}]", inner.join(","))
        }
        other => other.to_string(),
    }
}

/// Check that a listener set can be reconciled: one listener per port and
/// no repeated identity.
pub fn check_listener_set(listeners: &[Listener]) -> Result<(), ReconcileError> {
    let mut ports: BTreeMap<u16, ListenerKey> = BTreeMap::new();
    let mut fingerprints = BTreeSet::new();

    for listener in listeners {
        if !fingerprints.insert(Fingerprint::of(listener)) {
            return Err(ReconcileError::DuplicateFingerprint(listener.key()));
        }
        if let Some(first) = ports.insert(listener.load_balancer_port, listener.key()) {
            return Err(ReconcileError::DuplicatePort {
                port: listener.load_balancer_port,
                first,
                second: listener.key(),
            });
        }
    }

    Ok(())
}

// ============================================================================
// Diff
// ============================================================================

/// A listener whose identity matches but whose settings differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    pub desired: Listener,
    pub current: Listener,
}

impl Drift {
    pub fn key(&self) -> ListenerKey {
        self.desired.key()
    }

    /// Names of the differing settings, for logs.
    pub fn changed_fields(&self) -> Vec<String> {
        let desired = settings_json(&self.desired);
        let current = settings_json(&self.current);
        let (Some(desired), Some(current)) = (desired.as_object(), current.as_object()) else {
            return Vec::new();
        };

        let keys: BTreeSet<&String> = desired.keys().chain(current.keys()).collect();
        keys.into_iter()
            .filter(|k| desired.get(*k) != current.get(*k))
            .cloned()
            .collect()
    }
}

/// What to do with drifted listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriftPolicy {
    /// Report drift only; identity-equal listeners are left alone.
    #[default]
    Ignore,

    /// Delete and recreate drifted listeners.
    Recreate,
}

/// Result of comparing desired and current listener sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerDiff {
    /// Current listeners with no desired counterpart.
    pub to_remove: Vec<Listener>,

    /// Desired listeners with no current counterpart.
    pub to_add: Vec<Listener>,

    /// Listeners present on both sides with differing settings.
    pub drifted: Vec<Drift>,
}

impl ListenerDiff {
    /// Returns true if nothing needs to be removed or added.
    pub fn is_converged(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }

    /// Fold drifted listeners into the remove and add batches under `policy`.
    pub fn apply_drift_policy(mut self, policy: DriftPolicy) -> Self {
        if policy == DriftPolicy::Recreate {
            for drift in &self.drifted {
                self.to_remove.push(drift.current.clone());
                self.to_add.push(drift.desired.clone());
            }
            self.to_remove.sort_by_key(Listener::key);
            self.to_add.sort_by_key(Listener::key);
        }
        self
    }
}

/// Set-difference `desired` and `current` by fingerprint.
///
/// Both inputs are expected to be free of duplicate fingerprints. Each batch
/// is returned ordered by load balancer port.
pub fn diff(desired: &[Listener], current: &[Listener]) -> ListenerDiff {
    let desired_index: BTreeMap<Fingerprint, &Listener> =
        desired.iter().map(|l| (Fingerprint::of(l), l)).collect();
    let current_index: BTreeMap<Fingerprint, &Listener> =
        current.iter().map(|l| (Fingerprint::of(l), l)).collect();

    let (_, mut to_remove) = partition_by(current, |l| desired_index.contains_key(&Fingerprint::of(l)));
    let (kept, mut to_add) = partition_by(desired, |l| current_index.contains_key(&Fingerprint::of(l)));

    let mut drifted: Vec<Drift> = kept
        .into_iter()
        .filter_map(|desired| {
            let current = current_index.get(&Fingerprint::of(&desired))?;
            (SettingsDigest::of(&desired) != SettingsDigest::of(current)).then(|| Drift {
                desired,
                current: (*current).clone(),
            })
        })
        .collect();

    to_remove.sort_by_key(Listener::key);
    to_add.sort_by_key(Listener::key);
    drifted.sort_by_key(Drift::key);

    ListenerDiff {
        to_remove,
        to_add,
        drifted,
    }
}

/// Split listeners into (matching, rest) by predicate.
fn partition_by<F>(listeners: &[Listener], matches: F) -> (Vec<Listener>, Vec<Listener>)
where
    F: Fn(&Listener) -> bool,
{
    let mut matching = Vec::new();
    let mut rest = Vec::new();

    for listener in listeners {
        if matches(listener) {
            matching.push(listener.clone());
        } else {
            rest.push(listener.clone());
        }
    }

    (matching, rest)
}

/// Default reconciliation interval.
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(30);

/// Default interval between listener status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default time to wait for a created listener to report `stopped`.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);
