//! Source Registry
//!
//! Static catalog of the enterprise systems a question can be asked against. Every live
//! system has exactly one offline counterpart (`local_<base_id>`) that serves bundled
//! fixtures instead of calling the warehouse.

use crate::error::{BiError, Result};
use lazy_static::lazy_static;
use serde::Serialize;
use tracing::warn;

pub const LOCAL_PREFIX: &str = "local_";
pub const DEFAULT_SOURCE_ID: &str = "salesforce";

/// Whether a source is served by the live warehouse or by offline fixtures.
/// Carries the base identifier so call sites never re-parse the id string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SourceKind {
    Live(String),
    Offline(String),
}

impl SourceKind {
    pub fn base_id(&self) -> &str {
        match self {
            SourceKind::Live(base) | SourceKind::Offline(base) => base,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, SourceKind::Offline(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub description: String,
    pub color: String,
    pub kind: SourceKind,
}

impl SourceDescriptor {
    pub fn base_id(&self) -> &str {
        self.kind.base_id()
    }

    pub fn is_local(&self) -> bool {
        self.kind.is_offline()
    }

    /// Label as shown in selectors, e.g. "☁️ Salesforce".
    pub fn display_label(&self) -> String {
        format!("{} {}", self.icon, self.label)
    }
}

struct LiveEntry {
    id: &'static str,
    label: &'static str,
    icon: &'static str,
    description: &'static str,
    color: &'static str,
    local_label: &'static str,
    local_description: &'static str,
}

const LIVE_ENTRIES: &[LiveEntry] = &[
    LiveEntry {
        id: "salesforce",
        label: "Salesforce",
        icon: "☁️",
        description: "CRM — Leads, Opportunities, Accounts, Cases",
        color: "#00A1E0",
        local_label: "Local · Salesforce",
        local_description: "Demo CRM data — no GCP needed",
    },
    LiveEntry {
        id: "netsuite",
        label: "NetSuite",
        icon: "📊",
        description: "ERP — Finance, GL, Accounts Payable/Receivable",
        color: "#1B3A5C",
        local_label: "Local · NetSuite",
        local_description: "Demo ERP data — no GCP needed",
    },
    LiveEntry {
        id: "coupa",
        label: "Coupa",
        icon: "🛒",
        description: "Procurement — Purchase Orders, Invoices, Suppliers",
        color: "#E74C3C",
        local_label: "Local · Coupa",
        local_description: "Demo Procurement data — no GCP needed",
    },
    LiveEntry {
        id: "workday",
        label: "Workday",
        icon: "👥",
        description: "HCM — Employees, Payroll, Time Off, Headcount",
        color: "#F5A623",
        local_label: "Local · Workday",
        local_description: "Demo HCM data — no GCP needed",
    },
    LiveEntry {
        id: "jira",
        label: "JIRA",
        icon: "🎯",
        description: "Project Management — Issues, Sprints, Backlogs",
        color: "#0052CC",
        local_label: "Local · JIRA",
        local_description: "Demo Project data — no GCP needed",
    },
    LiveEntry {
        id: "inhouse",
        label: "In-House Systems",
        icon: "🏢",
        description: "Custom — Product Metrics, IoT, Internal KPIs",
        color: "#8B5CF6",
        local_label: "Local · In-House",
        local_description: "Demo Internal KPI data — no GCP needed",
    },
];

lazy_static! {
    static ref CATALOG: Vec<SourceDescriptor> = {
        let live = LIVE_ENTRIES.iter().map(|e| SourceDescriptor {
            id: e.id.to_string(),
            label: e.label.to_string(),
            icon: e.icon.to_string(),
            description: e.description.to_string(),
            color: e.color.to_string(),
            kind: SourceKind::Live(e.id.to_string()),
        });
        let local = LIVE_ENTRIES.iter().map(|e| SourceDescriptor {
            id: local_id(e.id),
            label: e.local_label.to_string(),
            icon: "💾".to_string(),
            description: e.local_description.to_string(),
            color: "#6b7280".to_string(),
            kind: SourceKind::Offline(e.id.to_string()),
        });
        live.chain(local).collect()
    };
}

/// Strip every leading offline prefix. Idempotent: a base id is returned unchanged.
pub fn strip_local_prefix(id: &str) -> &str {
    id.trim_start_matches(LOCAL_PREFIX)
}

/// Offline counterpart of a base (or already offline) id.
pub fn local_id(id: &str) -> String {
    format!("{}{}", LOCAL_PREFIX, strip_local_prefix(id))
}

/// Read-only view over the static catalog. Cheap to copy and safe to share.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRegistry;

impl SourceRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn all(&self) -> &'static [SourceDescriptor] {
        &CATALOG
    }

    pub fn live_sources(&self) -> impl Iterator<Item = &'static SourceDescriptor> {
        CATALOG.iter().filter(|s| !s.is_local())
    }

    pub fn local_sources(&self) -> impl Iterator<Item = &'static SourceDescriptor> {
        CATALOG.iter().filter(|s| s.is_local())
    }

    pub fn resolve(&self, id: &str) -> Result<&'static SourceDescriptor> {
        CATALOG
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| BiError::UnknownSource {
                id: id.to_string(),
                suggestion: self.suggest(id),
            })
    }

    /// Resolve, falling back to the default source when the id is not in the catalog.
    pub fn resolve_or_default(&self, id: &str) -> &'static SourceDescriptor {
        match self.resolve(id) {
            Ok(source) => source,
            Err(e) => {
                warn!("{}; falling back to '{}'", e, DEFAULT_SOURCE_ID);
                self.default_source()
            }
        }
    }

    pub fn default_source(&self) -> &'static SourceDescriptor {
        &CATALOG[0]
    }

    /// Match either the full display label ("☁️ Salesforce") or the bare label.
    pub fn by_label(&self, label: &str) -> Option<&'static SourceDescriptor> {
        CATALOG
            .iter()
            .find(|s| s.display_label() == label || s.label == label)
    }

    pub fn is_local(&self, id: &str) -> bool {
        self.resolve(id).map(|s| s.is_local()).unwrap_or(false)
    }

    /// The offline counterpart of any known source.
    pub fn offline_counterpart(&self, id: &str) -> Result<&'static SourceDescriptor> {
        let source = self.resolve(id)?;
        self.resolve(&local_id(source.base_id()))
    }

    /// The live counterpart of any known source.
    pub fn live_counterpart(&self, id: &str) -> Result<&'static SourceDescriptor> {
        let source = self.resolve(id)?;
        self.resolve(source.base_id())
    }

    fn suggest(&self, id: &str) -> Option<String> {
        CATALOG
            .iter()
            .map(|s| (strsim::jaro_winkler(&s.id, id), &s.id))
            .filter(|(score, _)| *score >= 0.85)
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, id)| id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_local_prefix_is_idempotent() {
        for id in ["local_salesforce", "salesforce", "local_local_jira", "", "local_"] {
            let once = strip_local_prefix(id);
            assert_eq!(strip_local_prefix(once), once, "not idempotent for {:?}", id);
        }
        assert_eq!(strip_local_prefix("local_workday"), "workday");
        assert_eq!(strip_local_prefix("workday"), "workday");
        assert_eq!(strip_local_prefix("local_local_jira"), "jira");
    }

    #[test]
    fn test_every_live_source_has_one_offline_counterpart() {
        let registry = SourceRegistry::new();
        let live: Vec<_> = registry.live_sources().collect();
        assert_eq!(live.len(), 6);
        for source in live {
            let offline: Vec<_> = registry
                .local_sources()
                .filter(|s| s.base_id() == source.base_id())
                .collect();
            assert_eq!(offline.len(), 1, "pairing broken for {}", source.id);
            assert_eq!(offline[0].id, local_id(&source.id));
            assert_eq!(
                registry.live_counterpart(&offline[0].id).unwrap().id,
                source.id
            );
            assert_eq!(registry.offline_counterpart(&source.id).unwrap().id, offline[0].id);
            assert_eq!(registry.offline_counterpart(&offline[0].id).unwrap().id, offline[0].id);
        }
    }

    #[test]
    fn test_counterpart_of_unknown_source_fails() {
        let registry = SourceRegistry::new();
        assert!(matches!(
            registry.offline_counterpart("oracle"),
            Err(BiError::UnknownSource { .. })
        ));
    }

    #[test]
    fn test_resolve_kinds() {
        let registry = SourceRegistry::new();
        let local = registry.resolve("local_workday").unwrap();
        assert_eq!(local.kind, SourceKind::Offline("workday".to_string()));
        assert!(registry.is_local("local_workday"));
        assert!(!registry.is_local("workday"));
        assert!(!registry.is_local("nope"));
    }

    #[test]
    fn test_unknown_source_suggests_and_defaults() {
        let registry = SourceRegistry::new();
        match registry.resolve("salesforc") {
            Err(BiError::UnknownSource { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("salesforce"));
            }
            other => panic!("expected UnknownSource, got {:?}", other),
        }
        assert_eq!(registry.resolve_or_default("??").id, DEFAULT_SOURCE_ID);
    }

    #[test]
    fn test_by_label() {
        let registry = SourceRegistry::new();
        assert_eq!(registry.by_label("☁️ Salesforce").unwrap().id, "salesforce");
        assert_eq!(registry.by_label("Local · JIRA").unwrap().id, "local_jira");
        assert!(registry.by_label("Oracle").is_none());
    }
}
