//! Prometheus Exposition
//!
//! Renders the per-group counters of a [`GroupRegistry`] in the Prometheus
//! text format. Each render builds a private registry from a snapshot, so
//! values are always current and nothing leaks into the global registry.

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::error::{Error, Result};
use crate::group::GroupRegistry;

const NAMESPACE: &str = "meshcache";

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounterVec> {
    let vec = IntCounterVec::new(Opts::new(name, help).namespace(NAMESPACE), &["group"])
        .map_err(|e| Error::Internal(format!("metric {}: {}", name, e)))?;
    registry
        .register(Box::new(vec.clone()))
        .map_err(|e| Error::Internal(format!("metric {}: {}", name, e)))?;
    Ok(vec)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGaugeVec> {
    let vec = IntGaugeVec::new(Opts::new(name, help).namespace(NAMESPACE), &["group"])
        .map_err(|e| Error::Internal(format!("metric {}: {}", name, e)))?;
    registry
        .register(Box::new(vec.clone()))
        .map_err(|e| Error::Internal(format!("metric {}: {}", name, e)))?;
    Ok(vec)
}

/// Render every group's counters and cache occupancy
pub fn render_prometheus(groups: &GroupRegistry) -> Result<String> {
    let registry = Registry::new();

    let gets = counter(&registry, "gets_total", "Lookups received")?;
    let hits = counter(&registry, "hits_total", "Lookups served from the local cache")?;
    let misses = counter(&registry, "misses_total", "Lookups that missed the local cache")?;
    let local_loads = counter(&registry, "local_loads_total", "Successful loader calls")?;
    let load_failures = counter(&registry, "load_failures_total", "Failed loader calls")?;
    let remote_hits = counter(&registry, "remote_hits_total", "Values fetched from peers")?;
    let remote_failures =
        counter(&registry, "remote_failures_total", "Failed peer fetches")?;
    let evictions = counter(&registry, "evictions_total", "Entries evicted from the cache")?;
    let used_bytes = gauge(&registry, "cache_bytes", "Bytes held by the local cache")?;
    let capacity_bytes = gauge(&registry, "cache_capacity_bytes", "Cache budget (0 = unbounded)")?;
    let entries = gauge(&registry, "cache_entries", "Entries held by the local cache")?;

    for group in groups.groups() {
        let name = [group.name()];
        let snapshot = group.metrics();
        gets.with_label_values(&name).inc_by(snapshot.gets);
        hits.with_label_values(&name).inc_by(snapshot.hits);
        misses.with_label_values(&name).inc_by(snapshot.misses);
        local_loads.with_label_values(&name).inc_by(snapshot.local_loads);
        load_failures.with_label_values(&name).inc_by(snapshot.load_failures);
        remote_hits.with_label_values(&name).inc_by(snapshot.remote_hits);
        remote_failures.with_label_values(&name).inc_by(snapshot.remote_failures);
        evictions.with_label_values(&name).inc_by(snapshot.evictions);

        let stats = group.cache_stats();
        used_bytes.with_label_values(&name).set(stats.used_bytes);
        capacity_bytes.with_label_values(&name).set(stats.capacity_bytes);
        entries.with_label_values(&name).set(stats.entries as i64);
    }

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&registry.gather(), &mut buffer)
        .map_err(|e| Error::Internal(format!("Failed to encode metrics: {}", e)))?;

    String::from_utf8(buffer).map_err(|e| Error::Internal(format!("Invalid metrics text: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::loader_fn;
    use crate::error::BoxError;

    #[tokio::test]
    async fn test_render_group_counters() {
        let registry = GroupRegistry::new();
        let group = registry
            .new_group(
                "scores",
                0,
                loader_fn(|key: String| async move { Ok::<_, BoxError>(key.into_bytes()) }),
            )
            .unwrap();

        group.get("Tom").await.unwrap();
        group.get("Tom").await.unwrap();

        let text = render_prometheus(&registry).unwrap();
        assert!(text.contains("meshcache_gets_total{group=\"scores\"} 2"));
        assert!(text.contains("meshcache_hits_total{group=\"scores\"} 1"));
        assert!(text.contains("meshcache_local_loads_total{group=\"scores\"} 1"));
        assert!(text.contains("meshcache_cache_entries{group=\"scores\"} 1"));
    }

    #[test]
    fn test_render_empty_registry() {
        let text = render_prometheus(&GroupRegistry::new()).unwrap();
        assert!(!text.contains("group="));
    }
}
