use std::sync::{Arc, OnceLock};

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};

use crate::ids::{PipelineId, QueryId};

#[derive(Clone, Debug)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    registry: Registry,
    operator_rows_out: CounterVec,
    operator_pages_out: CounterVec,
    driver_steps: CounterVec,
    driver_blocked: CounterVec,
    driver_run_seconds: HistogramVec,
    wire_bytes_encoded: CounterVec,
    wire_bytes_decoded: CounterVec,
    channel_sets_built: CounterVec,
    channel_set_positions: GaugeVec,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::new()),
        }
    }

    pub fn record_operator_output(
        &self,
        query_id: QueryId,
        pipeline_id: PipelineId,
        operator: &str,
        rows: u64,
        pages: u64,
    ) {
        let query = query_id.to_string();
        let pipeline = pipeline_id.to_string();
        let labels = [query.as_str(), pipeline.as_str(), operator];
        self.inner
            .operator_rows_out
            .with_label_values(&labels)
            .inc_by(rows as f64);
        self.inner
            .operator_pages_out
            .with_label_values(&labels)
            .inc_by(pages as f64);
    }

    pub fn inc_driver_step(&self, query_id: QueryId, pipeline_id: PipelineId) {
        let query = query_id.to_string();
        let pipeline = pipeline_id.to_string();
        self.inner
            .driver_steps
            .with_label_values(&[query.as_str(), pipeline.as_str()])
            .inc();
    }

    pub fn inc_driver_blocked(&self, query_id: QueryId, pipeline_id: PipelineId) {
        let query = query_id.to_string();
        let pipeline = pipeline_id.to_string();
        self.inner
            .driver_blocked
            .with_label_values(&[query.as_str(), pipeline.as_str()])
            .inc();
    }

    pub fn observe_driver_run(&self, query_id: QueryId, pipeline_id: PipelineId, secs: f64) {
        let query = query_id.to_string();
        let pipeline = pipeline_id.to_string();
        self.inner
            .driver_run_seconds
            .with_label_values(&[query.as_str(), pipeline.as_str()])
            .observe(secs.max(0.0));
    }

    pub fn record_wire_encoded(&self, encoding: &str, bytes: u64) {
        self.inner
            .wire_bytes_encoded
            .with_label_values(&[encoding])
            .inc_by(bytes as f64);
    }

    pub fn record_wire_decoded(&self, encoding: &str, bytes: u64) {
        self.inner
            .wire_bytes_decoded
            .with_label_values(&[encoding])
            .inc_by(bytes as f64);
    }

    pub fn record_channel_set(&self, query_id: QueryId, positions: u64) {
        let query = query_id.to_string();
        self.inner
            .channel_sets_built
            .with_label_values(&[query.as_str()])
            .inc();
        self.inner
            .channel_set_positions
            .with_label_values(&[query.as_str()])
            .set(positions as f64);
    }

    pub fn render_prometheus(&self) -> String {
        let metric_families = self.inner.registry.gather();
        let mut out = Vec::new();
        let enc = TextEncoder::new();
        if enc.encode(&metric_families, &mut out).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&out).to_string()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsInner {
    fn new() -> Self {
        let registry = Registry::new();

        let operator_rows_out = counter_vec(
            &registry,
            "veloq_operator_rows_out_total",
            "Output rows produced per operator",
            &["query_id", "pipeline_id", "operator"],
        );
        let operator_pages_out = counter_vec(
            &registry,
            "veloq_operator_pages_out_total",
            "Output pages produced per operator",
            &["query_id", "pipeline_id", "operator"],
        );

        let driver_steps = counter_vec(
            &registry,
            "veloq_driver_steps_total",
            "Driver quanta executed",
            &["query_id", "pipeline_id"],
        );
        let driver_blocked = counter_vec(
            &registry,
            "veloq_driver_blocked_total",
            "Driver suspensions on an unresolved blocked signal",
            &["query_id", "pipeline_id"],
        );
        let driver_run_seconds = histogram_vec(
            &registry,
            "veloq_driver_run_seconds",
            "Wall time from driver start to chain completion",
            &["query_id", "pipeline_id"],
        );

        let wire_bytes_encoded = counter_vec(
            &registry,
            "veloq_wire_bytes_encoded_total",
            "Bytes produced by block encoders",
            &["encoding"],
        );
        let wire_bytes_decoded = counter_vec(
            &registry,
            "veloq_wire_bytes_decoded_total",
            "Bytes consumed by block decoders",
            &["encoding"],
        );

        let channel_sets_built = counter_vec(
            &registry,
            "veloq_channel_sets_built_total",
            "Channel sets frozen and published",
            &["query_id"],
        );
        let channel_set_positions = gauge_vec(
            &registry,
            "veloq_channel_set_positions",
            "Distinct positions in the most recently built channel set",
            &["query_id"],
        );

        Self {
            registry,
            operator_rows_out,
            operator_pages_out,
            driver_steps,
            driver_blocked,
            driver_run_seconds,
            wire_bytes_encoded,
            wire_bytes_decoded,
            channel_sets_built,
            channel_set_positions,
        }
    }
}

fn counter_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let c = CounterVec::new(Opts::new(name, help), labels).expect("counter vec");
    registry
        .register(Box::new(c.clone()))
        .expect("register counter");
    c
}

fn gauge_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> GaugeVec {
    let g = GaugeVec::new(Opts::new(name, help), labels).expect("gauge vec");
    registry
        .register(Box::new(g.clone()))
        .expect("register gauge");
    g
}

fn histogram_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> HistogramVec {
    let h = HistogramVec::new(HistogramOpts::new(name, help), labels).expect("histogram vec");
    registry
        .register(Box::new(h.clone()))
        .expect("register histogram");
    h
}

static GLOBAL_METRICS: OnceLock<MetricsRegistry> = OnceLock::new();

pub fn global_metrics() -> &'static MetricsRegistry {
    GLOBAL_METRICS.get_or_init(MetricsRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::MetricsRegistry;
    use crate::ids::{PipelineId, QueryId};

    #[test]
    fn renders_prometheus_text() {
        let m = MetricsRegistry::new();
        m.record_operator_output(QueryId(1), PipelineId(0), "ValuesOperator", 10, 1);
        let text = m.render_prometheus();
        assert!(text.contains("veloq_operator_rows_out_total"));
        assert!(text.contains("ValuesOperator"));
    }

    #[test]
    fn renders_all_metric_families() {
        let m = MetricsRegistry::new();
        m.record_operator_output(QueryId(1), PipelineId(1), "SetProbeOperator", 4, 1);
        m.inc_driver_step(QueryId(1), PipelineId(1));
        m.inc_driver_blocked(QueryId(1), PipelineId(1));
        m.observe_driver_run(QueryId(1), PipelineId(1), 0.02);
        m.record_wire_encoded("varchar", 64);
        m.record_wire_decoded("varchar", 64);
        m.record_channel_set(QueryId(1), 4);
        let text = m.render_prometheus();

        assert!(text.contains("veloq_operator_rows_out_total"));
        assert!(text.contains("veloq_operator_pages_out_total"));
        assert!(text.contains("veloq_driver_steps_total"));
        assert!(text.contains("veloq_driver_blocked_total"));
        assert!(text.contains("veloq_driver_run_seconds"));
        assert!(text.contains("veloq_wire_bytes_encoded_total"));
        assert!(text.contains("veloq_wire_bytes_decoded_total"));
        assert!(text.contains("veloq_channel_sets_built_total"));
        assert!(text.contains("veloq_channel_set_positions"));
    }
}
