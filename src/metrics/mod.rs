use prometheus::{
    Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder,
    register_gauge_vec_with_registry, register_int_counter_vec_with_registry,
};
use lazy_static::lazy_static;
use std::sync::Arc;

use crate::models::{ProcessDefinition, ProcessStatus};

pub struct MetricsRegistry {
    registry: Registry,

    // Gauge metrics
    pub process_up: GaugeVec,
    pub process_port_open: GaugeVec,
    pub process_uptime_seconds: GaugeVec,

    // Counter metrics
    pub process_operations: IntCounterVec,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let process_up = register_gauge_vec_with_registry!(
            Opts::new("managed_process_up", "Managed process is running (1) or down (0)"),
            &["name", "path"],
            registry
        )?;

        let process_port_open = register_gauge_vec_with_registry!(
            Opts::new(
                "managed_process_port_open",
                "Readiness port accepts connections (1) or not (0)"
            ),
            &["name", "port"],
            registry
        )?;

        let process_uptime_seconds = register_gauge_vec_with_registry!(
            Opts::new("managed_process_uptime_seconds", "Seconds since the last recorded start"),
            &["name"],
            registry
        )?;

        let process_operations = register_int_counter_vec_with_registry!(
            Opts::new("managed_process_operations_total", "Start/stop operations by outcome"),
            &["name", "operation", "outcome"],
            registry
        )?;

        Ok(Self {
            registry,
            process_up,
            process_port_open,
            process_uptime_seconds,
            process_operations,
        })
    }

    pub fn render(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// 用最新状态覆盖某个进程的 gauge
    pub fn observe_status(&self, definition: &ProcessDefinition, status: &ProcessStatus) {
        let name = definition.name.as_str();

        self.process_up
            .with_label_values(&[name, definition.path.as_str()])
            .set(if status.running { 1.0 } else { 0.0 });

        if let (Some(port), Some(open)) = (definition.port, status.port_open) {
            self.process_port_open
                .with_label_values(&[name, &port.to_string()])
                .set(if open { 1.0 } else { 0.0 });
        }

        match status.current_uptime_seconds {
            Some(uptime) => self
                .process_uptime_seconds
                .with_label_values(&[name])
                .set(uptime as f64),
            None => {
                let _ = self.process_uptime_seconds.remove_label_values(&[name]);
            }
        }
    }

    pub fn record_operation(&self, name: &str, operation: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.process_operations
            .with_label_values(&[name, operation, outcome])
            .inc();
    }
}

lazy_static! {
    pub static ref METRICS: Arc<MetricsRegistry> =
        Arc::new(MetricsRegistry::new().expect("metric definitions are valid"));
}
