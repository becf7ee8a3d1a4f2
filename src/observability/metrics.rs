use prometheus::{
    Encoder, GaugeVec, Histogram, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub batches_total: IntCounterVec,
    pub sla_breaches_total: IntCounterVec,
    pub escalations_total: IntCounterVec,
    pub geofence_events_total: IntCounterVec,
    pub emergencies_total: IntCounterVec,
    pub courier_utilization: GaugeVec,
    pub sla_sweep_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let batches_total = IntCounterVec::new(
            Opts::new("dispatch_batches_total", "Batch creations by outcome"),
            &["outcome"],
        )
        .expect("valid dispatch_batches_total metric");

        let sla_breaches_total = IntCounterVec::new(
            Opts::new("sla_breaches_total", "SLA breaches by checkpoint"),
            &["checkpoint"],
        )
        .expect("valid sla_breaches_total metric");

        let escalations_total = IntCounterVec::new(
            Opts::new("escalations_total", "Escalation tickets created by level"),
            &["level"],
        )
        .expect("valid escalations_total metric");

        let geofence_events_total = IntCounterVec::new(
            Opts::new("geofence_events_total", "Geofence triggers by event kind"),
            &["event"],
        )
        .expect("valid geofence_events_total metric");

        let emergencies_total = IntCounterVec::new(
            Opts::new("emergency_dispatches_total", "Emergency dispatches by status"),
            &["status"],
        )
        .expect("valid emergency_dispatches_total metric");

        let courier_utilization = GaugeVec::new(
            Opts::new("courier_utilization", "Courier utilization ratio [0..1]"),
            &["courier_id"],
        )
        .expect("valid courier_utilization metric");

        let sla_sweep_seconds = Histogram::with_opts(prometheus::HistogramOpts::new(
            "sla_sweep_seconds",
            "Duration of a full SLA sweep in seconds",
        ))
        .expect("valid sla_sweep_seconds metric");

        registry
            .register(Box::new(batches_total.clone()))
            .expect("register dispatch_batches_total");
        registry
            .register(Box::new(sla_breaches_total.clone()))
            .expect("register sla_breaches_total");
        registry
            .register(Box::new(escalations_total.clone()))
            .expect("register escalations_total");
        registry
            .register(Box::new(geofence_events_total.clone()))
            .expect("register geofence_events_total");
        registry
            .register(Box::new(emergencies_total.clone()))
            .expect("register emergency_dispatches_total");
        registry
            .register(Box::new(courier_utilization.clone()))
            .expect("register courier_utilization");
        registry
            .register(Box::new(sla_sweep_seconds.clone()))
            .expect("register sla_sweep_seconds");

        Self {
            registry,
            batches_total,
            sla_breaches_total,
            escalations_total,
            geofence_events_total,
            emergencies_total,
            courier_utilization,
            sla_sweep_seconds,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
