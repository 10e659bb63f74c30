//! Metric definitions for the gateway.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub description: &'static str,
}

pub const PROXY_CACHE_HIT: MetricDef = MetricDef {
    name: "proxy_cache.hit",
    metric_type: MetricType::Counter,
    description: "Requests served by an already-constructed signing proxy",
};

pub const PROXY_CACHE_MISS: MetricDef = MetricDef {
    name: "proxy_cache.miss",
    metric_type: MetricType::Counter,
    description: "Requests that triggered signing proxy construction",
};

pub const REGION_CLIENTS_CREATED: MetricDef = MetricDef {
    name: "region_clients.created",
    metric_type: MetricType::Counter,
    description: "AWS clients constructed, one per region per tenant",
};

pub const UPSTREAM_REQUESTS: MetricDef = MetricDef {
    name: "upstream.requests",
    metric_type: MetricType::Counter,
    description: "Signed requests forwarded to domain endpoints",
};

pub const ALL_METRICS: &[MetricDef] = &[
    PROXY_CACHE_HIT,
    PROXY_CACHE_MISS,
    REGION_CLIENTS_CREATED,
    UPSTREAM_REQUESTS,
];
