//! Metric names and label keys.

/// Outbound channel delivery.
pub mod delivery {
    /// Delivery attempts (labels: `path` = `in_process` | `http` | `none`, `outcome`)
    pub const ATTEMPTS_TOTAL: &str = "portico_delivery_attempts_total";
    /// Duration of a single HTTP delivery in seconds
    pub const HTTP_DURATION_SECONDS: &str = "portico_delivery_http_duration_seconds";
    /// Number of channel ids currently routed to an in-process plugin
    pub const ROUTES_ACTIVE: &str = "portico_channel_routes_active";
}

/// Tool authorization.
pub mod authz {
    /// Authorization decisions (label: `outcome` = `allowed` or an error code)
    pub const DECISIONS_TOTAL: &str = "portico_authz_decisions_total";
    /// Policy cache lookups (label: `result` = `hit` | `miss`)
    pub const POLICY_CACHE_TOTAL: &str = "portico_policy_cache_total";
}

/// Common label keys.
pub mod labels {
    pub const PATH: &str = "path";
    pub const OUTCOME: &str = "outcome";
    pub const RESULT: &str = "result";
}

/// Histogram buckets.
pub mod buckets {
    /// HTTP delivery durations in seconds, 5ms to 30s.
    pub const DELIVERY_DURATION: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
    ];
}
