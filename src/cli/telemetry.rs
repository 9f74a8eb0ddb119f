//! Log output and optional OTLP span export.
//!
//! Export is switched on by `OTEL_EXPORTER_OTLP_ENDPOINT` and always uses
//! gRPC. Extra exporter metadata comes from `OTEL_EXPORTER_OTLP_HEADERS`
//! (`key=value,key=value`); keys ending in `-bin` carry base64 values.

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose};
use once_cell::sync::OnceCell;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
};
use std::{collections::HashMap, env::var, time::Duration};
use tonic::{
    metadata::{AsciiMetadataKey, BinaryMetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;

const ENV_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const ENV_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
const ENV_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_PROTOCOL";
const ENV_INSTANCE_ID: &str = "OTEL_SERVICE_INSTANCE_ID";

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Exporter settings taken from the standard `OTEL_*` variables.
#[derive(Debug, PartialEq, Eq)]
struct OtlpSettings {
    endpoint: String,
    headers: HashMap<String, String>,
    instance_id: Option<String>,
}

impl OtlpSettings {
    /// `None` when no collector endpoint is set.
    fn from_env() -> Option<Self> {
        let endpoint = var(ENV_ENDPOINT).ok().filter(|e| !e.trim().is_empty())?;

        if let Ok(protocol) = var(ENV_PROTOCOL)
            && protocol != "grpc"
        {
            debug!("{ENV_PROTOCOL}='{protocol}' ignored, exporting over grpc");
        }

        Some(Self {
            endpoint: normalize_endpoint(endpoint.trim()),
            headers: var(ENV_HEADERS)
                .map(|raw| parse_headers(&raw))
                .unwrap_or_default(),
            instance_id: var(ENV_INSTANCE_ID).ok().filter(|id| !id.is_empty()),
        })
    }

    /// Host to verify against when the endpoint uses TLS.
    fn tls_domain(&self) -> Option<&str> {
        let authority = self.endpoint.strip_prefix("https://")?.split('/').next()?;
        authority.split(':').next().filter(|host| !host.is_empty())
    }
}

fn parse_headers(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn to_metadata(headers: &HashMap<String, String>) -> Result<MetadataMap> {
    let mut metadata = MetadataMap::with_capacity(headers.len());

    for (name, value) in headers {
        let name = name.to_ascii_lowercase();
        if name.ends_with("-bin") {
            let bytes = general_purpose::STANDARD
                .decode(value)
                .with_context(|| format!("{ENV_HEADERS}: value of {name} is not base64"))?;
            let key = BinaryMetadataKey::from_bytes(name.as_bytes())
                .with_context(|| format!("{ENV_HEADERS}: invalid key {name}"))?;
            metadata.insert_bin(key, MetadataValue::from_bytes(&bytes));
        } else {
            let key = AsciiMetadataKey::from_bytes(name.as_bytes())
                .with_context(|| format!("{ENV_HEADERS}: invalid key {name}"))?;
            let value = value
                .parse()
                .with_context(|| format!("{ENV_HEADERS}: invalid value for {name}"))?;
            metadata.insert(key, value);
        }
    }

    Ok(metadata)
}

/// Bare `host:port` endpoints are assumed to be TLS.
fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint.trim_end_matches('/'))
    }
}

fn build_tracer(settings: &OtlpSettings) -> Result<Tracer> {
    let mut exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&settings.endpoint)
        .with_timeout(EXPORT_TIMEOUT);

    if let Some(domain) = settings.tls_domain() {
        exporter = exporter.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(domain.to_string())
                .with_native_roots(),
        );
    }

    if !settings.headers.is_empty() {
        exporter = exporter.with_metadata(to_metadata(&settings.headers)?);
    }

    let instance_id = settings
        .instance_id
        .clone()
        .unwrap_or_else(|| Ulid::new().to_string());

    let resource = Resource::builder_empty()
        .with_attributes([
            KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.instance.id", instance_id),
        ])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter.build()?)
        .with_resource(resource)
        .build();

    // A second init keeps the first provider for shutdown.
    let _ = TRACER_PROVIDER.set(provider.clone());

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

/// `RUST_LOG` directives win over the CLI level; noisy dependencies are capped.
fn env_filter(level: Level) -> Result<EnvFilter> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    for directive in [
        "hyper=error",
        "tokio=error",
        "reqwest=warn",
        "tower_http=info",
        "opentelemetry_sdk=warn",
    ] {
        filter = filter.add_directive(directive.parse()?);
    }

    Ok(filter)
}

/// Install the global subscriber, adding the OTLP layer when an endpoint is
/// configured.
///
/// # Errors
///
/// Returns an error if the exporter settings are invalid or a subscriber is
/// already installed.
pub fn init(level: Option<Level>) -> Result<()> {
    let filter = env_filter(level.unwrap_or(Level::ERROR))?;

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let registry = Registry::default().with(fmt_layer).with(filter);

    match OtlpSettings::from_env() {
        Some(settings) => {
            let tracer = build_tracer(&settings)?;
            let subscriber = registry.with(tracing_opentelemetry::layer().with_tracer(tracer));
            tracing::subscriber::set_global_default(subscriber)?;
            debug!("Exporting spans to {}", settings.endpoint);
        }
        None => tracing::subscriber::set_global_default(registry)?,
    }

    Ok(())
}

/// Flush and stop span export. Does nothing when export was never enabled.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(err) = provider.shutdown()
    {
        debug!("Tracer provider shutdown: {err}");
    }
}
