#![allow(dead_code)]

use brrtdispatch::descriptor::{HandlerDescriptor, ParamBinding, ParamType};
use brrtdispatch::dispatcher::Dispatcher;
use brrtdispatch::error::HandlerError;
use brrtdispatch::executor::Deferred;
use brrtdispatch::router::Router;
use brrtdispatch::serializer::{JsonSerializer, PlainTextSerializer, SerializerRegistry};
use brrtdispatch::service::{respond, HandlerResult, Service, ServiceRegistry};
use brrtdispatch::{RuntimeConfig, TypedArguments};
use http::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MIME: &str = "text/plain";
pub const CREATE_DELAY: Duration = Duration::from_millis(50);

pub mod test_runtime {
    use std::sync::Once;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}

/// Service used across the integration tests; counts every invocation.
#[derive(Default)]
pub struct ItemService {
    calls: AtomicUsize,
}

impl ItemService {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Service for ItemService {
    fn invoke(&self, operation: &str, args: TypedArguments) -> HandlerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match operation {
            "get_item" => {
                let id: i64 = args.get(0)?;
                respond(&format!("item {}", id))
            }
            "item_tags" => respond(&["red", "large"]),
            "delete_item" => Ok(None),
            "search" => respond(&json!({
                "q": args.str(0),
                "limit": args.i64(1),
                "tenant": args.str(2),
            })),
            "fail" => Err(HandlerError::failed("inventory offline")),
            "explode" => panic!("kaboom"),
            other => Err(HandlerError::failed(format!("unknown operation {}", other))),
        }
    }

    fn invoke_deferred(&self, operation: &str, args: TypedArguments) -> Deferred {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match operation {
            "create_item" => {
                let body = args.value(0).cloned().unwrap_or(Value::Null);
                Deferred::spawn(move || {
                    may::coroutine::sleep(CREATE_DELAY);
                    match body {
                        Value::Object(mut item) => {
                            item.insert("id".to_string(), json!(1));
                            Ok(Some(Value::Object(item)))
                        }
                        _ => Err(HandlerError::failed("expected an object")),
                    }
                })
            }
            other => Deferred::ready(Err(HandlerError::failed(format!(
                "unknown operation {}",
                other
            )))),
        }
    }
}

pub fn routes() -> Vec<HandlerDescriptor> {
    let get = |path: &str, op: &str| HandlerDescriptor::builder(Method::GET, path, "ItemService", op);
    vec![
        get("/items/{id}", "get_item")
            .param(ParamBinding::path("id", ParamType::Integer))
            .build()
            .expect("get_item"),
        get("/items/{id}/tags", "item_tags")
            .param(ParamBinding::path("id", ParamType::Integer))
            .produces("text/plain")
            .build()
            .expect("item_tags"),
        HandlerDescriptor::builder(Method::DELETE, "/items/{id}", "ItemService", "delete_item")
            .param(ParamBinding::path("id", ParamType::Integer))
            .build()
            .expect("delete_item"),
        HandlerDescriptor::builder(Method::POST, "/items", "ItemService", "create_item")
            .param(ParamBinding::body("item", ParamType::Json))
            .consumes("application/json")
            .produces("application/json")
            .deferred()
            .build()
            .expect("create_item"),
        get("/search", "search")
            .param(ParamBinding::query("q", ParamType::String).required())
            .param(ParamBinding::query("limit", ParamType::Integer))
            .param(ParamBinding::header("x-tenant", ParamType::String))
            .produces("application/json")
            .produces("text/plain")
            .build()
            .expect("search"),
        get("/fail", "fail").build().expect("fail"),
        get("/explode", "explode").build().expect("explode"),
        HandlerDescriptor::builder(Method::GET, "/orphans/{id}", "OrphanService", "get_orphan")
            .param(ParamBinding::path("id", ParamType::String))
            .build()
            .expect("get_orphan"),
    ]
}

pub fn serializers() -> SerializerRegistry {
    SerializerRegistry::builder()
        .register("text/plain", PlainTextSerializer)
        .register("application/json", JsonSerializer)
        .build()
}

/// Runtime settings with `BRRTD_*` overrides taken from `vars` instead of the process env.
pub fn config_with(vars: &[(&str, &str)]) -> RuntimeConfig {
    RuntimeConfig::default().with_overrides(|key| {
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
}

pub fn test_config() -> RuntimeConfig {
    config_with(&[("BRRTD_DEFAULT_MIME", DEFAULT_MIME)])
}

pub fn router_with(config: &RuntimeConfig) -> Arc<Router> {
    Arc::new(Router::from_config(routes(), config).expect("router"))
}

pub fn router() -> Arc<Router> {
    router_with(&test_config())
}

/// Dispatcher over [`routes`] built from `config`, with a shared [`ItemService`].
pub fn dispatcher_with(config: &RuntimeConfig) -> (Dispatcher, Arc<ItemService>) {
    test_runtime::setup_may_runtime();
    let service = Arc::new(ItemService::default());
    let mut services = ServiceRegistry::new();
    services.register_arc("ItemService", service.clone());
    let dispatcher = Dispatcher::builder(router_with(config))
        .serializers(serializers())
        .services(services)
        .config(config)
        .build()
        .expect("dispatcher");
    (dispatcher, service)
}

pub fn dispatcher() -> (Dispatcher, Arc<ItemService>) {
    dispatcher_with(&test_config())
}
