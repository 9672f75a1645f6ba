use brrtdispatch::descriptor::{HandlerDescriptor, ParamBinding, ParamType};
use brrtdispatch::dispatcher::Dispatcher;
use brrtdispatch::request::DispatchRequest;
use brrtdispatch::response::BufferedResponse;
use brrtdispatch::router::{RouteResolver, Router};
use brrtdispatch::serializer::{JsonSerializer, PlainTextSerializer, SerializerRegistry};
use brrtdispatch::service::{respond, ServiceRegistry, ServiceTable};
use brrtdispatch::RuntimeConfig;
use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use std::hint::black_box;
use std::sync::Arc;

fn zoo_routes() -> Vec<HandlerDescriptor> {
    let route = |method: Method, path: &str, op: &str| {
        HandlerDescriptor::builder(method, path, "Zoo", op)
    };
    vec![
        route(Method::GET, "/", "root_handler").build(),
        route(Method::GET, "/zoo/animals", "get_animals").build(),
        route(Method::GET, "/zoo/animals/{id}", "get_animal")
            .param(ParamBinding::path("id", ParamType::Integer))
            .build(),
        route(Method::GET, "/zoo/animals/{id}/toys/{toy_id}", "animal_toy")
            .param(ParamBinding::path("id", ParamType::Integer))
            .param(ParamBinding::path("toy_id", ParamType::Integer))
            .build(),
        route(
            Method::GET,
            "/zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}",
            "habitat_section",
        )
        .param(ParamBinding::path("category", ParamType::String))
        .param(ParamBinding::path("id", ParamType::Integer))
        .param(ParamBinding::path("habitat_id", ParamType::Integer))
        .param(ParamBinding::path("section_id", ParamType::Integer))
        .build(),
        route(Method::GET, "/search", "search")
            .param(ParamBinding::query("q", ParamType::String).required())
            .param(ParamBinding::query("limit", ParamType::Integer))
            .produces("application/json")
            .build(),
    ]
    .into_iter()
    .map(|d| d.expect("descriptor"))
    .collect()
}

fn zoo_config() -> RuntimeConfig {
    RuntimeConfig {
        default_mime_type: "text/plain".to_string(),
        ..RuntimeConfig::default()
    }
}

fn zoo_dispatcher() -> Dispatcher {
    let config = zoo_config();
    let router = Router::from_config(zoo_routes(), &config).expect("router");
    let zoo = ServiceTable::new("Zoo")
        .blocking("root_handler", |_| respond("ok"))
        .blocking("get_animals", |_| respond(&["ada", "bob"]))
        .blocking("get_animal", |args| respond(&args.i64(0)))
        .blocking("animal_toy", |args| respond(&args.i64(1)))
        .blocking("habitat_section", |args| respond(&args.i64(3)))
        .blocking("search", |args| {
            respond(&serde_json::json!({ "q": args.str(0), "limit": args.i64(1) }))
        });
    Dispatcher::builder(Arc::new(router))
        .serializers(
            SerializerRegistry::builder()
                .register("text/plain", PlainTextSerializer)
                .register("application/json", JsonSerializer)
                .build(),
        )
        .services(ServiceRegistry::new().with("Zoo", zoo))
        .config(&config)
        .build()
        .expect("dispatcher")
}

fn bench_route_resolution(c: &mut Criterion) {
    let router = Router::from_config(zoo_routes(), &zoo_config()).expect("router");
    let test_paths = [
        "/zoo/animals/123",
        "/zoo/animals/123/toys/456",
        "/zoo/cats/animals/123/habitats/88/sections/5",
        "/missing/route",
    ];
    c.bench_function("route_resolve", |b| {
        b.iter(|| {
            for path in test_paths.iter() {
                let res = router.resolve(&Method::GET, path);
                black_box(&res);
            }
        })
    });
}

fn bench_blocking_dispatch(c: &mut Criterion) {
    let dispatcher = zoo_dispatcher();
    let requests = [
        DispatchRequest::new(Method::GET, "/zoo/animals/123"),
        DispatchRequest::new(Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
        DispatchRequest::new(Method::GET, "/search?q=otter&limit=10"),
    ];
    c.bench_function("blocking_dispatch", |b| {
        b.iter(|| {
            for req in requests.iter() {
                let buffer = BufferedResponse::new();
                let outcome = dispatcher.dispatch(req, buffer.sink());
                black_box((&outcome, buffer.body()));
            }
        })
    });
}

criterion_group!(benches, bench_route_resolution, bench_blocking_dispatch);
criterion_main!(benches);
