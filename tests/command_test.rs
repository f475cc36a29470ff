//! Command round trips against the in-memory engine.

use docbind::decode::{decode, Record, Schema};
use docbind::engine::{MemoryEngine, TransportError};
use docbind::result::{CommandOutcome, RawDocumentHandler};
use docbind::template::{bind, BindError};
use docbind::{impl_decode_record, params, Client, Collection, DecodeError, Document, Error, Value};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use std::thread;

#[derive(Debug, Default)]
struct ServerStatus {
    ok: String,
    host: String,
}

#[derive(Debug, Default)]
struct GeoNearResult {
    locations: Vec<Location>,
}

#[derive(Debug, Default)]
struct Location {
    dis: f64,
    nested_location: NestedLocation,
}

#[derive(Debug, Default)]
struct NestedLocation {
    location_name: String,
}

#[derive(Debug, Default)]
struct Acknowledged {
    ok: f64,
}

impl Record for ServerStatus {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<ServerStatus>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("ServerStatus")
                .field("ok", |s: &mut ServerStatus, v: String| s.ok = v)
                .field("host", |s: &mut ServerStatus, v: String| s.host = v)
                .build()
        })
    }
}

impl Record for GeoNearResult {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<GeoNearResult>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("GeoNearResult")
                .aliased("locations", "results", |r: &mut GeoNearResult, v: Vec<Location>| {
                    r.locations = v
                })
                .build()
        })
    }
}

impl Record for Location {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Location>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Location")
                .field("dis", |l: &mut Location, v: f64| l.dis = v)
                .aliased("nested_location", "obj", |l: &mut Location, v: NestedLocation| {
                    l.nested_location = v
                })
                .build()
        })
    }
}

impl Record for NestedLocation {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<NestedLocation>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("NestedLocation")
                .aliased("location_name", "name", |n: &mut NestedLocation, v: String| {
                    n.location_name = v
                })
                .build()
        })
    }
}

impl Record for Acknowledged {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Acknowledged>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Acknowledged")
                .required("ok", |a: &mut Acknowledged, v: f64| a.ok = v)
                .build()
        })
    }
}

impl_decode_record!(ServerStatus, GeoNearResult, Location, NestedLocation, Acknowledged);

impl Location {
    fn name(&self) -> &str {
        &self.nested_location.location_name
    }
}

fn setup() -> (Client, Collection) {
    let client = Client::new(Arc::new(MemoryEngine::new()), "test");
    let friends = client.collection("friends");
    (client, friends)
}

#[test]
fn test_can_run_a_command() {
    let (client, _) = setup();
    let result = client
        .run_command("{ serverStatus: 1 }", &[])
        .unwrap()
        .map(RawDocumentHandler);

    assert!(result.get("version").is_some());
    assert_eq!(result.get("ok"), Some(&Value::Double(1.0)));
}

#[test]
fn test_can_run_a_command_with_parameter() {
    let (client, friends) = setup();
    friends.insert("{ test: 1 }", &[]).unwrap();

    let result = client
        .run_command("{ count: # }", &params!["friends"])
        .unwrap()
        .map(RawDocumentHandler);

    assert_eq!(result.get("n"), Some(&Value::Double(1.0)));
}

#[test]
fn test_can_run_a_geo_near_command() {
    let (client, friends) = setup();
    friends
        .insert("{ loc: { lat: 48.690833, lng: 9.140556 }, name: 'Paris' }", &[])
        .unwrap();
    friends.ensure_index("{ loc: '2d' }", &[]).unwrap();

    let geo_near: GeoNearResult = client
        .run_command(
            "{ geoNear: 'friends', near: [48.690, 9.140], spherical: true }",
            &[],
        )
        .unwrap()
        .throw_on_error()
        .unwrap()
        .as_type()
        .unwrap();

    let locations = &geo_near.locations;
    assert_eq!(locations.len(), 1);
    assert!(
        locations[0].dis > 1.7e-5 && locations[0].dis < 1.8e-5,
        "dis = {}",
        locations[0].dis
    );
    assert_eq!(locations[0].name(), "Paris");
}

#[test]
fn test_geo_near_with_bound_parameters() {
    let (client, friends) = setup();
    friends
        .insert("{ loc: { lat: #, lng: # }, name: # }", &params![48.690833, 9.140556, "Paris"])
        .unwrap();
    friends.ensure_index("{ loc: '2d' }", &[]).unwrap();

    let geo_near: GeoNearResult = client
        .run_command(
            "{ geoNear: #, near: [#, #], spherical: true }",
            &params!["friends", 48.690, 9.140],
        )
        .unwrap()
        .throw_on_error()
        .unwrap()
        .as_type()
        .unwrap();

    assert_eq!(geo_near.locations[0].name(), "Paris");
}

#[test]
fn test_can_run_a_command_as() {
    let (client, _) = setup();
    let status: ServerStatus = client
        .run_command("{ serverStatus: 1 }", &[])
        .unwrap()
        .as_type()
        .unwrap();

    assert!(!status.host.is_empty());
    assert_eq!(status.ok, "1.0");
}

#[test]
fn test_can_run_invalid_command() {
    let (client, _) = setup();
    let status: ServerStatus = client
        .run_command("{ forceerror: 1 }", &[])
        .unwrap()
        .as_type()
        .unwrap();

    assert_eq!(status.ok, "0.0");
}

#[test]
fn test_must_force_error_on_invalid_command() {
    let (client, _) = setup();
    let failure = client
        .run_command("{ forceerror: 1 }", &[])
        .unwrap()
        .throw_on_error()
        .unwrap_err();

    assert!(failure.message.contains("forced error"));
    assert_eq!(failure.code, Some(10038));
}

#[test]
fn test_unknown_command_failure() {
    let (client, _) = setup();
    let result = client.run_command("{ invalid: 1 }", &[]).unwrap();

    assert!(!result.is_success());
    match result.outcome() {
        CommandOutcome::Failed(failure) => assert!(failure.message.contains("no such cmd")),
        CommandOutcome::Ok(_) => panic!("unknown command reported success"),
    }

    let err: Error = result.throw_on_error().unwrap_err().into();
    assert!(err.to_string().contains("no such cmd: invalid"));
}

#[test]
fn test_transport_failure_is_distinct_from_command_failure() {
    let engine = Arc::new(MemoryEngine::offline());
    let client = Client::new(engine.clone(), "test");

    let err = client.run_command("{ ping: 1 }", &[]).unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Unavailable(_))));

    engine.set_offline(false);
    assert!(client.run_command("{ ping: 1 }", &[]).unwrap().is_success());
}

#[test]
fn test_bind_substitutes_in_positional_order() {
    let doc = bind(
        "{ a: #, b: [#, #], c: { d: # } }",
        &params!["first", 2, 3.5, true],
    )
    .unwrap();

    let expected = Document::new()
        .with("a", "first")
        .with("b", vec![Value::Int(2), Value::Double(3.5)])
        .with("c", Document::new().with("d", true));
    assert_eq!(doc, expected);
}

#[test]
fn test_bind_arity_mismatch() {
    let cases: [(&str, Vec<Value>, usize, usize); 3] = [
        ("{ count: # }", params![], 1, 0),
        ("{ count: # }", params!["a", "b"], 1, 2),
        ("{ ping: 1 }", params![1], 0, 1),
    ];

    for (template, params, placeholders, supplied) in cases {
        assert_eq!(
            bind(template, &params),
            Err(BindError::Arity {
                placeholders,
                params: supplied
            }),
            "template {}",
            template
        );
    }
}

#[test]
fn test_arity_error_never_reaches_engine() {
    let engine = Arc::new(MemoryEngine::new());
    let client = Client::new(engine.clone(), "test");

    assert!(matches!(
        client.run_command("{ count: #, query: # }", &params!["friends"]),
        Err(Error::Bind(BindError::Arity { .. }))
    ));
    assert_eq!(engine.stats().commands, 0);
}

#[test]
fn test_string_parameter_cannot_inject_keys() {
    let doc = bind("{ name: # }", &params!["x', admin: true, y: '"]).unwrap();
    assert_eq!(doc.len(), 1);
    assert_eq!(doc.get("name"), Some(&Value::from("x', admin: true, y: '")));
}

#[test]
fn test_success_indicator_decodes_exactly() {
    let (client, _) = setup();
    let ack: Acknowledged = client
        .run_command("{ ping: 1 }", &[])
        .unwrap()
        .throw_on_error()
        .unwrap()
        .as_type()
        .unwrap();

    assert_eq!(ack.ok, 1.0);
}

#[test]
fn test_failed_response_decodes_without_validation() {
    let (client, _) = setup();
    let result = client.run_command("{ forceerror: 1 }", &[]).unwrap();

    let ack: Acknowledged = result.as_type().unwrap();
    assert_eq!(ack.ok, 0.0);
}

#[test]
fn test_nested_envelope_decoding() {
    let response = bind(
        "{ results: [ { dis: 0.0000173, obj: { name: 'Paris' } } ], ok: 1.0 }",
        &[],
    )
    .unwrap();

    let geo_near: GeoNearResult = decode(&response).unwrap();
    assert_eq!(geo_near.locations.len(), 1);
    assert_eq!(geo_near.locations[0].name(), "Paris");
    assert!(geo_near.locations[0].dis > 1.7e-5 && geo_near.locations[0].dis < 1.8e-5);
}

#[test]
fn test_decode_type_mismatch_names_field() {
    let response = bind("{ results: [ { dis: 'far', obj: { name: 'Paris' } } ] }", &[]).unwrap();

    let err = decode::<GeoNearResult>(&response).unwrap_err();
    assert_eq!(err.field(), Some("locations[0].dis"));
    assert!(matches!(
        err,
        DecodeError::TypeMismatch {
            expected: "double",
            found: "string",
            ..
        }
    ));
}

#[test]
fn test_missing_required_field() {
    let err = decode::<Acknowledged>(&Document::new().with("n", 1.0)).unwrap_err();
    assert_eq!(
        err,
        DecodeError::MissingField {
            field: "ok".to_string()
        }
    );
}

#[test]
fn test_serde_decoding() {
    #[derive(Debug, Deserialize)]
    struct Count {
        n: f64,
        ok: f64,
    }

    let (client, friends) = setup();
    friends.insert("{ a: 1 }", &[]).unwrap();
    friends.insert("{ a: 2 }", &[]).unwrap();

    let count: Count = client
        .run_command("{ count: 'friends' }", &[])
        .unwrap()
        .deserialize()
        .unwrap();
    assert_eq!(count.n, 2.0);
    assert_eq!(count.ok, 1.0);
}

#[test]
fn test_collection_find_and_count() {
    let (_, friends) = setup();
    for (name, age) in [("Ann", 31), ("Bob", 17), ("Cid", 45)] {
        friends
            .insert("{ name: #, age: # }", &params![name, age])
            .unwrap();
    }

    assert_eq!(friends.count().unwrap(), 3);

    let adults = friends.find("{ age: { $gte: # } }", &params![18]).unwrap();
    let names: Vec<String> = adults
        .map(|doc: &Document| doc.get("name").and_then(Value::as_str).unwrap_or("").to_string());
    assert_eq!(names, vec!["Ann".to_string(), "Cid".to_string()]);
}

#[test]
fn test_concurrent_bind_and_decode() {
    let handles: Vec<_> = (0..8)
        .map(|t| {
            thread::spawn(move || {
                for i in 0..200 {
                    let name = format!("city-{}-{}", t, i);
                    let dis = (t * 1000 + i) as f64 * 1e-6;
                    let response = bind(
                        "{ results: [ { dis: #, obj: { name: # } } ], ok: 1.0 }",
                        &params![dis, name.clone()],
                    )
                    .unwrap();

                    let decoded: GeoNearResult = decode(&response).unwrap();
                    assert_eq!(decoded.locations.len(), 1);
                    assert_eq!(decoded.locations[0].name(), name);
                    assert_eq!(decoded.locations[0].dis, dis);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_clients_share_engine() {
    let engine = Arc::new(MemoryEngine::new());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let client = Client::new(engine.clone(), "test");
            thread::spawn(move || {
                let collection = client.collection(&format!("c{}", t));
                for i in 0..50 {
                    collection.insert("{ i: # }", &params![i]).unwrap();
                }
                collection.count().unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 50);
    }
    assert_eq!(engine.stats().inserts, 200);
}
