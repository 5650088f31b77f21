use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::{SinkExt, StreamExt};
use interprocess::local_socket::traits::tokio::Listener as _;
use mlagent_client::{transport, Agent, BusCodec, MethodCall, Response};
use mlagent_core::{AgentError, Config, PackageConfig};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

const ENOENT: i32 = -2;
const STATE_PAUSED: i32 = 3;
const STATE_PLAYING: i32 = 4;

/// In-memory stand-in for the daemon's registries.
#[derive(Default)]
struct Registry {
    pipelines: HashMap<String, String>,
    launched: HashMap<i64, i32>,
    next_id: i64,
    models: HashMap<String, Vec<Value>>,
    resources: HashMap<String, Vec<Value>>,
}

fn ok(values: Vec<Value>) -> Response {
    Response::Return { result: 0, values }
}

const fn err(result: i32) -> Response {
    Response::Return {
        result,
        values: Vec::new(),
    }
}

fn handle(reg: &mut Registry, call: &MethodCall) -> Response {
    let text = |i: usize| call.args.get(i).and_then(Value::as_str).unwrap_or_default().to_owned();
    let int = |i: usize| call.args.get(i).and_then(Value::as_i64).unwrap_or_default();
    let service = call.interface.rsplit('.').next().unwrap_or_default();

    match (service, call.member.as_str()) {
        ("pipeline", "set_pipeline") => {
            reg.pipelines.insert(text(0), text(1));
            ok(vec![])
        }
        ("pipeline", "get_pipeline") => reg
            .pipelines
            .get(&text(0))
            .map_or(err(ENOENT), |desc| ok(vec![json!(desc)])),
        ("pipeline", "delete_pipeline") => reg
            .pipelines
            .remove(&text(0))
            .map_or(err(ENOENT), |_| ok(vec![])),
        ("pipeline", "launch_pipeline") => {
            if !reg.pipelines.contains_key(&text(0)) {
                return err(ENOENT);
            }
            reg.next_id += 1;
            reg.launched.insert(reg.next_id, STATE_PAUSED);
            ok(vec![json!(reg.next_id)])
        }
        ("pipeline", member @ ("start_pipeline" | "stop_pipeline")) => {
            let state = if member == "start_pipeline" { STATE_PLAYING } else { STATE_PAUSED };
            reg.launched
                .get_mut(&int(0))
                .map_or(err(ENOENT), |s| {
                    *s = state;
                    ok(vec![])
                })
        }
        ("pipeline", "destroy_pipeline") => reg
            .launched
            .remove(&int(0))
            .map_or(err(ENOENT), |_| ok(vec![])),
        ("pipeline", "get_state") => reg
            .launched
            .get(&int(0))
            .map_or(err(ENOENT), |s| ok(vec![json!(s)])),
        ("model", "register") => {
            let versions = reg.models.entry(text(0)).or_default();
            let version = versions.len() + 1;
            versions.push(json!({
                "version": version.to_string(),
                "active": if call.args[2] == json!(true) { "T" } else { "F" },
                "path": text(1),
                "description": text(3),
                "app_info": text(4),
            }));
            ok(vec![json!(version)])
        }
        ("model", "get") => {
            let version = usize::try_from(int(1)).unwrap_or_default();
            reg.models
                .get(&text(0))
                .and_then(|v| v.get(version.wrapping_sub(1)))
                .map_or(err(ENOENT), |m| ok(vec![json!(m.to_string())]))
        }
        ("model", "get_all") => reg
            .models
            .get(&text(0))
            .map_or(err(ENOENT), |v| ok(vec![json!(Value::Array(v.clone()).to_string())])),
        ("resource", "add") => {
            reg.resources.entry(text(0)).or_default().push(json!({
                "path": text(1),
                "description": text(2),
                "app_info": text(3),
            }));
            ok(vec![])
        }
        ("resource", "get") => reg
            .resources
            .get(&text(0))
            .map_or(err(ENOENT), |v| ok(vec![json!(Value::Array(v.clone()).to_string())])),
        ("resource", "delete") => reg
            .resources
            .remove(&text(0))
            .map_or(err(ENOENT), |_| ok(vec![])),
        _ => Response::Fault {
            code: 0,
            message: format!("unknown method {}.{}", call.interface, call.member),
        },
    }
}

fn start_daemon(socket: &Path) -> JoinHandle<()> {
    let listener = transport::bind_async(socket).unwrap();
    let registry = Arc::new(Mutex::new(Registry::default()));

    tokio::spawn(async move {
        loop {
            let Ok(stream) = listener.accept().await else {
                continue;
            };
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let mut framed = Framed::new(stream, BusCodec);
                while let Some(Ok(call)) = framed.next().await {
                    let resp = {
                        let mut reg = registry.lock().unwrap_or_else(PoisonError::into_inner);
                        handle(&mut reg, &call)
                    };
                    if framed.send(resp).await.is_err() {
                        break;
                    }
                }
            });
        }
    })
}

/// System socket is never bound, so every call has to fall back to the session scope.
fn session_only_config(dir: &Path) -> Config {
    Config {
        system_socket: dir.join("system_bus_socket"),
        session_socket: Some(dir.join("mlops-agent").join("session_bus_socket")),
        package: None,
    }
}

async fn blocking<T, F>(agent: &Arc<Agent>, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce(&Agent) -> T + Send + 'static,
{
    let agent = Arc::clone(agent);
    tokio::task::spawn_blocking(move || f(&agent)).await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pipeline_lifecycle_over_session_bus() {
    let dir = tempfile::tempdir().unwrap();
    let config = session_only_config(dir.path());
    let daemon = start_daemon(config.session_socket.as_deref().unwrap());
    let agent = Arc::new(Agent::from_config(&config));

    blocking(&agent, |a| a.pipeline_set_description("cam", "videotestsrc ! fakesink"))
        .await
        .unwrap();
    let desc = blocking(&agent, |a| a.pipeline_get_description("cam")).await.unwrap();
    assert_eq!(desc, "videotestsrc ! fakesink");

    let id = blocking(&agent, |a| a.pipeline_launch("cam")).await.unwrap();
    assert_eq!(blocking(&agent, move |a| a.pipeline_get_state(id)).await.unwrap(), STATE_PAUSED);

    blocking(&agent, move |a| a.pipeline_start(id)).await.unwrap();
    assert_eq!(blocking(&agent, move |a| a.pipeline_get_state(id)).await.unwrap(), STATE_PLAYING);

    blocking(&agent, move |a| a.pipeline_stop(id)).await.unwrap();
    blocking(&agent, move |a| a.pipeline_destroy(id)).await.unwrap();

    let err = blocking(&agent, move |a| a.pipeline_get_state(id)).await.unwrap_err();
    assert_eq!(err.code(), ENOENT);

    blocking(&agent, |a| a.pipeline_delete("cam")).await.unwrap();
    let err = blocking(&agent, |a| a.pipeline_get_description("cam")).await.unwrap_err();
    assert!(matches!(err, AgentError::Rejected(ENOENT)));

    daemon.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn model_and_resource_payloads_on_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let config = session_only_config(dir.path());
    let daemon = start_daemon(config.session_socket.as_deref().unwrap());
    let agent = Arc::new(Agent::from_config(&config));

    let v1 = blocking(&agent, |a| a.model_register("mobilenet", "/opt/v1.tflite", true, None, None))
        .await
        .unwrap();
    let v2 = blocking(&agent, |a| {
        a.model_register("mobilenet", "/opt/v2.tflite", false, Some("retrained"), None)
    })
    .await
    .unwrap();
    assert_eq!((v1, v2), (1, 2));

    let one: Value =
        serde_json::from_str(&blocking(&agent, |a| a.model_get("mobilenet", 2)).await.unwrap())
            .unwrap();
    assert_eq!(one["path"], "/opt/v2.tflite");
    assert_eq!(one["description"], "retrained");

    let all: Value =
        serde_json::from_str(&blocking(&agent, |a| a.model_get_all("mobilenet")).await.unwrap())
            .unwrap();
    assert_eq!(all.as_array().map(Vec::len), Some(2));

    blocking(&agent, |a| a.resource_add("labels", "/opt/labels.txt", None, None))
        .await
        .unwrap();
    let res: Value =
        serde_json::from_str(&blocking(&agent, |a| a.resource_get("labels")).await.unwrap())
            .unwrap();
    assert_eq!(res[0]["path"], "/opt/labels.txt");
    blocking(&agent, |a| a.resource_delete("labels")).await.unwrap();

    let err = blocking(&agent, |a| a.model_activate("mobilenet", 1)).await.unwrap_err();
    assert!(matches!(err, AgentError::Transport(_)), "unknown member faults without a code");

    daemon.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn packaged_context_rewrites_paths() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = session_only_config(dir.path());
    config.package = Some(PackageConfig {
        app_id: Some("org.example.camera".to_owned()),
        resource_paths: BTreeMap::from([("type-a".to_owned(), PathBuf::from("/global/type-a"))]),
    });
    let daemon = start_daemon(config.session_socket.as_deref().unwrap());
    let agent = Arc::new(Agent::from_config(&config));

    let app_info = json!({"is_rpk": "T", "res_type": "type-a"}).to_string();
    blocking(&agent, move |a| {
        a.model_register("detector", "rel/model.bin", true, None, Some(app_info.as_str()))
    })
    .await
    .unwrap();

    let out: Value =
        serde_json::from_str(&blocking(&agent, |a| a.model_get("detector", 1)).await.unwrap())
            .unwrap();
    assert_eq!(out["path"], "/global/type-a/rel/model.bin");

    // A resource without app_info fails the whole batch.
    blocking(&agent, |a| a.resource_add("plain", "/opt/plain.bin", None, None))
        .await
        .unwrap();
    let err = blocking(&agent, |a| a.resource_get("plain")).await.unwrap_err();
    assert!(matches!(err, AgentError::Parse(_)));

    daemon.abort();
}

#[test]
fn no_daemon_on_any_scope_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let agent = Agent::from_config(&session_only_config(dir.path()));
    let err = agent.model_get_all("mobilenet").unwrap_err();
    assert!(matches!(err, AgentError::Unavailable(_)));
    assert_eq!(err.code(), -mlagent_core::error::EIO);
}
