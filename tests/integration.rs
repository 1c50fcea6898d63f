//! Integration tests: drive `Handle` against an in-process STAF runtime
//!
//! `MockStaf` implements `StafApi` with a handful of services that behave
//! like their real counterparts:
//!
//! | Service | Requests |
//! |---------|----------|
//! | `ping` | `ping` |
//! | `echo` | `echo <text>` |
//! | `service` | `list`, `free request <n>` |
//! | `handle` | `list handles [name <n>] [long]`, `create handle name <n>`, `delete handle <n>` |
//! | `queue` | `get type <t>` |

use std::collections::{BTreeMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use stafkit::rc::{self, Rc};
use stafkit::{
    marshal, ApiConfig, Handle, Map, MapClassDefinition, NativeApi, Request, StafApi, StafError,
    SubmitOptions, Submission, SyncOption, UnmarshalMode, Value,
};

struct HandleEntry {
    name: String,
    is_static: bool,
    queue: VecDeque<Value>,
}

#[derive(Default)]
struct Runtime {
    next_handle: u32,
    next_request: u32,
    handles: BTreeMap<u32, HandleEntry>,
    /// Outcomes of retained requests, by request number
    retained: BTreeMap<u32, Submission>,
}

#[derive(Default)]
struct MockStaf {
    runtime: Mutex<Runtime>,
}

impl MockStaf {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn handle_count(&self) -> usize {
        self.runtime.lock().unwrap().handles.len()
    }

    fn is_known(&self, handle: u32) -> bool {
        self.runtime.lock().unwrap().handles.contains_key(&handle)
    }
}

impl Runtime {
    fn add_handle(&mut self, name: &str, is_static: bool) -> u32 {
        self.next_handle += 1;
        let number = self.next_handle;
        self.handles.insert(
            number,
            HandleEntry {
                name: name.to_string(),
                is_static,
                queue: VecDeque::new(),
            },
        );
        number
    }

    fn dispatch(&mut self, handle: u32, service: &str, request: &str) -> Submission {
        let words = words(request);
        let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let lower: Vec<&str> = lower.iter().map(String::as_str).collect();

        match service.to_lowercase().as_str() {
            "ping" => match lower.as_slice() {
                ["ping"] => Submission::ok("PONG"),
                _ => Submission::failed(rc::INVALID_REQUEST_STRING, "Unknown PING request"),
            },
            "echo" => match request.get(..5) {
                Some(head) if head.eq_ignore_ascii_case("echo ") => {
                    let rest = &request[5..];
                    match read_clc(rest) {
                        Some((value, "")) => Submission::ok(value),
                        _ => Submission::ok(rest),
                    }
                }
                _ => Submission::failed(rc::INVALID_REQUEST_STRING, ""),
            },
            "service" => match lower.as_slice() {
                ["list"] => Submission::ok(marshal(&service_list())),
                ["free", "request", number] => {
                    match number.parse::<u32>().ok().and_then(|n| self.retained.remove(&n)) {
                        Some(outcome) => {
                            let mut freed = Map::new();
                            freed.insert("rc".into(), Value::from(outcome.rc.to_string()));
                            freed.insert(
                                "result".into(),
                                Value::from(String::from_utf8_lossy(&outcome.result).into_owned()),
                            );
                            Submission::ok(marshal(&Value::Map(freed)))
                        }
                        None => Submission::failed(rc::REQUEST_NUMBER_NOT_FOUND, *number),
                    }
                }
                _ => Submission::failed(rc::INVALID_REQUEST_STRING, ""),
            },
            "handle" => match lower.as_slice() {
                ["list", "handles", ..] => {
                    let name = lower
                        .iter()
                        .position(|w| *w == "name")
                        .and_then(|i| words.get(i + 1));
                    Submission::ok(marshal(&self.handle_list(name.map(String::as_str))))
                }
                ["create", "handle", "name", _] => {
                    let number = self.add_handle(&words[3], true);
                    Submission::ok(number.to_string())
                }
                ["delete", "handle", number] => match number.parse::<u32>() {
                    Ok(n) if self.handles.get(&n).is_some_and(|h| h.is_static) => {
                        self.handles.remove(&n);
                        Submission::ok("")
                    }
                    _ => Submission::failed(rc::HANDLE_DOES_NOT_EXIST, *number),
                },
                _ => Submission::failed(rc::INVALID_REQUEST_STRING, ""),
            },
            "queue" => match lower.as_slice() {
                ["get", "type", _] => {
                    let entry = self.handles.get_mut(&handle).and_then(|h| h.queue.pop_front());
                    match entry {
                        Some(message) => Submission::ok(marshal(&message)),
                        None => Submission::failed(rc::NO_QUEUE_ELEMENT, ""),
                    }
                }
                _ => Submission::failed(rc::INVALID_REQUEST_STRING, ""),
            },
            _ => Submission::failed(rc::UNKNOWN_SERVICE, ""),
        }
    }

    fn handle_list(&self, name: Option<&str>) -> Value {
        let class = Arc::new(
            MapClassDefinition::new("STAF/Service/Handle/Info")
                .with_item("handle", "Handle", Some("H#"))
                .with_item("name", "Handle Name", Some("Name"))
                .with_item("state", "State", None),
        );
        self.handles
            .iter()
            .filter(|(_, h)| name.map_or(true, |n| h.name.eq_ignore_ascii_case(n)))
            .map(|(number, h)| {
                let mut mc = stafkit::MapClass::new(Arc::clone(&class));
                mc.update([
                    ("handle", number.to_string()),
                    ("name", h.name.clone()),
                    (
                        "state",
                        if h.is_static { "Static" } else { "Registered" }.to_string(),
                    ),
                ])
                .unwrap();
                Value::MapClass(mc)
            })
            .collect()
    }
}

fn service_list() -> Value {
    let class = MapClassDefinition::new("STAF/Service/Service/Info")
        .with_item("name", "Name", None)
        .with_item("library", "Library", None)
        .with_item("executable", "Executable", None);
    ["DELAY", "DIAG", "ECHO", "HANDLE", "PING", "QUEUE"]
        .into_iter()
        .map(|name| {
            Value::MapClass(
                class
                    .map_class()
                    .with("name", name)
                    .unwrap()
                    .with("library", "<Internal>")
                    .unwrap(),
            )
        })
        .collect()
}

impl StafApi for MockStaf {
    fn register(&self, name: &str) -> Result<u32, Rc> {
        Ok(self.runtime.lock().unwrap().add_handle(name, false))
    }

    fn unregister(&self, handle: u32) -> Result<(), Rc> {
        let mut runtime = self.runtime.lock().unwrap();
        match runtime.handles.get(&handle) {
            Some(h) if !h.is_static => {
                runtime.handles.remove(&handle);
                Ok(())
            }
            _ => Err(rc::HANDLE_DOES_NOT_EXIST),
        }
    }

    fn submit(
        &self,
        handle: u32,
        sync: SyncOption,
        location: &str,
        service: &str,
        request: &[u8],
    ) -> Submission {
        let mut runtime = self.runtime.lock().unwrap();
        if !runtime.handles.contains_key(&handle) {
            return Submission::failed(rc::HANDLE_DOES_NOT_EXIST, "");
        }
        if !location.eq_ignore_ascii_case("local") {
            return Submission::failed(rc::NO_PATH_TO_MACHINE, location);
        }

        let request = String::from_utf8_lossy(request);
        let outcome = runtime.dispatch(handle, service, &request);
        if sync == SyncOption::Synchronous {
            return outcome;
        }

        runtime.next_request += 1;
        let request_number = runtime.next_request;
        let number = request_number.to_string();
        if matches!(sync, SyncOption::Queue | SyncOption::QueueRetain) {
            let mut message = Map::new();
            message.insert("requestNumber".into(), Value::from(number.as_str()));
            message.insert("rc".into(), Value::from(outcome.rc.to_string()));
            message.insert(
                "result".into(),
                Value::from(String::from_utf8_lossy(&outcome.result).into_owned()),
            );
            let mut entry = Map::new();
            entry.insert("type".into(), Value::from("STAF/RequestComplete"));
            entry.insert("message".into(), Value::Map(message));
            if let Some(h) = runtime.handles.get_mut(&handle) {
                h.queue.push_back(Value::Map(entry));
            }
        }
        if matches!(sync, SyncOption::Retain | SyncOption::QueueRetain) {
            runtime.retained.insert(request_number, outcome);
        }
        Submission::ok(number)
    }
}

/// Split a request into words, reading `:len:value` framed values whole.
fn words(request: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = request.trim_start();
    while !rest.is_empty() {
        if let Some((value, after)) = read_clc(rest) {
            out.push(value.to_string());
            rest = after.trim_start();
            continue;
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        out.push(rest[..end].to_string());
        rest = rest[end..].trim_start();
    }
    out
}

fn read_clc(s: &str) -> Option<(&str, &str)> {
    let body = s.strip_prefix(':')?;
    let colon = body.find(':')?;
    let len: usize = body[..colon].parse().ok()?;
    let data = &body[colon + 1..];
    let end = match data.char_indices().nth(len) {
        Some((i, _)) => i,
        None if data.chars().count() == len => data.len(),
        None => return None,
    };
    Some((&data[..end], &data[end..]))
}

fn assert_rc<T: std::fmt::Debug>(result: stafkit::Result<T>, code: Rc) -> StafError {
    let err = result.unwrap_err();
    assert_eq!(err.rc(), Some(code), "unexpected error: {}", err);
    err
}

#[test]
fn test_basic_handle() {
    let staf = MockStaf::new();
    {
        let h = Handle::register(staf.clone(), "test handle").unwrap();
        assert!(h.is_registered());

        assert_eq!(h.submit("local", "ping", "ping").unwrap(), "PONG");
        assert_eq!(h.submit("local", "ping", ["ping"]).unwrap(), "PONG");

        let services = h.submit("local", "service", "list").unwrap();
        let delay = services
            .as_list()
            .unwrap()
            .iter()
            .find(|s| s.get("name") == Some(&Value::from("DELAY")))
            .unwrap();
        assert_eq!(delay.get("library"), Some(&Value::from("<Internal>")));
        assert_eq!(delay.get("executable"), Some(&Value::None));
        assert_eq!(
            delay.as_map_class().unwrap().class_name(),
            "STAF/Service/Service/Info"
        );

        let handles = h
            .submit("local", "handle", ["list handles name", "test handle", "long"])
            .unwrap();
        let handles = handles.as_list().unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].get("name"), Some(&Value::from("test handle")));
        assert_eq!(handles[0].get("state"), Some(&Value::from("Registered")));
        assert_eq!(
            handles[0].as_map_class().unwrap().display_short_name("handle"),
            Some("H#")
        );
    }
    assert_eq!(staf.handle_count(), 0);
}

#[test]
fn test_errors() {
    let staf = MockStaf::new();
    let mut h = Handle::register(staf.clone(), "test handle").unwrap();

    let err = assert_rc(h.submit("local", "doesntexist", "do magic"), rc::UNKNOWN_SERVICE);
    assert_eq!(err.description(), "Unknown service");
    assert!(matches!(err, StafError::Result { .. }));

    let err = assert_rc(
        h.submit("local", "ping", "not a ping command"),
        rc::INVALID_REQUEST_STRING,
    );
    assert_eq!(err.extra(), Some("Unknown PING request"));
    assert_eq!(
        err.to_string(),
        "[RC 7] Invalid request string (Unknown PING request)"
    );

    h.unregister().unwrap();
    assert!(!h.is_registered());
    assert_rc(h.submit("local", "ping", "ping"), rc::HANDLE_DOES_NOT_EXIST);

    // A second unregister is not an error.
    h.unregister().unwrap();
}

#[test]
fn test_static_handle() {
    let staf = MockStaf::new();
    let helper = Handle::register(staf.clone(), "helper").unwrap();
    assert!(!helper.is_static());

    let number: u32 = helper
        .submit("local", "handle", "create handle name static-test")
        .unwrap()
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    {
        let mut h = Handle::from_static(staf.clone(), number);
        assert!(h.is_static());
        assert_eq!(h.submit("local", "ping", "ping").unwrap(), "PONG");

        // Unregistering a static handle does nothing.
        h.unregister().unwrap();
        assert_eq!(h.submit("local", "ping", "ping").unwrap(), "PONG");
    }
    assert!(staf.is_known(number));

    let number_text = number.to_string();
    helper
        .submit("local", "handle", ["delete handle", number_text.as_str()])
        .unwrap();
    assert!(!staf.is_known(number));
}

#[test]
fn test_sync_modes() {
    let staf = MockStaf::new();
    let h = Handle::register(staf, "test handle").unwrap();
    let sync = |s| SubmitOptions::default().sync(s);

    let req = h
        .submit_with("local", "ping", "ping", sync(SyncOption::FireAndForget))
        .unwrap();
    assert!(req.as_str().unwrap().chars().all(|c| c.is_ascii_digit()));
    assert_rc(
        h.submit("local", "queue", "get type STAF/RequestComplete"),
        rc::NO_QUEUE_ELEMENT,
    );

    let req = h
        .submit_with("local", "ping", "ping", sync(SyncOption::Queue))
        .unwrap();
    let entry = h
        .submit("local", "queue", "get type STAF/RequestComplete")
        .unwrap();
    let message = entry.get("message").unwrap();
    assert_eq!(message.get("requestNumber"), Some(&req));
    assert_eq!(message.get("rc"), Some(&Value::from("0")));
    assert_eq!(message.get("result"), Some(&Value::from("PONG")));
    // Queued but not retained: nothing to free.
    let free = format!("free request {}", req.as_str().unwrap());
    assert_rc(
        h.submit("local", "service", free.as_str()),
        rc::REQUEST_NUMBER_NOT_FOUND,
    );

    let req = h
        .submit_with("local", "ping", "ping", sync(SyncOption::Retain))
        .unwrap();
    assert_rc(
        h.submit("local", "queue", "get type STAF/RequestComplete"),
        rc::NO_QUEUE_ELEMENT,
    );
    let free = format!("free request {}", req.as_str().unwrap());
    let freed = h.submit("local", "service", free.as_str()).unwrap();
    assert_eq!(freed.get("rc"), Some(&Value::from("0")));
    assert_eq!(freed.get("result"), Some(&Value::from("PONG")));
    assert_rc(
        h.submit("local", "service", free.as_str()),
        rc::REQUEST_NUMBER_NOT_FOUND,
    );

    let req = h
        .submit_with("local", "ping", "ping", sync(SyncOption::QueueRetain))
        .unwrap();
    let entry = h
        .submit("local", "queue", "get type STAF/RequestComplete")
        .unwrap();
    assert_eq!(entry.get("message").unwrap().get("requestNumber"), Some(&req));
    let free = format!("free request {}", req.as_str().unwrap());
    let freed = h.submit("local", "service", free.as_str()).unwrap();
    assert_eq!(freed.get("result"), Some(&Value::from("PONG")));
}

#[test]
fn test_echo_round_trips_token_values() {
    let staf = MockStaf::new();
    let h = Handle::register(staf, "echo").unwrap();
    let raw = SubmitOptions::default().unmarshal(UnmarshalMode::None);

    for value in [
        "",
        "hello world",
        "with :3:abc framing",
        "quotes \" and ' and \\",
        "¿ÀÁÂÃÄÅÆÇ⠑⠒⠓",
        "@SDT/$S:3:foo",
        "trailing space ",
    ] {
        let echoed = h.submit_with("local", "echo", ["echo", value], raw).unwrap();
        assert_eq!(echoed, Value::from(value), "value {:?}", value);
    }
}

#[test]
fn test_echo_unmarshals_results() {
    let staf = MockStaf::new();
    let h = Handle::register(staf, "echo").unwrap();

    assert_eq!(h.submit("local", "echo", ["echo", "@SDT/$S:3:foo"]).unwrap(), "foo");

    // Not valid marshalled data: comes back as the plain string.
    assert_eq!(
        h.submit("local", "echo", ["echo", "@SDT/$S:9:foo"]).unwrap(),
        "@SDT/$S:9:foo"
    );

    let nested = "@SDT/$S:13:@SDT/$S:3:foo";
    let opts = SubmitOptions::default().unmarshal(UnmarshalMode::NonRecursive);
    assert_eq!(
        h.submit_with("local", "echo", ["echo", nested], opts).unwrap(),
        "@SDT/$S:3:foo"
    );
    assert_eq!(h.submit("local", "echo", ["echo", nested]).unwrap(), "foo");
}

#[test]
fn test_request_builder_submission() {
    let staf = MockStaf::new();
    let h = Handle::register(staf, "built").unwrap();
    let request = Request::builder()
        .option("list")
        .option("handles")
        .option("name")
        .value("built")
        .build()
        .unwrap();
    let handles = h.submit("local", "handle", request).unwrap();
    assert_eq!(handles.as_list().map(<[Value]>::len), Some(1));
}

fn failing_scope(api: Arc<dyn StafApi>) -> stafkit::Result<()> {
    let h = Handle::register(api, "scoped")?;
    h.submit("local", "nosuchservice", "anything")?;
    Ok(())
}

#[test]
fn test_handle_unregistered_on_error_path() {
    let staf = MockStaf::new();
    let err = failing_scope(staf.clone()).unwrap_err();
    assert_eq!(err.rc(), Some(rc::UNKNOWN_SERVICE));
    assert_eq!(staf.handle_count(), 0);
}

#[test]
fn test_handle_unregistered_on_panic() {
    let staf = MockStaf::new();
    let api: Arc<dyn StafApi> = staf.clone();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let _h = Handle::register(api, "doomed").unwrap();
        panic!("boom");
    }));
    assert!(outcome.is_err());
    assert_eq!(staf.handle_count(), 0);
}

#[test]
fn test_handle_moves_across_threads() {
    let staf = MockStaf::new();
    let h = Handle::register(staf.clone(), "worker").unwrap();
    let result = std::thread::spawn(move || h.submit("local", "ping", "ping"))
        .join()
        .unwrap()
        .unwrap();
    assert_eq!(result, "PONG");
    assert_eq!(staf.handle_count(), 0);
}

#[test]
fn test_remote_location_error() {
    let staf = MockStaf::new();
    let h = Handle::register(staf, "remote").unwrap();
    let err = assert_rc(h.submit("faraway", "ping", "ping"), rc::NO_PATH_TO_MACHINE);
    assert_eq!(err.description(), "No path to endpoint");
}

#[test]
fn test_unknown_return_code() {
    let err = StafError::result(4321, None);
    assert_eq!(err.description(), "Unknown return code");
    assert_eq!(err.to_string(), "[RC 4321] Unknown return code");
    assert_eq!(stafkit::strerror(4321), "Unknown return code");
    assert_eq!(stafkit::rc_name(4321), None);
}

#[test]
fn test_load_rejects_non_library() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("libSTAF.so");
    std::fs::write(&path, b"this is not a shared object").unwrap();

    let err = NativeApi::load(&ApiConfig::default().with_library(&path)).unwrap_err();
    assert!(matches!(err, StafError::Library(_)));
    assert!(err.to_string().contains("libSTAF.so"));
}

#[test]
fn test_load_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("libSTAF.so");
    let err = NativeApi::load(&ApiConfig::default().with_library(path)).unwrap_err();
    assert!(err.rc().is_none());
    assert!(matches!(err, StafError::Library(_)));
}
