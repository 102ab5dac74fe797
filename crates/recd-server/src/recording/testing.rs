//! In-memory output store with failure injection, for tests.

use super::output::{OutputFuture, OutputSink, OutputStore};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Output {
    bytes: Vec<u8>,
    finishes: usize,
}

#[derive(Debug, Default)]
struct State {
    outputs: BTreeMap<String, Output>,
    fail_creates: bool,
    fail_appends_after: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn fail_creates(&self, fail: bool) {
        self.state.lock().unwrap().fail_creates = fail;
    }

    /// Sinks created afterwards fail every append past the first `n`.
    pub fn fail_appends_after(&self, n: usize) {
        self.state.lock().unwrap().fail_appends_after = Some(n);
    }

    pub fn output_count(&self) -> usize {
        self.state.lock().unwrap().outputs.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.state.lock().unwrap().outputs.keys().cloned().collect()
    }

    pub fn bytes(&self, name: &str) -> Vec<u8> {
        self.state.lock().unwrap().outputs[name].bytes.clone()
    }

    pub fn finish_count(&self, name: &str) -> usize {
        self.state.lock().unwrap().outputs[name].finishes
    }
}

impl OutputStore for MemoryStore {
    fn create<'a>(&'a self, name: &'a str) -> OutputFuture<'a, (PathBuf, Box<dyn OutputSink>)> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if state.fail_creates {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "create disabled"));
            }
            if state.outputs.contains_key(name) {
                return Err(io::Error::new(io::ErrorKind::AlreadyExists, name.to_string()));
            }
            state.outputs.insert(name.to_string(), Output::default());
            let sink: Box<dyn OutputSink> = Box::new(MemorySink {
                name: name.to_string(),
                state: self.state.clone(),
                appends: 0,
                fail_after: state.fail_appends_after,
            });
            Ok((PathBuf::from(name), sink))
        })
    }
}

struct MemorySink {
    name: String,
    state: Arc<Mutex<State>>,
    appends: usize,
    fail_after: Option<usize>,
}

impl OutputSink for MemorySink {
    fn append<'a>(&'a mut self, chunk: &'a [u8]) -> OutputFuture<'a, ()> {
        Box::pin(async move {
            if self.fail_after.is_some_and(|n| self.appends >= n) {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.appends += 1;
            let mut state = self.state.lock().unwrap();
            if let Some(out) = state.outputs.get_mut(&self.name) {
                out.bytes.extend_from_slice(chunk);
            }
            Ok(())
        })
    }

    fn finish(&mut self) -> OutputFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if let Some(out) = state.outputs.get_mut(&self.name) {
                out.finishes += 1;
            }
            Ok(())
        })
    }
}
