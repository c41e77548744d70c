//! In-memory remote used by sync tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::models::Snapshot;
use crate::remote::RemoteStore;
use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct MemoryRemote {
    files: Mutex<BTreeMap<String, String>>,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn put(&self, name: &str, body: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), body.to_string());
    }

    pub fn put_snapshot(&self, name: &str, snapshot: &Snapshot) {
        self.put(name, &snapshot.to_json().unwrap());
    }

    pub fn snapshot(&self, name: &str) -> Option<Snapshot> {
        let files = self.files.lock().unwrap();
        files.get(name).map(|body| Snapshot::from_json(body).unwrap())
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(Error::Remote("remote unreachable (503)".to_string()))
        } else {
            Ok(())
        }
    }

    fn write(&self, name: &str, body: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Remote("write rejected (500)".to_string()));
        }
        self.put(name, body);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl RemoteStore for MemoryRemote {
    async fn find_file(&self, _token: &str, name: &str) -> Result<Option<String>> {
        self.check_reads()?;
        let files = self.files.lock().unwrap();
        Ok(files.contains_key(name).then(|| name.to_string()))
    }

    async fn read_file(&self, _token: &str, file_id: &str) -> Result<String> {
        self.check_reads()?;
        let files = self.files.lock().unwrap();
        files
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::Remote(format!("file not found: {file_id}")))
    }

    async fn create_file(&self, _token: &str, name: &str, body: &str) -> Result<String> {
        self.write(name, body)?;
        Ok(name.to_string())
    }

    async fn update_file(&self, _token: &str, file_id: &str, body: &str) -> Result<()> {
        self.write(file_id, body)
    }
}
