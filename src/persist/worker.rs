//! The persist worker: a single task serializing certificate sightings to
//! disk and to the structured sighting log.

use std::collections::HashSet;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::OutputFormat;
use crate::error::HarvestError;

use super::record::CertificateRecord;

/// Certificates found on one stream, ready to persist in chain order, plus
/// the log-line prefix identifying where they came from.
pub struct PersistContext {
    pub certificates: Vec<CertificateRecord>,
    pub log_prefix: String,
}

/// Handle handed to stream handler tasks. Cloning is cheap; every clone
/// shares the same underlying channel to the single worker task.
#[derive(Clone)]
pub struct PersistHandle {
    tx: mpsc::Sender<PersistContext>,
}

impl PersistHandle {
    /// Submits a context for persistence. The small channel capacity
    /// (spec.md's "blocking, unbounded handoff from any handler") means
    /// this awaits until the worker is ready to accept it — a slow worker
    /// backpressures handlers, never the other way around.
    pub async fn submit(&self, context: PersistContext) {
        let _ = self.tx.send(context).await;
    }
}

/// `running` accepts submissions; `draining` flushes whatever is already
/// queued once the submission side is closed; `terminated` is the worker
/// task's exit.
enum State {
    Running,
    Draining,
    Terminated,
}

pub struct PersistWorker {
    output_root: PathBuf,
    formats: HashSet<OutputFormat>,
    log_file: Box<dyn std::io::Write + Send>,
    rx: mpsc::Receiver<PersistContext>,
    seen: HashSet<String>,
    state: State,
}

impl PersistWorker {
    /// Creates the worker and the handle handlers submit through. `log_file`
    /// is either a file created under `output_root` or standard output,
    /// chosen by the caller per [`crate::config::LogTarget`].
    pub fn new(
        output_root: PathBuf,
        formats: HashSet<OutputFormat>,
        log_file: Box<dyn std::io::Write + Send>,
    ) -> (Self, PersistHandle) {
        let (tx, rx) = mpsc::channel(1);
        let worker = PersistWorker {
            output_root,
            formats,
            log_file,
            rx,
            seen: HashSet::new(),
            state: State::Running,
        };
        (worker, PersistHandle { tx })
    }

    /// Runs until the submission channel is closed and every already-queued
    /// context has been written, i.e. drives `running` → `draining` →
    /// `terminated`.
    pub async fn run(mut self) -> Result<(), HarvestError> {
        while let State::Running = self.state {
            match self.rx.recv().await {
                Some(context) => self.persist(context)?,
                None => self.state = State::Draining,
            }
        }

        while let Ok(context) = self.rx.try_recv() {
            self.persist(context)?;
        }

        self.state = State::Terminated;
        debug!("persist worker terminated");
        Ok(())
    }

    fn persist(&mut self, context: PersistContext) -> Result<(), HarvestError> {
        for (i, cert) in context.certificates.iter().enumerate() {
            let digest = cert.digest();
            let dir = self.output_root.join(&digest);

            if !self.seen.contains(&digest) {
                self.write_certificate(&dir, cert)?;
                self.seen.insert(digest.clone());
            }

            self.log_sighting(&context.log_prefix, i, cert, &digest)?;
        }

        Ok(())
    }

    fn write_certificate(&self, dir: &Path, cert: &CertificateRecord) -> Result<(), HarvestError> {
        create_dir(dir)?;

        if self.formats.contains(&OutputFormat::Der) {
            write_file(&dir.join(OutputFormat::Der.file_name()), &cert.der)?;
        }

        if self.formats.contains(&OutputFormat::Pem) {
            let pem = pem::Pem::new("CERTIFICATE", cert.der.clone());
            write_file(&dir.join(OutputFormat::Pem.file_name()), pem::encode(&pem).as_bytes())?;
        }

        if self.formats.contains(&OutputFormat::Json) {
            let path = dir.join(OutputFormat::Json.file_name());
            let json = serde_json::to_vec_pretty(cert.json_fields())
                .map_err(|e| HarvestError::Persist { path: path.clone(), source: e.into() })?;
            write_file(&path, &json)?;
        }

        Ok(())
    }

    fn log_sighting(
        &mut self,
        prefix: &str,
        index: usize,
        cert: &CertificateRecord,
        digest: &str,
    ) -> Result<(), HarvestError> {
        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown-time".to_string());

        let line = format!(
            "{now} {prefix} cert:{index} cn:\"{}\" fingerprint:{digest} serial:{}\n",
            cert.common_name(),
            cert.serial_decimal(),
        );

        self.log_file
            .write_all(line.as_bytes())
            .map_err(|e| HarvestError::Persist { path: PathBuf::from("<sighting log>"), source: e })
    }
}

#[cfg(test)]
impl PersistWorker {
    /// Synchronously drains whatever has already been submitted, without
    /// spawning the worker as its own task or transitioning state —
    /// mirrors the teacher's pattern of driving async machinery from a
    /// blocking test harness when a test only needs deterministic,
    /// in-line persistence rather than the real concurrent pipeline.
    pub async fn drain_for_test(&mut self) -> Result<(), HarvestError> {
        while let Ok(context) = self.rx.try_recv() {
            self.persist(context)?;
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<(), HarvestError> {
    use std::io::ErrorKind;

    match std::fs::create_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
        Err(e) => return Err(HarvestError::Persist { path: dir.to_path_buf(), source: e }),
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o755);
        if let Err(e) = std::fs::set_permissions(dir, perms) {
            warn!(?dir, error = %e, "failed to set directory permissions");
        }
    }

    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), HarvestError> {
    if path.exists() {
        return Ok(());
    }

    std::fs::write(path, contents)
        .map_err(|e| HarvestError::Persist { path: path.to_path_buf(), source: e })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o644);
        if let Err(e) = std::fs::set_permissions(path, perms) {
            warn!(?path, error = %e, "failed to set file permissions");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn writes_requested_formats_and_dedups_by_digest() {
        let dir = tempfile::tempdir().unwrap();
        let log = SharedBuf::default();
        let formats = HashSet::from([OutputFormat::Der, OutputFormat::Pem]);
        let (worker, handle) =
            PersistWorker::new(dir.path().to_path_buf(), formats, Box::new(log.clone()));

        let run = tokio::spawn(worker.run());

        let cert = CertificateRecord::new(vec![1, 2, 3, 4]);
        let digest = cert.digest();
        handle
            .submit(PersistContext { certificates: vec![cert], log_prefix: "flowidx:1".into() })
            .await;

        drop(handle);
        run.await.unwrap().unwrap();

        assert!(dir.path().join(&digest).join("cert.der").exists());
        assert!(dir.path().join(&digest).join("cert.pem").exists());
        assert!(!dir.path().join(&digest).join("cert.json").exists());

        let logged = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("flowidx:1"));
        assert!(logged.contains(&digest));
    }

    #[tokio::test]
    async fn drain_for_test_persists_without_spawning_a_task() {
        let dir = tempfile::tempdir().unwrap();
        let formats = HashSet::from([OutputFormat::Der]);
        let (mut worker, handle) =
            PersistWorker::new(dir.path().to_path_buf(), formats, Box::new(SharedBuf::default()));

        let cert = CertificateRecord::new(vec![9, 9, 9]);
        let digest = cert.digest();
        handle
            .submit(PersistContext { certificates: vec![cert], log_prefix: "flowidx:2".into() })
            .await;

        worker.drain_for_test().await.unwrap();

        assert!(dir.path().join(&digest).join("cert.der").exists());
    }
}
