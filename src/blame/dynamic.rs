//! On-demand point-in-time blame.
//!
//! Requests go through a channel to a fixed set of worker threads. Results
//! are cached per (file, commit). After [`DynamicBlameService::shutdown`]
//! pending and new requests resolve to [`Error::Cancelled`]; a blame that was
//! already running completes but its result is discarded.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use dashmap::DashMap;

use super::{BlameEngine, BlameLine};
use crate::cancel::CancellationToken;
use crate::commits::CommitNr;
use crate::errors::{Error, Result};
use crate::history::{FileHistories, FileId};

pub type BlameReply = Result<Arc<Vec<BlameLine>>>;
type BlameCache = DashMap<(FileId, CommitNr), Arc<Vec<BlameLine>>>;

struct BlameRequest {
    file: FileId,
    commit: CommitNr,
    reply: Sender<BlameReply>,
}

/// Handle to one pending request
pub struct BlameTicket {
    receiver: Receiver<BlameReply>,
}

impl BlameTicket {
    fn ready(reply: BlameReply) -> Self {
        let (sender, receiver) = channel::bounded(1);
        let _ = sender.send(reply);
        Self { receiver }
    }

    /// Block until the blame is available.
    pub fn wait(self) -> BlameReply {
        self.receiver.recv().unwrap_or(Err(Error::Cancelled))
    }

    /// Like [`BlameTicket::wait`], giving `None` when `timeout` elapses first.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<BlameReply> {
        match self.receiver.recv_timeout(timeout) {
            Ok(reply) => Some(reply),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(Error::Cancelled)),
        }
    }
}

pub struct DynamicBlameService {
    histories: Arc<FileHistories>,
    cache: Arc<BlameCache>,
    cancel: CancellationToken,
    sender: Option<Sender<BlameRequest>>,
    workers: Vec<JoinHandle<()>>,
}

impl DynamicBlameService {
    /// Start `workers` threads answering requests with `engine`.
    pub fn start(
        engine: BlameEngine,
        histories: Arc<FileHistories>,
        workers: usize,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let (sender, receiver) = channel::unbounded::<BlameRequest>();
        let cache: Arc<BlameCache> = Arc::new(DashMap::new());

        let handles = (0..workers.max(1))
            .map(|i| {
                let worker = Worker {
                    engine: engine.clone(),
                    histories: Arc::clone(&histories),
                    cache: Arc::clone(&cache),
                    cancel: cancel.clone(),
                };
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("gitauthors-blame-{}", i))
                    .spawn(move || worker.run(receiver))
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        log::debug!("dynamic blame service started with {} worker(s)", handles.len());
        Ok(Self {
            histories,
            cache,
            cancel,
            sender: Some(sender),
            workers: handles,
        })
    }

    /// Queue point-in-time blame of `file` at `commit`.
    pub fn request(&self, file: FileId, commit: CommitNr) -> Result<BlameTicket> {
        self.cancel.check()?;
        if let Some(hit) = self.cache.get(&(file, commit)) {
            return Ok(BlameTicket::ready(Ok(Arc::clone(hit.value()))));
        }
        let sender = self.sender.as_ref().ok_or(Error::Cancelled)?;
        let (reply, receiver) = channel::bounded(1);
        sender
            .send(BlameRequest {
                file,
                commit,
                reply,
            })
            .map_err(|_| Error::Cancelled)?;
        Ok(BlameTicket { receiver })
    }

    /// Queue a request addressed by root file name and commit id.
    pub fn request_named(
        &self,
        root: &str,
        commit_id: &str,
        engine: &BlameEngine,
    ) -> Result<BlameTicket> {
        let file = self
            .histories
            .id_of(root)
            .ok_or_else(|| Error::not_found(root, commit_id))?;
        let commit = engine
            .commits()
            .nr_of(commit_id)
            .ok_or_else(|| Error::not_found(root, commit_id))?;
        self.request(file, commit)
    }

    /// Blocking convenience wrapper around [`DynamicBlameService::request`].
    pub fn blame(&self, file: FileId, commit: CommitNr) -> BlameReply {
        self.request(file, commit)?.wait()
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Cancel outstanding requests and join the workers.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("blame worker panicked");
            }
        }
    }
}

impl Drop for DynamicBlameService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    engine: BlameEngine,
    histories: Arc<FileHistories>,
    cache: Arc<BlameCache>,
    cancel: CancellationToken,
}

impl Worker {
    fn run(self, receiver: Receiver<BlameRequest>) {
        for request in receiver.iter() {
            let reply = self.answer(request.file, request.commit);
            // the requester may have dropped its ticket
            let _ = request.reply.send(reply);
        }
    }

    fn answer(&self, file: FileId, commit: CommitNr) -> BlameReply {
        self.cancel.check()?;
        let key = (file, commit);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(Arc::clone(hit.value()));
        }
        let history = self
            .histories
            .get(file)
            .ok_or_else(|| Error::not_found(format!("file #{}", file.0), format!("#{}", commit.0)))?;
        let lines = Arc::new(self.engine.blame_at(history, commit)?);
        // result of a blame that outlived a shutdown is dropped
        self.cancel.check()?;
        self.cache.insert(key, Arc::clone(&lines));
        Ok(lines)
    }
}
