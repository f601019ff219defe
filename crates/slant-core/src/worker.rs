//! Background assist solving.
//!
//! Propagation runs on a dedicated thread that speaks the JSON protocol
//! over std channels. The thread has to answer a tiny probe before it is
//! trusted; until then, and forever after any channel failure, requests
//! are solved on the caller's thread instead. Only the answer to the most
//! recent request is ever applied.

use crate::assist::{propagate, AssistResult};
use crate::grid::Grid;
use crate::protocol::{decode, encode, SolveRequest, WorkerRequest, WorkerResponse};
use std::collections::BTreeMap;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Sequence number reserved for the probe.
const PROBE_SEQ: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistConfig {
    /// How long the worker has to answer the probe
    pub probe_timeout: Duration,
    /// Run a worker thread at all; `false` solves everything inline
    pub use_worker: bool,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(2),
            use_worker: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    /// Probe sent, no answer yet
    Probing,
    /// Worker answered the probe and is serving requests
    Ready,
    /// Solving on the caller's thread
    Fallback,
}

enum Job {
    Solve { seq: u64, message: String },
    Shutdown,
}

struct Reply {
    seq: u64,
    message: String,
}

type Handler = Box<dyn FnMut(&SolveRequest) -> AssistResult + Send>;

/// Owner of one background solver and the overlay it last produced
pub struct AssistSolver {
    status: WorkerStatus,
    jobs: Option<mpsc::Sender<Job>>,
    replies: Option<mpsc::Receiver<Reply>>,
    handle: Option<JoinHandle<()>>,
    probe_deadline: Instant,
    next_seq: u64,
    applied_seq: u64,
    pending: Option<(u64, SolveRequest)>,
    current: AssistResult,
    discarded: usize,
}

impl AssistSolver {
    /// Start a worker thread and send it the probe.
    pub fn spawn(config: AssistConfig) -> Self {
        if !config.use_worker {
            return Self::synchronous();
        }
        Self::spawn_with(config, Box::new(propagate))
    }

    /// A solver that never starts a thread.
    pub fn synchronous() -> Self {
        Self {
            status: WorkerStatus::Fallback,
            jobs: None,
            replies: None,
            handle: None,
            probe_deadline: Instant::now(),
            next_seq: PROBE_SEQ,
            applied_seq: PROBE_SEQ,
            pending: None,
            current: AssistResult::default(),
            discarded: 0,
        }
    }

    fn spawn_with(config: AssistConfig, handler: Handler) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (reply_tx, reply_rx) = mpsc::channel::<Reply>();

        let spawned = thread::Builder::new()
            .name("slant-assist".into())
            .spawn(move || worker_loop(job_rx, reply_tx, handler));

        let mut solver = Self::synchronous();
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                warn!(%err, "could not start assist worker, solving inline");
                return solver;
            }
        };

        solver.status = WorkerStatus::Probing;
        solver.jobs = Some(job_tx);
        solver.replies = Some(reply_rx);
        solver.handle = Some(handle);
        solver.probe_deadline = Instant::now() + config.probe_timeout;

        let probe = SolveRequest::new(2, 2, Grid::filled(3, 3, None), BTreeMap::new());
        if !solver.send(PROBE_SEQ, &probe) {
            solver.fall_back("probe could not be sent");
        }
        solver
    }

    pub fn status(&self) -> WorkerStatus {
        self.status
    }

    /// The most recently applied overlay.
    pub fn current(&self) -> &AssistResult {
        &self.current
    }

    /// Number of worker answers dropped because a newer request was pending.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Queue a request; returns its sequence number.
    ///
    /// In fallback mode the result is applied before this returns.
    pub fn submit(&mut self, request: SolveRequest) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        match self.status {
            WorkerStatus::Fallback => {
                let result = propagate(&request);
                self.apply(seq, result);
            }
            WorkerStatus::Probing => {
                self.pending = Some((seq, request));
                self.poll();
            }
            WorkerStatus::Ready => {
                let sent = self.send(seq, &request);
                self.pending = Some((seq, request));
                if !sent {
                    self.fall_back("worker channel closed");
                }
            }
        }
        seq
    }

    /// Drain worker answers without blocking. Returns true when the latest
    /// request's result was applied by this call.
    pub fn poll(&mut self) -> bool {
        let before = self.applied_seq;
        loop {
            let Some(replies) = &self.replies else { break };
            match replies.try_recv() {
                Ok(reply) => self.handle_reply(reply),
                Err(mpsc::TryRecvError::Empty) => {
                    if self.status == WorkerStatus::Probing && Instant::now() >= self.probe_deadline {
                        self.fall_back("probe timed out");
                    }
                    break;
                }
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.fall_back("worker disconnected");
                    break;
                }
            }
        }
        self.applied_seq != before && self.applied_seq == self.next_seq
    }

    /// Block until the worker has answered the probe or been given up on.
    pub fn wait_ready(&mut self) -> WorkerStatus {
        while self.status == WorkerStatus::Probing {
            let remaining = self.probe_deadline.saturating_duration_since(Instant::now());
            self.receive(remaining);
            if self.status == WorkerStatus::Probing && Instant::now() >= self.probe_deadline {
                self.fall_back("probe timed out");
            }
        }
        self.status
    }

    /// Block until the latest request is answered.
    ///
    /// If the worker does not answer within `timeout`, the request is
    /// solved on this thread and any late answer is ignored.
    pub fn wait_latest(&mut self, timeout: Duration) -> &AssistResult {
        let deadline = Instant::now() + timeout;
        self.poll();
        while self.applied_seq != self.next_seq && self.status != WorkerStatus::Fallback {
            let now = Instant::now();
            if now >= deadline {
                debug!(seq = self.next_seq, "worker answer overdue, solving inline");
                self.solve_pending_inline();
                break;
            }
            let mut wait = deadline - now;
            if self.status == WorkerStatus::Probing {
                wait = wait.min(self.probe_deadline.saturating_duration_since(now));
                if wait.is_zero() {
                    self.fall_back("probe timed out");
                    break;
                }
            }
            self.receive(wait);
        }
        &self.current
    }

    /// Stop the worker thread. A ready worker is joined; one that never
    /// answered its probe is left to exit by itself.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn receive(&mut self, wait: Duration) {
        let Some(replies) = &self.replies else { return };
        match replies.recv_timeout(wait) {
            Ok(reply) => self.handle_reply(reply),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => self.fall_back("worker disconnected"),
        }
    }

    fn handle_reply(&mut self, reply: Reply) {
        let response = match decode::<WorkerResponse>(&reply.message) {
            Ok(response) => response,
            Err(err) => {
                self.fall_back(&format!("undecodable worker reply: {err}"));
                return;
            }
        };
        let WorkerResponse::Result(result) = response;

        if reply.seq == PROBE_SEQ {
            if self.status == WorkerStatus::Probing {
                info!("assist worker ready");
                self.status = WorkerStatus::Ready;
                if let Some((seq, request)) = self.pending.take() {
                    let sent = self.send(seq, &request);
                    self.pending = Some((seq, request));
                    if !sent {
                        self.fall_back("worker channel closed");
                    }
                }
            }
            return;
        }

        if reply.seq == self.next_seq && reply.seq > self.applied_seq {
            self.apply(reply.seq, result);
        } else {
            self.discarded += 1;
            debug!(seq = reply.seq, latest = self.next_seq, "discarding stale worker answer");
        }
    }

    fn apply(&mut self, seq: u64, result: AssistResult) {
        self.current = result;
        self.applied_seq = seq;
        if self.pending.as_ref().is_some_and(|(p, _)| *p <= seq) {
            self.pending = None;
        }
    }

    fn solve_pending_inline(&mut self) {
        if let Some((seq, request)) = self.pending.take() {
            let result = propagate(&request);
            self.apply(seq, result);
        }
    }

    /// False when the request could not be handed to the worker.
    fn send(&self, seq: u64, request: &SolveRequest) -> bool {
        let Some(jobs) = &self.jobs else { return false };
        let Ok(message) = encode(&WorkerRequest::Solve(request.clone())) else { return false };
        jobs.send(Job::Solve { seq, message }).is_ok()
    }

    fn fall_back(&mut self, reason: &str) {
        if self.status != WorkerStatus::Fallback {
            warn!(reason, "assist worker unavailable, solving inline");
        }
        self.status = WorkerStatus::Fallback;
        self.detach();
        self.solve_pending_inline();
    }

    /// Cut the channels and let the thread exit on its own. A stuck or
    /// busy worker must never hold up the caller.
    fn detach(&mut self) {
        self.jobs = None;
        self.replies = None;
        if self.handle.take().is_some() {
            debug!("assist worker detached");
        }
    }

    /// Join a healthy worker; anything else is detached.
    fn stop(&mut self) {
        if self.status != WorkerStatus::Ready {
            self.detach();
            return;
        }
        if let Some(jobs) = self.jobs.take() {
            let _ = jobs.send(Job::Shutdown);
        }
        self.replies = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AssistSolver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(jobs: mpsc::Receiver<Job>, replies: mpsc::Sender<Reply>, mut handler: Handler) {
    while let Ok(job) = jobs.recv() {
        let (seq, message) = match job {
            Job::Shutdown => return,
            Job::Solve { seq, message } => (seq, message),
        };
        let request = match decode::<WorkerRequest>(&message) {
            Ok(WorkerRequest::Solve(request)) => request,
            Err(err) => {
                warn!(%err, seq, "worker received an undecodable request");
                continue;
            }
        };
        let response = WorkerResponse::Result(handler(&request));
        let Ok(message) = encode(&response) else { continue };
        if replies.send(Reply { seq, message }).is_err() {
            return;
        }
    }
}
