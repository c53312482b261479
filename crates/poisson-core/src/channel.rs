// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — Message Channel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Messaging capability the solver is written against.
//!
//! `MessageChannel` covers the point-to-point strip transfers and the few
//! collectives the solver needs. `LocalChannel` implements it in-process
//! with one mailbox per worker; the MPI implementation lives in
//! `mpi_channel` behind the `mpi` feature.

use log::warn;
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

use poisson_types::constants::ROOT_RANK;
use poisson_types::error::{PoissonError, PoissonResult};

use crate::topology::Direction;

/// Blocking message passing between the workers of one run.
///
/// Strip transfers are tagged with the direction the strip travels, so a
/// worker receiving from its bottom neighbour asks for `Direction::Top`.
pub trait MessageChannel {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn send_strip(&mut self, dest: usize, tag: Direction, data: &[f64]) -> PoissonResult<()>;

    fn receive_strip(&mut self, source: usize, tag: Direction, buf: &mut [f64]) -> PoissonResult<()>;

    /// Paired transfer: send to one neighbour while receiving from the
    /// opposite one. Either side may be absent at a physical edge.
    fn send_receive_strip(
        &mut self,
        tag: Direction,
        send: Option<(usize, &[f64])>,
        recv: Option<(usize, &mut [f64])>,
    ) -> PoissonResult<()> {
        if let Some((dest, data)) = send {
            self.send_strip(dest, tag, data)?;
        }
        if let Some((source, buf)) = recv {
            self.receive_strip(source, tag, buf)?;
        }
        Ok(())
    }

    /// Maximum of `local` over all workers, delivered to every worker.
    fn all_reduce_max(&mut self, local: f64) -> PoissonResult<f64>;

    /// Sum of `local` over all workers, delivered to every worker.
    fn all_reduce_sum(&mut self, local: u64) -> PoissonResult<u64>;

    /// Replace `payload` on every worker with the root's `payload`.
    fn broadcast_bytes(&mut self, root: usize, payload: &mut Vec<u8>) -> PoissonResult<()>;

    /// Tear the whole run down. Peers blocked on this worker must wake up.
    fn abort(&mut self, code: i32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Strip(Direction),
    Reduce,
    ReduceResult,
    Broadcast,
}

#[derive(Debug)]
enum Payload {
    Values(Vec<f64>),
    Scalar(f64),
    Count(u64),
    Bytes(Vec<u8>),
    Abort(i32),
}

#[derive(Debug)]
struct Envelope {
    from: usize,
    tag: Tag,
    payload: Payload,
}

/// In-process endpoint: a mailbox plus senders to every peer.
///
/// Messages are matched on (source, tag); anything that arrives early is
/// parked in arrival order, so per-sender FIFO order is kept.
pub struct LocalChannel {
    rank: usize,
    peers: Vec<Option<Sender<Envelope>>>,
    inbox: Receiver<Envelope>,
    parked: VecDeque<Envelope>,
    aborted: bool,
}

/// One connected endpoint per worker, indexed by rank.
pub fn local_cluster(size: usize) -> Vec<LocalChannel> {
    let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| channel()).unzip();
    receivers
        .into_iter()
        .enumerate()
        .map(|(rank, inbox)| LocalChannel {
            rank,
            peers: senders
                .iter()
                .enumerate()
                .map(|(peer, tx)| (peer != rank).then(|| tx.clone()))
                .collect(),
            inbox,
            parked: VecDeque::new(),
            aborted: false,
        })
        .collect()
}

/// Run `worker` once per rank, each on its own thread of a dedicated
/// rayon pool, and collect the results in rank order.
pub fn run_local_cluster<F, R>(size: usize, worker: F) -> PoissonResult<Vec<R>>
where
    F: Fn(LocalChannel) -> R + Sync,
    R: Send,
{
    if size == 0 {
        return Err(PoissonError::Configuration(
            "A run needs at least one worker".to_string(),
        ));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(size)
        .thread_name(|i| format!("poisson-worker-{i}"))
        .build()
        .map_err(|e| PoissonError::Channel(format!("Cannot start worker pool: {e}")))?;

    let slots: Vec<Mutex<Option<LocalChannel>>> =
        local_cluster(size).into_iter().map(|c| Mutex::new(Some(c))).collect();

    pool.broadcast(|ctx| -> PoissonResult<R> {
        let endpoint = slots[ctx.index()]
            .lock()
            .map_err(|_| PoissonError::Channel("Endpoint slot poisoned".to_string()))?
            .take()
            .ok_or_else(|| {
                PoissonError::Channel(format!("Endpoint {} claimed twice", ctx.index()))
            })?;
        Ok(worker(endpoint))
    })
    .into_iter()
    .collect()
}

impl LocalChannel {
    fn post(&mut self, dest: usize, tag: Tag, payload: Payload) -> PoissonResult<()> {
        let tx = self
            .peers
            .get(dest)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                PoissonError::Channel(format!("Rank {} has no route to rank {dest}", self.rank))
            })?;
        let sent = tx.send(Envelope {
            from: self.rank,
            tag,
            payload,
        });
        match sent {
            Ok(()) => Ok(()),
            Err(_) => Err(self.hung_up(dest)),
        }
    }

    /// A peer only leaves mid-run after an abort went out to everyone,
    /// so wait for that abort to arrive here.
    fn hung_up(&mut self, dest: usize) -> PoissonError {
        if let Some(env) = self.parked.iter().find(|e| matches!(e.payload, Payload::Abort(_))) {
            return PoissonError::Aborted { rank: env.from };
        }
        while let Ok(env) = self.inbox.recv() {
            if let Payload::Abort(_) = env.payload {
                return PoissonError::Aborted { rank: env.from };
            }
            self.parked.push_back(env);
        }
        PoissonError::Channel(format!("Rank {dest} hung up"))
    }

    fn take(&mut self, from: usize, tag: Tag) -> PoissonResult<Payload> {
        if let Some(env) = self.parked.iter().find(|e| matches!(e.payload, Payload::Abort(_))) {
            return Err(PoissonError::Aborted { rank: env.from });
        }
        if let Some(pos) = self.parked.iter().position(|e| e.from == from && e.tag == tag) {
            if let Some(env) = self.parked.remove(pos) {
                return Ok(env.payload);
            }
        }
        loop {
            let env = self.inbox.recv().map_err(|_| {
                PoissonError::Channel(format!("Rank {} lost all peers", self.rank))
            })?;
            if let Payload::Abort(code) = env.payload {
                warn!("rank {}: run aborted by rank {} (code {code})", self.rank, env.from);
                return Err(PoissonError::Aborted { rank: env.from });
            }
            if env.from == from && env.tag == tag {
                return Ok(env.payload);
            }
            self.parked.push_back(env);
        }
    }

    fn unexpected(&self, from: usize, tag: Tag) -> PoissonError {
        PoissonError::Channel(format!(
            "Rank {} got a malformed {tag:?} message from rank {from}",
            self.rank
        ))
    }
}

impl MessageChannel for LocalChannel {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send_strip(&mut self, dest: usize, tag: Direction, data: &[f64]) -> PoissonResult<()> {
        self.post(dest, Tag::Strip(tag), Payload::Values(data.to_vec()))
    }

    fn receive_strip(&mut self, source: usize, tag: Direction, buf: &mut [f64]) -> PoissonResult<()> {
        let tag = Tag::Strip(tag);
        match self.take(source, tag)? {
            Payload::Values(v) if v.len() == buf.len() => {
                buf.copy_from_slice(&v);
                Ok(())
            }
            Payload::Values(v) => Err(PoissonError::Channel(format!(
                "Strip from rank {source} has {} values, expected {}",
                v.len(),
                buf.len()
            ))),
            _ => Err(self.unexpected(source, tag)),
        }
    }

    fn all_reduce_max(&mut self, local: f64) -> PoissonResult<f64> {
        if self.rank != ROOT_RANK {
            self.post(ROOT_RANK, Tag::Reduce, Payload::Scalar(local))?;
            return match self.take(ROOT_RANK, Tag::ReduceResult)? {
                Payload::Scalar(v) => Ok(v),
                _ => Err(self.unexpected(ROOT_RANK, Tag::ReduceResult)),
            };
        }
        let mut acc = local;
        for peer in (0..self.size()).filter(|&p| p != ROOT_RANK) {
            match self.take(peer, Tag::Reduce)? {
                Payload::Scalar(v) => acc = acc.max(v),
                _ => return Err(self.unexpected(peer, Tag::Reduce)),
            }
        }
        for peer in (0..self.size()).filter(|&p| p != ROOT_RANK) {
            self.post(peer, Tag::ReduceResult, Payload::Scalar(acc))?;
        }
        Ok(acc)
    }

    fn all_reduce_sum(&mut self, local: u64) -> PoissonResult<u64> {
        if self.rank != ROOT_RANK {
            self.post(ROOT_RANK, Tag::Reduce, Payload::Count(local))?;
            return match self.take(ROOT_RANK, Tag::ReduceResult)? {
                Payload::Count(v) => Ok(v),
                _ => Err(self.unexpected(ROOT_RANK, Tag::ReduceResult)),
            };
        }
        let mut acc = local;
        for peer in (0..self.size()).filter(|&p| p != ROOT_RANK) {
            match self.take(peer, Tag::Reduce)? {
                Payload::Count(v) => acc += v,
                _ => return Err(self.unexpected(peer, Tag::Reduce)),
            }
        }
        for peer in (0..self.size()).filter(|&p| p != ROOT_RANK) {
            self.post(peer, Tag::ReduceResult, Payload::Count(acc))?;
        }
        Ok(acc)
    }

    fn broadcast_bytes(&mut self, root: usize, payload: &mut Vec<u8>) -> PoissonResult<()> {
        if self.rank == root {
            for peer in (0..self.size()).filter(|&p| p != root) {
                self.post(peer, Tag::Broadcast, Payload::Bytes(payload.clone()))?;
            }
            return Ok(());
        }
        match self.take(root, Tag::Broadcast)? {
            Payload::Bytes(bytes) => {
                *payload = bytes;
                Ok(())
            }
            _ => Err(self.unexpected(root, Tag::Broadcast)),
        }
    }

    fn abort(&mut self, code: i32) {
        if self.aborted {
            return;
        }
        self.aborted = true;
        warn!("rank {}: aborting run (code {code})", self.rank);
        for tx in self.peers.iter().flatten() {
            // A peer that already returned has nothing left to unblock.
            let _ = tx.send(Envelope {
                from: self.rank,
                tag: Tag::Broadcast,
                payload: Payload::Abort(code),
            });
        }
    }
}

impl Drop for LocalChannel {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.abort(101);
        }
    }
}
