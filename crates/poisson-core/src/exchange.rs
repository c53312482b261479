// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — Boundary Exchange
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Halo exchange between face neighbours.
//!
//! Each call performs four paired transfers in a fixed order. In transfer
//! `(towards, from)` a worker sends its outermost interior strip facing
//! `towards` and fills its halo on side `from`; both ends of a pair use the
//! same travel direction as tag, so every strip has exactly one receiver.

use poisson_types::constants::VALUE_BYTES;
use poisson_types::error::PoissonResult;

use crate::channel::MessageChannel;
use crate::halo::HaloDescriptor;
use crate::subgrid::LocalSubgrid;
use crate::topology::{Direction, ProcessTopology};

/// (travel direction, side whose halo is filled)
const EXCHANGE_ORDER: [(Direction, Direction); 4] = [
    (Direction::Top, Direction::Bottom),
    (Direction::Bottom, Direction::Top),
    (Direction::Left, Direction::Right),
    (Direction::Right, Direction::Left),
];

#[derive(Debug, Clone, Copy)]
struct Transfer {
    towards: Direction,
    dest: Option<usize>,
    send: HaloDescriptor,
    source: Option<usize>,
    recv: HaloDescriptor,
}

#[derive(Debug, Clone)]
pub struct BoundaryExchanger {
    transfers: [Transfer; 4],
    send_buf: Vec<f64>,
    recv_buf: Vec<f64>,
    bytes_sent: u64,
}

impl BoundaryExchanger {
    pub fn new(topology: &ProcessTopology, sub: &LocalSubgrid) -> Self {
        let transfers = EXCHANGE_ORDER.map(|(towards, from)| Transfer {
            towards,
            dest: topology.neighbor(towards),
            send: HaloDescriptor::interior(sub, towards),
            source: topology.neighbor(from),
            recv: HaloDescriptor::halo(sub, from),
        });
        Self {
            transfers,
            send_buf: Vec::new(),
            recv_buf: Vec::new(),
            bytes_sent: 0,
        }
    }

    /// Refresh every halo strip that has a neighbour behind it.
    /// Returns the bytes this worker sent during the call.
    pub fn exchange_borders<C>(&mut self, channel: &mut C, sub: &mut LocalSubgrid) -> PoissonResult<u64>
    where
        C: MessageChannel + ?Sized,
    {
        let mut sent = 0u64;
        for t in self.transfers {
            if t.dest.is_some() {
                t.send.gather(sub.values(), &mut self.send_buf)?;
            }
            self.recv_buf.clear();
            self.recv_buf.resize(t.recv.count, 0.0);

            let send = t.dest.map(|d| (d, self.send_buf.as_slice()));
            let recv = t.source.map(|s| (s, self.recv_buf.as_mut_slice()));
            channel.send_receive_strip(t.towards, send, recv)?;

            if t.source.is_some() {
                let (grid, _) = sub.split_mut();
                t.recv.scatter(&self.recv_buf, grid)?;
            }
            if t.dest.is_some() {
                sent += t.send.count as u64 * VALUE_BYTES;
            }
        }
        self.bytes_sent += sent;
        Ok(sent)
    }

    /// Bytes sent by this worker over all calls so far.
    pub fn bytes_communicated(&self) -> u64 {
        self.bytes_sent
    }
}
