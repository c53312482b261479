// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — MPI Message Channel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! `MessageChannel` over the MPI world communicator (rsmpi).
//!
//! Build with `--features mpi` and launch with `mpirun -np <PX*PY>`.
//! MPI's default error handler aborts the job on a failed call, so the
//! transfer methods have no error path of their own.

use mpi::collective::SystemOperation;
use mpi::environment::Universe;
use mpi::point_to_point::send_receive_into_with_tags;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;
use mpi::Tag;

use poisson_types::error::{PoissonError, PoissonResult};

use crate::channel::MessageChannel;
use crate::topology::Direction;

pub struct MpiChannel {
    world: SimpleCommunicator,
    // Finalizes MPI on drop; must outlive `world`.
    _universe: Universe,
}

impl MpiChannel {
    /// Initialize MPI. Only one channel may exist per process.
    pub fn initialize() -> PoissonResult<Self> {
        let universe = mpi::initialize()
            .ok_or_else(|| PoissonError::Channel("MPI was already initialized".to_string()))?;
        let world = universe.world();
        Ok(Self {
            world,
            _universe: universe,
        })
    }
}

fn tag_of(dir: Direction) -> Tag {
    dir as Tag
}

impl MessageChannel for MpiChannel {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn send_strip(&mut self, dest: usize, tag: Direction, data: &[f64]) -> PoissonResult<()> {
        self.world
            .process_at_rank(dest as i32)
            .send_with_tag(data, tag_of(tag));
        Ok(())
    }

    fn receive_strip(&mut self, source: usize, tag: Direction, buf: &mut [f64]) -> PoissonResult<()> {
        self.world
            .process_at_rank(source as i32)
            .receive_into_with_tag(buf, tag_of(tag));
        Ok(())
    }

    fn send_receive_strip(
        &mut self,
        tag: Direction,
        send: Option<(usize, &[f64])>,
        recv: Option<(usize, &mut [f64])>,
    ) -> PoissonResult<()> {
        let tag = tag_of(tag);
        match (send, recv) {
            (Some((dest, data)), Some((source, buf))) => {
                let dest = self.world.process_at_rank(dest as i32);
                let source = self.world.process_at_rank(source as i32);
                send_receive_into_with_tags(data, &dest, tag, buf, &source, tag);
            }
            (Some((dest, data)), None) => {
                self.world.process_at_rank(dest as i32).send_with_tag(data, tag);
            }
            (None, Some((source, buf))) => {
                self.world
                    .process_at_rank(source as i32)
                    .receive_into_with_tag(buf, tag);
            }
            (None, None) => {}
        }
        Ok(())
    }

    fn all_reduce_max(&mut self, local: f64) -> PoissonResult<f64> {
        let mut global = 0.0f64;
        self.world
            .all_reduce_into(&local, &mut global, SystemOperation::max());
        Ok(global)
    }

    fn all_reduce_sum(&mut self, local: u64) -> PoissonResult<u64> {
        let mut global = 0u64;
        self.world
            .all_reduce_into(&local, &mut global, SystemOperation::sum());
        Ok(global)
    }

    fn broadcast_bytes(&mut self, root: usize, payload: &mut Vec<u8>) -> PoissonResult<()> {
        let root_process = self.world.process_at_rank(root as i32);
        let mut len = payload.len() as u64;
        root_process.broadcast_into(&mut len);
        if self.rank() != root {
            payload.resize(len as usize, 0);
        }
        root_process.broadcast_into(&mut payload[..]);
        Ok(())
    }

    fn abort(&mut self, code: i32) {
        self.world.abort(code)
    }
}
