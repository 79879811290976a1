use std::io;
use std::mem;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use cubis_blocks::Palette;
use cubis_chunk::{ChunkHandle, ChunkStore, Voxel};
use cubis_mesh_cpu::{ExtractOptions, MeshOutput, Neighborhood, Sentinels, extract_into};
use cubis_world::EngineConfig;

const EXIT_POLL: Duration = Duration::from_millis(100);

#[inline]
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Worker threads for a configured count; `None` leaves one core for the main thread.
pub fn resolve_workers(configured: Option<usize>) -> usize {
    configured.unwrap_or_else(|| {
        thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1)
    })
}

/// One surface extraction: a chunk plus the 26 neighbors resolved at submission.
#[derive(Clone, Copy, Debug)]
pub struct MeshJob {
    pub chunk: ChunkHandle,
    pub around: [Option<ChunkHandle>; 27],
    pub options: ExtractOptions,
    /// Caller-chosen sequence number, handed back on completion.
    pub ticket: u64,
}

impl MeshJob {
    /// Resolves neighbor handles on the calling thread. `None` if `chunk` is stale.
    pub fn resolve(store: &ChunkStore, chunk: ChunkHandle, options: ExtractOptions, ticket: u64) -> Option<Self> {
        let coord = store.read(chunk)?.coord;
        let mut around = [None; 27];
        for dy in -1..=1 {
            for dz in -1..=1 {
                for dx in -1..=1 {
                    around[Neighborhood::slot(dx, dy, dz)] = if (dx, dy, dz) == (0, 0, 0) {
                        Some(chunk)
                    } else {
                        store.handle_of(coord.offset(dx, dy, dz))
                    };
                }
            }
        }
        Some(Self {
            chunk,
            around,
            options,
            ticket,
        })
    }
}

#[derive(Default)]
struct Cursor {
    produced: u64,
    taken: u64,
    ready: u64,
    consumed: u64,
    stopped: bool,
}

#[derive(Default)]
struct Slot {
    job: Option<MeshJob>,
    output: MeshOutput,
}

/// Single-producer ring owned by one worker. The cursor lock guards indices only.
struct Ring {
    cursor: Mutex<Cursor>,
    wake: Condvar,
    slots: Box<[Mutex<Slot>]>,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Self {
            cursor: Mutex::new(Cursor::default()),
            wake: Condvar::new(),
            slots: (0..capacity.max(1)).map(|_| Mutex::new(Slot::default())).collect(),
        }
    }

    #[inline]
    fn capacity(&self) -> u64 {
        self.slots.len() as u64
    }

    #[inline]
    fn slot(&self, seq: u64) -> MutexGuard<'_, Slot> {
        lock(&self.slots[(seq % self.capacity()) as usize])
    }

    fn push(&self, job: MeshJob) -> bool {
        let seq = {
            let c = lock(&self.cursor);
            if c.stopped || c.produced - c.consumed >= self.capacity() {
                return false;
            }
            c.produced
        };
        // Only the main thread produces, so `seq` is still ours.
        self.slot(seq).job = Some(job);
        lock(&self.cursor).produced = seq + 1;
        self.wake.notify_one();
        true
    }

    /// Blocks until a job is queued or the ring is stopped.
    fn next(&self) -> Option<u64> {
        let mut c = lock(&self.cursor);
        loop {
            if c.stopped {
                return None;
            }
            if c.taken < c.produced {
                c.taken += 1;
                return Some(c.taken - 1);
            }
            c = self.wake.wait(c).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn try_next(&self) -> Option<u64> {
        let mut c = lock(&self.cursor);
        (c.taken < c.produced).then(|| {
            c.taken += 1;
            c.taken - 1
        })
    }

    fn run(&self, seq: u64, extractor: &Extractor) {
        let (job, mut output) = {
            let mut s = self.slot(seq);
            (s.job, mem::take(&mut s.output))
        };
        match job {
            Some(job) => extractor.build(&job, &mut output),
            None => output.clear(),
        }
        self.slot(seq).output = output;
        lock(&self.cursor).ready += 1;
    }

    fn drain<F>(&self, deadline: Instant, consumed: &mut usize, f: &mut F)
    where
        F: FnMut(&MeshJob, &MeshOutput),
    {
        let (from, to) = {
            let c = lock(&self.cursor);
            (c.consumed, c.ready)
        };
        for seq in from..to {
            if *consumed > 0 && Instant::now() >= deadline {
                return;
            }
            {
                let s = self.slot(seq);
                if let Some(job) = s.job.as_ref() {
                    f(job, &s.output);
                }
            }
            lock(&self.cursor).consumed = seq + 1;
            *consumed += 1;
        }
    }

    fn in_flight(&self) -> usize {
        let c = lock(&self.cursor);
        (c.produced - c.consumed) as usize
    }

    fn stop(&self) {
        lock(&self.cursor).stopped = true;
        self.wake.notify_all();
    }
}

pub(crate) type ExtractFn = fn(&Neighborhood, &Palette, ExtractOptions, &mut MeshOutput);

/// What a worker needs to turn a job into geometry.
struct Extractor {
    store: Arc<ChunkStore>,
    palette: Arc<Palette>,
    sentinels: Sentinels,
    extract: ExtractFn,
}

impl Extractor {
    fn neighborhood(&self, job: &MeshJob) -> Option<Neighborhood> {
        let (center, hidden) = {
            let c = self.store.read(job.chunk)?;
            let hidden: Vec<u32> = c.extras.hidden().collect();
            (c.snapshot(), hidden)
        };
        let center = if hidden.is_empty() {
            center
        } else {
            // private copy; other workers keep reading the shared grid
            let mut g = (*center).clone();
            for i in hidden {
                if let Some(v) = g.as_mut_slice().get_mut(i as usize) {
                    *v = Voxel {
                        sun: v.sun,
                        torch: v.torch,
                        ..Voxel::HOLE
                    };
                }
            }
            Arc::new(g)
        };
        Some(Neighborhood::gather(center, &self.sentinels, |dx, dy, dz| {
            let h = job.around[Neighborhood::slot(dx, dy, dz)]?;
            self.store.read(h).map(|c| c.snapshot())
        }))
    }

    fn build(&self, job: &MeshJob, out: &mut MeshOutput) {
        let Some(nb) = self.neighborhood(job) else {
            out.clear();
            log::trace!(target: "pipeline", "job {} skipped: chunk unloaded", job.ticket);
            return;
        };
        let result = catch_unwind(AssertUnwindSafe(|| {
            (self.extract)(&nb, &self.palette, job.options, out);
        }));
        if result.is_err() {
            log::error!(
                target: "pipeline",
                "mesh job {} for slot {} panicked; chunk left without geometry",
                job.ticket,
                job.chunk.slot
            );
            out.mark_failed();
        }
    }
}

/// Pinned mesh workers, each fed through its own bounded ring.
///
/// Jobs for one chunk always land on the same worker, so they complete in
/// submission order. With zero configured workers the pipeline runs inline
/// inside [`MeshPipeline::pump`].
pub struct MeshPipeline {
    rings: Vec<Arc<Ring>>,
    extractor: Arc<Extractor>,
    workers: Vec<JoinHandle<()>>,
    exit_rx: Option<Receiver<usize>>,
    inline: bool,
}

impl MeshPipeline {
    pub fn new(store: Arc<ChunkStore>, palette: Arc<Palette>, cfg: &EngineConfig) -> io::Result<Self> {
        Self::with_extract(store, palette, cfg, extract_into)
    }

    /// Pipeline whose workers run `extract` instead of the stock extraction.
    pub(crate) fn with_extract(
        store: Arc<ChunkStore>,
        palette: Arc<Palette>,
        cfg: &EngineConfig,
        extract: ExtractFn,
    ) -> io::Result<Self> {
        let workers = resolve_workers(cfg.worker_threads);
        let inline = workers == 0;
        let lanes = workers.max(1);
        let capacity = (cfg.pending_jobs / lanes).max(1);
        let extractor = Arc::new(Extractor {
            sentinels: Sentinels::new(store.chunk_size()),
            store,
            palette,
            extract,
        });
        let mut pipeline = Self {
            rings: (0..lanes).map(|_| Arc::new(Ring::new(capacity))).collect(),
            extractor,
            workers: Vec::with_capacity(workers),
            exit_rx: None,
            inline,
        };
        if !inline {
            let (exit_tx, exit_rx) = unbounded::<usize>();
            pipeline.exit_rx = Some(exit_rx);
            for i in 0..workers {
                // on error, Drop stops the workers already running
                let handle = pipeline.spawn_worker(i, exit_tx.clone())?;
                pipeline.workers.push(handle);
            }
        }
        log::info!(
            target: "pipeline",
            "mesh pipeline: {} worker(s){}, {} slots each",
            workers,
            if inline { " (inline)" } else { "" },
            capacity
        );
        Ok(pipeline)
    }

    fn spawn_worker(&self, i: usize, exit_tx: Sender<usize>) -> io::Result<JoinHandle<()>> {
        let ring = Arc::clone(&self.rings[i]);
        let extractor = Arc::clone(&self.extractor);
        thread::Builder::new()
            .name(format!("cubis-mesh-{i}"))
            .spawn(move || {
                log::debug!(target: "pipeline", "worker {i} started");
                while let Some(seq) = ring.next() {
                    ring.run(seq, &extractor);
                }
                let _ = exit_tx.send(i);
            })
    }

    /// Number of background workers; 0 when running inline.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    pub fn capacity_per_worker(&self) -> usize {
        self.rings.first().map_or(0, |r| r.slots.len())
    }

    /// The worker a chunk's jobs are pinned to.
    #[inline]
    pub fn lane_of(&self, chunk: ChunkHandle) -> usize {
        chunk.slot as usize % self.rings.len()
    }

    /// Queues a job on the chunk's worker. `false` when that ring is full.
    pub fn submit(&self, job: MeshJob) -> bool {
        let lane = self.lane_of(job.chunk);
        let ok = self.rings[lane].push(job);
        if ok {
            log::trace!(target: "pipeline", "job {} -> worker {lane}", job.ticket);
        } else {
            log::debug!(target: "pipeline", "worker {lane} ring full; job {} deferred", job.ticket);
        }
        ok
    }

    /// Jobs submitted and not yet consumed.
    pub fn in_flight(&self) -> usize {
        self.rings.iter().map(|r| r.in_flight()).sum()
    }

    /// Hands finished jobs to `f` in per-worker order until `budget` runs out.
    /// At least one ready job is consumed per call.
    pub fn drain_ready<F>(&self, budget: Duration, mut f: F) -> usize
    where
        F: FnMut(&MeshJob, &MeshOutput),
    {
        let deadline = Instant::now() + budget;
        let mut consumed = 0;
        for ring in &self.rings {
            ring.drain(deadline, &mut consumed, &mut f);
        }
        consumed
    }

    /// Drains ready jobs; in inline mode runs queued jobs first.
    pub fn pump<F>(&self, budget: Duration, mut f: F) -> usize
    where
        F: FnMut(&MeshJob, &MeshOutput),
    {
        if !self.inline {
            return self.drain_ready(budget, f);
        }
        let deadline = Instant::now() + budget;
        let ring = &self.rings[0];
        let mut consumed = 0;
        loop {
            if consumed > 0 && Instant::now() >= deadline {
                break;
            }
            let Some(seq) = ring.try_next() else {
                break;
            };
            ring.run(seq, &self.extractor);
            ring.drain(deadline, &mut consumed, &mut f);
        }
        consumed
    }

    /// Stops all workers after their current job and joins them.
    pub fn shutdown(&mut self) {
        for ring in &self.rings {
            ring.stop();
        }
        if self.workers.is_empty() {
            return;
        }
        let mut remaining = self.workers.len();
        let mut waited = Duration::ZERO;
        if let Some(rx) = self.exit_rx.take() {
            while remaining > 0 {
                match rx.recv_timeout(EXIT_POLL) {
                    Ok(i) => {
                        remaining -= 1;
                        log::trace!(target: "pipeline", "worker {i} exited");
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        waited += EXIT_POLL;
                        log::warn!(
                            target: "pipeline",
                            "{remaining} worker(s) still finishing after {waited:?}"
                        );
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!(target: "pipeline", "mesh worker panicked outside a job");
            }
        }
        log::info!(target: "pipeline", "mesh pipeline stopped");
    }
}

impl Drop for MeshPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Kind whose presence in the center chunk makes [`extract_or_panic`] panic.
#[cfg(test)]
pub(crate) const FAULTY_KIND: u16 = 7;

#[cfg(test)]
pub(crate) fn extract_or_panic(nb: &Neighborhood, palette: &Palette, opts: ExtractOptions, out: &mut MeshOutput) {
    if nb.center().as_slice().iter().any(|v| v.kind == FAULTY_KIND) {
        panic!("extraction fault");
    }
    extract_into(nb, palette, opts, out);
}
