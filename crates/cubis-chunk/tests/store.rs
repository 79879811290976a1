use std::sync::Arc;
use std::thread;

use cubis_chunk::{
    Chunk, ChunkStore, Face, FillOutcome, RenderState, StoreError, UnloadMode, Voxel,
};
use cubis_world::{ChunkCoord, EngineConfig};
use proptest::prelude::*;

fn config(capacity: usize) -> EngineConfig {
    EngineConfig {
        chunk_size: 4,
        pool_capacity: capacity,
        world_extent_chunks: 64,
        ..EngineConfig::default()
    }
}

fn stone(c: &mut Chunk) -> FillOutcome {
    c.voxels_mut().set(1, 1, 1, Voxel::new(1, 15));
    FillOutcome {
        wrote: true,
        complete: true,
        above_surface: false,
    }
}

#[test]
fn repeated_gets_return_the_same_chunk() {
    let store = ChunkStore::new(&config(8));
    let c = ChunkCoord::new(3, -2, 5);
    let a = store.get(c, true, stone).unwrap().unwrap();
    let b = store.get(c, true, stone).unwrap().unwrap();
    assert_eq!(a, b);
    assert_eq!(store.len(), 1);
    // cache miss path through the table
    store.get(ChunkCoord::new(0, 0, 0), true, stone).unwrap();
    assert_eq!(store.get(c, false, stone).unwrap(), Some(a));
    assert_eq!(store.get_by_key(store.key_of(c).unwrap()), Some(a));
    assert_eq!(store.read(a).unwrap().coord, c);
}

#[test]
fn lookup_without_create_leaves_store_untouched() {
    let store = ChunkStore::new(&config(2));
    assert_eq!(
        store.get(ChunkCoord::new(1, 1, 1), false, stone).unwrap(),
        None
    );
    assert!(store.is_empty());
}

#[test]
fn stale_handle_does_not_resolve_after_slot_reuse() {
    let store = ChunkStore::new(&config(1));
    let old_coord = ChunkCoord::new(0, 0, 0);
    let old = store.get(old_coord, true, stone).unwrap().unwrap();
    assert!(store.unload(old, UnloadMode::Recycle));
    assert!(!store.unload(old, UnloadMode::Recycle));

    let new_coord = ChunkCoord::new(9, 0, 0);
    let new = store.get(new_coord, true, stone).unwrap().unwrap();
    assert_eq!(new.slot, old.slot);
    assert_ne!(new.generation, old.generation);
    assert!(store.read(old).is_none());
    assert!(store.write(old).is_none());
    assert_eq!(store.get(old_coord, false, stone).unwrap(), None);
    assert_eq!(store.read(new).unwrap().coord, new_coord);
}

#[test]
fn fifth_chunk_in_a_pool_of_four_is_refused() {
    let store = ChunkStore::new(&config(4));
    let mut live = Vec::new();
    for x in 0..4 {
        live.push(store.get(ChunkCoord::new(x, 0, 0), true, stone).unwrap().unwrap());
    }
    let err = store
        .get(ChunkCoord::new(4, 0, 0), true, stone)
        .unwrap_err();
    assert_eq!(err, StoreError::PoolExhausted { capacity: 4 });
    // nothing was stolen
    for (x, h) in live.iter().enumerate() {
        assert_eq!(store.read(*h).unwrap().coord, ChunkCoord::new(x as i32, 0, 0));
    }
    assert_eq!(store.len(), 4);
}

#[test]
fn recycle_keeps_render_buffers_and_destroy_drops_them() {
    let store = ChunkStore::new(&config(1));
    let h = store.get(ChunkCoord::new(0, 0, 0), true, stone).unwrap().unwrap();
    {
        let mut c = store.write(h).unwrap();
        let mut mesh = cubis_chunk::RenderMesh::default();
        mesh.indices.extend_from_slice(&[0, 1, 2]);
        c.render = Some(mesh);
        c.render_state = RenderState::Ready;
    }
    store.unload(h, UnloadMode::Recycle);
    let h = store.get(ChunkCoord::new(1, 0, 0), true, stone).unwrap().unwrap();
    {
        let c = store.read(h).unwrap();
        let mesh = c.render.as_ref().expect("buffers kept");
        assert!(mesh.is_empty());
        assert!(mesh.indices.capacity() >= 3);
    }
    store.unload(h, UnloadMode::Destroy);
    let h = store.get(ChunkCoord::new(2, 0, 0), true, stone).unwrap().unwrap();
    assert!(store.read(h).unwrap().render.is_none());
}

#[test]
fn snapshots_survive_edits() {
    let store = ChunkStore::new(&config(1));
    let h = store.get(ChunkCoord::new(0, 0, 0), true, stone).unwrap().unwrap();
    let snap = store.read(h).unwrap().snapshot();
    store
        .write(h)
        .unwrap()
        .voxels_mut()
        .set(1, 1, 1, Voxel::HOLE);
    assert_eq!(snap.get(1, 1, 1).kind, 1);
    assert!(store.read(h).unwrap().voxels().get(1, 1, 1).is_hole());
}

#[test]
fn handles_resolve_from_other_threads() {
    let store = Arc::new(ChunkStore::new(&config(8)));
    let h = store.get(ChunkCoord::new(0, 0, 0), true, stone).unwrap().unwrap();
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.read(h).map(|c| c.voxels().get(1, 1, 1).kind))
        })
        .collect();
    for w in workers {
        assert_eq!(w.join().unwrap(), Some(1));
    }
}

#[test]
fn vertical_links_follow_creation_order() {
    let store = ChunkStore::new(&config(4));
    let below = store.get(ChunkCoord::new(0, 0, 0), true, stone).unwrap().unwrap();
    let above = store.get(ChunkCoord::new(0, 1, 0), true, stone).unwrap().unwrap();
    assert_eq!(store.read(below).unwrap().neighbor(Face::PosY), Some(above));
    assert_eq!(store.read(above).unwrap().neighbor(Face::NegY), Some(below));
    assert_eq!(store.read(above).unwrap().neighbor(Face::PosX), None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn loaded_set_matches_model(ops in prop::collection::vec((0i32..6, any::<bool>()), 1..60)) {
        let store = ChunkStore::new(&config(6));
        let mut model = std::collections::HashMap::new();
        for (x, load) in ops {
            let c = ChunkCoord::new(x, 0, 0);
            if load {
                let h = store.get(c, true, stone).unwrap().unwrap();
                if let Some(prev) = model.insert(x, h) {
                    prop_assert_eq!(prev, h);
                }
            } else if let Some(h) = model.remove(&x) {
                prop_assert!(store.unload(h, UnloadMode::Recycle));
            }
        }
        prop_assert_eq!(store.len(), model.len());
        for (x, h) in &model {
            prop_assert_eq!(store.read(*h).unwrap().coord, ChunkCoord::new(*x, 0, 0));
        }
    }
}
