use std::sync::{Arc, Mutex};

use driftlands_backdrop::{MaskCache, NebulaBake, NebulaBaker};
use driftlands_common::splitmix64;

use crate::deferred::{InitSender, Launcher};

/// Seeds of the clouds baked for a world seed.
pub fn nebula_seeds(seed: u64, count: u32) -> Vec<u64> {
    (0..count as u64).map(|i| splitmix64(seed ^ (0x6e62 + i))).collect()
}

/// Bake every seed, stopping at the first failure.
pub fn bake_all(baker: &NebulaBaker, masks: &Mutex<MaskCache>, seeds: &[u64]) -> Result<Vec<NebulaBake>, String> {
    let mut masks = masks.lock().map_err(|_| "mask cache poisoned".to_string())?;
    seeds
        .iter()
        .map(|&seed| baker.bake(seed, &mut masks).map_err(|err| err.to_string()))
        .collect()
}

/// Bakes on the calling thread, blocking the frame that launches it.
pub fn inline_launcher(
    baker: NebulaBaker,
    masks: Arc<Mutex<MaskCache>>,
    seeds: Vec<u64>,
) -> Launcher<Vec<NebulaBake>> {
    Box::new(move |tx: InitSender<Vec<NebulaBake>>| {
        let _ = tx.send(bake_all(&baker, &masks, &seeds));
    })
}

/// Bakes on a worker thread; the frame loop keeps running meanwhile.
pub fn thread_launcher(
    baker: NebulaBaker,
    masks: Arc<Mutex<MaskCache>>,
    seeds: Vec<u64>,
) -> Launcher<Vec<NebulaBake>> {
    Box::new(move |tx: InitSender<Vec<NebulaBake>>| {
        let spawned = std::thread::Builder::new()
            .name("nebula-bake".into())
            .spawn(move || {
                let _ = tx.send(bake_all(&baker, &masks, &seeds));
            });
        // on failure the sender is dropped with the closure and the
        // receiver reports a dropped loader
        if let Err(err) = spawned {
            tracing::warn!(%err, "failed to spawn nebula bake thread");
        }
    })
}
