//! Concurrent tile claiming: every tile goes to exactly one caller.

use std::collections::HashSet;
use std::thread;

use wavefront::integrator::{BufferParams, WorkScheduler, WorkTile};

fn claim_concurrently(scheduler: &WorkScheduler, threads: usize) -> Vec<Vec<WorkTile>> {
    thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| s.spawn(|| std::iter::from_fn(|| scheduler.next_tile()).collect::<Vec<_>>()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

#[test]
fn test_each_tile_claimed_exactly_once() {
    let mut scheduler = WorkScheduler::new(7);
    scheduler.reset(&BufferParams::new(37, 23), 0, 5);
    let total = scheduler.num_tiles();
    assert!(total > 100, "want a non-trivial plan, got {total} tiles");

    for _ in 0..20 {
        scheduler.reset(&BufferParams::new(37, 23), 0, 5);
        let claimed = claim_concurrently(&scheduler, 8);
        let all: Vec<WorkTile> = claimed.into_iter().flatten().collect();
        assert_eq!(all.len(), total);

        let unique: HashSet<usize> = all.iter().map(|t| t.index).collect();
        assert_eq!(unique.len(), total);

        // Claimed tiles equal the plan, so no pixel-sample is lost or duplicated.
        for t in &all {
            assert_eq!(Some(*t), scheduler.tile_at(t.index));
        }
        assert!(scheduler.next_tile().is_none());
    }
}

#[test]
fn test_pixel_samples_covered_once() {
    let mut scheduler = WorkScheduler::new(64);
    scheduler.reset(&BufferParams::new(19, 11), 2, 9);
    let all: Vec<WorkTile> = claim_concurrently(&scheduler, 4).into_iter().flatten().collect();

    let mut hits = vec![0u8; 19 * 11 * 9];
    for t in &all {
        for i in 0..t.work_size() {
            let (p, sample) = t.work_pixel(i);
            let s = (sample - 2) as usize;
            hits[(s * 11 + p.y as usize) * 19 + p.x as usize] += 1;
        }
    }
    assert!(hits.iter().all(|&h| h == 1));
}

#[test]
fn test_stop_while_claiming() {
    let mut scheduler = WorkScheduler::new(1);
    scheduler.reset(&BufferParams::new(64, 64), 0, 1);
    let total = scheduler.num_tiles();

    let claimed: usize = thread::scope(|s| {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    let mut n = 0;
                    while scheduler.next_tile().is_some() {
                        n += 1;
                    }
                    n
                })
            })
            .collect();
        s.spawn(|| scheduler.stop());
        workers.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert!(scheduler.is_stopped());
    assert!(claimed <= total);
    assert_eq!(claimed, scheduler.num_claimed());
}
