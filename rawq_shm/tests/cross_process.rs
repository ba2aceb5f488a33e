//! Multi-process integration test.
//!
//! Uses `fork()` for true cross-process SHM communication: the parent owns
//! the queue and consumes, a forked child attaches by name and produces.

use rawq_shm::RingQueue;
use std::time::{Duration, Instant};

const CHUNK: usize = 100;
const CHUNKS: usize = 500;

fn chunk(index: usize) -> Vec<u8> {
    (0..CHUNK).map(|i| ((index * 7 + i) % 251) as u8).collect()
}

fn produce(name: &str) -> bool {
    let Ok(mut queue) = RingQueue::attach(name) else {
        return false;
    };
    let deadline = Instant::now() + Duration::from_secs(20);

    for index in 0..CHUNKS {
        let data = chunk(index);
        loop {
            match queue.put(&data) {
                Ok(()) => break,
                Err(e) if e.is_transient() && Instant::now() < deadline => {
                    std::thread::yield_now();
                }
                Err(_) => return false,
            }
        }
    }
    true
}

#[test]
fn cross_process_stream() {
    let name = format!("rawq_xproc_{}", std::process::id());
    // Capacity deliberately not a multiple of CHUNK so puts keep wrapping.
    let mut consumer = RingQueue::create(&name, 256).expect("parent: create queue");

    // Safety: fork() is unsafe but this is a controlled test environment.
    let pid = unsafe { libc::fork() };

    if pid == 0 {
        // ── CHILD PROCESS (producer) ──
        // A fresh attach gives the child its own descriptors; the ones
        // inherited from the parent share its flock.
        let ok = produce(&name);
        std::process::exit(if ok { 0 } else { 1 });
    }

    // ── PARENT PROCESS (consumer) ──
    assert!(pid > 0, "fork failed");

    let deadline = Instant::now() + Duration::from_secs(20);
    for index in 0..CHUNKS {
        let received = loop {
            match consumer.get(CHUNK) {
                Ok(bytes) => break bytes,
                Err(e) if e.is_transient() => {
                    assert!(Instant::now() < deadline, "timeout waiting for chunk {index}");
                    std::thread::yield_now();
                }
                Err(e) => panic!("parent: get failed: {e}"),
            }
        };
        assert_eq!(received, chunk(index), "chunk {index} corrupted");
    }

    let mut status = 0;
    let waited = unsafe { libc::waitpid(pid, &mut status, 0) };
    assert_eq!(waited, pid);
    assert!(libc::WIFEXITED(status));
    assert_eq!(libc::WEXITSTATUS(status), 0, "child producer failed");

    assert!(consumer.is_empty());
    consumer.release().expect("parent: release");
}
