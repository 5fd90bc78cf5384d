use crossbeam_utils::thread;

/// Provides multithreading dispatch primitives for the tree queries and the solver.
///
/// The callers never need a load balancing parallel-for; they partition their own work and only need a way to
/// jumpstart a number of workers and wait for them. Each dispatch is a fork-join over a `crossbeam` scope, so workers
/// may borrow from the caller's stack and every dispatch is a full barrier.
#[derive(Debug, Clone)]
pub struct ThreadDispatcher {
    thread_count: usize,
}

impl Default for ThreadDispatcher {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ThreadDispatcher {
    /// Creates a dispatcher that uses up to `thread_count` workers. A count of zero is treated as one.
    pub fn new(thread_count: usize) -> Self {
        Self {
            thread_count: thread_count.max(1),
        }
    }

    /// Gets the number of workers available in the dispatcher.
    #[inline]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Splits `items` into chunks of at least `chunk_size` and runs `chunk_body` on every chunk, each from its own
    /// scoped thread. The chunk size is raised so that no more than `thread_count` chunks exist.
    ///
    /// The first chunk runs on the calling thread. Panics in workers are propagated to the caller.
    pub fn for_each_chunk<T, F>(&self, items: &mut [T], chunk_size: usize, chunk_body: F)
    where
        T: Send,
        F: Fn(&mut [T]) + Sync,
    {
        let chunk_size = chunk_size.max(items.len().div_ceil(self.thread_count)).max(1);
        let mut chunks = items.chunks_mut(chunk_size);
        let Some(first) = chunks.next() else {
            return;
        };
        let body = &chunk_body;
        let outcome = thread::scope(|scope| {
            let handles: Vec<_> = chunks.map(|chunk| scope.spawn(move |_| body(chunk))).collect();
            body(first);
            for handle in handles {
                if let Err(payload) = handle.join() {
                    std::panic::resume_unwind(payload);
                }
            }
        });
        if let Err(payload) = outcome {
            std::panic::resume_unwind(payload);
        }
    }

    /// Runs `worker_body` on up to `maximum_worker_count` workers, blocks until all of them finish and collects each
    /// worker's return value in worker order.
    ///
    /// Worker 0 runs on the calling thread. Panics in workers are propagated to the caller.
    pub fn map_workers<F, R>(&self, worker_body: F, maximum_worker_count: usize) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync,
        R: Send,
    {
        let worker_count = self.thread_count.min(maximum_worker_count).max(1);
        if worker_count == 1 {
            return vec![worker_body(0)];
        }
        let body = &worker_body;
        let outcome = thread::scope(|scope| {
            let handles: Vec<_> = (1..worker_count)
                .map(|worker_index| scope.spawn(move |_| body(worker_index)))
                .collect();
            let mut results = Vec::with_capacity(worker_count);
            results.push(body(0));
            for handle in handles {
                match handle.join() {
                    Ok(result) => results.push(result),
                    Err(payload) => std::panic::resume_unwind(payload),
                }
            }
            results
        });
        match outcome {
            Ok(results) => results,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn every_worker_runs_once() {
        let dispatcher = ThreadDispatcher::new(4);
        let counter = AtomicUsize::new(0);
        dispatcher.map_workers(
            |worker_index| {
                counter.fetch_add(1 << (worker_index * 4), Ordering::Relaxed);
            },
            3,
        );
        assert_eq!(counter.load(Ordering::Relaxed), 0x111);
    }

    #[test]
    fn results_come_back_in_worker_order() {
        let dispatcher = ThreadDispatcher::new(3);
        let results = dispatcher.map_workers(|worker_index| worker_index * 10, 8);
        assert_eq!(results, vec![0, 10, 20]);
        assert_eq!(ThreadDispatcher::new(0).thread_count(), 1);
    }

    #[test]
    fn chunks_cover_every_item_once() {
        let dispatcher = ThreadDispatcher::new(3);
        let mut items = vec![0u32; 100];
        let chunk_count = AtomicUsize::new(0);
        dispatcher.for_each_chunk(&mut items, 10, |chunk| {
            chunk_count.fetch_add(1, Ordering::Relaxed);
            chunk.iter_mut().for_each(|item| *item += 1);
        });
        assert!(items.iter().all(|&item| item == 1));
        // 100 items on 3 threads cannot be cut into chunks of 10.
        assert_eq!(chunk_count.load(Ordering::Relaxed), 3);

        let mut empty: Vec<u32> = Vec::new();
        dispatcher.for_each_chunk(&mut empty, 4, |_| panic!("no chunk expected"));
    }
}
