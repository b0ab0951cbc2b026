//! Fan-out of per-agent work over a fixed pool of workers

use std::sync::Mutex;

/// Hands every element of `items` to exactly one worker of the given pool.
///
/// All workers of the pool pull from one shared cursor: a worker locks the
/// cursor, captures the next element, releases the lock and only then invokes
/// the visitor. Elements are therefore visited exactly once but in no
/// particular order, and workers which find the cursor exhausted terminate
/// without having visited anything. The call returns once every worker has
/// finished.
///
/// The cursor itself performs no domain logic and cannot fail; errors which a
/// visitor wants to surface have to travel through captured state.
pub fn visit_every_object<I, F>(pool: &rayon::ThreadPool, items: I, visitor: F)
where
    I: IntoIterator,
    I::IntoIter: Send,
    I::Item: Send,
    F: Fn(I::Item) + Send + Sync,
{
    let cursor = Mutex::new(items.into_iter());
    pool.scope(|scope| {
        for _ in 0..pool.current_num_threads() {
            scope.spawn(|_| loop {
                // Only the capture happens under the lock, never the visit.
                let captured = match cursor.lock() {
                    Ok(mut items) => items.next(),
                    Err(_) => None,
                };
                match captured {
                    Some(item) => visitor(item),
                    None => break,
                }
            });
        }
    });
}

#[cfg(test)]
mod test_visit_every_object {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pool_with(n_workers: usize) -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n_workers)
            .build()
            .unwrap()
    }

    fn count_visits(n_items: usize, n_workers: usize) {
        let visits: Vec<AtomicUsize> = (0..n_items).map(|_| AtomicUsize::new(0)).collect();
        let pool = pool_with(n_workers);
        visit_every_object(&pool, 0..n_items, |index| {
            visits[index].fetch_add(1, Ordering::SeqCst);
        });
        for (index, counter) in visits.iter().enumerate() {
            assert_eq!(
                counter.load(Ordering::SeqCst),
                1,
                "element {index} was not visited exactly once"
            );
        }
    }

    #[test]
    fn every_element_visited_exactly_once() {
        for n_workers in [1, 2, 3, 4, 8, 16, 32, 64] {
            count_visits(1_000, n_workers);
        }
    }

    #[test]
    fn more_workers_than_elements() {
        count_visits(3, 64);
    }

    #[test]
    fn empty_input_terminates() {
        let pool = pool_with(4);
        let total = AtomicUsize::new(0);
        visit_every_object(&pool, std::iter::empty::<usize>(), |_| {
            total.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(total.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn visitors_may_mutate_items() {
        let mut values = vec![0_u64; 256];
        let pool = pool_with(8);
        visit_every_object(&pool, values.iter_mut(), |value| {
            *value += 1;
        });
        assert!(values.iter().all(|value| *value == 1));
    }
}
