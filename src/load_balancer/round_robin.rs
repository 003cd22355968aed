//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::load_balancer::{ConnectionCounts, Selector, ServiceInstance};

/// Round-robin selector.
/// Stores an internal cursor to rotate through instances; one per pool.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of selections made so far.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

impl Selector for RoundRobin {
    fn next_instance<'a>(
        &self,
        instances: &[&'a ServiceInstance],
        _connections: &ConnectionCounts,
    ) -> Option<&'a ServiceInstance> {
        if instances.is_empty() {
            return None;
        }

        let position = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(instances[position % instances.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let counts = ConnectionCounts::new();
        let a = ServiceInstance::new("127.0.0.1", 8080);
        let b = ServiceInstance::new("127.0.0.1", 8081);
        let instances = vec![&a, &b];

        let s1 = lb.next_instance(&instances, &counts).unwrap();
        assert_eq!(s1.id, a.id);

        let s2 = lb.next_instance(&instances, &counts).unwrap();
        assert_eq!(s2.id, b.id);

        let s3 = lb.next_instance(&instances, &counts).unwrap();
        assert_eq!(s3.id, a.id);
        assert_eq!(lb.cursor(), 3);
    }

    #[test]
    fn test_empty_does_not_advance() {
        let lb = RoundRobin::new();
        assert!(lb.next_instance(&[], &ConnectionCounts::new()).is_none());
        assert_eq!(lb.cursor(), 0);
    }
}
