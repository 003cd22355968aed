//! Least Connections load balancing strategy.

use crate::load_balancer::{ConnectionCounts, Selector, ServiceInstance};

/// Least connections selector.
/// Selects the instance with the fewest tracked in-flight requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for LeastConnections {
    fn next_instance<'a>(
        &self,
        instances: &[&'a ServiceInstance],
        connections: &ConnectionCounts,
    ) -> Option<&'a ServiceInstance> {
        // In case of tie, the first one is selected (stability)
        instances
            .iter()
            .min_by_key(|instance| connections.get(&instance.id))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_least_conn() {
        let lb = LeastConnections::new();
        let counts = ConnectionCounts::new();
        let b1 = ServiceInstance::new("127.0.0.1", 8080);
        let b2 = ServiceInstance::new("127.0.0.1", 8081);
        counts.init(&b1.id);
        counts.init(&b2.id);

        // artificially increase connections on b1
        counts.increment(&b1.id);

        let instances = vec![&b1, &b2];

        // Should pick b2 (0 connections)
        let s1 = lb.next_instance(&instances, &counts).unwrap();
        assert_eq!(s1.id, b2.id);

        // increase b2
        counts.increment(&b2.id);
        counts.increment(&b2.id); // now b2 has 2, b1 has 1

        // Should pick b1 (1 connection)
        let s2 = lb.next_instance(&instances, &counts).unwrap();
        assert_eq!(s2.id, b1.id);
    }

    #[test]
    fn test_tie_picks_first() {
        let lb = LeastConnections::new();
        let counts = ConnectionCounts::new();
        let a = ServiceInstance::new("10.0.0.1", 80);
        let b = ServiceInstance::new("10.0.0.2", 80);

        let picked = lb.next_instance(&[&a, &b], &counts).unwrap();
        assert_eq!(picked.id, a.id);
        assert!(lb.next_instance(&[], &counts).is_none());
    }
}
