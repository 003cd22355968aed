//! Uniform random load balancing strategy.

use rand::seq::SliceRandom;

use crate::load_balancer::{ConnectionCounts, Selector, ServiceInstance};

#[derive(Debug, Default, Clone, Copy)]
pub struct Random;

impl Selector for Random {
    fn next_instance<'a>(
        &self,
        instances: &[&'a ServiceInstance],
        _connections: &ConnectionCounts,
    ) -> Option<&'a ServiceInstance> {
        instances.choose(&mut rand::thread_rng()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_covers_pool() {
        let counts = ConnectionCounts::new();
        let a = ServiceInstance::new("10.0.0.1", 80);
        let b = ServiceInstance::new("10.0.0.2", 80);
        let c = ServiceInstance::new("10.0.0.3", 80);
        let instances = vec![&a, &b, &c];

        let seen: HashSet<String> = (0..300)
            .filter_map(|_| Random.next_instance(&instances, &counts))
            .map(|i| i.id.clone())
            .collect();
        assert_eq!(seen.len(), 3);
        assert!(Random.next_instance(&[], &counts).is_none());
    }
}
