//! Weighted random load balancing strategy.
//!
//! Draws `r` in `[0, total_weight)` and walks the instances accumulating
//! weight; the first instance whose running total exceeds `r` wins. When every
//! weight is zero the choice falls back to uniform.

use rand::Rng;

use crate::load_balancer::random::Random;
use crate::load_balancer::{ConnectionCounts, Selector, ServiceInstance};

#[derive(Debug, Default, Clone, Copy)]
pub struct Weighted;

impl Weighted {
    /// Deterministic core of the selection for a given draw.
    pub fn pick<'a>(instances: &[&'a ServiceInstance], draw: u64) -> Option<&'a ServiceInstance> {
        let mut cumulative = 0u64;
        for instance in instances {
            cumulative += u64::from(instance.weight);
            if cumulative > draw {
                return Some(*instance);
            }
        }
        None
    }
}

impl Selector for Weighted {
    fn next_instance<'a>(
        &self,
        instances: &[&'a ServiceInstance],
        connections: &ConnectionCounts,
    ) -> Option<&'a ServiceInstance> {
        let total: u64 = instances.iter().map(|i| u64::from(i.weight)).sum();
        if total == 0 {
            return Random.next_instance(instances, connections);
        }

        let draw = rand::thread_rng().gen_range(0..total);
        Self::pick(instances, draw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Vec<ServiceInstance> {
        vec![
            ServiceInstance::new("10.0.0.1", 80).with_weight(1),
            ServiceInstance::new("10.0.0.2", 80).with_weight(3),
            ServiceInstance::new("10.0.0.3", 80).with_weight(0),
            ServiceInstance::new("10.0.0.4", 80).with_weight(6),
        ]
    }

    #[test]
    fn test_pick_boundaries() {
        let pool = pool();
        let instances: Vec<&ServiceInstance> = pool.iter().collect();

        assert_eq!(Weighted::pick(&instances, 0).unwrap().host, "10.0.0.1");
        assert_eq!(Weighted::pick(&instances, 1).unwrap().host, "10.0.0.2");
        assert_eq!(Weighted::pick(&instances, 3).unwrap().host, "10.0.0.2");
        assert_eq!(Weighted::pick(&instances, 4).unwrap().host, "10.0.0.4");
        assert_eq!(Weighted::pick(&instances, 9).unwrap().host, "10.0.0.4");
        assert!(Weighted::pick(&instances, 10).is_none());
    }

    #[test]
    fn test_zero_weight_never_chosen() {
        let pool = pool();
        let instances: Vec<&ServiceInstance> = pool.iter().collect();
        let counts = ConnectionCounts::new();

        for _ in 0..1_000 {
            let picked = Weighted.next_instance(&instances, &counts).unwrap();
            assert_ne!(picked.host, "10.0.0.3");
        }
    }

    #[test]
    fn test_all_zero_weights_fall_back_to_uniform() {
        let a = ServiceInstance::new("10.0.0.1", 80).with_weight(0);
        let b = ServiceInstance::new("10.0.0.2", 80).with_weight(0);
        let counts = ConnectionCounts::new();

        assert!(Weighted.next_instance(&[&a, &b], &counts).is_some());
        assert!(Weighted.next_instance(&[], &counts).is_none());
    }
}
