//! Route Set Computation
//!
//! Decides which prefixes the tunnel claims and which it carves out, once
//! per address family.
//!
//! # Sub-range default route
//!
//! A literal `0.0.0.0/0` can collide with host-level bypass rules on some
//! stacks. The sub-range form covers the same space minus the first /8
//! using eight discrete prefixes:
//!
//! ```text
//! 1.0.0.0/8  2.0.0.0/7  4.0.0.0/6  8.0.0.0/5
//! 16.0.0.0/4 32.0.0.0/3 64.0.0.0/2 128.0.0.0/1
//! ```
//!
//! IPv6 uses the same shape from `100::/8` up to `8000::/1`.

use ipnet::{Ipv4Net, Ipv6Net};
use serde::Serialize;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Number of prefixes in the sub-range decomposition
pub const SUB_RANGE_COUNT: u8 = 8;

/// Two-address block at the foot of the IPv4 space
pub const DEFAULT_ROUTE_FOOT_V4: Ipv4Net = Ipv4Net::new_assert(Ipv4Addr::new(0, 0, 0, 0), 31);

/// Reserved block of the auxiliary (push notification) service
pub const AUXILIARY_SERVICE_V4: Ipv4Net = Ipv4Net::new_assert(Ipv4Addr::new(17, 0, 0, 0), 8);

/// An address family whose prefixes can be routed
pub trait RouteFamily: Copy + Eq + fmt::Debug + fmt::Display {
    /// Address width in bits
    const BITS: u8;

    /// Build a prefix from the network address (as an integer) and length
    fn prefix(network: u128, prefix_len: u8) -> Self;

    /// The catch-all prefix for the family
    fn default_route() -> Self {
        Self::prefix(0, 0)
    }

    /// The eight-prefix decomposition of the space minus its first /8
    fn sub_ranges() -> Vec<Self> {
        (0..SUB_RANGE_COUNT)
            .map(|i| {
                let shift = u32::from(Self::BITS - SUB_RANGE_COUNT + i);
                Self::prefix(1u128 << shift, SUB_RANGE_COUNT - i)
            })
            .collect()
    }
}

impl RouteFamily for Ipv4Net {
    const BITS: u8 = 32;

    fn prefix(network: u128, prefix_len: u8) -> Self {
        Ipv4Net::new_assert(Ipv4Addr::from(network as u32), prefix_len)
    }
}

impl RouteFamily for Ipv6Net {
    const BITS: u8 = 128;

    fn prefix(network: u128, prefix_len: u8) -> Self {
        Ipv6Net::new_assert(Ipv6Addr::from(network), prefix_len)
    }
}

/// Included routes for one family.
///
/// Caller routes win outright; otherwise the default route, optionally in
/// its sub-range form.
pub fn compute_routes<N: RouteFamily>(explicit: &[N], use_sub_ranges: bool) -> Vec<N> {
    if !explicit.is_empty() {
        explicit.to_vec()
    } else if use_sub_ranges {
        N::sub_ranges()
    } else {
        vec![N::default_route()]
    }
}

/// Included and excluded routes for one family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSet<N> {
    pub included: Vec<N>,
    pub excluded: Vec<N>,
}

/// Route-related policy flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutePolicy {
    pub use_sub_ranges: bool,
    pub exclude_default_route: bool,
    pub exclude_auxiliary_service_route: bool,
}

/// Computes per-family route sets under a fixed policy
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteSetComputer {
    policy: RoutePolicy,
}

impl RouteSetComputer {
    pub fn new(policy: RoutePolicy) -> Self {
        Self { policy }
    }

    /// IPv4 routes, with the foot-block and auxiliary carve-outs
    pub fn ipv4(&self, included: &[Ipv4Net], excluded: &[Ipv4Net]) -> RouteSet<Ipv4Net> {
        let included = compute_routes(included, self.policy.use_sub_ranges);
        let mut excluded = excluded.to_vec();

        if !included.is_empty() {
            if self.policy.exclude_default_route {
                push_unique(&mut excluded, DEFAULT_ROUTE_FOOT_V4);
            }
            if self.policy.exclude_auxiliary_service_route {
                push_unique(&mut excluded, AUXILIARY_SERVICE_V4);
            }
        }

        RouteSet { included, excluded }
    }

    /// IPv6 routes. No carve-outs: the auxiliary service has no reserved
    /// IPv6 block and IPv6 installation does not need the foot block.
    pub fn ipv6(&self, included: &[Ipv6Net], excluded: &[Ipv6Net]) -> RouteSet<Ipv6Net> {
        RouteSet {
            included: compute_routes(included, self.policy.use_sub_ranges),
            excluded: excluded.to_vec(),
        }
    }
}

// Exact (address, prefix length) match; overlapping CIDRs are kept.
fn push_unique<N: PartialEq>(routes: &mut Vec<N>, route: N) {
    if !routes.contains(&route) {
        routes.push(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    fn v6(s: &str) -> Ipv6Net {
        s.parse().unwrap()
    }

    #[test]
    fn test_ipv4_sub_ranges() {
        let expected: Vec<Ipv4Net> = [
            "1.0.0.0/8",
            "2.0.0.0/7",
            "4.0.0.0/6",
            "8.0.0.0/5",
            "16.0.0.0/4",
            "32.0.0.0/3",
            "64.0.0.0/2",
            "128.0.0.0/1",
        ]
        .iter()
        .map(|s| v4(s))
        .collect();

        assert_eq!(compute_routes::<Ipv4Net>(&[], true), expected);
    }

    #[test]
    fn test_ipv6_sub_ranges() {
        let routes = compute_routes::<Ipv6Net>(&[], true);
        assert_eq!(routes.first(), Some(&v6("100::/8")));
        assert_eq!(routes.last(), Some(&v6("8000::/1")));
        assert_eq!(routes.len(), SUB_RANGE_COUNT as usize);
    }

    #[test]
    fn test_ipv4_sub_ranges_tile_space_minus_first_block() {
        let mut routes = compute_routes::<Ipv4Net>(&[], true);
        routes.sort_by_key(|r| u32::from(r.network()));

        // Contiguous, non-overlapping, from 1.0.0.0 to the top of the space
        let mut next = u64::from(u32::from(Ipv4Addr::new(1, 0, 0, 0)));
        for route in &routes {
            assert_eq!(u64::from(u32::from(route.network())), next, "gap or overlap at {route}");
            next = u64::from(u32::from(route.broadcast())) + 1;
        }
        assert_eq!(next, 1u64 << 32);

        for route in &routes {
            assert!(!route.contains(&Ipv4Addr::new(0, 255, 255, 255)));
        }
    }

    #[test]
    fn test_ipv6_sub_ranges_tile_space_minus_first_block() {
        let mut routes = compute_routes::<Ipv6Net>(&[], true);
        routes.sort_by_key(|r| u128::from(r.network()));

        let mut next = 1u128 << 120;
        for (i, route) in routes.iter().enumerate() {
            assert_eq!(u128::from(route.network()), next, "gap or overlap at {route}");
            let last = u128::from(route.broadcast());
            if i + 1 < routes.len() {
                next = last + 1;
            } else {
                assert_eq!(last, u128::MAX);
            }
        }

        for (i, a) in routes.iter().enumerate() {
            for b in routes.iter().skip(i + 1) {
                assert!(!a.contains(b) && !b.contains(a));
            }
        }
    }

    #[test]
    fn test_default_route_without_sub_ranges() {
        assert_eq!(compute_routes::<Ipv4Net>(&[], false), vec![v4("0.0.0.0/0")]);
        assert_eq!(compute_routes::<Ipv6Net>(&[], false), vec![v6("::/0")]);
    }

    #[test]
    fn test_explicit_routes_win() {
        let explicit = vec![v4("192.168.0.0/16"), v4("10.0.0.0/8"), v4("172.16.0.0/12")];
        assert_eq!(compute_routes(&explicit, true), explicit);
        assert_eq!(compute_routes(&explicit, false), explicit);
    }

    #[test]
    fn test_ipv4_carve_outs() {
        let computer = RouteSetComputer::new(RoutePolicy {
            use_sub_ranges: true,
            exclude_default_route: true,
            exclude_auxiliary_service_route: true,
        });

        let set = computer.ipv4(&[], &[]);
        assert_eq!(set.included.len(), SUB_RANGE_COUNT as usize);
        assert_eq!(set.excluded, vec![v4("0.0.0.0/31"), v4("17.0.0.0/8")]);
    }

    #[test]
    fn test_carve_outs_follow_explicit_excludes() {
        let computer = RouteSetComputer::new(RoutePolicy {
            exclude_auxiliary_service_route: true,
            exclude_default_route: true,
            ..RoutePolicy::default()
        });

        let set = computer.ipv4(&[v4("10.0.0.0/8")], &[v4("17.0.0.0/8"), v4("10.1.0.0/16")]);
        assert_eq!(set.included, vec![v4("10.0.0.0/8")]);
        assert_eq!(
            set.excluded,
            vec![v4("17.0.0.0/8"), v4("10.1.0.0/16"), v4("0.0.0.0/31")]
        );
    }

    #[test]
    fn test_dedup_is_exact_match_only() {
        let computer = RouteSetComputer::new(RoutePolicy {
            exclude_auxiliary_service_route: true,
            ..RoutePolicy::default()
        });

        // 17.1.0.0/16 sits inside 17.0.0.0/8 but is not the same prefix
        let set = computer.ipv4(&[], &[v4("17.1.0.0/16")]);
        assert_eq!(set.excluded, vec![v4("17.1.0.0/16"), v4("17.0.0.0/8")]);
    }

    #[test]
    fn test_ipv6_has_no_carve_outs() {
        let computer = RouteSetComputer::new(RoutePolicy {
            use_sub_ranges: false,
            exclude_default_route: true,
            exclude_auxiliary_service_route: true,
        });

        let set = computer.ipv6(&[], &[v6("fd00::/8")]);
        assert_eq!(set.included, vec![v6("::/0")]);
        assert_eq!(set.excluded, vec![v6("fd00::/8")]);
    }

    #[test]
    fn test_no_policy_keeps_excludes_verbatim() {
        let set = RouteSetComputer::default().ipv4(&[], &[v4("192.168.1.0/24")]);
        assert_eq!(set.included, vec![v4("0.0.0.0/0")]);
        assert_eq!(set.excluded, vec![v4("192.168.1.0/24")]);
    }
}
