//! Topology to tinc configuration translation
//!
//! Pure rendering of a validated [`NetworkConfig`] into the text of every
//! artifact tincd reads. Output depends only on the input, so applying the
//! same snapshot twice yields byte-identical files.

use crate::network::{NetworkConfig, NodeConfig, RouteConfig};
use ipnetwork::IpNetwork;

/// Interface variable exported by tincd to its scripts
const INTERFACE: &str = "$INTERFACE";

/// Every artifact generated from one topology snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// tinc.conf
    pub main_config: String,
    /// tinc-up
    pub up_script: String,
    /// tinc-down
    pub down_script: String,
    /// One descriptor per node, in configuration order
    pub hosts: Vec<HostDescriptor>,
}

/// Host file contents for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDescriptor {
    /// Node id (file name)
    pub node_id: String,
    /// File contents
    pub contents: String,
}

/// Render all artifacts for `self_node`, whose public key is `self_pub_key`
pub fn render(config: &NetworkConfig, self_node: &NodeConfig, self_pub_key: &str) -> Artifacts {
    let connect_to: Vec<&str> = config
        .nodes
        .iter()
        .filter(|n| n.id != self_node.id)
        .map(|n| n.id.as_str())
        .collect();

    let hosts = config
        .nodes
        .iter()
        .map(|node| {
            let pub_key = if node.id == self_node.id {
                self_pub_key
            } else {
                node.pub_key.as_str()
            };
            HostDescriptor {
                node_id: node.id.clone(),
                contents: host_descriptor(node, pub_key),
            }
        })
        .collect();

    Artifacts {
        main_config: main_config(&self_node.id, &connect_to),
        up_script: script(&up_commands(&self_node.private_ips, &config.routes)),
        down_script: script(&down_commands(&self_node.private_ips, &config.routes)),
        hosts,
    }
}

/// tinc.conf: own name and a direct connection to every peer
pub fn main_config(name: &str, connect_to: &[&str]) -> String {
    let mut out = format!("Name = {}\n", name);
    for peer in connect_to {
        out.push_str(&format!("ConnectTo = {}\n", peer));
    }
    out
}

/// Host descriptor: public addresses, owned subnets, then the public key
pub fn host_descriptor(node: &NodeConfig, pub_key: &str) -> String {
    let mut out = String::new();

    for address in &node.public_ips {
        out.push_str(&format!("Address = {}\n", address));
    }

    // tinc rejects subnets with host bits set
    for subnet in &node.private_ips {
        out.push_str(&format!("Subnet = {}/{}\n", subnet.network(), subnet.prefix()));
    }

    out.push_str(pub_key);
    if !pub_key.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Commands bringing the interface up, addressing it and installing routes
pub fn up_commands(addresses: &[IpNetwork], routes: &[RouteConfig]) -> Vec<String> {
    let mut commands = vec![format!("ip link set {} up", INTERFACE)];
    commands.extend(
        addresses
            .iter()
            .map(|addr| format!("ip addr add {} dev {}", addr, INTERFACE)),
    );
    commands.extend(routes.iter().map(|route| route_command("add", route)));
    commands
}

/// Exact inverse of [`up_commands`], in reverse order
pub fn down_commands(addresses: &[IpNetwork], routes: &[RouteConfig]) -> Vec<String> {
    let mut commands: Vec<String> = routes
        .iter()
        .rev()
        .map(|route| route_command("del", route))
        .collect();
    commands.extend(
        addresses
            .iter()
            .rev()
            .map(|addr| format!("ip addr del {} dev {}", addr, INTERFACE)),
    );
    commands.push(format!("ip link set {} down", INTERFACE));
    commands
}

fn route_command(verb: &str, route: &RouteConfig) -> String {
    if route.is_direct() {
        format!("ip route {} {} dev {}", verb, route.route, INTERFACE)
    } else {
        format!("ip route {} {} via {}", verb, route.route, route.gateway)
    }
}

/// Shell script running `commands` in order
pub fn script(commands: &[String]) -> String {
    let mut out = String::from("#!/bin/sh\n");
    for command in commands {
        out.push_str(command);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn node(id: &str, private: &[&str], public: &[&str], key: &str) -> NodeConfig {
        NodeConfig {
            id: id.to_string(),
            name: id.to_lowercase(),
            private_ips: private.iter().map(|p| p.parse().unwrap()).collect(),
            public_ips: public.iter().map(|p| p.parse().unwrap()).collect(),
            pub_key: key.to_string(),
        }
    }

    fn sample() -> NetworkConfig {
        NetworkConfig {
            nodes: vec![
                node("A", &["10.0.0.1/24"], &["203.0.113.10"], ""),
                node("B", &["10.0.1.1/24"], &["198.51.100.7"], "KEY-B\n"),
                node("C", &[], &[], "KEY-C"),
            ],
            self_id: "A".to_string(),
            routes: vec![
                RouteConfig::direct("0.0.0.0/0".parse().unwrap()),
                RouteConfig::via("192.168.0.0/16".parse().unwrap(), "10.0.0.254".parse().unwrap()),
            ],
        }
    }

    #[test]
    fn test_main_config() {
        assert_eq!(
            main_config("A", &["B", "C"]),
            "Name = A\nConnectTo = B\nConnectTo = C\n"
        );
        assert_eq!(main_config("solo", &[]), "Name = solo\n");
    }

    #[test]
    fn test_host_descriptor() {
        let b = node("B", &["10.0.1.1/24", "fd00:1::5/64"], &["198.51.100.7", "2001:db8::7"], "KEY-B");
        assert_eq!(
            host_descriptor(&b, &b.pub_key),
            "Address = 198.51.100.7\n\
             Address = 2001:db8::7\n\
             Subnet = 10.0.1.0/24\n\
             Subnet = fd00:1::/64\n\
             KEY-B\n"
        );
    }

    #[test]
    fn test_render_sample() {
        let config = sample();
        let artifacts = render(&config, &config.nodes[0], "KEY-A\n");

        assert_eq!(artifacts.main_config, "Name = A\nConnectTo = B\nConnectTo = C\n");
        assert_eq!(
            artifacts.up_script,
            "#!/bin/sh\n\
             ip link set $INTERFACE up\n\
             ip addr add 10.0.0.1/24 dev $INTERFACE\n\
             ip route add 0.0.0.0/0 dev $INTERFACE\n\
             ip route add 192.168.0.0/16 via 10.0.0.254\n"
        );
        assert_eq!(
            artifacts.down_script,
            "#!/bin/sh\n\
             ip route del 192.168.0.0/16 via 10.0.0.254\n\
             ip route del 0.0.0.0/0 dev $INTERFACE\n\
             ip addr del 10.0.0.1/24 dev $INTERFACE\n\
             ip link set $INTERFACE down\n"
        );

        let ids: Vec<&str> = artifacts.hosts.iter().map(|h| h.node_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert!(artifacts.hosts[0].contents.ends_with("KEY-A\n"));
        assert!(artifacts.hosts[1].contents.ends_with("KEY-B\n"));
        assert_eq!(artifacts.hosts[2].contents, "KEY-C\n");
    }

    #[test]
    fn test_self_key_overrides_supplied_key() {
        let mut config = sample();
        config.nodes[0].pub_key = "SUPPLIED".to_string();
        let artifacts = render(&config, &config.nodes[0], "LOCAL");
        assert!(artifacts.hosts[0].contents.ends_with("LOCAL\n"));
        assert!(!artifacts.hosts[0].contents.contains("SUPPLIED"));
    }

    fn inverse(up: &str) -> String {
        up.replacen(" add ", " del ", 1).replace(" up", " down")
    }

    fn arb_network() -> impl Strategy<Value = IpNetwork> {
        (any::<[u8; 4]>(), 0u8..=32).prop_map(|(octets, prefix)| {
            IpNetwork::new(IpAddr::V4(Ipv4Addr::from(octets)), prefix).unwrap()
        })
    }

    fn arb_route() -> impl Strategy<Value = RouteConfig> {
        (arb_network(), prop::option::of(any::<[u8; 4]>())).prop_map(|(route, gw)| match gw {
            Some(octets) => RouteConfig::via(route, IpAddr::V4(Ipv4Addr::from(octets))),
            None => RouteConfig::direct(route),
        })
    }

    proptest! {
        #[test]
        fn prop_down_is_reverse_of_up(
            addresses in prop::collection::vec(arb_network(), 0..5),
            routes in prop::collection::vec(arb_route(), 0..5),
        ) {
            let up = up_commands(&addresses, &routes);
            let down = down_commands(&addresses, &routes);
            prop_assert_eq!(up.len(), down.len());

            let expected: Vec<String> = up.iter().rev().map(|c| inverse(c)).collect();
            prop_assert_eq!(down, expected);
        }

        #[test]
        fn prop_connect_list_is_every_peer(
            count in 1usize..8,
            self_pick in any::<prop::sample::Index>(),
        ) {
            let nodes: Vec<NodeConfig> = (0..count)
                .map(|i| node(&format!("n{}", i), &[], &[], "KEY"))
                .collect();
            let self_node = nodes[self_pick.index(count)].clone();
            let config = NetworkConfig {
                nodes,
                self_id: self_node.id.clone(),
                routes: vec![],
            };

            let artifacts = render(&config, &self_node, "SELF");
            let expected: Vec<String> = config
                .peers()
                .map(|n| format!("ConnectTo = {}", n.id))
                .collect();
            let actual: Vec<String> = artifacts
                .main_config
                .lines()
                .skip(1)
                .map(str::to_string)
                .collect();
            prop_assert_eq!(actual, expected);
            prop_assert_eq!(artifacts.hosts.len(), count);

            // Deterministic output
            prop_assert_eq!(render(&config, &self_node, "SELF"), artifacts);
        }
    }
}
