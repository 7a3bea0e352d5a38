pub mod pod;

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::str::FromStr;

use k8s_openapi::api::core::v1::Pod;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Reported by job pods whose containers all exited cleanly.
    Completed,
    Unknown,
}

impl From<&str> for PodPhase {
    fn from(s: &str) -> Self {
        match s {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Completed" => Self::Completed,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    V4,
    V6,
}

/// The slice of pod state that network policy enforcement keys off of.
#[derive(Debug, Clone)]
pub struct PodSnapshot {
    /// Kept for log context only, never part of change comparison
    pub name: String,
    pub phase: PodPhase,
    pub pod_ip: String,
    pub pod_ips: Vec<IpAddr>,
    pub host_ip: String,
    pub host_network: bool,
    pub labels: BTreeMap<String, String>,
}

impl PodSnapshot {
    pub fn from_pod(pod: &Pod) -> Self {
        let status = pod.status.as_ref();
        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            phase: status
                .and_then(|s| s.phase.as_deref())
                .map_or(PodPhase::Unknown, PodPhase::from),
            pod_ip: status.and_then(|s| s.pod_ip.clone()).unwrap_or_default(),
            pod_ips: pod_ips(pod),
            host_ip: status.and_then(|s| s.host_ip.clone()).unwrap_or_default(),
            host_network: pod_is_host_network(pod),
            labels: pod.metadata.labels.clone().unwrap_or_default(),
        }
    }
}

fn pod_ips(pod: &Pod) -> Vec<IpAddr> {
    let Some(status) = pod.status.as_ref() else {
        return Vec::new();
    };

    let Some(ips) = status.pod_ips.as_ref() else {
        return Vec::new();
    };

    ips.iter()
        .filter_map(|ip| IpAddr::from_str(&ip.ip).ok())
        .collect()
}

fn pod_is_host_network(pod: &Pod) -> bool {
    let Some(spec) = pod.spec.as_ref() else {
        return false;
    };
    spec.host_network.unwrap_or_default()
}
