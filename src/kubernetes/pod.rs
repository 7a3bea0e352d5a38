use std::net::IpAddr;

use tracing::warn;

use super::{IpFamily, PodPhase, PodSnapshot};

/// A pod update is relevant to policy enforcement when any field that
/// policies key off of changes: phase, pod IP(s), host IP, or labels.
/// Everything else on the pod (container statuses, conditions, resource
/// usage) is noise at this layer. The IP list is compared as a sequence, a
/// reorder counts as a change.
pub fn is_update_relevant(old: &PodSnapshot, new: &PodSnapshot) -> bool {
    new.phase != old.phase
        || new.pod_ip != old.pod_ip
        || new.pod_ips != old.pod_ips
        || new.host_ip != old.host_ip
        || new.labels != old.labels
}

/// Whether the pod should be considered by policy enforcement at all: still
/// running, routable, and not sharing the host's network namespace.
pub fn is_actionable(pod: &PodSnapshot) -> bool {
    !is_finished(pod) && !pod.pod_ip.is_empty() && !pod.host_network
}

fn is_finished(pod: &PodSnapshot) -> bool {
    matches!(
        pod.phase,
        PodPhase::Failed | PodPhase::Succeeded | PodPhase::Completed
    )
}

/// First address of the requested family in the pod's IP list.
pub fn ip_by_family(pod: &PodSnapshot, family: IpFamily) -> Option<IpAddr> {
    pod.pod_ips.iter().copied().find(|ip| match family {
        IpFamily::V4 => ip.is_ipv4(),
        IpFamily::V6 => ip.is_ipv6(),
    })
}

/// Collects one address per pod for the requested family, skipping pods
/// without one.
pub fn ips_by_family(pods: &[PodSnapshot], family: IpFamily) -> Vec<IpAddr> {
    let mut ips = Vec::new();
    for pod in pods {
        match ip_by_family(pod, family) {
            Some(ip) => ips.push(ip),
            None => warn!("pod {} has no {:?} address", pod.name, family),
        }
    }
    ips
}
