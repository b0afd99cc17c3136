use restuned_registry::{ResourceRegistry, TargetRegistry};
use restuned_types::{ApplyScope, Permission, Priority, Request, RequestType};

use crate::manager::Verifier;

/// Staged admission pipeline run against every externally-submitted
/// request: opcode, priority range, per-resource permission, per-resource
/// bounds, then logical-to-physical topology validity. Each stage
/// short-circuits the rest on the first failure.
pub struct AdmissionVerifier {
    resources: ResourceRegistry,
    targets: TargetRegistry,
}

impl AdmissionVerifier {
    pub fn new(resources: ResourceRegistry, targets: TargetRegistry) -> Self {
        AdmissionVerifier { resources, targets }
    }

    fn check_opcode(&self, request: &Request) -> Result<(), String> {
        match request.request_type {
            RequestType::ResourceTune
            | RequestType::ResourceUntune
            | RequestType::SignalTune
            | RequestType::SignalUntune => Ok(()),
            RequestType::PropGet => Err("propGet does not admit through the request pipeline".into()),
        }
    }

    fn check_priority(&self, request: &Request) -> Result<(), String> {
        match request.priority {
            Priority::ServerCleanup | Priority::HighTransfer => {
                Err(format!("priority {:?} is reserved for internally synthesized requests", request.priority))
            }
            _ => Ok(()),
        }
    }

    fn requester_permission(&self, request: &Request) -> Permission {
        match request.priority {
            Priority::SystemHigh | Priority::SystemLow | Priority::ServerCleanup | Priority::HighTransfer => {
                Permission::System
            }
            Priority::ThirdPartyHigh | Priority::ThirdPartyLow => Permission::ThirdParty,
        }
    }

    fn check_resources(&self, request: &Request) -> Result<(), String> {
        let requester = self.requester_permission(request);
        for resource in &request.resources {
            let config = match self.resources.get(resource.code) {
                Ok(config) => config,
                Err(_) => continue, // missing config drops the resource, not the request
            };

            if config.permission == Permission::System && requester == Permission::ThirdParty {
                return Err(format!("resource {} is system-only", resource.code));
            }

            if let Some(value) = resource.arbitration_value() {
                if !config.within_bounds(value) {
                    return Err(format!("resource {} value {} out of bounds", resource.code, value));
                }
            }

            if let Err(e) = self.check_topology(resource, &config.apply_scope) {
                return Err(e);
            }
        }
        Ok(())
    }

    fn check_topology(
        &self,
        resource: &restuned_types::Resource,
        apply_scope: &ApplyScope,
    ) -> Result<(), String> {
        match apply_scope {
            ApplyScope::Global => Ok(()),
            ApplyScope::Cluster => {
                let cluster = resource.info.logical_cluster.unwrap_or(0);
                self.targets.physical_cluster_id(cluster).map(|_| ()).map_err(|e| e.to_string())
            }
            ApplyScope::Core => {
                let cluster = resource.info.logical_cluster.unwrap_or(0);
                let core = resource.info.logical_core.unwrap_or(0);
                self.targets.physical_core_id(cluster, core).map(|_| ()).map_err(|e| e.to_string())
            }
            ApplyScope::Cgroup => {
                let cgroup_id = resource.values.first().copied().unwrap_or(0);
                self.targets.cgroup(cgroup_id).map(|_| ()).map_err(|e| e.to_string())
            }
        }
    }
}

impl Verifier for AdmissionVerifier {
    fn verify(&self, request: &Request) -> Result<(), String> {
        self.check_opcode(request)?;
        self.check_priority(request)?;
        self.check_resources(request)?;
        Ok(())
    }
}
