//! Application collections returned by registry queries.

use serde::{Deserialize, Serialize};

use crate::instance::InstanceInfo;
use crate::wire::WireEntity;

/// All instances registered under one application name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,

    #[serde(rename = "instance", default)]
    pub instances: Vec<InstanceInfo>,
}

impl Application {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instances: Vec::new(),
        }
    }

    /// Looks up an instance by its server-side id.
    pub fn instance(&self, id: &str) -> Option<&InstanceInfo> {
        self.instances.iter().find(|instance| instance.id() == id)
    }
}

impl WireEntity for Application {
    const ROOT_NAME: &'static str = "application";
}

/// The full (or delta) registry view.
///
/// Field wire names (`versions__delta`, `apps__hashcode`, `application`) are
/// not derived here; the codec's applications mix-in supplies them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Applications {
    #[serde(default)]
    pub versions_delta: String,

    /// Reconciliation hash: `STATUS_count_` pairs sorted by status name.
    #[serde(default)]
    pub apps_hashcode: String,

    #[serde(default)]
    pub applications: Vec<Application>,
}

impl Applications {
    /// Looks up an application by name, ignoring ASCII case.
    pub fn application(&self, name: &str) -> Option<&Application> {
        self.applications.iter().find(|app| app.name.eq_ignore_ascii_case(name))
    }

    /// Total number of instances across every application.
    pub fn instance_count(&self) -> usize {
        self.applications.iter().map(|app| app.instances.len()).sum()
    }

    /// Computes the reconciliation hash the server compares against
    /// `apps_hashcode`, e.g. `"DOWN_1_UP_3_"`.
    pub fn compute_hashcode(&self) -> String {
        let mut counts = std::collections::BTreeMap::<&'static str, usize>::new();
        for instance in self.applications.iter().flat_map(|app| &app.instances) {
            *counts.entry(instance.status.as_str()).or_default() += 1;
        }
        counts.into_iter().map(|(status, count)| format!("{status}_{count}_")).collect()
    }
}

impl WireEntity for Applications {
    const ROOT_NAME: &'static str = "applications";
}

impl From<Vec<Application>> for Applications {
    fn from(applications: Vec<Application>) -> Self {
        let mut apps = Self {
            versions_delta: String::new(),
            apps_hashcode: String::new(),
            applications,
        };
        apps.apps_hashcode = apps.compute_hashcode();
        apps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InstanceStatus;

    fn instance(app: &str, host: &str, status: InstanceStatus) -> InstanceInfo {
        let mut instance = InstanceInfo::new(app, host, "10.0.0.1");
        instance.status = status;
        instance
    }

    #[test]
    fn hashcode_counts_statuses_in_name_order() {
        let mut orders = Application::new("ORDERS");
        orders.instances.push(instance("ORDERS", "a", InstanceStatus::Up));
        orders.instances.push(instance("ORDERS", "b", InstanceStatus::Down));
        let mut billing = Application::new("BILLING");
        billing.instances.push(instance("BILLING", "c", InstanceStatus::Up));

        let apps = Applications::from(vec![orders, billing]);
        assert_eq!(apps.apps_hashcode, "DOWN_1_UP_2_");
        assert_eq!(apps.instance_count(), 3);
    }

    #[test]
    fn application_lookup_ignores_case() {
        let apps = Applications::from(vec![Application::new("ORDERS")]);
        assert!(apps.application("orders").is_some());
        assert!(apps.application("billing").is_none());
    }

    #[test]
    fn instance_lookup_uses_server_id() {
        let mut app = Application::new("ORDERS");
        app.instances.push(instance("ORDERS", "orders-1", InstanceStatus::Up));
        assert!(app.instance("orders-1").is_some());
    }
}
