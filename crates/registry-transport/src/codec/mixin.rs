//! Per-type wire overrides layered on top of the naming strategy.
//!
//! A [`Mixin`] is keyed by the type name a payload declares to serde (the
//! struct's identifier unless renamed) and adjusts individual fields of that
//! type: explicit wire names, extra names accepted on input, and fields that
//! never appear on the wire. The model types stay free of wire quirks; the
//! codec owns them.

use std::collections::HashMap;

use super::naming::FieldNaming;

/// Field-level overrides for one type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mixin {
    type_name: &'static str,
    renames: Vec<(&'static str, &'static str)>,
    aliases: Vec<(&'static str, &'static str)>,
    ignored: Vec<&'static str>,
}

impl Mixin {
    /// Starts an empty mix-in for the type serde knows as `type_name`.
    pub fn for_type(type_name: &'static str) -> Self {
        Self {
            type_name,
            ..Self::default()
        }
    }

    /// Writes and reads `field` under `wire_name`, bypassing the naming strategy.
    pub fn rename(mut self, field: &'static str, wire_name: &'static str) -> Self {
        self.renames.push((field, wire_name));
        self
    }

    /// Also accepts `alias` for `field` on input. Output is unaffected.
    pub fn alias(mut self, alias: &'static str, field: &'static str) -> Self {
        self.aliases.push((alias, field));
        self
    }

    /// Drops `field` on output and discards it on input.
    pub fn ignore(mut self, field: &'static str) -> Self {
        self.ignored.push(field);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn explicit_name(&self, field: &str) -> Option<&'static str> {
        self.renames
            .iter()
            .find(|(declared, _)| *declared == field)
            .map(|(_, wire)| *wire)
    }

    pub(crate) fn alias_target(&self, wire_name: &str) -> Option<&'static str> {
        self.aliases
            .iter()
            .find(|(alias, _)| *alias == wire_name)
            .map(|(_, field)| *field)
    }

    pub(crate) fn ignores(&self, field: &str) -> bool {
        self.ignored.contains(&field)
    }

    /// The registry's applications view: double-underscore bookkeeping keys
    /// and a singular `application` list.
    pub fn applications() -> Self {
        Self::for_type("Applications")
            .rename("versions_delta", "versions__delta")
            .rename("apps_hashcode", "apps__hashcode")
            .rename("applications", "application")
    }

    /// The instance record: older servers spell the override status as one
    /// word.
    pub fn instance() -> Self {
        Self::for_type("InstanceInfo").alias("overriddenstatus", "overridden_status")
    }
}

/// Mix-ins by type name, plus the naming strategy they override.
#[derive(Debug, Clone, Default)]
pub(crate) struct MixinTable {
    naming: FieldNaming,
    mixins: HashMap<&'static str, Mixin>,
}

impl MixinTable {
    pub(crate) fn new(naming: FieldNaming) -> Self {
        Self {
            naming,
            mixins: HashMap::new(),
        }
    }

    /// Registers a mix-in, replacing any earlier one for the same type.
    pub(crate) fn insert(&mut self, mixin: Mixin) {
        self.mixins.insert(mixin.type_name, mixin);
    }

    pub(crate) fn naming(&self) -> FieldNaming {
        self.naming
    }

    pub(crate) fn get(&self, type_name: &str) -> Option<&Mixin> {
        self.mixins.get(type_name)
    }

    pub(crate) fn len(&self) -> usize {
        self.mixins.len()
    }

    /// The wire name of a declared field of `mixin`'s type.
    pub(crate) fn wire_name(&self, mixin: Option<&Mixin>, field: &str) -> String {
        mixin
            .and_then(|m| m.explicit_name(field))
            .map(str::to_owned)
            .unwrap_or_else(|| self.naming.apply(field))
    }

    /// Maps an incoming wire key back to one of `fields`, the declared names
    /// of `type_name`. Returns `None` when the field is ignored or the key is
    /// a declared name spelled differently on the wire, and the key unchanged
    /// when it matches nothing (unknown fields are the target type's
    /// business).
    pub(crate) fn resolve_incoming(&self, type_name: &str, fields: &[&'static str], key: String) -> Option<String> {
        let mixin = self.get(type_name);
        let declared = fields
            .iter()
            .copied()
            .find(|field| self.wire_name(mixin, field) == key)
            .or_else(|| mixin.and_then(|m| m.alias_target(&key)));

        match declared {
            Some(field) if mixin.is_some_and(|m| m.ignores(field)) => None,
            Some(field) => Some(field.to_owned()),
            None if mixin.is_some_and(|m| m.ignores(&key)) => None,
            None if fields.contains(&key.as_str()) => None,
            None => Some(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MixinTable {
        let mut table = MixinTable::new(FieldNaming::SnakeCase);
        table.insert(Mixin::applications());
        table.insert(Mixin::instance());
        table.insert(Mixin::for_type("Scratchpad").ignore("scratch"));
        table
    }

    #[test]
    fn explicit_name_bypasses_naming() {
        let table = table();
        let mixin = table.get("Applications");
        assert_eq!(table.wire_name(mixin, "apps_hashcode"), "apps__hashcode");
        assert_eq!(table.wire_name(mixin, "someOther"), "some_other");
    }

    #[test]
    fn incoming_keys_resolve_to_declared_fields() {
        let table = table();
        let fields = &["versions_delta", "apps_hashcode", "applications"];
        assert_eq!(
            table.resolve_incoming("Applications", fields, "application".to_owned()).as_deref(),
            Some("applications")
        );
        assert_eq!(
            table.resolve_incoming("Applications", fields, "versions__delta".to_owned()).as_deref(),
            Some("versions_delta")
        );
    }

    #[test]
    fn alias_is_accepted_on_input() {
        let table = table();
        let fields = &["status", "overridden_status"];
        assert_eq!(
            table.resolve_incoming("InstanceInfo", fields, "overriddenstatus".to_owned()).as_deref(),
            Some("overridden_status")
        );
    }

    #[test]
    fn ignored_fields_are_dropped() {
        let table = table();
        assert_eq!(table.resolve_incoming("Scratchpad", &["scratch", "kept"], "scratch".to_owned()), None);
        assert_eq!(
            table.resolve_incoming("Scratchpad", &["scratch", "kept"], "kept".to_owned()).as_deref(),
            Some("kept")
        );
    }

    #[test]
    fn unknown_keys_pass_through() {
        let table = table();
        assert_eq!(
            table.resolve_incoming("Unregistered", &["a"], "mystery".to_owned()).as_deref(),
            Some("mystery")
        );
    }

    #[test]
    fn declared_spelling_is_not_a_wire_name() {
        let table = table();
        let fields = &["versions_delta", "apps_hashcode", "applications"];
        assert_eq!(table.resolve_incoming("Applications", fields, "versions_delta".to_owned()), None);
        assert_eq!(table.resolve_incoming("Applications", fields, "applications".to_owned()), None);
        assert_eq!(table.resolve_incoming("Unregistered", &["hostName"], "hostName".to_owned()), None);
    }

    #[test]
    fn declared_name_equal_to_wire_name_is_kept() {
        let table = table();
        assert_eq!(
            table.resolve_incoming("Unregistered", &["status"], "status".to_owned()).as_deref(),
            Some("status")
        );
    }

    #[test]
    fn camel_case_declared_fields_match_snake_case_keys() {
        let table = table();
        assert_eq!(
            table.resolve_incoming("Unregistered", &["hostName"], "host_name".to_owned()).as_deref(),
            Some("hostName")
        );
    }
}
