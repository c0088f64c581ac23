use super::{Acl, AclFormat, Principal};
use crate::config::FileSystemConfig;

/// One raw ACE as read off a filesystem node, before rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAce {
    pub principal: Principal,
    pub allow: bool,
    pub is_group: bool,
}

impl RawAce {
    #[must_use]
    pub fn allow_user(principal: Principal) -> Self {
        Self {
            principal,
            allow: true,
            is_group: false,
        }
    }

    #[must_use]
    pub fn allow_group(principal: Principal) -> Self {
        Self {
            principal,
            allow: true,
            is_group: true,
        }
    }

    #[must_use]
    pub fn deny_user(principal: Principal) -> Self {
        Self {
            principal,
            allow: false,
            is_group: false,
        }
    }

    #[must_use]
    pub fn deny_group(principal: Principal) -> Self {
        Self {
            principal,
            allow: false,
            is_group: true,
        }
    }
}

/// Renders raw ACEs read off a filesystem node into an [`Acl`], applying the
/// configured principal formats and the legacy-vs-inherited mode switch
/// (spec §4.4).
#[derive(Clone, Debug)]
pub struct AclBuilder {
    user_format: AclFormat,
    group_format: AclFormat,
    supports_inherited_acls: bool,
}

impl AclBuilder {
    #[must_use]
    pub fn new(config: &FileSystemConfig) -> Self {
        Self {
            user_format: config.user_acl_format,
            group_format: config.group_acl_format,
            supports_inherited_acls: config.supports_inherited_acls,
        }
    }

    /// Builds an [`Acl`] from raw ACEs. In legacy mode (`supportsInheritedAcls
    /// = false`) only the allow sets are populated, matching §3: "Legacy ACL
    /// mode combines allow-users and allow-groups only."
    #[must_use]
    pub fn build(&self, entries: &[RawAce]) -> Acl {
        let mut acl = Acl {
            is_determinate: true,
            ..Acl::default()
        };

        for entry in entries {
            let rendered = self.render(entry);
            match (entry.allow, entry.is_group) {
                (true, false) => acl.allow_users.push(rendered),
                (true, true) => acl.allow_groups.push(rendered),
                (false, false) if self.supports_inherited_acls => acl.deny_users.push(rendered),
                (false, true) if self.supports_inherited_acls => acl.deny_groups.push(rendered),
                (false, _) => {} // legacy mode drops deny entries
            }
        }

        acl
    }

    fn render(&self, entry: &RawAce) -> Principal {
        let format = if entry.is_group {
            self.group_format
        } else {
            self.user_format
        };
        Principal {
            name: format.render(&entry.principal),
            ..entry.principal.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(supports_inherited: bool) -> FileSystemConfig {
        let mut cfg = FileSystemConfig::default();
        cfg.start_paths.push("/tmp".into());
        cfg.supports_inherited_acls = supports_inherited;
        cfg
    }

    #[test]
    fn legacy_mode_drops_deny_entries() {
        let builder = AclBuilder::new(&cfg(false));
        let entries = vec![
            RawAce::allow_user(Principal::user("alice", None::<String>)),
            RawAce::deny_user(Principal::user("mallory", None::<String>)),
        ];
        let acl = builder.build(&entries);
        assert_eq!(acl.allow_users.len(), 1);
        assert!(acl.deny_users.is_empty());
    }

    #[test]
    fn inherited_mode_keeps_deny_entries() {
        let builder = AclBuilder::new(&cfg(true));
        let entries = vec![
            RawAce::allow_group(Principal::user("staff", Some("CORP"))),
            RawAce::deny_group(Principal::user("interns", Some("CORP"))),
        ];
        let acl = builder.build(&entries);
        assert_eq!(acl.allow_groups.len(), 1);
        assert_eq!(acl.deny_groups.len(), 1);
    }

    #[test]
    fn renders_with_configured_format() {
        let mut cfg = cfg(true);
        cfg.user_acl_format = AclFormat::DomainUser;
        let builder = AclBuilder::new(&cfg);
        let entries = vec![RawAce::allow_user(Principal::user(
            "alice",
            Some("CORP"),
        ))];
        let acl = builder.build(&entries);
        assert_eq!(acl.allow_users[0].name, r"CORP\alice");
    }
}
