//! ACL model and builder (spec §3 ACL, §4.4). Parses filesystem ACL entries
//! into inheritance-aware document graphs.
mod builder;
mod principal;

pub use builder::{AclBuilder, RawAce};
pub use principal::Principal;

use serde::{Deserialize, Serialize};

/// §4.4: controls whether a file is accessible iff the user passes the file
/// ACL, the share ACL, either, or both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityLevel {
    File,
    Share,
    #[default]
    FileOrShare,
    FileAndShare,
}

/// §4.4: principal rendering format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AclFormat {
    #[default]
    User,
    Group,
    DomainUser,
    DomainGroup,
    UserAtDomain,
    GroupAtDomain,
}

impl AclFormat {
    /// Renders a principal's name per the configured format. Namespace is
    /// not part of rendering — it's a matching hint carried alongside.
    #[must_use]
    pub fn render(self, principal: &Principal) -> String {
        let domain = principal.domain.as_deref().unwrap_or("");
        match self {
            Self::User | Self::Group => principal.name.clone(),
            Self::DomainUser | Self::DomainGroup => {
                if domain.is_empty() {
                    principal.name.clone()
                } else {
                    format!(r"{domain}\{}", principal.name)
                }
            }
            Self::UserAtDomain | Self::GroupAtDomain => {
                if domain.is_empty() {
                    principal.name.clone()
                } else {
                    format!("{}@{domain}", principal.name)
                }
            }
        }
    }
}

/// Where a document's ACL is inherited from (spec §9 design note:
/// previously nullable docid pointers, re-expressed as a tagged variant).
/// Resolution to a docid string happens at serialization (§3 docid format).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InheritFrom {
    /// A parent directory's file-inherit ACL document (`filesAcl:<dir>`).
    ParentFiles(String),
    /// A parent directory's container-inherit ACL document
    /// (`foldersAcl:<dir>`).
    ParentContainers(String),
    /// The root share-ACL document (`shareAcl:<root>`).
    Share(String),
    /// No inheritance pointer (legacy flat ACL mode, or public document).
    None,
}

impl InheritFrom {
    /// Resolves this pointer to the reserved-prefix docid string (spec §3,
    /// §6 "Docid format").
    #[must_use]
    pub fn to_docid(&self) -> Option<String> {
        match self {
            Self::ParentFiles(dir) => Some(format!("filesAcl:{dir}")),
            Self::ParentContainers(dir) => Some(format!("foldersAcl:{dir}")),
            Self::Share(root) => Some(format!("shareAcl:{root}")),
            Self::None => None,
        }
    }
}

/// How an ACL composes with the ACL(s) it inherits from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InheritanceType {
    /// A child's own ACL entries take precedence over inherited ones.
    ChildOverrides,
    /// Both the document's own ACL and the inherited ACL must permit access
    /// (used for the share ACL relation, spec §3).
    AndBothPermit,
}

/// An access control list (spec §3). Legacy mode uses only the allow sets;
/// inherited-ACL mode additionally uses the deny sets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Acl {
    pub allow_users: Vec<Principal>,
    pub allow_groups: Vec<Principal>,
    pub deny_users: Vec<Principal>,
    pub deny_groups: Vec<Principal>,
    pub is_public: bool,
    /// `false` is a sentinel meaning resolution failed and the head-request
    /// authorization fallback must be used instead; such ACLs must never be
    /// emitted (spec §3 invariant).
    pub is_determinate: bool,
}

impl Acl {
    /// A public ACL carries no principals; any authenticated user passes.
    #[must_use]
    pub fn public() -> Self {
        Self {
            is_public: true,
            is_determinate: true,
            ..Self::default()
        }
    }

    /// A non-determinate ACL: resolution failed, caller must fall back to
    /// per-request authorization and must not emit this ACL (spec §3, §6
    /// `useAuthzOnAclError`).
    #[must_use]
    pub fn indeterminate() -> Self {
        Self {
            is_determinate: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allow_users.is_empty()
            && self.allow_groups.is_empty()
            && self.deny_users.is_empty()
            && self.deny_groups.is_empty()
    }

    /// Flattens `other`'s principal sets into `self`, used for the
    /// root-special-case in §4.6 where the root document's own inherited
    /// ACL sets are folded into its ACL rather than attributed to a
    /// nonexistent parent.
    pub fn flatten_in(&mut self, other: &Self) {
        self.allow_users.extend(other.allow_users.iter().cloned());
        self.allow_groups.extend(other.allow_groups.iter().cloned());
        self.deny_users.extend(other.deny_users.iter().cloned());
        self.deny_groups.extend(other.deny_groups.iter().cloned());
    }
}
