/// A security principal referenced by an ACL entry (spec §3). Case
/// sensitivity is a matching hint, not a rendering choice: Windows/SMB
/// principals compare case-insensitively, POSIX/NFS ones don't (spec §6).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Principal {
    pub name: String,
    pub domain: Option<String>,
    pub namespace: Option<String>,
    pub case_sensitive: bool,
}

impl Principal {
    #[must_use]
    pub fn user<D: Into<String>>(name: impl Into<String>, domain: Option<D>) -> Self {
        Self {
            name: name.into(),
            domain: domain.map(Into::into),
            namespace: None,
            case_sensitive: true,
        }
    }

    #[must_use]
    pub fn with_case_sensitivity(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Equality per the principal's own case-sensitivity hint.
    #[must_use]
    pub fn matches_name(&self, other: &str) -> bool {
        if self.case_sensitive {
            self.name == other
        } else {
            self.name.eq_ignore_ascii_case(other)
        }
    }
}
