use std::fmt;

use hurl_repo::{package_key, split_package_key};

use crate::error::{ListenError, ListenResult};

/// Wire code of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NotificationKind {
    Changed = 1,
    Deleted = 2,
    BranchDeleted = 3,
}

impl NotificationKind {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Changed),
            2 => Some(Self::Deleted),
            3 => Some(Self::BranchDeleted),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Changed => "CHANGED",
            Self::Deleted => "DELETED",
            Self::BranchDeleted => "BRANCH_DELETED",
        };
        f.write_str(name)
    }
}

/// A message as it arrives, before decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMessage {
    pub text: String,
    pub kind: u8,
}

impl RawMessage {
    pub fn new(text: impl Into<String>, kind: u8) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    /// Datagram framing: one kind byte followed by the UTF-8 text.
    pub fn to_datagram(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.text.len() + 1);
        bytes.push(self.kind);
        bytes.extend_from_slice(self.text.as_bytes());
        bytes
    }

    pub fn from_datagram(bytes: &[u8]) -> ListenResult<Self> {
        let (kind, text) = bytes
            .split_first()
            .ok_or_else(|| ListenError::malformed("", "empty datagram"))?;
        let text = std::str::from_utf8(text)
            .map_err(|e| ListenError::malformed(&String::from_utf8_lossy(text), e.to_string()))?;
        Ok(Self::new(text, *kind))
    }
}

/// A decoded change notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// A package was added or modified: reindex it.
    Changed { branch: String, package: String },
    /// A package was removed from a branch.
    Deleted { branch: String, package: String },
    /// A whole branch was removed.
    BranchDeleted { branch: String },
}

impl Notification {
    pub fn changed(branch: impl Into<String>, package: impl Into<String>) -> Self {
        Self::Changed {
            branch: branch.into(),
            package: package.into(),
        }
    }

    pub fn deleted(branch: impl Into<String>, package: impl Into<String>) -> Self {
        Self::Deleted {
            branch: branch.into(),
            package: package.into(),
        }
    }

    pub fn branch_deleted(branch: impl Into<String>) -> Self {
        Self::BranchDeleted {
            branch: branch.into(),
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Changed { .. } => NotificationKind::Changed,
            Self::Deleted { .. } => NotificationKind::Deleted,
            Self::BranchDeleted { .. } => NotificationKind::BranchDeleted,
        }
    }

    /// Decode a raw message. Package payloads split on their last `/`,
    /// since branch names may contain `/`. Surrounding whitespace is
    /// ignored.
    pub fn decode(raw: &RawMessage) -> ListenResult<Self> {
        let kind = NotificationKind::from_code(raw.kind)
            .ok_or_else(|| ListenError::malformed(&raw.text, format!("unknown kind {}", raw.kind)))?;
        let text = raw.text.trim();
        if text.is_empty() {
            return Err(ListenError::malformed(&raw.text, "empty payload"));
        }
        match kind {
            NotificationKind::BranchDeleted => Ok(Self::branch_deleted(text)),
            NotificationKind::Changed | NotificationKind::Deleted => {
                let (branch, package) = split_package_key(text)
                    .ok_or_else(|| ListenError::malformed(&raw.text, "expected branch/package"))?;
                let (branch, package) = (branch.trim(), package.trim());
                Ok(match kind {
                    NotificationKind::Changed => Self::changed(branch, package),
                    _ => Self::deleted(branch, package),
                })
            }
        }
    }

    pub fn encode(&self) -> RawMessage {
        let text = match self {
            Self::Changed { branch, package } | Self::Deleted { branch, package } => {
                package_key(branch, package)
            }
            Self::BranchDeleted { branch } => branch.clone(),
        };
        RawMessage::new(text, self.kind().code())
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.encode().text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_kind() {
        assert_eq!(
            Notification::decode(&RawMessage::new("master/foo", 1)).unwrap(),
            Notification::changed("master", "foo")
        );
        assert_eq!(
            Notification::decode(&RawMessage::new("alice/dev/foo\n", 2)).unwrap(),
            Notification::deleted("alice/dev", "foo")
        );
        assert_eq!(
            Notification::decode(&RawMessage::new("alice/dev", 3)).unwrap(),
            Notification::branch_deleted("alice/dev")
        );
    }

    #[test]
    fn malformed_payloads() {
        for raw in [
            RawMessage::new("no-separator", 1),
            RawMessage::new("master/", 2),
            RawMessage::new("   ", 3),
            RawMessage::new("master/foo", 9),
        ] {
            let err = Notification::decode(&raw).unwrap_err();
            assert!(matches!(err, ListenError::Malformed { .. }), "{raw:?}");
        }
    }

    #[test]
    fn encode_matches_wire_codes() {
        let raw = Notification::deleted("a/b", "c").encode();
        assert_eq!(raw, RawMessage::new("a/b/c", 2));
        assert_eq!(Notification::decode(&raw).unwrap(), Notification::deleted("a/b", "c"));
        assert_eq!(Notification::branch_deleted("x").encode().kind, 3);
    }

    #[test]
    fn datagram_framing() {
        let raw = RawMessage::new("master/foo", 1);
        let bytes = raw.to_datagram();
        assert_eq!(bytes[0], 1);
        assert_eq!(RawMessage::from_datagram(&bytes).unwrap(), raw);
        assert!(RawMessage::from_datagram(&[]).is_err());
        assert!(RawMessage::from_datagram(&[1, 0xff]).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(
            Notification::changed("master", "foo").to_string(),
            "CHANGED master/foo"
        );
    }
}
