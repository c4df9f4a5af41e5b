use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::{StoreError, StoreResult};

/// Length in bytes of a git object id (SHA-1).
pub const OBJECT_ID_LEN: usize = 20;

/// Content-addressed identifier of a git object.
///
/// The SHA-1 of the object's canonical framing `"<kind> <len>\0<data>"`.
/// Serialized as a lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Create an `ObjectId` from a pre-computed hash.
    pub fn from_hash(hash: [u8; OBJECT_ID_LEN]) -> Self {
        Self(hash)
    }

    /// Create an `ObjectId` from a byte slice of exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> StoreResult<Self> {
        let arr: [u8; OBJECT_ID_LEN] = bytes.try_into().map_err(|_| {
            StoreError::InvalidObjectId(format!(
                "expected {OBJECT_ID_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Hash an object of the given kind the way git does.
    pub fn hash_object(kind: ObjectKind, data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(format!("{} {}\0", kind, data.len()).as_bytes());
        hasher.update(data);
        let digest = hasher.finalize();
        let mut hash = [0u8; OBJECT_ID_LEN];
        hash.copy_from_slice(&digest);
        Self(hash)
    }

    /// The null object ID (all zeros).
    pub const fn null() -> Self {
        Self([0u8; OBJECT_ID_LEN])
    }

    /// Returns `true` if this is the null object ID.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; OBJECT_ID_LEN]
    }

    /// The raw 20-byte hash.
    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated hex representation (first 7 characters, as git prints it).
    pub fn short_hex(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(7);
        s
    }

    /// Parse from a 40-character hex string.
    pub fn from_hex(s: &str) -> StoreResult<Self> {
        let bytes = hex::decode(s).map_err(|e| StoreError::InvalidObjectId(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for ObjectId {
    type Error = StoreError;

    fn try_from(value: String) -> StoreResult<Self> {
        Self::from_hex(&value)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.to_hex()
    }
}

/// The kind of object held by the object database.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    /// Annotated tag. Stored by git but never interpreted by hurl.
    Tag,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::Tree => write!(f, "tree"),
            Self::Blob => write!(f, "blob"),
            Self::Tag => write!(f, "tag"),
        }
    }
}

/// A stored object: kind tag + canonical git payload.
///
/// The payload excludes the `"<kind> <len>\0"` header; that framing only
/// takes part in hashing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// Compute the git object id for this object.
    pub fn compute_id(&self) -> ObjectId {
        ObjectId::hash_object(self.kind, &self.data)
    }
}

/// A decoded object. The closed set of kinds the repository model walks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    Commit(Commit),
    Tree(Tree),
    Blob(Blob),
}

impl Object {
    /// Decode a stored object. `id` is only used for error reporting.
    pub fn decode(id: ObjectId, obj: &StoredObject) -> StoreResult<Self> {
        match obj.kind {
            ObjectKind::Commit => Commit::decode(id, &obj.data).map(Self::Commit),
            ObjectKind::Tree => Tree::decode(id, &obj.data).map(Self::Tree),
            ObjectKind::Blob => Ok(Self::Blob(Blob::new(obj.data.clone()))),
            ObjectKind::Tag => Err(StoreError::CorruptObject {
                id,
                reason: "tag objects are not part of the package graph".into(),
            }),
        }
    }

    /// The kind of this object.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Commit(_) => ObjectKind::Commit,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Blob(_) => ObjectKind::Blob,
        }
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw file contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// File mode for a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Symbolic link (0o120000).
    Symlink,
    /// Subtree / directory (0o040000).
    Directory,
    /// Submodule commit pointer (0o160000).
    Gitlink,
}

impl EntryMode {
    /// Octal mode value.
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Directory => 0o040000,
            Self::Gitlink => 0o160000,
        }
    }

    /// Parse from an octal mode value.
    pub fn from_mode_bits(bits: u32) -> Option<Self> {
        match bits {
            0o100644 | 0o100664 => Some(Self::Regular),
            0o100755 => Some(Self::Executable),
            0o120000 => Some(Self::Symlink),
            0o040000 => Some(Self::Directory),
            0o160000 => Some(Self::Gitlink),
            _ => None,
        }
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub mode: EntryMode,
    pub name: String,
    pub object_id: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: EntryMode, name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            object_id,
        }
    }

    /// Git orders directories as if their name had a trailing `/`.
    fn sort_key(&self) -> impl Iterator<Item = u8> + '_ {
        let suffix = (self.mode == EntryMode::Directory).then_some(b'/');
        self.name.bytes().chain(suffix)
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(other.sort_key())
    }
}

/// Directory listing object.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Tree {
    /// Entries in git order.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a new tree. Entries are sorted into git order.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Returns `true` if an entry with this exact name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Entry names in tree order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode as a git tree payload: `<octal mode> <name>\0<20-byte id>`
    /// repeated for every entry.
    pub fn to_stored_object(&self) -> StoredObject {
        let mut data = Vec::new();
        for entry in &self.entries {
            data.extend_from_slice(format!("{:o} {}\0", entry.mode.mode_bits(), entry.name).as_bytes());
            data.extend_from_slice(entry.object_id.as_bytes());
        }
        StoredObject::new(ObjectKind::Tree, data)
    }

    /// Decode a git tree payload.
    pub fn decode(id: ObjectId, mut data: &[u8]) -> StoreResult<Self> {
        let corrupt = |reason: String| StoreError::CorruptObject { id, reason };
        let mut entries = Vec::new();

        while !data.is_empty() {
            let space = data
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| corrupt("entry without mode separator".into()))?;
            let mode_str = std::str::from_utf8(&data[..space])
                .map_err(|_| corrupt("non-ascii entry mode".into()))?;
            let bits = u32::from_str_radix(mode_str, 8)
                .map_err(|_| corrupt(format!("bad entry mode {mode_str:?}")))?;
            let mode = EntryMode::from_mode_bits(bits)
                .ok_or_else(|| corrupt(format!("unknown entry mode {bits:o}")))?;
            data = &data[space + 1..];

            let nul = data
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| corrupt("entry name not terminated".into()))?;
            let name = String::from_utf8_lossy(&data[..nul]).into_owned();
            data = &data[nul + 1..];

            if data.len() < OBJECT_ID_LEN {
                return Err(corrupt(format!("truncated id for entry {name:?}")));
            }
            let object_id = ObjectId::from_slice(&data[..OBJECT_ID_LEN])?;
            data = &data[OBJECT_ID_LEN..];

            entries.push(TreeEntry {
                mode,
                name,
                object_id,
            });
        }

        Ok(Self { entries })
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Identity and timestamp line of a commit (`Name <email> 1700000000 +0100`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Seconds since the unix epoch.
    pub time: i64,
    /// Timezone offset as written by git, e.g. `+0100`.
    pub offset: String,
}

impl Signature {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        time: i64,
        offset: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            time,
            offset: offset.into(),
        }
    }

    /// Parse a signature header value. Returns `None` if the trailing
    /// timestamp and offset are missing.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.rsplitn(3, ' ');
        let offset = parts.next()?;
        let time = parts.next()?.parse().ok()?;
        let ident = parts.next()?;
        let (name, email) = match (ident.find('<'), ident.rfind('>')) {
            (Some(open), Some(close)) if open < close => {
                (ident[..open].trim(), &ident[open + 1..close])
            }
            _ => (ident.trim(), ""),
        };
        Some(Self::new(name, email, time, offset))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} {}", self.name, self.email, self.time, self.offset)
    }
}

/// A commit node of the history DAG.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: Option<Signature>,
    pub committer: Option<Signature>,
    pub message: String,
}

impl Commit {
    /// Encode as a git commit payload.
    pub fn to_stored_object(&self) -> StoredObject {
        let mut text = format!("tree {}\n", self.tree);
        for parent in &self.parents {
            text.push_str(&format!("parent {parent}\n"));
        }
        if let Some(author) = &self.author {
            text.push_str(&format!("author {author}\n"));
        }
        if let Some(committer) = &self.committer {
            text.push_str(&format!("committer {committer}\n"));
        }
        text.push('\n');
        text.push_str(&self.message);
        StoredObject::new(ObjectKind::Commit, text.into_bytes())
    }

    /// Decode a git commit payload. Headers other than `tree`, `parent`,
    /// `author` and `committer` are skipped.
    pub fn decode(id: ObjectId, data: &[u8]) -> StoreResult<Self> {
        let text = String::from_utf8_lossy(data);
        let (header, message) = match text.split_once("\n\n") {
            Some((header, message)) => (header, message),
            None => (text.trim_end_matches('\n'), ""),
        };

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for line in header.lines() {
            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };
            match key {
                "tree" => tree = Some(ObjectId::from_hex(value)?),
                "parent" => parents.push(ObjectId::from_hex(value)?),
                "author" => author = Signature::parse(value),
                "committer" => committer = Signature::parse(value),
                _ => {}
            }
        }

        let tree = tree.ok_or_else(|| StoreError::CorruptObject {
            id,
            reason: "commit has no tree header".into(),
        })?;

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            message: message.to_string(),
        })
    }
}
