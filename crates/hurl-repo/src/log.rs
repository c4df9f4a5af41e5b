//! Branch and package history.

use std::collections::{BinaryHeap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use hurl_store::{Commit, Object, ObjectId, ObjectKind, ObjectStore, StoreError};
use serde::Serialize;

use crate::error::RepoResult;
use crate::repository::PackageRepo;

/// One commit of a log, newest first.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    /// Commit id (hex), or the `commit` header when one is present.
    pub commit: String,
    /// Author name and email, without the trailing timestamp and offset.
    pub author: String,
    pub date: Option<DateTime<Utc>>,
    /// Offset as written in the commit, e.g. `+0100`.
    pub timezone: Option<String>,
    /// Raw header lines in order. Continuation lines are folded into the
    /// previous value.
    pub headers: Vec<(String, String)>,
    pub message: String,
}

impl LogEntry {
    /// Parse a raw commit payload.
    pub fn parse(id: &ObjectId, data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        let (header, message) = text.split_once("\n\n").unwrap_or((text.as_ref(), ""));

        let mut headers: Vec<(String, String)> = Vec::new();
        for line in header.lines() {
            if let Some(continuation) = line.strip_prefix(' ') {
                if let Some((_, value)) = headers.last_mut() {
                    value.push('\n');
                    value.push_str(continuation);
                }
                continue;
            }
            let (key, value) = line.split_once(' ').unwrap_or((line, ""));
            headers.push((key.to_string(), value.to_string()));
        }

        let lookup = |key: &str| {
            headers
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        let commit = lookup("commit")
            .map(str::to_string)
            .unwrap_or_else(|| id.to_hex());
        let ident = lookup("author").or_else(|| lookup("committer")).unwrap_or("");
        let (author, date, timezone) = split_ident(ident);

        Self {
            commit,
            author,
            date,
            timezone,
            headers,
            message: message.to_string(),
        }
    }

    /// First value of a header.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Split `Name <email> 1700000000 +0100` into the display name, the
/// timestamp and the offset. The last two tokens are the date.
fn split_ident(ident: &str) -> (String, Option<DateTime<Utc>>, Option<String>) {
    let tokens: Vec<&str> = ident.split_whitespace().collect();
    if tokens.len() < 2 {
        return (tokens.join(" "), None, None);
    }
    let (name, date) = tokens.split_at(tokens.len() - 2);
    let time = date[0]
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0));
    (name.join(" "), time, Some(date[1].to_string()))
}

struct HistoryNode {
    id: ObjectId,
    commit: Commit,
    raw: Vec<u8>,
}

impl HistoryNode {
    fn time(&self) -> i64 {
        self.commit
            .committer
            .as_ref()
            .or(self.commit.author.as_ref())
            .map_or(0, |sig| sig.time)
    }
}

/// Every commit reachable from `head`, children before parents. Among
/// commits whose children have all been emitted, the newest commit time
/// goes first. Parents missing from the store (shallow history) are
/// skipped.
fn walk_history(store: &dyn ObjectStore, head: ObjectId) -> RepoResult<Vec<HistoryNode>> {
    let mut nodes: HashMap<ObjectId, HistoryNode> = HashMap::new();
    // Number of not-yet-emitted children of each commit.
    let mut pending: HashMap<ObjectId, usize> = HashMap::new();
    let mut queue = VecDeque::from([head]);

    while let Some(id) = queue.pop_front() {
        if nodes.contains_key(&id) {
            continue;
        }
        let Some(stored) = store.read(&id)? else {
            continue;
        };
        let commit = match Object::decode(id, &stored)? {
            Object::Commit(commit) => commit,
            other => {
                return Err(StoreError::UnexpectedKind {
                    id,
                    expected: ObjectKind::Commit,
                    actual: other.kind(),
                }
                .into())
            }
        };
        pending.entry(id).or_insert(0);
        for parent in &commit.parents {
            *pending.entry(*parent).or_insert(0) += 1;
            queue.push_back(*parent);
        }
        nodes.insert(
            id,
            HistoryNode {
                id,
                commit,
                raw: stored.data,
            },
        );
    }

    let mut ready = BinaryHeap::new();
    if let Some(node) = nodes.get(&head) {
        ready.push((node.time(), head));
    }
    let mut order = Vec::with_capacity(nodes.len());
    while let Some((_, id)) = ready.pop() {
        let Some(node) = nodes.remove(&id) else {
            continue;
        };
        for parent in &node.commit.parents {
            let Some(count) = pending.get_mut(parent) else {
                continue;
            };
            *count = count.saturating_sub(1);
            if *count == 0 {
                if let Some(parent_node) = nodes.get(parent) {
                    ready.push((parent_node.time(), *parent));
                }
            }
        }
        order.push(node);
    }
    Ok(order)
}

impl PackageRepo {
    /// History of a branch, newest first. With `package`, only commits that
    /// changed the package's subtree are kept. `None` if the branch does not
    /// exist.
    pub fn package_log(&self, branch: &str, package: Option<&str>) -> RepoResult<Option<Vec<LogEntry>>> {
        let Some(head) = self.branch_head(branch)? else {
            return Ok(None);
        };
        let mut log = Vec::new();
        for node in walk_history(self.store().as_ref(), head)? {
            if let Some(package) = package {
                if !self.package_changed(&node.commit, package)? {
                    continue;
                }
            }
            log.push(LogEntry::parse(&node.id, &node.raw));
        }
        Ok(Some(log))
    }

    /// A commit changed a package iff the package is present in it and its
    /// subtree id differs from the one in every parent. A root commit that
    /// contains the package always counts.
    fn package_changed(&self, commit: &Commit, package: &str) -> RepoResult<bool> {
        let tree = self.store().read_tree(&commit.tree)?;
        let Some(entry) = tree.get(package) else {
            return Ok(false);
        };
        for parent in &commit.parents {
            if self.package_id_at(parent, package)? == Some(entry.object_id) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn package_id_at(&self, commit: &ObjectId, package: &str) -> RepoResult<Option<ObjectId>> {
        let commit = match self.store().read_commit(commit) {
            Ok(commit) => commit,
            Err(StoreError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let tree = self.store().read_tree(&commit.tree)?;
        Ok(tree.get(package).map(|entry| entry.object_id))
    }
}
