use std::sync::Arc;

use hurl_index::PackageIndex;
use hurl_repo::PackageRepo;
use tracing::{debug, error, info, warn};

use crate::error::ListenResult;
use crate::notification::{Notification, RawMessage};
use crate::source::NotificationSource;

/// Applies notifications to the search index, one at a time.
#[derive(Clone, Debug)]
pub struct Listener {
    repo: PackageRepo,
    index: Arc<PackageIndex>,
}

impl Listener {
    pub fn new(repo: PackageRepo, index: Arc<PackageIndex>) -> Self {
        Self { repo, index }
    }

    /// Create the index if none exists yet, so that the first notification
    /// on a fresh deployment has somewhere to land.
    pub fn ensure_index(&self) -> ListenResult<()> {
        if self.index.create()? {
            info!("created empty search index");
        }
        Ok(())
    }

    /// Consume `source` until it closes. Every message is applied and
    /// flushed before the next is received. Malformed messages and failed
    /// index updates are logged and skipped; only a failing channel stops
    /// the loop.
    pub async fn run(&self, source: &mut dyn NotificationSource) -> ListenResult<()> {
        info!("index listener started");
        while let Some(message) = source.recv().await? {
            self.handle_raw(message).await;
        }
        info!("notification channel closed; listener stopping");
        Ok(())
    }

    /// Decode and apply one message, logging any failure.
    pub async fn handle_raw(&self, message: RawMessage) {
        let notification = match Notification::decode(&message) {
            Ok(notification) => notification,
            Err(e) => {
                warn!(error = %e, "skipping notification");
                return;
            }
        };
        let this = self.clone();
        let label = notification.to_string();
        match tokio::task::spawn_blocking(move || this.apply(&notification)).await {
            Ok(Ok(())) => debug!(notification = %label, "applied"),
            Ok(Err(e)) => error!(notification = %label, error = %e, "failed to apply notification"),
            Err(e) => error!(notification = %label, error = %e, "index task failed"),
        }
    }

    /// Apply one notification and flush. Blocking.
    pub fn apply(&self, notification: &Notification) -> ListenResult<()> {
        match notification {
            Notification::Changed { branch, package } => {
                if !self.index.index_package(&self.repo, branch, package)? {
                    // The package vanished or lost its manifest since the
                    // notification was sent.
                    self.index.delete_package(branch, package)?;
                }
            }
            Notification::Deleted { branch, package } => {
                self.index.delete_package(branch, package)?;
            }
            Notification::BranchDeleted { branch } => {
                self.index.delete_branch(branch)?;
            }
        }
        self.index.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListenError;
    use crate::notification::NotificationKind;
    use crate::source::channel;
    use hurl_index::{IndexConfig, IndexError};
    use hurl_repo::{MemoryRepo, Snapshot};

    fn cakefile(name: &str) -> String {
        format!("name: {name}\nversion: '1'\nrelease: 1\ndescription: {name} widget\n")
    }

    fn setup() -> (MemoryRepo, Arc<PackageIndex>, Listener) {
        let mem = MemoryRepo::new();
        let (a, b) = (cakefile("alpha"), cakefile("beta"));
        mem.commit(
            "team/dev",
            &Snapshot::new()
                .dir("a", &[("Cakefile", a.as_str())])
                .dir("b", &[("Cakefile", b.as_str())]),
            "init",
        )
        .unwrap();
        // Every read refreshes, so assertions see each flush.
        let config = IndexConfig::default().with_refresh_minutes(0);
        let index = Arc::new(PackageIndex::in_memory(config).unwrap());
        let listener = Listener::new(mem.repo(), index.clone());
        (mem, index, listener)
    }

    #[test]
    fn changed_indexes_package() {
        let (_mem, index, listener) = setup();
        listener.apply(&Notification::changed("team/dev", "a")).unwrap();
        assert_eq!(index.count().unwrap(), 1);
        assert_eq!(index.search("alpha").unwrap().results[0].branch, "team/dev");
    }

    #[test]
    fn changed_for_vanished_package_removes_it() {
        let (mem, index, listener) = setup();
        listener.apply(&Notification::changed("team/dev", "a")).unwrap();
        mem.commit("team/dev", &Snapshot::new(), "remove all").unwrap();
        listener.apply(&Notification::changed("team/dev", "a")).unwrap();
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn deleted_removes_one_package() {
        let (_mem, index, listener) = setup();
        listener.apply(&Notification::changed("team/dev", "a")).unwrap();
        listener.apply(&Notification::changed("team/dev", "b")).unwrap();
        listener.apply(&Notification::deleted("team/dev", "a")).unwrap();
        assert_eq!(index.count().unwrap(), 1);
        assert_eq!(index.search("alpha").unwrap().count, 0);
    }

    #[test]
    fn branch_deleted_removes_every_package() {
        let (mem, index, listener) = setup();
        listener.apply(&Notification::changed("team/dev", "a")).unwrap();
        listener.apply(&Notification::changed("team/dev", "b")).unwrap();
        assert_eq!(index.search("widget").unwrap().count, 2);

        // The ref is usually gone by the time the notification arrives.
        mem.delete_branch("team/dev").unwrap();
        listener.apply(&Notification::branch_deleted("team/dev")).unwrap();
        assert_eq!(index.search("alpha").unwrap().count, 0);
        assert_eq!(index.search("beta").unwrap().count, 0);
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn ensure_index_prepares_fresh_on_disk_index() {
        let (mem, _, _) = setup();
        let dir = tempfile::tempdir().unwrap();
        let config = IndexConfig::default().with_refresh_minutes(0);
        let index = Arc::new(PackageIndex::open(dir.path().join("index"), config));
        let listener = Listener::new(mem.repo(), index.clone());

        let err = listener.apply(&Notification::changed("team/dev", "a")).unwrap_err();
        assert!(matches!(err, ListenError::Index(IndexError::NotCreated(_))));

        listener.ensure_index().unwrap();
        listener.ensure_index().unwrap();
        listener.apply(&Notification::changed("team/dev", "a")).unwrap();
        assert_eq!(index.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn run_skips_malformed_and_stops_on_close() {
        let (_mem, index, listener) = setup();
        let (notifier, mut source) = channel(8);
        notifier.send_raw(RawMessage::new("no-slash", NotificationKind::Changed.code())).await.unwrap();
        notifier.send_raw(RawMessage::new("team/dev/a", 42)).await.unwrap();
        notifier.send(&Notification::changed("team/dev", "a")).await.unwrap();
        notifier.send(&Notification::changed("team/dev", "b")).await.unwrap();
        notifier.send(&Notification::changed("nope", "zzz")).await.unwrap();
        drop(notifier);

        listener.run(&mut source).await.unwrap();
        assert_eq!(index.count().unwrap(), 2);
    }
}
