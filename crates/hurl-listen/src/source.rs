use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::net::UnixDatagram;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{ListenError, ListenResult};
use crate::notification::{Notification, RawMessage};

/// Largest datagram accepted from the socket.
const MAX_DATAGRAM: usize = 64 * 1024;

/// A channel delivering raw notifications, one at a time.
#[async_trait]
pub trait NotificationSource: Send {
    /// Wait for the next message. `Ok(None)` means the channel is closed
    /// and no more messages will arrive.
    async fn recv(&mut self) -> ListenResult<Option<RawMessage>>;
}

// ---------------------------------------------------------------------------
// In-process channel
// ---------------------------------------------------------------------------

/// Create an in-process notification channel holding up to `capacity`
/// undelivered messages.
pub fn channel(capacity: usize) -> (ChannelNotifier, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelNotifier { tx }, ChannelSource { rx })
}

/// Sending half of [`channel`].
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<RawMessage>,
}

impl ChannelNotifier {
    pub async fn send(&self, notification: &Notification) -> ListenResult<()> {
        self.send_raw(notification.encode()).await
    }

    /// Send an undecoded message, e.g. one relayed from elsewhere.
    pub async fn send_raw(&self, message: RawMessage) -> ListenResult<()> {
        self.tx.send(message).await.map_err(|_| ListenError::Closed)
    }
}

/// Receiving half of [`channel`]. Closed once every notifier is dropped.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<RawMessage>,
}

#[async_trait]
impl NotificationSource for ChannelSource {
    async fn recv(&mut self) -> ListenResult<Option<RawMessage>> {
        Ok(self.rx.recv().await)
    }
}

// ---------------------------------------------------------------------------
// Unix datagram socket
// ---------------------------------------------------------------------------

/// Notifications received on a Unix datagram socket, so that hooks running
/// in other processes can reach the listener.
#[derive(Debug)]
pub struct SocketSource {
    path: PathBuf,
    socket: UnixDatagram,
}

impl SocketSource {
    /// Bind the socket, replacing a stale socket file left by an earlier
    /// listener. Must be called within a tokio runtime.
    pub fn bind(path: impl AsRef<Path>) -> ListenResult<Self> {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let socket = UnixDatagram::bind(path)?;
        info!(path = %path.display(), "listening for notifications");
        Ok(Self {
            path: path.to_path_buf(),
            socket,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl NotificationSource for SocketSource {
    async fn recv(&mut self) -> ListenResult<Option<RawMessage>> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let len = self.socket.recv(&mut buf).await?;
            match RawMessage::from_datagram(&buf[..len]) {
                Ok(message) => return Ok(Some(message)),
                // Undecodable datagrams carry no kind to report; drop them here.
                Err(e) => debug!(error = %e, "dropping datagram"),
            }
        }
    }
}

impl Drop for SocketSource {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Sends notifications to a [`SocketSource`].
#[derive(Clone, Debug)]
pub struct SocketNotifier {
    path: PathBuf,
}

impl SocketNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn send(&self, notification: &Notification) -> ListenResult<()> {
        self.send_raw(&notification.encode()).await
    }

    pub async fn send_raw(&self, message: &RawMessage) -> ListenResult<()> {
        let socket = UnixDatagram::unbound()?;
        socket.send_to(&message.to_datagram(), &self.path).await?;
        debug!(path = %self.path.display(), kind = message.kind, text = %message.text, "sent notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_delivers_in_order_then_closes() {
        let (notifier, mut source) = channel(4);
        notifier.send(&Notification::changed("master", "foo")).await.unwrap();
        notifier.send_raw(RawMessage::new("junk", 7)).await.unwrap();
        drop(notifier);

        assert_eq!(source.recv().await.unwrap(), Some(RawMessage::new("master/foo", 1)));
        assert_eq!(source.recv().await.unwrap(), Some(RawMessage::new("junk", 7)));
        assert_eq!(source.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn send_to_closed_channel_fails() {
        let (notifier, source) = channel(1);
        drop(source);
        let err = notifier.send(&Notification::branch_deleted("x")).await.unwrap_err();
        assert!(matches!(err, ListenError::Closed));
    }

    #[tokio::test]
    async fn socket_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hurl-index.sock");
        let mut source = SocketSource::bind(&path).unwrap();
        let notifier = SocketNotifier::new(&path);

        notifier.send(&Notification::deleted("alice/dev", "foo")).await.unwrap();
        notifier.send(&Notification::branch_deleted("alice/dev")).await.unwrap();

        assert_eq!(source.recv().await.unwrap(), Some(RawMessage::new("alice/dev/foo", 2)));
        assert_eq!(source.recv().await.unwrap(), Some(RawMessage::new("alice/dev", 3)));
    }

    #[tokio::test]
    async fn rebinding_replaces_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.sock");
        std::fs::write(&path, b"stale").unwrap();
        let source = SocketSource::bind(&path).unwrap();
        assert_eq!(source.path(), path.as_path());
        drop(source);
        assert!(!path.exists());
    }
}
