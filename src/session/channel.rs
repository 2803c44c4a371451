use super::*;
use russh::ChannelMsg;
use russh::client::Handle;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;

/// Which transport carries the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Ssh,
    Telnet,
    Scripted,
}

/// Byte-stream capability a [`Session`] drives.
///
/// Reads never wait for new data: they return whatever has accumulated since
/// the previous read, possibly nothing. A transport that has gone away
/// reports [`ConnectError::TransportClosed`] once its buffered data is
/// exhausted.
#[allow(async_fn_in_trait)]
pub trait ChannelIo {
    /// Returns all output buffered so far, or an empty string.
    async fn read_available(&mut self) -> Result<String, ConnectError>;

    /// Sends data to the device as-is.
    async fn write(&mut self, data: &str) -> Result<(), ConnectError>;

    /// Tears the transport down.
    async fn close(&mut self) -> Result<(), ConnectError>;

    fn is_connected(&self) -> bool;

    fn kind(&self) -> TransportKind;

    /// Whether credentials must be typed into the shell regardless of the
    /// device profile.
    fn requires_interactive_login(&self) -> bool {
        self.kind() == TransportKind::Telnet
    }
}

/// Interactive shell over SSH or Telnet.
///
/// A background task pumps bytes between the network and a pair of mpsc
/// queues; the session side only ever touches the queues.
pub struct ShellChannel {
    kind: TransportKind,
    ssh: Option<Handle<HostKeyVerifier>>,
    sender: Sender<String>,
    recv: Receiver<String>,
    pump: JoinHandle<()>,
    closed: bool,
}

impl ShellChannel {
    /// Opens a PTY shell on an authenticated SSH connection.
    pub(super) async fn open_ssh(
        handle: Handle<HostKeyVerifier>,
        device_addr: &str,
    ) -> Result<Self, ConnectError> {
        let mut channel = handle.channel_open_session().await?;
        channel
            .request_pty(false, "xterm", 800, 600, 0, 0, &[])
            .await?;
        channel.request_shell(false).await?;
        debug!("{} Shell request successful", device_addr);

        let (sender_to_shell, mut receiver_from_user) = mpsc::channel::<String>(256);
        let (sender_to_user, receiver_from_shell) = mpsc::channel::<String>(256);

        let io_task_device_addr = device_addr.to_string();
        let pump = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(data) = receiver_from_user.recv() => {
                        if let Err(e) = channel.data(data.as_bytes()).await {
                            debug!("{} Failed to send data to shell: {:?}", io_task_device_addr, e);
                            break;
                        }
                    },
                    Some(msg) = channel.wait() => {
                        match msg {
                            ChannelMsg::Data { ref data } => {
                                let text = String::from_utf8_lossy(data).into_owned();
                                if sender_to_user.send(text).await.is_err() {
                                    debug!("{} Shell output receiver dropped. Closing task.", io_task_device_addr);
                                    break;
                                }
                            }
                            ChannelMsg::ExitStatus { exit_status } => {
                                debug!("{} Shell exited with status code: {}", io_task_device_addr, exit_status);
                                let _ = channel.eof().await;
                                break;
                            }
                            ChannelMsg::Eof => {
                                debug!("{} Shell sent EOF.", io_task_device_addr);
                                break;
                            }
                            _ => {}
                        }
                    }
                    else => break,
                }
            }
            debug!("{} SSH I/O task ended.", io_task_device_addr);
        });

        Ok(Self {
            kind: TransportKind::Ssh,
            ssh: Some(handle),
            sender: sender_to_shell,
            recv: receiver_from_shell,
            pump,
            closed: false,
        })
    }

    /// Connects a raw Telnet socket and starts option filtering.
    pub(super) async fn open_telnet(
        host: &str,
        port: u16,
        device_addr: &str,
    ) -> Result<Self, ConnectError> {
        let stream = TcpStream::connect((host, port)).await?;
        debug!("{} TCP connection successful", device_addr);

        let (sender_to_shell, mut receiver_from_user) = mpsc::channel::<String>(256);
        let (sender_to_user, receiver_from_shell) = mpsc::channel::<String>(256);

        let io_task_device_addr = device_addr.to_string();
        let pump = tokio::spawn(async move {
            let (mut reader, mut writer) = stream.into_split();
            let mut filter = TelnetFilter::new();
            let mut buf = [0u8; 4096];
            loop {
                tokio::select! {
                    Some(data) = receiver_from_user.recv() => {
                        let payload = TelnetFilter::escape(data.as_bytes());
                        if let Err(e) = writer.write_all(&payload).await {
                            debug!("{} Failed to send data to socket: {:?}", io_task_device_addr, e);
                            break;
                        }
                    },
                    read = reader.read(&mut buf) => {
                        let n = match read {
                            Ok(0) => {
                                debug!("{} Telnet peer closed the connection.", io_task_device_addr);
                                break;
                            }
                            Ok(n) => n,
                            Err(e) => {
                                debug!("{} Telnet read failed: {:?}", io_task_device_addr, e);
                                break;
                            }
                        };
                        let filtered = filter.feed(&buf[..n]);
                        if !filtered.replies.is_empty()
                            && let Err(e) = writer.write_all(&filtered.replies).await
                        {
                            debug!("{} Failed to answer negotiation: {:?}", io_task_device_addr, e);
                            break;
                        }
                        if !filtered.data.is_empty() {
                            let text = String::from_utf8_lossy(&filtered.data).into_owned();
                            if sender_to_user.send(text).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
            debug!("{} Telnet I/O task ended.", io_task_device_addr);
        });

        Ok(Self {
            kind: TransportKind::Telnet,
            ssh: None,
            sender: sender_to_shell,
            recv: receiver_from_shell,
            pump,
            closed: false,
        })
    }
}

impl ChannelIo for ShellChannel {
    async fn read_available(&mut self) -> Result<String, ConnectError> {
        let mut output = String::new();
        loop {
            match self.recv.try_recv() {
                Ok(chunk) => output.push_str(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if output.is_empty() {
                        return Err(ConnectError::TransportClosed);
                    }
                    break;
                }
            }
        }
        Ok(output)
    }

    async fn write(&mut self, data: &str) -> Result<(), ConnectError> {
        if self.closed {
            return Err(ConnectError::TransportClosed);
        }
        self.sender
            .send(data.to_string())
            .await
            .map_err(|_| ConnectError::TransportClosed)
    }

    async fn close(&mut self) -> Result<(), ConnectError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.recv.close();
        self.pump.abort();
        if let Some(handle) = self.ssh.take() {
            handle
                .disconnect(russh::Disconnect::ByApplication, "", "English")
                .await?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.closed && !self.sender.is_closed()
    }

    fn kind(&self) -> TransportKind {
        self.kind
    }
}

impl Drop for ShellChannel {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
