//! Byte transports
//!
//! The link never names a concrete port type. A [`Connector`] opens something
//! that reads and writes bytes and hands it over as a [`DynSerial`]; the
//! supervisor splits it between the dispatcher and the poller.
//!
//! - [`SerialConnector`]: a real RS-232C port, 8N1, no flow control
//! - `MemoryConnector` (feature `test-support`): in-memory pipes for tests

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

use crate::config::BaudRate;
use crate::error::{LinkError, Result};

/// Anything the link can talk through
pub trait SerialPortIO: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SerialPortIO for T {}

/// Type-erased transport
pub type DynSerial = Box<dyn SerialPortIO>;

/// Opens a transport on demand
///
/// The supervisor keeps the connector of the last successful `connect` and
/// calls it again for every automatic reconnect.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<DynSerial>;

    /// Human-readable target for logs and errors
    fn describe(&self) -> String;
}

/// Opens a serial port through `tokio-serial`
#[derive(Debug, Clone)]
pub struct SerialConnector {
    port: String,
    baud_rate: BaudRate,
}

impl SerialConnector {
    pub fn new(port: impl Into<String>, baud_rate: BaudRate) -> Self {
        Self {
            port: port.into(),
            baud_rate,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud_rate(&self) -> BaudRate {
        self.baud_rate
    }
}

#[async_trait]
impl Connector for SerialConnector {
    async fn connect(&self) -> Result<DynSerial> {
        use tokio::task::spawn_blocking;
        use tokio_serial::SerialPortBuilderExt;

        let port = self.port.clone();
        let baud = self.baud_rate.as_u32();

        let stream = spawn_blocking(move || {
            tokio_serial::new(&port, baud)
                .data_bits(tokio_serial::DataBits::Eight)
                .parity(tokio_serial::Parity::None)
                .stop_bits(tokio_serial::StopBits::One)
                .flow_control(tokio_serial::FlowControl::None)
                .open_native_async()
        })
        .await
        .map_err(|e| LinkError::Open {
            target: self.describe(),
            source: e.into(),
        })?
        .map_err(|e| LinkError::Open {
            target: self.describe(),
            source: e.into(),
        })?;

        info!("Opened {}", self.describe());
        Ok(Box::new(stream))
    }

    fn describe(&self) -> String {
        format!("{} at {} baud", self.port, self.baud_rate)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryConnector;

#[cfg(any(test, feature = "test-support"))]
mod memory {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::io::DuplexStream;

    use super::{Connector, DynSerial};
    use crate::error::{LinkError, Result};

    const PIPE_CAPACITY: usize = 4096;

    /// Connector backed by in-memory pipes
    ///
    /// Each [`attach_device`](Self::attach_device) call prepares one successful
    /// connection and returns the device end of the pipe. Connecting with no
    /// prepared pipe fails like an absent port.
    #[derive(Debug, Default)]
    pub struct MemoryConnector {
        pipes: Mutex<VecDeque<DuplexStream>>,
        attempts: AtomicUsize,
    }

    impl MemoryConnector {
        pub fn new() -> Self {
            Self::default()
        }

        /// Prepare a connection and return the far end
        pub fn attach_device(&self) -> DuplexStream {
            let (host, device) = tokio::io::duplex(PIPE_CAPACITY);
            self.pipes.lock().push_back(host);
            device
        }

        /// Number of `connect` calls so far, successful or not
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for MemoryConnector {
        async fn connect(&self) -> Result<DynSerial> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            match self.pipes.lock().pop_front() {
                Some(pipe) => Ok(Box::new(pipe)),
                None => Err(LinkError::Open {
                    target: self.describe(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "no device attached",
                    ),
                }),
            }
        }

        fn describe(&self) -> String {
            "in-memory device".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_serial_connector_describe() {
        let connector = SerialConnector::new("/dev/ttyUSB0", BaudRate::B19200);
        assert_eq!(connector.describe(), "/dev/ttyUSB0 at 19200 baud");
        assert_eq!(connector.baud_rate(), BaudRate::B19200);
    }

    #[tokio::test]
    async fn test_memory_connector_hands_out_prepared_pipes() {
        let connector = MemoryConnector::new();
        let mut device = connector.attach_device();

        let mut host = connector.connect().await.unwrap();
        host.write_all(b"\n050\r").await.unwrap();

        let mut buf = [0u8; 5];
        device.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"\n050\r");

        assert!(matches!(
            connector.connect().await,
            Err(LinkError::Open { .. })
        ));
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test]
    async fn test_serial_connector_reports_missing_port() {
        let connector = SerialConnector::new("/dev/does-not-exist-tascam", BaudRate::B9600);
        let result = connector.connect().await;
        assert!(matches!(result, Err(LinkError::Open { .. })));
    }
}
