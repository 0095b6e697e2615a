//! Byte-stream transport abstraction for LNet masters.
//!
//! The protocol engine never talks to a serial port, CAN adapter or socket
//! directly. It only needs something that can send a buffer, hand back
//! whatever bytes arrived within a deadline, and be closed. That capability
//! is the [`Transport`] trait; UART, CAN, LIN and TCP drivers implement it
//! outside this workspace.
//!
//! [`StreamTransport`] adapts any std stream with read timeouts
//! (`TcpStream`, `UnixStream`) to the trait.

pub mod error;
pub mod stream;
pub mod traits;

pub use error::{Result, TransportError};
pub use stream::{StreamTransport, TimeoutStream};
pub use traits::Transport;
