//! Tool protocol over a framed JSON-RPC channel
//!
//! - [`framing`]: `Content-Length` frames over byte streams
//! - [`channel`]: JSON messages over a pair of streams
//! - [`protocol`]: request, response and result types
//! - [`endpoint`]: provider side, serving a tool registry
//! - [`client`]: agent side, discovering and calling remote tools
//! - [`process`]: the provider as a child process on stdio

pub mod channel;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod framing;
pub mod process;
pub mod protocol;
pub mod transport;

pub use channel::{Channel, ChannelReader, ChannelWriter};
pub use client::{ClientOptions, RemoteTool, ToolClient};
pub use endpoint::{EndpointState, ToolServer};
pub use error::{ChannelError, ClientError};
pub use framing::DEFAULT_MAX_FRAME_BYTES;
pub use process::ProviderProcess;
