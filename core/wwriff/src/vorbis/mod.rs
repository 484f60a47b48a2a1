pub mod headers;
pub mod helpers;
pub mod packet;
pub mod packetizer;
pub mod setup;

pub use packet::LogicalPacket;
pub use packetizer::{AudioPacketizer, StreamCursor};
pub use setup::{ModeTable, SetupHeader, SetupRebuilder};
