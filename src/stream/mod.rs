//! Feed transport and stream coordination.

pub mod coordinator;
pub mod finnhub;
pub mod replay;
pub mod transport;

pub use coordinator::{ConnectionState, StreamCoordinator};
pub use finnhub::FinnhubTransport;
pub use replay::{ReplayConnection, ReplayOutcome, ReplayProbe, ReplayTransport};
pub use transport::{parse_trade_update, TradeUpdate, Transport, TransportError};
