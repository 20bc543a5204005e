//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Driver Ports** (Primary/Inbound): How the world uses our application
//! - **Driven Ports** (Secondary/Outbound): How our application uses external systems

mod market_data_port;
mod message_transport_port;

pub use market_data_port::{AssetDetails, MarketDataError, MarketDataPort, MarketSnapshot, TradingHours};
#[cfg(test)]
pub use market_data_port::MockMarketDataPort;
pub use message_transport_port::{
    calculate_order_priority, queues, DeadLetterRecord, MessageMetadata, MessageTransportPort, OrderMessage,
    OrderStatusUpdate, QueueMessage, TransportError,
};
