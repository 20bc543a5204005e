//! Data Transfer Objects (DTOs)
//!
//! DTOs are used for API boundaries and use case inputs/outputs.

mod oms_dto;

pub use oms_dto::{
    CancelOrderCommand, GetOrderStatusQuery, OrderHistoryPage, OrderHistoryQuery, OrderSortField,
    OrderView, SortDirection, SubmitOrderCommand, SubmitOrderResult,
};
