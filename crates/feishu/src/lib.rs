//! Feishu (Lark) open platform client for ferry.
//!
//! Covers the slice of the platform the relay needs: parsing
//! `im.message.receive_v1` callbacks, exchanging app credentials for a
//! tenant access token, and sending text and interactive card replies.

pub mod auth;
pub mod card;
pub mod error;
pub mod event;
pub mod outbound;

pub use {
    error::{Error, Result},
    event::{CallbackEnvelope, EventHeader, MESSAGE_RECEIVE_V1, MessageReceiveEvent},
    outbound::{FeishuClient, MessageSender},
};
