//! The session and room coordination engine. All chat state lives here,
//! behind one [`chat_engine::ChatEngine`] instance shared by every
//! connection handler; the transport layers only translate wire frames into
//! engine calls.

pub mod broadcast;
pub mod chat_engine;
pub mod error;
pub mod events;
pub mod message_store;
pub mod presence;
pub mod session;
pub mod typing;
pub mod validation;
