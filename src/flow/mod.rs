//! Диалоги бота как чистая машина состояний.
//!
//! `transition` не делает I/O: по текущей сессии и событию она возвращает
//! следующую сессию и список эффектов, которые исполняет слой Telegram.

mod effect;
mod event;
mod session;
mod transition;

pub use effect::{Effect, Prompt};
pub use event::{Event, FlowButton};
pub use session::{AddStep, DeleteStep, Draft, Session};
pub use transition::{transition, Context};
