pub mod action;
pub mod bravia;
pub mod traits;

pub use action::RemoteAction;
pub use bravia::BraviaRemote;
pub use traits::RemoteControl;
