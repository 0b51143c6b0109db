pub use crate::error::{Error, Result};
pub use crate::image::Images;
pub use crate::response::{estimate, Options, Responses, ShellResponse};
pub use crate::shells::{Shell, ShellId};
pub use crate::solve::{IclsSettings, Method};

pub use sphere::{zsh::Normalisation, FrameCompletion, Vector};
