use thiserror::Error;
use vesper_input::InputError;

#[derive(Debug, Error)]
pub enum GameplayError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("input session has been stopped")]
    Stopped,
}
