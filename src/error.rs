#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Discord API error: {0}")]
    Discord(#[from] Box<serenity::Error>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<serenity::Error> for Error {
    fn from(err: serenity::Error) -> Self {
        Error::Discord(Box::new(err))
    }
}

impl Error {
    /// Message shown to the command issuer when a command fails.
    pub fn user_message(&self) -> String {
        match self {
            Error::Discord(_) => "Klarte ikkje snakke med Discord. Prøv igjen.".into(),
            Error::Config(msg) => msg.clone(),
            Error::Database(_) => "Det oppstod ein databasefeil. Prøv igjen seinare.".into(),
            Error::NotFound(what) => format!("Fann ikkje {what}."),
            Error::InvalidState(msg) => msg.clone(),
        }
    }
}
